//! Built-in `template` engine.
//!
//! Source text is copied to the output with `${name}` and `${name.field}`
//! placeholders replaced by data bindings. Strings render verbatim, null and
//! missing values render empty, anything else renders as JSON. Placeholders
//! cannot span lines.

use std::io::Read;
use std::sync::Arc;

use scrivener_primitives::{
	BindingValue, Bindings, Compilable, CompiledScript, EngineError, ScriptContext, ScriptEngine, ScriptEngineFactory,
};
use serde_json::Value;


pub const ENGINE_NAME: &str = "template";

#[derive(Debug, Default)]
pub struct TemplateEngineFactory;

impl ScriptEngineFactory for TemplateEngineFactory {
	fn engine_name(&self) -> &str {
		ENGINE_NAME
	}

	fn engine_version(&self) -> &str {
		env!("CARGO_PKG_VERSION")
	}

	fn names(&self) -> Vec<String> {
		vec![ENGINE_NAME.to_string(), "tmpl".to_string()]
	}

	fn extensions(&self) -> Vec<String> {
		vec!["tmpl".to_string(), "tpl".to_string()]
	}

	fn mime_types(&self) -> Vec<String> {
		vec!["text/x-template".to_string()]
	}

	fn language_name(&self) -> &str {
		ENGINE_NAME
	}

	fn language_version(&self) -> &str {
		"1"
	}

	fn supports_compilation(&self) -> bool {
		true
	}

	fn script_engine(&self) -> Arc<dyn ScriptEngine> {
		Arc::new(TemplateEngine)
	}
}

pub struct TemplateEngine;

impl ScriptEngine for TemplateEngine {
	fn eval(&self, source: &mut dyn Read, ctx: &mut ScriptContext) -> Result<Value, EngineError> {
		Template::read(source)?.render_into(ctx)
	}

	fn as_compilable(&self) -> Option<&dyn Compilable> {
		Some(self)
	}
}

impl Compilable for TemplateEngine {
	fn compile(&self, source: &mut dyn Read) -> Result<Arc<dyn CompiledScript>, EngineError> {
		Ok(Arc::new(Template::read(source)?))
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Text(String),
	Field { name: String, path: Vec<String> },
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
	segments: Vec<Segment>,
}

impl Template {
	fn read(source: &mut dyn Read) -> Result<Self, EngineError> {
		let mut text = String::new();
		source.read_to_string(&mut text)?;
		Self::parse(&text)
	}

	pub fn parse(text: &str) -> Result<Self, EngineError> {
		let mut segments = Vec::new();
		let mut rest = text;
		let mut line = 1;

		while let Some(start) = rest.find("${") {
			let (literal, tail) = rest.split_at(start);
			line += literal.matches('\n').count();
			if !literal.is_empty() {
				segments.push(Segment::Text(literal.to_string()));
			}

			let body = &tail[2..];
			let end = body.find(['}', '\n']).filter(|&i| body.as_bytes()[i] == b'}').ok_or_else(|| EngineError::Syntax {
				message: "unterminated placeholder".to_string(),
				line,
			})?;
			let expr = body[..end].trim();
			let mut parts = expr.split('.').map(str::trim);
			let name = parts.next().unwrap_or_default();
			let path: Vec<String> = parts.map(str::to_string).collect();
			if name.is_empty() || path.iter().any(String::is_empty) {
				return Err(EngineError::Syntax {
					message: format!("invalid placeholder `${{{expr}}}`"),
					line,
				});
			}
			segments.push(Segment::Field {
				name: name.to_string(),
				path,
			});
			rest = &body[end + 1..];
		}
		if !rest.is_empty() {
			segments.push(Segment::Text(rest.to_string()));
		}
		Ok(Self { segments })
	}

	pub fn render(&self, bindings: &Bindings) -> String {
		let mut out = String::new();
		for segment in &self.segments {
			match segment {
				Segment::Text(text) => out.push_str(text),
				Segment::Field { name, path } => {
					let value = bindings.get(name).and_then(BindingValue::as_data).and_then(|v| descend(v, path));
					match value {
						None | Some(Value::Null) => {}
						Some(Value::String(s)) => out.push_str(s),
						Some(other) => out.push_str(&other.to_string()),
					}
				}
			}
		}
		out
	}

	fn render_into(&self, ctx: &mut ScriptContext) -> Result<Value, EngineError> {
		let rendered = self.render(&ctx.bindings);
		ctx.writer.write_str(&rendered)?;
		Ok(Value::Null)
	}
}

impl CompiledScript for Template {
	fn eval(&self, ctx: &mut ScriptContext) -> Result<Value, EngineError> {
		self.render_into(ctx)
	}
}

fn descend<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
	path.iter().try_fold(value, |current, segment| match current {
		Value::Object(map) => map.get(segment),
		Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
		_ => None,
	})
}
