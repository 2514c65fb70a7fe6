//! Evaluates one script in a prepared scope.
//!
//! Compiling engines go through the script cache unless a method call is
//! requested. A method call is made through the engine's [`Invocable`]
//! interface after top-level evaluation, or, failing that, by appending the
//! engine's call syntax to the source stream.
//!
//! [`Invocable`]: scrivener_primitives::Invocable

use std::io::{Cursor, Read};
use std::sync::Arc;

use scrivener_bindings::{Scope, keys};
use scrivener_cache::{CachedScript, ScriptCache};
use scrivener_primitives::{EngineError, MethodCall, Resource, ScriptContext, ScriptReader, ScriptWriter};
use scrivener_registry::EngineDescriptor;
use serde_json::Value;

use crate::EvaluationError;


/// Per-evaluation options.
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
	/// Method to call after the script body.
	pub method: Option<MethodCall>,
	/// Destination for script error output. Discarded when unset.
	pub error_writer: Option<ScriptWriter>,
}

pub struct ScriptExecutor {
	cache: Option<Arc<ScriptCache>>,
}

impl ScriptExecutor {
	pub fn new(cache: Option<Arc<ScriptCache>>) -> Self {
		Self { cache }
	}

	/// Evaluates `source` with `engine` in `scope`.
	///
	/// The error writer is always flushed; the output writer only when the
	/// scope's `flush` binding is true. The scope is disposed on every path.
	pub fn evaluate(
		&self,
		scope: Scope,
		engine: &EngineDescriptor,
		source: &dyn Resource,
		options: EvalOptions,
	) -> Result<Value, EvaluationError> {
		let script = scope.script().clone();
		let resource = scope.helper().map(|h| h.resource().path().to_string());
		let flush = scope.bindings().flag(keys::FLUSH);
		let writer = scope.writer().unwrap_or_else(ScriptWriter::sink);
		let reader = scope.reader().unwrap_or_else(ScriptReader::empty);
		let error_writer = options.error_writer.unwrap_or_else(ScriptWriter::sink);

		let (bindings, _guard) = scope.into_parts();
		let mut ctx = ScriptContext::new(bindings, writer.clone(), error_writer.clone(), reader);
		let fail = |err: EngineError| EvaluationError::new(script.path(), resource.as_deref(), err);

		let result = self.run(script.path(), engine, source, options.method.as_ref(), &mut ctx);

		if let Err(err) = error_writer.flush() {
			tracing::warn!(script = %script, error = %err, "error writer flush failed");
		}
		let value = result.map_err(fail)?;
		if flush {
			writer.flush().map_err(|err| fail(err.into()))?;
		}
		tracing::trace!(script = %script, flush, "script evaluated");
		Ok(value)
	}

	fn run(
		&self,
		path: &str,
		engine: &EngineDescriptor,
		source: &dyn Resource,
		method: Option<&MethodCall>,
		ctx: &mut ScriptContext,
	) -> Result<Value, EngineError> {
		let script_engine = engine.engine();

		if method.is_none()
			&& engine.supports_compilation()
			&& let Some(compiler) = script_engine.as_compilable()
		{
			let cached = self.cache.as_ref().and_then(|cache| cache.get(path));
			let compiled = match cached {
				Some(hit) => Arc::clone(hit.compiled()),
				None => {
					let compiled = compiler.compile(&mut *source.open()?)?;
					if let Some(cache) = &self.cache {
						cache.put(CachedScript::new(path, Arc::clone(&compiled)));
					}
					tracing::debug!(path, engine = engine.engine_name(), "script compiled");
					compiled
				}
			};
			return compiled.eval(ctx);
		}

		let mut body = source.open()?;
		let Some(call) = method else {
			return script_engine.eval(&mut *body, ctx);
		};

		if let Some(invocable) = script_engine.as_invocable() {
			script_engine.eval(&mut *body, ctx)?;
			return invocable.invoke_function(ctx, &call.name, &call.args);
		}

		let syntax = engine.factory().method_call_syntax(&call.name, &call.args).ok_or_else(|| {
			EngineError::Unsupported(format!("{} cannot call method {}", engine.engine_name(), call.name))
		})?;
		let mut chained = body.chain(Cursor::new(format!("\n{syntax}\n").into_bytes()));
		script_engine.eval(&mut chained, ctx)
	}
}
