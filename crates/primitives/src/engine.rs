//! Script engine contracts.
//!
//! A [`ScriptEngineFactory`] describes one pluggable language (names,
//! extensions, mime types) and hands out a shared [`ScriptEngine`]. Engines
//! may additionally expose pre-compilation ([`Compilable`]) and direct
//! function invocation ([`Invocable`]).

use std::io::{self, Read};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::io::{ScriptReader, ScriptWriter};
use crate::value::Bindings;

/// Everything an engine sees while evaluating one script.
pub struct ScriptContext {
	pub bindings: Bindings,
	pub writer: ScriptWriter,
	pub error_writer: ScriptWriter,
	pub reader: ScriptReader,
}

impl ScriptContext {
	pub fn new(bindings: Bindings, writer: ScriptWriter, error_writer: ScriptWriter, reader: ScriptReader) -> Self {
		Self {
			bindings,
			writer,
			error_writer,
			reader,
		}
	}
}

/// A named method to call after the top-level evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
	pub name: String,
	pub args: Vec<Value>,
}

impl MethodCall {
	pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
		Self { name: name.into(), args }
	}
}

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("syntax error at line {line}: {message}")]
	Syntax { message: String, line: usize },
	#[error("{0}")]
	Runtime(String),
	#[error("unsupported operation: {0}")]
	Unsupported(String),
	#[error(transparent)]
	Io(#[from] io::Error),
}

/// Describes one scripting language and produces its engine.
pub trait ScriptEngineFactory: Send + Sync {
	fn engine_name(&self) -> &str;

	fn engine_version(&self) -> &str {
		""
	}

	/// Short names the engine can be looked up by.
	fn names(&self) -> Vec<String>;

	/// File extensions (without the dot) the engine claims.
	fn extensions(&self) -> Vec<String>;

	fn mime_types(&self) -> Vec<String> {
		Vec::new()
	}

	fn language_name(&self) -> &str;

	fn language_version(&self) -> &str {
		""
	}

	/// Other language names this engine is compatible with.
	///
	/// Bindings value providers keyed by any of these apply to the engine.
	fn compatible_languages(&self) -> Vec<String> {
		Vec::new()
	}

	/// Whether [`ScriptEngine::as_compilable`] returns a compiler.
	fn supports_compilation(&self) -> bool {
		false
	}

	/// Source text that calls `method` with `args`, appended after the script
	/// body when the engine cannot invoke functions directly.
	fn method_call_syntax(&self, _method: &str, _args: &[Value]) -> Option<String> {
		None
	}

	fn script_engine(&self) -> Arc<dyn ScriptEngine>;
}

/// Evaluates source in a [`ScriptContext`].
pub trait ScriptEngine: Send + Sync {
	fn eval(&self, source: &mut dyn Read, ctx: &mut ScriptContext) -> Result<Value, EngineError>;

	fn as_compilable(&self) -> Option<&dyn Compilable> {
		None
	}

	fn as_invocable(&self) -> Option<&dyn Invocable> {
		None
	}
}

pub trait Compilable: Send + Sync {
	fn compile(&self, source: &mut dyn Read) -> Result<Arc<dyn CompiledScript>, EngineError>;
}

/// Compiled form of a script, evaluable any number of times.
pub trait CompiledScript: Send + Sync {
	fn eval(&self, ctx: &mut ScriptContext) -> Result<Value, EngineError>;
}

pub trait Invocable: Send + Sync {
	fn invoke_function(&self, ctx: &mut ScriptContext, name: &str, args: &[Value]) -> Result<Value, EngineError>;
}
