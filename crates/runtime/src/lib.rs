#![cfg_attr(test, allow(unused_crate_dependencies))]

//! Assembled script runtime.
//!
//! [`ScriptRuntime`] wires the engine registry, the compiled script cache,
//! the bindings pipeline and the [`ScriptExecutor`] together. One call to
//! [`ScriptRuntime::execute`] resolves an engine for a script resource,
//! builds its scope, evaluates it and disposes the scope again.
//!
//! A small `template` engine is registered as a platform engine so the
//! runtime is usable without any external language.

mod config;
mod error;
mod executor;
mod runtime;
mod template;

pub use config::{BindingsConfig, CacheConfig, ConfigError, RuntimeConfig, WorkerConfig};
pub use error::{EvaluationError, ExecuteError};
pub use executor::{EvalOptions, ScriptExecutor};
pub use runtime::{ExecuteOptions, RuntimeBuilder, ScriptRuntime};
pub use template::{ENGINE_NAME as TEMPLATE_ENGINE, Template, TemplateEngine, TemplateEngineFactory};
