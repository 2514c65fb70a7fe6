use std::error::Error as StdError;

use scrivener_bindings::ScopeError;
use thiserror::Error;

/// A script failed to compile or evaluate.
///
/// I/O and language failures are normalized into this one shape.
#[derive(Debug, Error)]
#[error("failed to evaluate {script}: {message}")]
pub struct EvaluationError {
	/// Path of the failing script.
	pub script: String,
	pub message: String,
	/// Path of the resource being rendered, when known.
	pub resource: Option<String>,
	#[source]
	pub cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl EvaluationError {
	pub(crate) fn new(script: &str, resource: Option<&str>, cause: impl StdError + Send + Sync + 'static) -> Self {
		Self {
			script: script.to_string(),
			message: cause.to_string(),
			resource: resource.map(str::to_owned),
			cause: Some(Box::new(cause)),
		}
	}
}

#[derive(Debug, Error)]
pub enum ExecuteError {
	#[error(transparent)]
	Scope(#[from] ScopeError),
	#[error(transparent)]
	Evaluation(#[from] EvaluationError),
}
