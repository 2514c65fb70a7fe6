use thiserror::Error;

/// Scope construction failure. Fatal to the execution it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
	#[error("binding {key:?} is reserved and cannot be overwritten or removed")]
	ReservedKey { key: String },
	#[error("supplied {field} disagrees with the script helper")]
	InconsistentHelper { field: &'static str },
	#[error("a request was supplied without a response")]
	MissingResponse,
	#[error("bindings provider {provider} failed: {message}")]
	Provider { provider: String, message: String },
}
