use thiserror::Error;

/// Registration rejected at the registry boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
	#[error("engine factory declares an empty engine name")]
	EmptyEngineName,
	#[error("engine {engine:?} declares no names, extensions or mime types")]
	NoAssociations { engine: String },
	#[error("package name must not be empty")]
	EmptyPackageName,
}
