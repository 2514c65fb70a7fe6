use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};

/// Identity of the script being executed: its path and the engine that runs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptIdentity {
	path: Arc<str>,
	engine: Arc<str>,
}

impl ScriptIdentity {
	pub fn new(path: impl Into<Arc<str>>, engine: impl Into<Arc<str>>) -> Self {
		Self {
			path: path.into(),
			engine: engine.into(),
		}
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn engine(&self) -> &str {
		&self.engine
	}

	/// JSON form bound under the reserved `script` key.
	pub fn to_value(&self) -> Value {
		json!({ "path": &*self.path, "engine": &*self.engine })
	}
}

impl fmt::Display for ScriptIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.path, self.engine)
	}
}
