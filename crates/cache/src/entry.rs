use std::fmt;
use std::sync::Arc;

use scrivener_primitives::CompiledScript;

/// A compiled script and the source path it was compiled from.
#[derive(Clone)]
pub struct CachedScript {
	path: String,
	compiled: Arc<dyn CompiledScript>,
}

impl CachedScript {
	pub fn new(path: impl Into<String>, compiled: Arc<dyn CompiledScript>) -> Self {
		Self {
			path: path.into(),
			compiled,
		}
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn compiled(&self) -> &Arc<dyn CompiledScript> {
		&self.compiled
	}
}

impl fmt::Debug for CachedScript {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CachedScript").field("path", &self.path).finish_non_exhaustive()
	}
}
