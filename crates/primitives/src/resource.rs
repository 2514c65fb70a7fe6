use std::io::{self, Read};
use std::sync::Arc;

/// A node in the content tree that may hold script source.
pub trait Resource: Send + Sync {
	/// Absolute, `/`-separated path.
	fn path(&self) -> &str;

	fn resource_type(&self) -> &str {
		""
	}

	/// Opens the resource content for reading.
	fn open(&self) -> io::Result<Box<dyn Read + Send>>;

	/// Declared character encoding of the content, if any.
	fn encoding(&self) -> Option<&str> {
		None
	}

	/// Preferred script language declared on this node for `extension`.
	///
	/// Absent hints are inherited from ancestors by the engine registry.
	fn language_hint(&self, _extension: &str) -> Option<String> {
		None
	}
}

/// Resolves paths to resources on behalf of one user.
pub trait ResourceResolver: Send + Sync {
	fn resolve(&self, path: &str) -> Option<Arc<dyn Resource>>;

	/// Returns the parent of the resource at `path`.
	fn parent(&self, path: &str) -> Option<Arc<dyn Resource>> {
		parent_path(path).and_then(|parent| self.resolve(parent))
	}

	fn user_id(&self) -> Option<&str> {
		None
	}
}

/// Returns the parent of an absolute path, or `None` for the root.
pub fn parent_path(path: &str) -> Option<&str> {
	let trimmed = path.trim_end_matches('/');
	if trimmed.is_empty() {
		return None;
	}
	match trimmed.rfind('/') {
		Some(0) => Some("/"),
		Some(idx) => Some(&trimmed[..idx]),
		None => None,
	}
}

/// Returns the extension of the last path segment, without the dot.
pub fn extension(path: &str) -> Option<&str> {
	let name = path.rsplit('/').next()?;
	let (stem, ext) = name.rsplit_once('.')?;
	if stem.is_empty() || ext.is_empty() {
		return None;
	}
	Some(ext)
}
