use std::sync::Arc;

use serde_json::Value;

use crate::io::{ScriptReader, ScriptWriter};
use crate::resource::{Resource, ResourceResolver};

/// Sink for free-text diagnostic lines attached to a request.
pub trait ProgressTracker: Send + Sync {
	fn log(&self, message: &str);
}

/// The request half of an execution.
///
/// Implementations are supplied by the hosting platform; the runtime only
/// needs the addressed resource, its resolver, the body reader and an
/// attribute bag.
pub trait Request: Send + Sync {
	/// Request path as received by the platform.
	fn path(&self) -> &str;

	/// Resource the request addresses.
	fn resource(&self) -> Arc<dyn Resource>;

	/// Resolver bound to the requesting user.
	fn resolver(&self) -> Arc<dyn ResourceResolver>;

	/// Request body reader.
	fn reader(&self) -> ScriptReader;

	fn attribute(&self, name: &str) -> Option<Value>;

	fn set_attribute(&self, name: &str, value: Value);

	/// Optional diagnostic sink used for timing and error annotations.
	fn progress(&self) -> Option<Arc<dyn ProgressTracker>> {
		None
	}
}

/// The response half of an execution.
pub trait Response: Send + Sync {
	fn writer(&self) -> ScriptWriter;
}
