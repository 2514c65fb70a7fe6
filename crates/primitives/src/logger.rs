use std::fmt;
use std::sync::Arc;

/// Logger bound into every request scope under the reserved `log` key.
///
/// Forwards to `tracing` with target `scrivener::script`, tagging each event
/// with the path of the script that emitted it.
#[derive(Clone)]
pub struct ScriptLogger {
	script: Arc<str>,
}

impl ScriptLogger {
	pub fn new(script: impl Into<Arc<str>>) -> Self {
		Self { script: script.into() }
	}

	pub fn script(&self) -> &str {
		&self.script
	}

	pub fn error(&self, message: &str) {
		tracing::error!(target: "scrivener::script", script = %self.script, "{message}");
	}

	pub fn warn(&self, message: &str) {
		tracing::warn!(target: "scrivener::script", script = %self.script, "{message}");
	}

	pub fn info(&self, message: &str) {
		tracing::info!(target: "scrivener::script", script = %self.script, "{message}");
	}

	pub fn debug(&self, message: &str) {
		tracing::debug!(target: "scrivener::script", script = %self.script, "{message}");
	}

	pub fn trace(&self, message: &str) {
		tracing::trace!(target: "scrivener::script", script = %self.script, "{message}");
	}
}

impl fmt::Debug for ScriptLogger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScriptLogger").field("script", &self.script).finish()
	}
}
