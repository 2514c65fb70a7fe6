use std::sync::Arc;

/// Kind of change reported for a content path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
	Changed,
	/// The path and everything under it is gone.
	Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
	pub path: String,
	pub kind: ChangeKind,
}

impl ChangeEvent {
	pub fn changed(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			kind: ChangeKind::Changed,
		}
	}

	pub fn removed(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			kind: ChangeKind::Removed,
		}
	}
}

/// Receives batches of change events.
///
/// Called on the notifying thread; implementations must not block.
pub trait ChangeListener: Send + Sync {
	fn on_change(&self, events: &[ChangeEvent]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Delivers content change events for paths matching glob-like patterns.
pub trait ChangeSource: Send + Sync {
	fn subscribe(&self, patterns: &[String], listener: Arc<dyn ChangeListener>) -> SubscriptionId;

	fn unsubscribe(&self, id: SubscriptionId);
}
