use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use scrivener_primitives::{ChangeEvent, ChangeKind, ChangeListener, ChangeSource, SubscriptionId};
use scrivener_registry::{EngineRegistry, EngineSetListener, EngineSnapshot, ListenerId};
use scrivener_worker::{BackgroundQueue, ShutdownReport};

use crate::entry::CachedScript;
use crate::watch::WatchSet;


pub const DEFAULT_CAPACITY: usize = 65536;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
	Unconfigured,
	Active,
	Disposed,
}

enum State {
	Unconfigured,
	Active(Active),
	Disposed,
}

struct Active {
	generation: u64,
	watch: Arc<WatchSet>,
	subscription: Option<SubscriptionId>,
	registry: Option<(Arc<EngineRegistry>, ListenerId)>,
}

/// Path-keyed, bounded cache of compiled scripts.
pub struct ScriptCache {
	capacity: usize,
	additional_extensions: BTreeSet<String>,
	source: Option<Arc<dyn ChangeSource>>,
	entries: RwLock<IndexMap<String, Arc<CachedScript>>>,
	state: Mutex<State>,
	disposed: AtomicBool,
	queue: BackgroundQueue,
	this: Weak<Self>,
}

struct RegistryAdapter(Weak<ScriptCache>);

impl EngineSetListener for RegistryAdapter {
	fn on_engine_set_changed(&self, snapshot: &Arc<EngineSnapshot>) {
		if let Some(cache) = self.0.upgrade() {
			cache.on_engine_set_changed(snapshot);
		}
	}
}

struct SourceAdapter(Weak<ScriptCache>);

impl ChangeListener for SourceAdapter {
	fn on_change(&self, events: &[ChangeEvent]) {
		if let Some(cache) = self.0.upgrade() {
			cache.on_source_changed(events);
		}
	}
}

impl ScriptCache {
	/// Creates an unconfigured cache and starts its invalidation worker.
	///
	/// `additional_extensions` are watched alongside the compilable ones.
	pub fn new(
		capacity: usize,
		additional_extensions: impl IntoIterator<Item = String>,
		source: Option<Arc<dyn ChangeSource>>,
	) -> std::io::Result<Arc<Self>> {
		let queue = BackgroundQueue::start("scrivener-cache-invalidation")?;
		let additional_extensions = additional_extensions
			.into_iter()
			.map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
			.filter(|e| !e.is_empty())
			.collect();
		Ok(Arc::new_cyclic(|this| Self {
			capacity,
			additional_extensions,
			source,
			entries: RwLock::new(IndexMap::new()),
			state: Mutex::new(State::Unconfigured),
			disposed: AtomicBool::new(false),
			queue,
			this: this.clone(),
		}))
	}

	pub fn state(&self) -> CacheState {
		match &*self.state.lock() {
			State::Unconfigured => CacheState::Unconfigured,
			State::Active(_) => CacheState::Active,
			State::Disposed => CacheState::Disposed,
		}
	}

	/// Subscribes to `registry` and configures the watch set from its
	/// current engines. Activating an active cache re-targets it.
	pub fn activate(&self, registry: &Arc<EngineRegistry>) {
		let listener = registry.subscribe(Arc::new(RegistryAdapter(self.this.clone())));
		let snapshot = registry.snapshot();

		let mut state = self.state.lock();
		let (subscription, previous) = match std::mem::replace(&mut *state, State::Unconfigured) {
			State::Disposed => {
				*state = State::Disposed;
				drop(state);
				registry.unsubscribe(listener);
				tracing::warn!("activate called on a disposed script cache");
				return;
			}
			State::Unconfigured => (None, None),
			State::Active(active) => (active.subscription, active.registry),
		};
		self.entries.write().clear();
		let (watch, subscription) = self.rewatch(subscription, &snapshot);
		*state = State::Active(Active {
			generation: snapshot.generation(),
			watch,
			subscription,
			registry: Some((Arc::clone(registry), listener)),
		});
		drop(state);

		if let Some((old, id)) = previous {
			old.unsubscribe(id);
		}
		tracing::debug!(generation = snapshot.generation(), "script cache activated");
	}

	/// Clears the cache and re-derives the watch set for a newly published
	/// engine set. Snapshots older than the one already applied are ignored.
	pub fn on_engine_set_changed(&self, snapshot: &EngineSnapshot) {
		let mut state = self.state.lock();
		let State::Active(active) = &mut *state else {
			return;
		};
		if snapshot.generation() <= active.generation {
			tracing::trace!(
				current = active.generation,
				stale = snapshot.generation(),
				"stale engine set ignored"
			);
			return;
		}

		let dropped = {
			let mut entries = self.entries.write();
			let n = entries.len();
			entries.clear();
			n
		};
		let previous = active.subscription.take();
		let (watch, subscription) = if self.extensions_for(snapshot) == *active.watch.extensions() {
			(Arc::clone(&active.watch), previous)
		} else {
			self.rewatch(previous, snapshot)
		};
		active.generation = snapshot.generation();
		active.watch = watch;
		active.subscription = subscription;
		tracing::debug!(generation = snapshot.generation(), dropped, "script cache reset for engine set");
	}

	/// Queues invalidation for a batch of source changes.
	pub fn on_source_changed(&self, events: &[ChangeEvent]) {
		if events.is_empty() {
			return;
		}
		let this = self.this.clone();
		let count = events.len();
		let events = events.to_vec();
		let queued = self.queue.submit(move || {
			if let Some(cache) = this.upgrade() {
				cache.invalidate(&events);
			}
		});
		if !queued {
			tracing::debug!(events = count, "script cache invalidation dropped after dispose");
		}
	}

	/// Applies a batch of source changes synchronously.
	pub fn invalidate(&self, events: &[ChangeEvent]) {
		let watch = match &*self.state.lock() {
			State::Active(active) => Some(Arc::clone(&active.watch)),
			State::Unconfigured => None,
			State::Disposed => return,
		};

		let mut entries = self.entries.write();
		for event in events {
			match event.kind {
				ChangeKind::Changed => {
					if watch.as_ref().is_some_and(|w| !w.matches(&event.path)) {
						continue;
					}
					if entries.shift_remove(&event.path).is_some() {
						tracing::debug!(path = %event.path, "compiled script invalidated");
					}
				}
				ChangeKind::Removed => {
					let exact = entries.shift_remove(&event.path).is_some();
					let prefix = format!("{}/", event.path.trim_end_matches('/'));
					let before = entries.len();
					entries.retain(|path, _| !path.starts_with(&prefix));
					let swept = before - entries.len();
					if exact || swept > 0 {
						tracing::debug!(path = %event.path, exact, swept, "compiled scripts removed");
					}
				}
			}
		}
	}

	pub fn get(&self, path: &str) -> Option<Arc<CachedScript>> {
		let hit = self.entries.read().get(path).cloned();
		tracing::trace!(path, hit = hit.is_some(), "script cache lookup");
		hit
	}

	/// Stores `script` under its path. The last writer for a path wins.
	pub fn put(&self, script: CachedScript) -> Arc<CachedScript> {
		let script = Arc::new(script);
		if self.capacity == 0 || self.disposed.load(Ordering::Acquire) {
			return script;
		}
		let mut entries = self.entries.write();
		entries.shift_remove(script.path());
		while entries.len() >= self.capacity {
			if let Some((evicted, _)) = entries.shift_remove_index(0) {
				tracing::trace!(path = %evicted, "compiled script evicted");
			}
		}
		entries.insert(script.path().to_string(), Arc::clone(&script));
		script
	}

	/// Removes the entry for exactly `path`.
	pub fn remove(&self, path: &str) -> bool {
		self.entries.write().shift_remove(path).is_some()
	}

	pub fn clear(&self) {
		self.entries.write().clear();
	}

	/// Drops the oldest entries until at most `keep` remain. Returns how many
	/// were dropped.
	pub fn trim(&self, keep: usize) -> usize {
		let mut entries = self.entries.write();
		let excess = entries.len().saturating_sub(keep);
		entries.drain(..excess);
		excess
	}

	/// Cached paths, oldest first.
	pub fn cached_paths(&self) -> Vec<String> {
		self.entries.read().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Patterns currently registered with the change source.
	pub fn watch_patterns(&self) -> Vec<String> {
		match &*self.state.lock() {
			State::Active(active) => active.watch.patterns().to_vec(),
			_ => Vec::new(),
		}
	}

	/// Blocks until queued invalidations have run or `timeout` elapses.
	pub fn wait_idle(&self, timeout: Duration) -> bool {
		self.queue.wait_idle(timeout)
	}

	/// Stops watching, empties the cache and drains the invalidation worker
	/// within `timeout`.
	pub fn dispose(&self, timeout: Duration) -> ShutdownReport {
		self.disposed.store(true, Ordering::Release);
		let previous = std::mem::replace(&mut *self.state.lock(), State::Disposed);
		if let State::Active(active) = previous {
			if let (Some(source), Some(id)) = (&self.source, active.subscription) {
				source.unsubscribe(id);
			}
			if let Some((registry, id)) = active.registry {
				registry.unsubscribe(id);
			}
		}
		self.entries.write().clear();
		let report = self.queue.shutdown(timeout);
		tracing::debug!(drained = report.drained, pending = report.pending, "script cache disposed");
		report
	}

	fn extensions_for(&self, snapshot: &EngineSnapshot) -> BTreeSet<String> {
		let mut extensions = snapshot.compilable_extensions();
		extensions.extend(self.additional_extensions.iter().cloned());
		extensions
	}

	/// Replaces the change subscription with one for `snapshot`'s extensions.
	fn rewatch(&self, previous: Option<SubscriptionId>, snapshot: &EngineSnapshot) -> (Arc<WatchSet>, Option<SubscriptionId>) {
		let watch = Arc::new(WatchSet::derive(self.extensions_for(snapshot)));
		let Some(source) = &self.source else {
			return (watch, None);
		};
		if let Some(id) = previous {
			source.unsubscribe(id);
		}
		if watch.patterns().is_empty() {
			return (watch, None);
		}
		let id = source.subscribe(watch.patterns(), Arc::new(SourceAdapter(self.this.clone())));
		tracing::debug!(patterns = ?watch.patterns(), "script cache watching");
		(watch, Some(id))
	}
}
