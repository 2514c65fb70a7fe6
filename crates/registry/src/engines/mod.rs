//! Engine registry with copy-on-write publication.
//!
//! # Concurrency
//!
//! - **Reads:** wait-free atomic load of the current [`EngineSnapshot`].
//! - **Writes:** serialized by a mutex around the membership buckets; each
//!   write rebuilds the snapshot from every bucket and swaps it in.
//!
//! Listeners are notified after the swap, outside the membership lock, with
//! the snapshot that write produced. Notifications from concurrent writes may
//! arrive out of order; listeners compare [`EngineSnapshot::generation`].

mod collision;
mod descriptor;
mod hint;
mod snapshot;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap as HashMap;
use scrivener_primitives::{Resource, ResourceResolver, ScriptEngineFactory, extension};

pub use self::collision::{AssociationCollision, AssociationKind};
pub use self::descriptor::{EngineDescriptor, EngineHandle, EngineOrigin, EngineProperties, PriorityKey};
pub use self::hint::language_hint;
pub use self::snapshot::EngineSnapshot;
use crate::RegisterError;


/// Receives every published engine set.
pub trait EngineSetListener: Send + Sync {
	fn on_engine_set_changed(&self, snapshot: &Arc<EngineSnapshot>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The three provenance buckets.
#[derive(Default)]
struct Members {
	platform: Vec<Arc<EngineDescriptor>>,
	packages: HashMap<Arc<str>, Vec<Arc<EngineDescriptor>>>,
	dynamic: Vec<Arc<EngineDescriptor>>,
	generation: u64,
}

impl Members {
	fn merged(&self) -> Vec<Arc<EngineDescriptor>> {
		let package_count: usize = self.packages.values().map(Vec::len).sum();
		let mut all = Vec::with_capacity(self.platform.len() + package_count + self.dynamic.len());
		all.extend(self.platform.iter().cloned());
		for engines in self.packages.values() {
			all.extend(engines.iter().cloned());
		}
		all.extend(self.dynamic.iter().cloned());
		all
	}

	fn remove(&mut self, origin_id: u64) -> bool {
		let keep = |e: &Arc<EngineDescriptor>| e.priority().origin_id != origin_id;
		let before = self.len();
		self.platform.retain(keep);
		self.dynamic.retain(keep);
		for engines in self.packages.values_mut() {
			engines.retain(keep);
		}
		self.packages.retain(|_, engines| !engines.is_empty());
		self.len() != before
	}

	fn len(&self) -> usize {
		self.platform.len() + self.dynamic.len() + self.packages.values().map(Vec::len).sum::<usize>()
	}
}

/// Registry of script engine factories.
pub struct EngineRegistry {
	members: Mutex<Members>,
	snap: ArcSwap<EngineSnapshot>,
	listeners: RwLock<Vec<(ListenerId, Arc<dyn EngineSetListener>)>>,
	next_origin_id: AtomicU64,
	next_listener_id: AtomicU64,
}

impl Default for EngineRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl EngineRegistry {
	pub fn new() -> Self {
		Self {
			members: Mutex::new(Members::default()),
			snap: ArcSwap::from_pointee(EngineSnapshot::empty()),
			listeners: RwLock::new(Vec::new()),
			next_origin_id: AtomicU64::new(1),
			next_listener_id: AtomicU64::new(1),
		}
	}

	/// Registers a built-in platform engine.
	pub fn register_platform(&self, factory: Arc<dyn ScriptEngineFactory>, rank: i32) -> Result<EngineHandle, RegisterError> {
		let descriptor = self.capture(factory, EngineOrigin::Platform, EngineProperties::ranked(rank))?;
		let handle = descriptor.handle();
		self.mutate(|m| {
			m.platform.push(descriptor);
			true
		});
		Ok(handle)
	}

	/// Registers a dynamically provided engine with optional overrides.
	pub fn register(&self, factory: Arc<dyn ScriptEngineFactory>, props: EngineProperties) -> Result<EngineHandle, RegisterError> {
		let descriptor = self.capture(factory, EngineOrigin::Dynamic, props)?;
		let handle = descriptor.handle();
		self.mutate(|m| {
			m.dynamic.push(descriptor);
			true
		});
		Ok(handle)
	}

	/// Registers every engine a package declares, replacing whatever the
	/// package declared before.
	///
	/// Either all engines are accepted or none are.
	pub fn register_package(
		&self,
		package: &str,
		engines: Vec<(Arc<dyn ScriptEngineFactory>, i32)>,
	) -> Result<Vec<EngineHandle>, RegisterError> {
		let package = package.trim();
		if package.is_empty() {
			return Err(RegisterError::EmptyPackageName);
		}
		let name: Arc<str> = Arc::from(package);
		let descriptors = engines
			.into_iter()
			.map(|(factory, rank)| self.capture(factory, EngineOrigin::Package(Arc::clone(&name)), EngineProperties::ranked(rank)))
			.collect::<Result<Vec<_>, _>>()?;
		let handles = descriptors.iter().map(|d| d.handle()).collect();

		self.mutate(|m| {
			if descriptors.is_empty() {
				m.packages.remove(&name).is_some()
			} else {
				m.packages.insert(name, descriptors);
				true
			}
		});
		Ok(handles)
	}

	/// Withdraws every engine declared by `package`.
	pub fn remove_package(&self, package: &str) -> bool {
		self.mutate(|m| m.packages.remove(package).is_some())
	}

	/// Withdraws one registration. Returns false if the handle is unknown.
	pub fn unregister(&self, handle: EngineHandle) -> bool {
		self.mutate(|m| m.remove(handle.0))
	}

	/// Withdraws every registration of `factory`.
	pub fn unregister_factory(&self, factory: &Arc<dyn ScriptEngineFactory>) -> bool {
		let ids: Vec<u64> = self
			.snapshot()
			.engines()
			.iter()
			.filter(|e| e.is_factory(factory))
			.map(|e| e.priority().origin_id)
			.collect();
		if ids.is_empty() {
			return false;
		}
		self.mutate(|m| ids.iter().fold(false, |removed, id| m.remove(*id) | removed))
	}

	/// Current published snapshot.
	pub fn snapshot(&self) -> Arc<EngineSnapshot> {
		self.snap.load_full()
	}

	/// Highest-precedence engine claiming `extension`.
	pub fn by_extension(&self, extension: &str) -> Option<Arc<EngineDescriptor>> {
		self.snap.load().by_extension(extension).cloned()
	}

	pub fn by_name(&self, name: &str) -> Option<Arc<EngineDescriptor>> {
		self.snap.load().by_name(name).cloned()
	}

	pub fn by_mime_type(&self, mime_type: &str) -> Option<Arc<EngineDescriptor>> {
		self.snap.load().by_mime_type(mime_type).cloned()
	}

	/// Resolves by extension, then name, then mime type.
	pub fn resolve(&self, key: &str) -> Option<Arc<EngineDescriptor>> {
		let snap = self.snap.load();
		snap.by_extension(key)
			.or_else(|| snap.by_name(key))
			.or_else(|| snap.by_mime_type(key))
			.cloned()
	}

	/// All engines in precedence order.
	pub fn all_engines(&self) -> Vec<Arc<EngineDescriptor>> {
		self.snap.load().engines().to_vec()
	}

	/// Every engine claiming `extension`, in precedence order.
	pub fn engines_for_extension(&self, extension: &str) -> Vec<Arc<EngineDescriptor>> {
		self.snap.load().candidates_for_extension(extension).cloned().collect()
	}

	/// Declared metadata of a registered factory.
	pub fn associations_for(&self, factory: &Arc<dyn ScriptEngineFactory>) -> Option<Arc<EngineDescriptor>> {
		self.snap.load().engines().iter().find(|e| e.is_factory(factory)).cloned()
	}

	/// Selects the engine for a script path, honoring an optional language hint.
	///
	/// Candidates claiming the path's extension are filtered by a
	/// case-insensitive language match; without a match the highest-precedence
	/// candidate wins. A path without a claimed extension resolves through the
	/// hint alone.
	pub fn resolve_script(&self, path: &str, hint: Option<&str>) -> Option<Arc<EngineDescriptor>> {
		let snap = self.snap.load();
		let mut candidates = extension(path)
			.map(|ext| snap.candidates_for_extension(ext).collect::<Vec<_>>())
			.unwrap_or_default();

		if let Some(hint) = hint {
			if let Some(pos) = candidates.iter().position(|e| e.matches_language(hint)) {
				return Some(Arc::clone(candidates.swap_remove(pos)));
			}
			if candidates.is_empty() {
				return snap.engines().iter().find(|e| e.matches_language(hint)).cloned();
			}
			tracing::trace!(path, hint, "language hint matched no candidate");
		}

		candidates.first().map(|e| Arc::clone(*e))
	}

	/// Selects the engine for a script resource, inheriting the language hint
	/// from ancestors.
	pub fn resolve_for_resource(&self, resource: &dyn Resource, resolver: &dyn ResourceResolver) -> Option<Arc<EngineDescriptor>> {
		let hint = extension(resource.path()).and_then(|ext| language_hint(resource, resolver, ext));
		self.resolve_script(resource.path(), hint.as_deref())
	}

	/// Subscribes to engine set changes.
	pub fn subscribe(&self, listener: Arc<dyn EngineSetListener>) -> ListenerId {
		let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
		self.listeners.write().push((id, listener));
		id
	}

	pub fn unsubscribe(&self, id: ListenerId) -> bool {
		let mut listeners = self.listeners.write();
		let before = listeners.len();
		listeners.retain(|(lid, _)| *lid != id);
		listeners.len() != before
	}

	fn capture(
		&self,
		factory: Arc<dyn ScriptEngineFactory>,
		origin: EngineOrigin,
		props: EngineProperties,
	) -> Result<Arc<EngineDescriptor>, RegisterError> {
		let origin_id = self.next_origin_id.fetch_add(1, Ordering::Relaxed);
		EngineDescriptor::capture(factory, origin, origin_id, props).map(Arc::new)
	}

	/// Applies `f` to the buckets; if it reports a change, rebuilds,
	/// publishes and notifies.
	fn mutate(&self, f: impl FnOnce(&mut Members) -> bool) -> bool {
		let published = {
			let mut members = self.members.lock();
			if !f(&mut members) {
				return false;
			}
			members.generation += 1;
			let snap = Arc::new(EngineSnapshot::build(members.generation, members.merged()));
			self.snap.store(Arc::clone(&snap));
			snap
		};

		tracing::debug!(
			generation = published.generation(),
			engines = published.len(),
			collisions = published.collisions().len(),
			"engine registry rebuilt"
		);

		let listeners: Vec<_> = self.listeners.read().iter().map(|(_, l)| Arc::clone(l)).collect();
		for listener in listeners {
			listener.on_engine_set_changed(&published);
		}
		true
	}
}
