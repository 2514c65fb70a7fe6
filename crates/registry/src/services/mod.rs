//! Priority-ordered cache over an external service directory.
//!
//! Entries are keyed by capability and optional filter, materialized on first
//! access and dropped wholesale for a capability whenever the directory
//! reports a change to any service of that capability.

use std::any::{Any, TypeId};
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;
use thiserror::Error;


/// Type token naming a service contract.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capability {
	id: TypeId,
	name: &'static str,
}

impl Capability {
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl fmt::Debug for Capability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Capability({})", self.name)
	}
}

/// Directory-assigned identity of one service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(pub u64);

/// A live service instance as reported by the directory.
#[derive(Clone)]
pub struct ServiceRef {
	id: ServiceId,
	ranking: i32,
	capability: Capability,
	instance: Arc<dyn Any + Send + Sync>,
}

impl ServiceRef {
	/// Wraps `service` as an instance of capability `T`.
	pub fn new<T: ?Sized + Send + Sync + 'static>(id: ServiceId, ranking: i32, service: Arc<T>) -> Self {
		Self {
			id,
			ranking,
			capability: Capability::of::<T>(),
			instance: Arc::new(service),
		}
	}

	pub fn id(&self) -> ServiceId {
		self.id
	}

	pub fn ranking(&self) -> i32 {
		self.ranking
	}

	pub fn capability(&self) -> Capability {
		self.capability
	}

	/// The instance, if it was registered as `T`.
	pub fn get<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
		self.instance.downcast_ref::<Arc<T>>().cloned()
	}

	/// Higher ranking first, then the lower (older) id.
	fn precedence(&self, other: &Self) -> CmpOrdering {
		other.ranking.cmp(&self.ranking).then_with(|| self.id.cmp(&other.id))
	}
}

impl fmt::Debug for ServiceRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ServiceRef")
			.field("id", &self.id)
			.field("ranking", &self.ranking)
			.field("capability", &self.capability)
			.finish_non_exhaustive()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
	#[error("invalid service filter {filter:?}: {message}")]
	InvalidFilter { filter: String, message: String },
	#[error("service directory unavailable")]
	Unavailable,
}

/// External registry of live service instances.
pub trait ServiceDirectory: Send + Sync {
	/// Every live instance of `capability` matching `filter`, in any order.
	fn services(&self, capability: Capability, filter: Option<&str>) -> Result<Vec<ServiceRef>, DirectoryError>;

	/// Returns a handle acquired through [`ServiceDirectory::services`].
	fn release(&self, _id: ServiceId) {}

	/// Registers for change notifications.
	fn add_listener(&self, _listener: Arc<dyn ServiceListener>) {}
}

pub trait ServiceListener: Send + Sync {
	fn on_service_changed(&self, capability: Capability);
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct CacheKey {
	capability: Capability,
	filter: Option<String>,
}

/// Memoized, priority-ordered view of a [`ServiceDirectory`].
pub struct ServiceCache {
	directory: Arc<dyn ServiceDirectory>,
	entries: RwLock<HashMap<CacheKey, Arc<[ServiceRef]>>>,
	/// Bumped on every invalidation; a lookup that raced one does not store.
	epoch: AtomicU64,
}

struct Invalidator(Weak<ServiceCache>);

impl ServiceListener for Invalidator {
	fn on_service_changed(&self, capability: Capability) {
		if let Some(cache) = self.0.upgrade() {
			cache.invalidate(capability);
		}
	}
}

impl ServiceCache {
	/// Creates a cache and subscribes it to `directory` changes.
	pub fn new(directory: Arc<dyn ServiceDirectory>) -> Arc<Self> {
		let cache = Arc::new(Self {
			directory: Arc::clone(&directory),
			entries: RwLock::new(HashMap::default()),
			epoch: AtomicU64::new(0),
		});
		directory.add_listener(Arc::new(Invalidator(Arc::downgrade(&cache))));
		cache
	}

	pub fn directory(&self) -> &Arc<dyn ServiceDirectory> {
		&self.directory
	}

	/// Highest-priority live instance of `T`.
	pub fn get<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
		self.references(Capability::of::<T>(), None).iter().find_map(ServiceRef::get::<T>)
	}

	/// Every live instance of `T` matching `filter`, highest priority first.
	pub fn get_all<T: ?Sized + 'static>(&self, filter: Option<&str>) -> Vec<Arc<T>> {
		self.references(Capability::of::<T>(), filter).iter().filter_map(ServiceRef::get::<T>).collect()
	}

	/// Priority-ordered references for `capability`, materializing on a miss.
	///
	/// Directory failures are logged and yield an empty, uncached result.
	pub fn references(&self, capability: Capability, filter: Option<&str>) -> Arc<[ServiceRef]> {
		let key = CacheKey {
			capability,
			filter: filter.map(str::to_owned),
		};
		if let Some(hit) = self.entries.read().get(&key) {
			return Arc::clone(hit);
		}

		let epoch = self.epoch.load(Ordering::Acquire);
		let mut refs = match self.directory.services(capability, filter) {
			Ok(refs) => refs,
			Err(err) => {
				tracing::warn!(capability = capability.name(), ?filter, error = %err, "service lookup failed");
				return Arc::from(Vec::new());
			}
		};
		refs.retain(|r| r.capability == capability);
		refs.sort_by(ServiceRef::precedence);
		let refs: Arc<[ServiceRef]> = Arc::from(refs);

		let mut entries = self.entries.write();
		if let Some(existing) = entries.get(&key) {
			return Arc::clone(existing);
		}
		if self.epoch.load(Ordering::Acquire) == epoch {
			tracing::trace!(capability = capability.name(), count = refs.len(), "service entry materialized");
			entries.insert(key, Arc::clone(&refs));
		}
		refs
	}

	/// Drops every cached entry for `capability`.
	pub fn invalidate(&self, capability: Capability) {
		let mut entries = self.entries.write();
		self.epoch.fetch_add(1, Ordering::AcqRel);
		let before = entries.len();
		entries.retain(|key, _| key.capability != capability);
		tracing::debug!(capability = capability.name(), dropped = before - entries.len(), "service entries invalidated");
	}

	pub fn clear(&self) {
		let mut entries = self.entries.write();
		self.epoch.fetch_add(1, Ordering::AcqRel);
		entries.clear();
	}

	/// Number of materialized entries.
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}
}
