//! Registry of bindings value providers, partitioned by context.
//!
//! # Ordering
//!
//! For one context and engine the applied order is:
//!
//! 1. generic providers,
//! 2. providers keyed by a language the engine is compatible with,
//! 3. providers keyed by one of the engine's own names.
//!
//! Within each tier providers run by ascending rank, and at equal rank the
//! newer registration runs first, so the highest-priority write lands last.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;
use scrivener_registry::EngineDescriptor;

use crate::BindingsValuesProvider;

#[cfg(test)]
mod tests;

/// Context used when a registration or request names none.
pub const DEFAULT_CONTEXT: &str = "request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u64);

/// Where and how strongly a provider applies.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistration {
	pub rank: i32,
	/// Contexts the provider serves; empty means [`DEFAULT_CONTEXT`].
	pub contexts: Vec<String>,
	/// Languages the provider is keyed by; empty means generic.
	pub languages: Vec<String>,
}

impl ProviderRegistration {
	pub fn generic(rank: i32) -> Self {
		Self { rank, ..Self::default() }
	}

	pub fn for_language(language: impl Into<String>, rank: i32) -> Self {
		Self {
			rank,
			languages: vec![language.into()],
			..Self::default()
		}
	}

	pub fn in_context(mut self, context: impl Into<String>) -> Self {
		self.contexts.push(context.into());
		self
	}
}

struct Entry {
	id: ProviderId,
	rank: i32,
	languages: Vec<String>,
	provider: Arc<dyn BindingsValuesProvider>,
}

impl Entry {
	fn keyed_by(&self, languages: &[String]) -> bool {
		self.languages.iter().any(|l| languages.iter().any(|x| x.eq_ignore_ascii_case(l)))
	}
}

#[derive(Default)]
struct ContextProviders {
	generic: Vec<Arc<Entry>>,
	by_language: Vec<Arc<Entry>>,
}

impl ContextProviders {
	fn insert(&mut self, entry: Arc<Entry>) {
		let bucket = if entry.languages.is_empty() {
			&mut self.generic
		} else {
			&mut self.by_language
		};
		bucket.push(entry);
		bucket.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| b.id.cmp(&a.id)));
	}

	fn remove(&mut self, id: ProviderId) -> bool {
		let before = self.generic.len() + self.by_language.len();
		self.generic.retain(|e| e.id != id);
		self.by_language.retain(|e| e.id != id);
		before != self.generic.len() + self.by_language.len()
	}

	fn is_empty(&self) -> bool {
		self.generic.is_empty() && self.by_language.is_empty()
	}
}

#[derive(Default)]
struct Inner {
	active: bool,
	pending: Vec<(ProviderId, ProviderRegistration, Arc<dyn BindingsValuesProvider>)>,
	contexts: HashMap<String, ContextProviders>,
}

impl Inner {
	fn insert(&mut self, id: ProviderId, registration: ProviderRegistration, provider: Arc<dyn BindingsValuesProvider>) {
		let entry = Arc::new(Entry {
			id,
			rank: registration.rank,
			languages: registration.languages,
			provider,
		});
		let contexts = if registration.contexts.is_empty() {
			vec![DEFAULT_CONTEXT.to_string()]
		} else {
			registration.contexts
		};
		for context in contexts {
			self.contexts.entry(context).or_default().insert(Arc::clone(&entry));
		}
	}
}

/// Providers by context. Registrations made before [`Self::activate`] are
/// queued and replayed in arrival order on activation.
#[derive(Default)]
pub struct ProviderRegistry {
	inner: RwLock<Inner>,
	next_id: AtomicU64,
}

impl ProviderRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, provider: Arc<dyn BindingsValuesProvider>, registration: ProviderRegistration) -> ProviderId {
		let id = ProviderId(self.next_id.fetch_add(1, Ordering::Relaxed));
		let mut inner = self.inner.write();
		if inner.active {
			tracing::debug!(provider = provider.name(), rank = registration.rank, "bindings provider registered");
			inner.insert(id, registration, provider);
		} else {
			tracing::trace!(provider = provider.name(), "bindings provider queued until activation");
			inner.pending.push((id, registration, provider));
		}
		id
	}

	pub fn unregister(&self, id: ProviderId) -> bool {
		let mut inner = self.inner.write();
		let before = inner.pending.len();
		inner.pending.retain(|(pid, _, _)| *pid != id);
		if inner.pending.len() != before {
			return true;
		}
		let mut removed = false;
		for providers in inner.contexts.values_mut() {
			removed |= providers.remove(id);
		}
		inner.contexts.retain(|_, providers| !providers.is_empty());
		removed
	}

	/// Replays queued registrations. Returns how many were replayed.
	pub fn activate(&self) -> usize {
		let mut inner = self.inner.write();
		if inner.active {
			return 0;
		}
		inner.active = true;
		let pending = std::mem::take(&mut inner.pending);
		let replayed = pending.len();
		for (id, registration, provider) in pending {
			inner.insert(id, registration, provider);
		}
		tracing::debug!(replayed, "bindings provider registry activated");
		replayed
	}

	pub fn is_active(&self) -> bool {
		self.inner.read().active
	}

	/// Providers that apply to an engine with `names` and
	/// `compatible_languages` in `context`, in application order.
	pub fn providers_for(&self, context: &str, names: &[String], compatible_languages: &[String]) -> Vec<Arc<dyn BindingsValuesProvider>> {
		let inner = self.inner.read();
		let Some(providers) = inner.contexts.get(context) else {
			return Vec::new();
		};

		let exact = providers.by_language.iter().filter(|e| e.keyed_by(names));
		let compatible = providers
			.by_language
			.iter()
			.filter(|e| !e.keyed_by(names) && e.keyed_by(compatible_languages));

		providers
			.generic
			.iter()
			.chain(compatible)
			.chain(exact)
			.map(|e| Arc::clone(&e.provider))
			.collect()
	}

	pub fn providers_for_engine(&self, context: &str, engine: &EngineDescriptor) -> Vec<Arc<dyn BindingsValuesProvider>> {
		self.providers_for(context, engine.names(), engine.compatible_languages())
	}

	/// Contexts with at least one active provider, sorted.
	pub fn contexts(&self) -> Vec<String> {
		let mut contexts: Vec<_> = self.inner.read().contexts.keys().cloned().collect();
		contexts.sort();
		contexts
	}
}
