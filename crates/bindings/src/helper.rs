use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use scrivener_primitives::{Request, Resource, ResourceResolver, Response, ScriptIdentity};
use scrivener_registry::{Capability, ServiceCache, ServiceId};

/// Script-facing helper bound to one request, exposed as the `sling` binding.
///
/// Service handles fetched with [`Self::services`] are acquired from the
/// directory directly and released by [`Self::dispose`].
pub struct ScriptHelper {
	request: Arc<dyn Request>,
	response: Arc<dyn Response>,
	resource: Arc<dyn Resource>,
	resolver: Arc<dyn ResourceResolver>,
	script: ScriptIdentity,
	services: Option<Arc<ServiceCache>>,
	acquired: Mutex<Vec<ServiceId>>,
	script_resource: OnceLock<Option<Arc<dyn Resource>>>,
	disposed: AtomicBool,
}

impl ScriptHelper {
	pub fn new(
		request: Arc<dyn Request>,
		response: Arc<dyn Response>,
		resource: Arc<dyn Resource>,
		resolver: Arc<dyn ResourceResolver>,
		script: ScriptIdentity,
		services: Option<Arc<ServiceCache>>,
	) -> Self {
		Self {
			request,
			response,
			resource,
			resolver,
			script,
			services,
			acquired: Mutex::new(Vec::new()),
			script_resource: OnceLock::new(),
			disposed: AtomicBool::new(false),
		}
	}

	/// Helper whose resource and resolver come from `request`.
	pub fn for_request(
		request: Arc<dyn Request>,
		response: Arc<dyn Response>,
		script: ScriptIdentity,
		services: Option<Arc<ServiceCache>>,
	) -> Self {
		let resource = request.resource();
		let resolver = request.resolver();
		Self::new(request, response, resource, resolver, script, services)
	}

	pub fn request(&self) -> &Arc<dyn Request> {
		&self.request
	}

	pub fn response(&self) -> &Arc<dyn Response> {
		&self.response
	}

	pub fn resource(&self) -> &Arc<dyn Resource> {
		&self.resource
	}

	pub fn resolver(&self) -> &Arc<dyn ResourceResolver> {
		&self.resolver
	}

	pub fn script(&self) -> &ScriptIdentity {
		&self.script
	}

	/// The resource holding the script source, resolved on first access.
	pub fn script_resource(&self) -> Option<Arc<dyn Resource>> {
		self.script_resource.get_or_init(|| self.resolver.resolve(self.script.path())).clone()
	}

	/// Highest-priority live instance of `T`.
	pub fn service<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
		self.services.as_ref()?.get::<T>()
	}

	/// Every instance of `T` matching `filter`, highest priority first.
	///
	/// The handles stay acquired until [`Self::dispose`].
	pub fn services<T: ?Sized + 'static>(&self, filter: Option<&str>) -> Vec<Arc<T>> {
		let Some(cache) = &self.services else {
			return Vec::new();
		};
		if self.disposed.load(Ordering::Acquire) {
			tracing::warn!(script = %self.script, "service lookup on a disposed script helper");
			return Vec::new();
		}
		let capability = Capability::of::<T>();
		let mut refs = match cache.directory().services(capability, filter) {
			Ok(refs) => refs,
			Err(err) => {
				tracing::warn!(script = %self.script, capability = capability.name(), error = %err, "service lookup failed");
				return Vec::new();
			}
		};
		refs.retain(|r| r.capability() == capability);
		refs.sort_by(|a, b| b.ranking().cmp(&a.ranking()).then_with(|| a.id().cmp(&b.id())));

		let mut acquired = self.acquired.lock();
		refs.iter()
			.filter_map(|r| {
				acquired.push(r.id());
				r.get::<T>()
			})
			.collect()
	}

	/// Handles acquired through [`Self::services`] and not yet released.
	pub fn acquired(&self) -> usize {
		self.acquired.lock().len()
	}

	pub fn is_disposed(&self) -> bool {
		self.disposed.load(Ordering::Acquire)
	}

	/// Releases every acquired service handle. Idempotent.
	pub fn dispose(&self) {
		if self.disposed.swap(true, Ordering::AcqRel) {
			return;
		}
		let acquired = std::mem::take(&mut *self.acquired.lock());
		if let Some(cache) = &self.services {
			for id in &acquired {
				cache.directory().release(*id);
			}
		}
		tracing::trace!(script = %self.script, released = acquired.len(), "script helper disposed");
	}
}

impl fmt::Debug for ScriptHelper {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScriptHelper")
			.field("script", &self.script)
			.field("resource", &self.resource.path())
			.field("disposed", &self.is_disposed())
			.finish_non_exhaustive()
	}
}
