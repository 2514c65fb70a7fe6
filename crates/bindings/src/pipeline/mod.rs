//! Per-execution scope construction.
//!
//! A scope is assembled in layers:
//!
//! 1. Base bindings (helper, request, response, resource, resolver, reader,
//!    writer, logger, script identity), present only when the execution has
//!    a request/response pair.
//! 2. Caller bindings that do not collide with a base key.
//! 3. Provider contributions, written through [`ProtectedBindings`].
//!
//! The helper resolves its script resource lazily, on first access.

use std::sync::Arc;
use std::time::{Duration, Instant};

use scrivener_primitives::{BindingValue, Bindings, Request, Response, ScriptIdentity, ScriptLogger, ScriptReader, ScriptWriter};
use scrivener_registry::{EngineDescriptor, ServiceCache};

use crate::keys::{self, is_reserved};
use crate::providers::{DEFAULT_CONTEXT, ProviderRegistry};
use crate::{ProtectedBindings, ScopeError, ScriptHelper};


#[derive(Debug, Clone)]
pub struct PipelineConfig {
	/// Providers slower than this are reported.
	pub slow_provider_threshold: Duration,
	/// Context used when an execution names none.
	pub default_context: String,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			slow_provider_threshold: Duration::from_millis(1),
			default_context: DEFAULT_CONTEXT.to_string(),
		}
	}
}

/// Inputs to one scope construction.
pub struct ExecutionRequest {
	pub script: ScriptIdentity,
	pub engine: Arc<EngineDescriptor>,
	pub context: Option<String>,
	pub request: Option<Arc<dyn Request>>,
	pub response: Option<Arc<dyn Response>>,
	/// Caller bindings. May carry a pre-built helper under the helper key.
	pub bindings: Bindings,
}

impl ExecutionRequest {
	pub fn new(script: ScriptIdentity, engine: Arc<EngineDescriptor>) -> Self {
		Self {
			script,
			engine,
			context: None,
			request: None,
			response: None,
			bindings: Bindings::new(),
		}
	}

	pub fn with_request(mut self, request: Arc<dyn Request>, response: Arc<dyn Response>) -> Self {
		self.request = Some(request);
		self.response = Some(response);
		self
	}

	pub fn with_bindings(mut self, bindings: Bindings) -> Self {
		self.bindings = bindings;
		self
	}

	pub fn in_context(mut self, context: impl Into<String>) -> Self {
		self.context = Some(context.into());
		self
	}
}

/// Bindings assembled for one execution plus the helper they reference.
pub struct Scope {
	bindings: Bindings,
	script: ScriptIdentity,
	context: String,
	helper: Option<Arc<ScriptHelper>>,
	owns_helper: bool,
}

impl Scope {
	pub fn bindings(&self) -> &Bindings {
		&self.bindings
	}

	pub fn script(&self) -> &ScriptIdentity {
		&self.script
	}

	pub fn context(&self) -> &str {
		&self.context
	}

	pub fn helper(&self) -> Option<&Arc<ScriptHelper>> {
		self.helper.as_ref()
	}

	/// True if the helper was created for this scope and must be disposed
	/// with it.
	pub fn owns_helper(&self) -> bool {
		self.owns_helper
	}

	/// Output writer bound under the `out` key.
	pub fn writer(&self) -> Option<ScriptWriter> {
		self.bindings.get(keys::OUT).and_then(BindingValue::as_writer).cloned()
	}

	pub fn reader(&self) -> Option<ScriptReader> {
		self.bindings.get(keys::READER).and_then(BindingValue::as_reader).cloned()
	}

	/// Splits the scope into its bindings and a guard that disposes an owned
	/// helper when dropped.
	pub fn into_parts(self) -> (Bindings, ScopeGuard) {
		let helper = if self.owns_helper { self.helper } else { None };
		(self.bindings, ScopeGuard { helper })
	}

	pub fn dispose(self) {
		drop(self.into_parts());
	}
}

/// Disposes an owned helper on drop.
pub struct ScopeGuard {
	helper: Option<Arc<ScriptHelper>>,
}

impl Drop for ScopeGuard {
	fn drop(&mut self) {
		if let Some(helper) = self.helper.take() {
			helper.dispose();
		}
	}
}

/// Builds execution scopes.
pub struct BindingsPipeline {
	providers: Arc<ProviderRegistry>,
	services: Option<Arc<ServiceCache>>,
	config: PipelineConfig,
}

impl BindingsPipeline {
	pub fn new(providers: Arc<ProviderRegistry>, services: Option<Arc<ServiceCache>>, config: PipelineConfig) -> Self {
		Self {
			providers,
			services,
			config,
		}
	}

	pub fn providers(&self) -> &Arc<ProviderRegistry> {
		&self.providers
	}

	pub fn config(&self) -> &PipelineConfig {
		&self.config
	}

	pub fn build_scope(&self, exec: ExecutionRequest) -> Result<Scope, ScopeError> {
		let ExecutionRequest {
			script,
			engine,
			context,
			request,
			response,
			mut bindings,
		} = exec;

		let supplied_helper = match bindings.remove(keys::HELPER) {
			None => None,
			Some(value) => Some(value.downcast::<ScriptHelper>().ok_or(ScopeError::InconsistentHelper { field: "helper" })?),
		};

		let request = agree(
			"request",
			[
				request,
				bindings.get(keys::REQUEST).and_then(BindingValue::as_request).cloned(),
				supplied_helper.as_ref().map(|h| Arc::clone(h.request())),
			],
		)?;
		let response = agree(
			"response",
			[
				response,
				bindings.get(keys::RESPONSE).and_then(BindingValue::as_response).cloned(),
				supplied_helper.as_ref().map(|h| Arc::clone(h.response())),
			],
		)?;

		let mut scope = Bindings::with_capacity(bindings.len() + keys::RESERVED.len());
		let mut helper = None;
		let mut owns_helper = false;

		match (request, response) {
			(Some(_), None) => return Err(ScopeError::MissingResponse),
			(Some(request), Some(response)) => {
				let resource = agree(
					"resource",
					[
						bindings.get(keys::RESOURCE).and_then(BindingValue::as_resource).cloned(),
						supplied_helper.as_ref().map(|h| Arc::clone(h.resource())),
					],
				)?
				.unwrap_or_else(|| request.resource());
				let resolver = agree(
					"resolver",
					[
						bindings.get(keys::RESOLVER).and_then(BindingValue::as_resolver).cloned(),
						supplied_helper.as_ref().map(|h| Arc::clone(h.resolver())),
					],
				)?
				.unwrap_or_else(|| request.resolver());

				let reader = bindings
					.get(keys::READER)
					.and_then(BindingValue::as_reader)
					.cloned()
					.unwrap_or_else(|| request.reader());
				let out = bindings
					.get(keys::OUT)
					.and_then(BindingValue::as_writer)
					.cloned()
					.unwrap_or_else(|| response.writer());

				let scope_helper = match supplied_helper {
					Some(h) => h,
					None => {
						owns_helper = true;
						Arc::new(ScriptHelper::new(
							Arc::clone(&request),
							Arc::clone(&response),
							Arc::clone(&resource),
							Arc::clone(&resolver),
							script.clone(),
							self.services.clone(),
						))
					}
				};

				scope.insert(keys::HELPER, BindingValue::object(Arc::clone(&scope_helper)));
				scope.insert(keys::REQUEST, BindingValue::Request(request));
				scope.insert(keys::RESPONSE, BindingValue::Response(response));
				scope.insert(keys::RESOURCE, BindingValue::Resource(resource));
				scope.insert(keys::RESOLVER, BindingValue::Resolver(resolver));
				scope.insert(keys::READER, reader);
				scope.insert(keys::OUT, out);
				scope.insert(keys::LOG, BindingValue::Logger(ScriptLogger::new(script.path())));
				scope.insert(keys::SCRIPT, script.to_value());
				helper = Some(scope_helper);
			}
			(None, _) => {}
		}

		for (key, value) in bindings {
			if helper.is_some() && is_reserved(&key) {
				continue;
			}
			scope.insert(key, value);
		}

		// Releases an owned helper if a provider fails below.
		let mut pending = ScopeGuard {
			helper: if owns_helper { helper.clone() } else { None },
		};
		let context = context.unwrap_or_else(|| self.config.default_context.clone());
		let progress = helper.as_ref().and_then(|h| h.request().progress());
		let providers = self.providers.providers_for_engine(&context, &engine);
		let mut protected = ProtectedBindings::new(&mut scope);
		for provider in &providers {
			let started = Instant::now();
			provider.add_bindings(&mut protected)?;
			let elapsed = started.elapsed();
			if elapsed > self.config.slow_provider_threshold {
				let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
				tracing::debug!(provider = provider.name(), elapsed_us = micros, script = %script, "slow bindings provider");
				if let Some(progress) = &progress {
					progress.log(&format!("bindings provider {} took {micros}us", provider.name()));
				}
			}
		}

		pending.helper = None;

		tracing::trace!(
			script = %script,
			context = %context,
			providers = providers.len(),
			bindings = scope.len(),
			"scope built"
		);
		Ok(Scope {
			bindings: scope,
			script,
			context,
			helper,
			owns_helper,
		})
	}
}

/// Returns the one handle every present candidate points at.
fn agree<T: ?Sized, const N: usize>(field: &'static str, candidates: [Option<Arc<T>>; N]) -> Result<Option<Arc<T>>, ScopeError> {
	let mut chosen: Option<Arc<T>> = None;
	for candidate in candidates.into_iter().flatten() {
		match &chosen {
			None => chosen = Some(candidate),
			Some(existing) if std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&candidate)) => {}
			Some(_) => return Err(ScopeError::InconsistentHelper { field }),
		}
	}
	Ok(chosen)
}
