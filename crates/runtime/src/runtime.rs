use std::sync::Arc;

use scrivener_bindings::{BindingsPipeline, ExecutionRequest, ProviderRegistry};
use scrivener_cache::ScriptCache;
use scrivener_primitives::{
	Bindings, ChangeSource, MethodCall, Request, Resource, ResourceResolver, Response, ScriptIdentity, ScriptWriter,
	extension,
};
use scrivener_registry::{EngineDescriptor, EngineRegistry, ServiceCache, ServiceDirectory};
use scrivener_worker::ShutdownReport;
use serde_json::Value;

use crate::executor::{EvalOptions, ScriptExecutor};
use crate::template::TemplateEngineFactory;
use crate::{ExecuteError, RuntimeConfig};

/// Options for [`ScriptRuntime::execute`].
#[derive(Default)]
pub struct ExecuteOptions {
	pub request: Option<Arc<dyn Request>>,
	pub response: Option<Arc<dyn Response>>,
	/// Provider context; the configured default when unset.
	pub context: Option<String>,
	pub method: Option<MethodCall>,
	pub error_writer: Option<ScriptWriter>,
	/// Resolver used for language hints when there is no request.
	pub resolver: Option<Arc<dyn ResourceResolver>>,
}

impl ExecuteOptions {
	pub fn with_request(mut self, request: Arc<dyn Request>, response: Arc<dyn Response>) -> Self {
		self.request = Some(request);
		self.response = Some(response);
		self
	}

	pub fn in_context(mut self, context: impl Into<String>) -> Self {
		self.context = Some(context.into());
		self
	}

	pub fn calling(mut self, method: MethodCall) -> Self {
		self.method = Some(method);
		self
	}
}

pub struct RuntimeBuilder {
	config: RuntimeConfig,
	source: Option<Arc<dyn ChangeSource>>,
	directory: Option<Arc<dyn ServiceDirectory>>,
	platform_template: bool,
}

impl RuntimeBuilder {
	pub fn config(mut self, config: RuntimeConfig) -> Self {
		self.config = config;
		self
	}

	pub fn change_source(mut self, source: Arc<dyn ChangeSource>) -> Self {
		self.source = Some(source);
		self
	}

	pub fn service_directory(mut self, directory: Arc<dyn ServiceDirectory>) -> Self {
		self.directory = Some(directory);
		self
	}

	/// Leaves the built-in template engine unregistered.
	pub fn without_template_engine(mut self) -> Self {
		self.platform_template = false;
		self
	}

	pub fn build(self) -> std::io::Result<ScriptRuntime> {
		let engines = Arc::new(EngineRegistry::new());
		if self.platform_template
			&& let Err(err) = engines.register_platform(Arc::new(TemplateEngineFactory), 0)
		{
			tracing::warn!(error = %err, "template engine rejected");
		}

		let cache = ScriptCache::new(
			self.config.cache.capacity,
			self.config.cache.additional_extensions.iter().cloned(),
			self.source,
		)?;
		cache.activate(&engines);

		let providers = Arc::new(ProviderRegistry::new());
		providers.activate();
		let services = self.directory.map(ServiceCache::new);
		let pipeline = BindingsPipeline::new(Arc::clone(&providers), services.clone(), self.config.pipeline());
		let executor = ScriptExecutor::new(Some(Arc::clone(&cache)));

		tracing::debug!(
			capacity = self.config.cache.capacity,
			engines = engines.snapshot().len(),
			"script runtime started"
		);
		Ok(ScriptRuntime {
			config: self.config,
			engines,
			cache,
			providers,
			services,
			pipeline,
			executor,
		})
	}
}

/// Engine registry, script cache, providers and executor wired together.
pub struct ScriptRuntime {
	config: RuntimeConfig,
	engines: Arc<EngineRegistry>,
	cache: Arc<ScriptCache>,
	providers: Arc<ProviderRegistry>,
	services: Option<Arc<ServiceCache>>,
	pipeline: BindingsPipeline,
	executor: ScriptExecutor,
}

impl ScriptRuntime {
	pub fn builder() -> RuntimeBuilder {
		RuntimeBuilder {
			config: RuntimeConfig::default(),
			source: None,
			directory: None,
			platform_template: true,
		}
	}

	pub fn config(&self) -> &RuntimeConfig {
		&self.config
	}

	pub fn engines(&self) -> &Arc<EngineRegistry> {
		&self.engines
	}

	pub fn cache(&self) -> &Arc<ScriptCache> {
		&self.cache
	}

	pub fn providers(&self) -> &Arc<ProviderRegistry> {
		&self.providers
	}

	pub fn services(&self) -> Option<&Arc<ServiceCache>> {
		self.services.as_ref()
	}

	/// Engine for `script`, honoring language hints declared on it or its
	/// ancestors.
	pub fn resolve(&self, script: &dyn Resource, resolver: Option<&dyn ResourceResolver>) -> Option<Arc<EngineDescriptor>> {
		match resolver {
			Some(resolver) => self.engines.resolve_for_resource(script, resolver),
			None => {
				let hint = extension(script.path()).and_then(|ext| script.language_hint(ext));
				self.engines.resolve_script(script.path(), hint.as_deref())
			}
		}
	}

	/// Resolves, scopes and evaluates `script`.
	///
	/// Returns `Ok(None)` when no engine claims the script.
	pub fn execute(&self, script: &dyn Resource, bindings: Bindings, options: ExecuteOptions) -> Result<Option<Value>, ExecuteError> {
		let resolver = options.resolver.clone().or_else(|| options.request.as_ref().map(|r| r.resolver()));
		let Some(engine) = self.resolve(script, resolver.as_deref()) else {
			tracing::debug!(script = script.path(), "no engine for script");
			return Ok(None);
		};

		let identity = ScriptIdentity::new(script.path(), engine.engine_name());
		let mut exec = ExecutionRequest::new(identity, Arc::clone(&engine)).with_bindings(bindings);
		exec.context = options.context;
		exec.request = options.request;
		exec.response = options.response;

		let scope = self.pipeline.build_scope(exec)?;
		let eval = EvalOptions {
			method: options.method,
			error_writer: options.error_writer,
		};
		let value = self.executor.evaluate(scope, &engine, script, eval)?;
		Ok(Some(value))
	}

	/// Disposes the script cache, draining queued invalidations within the
	/// configured budget.
	pub fn shutdown(&self) -> ShutdownReport {
		self.cache.dispose(self.config.shutdown_timeout())
	}
}
