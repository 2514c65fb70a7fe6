use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, OnceLock};

use scrivener_primitives::{ScriptEngine, ScriptEngineFactory};

use crate::RegisterError;

/// Where an engine registration came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EngineOrigin {
	/// Built into the platform.
	Platform,
	/// Declared by a deployable package.
	Package(Arc<str>),
	/// Registered at runtime by a provider.
	Dynamic,
}

impl fmt::Display for EngineOrigin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Platform => write!(f, "platform"),
			Self::Package(name) => write!(f, "package:{name}"),
			Self::Dynamic => write!(f, "dynamic"),
		}
	}
}

/// Priority of one registration.
///
/// `Ord` sorts in precedence order: the best engine compares `Less`. Higher
/// rank wins, then the lower (earlier) origin id. Origin ids are unique per
/// registration, so the order is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriorityKey {
	pub rank: i32,
	pub origin_id: u64,
}

impl Ord for PriorityKey {
	fn cmp(&self, other: &Self) -> Ordering {
		other.rank.cmp(&self.rank).then_with(|| self.origin_id.cmp(&other.origin_id))
	}
}

impl PartialOrd for PriorityKey {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

/// Registration-time overrides for a dynamically registered factory.
///
/// `None` fields fall back to what the factory itself declares.
#[derive(Debug, Clone, Default)]
pub struct EngineProperties {
	pub rank: i32,
	pub names: Option<Vec<String>>,
	pub extensions: Option<Vec<String>>,
	pub mime_types: Option<Vec<String>>,
	pub compatible_languages: Option<Vec<String>>,
}

impl EngineProperties {
	pub fn ranked(rank: i32) -> Self {
		Self { rank, ..Self::default() }
	}
}

/// Opaque handle returned by registration, used to withdraw an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineHandle(pub(crate) u64);

impl EngineHandle {
	pub const fn origin_id(self) -> u64 {
		self.0
	}
}

/// Immutable metadata captured when an engine factory is registered.
pub struct EngineDescriptor {
	factory: Arc<dyn ScriptEngineFactory>,
	engine_name: String,
	engine_version: String,
	names: Vec<String>,
	extensions: Vec<String>,
	mime_types: Vec<String>,
	language_name: String,
	language_version: String,
	compatible_languages: Vec<String>,
	supports_compilation: bool,
	origin: EngineOrigin,
	key: PriorityKey,
	engine: OnceLock<Arc<dyn ScriptEngine>>,
}

impl EngineDescriptor {
	pub(crate) fn capture(
		factory: Arc<dyn ScriptEngineFactory>,
		origin: EngineOrigin,
		origin_id: u64,
		props: EngineProperties,
	) -> Result<Self, RegisterError> {
		let engine_name = factory.engine_name().trim().to_string();
		if engine_name.is_empty() {
			return Err(RegisterError::EmptyEngineName);
		}

		let names = props.names.unwrap_or_else(|| factory.names());
		let extensions = normalize(props.extensions.unwrap_or_else(|| factory.extensions()));
		let mime_types = normalize(props.mime_types.unwrap_or_else(|| factory.mime_types()));
		if names.is_empty() && extensions.is_empty() && mime_types.is_empty() {
			return Err(RegisterError::NoAssociations { engine: engine_name });
		}

		Ok(Self {
			engine_version: factory.engine_version().to_string(),
			language_name: factory.language_name().to_string(),
			language_version: factory.language_version().to_string(),
			compatible_languages: props.compatible_languages.unwrap_or_else(|| factory.compatible_languages()),
			supports_compilation: factory.supports_compilation(),
			engine_name,
			names,
			extensions,
			mime_types,
			origin,
			key: PriorityKey { rank: props.rank, origin_id },
			engine: OnceLock::new(),
			factory,
		})
	}

	pub fn factory(&self) -> &Arc<dyn ScriptEngineFactory> {
		&self.factory
	}

	/// Returns the engine, creating it from the factory on first use.
	pub fn engine(&self) -> Arc<dyn ScriptEngine> {
		Arc::clone(self.engine.get_or_init(|| self.factory.script_engine()))
	}

	pub fn engine_name(&self) -> &str {
		&self.engine_name
	}

	pub fn engine_version(&self) -> &str {
		&self.engine_version
	}

	pub fn names(&self) -> &[String] {
		&self.names
	}

	pub fn extensions(&self) -> &[String] {
		&self.extensions
	}

	pub fn mime_types(&self) -> &[String] {
		&self.mime_types
	}

	pub fn language_name(&self) -> &str {
		&self.language_name
	}

	pub fn language_version(&self) -> &str {
		&self.language_version
	}

	pub fn compatible_languages(&self) -> &[String] {
		&self.compatible_languages
	}

	pub fn supports_compilation(&self) -> bool {
		self.supports_compilation
	}

	pub fn origin(&self) -> &EngineOrigin {
		&self.origin
	}

	pub fn priority(&self) -> PriorityKey {
		self.key
	}

	pub fn handle(&self) -> EngineHandle {
		EngineHandle(self.key.origin_id)
	}

	/// True if `factory` is the same instance this descriptor was captured from.
	pub fn is_factory(&self, factory: &Arc<dyn ScriptEngineFactory>) -> bool {
		std::ptr::addr_eq(Arc::as_ptr(&self.factory), Arc::as_ptr(factory))
	}

	/// Case-insensitive match against the language name and engine names.
	pub fn matches_language(&self, language: &str) -> bool {
		self.language_name.eq_ignore_ascii_case(language)
			|| self.names.iter().any(|n| n.eq_ignore_ascii_case(language))
	}
}

impl fmt::Debug for EngineDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EngineDescriptor")
			.field("engine_name", &self.engine_name)
			.field("extensions", &self.extensions)
			.field("origin", &self.origin)
			.field("key", &self.key)
			.finish_non_exhaustive()
	}
}

fn normalize(values: Vec<String>) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(values.len());
	for value in values {
		let value = value.trim().trim_start_matches('.').to_ascii_lowercase();
		if !value.is_empty() && !out.contains(&value) {
			out.push(value);
		}
	}
	out
}
