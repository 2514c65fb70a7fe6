//! Runtime configuration loaded from TOML.
//!
//! Every field has a default; absent sections and keys fall back to it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use scrivener_bindings::{DEFAULT_CONTEXT, PipelineConfig};
use scrivener_cache::DEFAULT_CAPACITY;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
	pub cache: CacheConfig,
	pub bindings: BindingsConfig,
	pub worker: WorkerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
	/// Maximum number of compiled scripts kept.
	pub capacity: usize,
	/// Extensions watched for changes besides those of compiling engines.
	pub additional_extensions: Vec<String>,
}

impl Default for CacheConfig {
	fn default() -> Self {
		Self {
			capacity: DEFAULT_CAPACITY,
			additional_extensions: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindingsConfig {
	pub slow_provider_threshold_us: u64,
	pub default_context: String,
}

impl Default for BindingsConfig {
	fn default() -> Self {
		Self {
			slow_provider_threshold_us: 1000,
			default_context: DEFAULT_CONTEXT.to_string(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
	/// Budget for draining queued invalidations on shutdown.
	pub shutdown_timeout_ms: u64,
}

impl Default for WorkerConfig {
	fn default() -> Self {
		Self { shutdown_timeout_ms: 500 }
	}
}

impl RuntimeConfig {
	pub fn parse(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::parse(&input)?;
		tracing::debug!(path = %path.display(), "runtime config loaded");
		Ok(config)
	}

	pub fn pipeline(&self) -> PipelineConfig {
		PipelineConfig {
			slow_provider_threshold: Duration::from_micros(self.bindings.slow_provider_threshold_us),
			default_context: self.bindings.default_context.clone(),
		}
	}

	pub fn shutdown_timeout(&self) -> Duration {
		Duration::from_millis(self.worker.shutdown_timeout_ms)
	}
}
