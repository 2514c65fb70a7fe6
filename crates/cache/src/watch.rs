use std::collections::BTreeSet;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Glob patterns derived from a set of script extensions.
#[derive(Debug, Clone)]
pub struct WatchSet {
	extensions: BTreeSet<String>,
	patterns: Vec<String>,
	matcher: GlobSet,
}

impl WatchSet {
	/// Builds one `**/*.{ext}` pattern per extension. Matching ignores case,
	/// as engine resolution does.
	pub fn derive(extensions: BTreeSet<String>) -> Self {
		let mut builder = GlobSetBuilder::new();
		let mut patterns = Vec::with_capacity(extensions.len());
		for ext in &extensions {
			let pattern = format!("**/*.{ext}");
			match GlobBuilder::new(&pattern).case_insensitive(true).build() {
				Ok(glob) => {
					builder.add(glob);
					patterns.push(pattern);
				}
				Err(err) => tracing::warn!(extension = %ext, error = %err, "unwatchable script extension"),
			}
		}
		let matcher = builder.build().unwrap_or_else(|err| {
			tracing::warn!(error = %err, "watch set failed to compile");
			GlobSet::empty()
		});
		Self {
			extensions,
			patterns,
			matcher,
		}
	}

	pub fn empty() -> Self {
		Self::derive(BTreeSet::new())
	}

	pub fn extensions(&self) -> &BTreeSet<String> {
		&self.extensions
	}

	pub fn patterns(&self) -> &[String] {
		&self.patterns
	}

	pub fn matches(&self, path: &str) -> bool {
		self.matcher.is_match(path)
	}
}
