//! Published, immutable view of the registered engines.
//!
//! # Invariants
//!
//! - `engines` is sorted by [`PriorityKey`] (best first).
//! - Every association map entry points at the first engine in that order
//!   claiming the key.

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap as HashMap;

use super::collision::{AssociationCollision, AssociationKind};
use super::descriptor::EngineDescriptor;

pub struct EngineSnapshot {
	generation: u64,
	engines: Arc<[Arc<EngineDescriptor>]>,
	by_extension: HashMap<String, usize>,
	by_name: HashMap<String, usize>,
	by_mime_type: HashMap<String, usize>,
	collisions: Vec<AssociationCollision>,
}

impl EngineSnapshot {
	pub(crate) fn empty() -> Self {
		Self::build(0, Vec::new())
	}

	/// Sorts `engines` and derives the association maps.
	pub(crate) fn build(generation: u64, mut engines: Vec<Arc<EngineDescriptor>>) -> Self {
		engines.sort_by_key(|e| e.priority());

		let mut by_extension = HashMap::default();
		let mut by_name = HashMap::default();
		let mut by_mime_type = HashMap::default();
		let mut collisions = Vec::new();

		for (idx, engine) in engines.iter().enumerate() {
			claim(&engines, idx, AssociationKind::Extension, engine.extensions(), &mut by_extension, &mut collisions);
			claim(&engines, idx, AssociationKind::Name, engine.names(), &mut by_name, &mut collisions);
			claim(&engines, idx, AssociationKind::MimeType, engine.mime_types(), &mut by_mime_type, &mut collisions);
		}

		Self {
			generation,
			engines: Arc::from(engines),
			by_extension,
			by_name,
			by_mime_type,
			collisions,
		}
	}

	/// Monotonic rebuild counter; 0 for the initial empty snapshot.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// All engines in precedence order.
	pub fn engines(&self) -> &[Arc<EngineDescriptor>] {
		&self.engines
	}

	pub fn len(&self) -> usize {
		self.engines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.engines.is_empty()
	}

	pub fn by_extension(&self, extension: &str) -> Option<&Arc<EngineDescriptor>> {
		lookup(&self.engines, &self.by_extension, &extension.to_ascii_lowercase())
	}

	pub fn by_name(&self, name: &str) -> Option<&Arc<EngineDescriptor>> {
		lookup(&self.engines, &self.by_name, name)
	}

	pub fn by_mime_type(&self, mime_type: &str) -> Option<&Arc<EngineDescriptor>> {
		lookup(&self.engines, &self.by_mime_type, &mime_type.to_ascii_lowercase())
	}

	/// Every engine claiming `extension`, in precedence order.
	pub fn candidates_for_extension(&self, extension: &str) -> impl Iterator<Item = &Arc<EngineDescriptor>> + '_ {
		let extension = extension.to_ascii_lowercase();
		self.engines
			.iter()
			.filter(move |e| e.extensions().iter().any(|x| *x == extension))
	}

	/// Extensions claimed by engines that support pre-compilation.
	pub fn compilable_extensions(&self) -> BTreeSet<String> {
		self.engines
			.iter()
			.filter(|e| e.supports_compilation())
			.flat_map(|e| e.extensions().iter().cloned())
			.collect()
	}

	/// Keys claimed by more than one engine in this snapshot.
	pub fn collisions(&self) -> &[AssociationCollision] {
		&self.collisions
	}
}

impl std::fmt::Debug for EngineSnapshot {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("EngineSnapshot")
			.field("generation", &self.generation)
			.field("engines", &self.engines.len())
			.field("collisions", &self.collisions.len())
			.finish()
	}
}

fn lookup<'a>(engines: &'a [Arc<EngineDescriptor>], map: &HashMap<String, usize>, key: &str) -> Option<&'a Arc<EngineDescriptor>> {
	map.get(key).and_then(|&idx| engines.get(idx))
}

fn claim(
	engines: &[Arc<EngineDescriptor>],
	idx: usize,
	kind: AssociationKind,
	keys: &[String],
	map: &mut HashMap<String, usize>,
	collisions: &mut Vec<AssociationCollision>,
) {
	for key in keys {
		match map.get(key) {
			None => {
				map.insert(key.clone(), idx);
			}
			Some(&owner) if owner == idx => {}
			Some(&owner) => {
				let winner = engines[owner].engine_name();
				let shadowed = engines[idx].engine_name();
				tracing::debug!(%kind, key = %key, winner, shadowed, "engine association shadowed");
				collisions.push(AssociationCollision {
					kind,
					key: key.clone(),
					winner: winner.to_string(),
					shadowed: shadowed.to_string(),
				});
			}
		}
	}
}
