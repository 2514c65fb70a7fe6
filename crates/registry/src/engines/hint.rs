use scrivener_primitives::{Resource, ResourceResolver};

/// Finds the preferred language declared for `extension` on `resource` or the
/// nearest ancestor that declares one.
pub fn language_hint(resource: &dyn Resource, resolver: &dyn ResourceResolver, extension: &str) -> Option<String> {
	if let Some(hint) = resource.language_hint(extension) {
		return Some(hint);
	}

	let mut last_len = resource.path().len();
	let mut current = resolver.parent(resource.path());
	while let Some(node) = current {
		// Resolvers are external; only ever walk strictly upwards.
		if node.path().len() >= last_len {
			break;
		}
		if let Some(hint) = node.language_hint(extension) {
			return Some(hint);
		}
		last_len = node.path().len();
		current = resolver.parent(node.path());
	}
	None
}
