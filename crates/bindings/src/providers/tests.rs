use pretty_assertions::assert_eq;
use scrivener_primitives::Bindings;

use super::*;
use crate::{ProtectedBindings, ScopeError};

struct Named(&'static str);

impl BindingsValuesProvider for Named {
	fn name(&self) -> &str {
		self.0
	}

	fn add_bindings(&self, _bindings: &mut ProtectedBindings<'_>) -> Result<(), ScopeError> {
		Ok(())
	}
}

fn strings(values: &[&str]) -> Vec<String> {
	values.iter().map(|s| s.to_string()).collect()
}

fn order(registry: &ProviderRegistry, context: &str, names: &[&str], compatible: &[&str]) -> Vec<String> {
	registry
		.providers_for(context, &strings(names), &strings(compatible))
		.iter()
		.map(|p| p.name().to_string())
		.collect()
}

fn active() -> ProviderRegistry {
	let registry = ProviderRegistry::new();
	registry.activate();
	registry
}

#[test]
fn tiers_apply_generic_then_compatible_then_exact() {
	let registry = active();
	registry.register(Arc::new(Named("exact")), ProviderRegistration::for_language("groovy", -100));
	registry.register(Arc::new(Named("compatible")), ProviderRegistration::for_language("java", 0));
	registry.register(Arc::new(Named("generic")), ProviderRegistration::generic(100));
	registry.register(Arc::new(Named("other-language")), ProviderRegistration::for_language("js", 0));

	assert_eq!(order(&registry, DEFAULT_CONTEXT, &["groovy"], &["java"]), vec!["generic", "compatible", "exact"]);
}

#[test]
fn ascending_rank_within_a_tier_with_newer_first_on_ties() {
	let registry = active();
	registry.register(Arc::new(Named("high")), ProviderRegistration::generic(10));
	registry.register(Arc::new(Named("low")), ProviderRegistration::generic(-1));
	registry.register(Arc::new(Named("old-zero")), ProviderRegistration::generic(0));
	registry.register(Arc::new(Named("new-zero")), ProviderRegistration::generic(0));

	assert_eq!(order(&registry, DEFAULT_CONTEXT, &[], &[]), vec!["low", "new-zero", "old-zero", "high"]);
}

#[test]
fn contexts_are_isolated() {
	let registry = active();
	registry.register(Arc::new(Named("default")), ProviderRegistration::generic(0));
	registry.register(Arc::new(Named("other")), ProviderRegistration::generic(0).in_context("other"));
	registry.register(
		Arc::new(Named("both")),
		ProviderRegistration::generic(1).in_context("other").in_context(DEFAULT_CONTEXT),
	);

	assert_eq!(order(&registry, DEFAULT_CONTEXT, &[], &[]), vec!["default", "both"]);
	assert_eq!(order(&registry, "other", &[], &[]), vec!["other", "both"]);
	assert!(order(&registry, "missing", &[], &[]).is_empty());
	assert_eq!(registry.contexts(), vec!["other".to_string(), "request".to_string()]);
}

#[test]
fn language_keys_match_case_insensitively_and_once() {
	let registry = active();
	registry.register(
		Arc::new(Named("both")),
		ProviderRegistration {
			rank: 0,
			contexts: Vec::new(),
			languages: strings(&["ECMAScript", "JS"]),
		},
	);

	assert_eq!(order(&registry, DEFAULT_CONTEXT, &["js"], &["ecmascript"]), vec!["both"]);
}

#[test]
fn registrations_queue_until_activation() {
	let registry = ProviderRegistry::new();
	let first = registry.register(Arc::new(Named("first")), ProviderRegistration::generic(0));
	let dropped = registry.register(Arc::new(Named("dropped")), ProviderRegistration::generic(0));
	assert!(!registry.is_active());
	assert!(order(&registry, DEFAULT_CONTEXT, &[], &[]).is_empty());

	assert!(registry.unregister(dropped));
	assert_eq!(registry.activate(), 1);
	assert_eq!(registry.activate(), 0);
	assert_eq!(order(&registry, DEFAULT_CONTEXT, &[], &[]), vec!["first"]);

	assert!(registry.unregister(first));
	assert!(!registry.unregister(first));
	assert!(registry.contexts().is_empty());
}

#[test]
fn static_providers_copy_their_map() {
	let mut values = Bindings::new();
	values.insert("foo", 1i64);
	let provider = crate::StaticBindingsProvider::new("static", values);

	let mut scope = Bindings::new();
	provider.add_bindings(&mut ProtectedBindings::new(&mut scope)).unwrap();
	assert_eq!(scope.data("foo"), Some(&serde_json::Value::from(1)));
	assert_eq!(provider.name(), "static");
}
