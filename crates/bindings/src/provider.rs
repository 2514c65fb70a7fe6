use scrivener_primitives::Bindings;

use crate::{ProtectedBindings, ScopeError};

/// Contributes bindings to every scope it is registered for.
pub trait BindingsValuesProvider: Send + Sync {
	/// Name used in timing diagnostics and errors.
	fn name(&self) -> &str {
		std::any::type_name::<Self>()
	}

	fn add_bindings(&self, bindings: &mut ProtectedBindings<'_>) -> Result<(), ScopeError>;
}

/// Copies a fixed map into each scope.
pub struct StaticBindingsProvider {
	name: String,
	values: Bindings,
}

impl StaticBindingsProvider {
	pub fn new(name: impl Into<String>, values: Bindings) -> Self {
		Self { name: name.into(), values }
	}
}

impl BindingsValuesProvider for StaticBindingsProvider {
	fn name(&self) -> &str {
		&self.name
	}

	fn add_bindings(&self, bindings: &mut ProtectedBindings<'_>) -> Result<(), ScopeError> {
		bindings.put_all(&self.values)
	}
}
