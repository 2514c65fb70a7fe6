use scrivener_primitives::{BindingValue, Bindings};
use serde_json::Value;

use crate::ScopeError;
use crate::keys::is_reserved;

/// Write guard over a scope's bindings that refuses to touch reserved keys.
pub struct ProtectedBindings<'a> {
	inner: &'a mut Bindings,
}

impl<'a> ProtectedBindings<'a> {
	pub fn new(inner: &'a mut Bindings) -> Self {
		Self { inner }
	}

	/// Inserts or replaces `key`, returning the previous value.
	pub fn put(&mut self, key: impl Into<String>, value: impl Into<BindingValue>) -> Result<Option<BindingValue>, ScopeError> {
		let key = key.into();
		if is_reserved(&key) {
			return Err(ScopeError::ReservedKey { key });
		}
		Ok(self.inner.insert(key, value))
	}

	/// Copies every entry of `values`, stopping at the first reserved key.
	pub fn put_all(&mut self, values: &Bindings) -> Result<(), ScopeError> {
		if let Some(key) = values.keys().find(|k| is_reserved(k)) {
			return Err(ScopeError::ReservedKey { key: key.to_string() });
		}
		for (key, value) in values.iter() {
			self.inner.insert(key, value.clone());
		}
		Ok(())
	}

	pub fn remove(&mut self, key: &str) -> Result<Option<BindingValue>, ScopeError> {
		if is_reserved(key) {
			return Err(ScopeError::ReservedKey { key: key.to_string() });
		}
		Ok(self.inner.remove(key))
	}

	pub fn get(&self, key: &str) -> Option<&BindingValue> {
		self.inner.get(key)
	}

	pub fn data(&self, key: &str) -> Option<&Value> {
		self.inner.data(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.inner.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}
