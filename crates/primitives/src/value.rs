use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::io::{ScriptReader, ScriptWriter};
use crate::logger::ScriptLogger;
use crate::request::{Request, Response};
use crate::resource::{Resource, ResourceResolver};

/// A single named value visible to an executing script.
///
/// Plain data travels as JSON. Collaborator handles keep their own variants so
/// engines can reach them without downcasting; anything else is carried as an
/// opaque [`BindingValue::Object`].
#[derive(Clone)]
pub enum BindingValue {
	Data(Value),
	Request(Arc<dyn Request>),
	Response(Arc<dyn Response>),
	Resource(Arc<dyn Resource>),
	Resolver(Arc<dyn ResourceResolver>),
	Reader(ScriptReader),
	Writer(ScriptWriter),
	Logger(ScriptLogger),
	Object(Arc<dyn Any + Send + Sync>),
}

impl BindingValue {
	/// Wraps an arbitrary shared object.
	pub fn object<T: Any + Send + Sync>(value: Arc<T>) -> Self {
		Self::Object(value)
	}

	/// Returns a short label for the variant, used in diagnostics.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Data(_) => "data",
			Self::Request(_) => "request",
			Self::Response(_) => "response",
			Self::Resource(_) => "resource",
			Self::Resolver(_) => "resolver",
			Self::Reader(_) => "reader",
			Self::Writer(_) => "writer",
			Self::Logger(_) => "logger",
			Self::Object(_) => "object",
		}
	}

	pub fn as_data(&self) -> Option<&Value> {
		match self {
			Self::Data(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		self.as_data().and_then(Value::as_bool)
	}

	pub fn as_str(&self) -> Option<&str> {
		self.as_data().and_then(Value::as_str)
	}

	pub fn as_request(&self) -> Option<&Arc<dyn Request>> {
		match self {
			Self::Request(r) => Some(r),
			_ => None,
		}
	}

	pub fn as_response(&self) -> Option<&Arc<dyn Response>> {
		match self {
			Self::Response(r) => Some(r),
			_ => None,
		}
	}

	pub fn as_resource(&self) -> Option<&Arc<dyn Resource>> {
		match self {
			Self::Resource(r) => Some(r),
			_ => None,
		}
	}

	pub fn as_resolver(&self) -> Option<&Arc<dyn ResourceResolver>> {
		match self {
			Self::Resolver(r) => Some(r),
			_ => None,
		}
	}

	pub fn as_writer(&self) -> Option<&ScriptWriter> {
		match self {
			Self::Writer(w) => Some(w),
			_ => None,
		}
	}

	pub fn as_reader(&self) -> Option<&ScriptReader> {
		match self {
			Self::Reader(r) => Some(r),
			_ => None,
		}
	}

	/// Downcasts an [`BindingValue::Object`] to a concrete type.
	pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
		match self {
			Self::Object(obj) => obj.clone().downcast::<T>().ok(),
			_ => None,
		}
	}
}

impl fmt::Debug for BindingValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Data(v) => f.debug_tuple("Data").field(v).finish(),
			Self::Request(r) => f.debug_tuple("Request").field(&r.path()).finish(),
			Self::Resource(r) => f.debug_tuple("Resource").field(&r.path()).finish(),
			Self::Logger(l) => f.debug_tuple("Logger").field(&l.script()).finish(),
			other => write!(f, "{}(..)", other.kind()),
		}
	}
}

impl From<Value> for BindingValue {
	fn from(value: Value) -> Self {
		Self::Data(value)
	}
}

impl From<&str> for BindingValue {
	fn from(value: &str) -> Self {
		Self::Data(Value::String(value.to_owned()))
	}
}

impl From<String> for BindingValue {
	fn from(value: String) -> Self {
		Self::Data(Value::String(value))
	}
}

impl From<bool> for BindingValue {
	fn from(value: bool) -> Self {
		Self::Data(Value::Bool(value))
	}
}

impl From<i64> for BindingValue {
	fn from(value: i64) -> Self {
		Self::Data(Value::from(value))
	}
}

impl From<ScriptWriter> for BindingValue {
	fn from(value: ScriptWriter) -> Self {
		Self::Writer(value)
	}
}

impl From<ScriptReader> for BindingValue {
	fn from(value: ScriptReader) -> Self {
		Self::Reader(value)
	}
}

/// Insertion-ordered map of named binding values.
#[derive(Clone, Default, Debug)]
pub struct Bindings {
	entries: IndexMap<String, BindingValue>,
}

impl Bindings {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			entries: IndexMap::with_capacity(capacity),
		}
	}

	/// Inserts a value, returning the one it replaced.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<BindingValue>) -> Option<BindingValue> {
		self.entries.insert(key.into(), value.into())
	}

	pub fn get(&self, key: &str) -> Option<&BindingValue> {
		self.entries.get(key)
	}

	/// Returns the JSON payload stored under `key`, if it is plain data.
	pub fn data(&self, key: &str) -> Option<&Value> {
		self.get(key).and_then(BindingValue::as_data)
	}

	/// Returns true when `key` holds the boolean `true`.
	pub fn flag(&self, key: &str) -> bool {
		self.get(key).and_then(BindingValue::as_bool).unwrap_or(false)
	}

	/// Removes a value, preserving the order of the remaining entries.
	pub fn remove(&mut self, key: &str) -> Option<BindingValue> {
		self.entries.shift_remove(key)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &BindingValue)> + '_ {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}
}

impl FromIterator<(String, BindingValue)> for Bindings {
	fn from_iter<I: IntoIterator<Item = (String, BindingValue)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().collect(),
		}
	}
}

impl IntoIterator for Bindings {
	type Item = (String, BindingValue);
	type IntoIter = indexmap::map::IntoIter<String, BindingValue>;

	fn into_iter(self) -> Self::IntoIter {
		self.entries.into_iter()
	}
}

impl Extend<(String, BindingValue)> for Bindings {
	fn extend<I: IntoIterator<Item = (String, BindingValue)>>(&mut self, iter: I) {
		self.entries.extend(iter);
	}
}
