use std::io::{self, Read};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use scrivener_primitives::{
	EngineError, MemoryOutput, ProgressTracker, Request, Resource, ResourceResolver, Response, ScriptContext,
	ScriptEngine, ScriptEngineFactory, ScriptReader, ScriptWriter,
};
use scrivener_registry::{
	Capability, DirectoryError, EngineDescriptor, EngineProperties, EngineRegistry, ServiceDirectory, ServiceId, ServiceRef,
};
use serde_json::Value;

pub struct Node(pub String);

impl Resource for Node {
	fn path(&self) -> &str {
		&self.0
	}

	fn open(&self) -> io::Result<Box<dyn Read + Send>> {
		Ok(Box::new(io::empty()))
	}
}

#[derive(Default)]
pub struct Tree {
	pub nodes: FxHashMap<String, Arc<Node>>,
}

impl Tree {
	pub fn with(paths: &[&str]) -> Arc<Self> {
		Arc::new(Self {
			nodes: paths.iter().map(|p| (p.to_string(), Arc::new(Node(p.to_string())))).collect(),
		})
	}
}

impl ResourceResolver for Tree {
	fn resolve(&self, path: &str) -> Option<Arc<dyn Resource>> {
		self.nodes.get(path).map(|n| Arc::clone(n) as Arc<dyn Resource>)
	}
}

#[derive(Default)]
pub struct Progress {
	pub lines: Mutex<Vec<String>>,
}

impl ProgressTracker for Progress {
	fn log(&self, message: &str) {
		self.lines.lock().push(message.to_string());
	}
}

pub struct FakeRequest {
	pub resource: Arc<dyn Resource>,
	pub resolver: Arc<dyn ResourceResolver>,
	pub progress: Arc<Progress>,
}

impl FakeRequest {
	pub fn new(path: &str) -> Arc<Self> {
		Arc::new(Self {
			resource: Arc::new(Node(path.to_string())),
			resolver: Tree::with(&[path]),
			progress: Arc::new(Progress::default()),
		})
	}
}

impl Request for FakeRequest {
	fn path(&self) -> &str {
		self.resource.path()
	}

	fn resource(&self) -> Arc<dyn Resource> {
		Arc::clone(&self.resource)
	}

	fn resolver(&self) -> Arc<dyn ResourceResolver> {
		Arc::clone(&self.resolver)
	}

	fn reader(&self) -> ScriptReader {
		ScriptReader::empty()
	}

	fn attribute(&self, _name: &str) -> Option<Value> {
		None
	}

	fn set_attribute(&self, _name: &str, _value: Value) {}

	fn progress(&self) -> Option<Arc<dyn ProgressTracker>> {
		Some(Arc::clone(&self.progress) as Arc<dyn ProgressTracker>)
	}
}

#[derive(Default)]
pub struct FakeResponse {
	pub output: MemoryOutput,
}

impl Response for FakeResponse {
	fn writer(&self) -> ScriptWriter {
		self.output.writer()
	}
}

struct NullEngine;

impl ScriptEngine for NullEngine {
	fn eval(&self, _source: &mut dyn Read, _ctx: &mut ScriptContext) -> Result<Value, EngineError> {
		Ok(Value::Null)
	}
}

pub struct Factory {
	pub name: &'static str,
	pub compatible: Vec<String>,
}

impl ScriptEngineFactory for Factory {
	fn engine_name(&self) -> &str {
		self.name
	}

	fn names(&self) -> Vec<String> {
		vec![self.name.to_string()]
	}

	fn extensions(&self) -> Vec<String> {
		vec![self.name.to_string()]
	}

	fn language_name(&self) -> &str {
		self.name
	}

	fn compatible_languages(&self) -> Vec<String> {
		self.compatible.clone()
	}

	fn script_engine(&self) -> Arc<dyn ScriptEngine> {
		Arc::new(NullEngine)
	}
}

/// Registers an engine named `name` and returns its descriptor.
pub fn engine(name: &'static str, compatible: &[&str]) -> Arc<EngineDescriptor> {
	let registry = EngineRegistry::new();
	let factory = Arc::new(Factory {
		name,
		compatible: compatible.iter().map(|c| c.to_string()).collect(),
	});
	registry.register(factory, EngineProperties::default()).unwrap();
	registry.by_name(name).unwrap()
}

pub trait Clock: Send + Sync {
	fn now(&self) -> u64;
}

pub struct Fixed(pub u64);

impl Clock for Fixed {
	fn now(&self) -> u64 {
		self.0
	}
}

/// Publishes two clocks, ranked 0 and 9. With `stray` set it also answers
/// with a handle registered under a different capability.
#[derive(Default)]
pub struct Directory {
	pub stray: bool,
	pub released: Mutex<Vec<ServiceId>>,
}

impl ServiceDirectory for Directory {
	fn services(&self, capability: Capability, _filter: Option<&str>) -> Result<Vec<ServiceRef>, DirectoryError> {
		let mut refs = Vec::new();
		if self.stray {
			refs.push(ServiceRef::new::<Fixed>(ServiceId(3), 99, Arc::new(Fixed(3))));
		}
		if capability == Capability::of::<dyn Clock>() {
			refs.push(ServiceRef::new::<dyn Clock>(ServiceId(1), 0, Arc::new(Fixed(1))));
			refs.push(ServiceRef::new::<dyn Clock>(ServiceId(2), 9, Arc::new(Fixed(2))));
		}
		Ok(refs)
	}

	fn release(&self, id: ServiceId) {
		self.released.lock().push(id);
	}
}
