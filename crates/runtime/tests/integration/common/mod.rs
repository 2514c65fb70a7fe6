//! Fakes shared by the runtime integration tests.

use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use scrivener_primitives::{
	ChangeEvent, ChangeListener, ChangeSource, Compilable, CompiledScript, EngineError, MemoryOutput, Request, Resource,
	ResourceResolver, Response, ScriptContext, ScriptEngine, ScriptEngineFactory, ScriptReader, ScriptWriter,
	SubscriptionId,
};
use serde_json::Value;

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt::try_init();
}

/// A language whose scripts list binding names, one per line. Evaluation
/// writes `name=value` for each of them.
pub struct Lang {
	pub name: &'static str,
	pub extensions: Vec<String>,
	pub compiling: bool,
	pub compiles: Arc<AtomicUsize>,
}

impl Lang {
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			extensions: vec![name.to_string()],
			compiling: false,
			compiles: Arc::default(),
		}
	}

	pub fn compiling(mut self) -> Self {
		self.compiling = true;
		self
	}

	pub fn extensions(mut self, extensions: &[&str]) -> Self {
		self.extensions = extensions.iter().map(|e| e.to_string()).collect();
		self
	}

	pub fn arc(self) -> Arc<dyn ScriptEngineFactory> {
		Arc::new(self)
	}
}

impl ScriptEngineFactory for Lang {
	fn engine_name(&self) -> &str {
		self.name
	}

	fn names(&self) -> Vec<String> {
		vec![self.name.to_string()]
	}

	fn extensions(&self) -> Vec<String> {
		self.extensions.clone()
	}

	fn language_name(&self) -> &str {
		self.name
	}

	fn supports_compilation(&self) -> bool {
		self.compiling
	}

	fn script_engine(&self) -> Arc<dyn ScriptEngine> {
		Arc::new(Lookup {
			compiling: self.compiling,
			compiles: Arc::clone(&self.compiles),
		})
	}
}

struct Lookup {
	compiling: bool,
	compiles: Arc<AtomicUsize>,
}

impl ScriptEngine for Lookup {
	fn eval(&self, source: &mut dyn Read, ctx: &mut ScriptContext) -> Result<Value, EngineError> {
		Names::read(source)?.eval(ctx)
	}

	fn as_compilable(&self) -> Option<&dyn Compilable> {
		self.compiling.then_some(self as &dyn Compilable)
	}
}

impl Compilable for Lookup {
	fn compile(&self, source: &mut dyn Read) -> Result<Arc<dyn CompiledScript>, EngineError> {
		self.compiles.fetch_add(1, Ordering::SeqCst);
		Ok(Arc::new(Names::read(source)?))
	}
}

struct Names(Vec<String>);

impl Names {
	fn read(source: &mut dyn Read) -> Result<Self, EngineError> {
		let mut text = String::new();
		source.read_to_string(&mut text)?;
		Ok(Self(text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()))
	}
}

impl CompiledScript for Names {
	fn eval(&self, ctx: &mut ScriptContext) -> Result<Value, EngineError> {
		let lines: Vec<String> = self
			.0
			.iter()
			.map(|name| match ctx.bindings.data(name) {
				Some(value) => format!("{name}={value}"),
				None => format!("{name}=-"),
			})
			.collect();
		let rendered = lines.join("\n");
		ctx.writer.write_str(&rendered)?;
		Ok(Value::String(rendered))
	}
}

/// In-memory script or content node.
#[derive(Default)]
pub struct Script {
	pub path: String,
	pub body: String,
	/// `(extension, language)` hints declared on this node.
	pub hints: Vec<(String, String)>,
}

impl Script {
	pub fn new(path: &str, body: &str) -> Arc<Self> {
		Arc::new(Self {
			path: path.to_string(),
			body: body.to_string(),
			hints: Vec::new(),
		})
	}

	pub fn hinted(path: &str, extension: &str, language: &str) -> Arc<Self> {
		Arc::new(Self {
			path: path.to_string(),
			hints: vec![(extension.to_string(), language.to_string())],
			..Self::default()
		})
	}
}

impl Resource for Script {
	fn path(&self) -> &str {
		&self.path
	}

	fn open(&self) -> io::Result<Box<dyn Read + Send>> {
		Ok(Box::new(Cursor::new(self.body.clone().into_bytes())))
	}

	fn language_hint(&self, extension: &str) -> Option<String> {
		self.hints.iter().find(|(ext, _)| ext == extension).map(|(_, lang)| lang.clone())
	}
}

#[derive(Default)]
pub struct Tree {
	nodes: Mutex<Vec<Arc<Script>>>,
}

impl Tree {
	pub fn with(nodes: Vec<Arc<Script>>) -> Arc<Self> {
		Arc::new(Self { nodes: Mutex::new(nodes) })
	}
}

impl ResourceResolver for Tree {
	fn resolve(&self, path: &str) -> Option<Arc<dyn Resource>> {
		self.nodes
			.lock()
			.iter()
			.find(|n| n.path == path)
			.map(|n| Arc::clone(n) as Arc<dyn Resource>)
	}
}

pub struct Page {
	pub resource: Arc<Script>,
	pub resolver: Arc<Tree>,
}

impl Page {
	pub fn at(path: &str, resolver: Arc<Tree>) -> Arc<Self> {
		Arc::new(Self {
			resource: Script::new(path, ""),
			resolver,
		})
	}
}

impl Request for Page {
	fn path(&self) -> &str {
		&self.resource.path
	}

	fn resource(&self) -> Arc<dyn Resource> {
		Arc::clone(&self.resource) as Arc<dyn Resource>
	}

	fn resolver(&self) -> Arc<dyn ResourceResolver> {
		Arc::clone(&self.resolver) as Arc<dyn ResourceResolver>
	}

	fn reader(&self) -> ScriptReader {
		ScriptReader::empty()
	}

	fn attribute(&self, _name: &str) -> Option<Value> {
		None
	}

	fn set_attribute(&self, _name: &str, _value: Value) {}
}

#[derive(Default)]
pub struct Output(pub MemoryOutput);

impl Response for Output {
	fn writer(&self) -> ScriptWriter {
		self.0.writer()
	}
}

/// Change source that delivers events synchronously to every subscriber.
#[derive(Default)]
pub struct Changes {
	next: AtomicU64,
	subscriptions: Mutex<Vec<(SubscriptionId, Vec<String>, Arc<dyn ChangeListener>)>>,
}

impl Changes {
	pub fn patterns(&self) -> Vec<String> {
		self.subscriptions.lock().iter().flat_map(|(_, p, _)| p.clone()).collect()
	}

	pub fn emit(&self, events: &[ChangeEvent]) {
		let listeners: Vec<_> = self.subscriptions.lock().iter().map(|(_, _, l)| Arc::clone(l)).collect();
		for listener in listeners {
			listener.on_change(events);
		}
	}
}

impl ChangeSource for Changes {
	fn subscribe(&self, patterns: &[String], listener: Arc<dyn ChangeListener>) -> SubscriptionId {
		let id = SubscriptionId(self.next.fetch_add(1, Ordering::SeqCst));
		self.subscriptions.lock().push((id, patterns.to_vec(), listener));
		id
	}

	fn unsubscribe(&self, id: SubscriptionId) {
		self.subscriptions.lock().retain(|(sid, _, _)| *sid != id);
	}
}
