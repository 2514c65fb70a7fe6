//! Core types shared by every scrivener crate: binding values, script I/O
//! channels, collaborator contracts and script engine traits.

/// Change-notification contracts.
pub mod change;
/// Script engine contracts and evaluation context.
pub mod engine;
/// Script reader and writer channels.
pub mod io;
/// Script-facing logger.
pub mod logger;
/// Request, response and progress tracking contracts.
pub mod request;
/// Resource and resolver contracts plus path helpers.
pub mod resource;
/// Identity of an executing script.
pub mod script;
/// Binding values and the ordered binding map.
pub mod value;

pub use change::{ChangeEvent, ChangeKind, ChangeListener, ChangeSource, SubscriptionId};
pub use engine::{
	Compilable, CompiledScript, EngineError, Invocable, MethodCall, ScriptContext, ScriptEngine,
	ScriptEngineFactory,
};
pub use io::{MemoryOutput, ScriptReader, ScriptWriter};
pub use logger::ScriptLogger;
pub use request::{ProgressTracker, Request, Response};
pub use resource::{Resource, ResourceResolver, extension, parent_path};
pub use script::ScriptIdentity;
pub use value::{BindingValue, Bindings};
