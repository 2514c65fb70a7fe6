//! Worker primitives shared by scrivener components.
//!
//! Provides named-thread spawning and the [`BackgroundQueue`], a single
//! dedicated thread that runs fire-and-forget jobs in submission order so
//! notifying threads never block on the work they trigger.

mod queue;
mod spawn;

pub use queue::{BackgroundQueue, ShutdownReport};
pub use spawn::spawn_named_thread;
