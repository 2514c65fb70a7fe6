//! Compiled script cache.
//!
//! # Lifecycle
//!
//! `Unconfigured` until [`ScriptCache::activate`] subscribes it to an engine
//! registry. While `Active`, the cache watches every script extension a
//! compiling engine claims (plus configured extras) and drops entries when
//! their sources change. Each published engine set clears the cache and
//! re-derives the watch set. [`ScriptCache::dispose`] is terminal.
//!
//! # Eviction
//!
//! Entries may be dropped at any time: on overflow the least recently
//! inserted entry goes first, and [`ScriptCache::trim`] sheds entries on
//! demand. Callers always treat a miss as "compile again".

mod cache;
mod entry;
mod watch;

pub use cache::{CacheState, DEFAULT_CAPACITY, ScriptCache};
pub use entry::CachedScript;
pub use watch::WatchSet;
