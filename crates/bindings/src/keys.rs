//! Reserved binding names.
//!
//! Base bindings are written once by the pipeline; providers may read them
//! but never replace or remove them.

/// The script helper ([`crate::ScriptHelper`]).
pub const HELPER: &str = "sling";
pub const REQUEST: &str = "request";
pub const RESPONSE: &str = "response";
pub const RESOURCE: &str = "resource";
pub const RESOLVER: &str = "resolver";
pub const READER: &str = "reader";
/// Output writer.
pub const OUT: &str = "out";
/// Script-facing [`scrivener_primitives::ScriptLogger`].
pub const LOG: &str = "log";
/// Identity of the executing script.
pub const SCRIPT: &str = "script";

/// Not reserved: when true, the output writer is flushed after evaluation.
pub const FLUSH: &str = "flush";

pub const RESERVED: [&str; 9] = [HELPER, REQUEST, RESPONSE, RESOURCE, RESOLVER, READER, OUT, LOG, SCRIPT];

pub fn is_reserved(key: &str) -> bool {
	RESERVED.contains(&key)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flush_is_writable() {
		assert!(!is_reserved(FLUSH));
		assert!(RESERVED.iter().all(|k| is_reserved(k)));
		assert!(!is_reserved("Request"));
	}
}
