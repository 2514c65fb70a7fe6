use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// Shared, cloneable output channel handed to scripts.
///
/// Clones write to the same underlying sink. All access is serialized through
/// a mutex so the channel can be shared between the scope and the executor.
#[derive(Clone)]
pub struct ScriptWriter {
	inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl ScriptWriter {
	pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
		Self {
			inner: Arc::new(Mutex::new(Box::new(writer))),
		}
	}

	/// Writer that discards everything.
	pub fn sink() -> Self {
		Self::new(io::sink())
	}

	pub fn write_str(&self, s: &str) -> io::Result<()> {
		self.inner.lock().write_all(s.as_bytes())
	}

	pub fn flush(&self) -> io::Result<()> {
		self.inner.lock().flush()
	}
}

impl fmt::Debug for ScriptWriter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScriptWriter").field("shared", &Arc::strong_count(&self.inner)).finish()
	}
}

impl Write for ScriptWriter {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.inner.lock().write(buf)
	}

	fn flush(&mut self) -> io::Result<()> {
		self.inner.lock().flush()
	}
}

/// Shared input channel (typically the request body).
#[derive(Clone)]
pub struct ScriptReader {
	inner: Arc<Mutex<Box<dyn Read + Send>>>,
}

impl ScriptReader {
	pub fn new<R: Read + Send + 'static>(reader: R) -> Self {
		Self {
			inner: Arc::new(Mutex::new(Box::new(reader))),
		}
	}

	pub fn empty() -> Self {
		Self::new(io::empty())
	}

	pub fn read_to_string(&self) -> io::Result<String> {
		let mut out = String::new();
		self.inner.lock().read_to_string(&mut out)?;
		Ok(out)
	}
}

impl fmt::Debug for ScriptReader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScriptReader").field("shared", &Arc::strong_count(&self.inner)).finish()
	}
}

impl Read for ScriptReader {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		self.inner.lock().read(buf)
	}
}

/// In-memory output buffer that records how often it was flushed.
///
/// Clones share the buffer, so one clone can be wrapped in a [`ScriptWriter`]
/// while another inspects what was written.
#[derive(Clone, Default)]
pub struct MemoryOutput {
	bytes: Arc<Mutex<Vec<u8>>>,
	flushes: Arc<AtomicUsize>,
}

impl MemoryOutput {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn writer(&self) -> ScriptWriter {
		ScriptWriter::new(self.clone())
	}

	/// Returns the written bytes as (lossy) UTF-8.
	pub fn contents(&self) -> String {
		String::from_utf8_lossy(&self.bytes.lock()).into_owned()
	}

	pub fn flush_count(&self) -> usize {
		self.flushes.load(Ordering::Acquire)
	}
}

impl Write for MemoryOutput {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.bytes.lock().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		self.flushes.fetch_add(1, Ordering::AcqRel);
		Ok(())
	}
}
