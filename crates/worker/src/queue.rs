use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

use crate::spawn_named_thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Outcome of [`BackgroundQueue::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownReport {
	/// Worker thread finished every queued job within the budget.
	pub drained: bool,
	/// Jobs still queued or running when the budget ran out.
	pub pending: usize,
	/// Jobs that panicked over the queue's lifetime.
	pub panicked: u64,
}

struct Shared {
	pending: Mutex<usize>,
	idle: Condvar,
	finished: Mutex<bool>,
	done: Condvar,
	panicked: AtomicU64,
}

/// Single-threaded FIFO job queue.
///
/// Jobs run on a dedicated named thread in submission order. A panicking job
/// is logged and counted; the worker keeps running. Submitting after
/// [`Self::shutdown`] is rejected.
pub struct BackgroundQueue {
	name: Arc<str>,
	tx: Mutex<Option<UnboundedSender<Job>>>,
	shared: Arc<Shared>,
	thread: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundQueue {
	/// Starts the worker thread.
	pub fn start(name: impl Into<Arc<str>>) -> std::io::Result<Self> {
		let name: Arc<str> = name.into();
		let (tx, mut rx) = unbounded_channel::<Job>();
		let shared = Arc::new(Shared {
			pending: Mutex::new(0),
			idle: Condvar::new(),
			finished: Mutex::new(false),
			done: Condvar::new(),
			panicked: AtomicU64::new(0),
		});

		let worker_shared = Arc::clone(&shared);
		let worker_name = Arc::clone(&name);
		let thread = spawn_named_thread(name.to_string(), move || {
			while let Some(job) = rx.blocking_recv() {
				if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
					worker_shared.panicked.fetch_add(1, Ordering::AcqRel);
					tracing::warn!(worker = %worker_name, panic = %panic_message(payload.as_ref()), "worker.job_panicked");
				}
				let mut pending = worker_shared.pending.lock();
				*pending = pending.saturating_sub(1);
				if *pending == 0 {
					worker_shared.idle.notify_all();
				}
			}
			*worker_shared.finished.lock() = true;
			worker_shared.done.notify_all();
			tracing::trace!(worker = %worker_name, "worker.stopped");
		})?;

		Ok(Self {
			name,
			tx: Mutex::new(Some(tx)),
			shared,
			thread: Mutex::new(Some(thread)),
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Queues a job. Returns false once the queue has been shut down.
	pub fn submit<F>(&self, job: F) -> bool
	where
		F: FnOnce() + Send + 'static,
	{
		let tx = self.tx.lock();
		let Some(tx) = tx.as_ref() else {
			tracing::debug!(worker = %self.name, "worker.submit_rejected");
			return false;
		};
		*self.shared.pending.lock() += 1;
		if tx.send(Box::new(job)).is_err() {
			let mut pending = self.shared.pending.lock();
			*pending = pending.saturating_sub(1);
			return false;
		}
		tracing::trace!(worker = %self.name, "worker.submit");
		true
	}

	/// Jobs queued or running.
	pub fn pending(&self) -> usize {
		*self.shared.pending.lock()
	}

	/// Blocks until the queue is empty or `timeout` elapses.
	///
	/// Returns true when the queue drained.
	pub fn wait_idle(&self, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		let mut pending = self.shared.pending.lock();
		while *pending > 0 {
			if self.shared.idle.wait_until(&mut pending, deadline).timed_out() {
				return *pending == 0;
			}
		}
		true
	}

	/// Closes the queue and waits up to `timeout` for queued jobs to finish.
	///
	/// When the budget runs out the worker thread is detached and finishes
	/// the remaining jobs on its own.
	pub fn shutdown(&self, timeout: Duration) -> ShutdownReport {
		drop(self.tx.lock().take());

		let deadline = Instant::now() + timeout;
		let drained = {
			let mut finished = self.shared.finished.lock();
			while !*finished {
				if self.shared.done.wait_until(&mut finished, deadline).timed_out() {
					break;
				}
			}
			*finished
		};

		if drained {
			if let Some(handle) = self.thread.lock().take() {
				let _ = handle.join();
			}
		} else {
			tracing::warn!(worker = %self.name, pending = self.pending(), "worker.shutdown_timed_out");
		}

		ShutdownReport {
			drained,
			pending: self.pending(),
			panicked: self.shared.panicked.load(Ordering::Acquire),
		}
	}
}

impl Drop for BackgroundQueue {
	fn drop(&mut self) {
		// Closing the channel lets the worker exit after the queued jobs.
		drop(self.tx.lock().take());
	}
}

impl std::fmt::Debug for BackgroundQueue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BackgroundQueue")
			.field("name", &self.name)
			.field("pending", &self.pending())
			.finish_non_exhaustive()
	}
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"<non-string panic payload>".to_string()
	}
}
