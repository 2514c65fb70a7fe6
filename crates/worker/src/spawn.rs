/// Spawns a dedicated named OS thread.
pub fn spawn_named_thread<F, R>(name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(worker = %name, "worker.spawn_named_thread");
	std::thread::Builder::new().name(name).spawn(f)
}
