use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use pretty_assertions::assert_eq;
use scrivener_cache::CacheState;
use scrivener_primitives::{Bindings, ChangeEvent};
use scrivener_registry::EngineProperties;
use scrivener_runtime::{ExecuteOptions, ScriptRuntime};

use crate::common::{Changes, Lang, Script, init_tracing};

const IDLE: Duration = Duration::from_secs(5);

fn runtime_with(changes: &Arc<Changes>) -> ScriptRuntime {
	init_tracing();
	ScriptRuntime::builder().change_source(changes.clone()).build().unwrap()
}

#[test]
fn watch_set_follows_registered_compilers() {
	let changes = Arc::new(Changes::default());
	let runtime = runtime_with(&changes);
	assert_eq!(changes.patterns(), vec!["**/*.tmpl".to_string(), "**/*.tpl".to_string()]);

	runtime.engines().register(Lang::new("js").compiling().arc(), EngineProperties::default()).unwrap();
	assert_eq!(
		changes.patterns(),
		vec!["**/*.js".to_string(), "**/*.tmpl".to_string(), "**/*.tpl".to_string()]
	);

	runtime.engines().register(Lang::new("py").arc(), EngineProperties::default()).unwrap();
	assert_eq!(changes.patterns().len(), 3);
}

#[test]
fn removing_a_folder_evicts_scripts_below_it() {
	let changes = Arc::new(Changes::default());
	let runtime = runtime_with(&changes);
	let js = Lang::new("js").compiling();
	let compiles = Arc::clone(&js.compiles);
	runtime.engines().register(js.arc(), EngineProperties::default()).unwrap();

	let nested = Script::new("/apps/a/b.js", "foo");
	let sibling = Script::new("/apps/ab.js", "foo");
	for script in [&nested, &sibling, &nested] {
		runtime.execute(&**script, Bindings::new(), ExecuteOptions::default()).unwrap();
	}
	assert_eq!(compiles.load(Ordering::SeqCst), 2);

	changes.emit(&[ChangeEvent::removed("/apps/a")]);
	assert!(runtime.cache().wait_idle(IDLE));
	assert_eq!(runtime.cache().cached_paths(), vec!["/apps/ab.js".to_string()]);

	runtime.execute(&*nested, Bindings::new(), ExecuteOptions::default()).unwrap();
	assert_eq!(compiles.load(Ordering::SeqCst), 3);
}

#[test]
fn changed_scripts_are_recompiled() {
	let changes = Arc::new(Changes::default());
	let runtime = runtime_with(&changes);
	let script = Script::new("/apps/home.tmpl", "${title}");
	runtime.execute(&*script, Bindings::new(), ExecuteOptions::default()).unwrap();
	assert!(runtime.cache().get("/apps/home.tmpl").is_some());

	changes.emit(&[ChangeEvent::changed("/apps/home.html"), ChangeEvent::changed("/apps/home.tmpl")]);
	assert!(runtime.cache().wait_idle(IDLE));
	assert!(runtime.cache().is_empty());
}

#[test]
fn upper_case_extensions_are_recompiled_after_a_change() {
	let changes = Arc::new(Changes::default());
	let runtime = runtime_with(&changes);
	let script = Script::new("/apps/Home.TMPL", "${title}");
	runtime.execute(&*script, Bindings::new(), ExecuteOptions::default()).unwrap();
	assert_eq!(runtime.cache().cached_paths(), vec!["/apps/Home.TMPL".to_string()]);

	changes.emit(&[ChangeEvent::changed("/apps/Home.TMPL")]);
	assert!(runtime.cache().wait_idle(IDLE));
	assert!(runtime.cache().is_empty());
}

#[test]
fn engine_changes_flush_compiled_scripts() {
	let changes = Arc::new(Changes::default());
	let runtime = runtime_with(&changes);
	runtime
		.execute(&*Script::new("/apps/home.tmpl", "x"), Bindings::new(), ExecuteOptions::default())
		.unwrap();
	assert_eq!(runtime.cache().len(), 1);

	runtime.engines().register(Lang::new("js").arc(), EngineProperties::default()).unwrap();
	assert!(runtime.cache().is_empty());
}

#[test]
fn shutdown_disposes_the_cache() {
	let changes = Arc::new(Changes::default());
	let runtime = runtime_with(&changes);
	runtime
		.execute(&*Script::new("/apps/home.tmpl", "x"), Bindings::new(), ExecuteOptions::default())
		.unwrap();

	let report = runtime.shutdown();
	assert!(report.drained);
	assert_eq!(report.pending, 0);
	assert_eq!(runtime.cache().state(), CacheState::Disposed);
	assert!(runtime.cache().is_empty());
	assert!(changes.patterns().is_empty());
}
