use std::sync::Arc;

use pretty_assertions::assert_eq;
use scrivener_bindings::{ProviderRegistration, ScopeError, StaticBindingsProvider};
use scrivener_primitives::{Bindings, MemoryOutput};
use scrivener_registry::EngineProperties;
use scrivener_runtime::{ExecuteError, ExecuteOptions, RuntimeConfig, ScriptRuntime, TEMPLATE_ENGINE};
use serde_json::json;

use crate::common::{Lang, Output, Page, Script, Tree, init_tracing};

fn values(pairs: &[(&str, i64)]) -> Bindings {
	let mut bindings = Bindings::new();
	for (key, value) in pairs {
		bindings.insert(*key, *value);
	}
	bindings
}

fn provide(runtime: &ScriptRuntime, name: &str, pairs: &[(&str, i64)], registration: ProviderRegistration) {
	runtime
		.providers()
		.register(Arc::new(StaticBindingsProvider::new(name, values(pairs))), registration);
}

fn bare_runtime() -> ScriptRuntime {
	init_tracing();
	ScriptRuntime::builder().without_template_engine().build().unwrap()
}

#[test]
fn language_providers_run_after_generic_ones() {
	let runtime = bare_runtime();
	runtime.engines().register(Lang::new("js").arc(), EngineProperties::default()).unwrap();
	runtime.engines().register(Lang::new("groovy").arc(), EngineProperties::default()).unwrap();
	provide(&runtime, "defaults", &[("foo", 1)], ProviderRegistration::generic(0));
	provide(&runtime, "groovy", &[("foo", 2)], ProviderRegistration::for_language("groovy", 0));

	let tree = Tree::with(Vec::new());
	let response = Arc::new(Output::default());
	let mut bindings = Bindings::new();
	bindings.insert("flush", true);
	let options = ExecuteOptions::default().with_request(Page::at("/content/page", Arc::clone(&tree)), response.clone());

	let value = runtime.execute(&*Script::new("/apps/s.groovy", "foo"), bindings, options).unwrap();
	assert_eq!(value, Some(json!("foo=2")));
	assert_eq!(response.0.contents(), "foo=2");
	assert_eq!(response.0.flush_count(), 1);

	let value = runtime
		.execute(&*Script::new("/apps/s.js", "foo"), Bindings::new(), ExecuteOptions::default())
		.unwrap();
	assert_eq!(value, Some(json!("foo=1")));
}

#[test]
fn highest_ranked_engine_claims_a_shared_extension() {
	let runtime = bare_runtime();
	let html5 = Lang::new("html5").extensions(&["html"]).arc();
	runtime.engines().register(html5, EngineProperties::ranked(5)).unwrap();
	let htl = runtime
		.engines()
		.register(Lang::new("htl").extensions(&["html"]).arc(), EngineProperties::ranked(10))
		.unwrap();

	let script = Script::new("/apps/p.html", "");
	assert_eq!(runtime.resolve(&*script, None).unwrap().engine_name(), "htl");

	let tree = Tree::with(vec![Script::hinted("/apps", "html", "HTML5")]);
	assert_eq!(runtime.resolve(&*script, Some(&*tree)).unwrap().engine_name(), "html5");

	assert!(runtime.engines().unregister(htl));
	assert_eq!(runtime.resolve(&*script, None).unwrap().engine_name(), "html5");
}

#[test]
fn providers_only_see_their_own_context() {
	let runtime = bare_runtime();
	runtime.engines().register(Lang::new("js").arc(), EngineProperties::default()).unwrap();
	provide(&runtime, "batch", &[("bar", 3)], ProviderRegistration::generic(0).in_context("batch"));
	let script = Script::new("/apps/job.js", "bar");

	let batch = runtime
		.execute(&*script, Bindings::new(), ExecuteOptions::default().in_context("batch"))
		.unwrap();
	let request = runtime.execute(&*script, Bindings::new(), ExecuteOptions::default()).unwrap();

	assert_eq!(batch, Some(json!("bar=3")));
	assert_eq!(request, Some(json!("bar=-")));
}

#[test]
fn unclaimed_scripts_are_not_executed() {
	let runtime = bare_runtime();
	let result = runtime.execute(&*Script::new("/apps/x.unknown", "foo"), Bindings::new(), ExecuteOptions::default());
	assert!(matches!(result, Ok(None)));
}

#[test]
fn templates_render_into_the_response() {
	init_tracing();
	let runtime = ScriptRuntime::builder().build().unwrap();
	let script = Script::new("/apps/home.tmpl", "<h1>${title}</h1>");
	assert_eq!(runtime.resolve(&*script, None).unwrap().engine_name(), TEMPLATE_ENGINE);

	for _ in 0..2 {
		let response = Arc::new(Output::default());
		let mut bindings = Bindings::new();
		bindings.insert("title", "Home");
		let options = ExecuteOptions::default().with_request(Page::at("/content/home", Tree::with(Vec::new())), response.clone());
		runtime.execute(&*script, bindings, options).unwrap();
		assert_eq!(response.0.contents(), "<h1>Home</h1>");
	}
	assert_eq!(runtime.cache().cached_paths(), vec!["/apps/home.tmpl".to_string()]);
}

#[test]
fn configuration_shapes_the_runtime() {
	init_tracing();
	let config = RuntimeConfig::parse(
		r#"
			[cache]
			capacity = 0

			[bindings]
			default_context = "batch"
		"#,
	)
	.unwrap();
	let runtime = ScriptRuntime::builder().config(config).build().unwrap();
	let mut title = Bindings::new();
	title.insert("title", "Batch");
	runtime
		.providers()
		.register(Arc::new(StaticBindingsProvider::new("batch", title)), ProviderRegistration::generic(0).in_context("batch"));

	let out = MemoryOutput::new();
	let mut bindings = Bindings::new();
	bindings.insert("out", out.writer());
	runtime
		.execute(&*Script::new("/apps/job.tmpl", "${title}"), bindings, ExecuteOptions::default())
		.unwrap();

	assert_eq!(out.contents(), "Batch");
	assert_eq!(runtime.cache().capacity(), 0);
	assert!(runtime.cache().is_empty());
}

#[test]
fn scope_and_evaluation_failures_are_distinguished() {
	init_tracing();
	let runtime = ScriptRuntime::builder().build().unwrap();

	let mut bindings = Bindings::new();
	bindings.insert("sling", "not a helper");
	let err = runtime
		.execute(&*Script::new("/apps/a.tmpl", "x"), bindings, ExecuteOptions::default())
		.unwrap_err();
	assert!(matches!(err, ExecuteError::Scope(ScopeError::InconsistentHelper { field: "helper" })));

	let err = runtime
		.execute(&*Script::new("/apps/b.tmpl", "${open"), Bindings::new(), ExecuteOptions::default())
		.unwrap_err();
	match err {
		ExecuteError::Evaluation(err) => {
			assert_eq!(err.script, "/apps/b.tmpl");
			assert_eq!(err.resource, None);
		}
		other => panic!("expected an evaluation error, got {other:?}"),
	}
	assert!(runtime.cache().get("/apps/b.tmpl").is_none());
}
