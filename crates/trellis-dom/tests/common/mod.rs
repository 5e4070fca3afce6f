//! Shared fixtures for render root integration tests.

#![allow(dead_code)]

use rstest::fixture;
use serde_json::{Value, json};
use trellis_core::description::Description;
use trellis_dom::{OutputTree, Root, RootConfig};
use trellis_reconciler::ComponentRegistry;

/// Counter buttons, a click-logging panel, an actor inbox and a handler
/// that panics.
pub fn registry() -> ComponentRegistry {
	let mut registry = ComponentRegistry::new();
	registry
		.register_component("Counter", |_, scope| {
			let (_, count) = scope.use_state(0);
			Description::element("button")
				.on("click", "counter.increment")
				.child(Description::text(count.to_string()))
		})
		.register_handler("counter.increment", |scope, _| {
			let count = scope.state(0).and_then(Value::as_i64).unwrap_or_default();
			scope.set_state(0, count + 1);
			scope.queue_effect("counted", count + 1);
		})
		.register_component("Panel", |_, _| {
			Description::element("div")
				.on("click", "panel.click")
				.child(Description::component("Inner"))
		})
		.register_handler("panel.click", |scope, _| scope.queue_effect("clicked", "panel"))
		.register_component("Inner", |_, _| {
			Description::element("button")
				.on("click", "inner.click")
				.child(Description::text("go"))
		})
		.register_handler("inner.click", |scope, _| scope.queue_effect("clicked", "inner"))
		.register_component("Inbox", |_, scope| {
			let (slot, seen) = scope.use_state(json!([]));
			let mut seen = seen.as_array().cloned().unwrap_or_default();
			seen.extend(scope.take_messages().into_iter().map(|message| message.payload));
			scope.set_state(slot, Value::Array(seen.clone()));
			Description::element("ul").children(
				seen.iter()
					.map(|payload| Description::element("li").child(Description::text(payload.to_string()))),
			)
		})
		.register_component("Fragile", |_, _| {
			Description::element("button")
				.on("click", "fragile.explode")
				.child(Description::text("ok"))
		})
		.register_handler("fragile.explode", |_, _| panic!("handler exploded"));
	registry
}

pub fn mount(config: RootConfig) -> Root {
	Root::new(OutputTree::new(), registry(), config).unwrap()
}

#[fixture]
pub fn root() -> Root {
	mount(RootConfig::default())
}

pub fn click() -> trellis_core::message::EventData {
	trellis_core::message::EventData::new("click")
}
