//! Server render, resumable adoption and first interaction through the facade.

use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;
use trellis::prelude::*;
use trellis_core::markers::RESUME_ATTR;
use trellis_integration_tests::{page, registry};

#[rstest]
fn test_resumable_page_wakes_on_first_click() {
	// Arrange
	let markup = render_to_tree(&page(), Arc::new(registry()));
	let shipped = markup.to_html();
	let mut root = Root::new(markup, registry(), RootConfig::default()).unwrap();
	root.set_device_signals(DeviceSignals::new(true, NetworkClass::FourG));
	let strategy = root.hydrate(page(), Some(HydrationConfig::Adaptive)).unwrap();
	root.settle().unwrap();
	let adopted = root.tree().to_html();

	// Act
	let sent = root.dispatch_event(&Path(vec![0, 1]), EventData::new("click")).unwrap();
	let report = root.settle().unwrap();

	// Assert
	assert_eq!(strategy, HydrationStrategy::Resumable);
	assert_eq!(adopted, shipped);
	assert_eq!(sent, 1);
	assert_eq!(report.effects.len(), 1);
	assert_eq!(report.effects[0].effect.name, "liked");
	assert_eq!(
		root.tree().to_html_stripped(),
		"<article><h1>Post</h1><button class=\"like\">hearts 1</button></article>"
	);
	root.unmount();
}

#[rstest]
fn test_server_markup_records_each_component_span() {
	// Arrange
	let markup = render_to_tree(&page(), Arc::new(registry()));

	// Act
	let attr = markup
		.get(markup.container())
		.and_then(|container| container.attribute(RESUME_ATTR))
		.unwrap();
	let plan: Value = serde_json::from_str(attr).unwrap();

	// Assert
	assert_eq!(plan, json!({ "spans": [{ "node": 3, "len": 3, "width": 1 }] }));
}

#[rstest]
fn test_render_to_string_is_deterministic() {
	let first = render_to_string(&page(), Arc::new(registry()));
	let second = render_to_string(&page(), Arc::new(registry()));
	assert_eq!(first, second);
	assert!(first.contains("data-tr-on-click=\"4\""));
}
