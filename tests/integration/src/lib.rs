//! Shared fixtures for cross-crate integration tests.
//!
//! Everything here goes through the `trellis` facade so the tests exercise
//! the same surface an application would.

use trellis::prelude::*;

/// A post page whose only interactive part is a `Like` button.
pub fn registry() -> ComponentRegistry {
	let mut registry = ComponentRegistry::new();
	registry
		.register_component("Like", |props, scope| {
			let (_, likes) = scope.use_state(0);
			let label = props.get("label").and_then(PropValue::as_str).unwrap_or("like");
			Description::element("button")
				.prop("class", "like")
				.on("click", "like.add")
				.child(Description::text(format!("{} {}", label, likes)))
		})
		.register_handler("like.add", |scope, _| {
			let likes = scope.state(0).and_then(|v| v.as_i64()).unwrap_or_default();
			scope.set_state(0, likes + 1);
			scope.queue_effect("liked", likes + 1);
		});
	registry
}

pub fn page() -> Description {
	Description::element("article").children([
		Description::element("h1").child(Description::text("Post")),
		Description::component("Like").prop("label", "hearts"),
	])
}
