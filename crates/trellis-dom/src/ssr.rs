//! Server-side rendering.
//!
//! Runs one diff pass against an empty retained tree and commits it to a
//! fresh output tree, markers included. Node ids are allocated in
//! pre-order from zero, the same order hydration later uses, so the
//! markers written here name the nodes a hydrating root will hold.
//!
//! The returned tree models shipped markup: it carries attributes and
//! markers but no bound listeners. The container also carries the render's
//! [`ResumePlan`](trellis_core::hydration::ResumePlan) under
//! [`RESUME_ATTR`], which a resumable root needs to adopt the markup
//! without running components.

use crate::commit::{self, CommitMode};
use crate::tree::OutputTree;
use std::sync::Arc;
use trellis_core::description::Description;
use trellis_core::markers::RESUME_ATTR;
use trellis_reconciler::{ComponentRegistry, Reconciler};

/// Renders `description` into a new output tree.
pub fn render_to_tree(description: &Description, registry: Arc<ComponentRegistry>) -> OutputTree {
	let mut reconciler = Reconciler::new(registry);
	let mutations = reconciler.reconcile(description);
	let effects = reconciler.take_effects();
	let mut tree = OutputTree::new();
	let outcome = commit::apply(&mut tree, &mutations, CommitMode::Render);
	tree.clear_listeners();
	let plan = reconciler.resume_plan();
	if !plan.is_empty() {
		match plan.to_attr() {
			Ok(value) => tree.set_attribute(tree.container(), RESUME_ATTR, value),
			Err(err) => tracing::warn!(error = %err, "failed to serialize resume plan"),
		}
	}
	tracing::debug!(
		nodes = tree.len(),
		applied = outcome.applied,
		skipped = outcome.skipped.len(),
		discarded_effects = effects.len(),
		"server render complete"
	);
	tree
}

/// Renders `description` to HTML with ownership markers.
pub fn render_to_string(description: &Description, registry: Arc<ComponentRegistry>) -> String {
	render_to_tree(description, registry).to_html()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_render_to_string_marks_owners() {
		// Arrange
		let mut registry = ComponentRegistry::new();
		registry.register_component("Greeting", |props, _| {
			let name = props.get("name").and_then(|v| v.as_str()).unwrap_or("you");
			Description::element("button")
				.on("click", "greet")
				.child(Description::text(format!("hi {}", name)))
		});
		let page = Description::element("main").child(Description::component("Greeting").prop("name", "ada"));

		// Act
		let html = render_to_string(&page, Arc::new(registry));

		// Assert
		assert_eq!(
			html,
			"<main data-tr-node=\"0\"><button data-tr-node=\"2\" data-tr-on-click=\"2\">hi ada</button></main>"
		);
	}

	#[rstest]
	fn test_effects_are_not_run_on_the_server() {
		// Arrange
		let mut registry = ComponentRegistry::new();
		registry.register_component("Tracked", |_, scope| {
			scope.queue_effect("mounted", serde_json::Value::Null);
			Description::element("div")
		});

		// Act
		let tree = render_to_tree(&Description::component("Tracked"), Arc::new(registry));

		// Assert
		assert_eq!(tree.to_html_stripped(), "<div></div>");
	}

	#[rstest]
	fn test_container_carries_resume_plan() {
		// Arrange
		let mut registry = ComponentRegistry::new();
		registry.register_component("Badge", |_, _| Description::element("em"));
		let page = Description::element("div").child(Description::component("Badge"));

		// Act
		let tree = render_to_tree(&page, Arc::new(registry));

		// Assert
		let value = tree.get(tree.container()).unwrap().attribute(RESUME_ATTR).unwrap();
		let plan = trellis_core::hydration::ResumePlan::from_attr(value).unwrap();
		assert_eq!(plan.spans.len(), 1);
		assert_eq!(plan.spans[0].node, trellis_core::NodeId(1));
		assert_eq!(plan.spans[0].len, 2);
		assert_eq!(plan.spans[0].width, 1);
		assert!(!tree.to_html().contains(RESUME_ATTR));
	}
}
