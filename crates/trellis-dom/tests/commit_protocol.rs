//! Render root commit protocol: ordering, transitions, effects and failure.

mod common;

use common::{click, mount, root};
use rstest::rstest;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use trellis_core::description::Description;
use trellis_core::ids::NodeRef;
use trellis_core::mutation::Path;
use trellis_dom::{Root, RootConfig, RootError, render_to_tree};

fn list(items: &[&str]) -> Description {
	Description::element("ul").children(
		items
			.iter()
			.map(|item| Description::element("li").child(Description::text(*item))),
	)
}

fn fresh_html(description: &Description) -> String {
	render_to_tree(description, Arc::new(common::registry())).to_html_stripped()
}

#[rstest]
fn test_rerender_matches_fresh_render(mut root: Root) {
	// Arrange
	root.render(list(&["a", "b", "c"])).unwrap();
	root.settle().unwrap();
	let next = list(&["a", "c"]);

	// Act
	root.render(next.clone()).unwrap();
	let report = root.settle().unwrap();

	// Assert
	assert!(report.skipped.is_empty());
	assert_eq!(root.tree().to_html_stripped(), fresh_html(&next));
	assert_eq!(root.tree().to_html_stripped(), "<ul><li>a</li><li>c</li></ul>");
}

#[rstest]
fn test_commits_apply_in_arrival_order(mut root: Root) {
	// Arrange
	let first = list(&["x"]);
	let second = Description::element("section").child(Description::text("done"));

	// Act
	let one = root.render(first).unwrap();
	let two = root.render(second.clone()).unwrap();
	let report = root.settle().unwrap();

	// Assert
	assert!(one < two);
	assert_eq!(report.commits, 2);
	assert_eq!(root.tree().to_html_stripped(), "<section>done</section>");
}

#[rstest]
fn test_identical_render_emits_no_mutations(mut root: Root) {
	// Arrange
	root.render(list(&["a", "b"])).unwrap();
	root.settle().unwrap();

	// Act
	root.render(list(&["a", "b"])).unwrap();
	let report = root.settle().unwrap();

	// Assert
	assert_eq!(report.commits, 1);
	assert_eq!(report.applied, 0);
}

#[rstest]
fn test_event_runs_handler_and_delivers_effect(mut root: Root) {
	// Arrange
	let seen = Rc::new(RefCell::new(Vec::new()));
	let log = Rc::clone(&seen);
	root.on_effect("counted", move |effect| log.borrow_mut().push(effect.effect.payload.clone()));
	root.render(Description::component("Counter")).unwrap();
	root.settle().unwrap();

	// Act
	let sent = root.dispatch_event(&Path(vec![0]), click()).unwrap();
	let report = root.settle().unwrap();

	// Assert
	assert_eq!(sent, 1);
	assert_eq!(root.tree().to_html_stripped(), "<button>1</button>");
	assert_eq!(report.effects.len(), 1);
	assert_eq!(*seen.borrow(), vec![json!(1)]);
}

#[rstest]
fn test_node_ref_at_names_owner(mut root: Root) {
	// Arrange
	root.render(list(&["a"])).unwrap();
	root.settle().unwrap();

	// Act
	let list_ref = root.node_ref_at(&Path(vec![0]));
	let item_ref = root.node_ref_at(&Path(vec![0, 0]));
	let missing = root.node_ref_at(&Path(vec![3]));

	// Assert
	assert_eq!(list_ref, Some(NodeRef(trellis_core::NodeId(0))));
	assert_eq!(item_ref, Some(NodeRef(trellis_core::NodeId(1))));
	assert_eq!(missing, None);
}

#[rstest]
fn test_transition_pending_flag_follows_updates(mut root: Root) {
	// Arrange
	root.render(Description::component("Counter")).unwrap();
	root.settle().unwrap();
	let counter = root.node_ref_at(&Path(vec![0])).unwrap();
	let flags = Rc::new(RefCell::new(Vec::new()));
	let log = Rc::clone(&flags);

	// Act
	let transition = root.start_transition(
		|root| {
			root.schedule_update(counter).unwrap();
			root.schedule_update(counter).unwrap();
		},
		move |pending| log.borrow_mut().push(pending),
	);
	let during = flags.borrow().clone();
	let report = root.settle().unwrap();

	// Assert
	assert_eq!(during, vec![true]);
	assert_eq!(*flags.borrow(), vec![true, false]);
	assert_eq!(report.completed_transitions, vec![transition]);
}

#[rstest]
fn test_keyed_reorder_preserves_component_state() {
	// Arrange
	let mut config = RootConfig::default();
	config.diff.keyed = true;
	let mut root = mount(config);
	let counters = |keys: &[&str]| {
		Description::element("div").children(
			keys.iter()
				.map(|key| Description::component("Counter").key(*key)),
		)
	};
	root.render(counters(&["a", "b"])).unwrap();
	root.settle().unwrap();
	root.dispatch_event(&Path(vec![0, 1]), click()).unwrap();
	root.settle().unwrap();

	// Act
	root.render(counters(&["b", "a"])).unwrap();
	root.settle().unwrap();

	// Assert
	assert_eq!(
		root.tree().to_html_stripped(),
		"<div><button>1</button><button>0</button></div>"
	);
}

#[rstest]
fn test_offscreen_round_trip_preserves_state(mut root: Root) {
	// Arrange
	let page = |hidden: bool| {
		Description::element("div").child(Description::component("Counter").offscreen(hidden))
	};
	root.render(page(false)).unwrap();
	root.settle().unwrap();
	root.dispatch_event(&Path(vec![0, 0]), click()).unwrap();
	root.settle().unwrap();

	// Act
	root.render(page(true)).unwrap();
	root.settle().unwrap();
	let hidden = root.tree().to_html_stripped();
	root.render(page(false)).unwrap();
	root.settle().unwrap();

	// Assert
	assert_eq!(hidden, "<div></div>");
	assert_eq!(root.tree().to_html_stripped(), "<div><button>1</button></div>");
}

#[rstest]
fn test_crashed_reconciler_closes_channel_and_freezes_tree(mut root: Root) {
	// Arrange
	root.render(Description::component("Fragile")).unwrap();
	root.settle().unwrap();
	let before = root.tree().to_html();

	// Act
	root.dispatch_event(&Path(vec![0]), click()).unwrap();
	let settled = root.settle();

	// Assert
	assert!(matches!(settled, Err(RootError::ChannelClosed)));
	assert!(root.is_failed());
	assert_eq!(root.tree().to_html(), before);
	assert!(matches!(
		root.render(Description::element("p")),
		Err(RootError::ChannelClosed)
	));
	root.unmount();
	assert!(root.tree().is_empty());
}

#[rstest]
fn test_commits_received_before_the_crash_are_applied(mut root: Root) {
	// Arrange
	root.render(Description::element("div").child(Description::component("Fragile")))
		.unwrap();
	root.settle().unwrap();

	// Act
	root.render(
		Description::element("div").children([
			Description::component("Fragile"),
			Description::element("p").child(Description::text("after")),
		]),
	)
	.unwrap();
	root.dispatch_event(&Path(vec![0, 0]), click()).unwrap();
	let settled = root.settle();

	// Assert
	assert!(matches!(settled, Err(RootError::ChannelClosed)));
	assert!(root.is_failed());
	assert!(root.tree().to_html_stripped().contains("<p>after</p>"));
}

#[rstest]
fn test_event_outside_tree_is_ignored(mut root: Root) {
	// Arrange
	root.render(list(&["a"])).unwrap();
	root.settle().unwrap();

	// Act
	let sent = root.dispatch_event(&Path(vec![7, 7]), click()).unwrap();
	let report = root.frame().unwrap();

	// Assert
	assert_eq!(sent, 0);
	assert_eq!(report.commits, 0);
	assert!(!root.is_failed());
}
