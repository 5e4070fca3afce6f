//! Event delegation.
//!
//! A resumable root never executes per-node logic upfront, so nothing is
//! bound on individual output nodes. Instead the container carries one
//! capture-phase listener per event type, and an event is routed to the
//! nearest ancestor of its target whose ownership marker names that event:
//!
//! ```text
//! container ─capture─▶ target ─walk up─▶ data-tr-on-click="4" ─▶ wake node 4
//! ```
//!
//! Roots using any other strategy bubble the event through the listeners
//! bound during commit and hydration instead, see [`bubble`].

use crate::tree::{BoundListener, OutputId, OutputTree};
use std::collections::BTreeSet;
use trellis_core::ids::NodeId;
use trellis_core::markers::{listener_marker, marker_event};

/// Capture-phase listeners installed on the container.
#[derive(Debug, Clone, Default)]
pub struct EventDelegator {
	event_types: BTreeSet<String>,
	active: bool,
}

impl EventDelegator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Installs the container listeners for `event_types`.
	pub fn activate<I, S>(&mut self, event_types: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.active = true;
		self.event_types.extend(event_types.into_iter().map(Into::into));
	}

	pub fn is_active(&self) -> bool {
		self.active
	}

	/// Installs a listener for every event type named by an ownership
	/// marker in `tree`. Returns how many were new.
	pub fn discover(&mut self, tree: &OutputTree) -> usize {
		let before = self.event_types.len();
		for id in tree.descendants(tree.container()) {
			let Some(node) = tree.get(id) else {
				continue;
			};
			for (name, _) in node.attributes() {
				if let Some(event) = marker_event(name) {
					self.event_types.insert(event.to_string());
				}
			}
		}
		let added = self.event_types.len() - before;
		tracing::debug!(added, total = self.event_types.len(), "delegated event types discovered");
		added
	}

	/// Installs a listener for `event`. Returns false if one already existed.
	pub fn register(&mut self, event: impl Into<String>) -> bool {
		self.event_types.insert(event.into())
	}

	pub fn listens_to(&self, event: &str) -> bool {
		self.active && self.event_types.contains(event)
	}

	pub fn event_types(&self) -> impl Iterator<Item = &str> {
		self.event_types.iter().map(String::as_str)
	}

	/// Finds the node owning the nearest `event` marker on the path from
	/// `target` up to the container.
	pub fn resolve_owner(&self, tree: &OutputTree, target: OutputId, event: &str) -> Option<NodeId> {
		let marker = listener_marker(event);
		let mut current = Some(target);
		while let Some(id) = current {
			if id == tree.container() {
				break;
			}
			let node = tree.get(id)?;
			if let Some(owner) = node.attribute(&marker).and_then(|value| value.parse().ok()) {
				return Some(owner);
			}
			current = node.parent();
		}
		None
	}

	pub fn clear(&mut self) {
		self.event_types.clear();
		self.active = false;
	}
}

/// Collects the listeners an `event` on `target` bubbles through, target first.
pub fn bubble(tree: &OutputTree, target: OutputId, event: &str) -> Vec<BoundListener> {
	let mut listeners = Vec::new();
	let mut current = Some(target);
	while let Some(id) = current {
		let Some(node) = tree.get(id) else {
			break;
		};
		if let Some(listener) = node.listener(event) {
			listeners.push(listener.clone());
		}
		current = node.parent();
	}
	listeners
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use trellis_core::description::HandlerRef;

	fn marked_tree() -> (OutputTree, OutputId, OutputId) {
		let mut tree = OutputTree::new();
		let outer = tree.append_element(tree.container(), "div").unwrap();
		tree.set_attribute(outer, "data-tr-on-click", "1");
		let inner = tree.append_element(outer, "button").unwrap();
		tree.set_attribute(inner, "data-tr-on-click", "3");
		let label = tree.append_text(inner, "go").unwrap();
		(tree, outer, label)
	}

	#[rstest]
	fn test_discover_reads_markers() {
		// Arrange
		let (tree, _, _) = marked_tree();
		let mut delegator = EventDelegator::new();
		delegator.activate(["keydown"]);

		// Act
		let added = delegator.discover(&tree);

		// Assert
		assert_eq!(added, 1);
		assert_eq!(delegator.event_types().collect::<Vec<_>>(), vec!["click", "keydown"]);
		assert!(delegator.listens_to("click"));
	}

	#[rstest]
	fn test_resolve_owner_stops_at_nearest_marker() {
		// Arrange
		let (tree, outer, label) = marked_tree();
		let delegator = EventDelegator::new();

		// Act
		let from_label = delegator.resolve_owner(&tree, label, "click");
		let from_outer = delegator.resolve_owner(&tree, outer, "click");
		let unmarked = delegator.resolve_owner(&tree, label, "input");

		// Assert
		assert_eq!(from_label, Some(NodeId(3)));
		assert_eq!(from_outer, Some(NodeId(1)));
		assert_eq!(unmarked, None);
	}

	#[rstest]
	fn test_inactive_delegator_listens_to_nothing() {
		let mut delegator = EventDelegator::new();
		delegator.register("click");
		assert!(!delegator.listens_to("click"));
	}

	#[rstest]
	fn test_bubble_collects_target_first() {
		// Arrange
		let (mut tree, outer, label) = marked_tree();
		let inner = tree.get(label).unwrap().parent().unwrap();
		let listener = |name: &str, owner: u64| BoundListener {
			handler: HandlerRef::new(name),
			owner: NodeId(owner),
		};
		tree.bind_listener(outer, "click", listener("outer", 1));
		tree.bind_listener(inner, "click", listener("inner", 3));

		// Act
		let path = bubble(&tree, label, "click");

		// Assert
		assert_eq!(path, vec![listener("inner", 3), listener("outer", 1)]);
	}
}
