//! Reconciliation node model.
//!
//! Each [`ReconciliationNode`] is the reconciler's retained representation
//! of one tree position across renders. Nodes live in a [`NodeArena`] and
//! are linked by id (`parent`, `first_child`, `next_sibling`), so the tree
//! has no back-edges besides `parent` and no node can be shared between
//! two parents.
//!
//! Nodes are constructed and mutated only by the reconciler. Everything
//! outside this crate gets read-only accessors.

use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use trellis_core::description::{Kind, Props};
use trellis_core::ids::NodeId;
use trellis_core::message::{ActorMessage, EffectDescriptor};

/// What the current diff pass decided for a node.
///
/// Set during a pass and cleared when the pass completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationKind {
	#[default]
	None,
	Update,
	Insert,
	Delete,
}

/// Hydration state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HydrationMode {
	/// Live: props and listeners are attached.
	#[default]
	None,
	/// Being analyzed by a hydration pass, or waiting on a deferred dependency.
	Analyzing,
	/// Retained but never executed; woken on first interaction.
	ResumablePending,
}

/// The prior generation of a node's props.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousVersion {
	pub props: Props,
	pub generation: u64,
}

/// One addressable unit of the retained tree.
#[derive(Debug, Clone)]
pub struct ReconciliationNode {
	pub(crate) id: NodeId,
	pub(crate) kind: Kind,
	pub(crate) key: Option<String>,
	pub(crate) props: Props,
	/// Position within the parent's description list.
	pub(crate) index: usize,
	pub(crate) output_ref: Option<NodeId>,
	pub(crate) parent: Option<NodeId>,
	pub(crate) first_child: Option<NodeId>,
	pub(crate) next_sibling: Option<NodeId>,
	pub(crate) previous_version: Option<PreviousVersion>,
	pub(crate) generation: u64,
	pub(crate) mutation_kind: MutationKind,
	pub(crate) local_state: Vec<Value>,
	pub(crate) pending_effects: Vec<EffectDescriptor>,
	pub(crate) is_offscreen: bool,
	pub(crate) mailbox: VecDeque<ActorMessage>,
	pub(crate) hydration_mode: HydrationMode,
}

impl ReconciliationNode {
	pub(crate) fn new(id: NodeId, kind: Kind, parent: Option<NodeId>, index: usize) -> Self {
		Self {
			id,
			kind,
			key: None,
			props: Props::new(),
			index,
			output_ref: None,
			parent,
			first_child: None,
			next_sibling: None,
			previous_version: None,
			generation: 0,
			mutation_kind: MutationKind::Insert,
			local_state: Vec::new(),
			pending_effects: Vec::new(),
			is_offscreen: false,
			mailbox: VecDeque::new(),
			hydration_mode: HydrationMode::None,
		}
	}

	pub fn id(&self) -> NodeId {
		self.id
	}

	pub fn kind(&self) -> &Kind {
		&self.kind
	}

	pub fn key(&self) -> Option<&str> {
		self.key.as_deref()
	}

	pub fn props(&self) -> &Props {
		&self.props
	}

	/// Id of the output node this node was committed as, if any.
	pub fn output_ref(&self) -> Option<NodeId> {
		self.output_ref
	}

	pub fn parent(&self) -> Option<NodeId> {
		self.parent
	}

	pub fn first_child(&self) -> Option<NodeId> {
		self.first_child
	}

	pub fn next_sibling(&self) -> Option<NodeId> {
		self.next_sibling
	}

	pub fn previous_version(&self) -> Option<&PreviousVersion> {
		self.previous_version.as_ref()
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn mutation_kind(&self) -> MutationKind {
		self.mutation_kind
	}

	pub fn local_state(&self) -> &[Value] {
		&self.local_state
	}

	pub fn pending_effects(&self) -> &[EffectDescriptor] {
		&self.pending_effects
	}

	pub fn is_offscreen(&self) -> bool {
		self.is_offscreen
	}

	/// Messages not yet delivered to the node's logic, in arrival order.
	pub fn mailbox(&self) -> impl Iterator<Item = &ActorMessage> {
		self.mailbox.iter()
	}

	pub fn hydration_mode(&self) -> HydrationMode {
		self.hydration_mode
	}
}

/// Id-keyed storage for the retained tree.
#[derive(Debug, Default)]
pub struct NodeArena {
	nodes: HashMap<NodeId, ReconciliationNode>,
	root: Option<NodeId>,
	next_id: u64,
}

impl NodeArena {
	pub fn new() -> Self {
		Self::default()
	}

	/// The top-level node, if anything has been rendered.
	pub fn root(&self) -> Option<NodeId> {
		self.root
	}

	pub(crate) fn set_root(&mut self, root: Option<NodeId>) {
		self.root = root;
	}

	pub fn get(&self, id: NodeId) -> Option<&ReconciliationNode> {
		self.nodes.get(&id)
	}

	pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut ReconciliationNode> {
		self.nodes.get_mut(&id)
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.nodes.contains_key(&id)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Allocates the next free id and stores a fresh node under it.
	pub(crate) fn alloc(&mut self, kind: Kind, parent: Option<NodeId>, index: usize) -> NodeId {
		while self.nodes.contains_key(&NodeId(self.next_id)) {
			self.next_id += 1;
		}
		let id = NodeId(self.next_id);
		self.next_id += 1;
		self.nodes
			.insert(id, ReconciliationNode::new(id, kind, parent, index));
		id
	}

	/// The id the next allocation starts probing from.
	pub(crate) fn next_id(&self) -> u64 {
		self.next_id
	}

	pub(crate) fn set_next_id(&mut self, next: u64) {
		self.next_id = next;
	}

	/// Children of `id` in sibling order.
	pub fn children(&self, id: NodeId) -> Vec<NodeId> {
		let mut children = Vec::new();
		let mut next = self.get(id).and_then(|node| node.first_child);
		while let Some(child) = next {
			children.push(child);
			next = self.get(child).and_then(|node| node.next_sibling);
		}
		children
	}

	/// Relinks `parent`'s children to exactly `children`, in order.
	pub(crate) fn set_children(&mut self, parent: NodeId, children: &[NodeId]) {
		for (position, child) in children.iter().enumerate() {
			let next = children.get(position + 1).copied();
			if let Some(node) = self.get_mut(*child) {
				node.parent = Some(parent);
				node.next_sibling = next;
			}
		}
		if let Some(node) = self.get_mut(parent) {
			node.first_child = children.first().copied();
		}
	}

	/// Ids of the subtree rooted at `id`, in depth-first pre-order.
	pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
		let mut order = Vec::new();
		let mut stack = vec![id];
		while let Some(current) = stack.pop() {
			if !self.contains(current) {
				continue;
			}
			order.push(current);
			let children = self.children(current);
			stack.extend(children.into_iter().rev());
		}
		order
	}

	/// Removes the subtree rooted at `id` and returns the removed nodes.
	pub(crate) fn remove_subtree(&mut self, id: NodeId) -> Vec<ReconciliationNode> {
		let ids = self.subtree(id);
		if self.root == Some(id) {
			self.root = None;
		}
		ids.into_iter()
			.filter_map(|id| self.nodes.remove(&id))
			.collect()
	}

	/// Drops every node and restarts id allocation at zero.
	pub(crate) fn reset(&mut self) {
		self.nodes.clear();
		self.root = None;
		self.next_id = 0;
	}

	/// Nearest component at or above `id`.
	pub fn owning_component(&self, id: NodeId) -> Option<NodeId> {
		let mut current = Some(id);
		while let Some(candidate) = current {
			let node = self.get(candidate)?;
			if node.kind.is_component() {
				return Some(candidate);
			}
			current = node.parent;
		}
		None
	}

	/// True if `id` or any ancestor is offscreen.
	pub fn is_hidden(&self, id: NodeId) -> bool {
		let mut current = Some(id);
		while let Some(candidate) = current {
			match self.get(candidate) {
				Some(node) if node.is_offscreen => return true,
				Some(node) => current = node.parent,
				None => return false,
			}
		}
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn element(tag: &str) -> Kind {
		Kind::Element(tag.to_string())
	}

	#[rstest]
	fn test_alloc_assigns_sequential_ids() {
		// Arrange
		let mut arena = NodeArena::new();

		// Act
		let first = arena.alloc(element("div"), None, 0);
		let second = arena.alloc(element("span"), Some(first), 0);

		// Assert
		assert_eq!(first, NodeId(0));
		assert_eq!(second, NodeId(1));
		assert_eq!(arena.get(second).unwrap().parent(), Some(first));
		assert_eq!(arena.get(first).unwrap().mutation_kind(), MutationKind::Insert);
	}

	#[rstest]
	fn test_set_children_links_siblings() {
		// Arrange
		let mut arena = NodeArena::new();
		let parent = arena.alloc(element("ul"), None, 0);
		let a = arena.alloc(element("li"), Some(parent), 0);
		let b = arena.alloc(element("li"), Some(parent), 1);
		let c = arena.alloc(element("li"), Some(parent), 2);

		// Act
		arena.set_children(parent, &[a, b, c]);
		arena.set_children(parent, &[c, a]);

		// Assert
		assert_eq!(arena.children(parent), vec![c, a]);
		assert_eq!(arena.get(a).unwrap().next_sibling(), None);
	}

	#[rstest]
	fn test_remove_subtree_drops_descendants() {
		// Arrange
		let mut arena = NodeArena::new();
		let root = arena.alloc(element("div"), None, 0);
		let child = arena.alloc(element("p"), Some(root), 0);
		let grandchild = arena.alloc(Kind::Text, Some(child), 0);
		arena.set_children(root, &[child]);
		arena.set_children(child, &[grandchild]);
		arena.set_root(Some(root));

		// Act
		let removed = arena.remove_subtree(child);

		// Assert
		assert_eq!(removed.len(), 2);
		assert!(arena.contains(root));
		assert!(!arena.contains(grandchild));
		assert_eq!(arena.subtree(root), vec![root]);
	}

	#[rstest]
	fn test_owning_component_and_hidden() {
		// Arrange
		let mut arena = NodeArena::new();
		let app = arena.alloc(Kind::Component("App".into()), None, 0);
		let div = arena.alloc(element("div"), Some(app), 0);
		let span = arena.alloc(element("span"), Some(div), 0);
		arena.set_children(app, &[div]);
		arena.set_children(div, &[span]);
		arena.get_mut(div).unwrap().is_offscreen = true;

		// Act & Assert
		assert_eq!(arena.owning_component(span), Some(app));
		assert!(arena.is_hidden(span));
		assert!(!arena.is_hidden(app));
	}

	#[rstest]
	fn test_alloc_skips_occupied_ids() {
		// Arrange
		let mut arena = NodeArena::new();
		arena.set_next_id(5);
		let taken = arena.alloc(element("div"), None, 0);
		arena.set_next_id(5);

		// Act
		let fresh = arena.alloc(element("p"), None, 0);

		// Assert
		assert_eq!(taken, NodeId(5));
		assert_eq!(fresh, NodeId(6));
		assert_eq!(arena.len(), 2);
	}
}
