//! Diff engine.
//!
//! The [`Reconciler`] pairs its retained node tree against a new
//! description tree and emits an ordered mutation list. Pairing is
//! positional per sibling group: previous nodes and new descriptions are
//! walked in lock-step by index.
//!
//! | previous | new | emitted |
//! |----------|-----|---------|
//! | same kind | same kind | `update` when props differ, then recurse |
//! | kind A | kind B | `delete` then `insert` at that position |
//! | none | description | `insert` (subtree in pre-order) |
//! | node | none or malformed | `delete` |
//!
//! Components are transparent: their single rendered child occupies the
//! component's output position. Offscreen nodes are retained but occupy no
//! output position.
//!
//! Every mutation addresses its target by the index path it has at the
//! moment it is applied, so the list must be applied in order.

use crate::actors::ActorDirectory;
use crate::component::{ComponentRegistry, Scope};
use crate::error::{ReconcileError, ReconcileResult};
use crate::node::{HydrationMode, MutationKind, NodeArena, PreviousVersion, ReconciliationNode};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::mem;
use std::slice;
use std::sync::Arc;
use trellis_core::description::{Description, Kind};
use trellis_core::hydration::ResumeSpan;
use trellis_core::ids::NodeId;
use trellis_core::message::QueuedEffect;
use trellis_core::mutation::{Mutation, OutputKind, Path};

/// Diff behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
	/// Match sibling groups by key when every description in the group
	/// carries a unique key. Positional pairing otherwise.
	pub keyed: bool,
}

/// Collects mutations, or swallows them while diffing an offscreen subtree.
pub(crate) struct Sink<'a> {
	ops: &'a mut Vec<Mutation>,
	live: bool,
}

impl<'a> Sink<'a> {
	pub(crate) fn new(ops: &'a mut Vec<Mutation>) -> Self {
		Self { ops, live: true }
	}

	pub(crate) fn muted(&mut self) -> Sink<'_> {
		Sink {
			ops: &mut *self.ops,
			live: false,
		}
	}

	pub(crate) fn is_live(&self) -> bool {
		self.live
	}

	pub(crate) fn push(&mut self, mutation: Mutation) {
		if self.live {
			self.ops.push(mutation);
		}
	}
}

/// Owner of the retained node tree.
///
/// A reconciler lives on the background context for the lifetime of one
/// render root.
pub struct Reconciler {
	pub(crate) registry: Arc<ComponentRegistry>,
	options: DiffOptions,
	pub(crate) arena: NodeArena,
	pub(crate) actors: ActorDirectory,
	/// Progressive hydration: islands waiting on a named dependency.
	pub(crate) deferred: IndexMap<String, Vec<NodeId>>,
	/// Resumable hydration: components retained but never rendered, with
	/// the id span their server render used.
	pub(crate) unrendered: HashMap<NodeId, ResumeSpan>,
	touched: Vec<NodeId>,
}

impl Reconciler {
	pub fn new(registry: Arc<ComponentRegistry>) -> Self {
		Self::with_options(registry, DiffOptions::default())
	}

	pub fn with_options(registry: Arc<ComponentRegistry>, options: DiffOptions) -> Self {
		Self {
			registry,
			options,
			arena: NodeArena::new(),
			actors: ActorDirectory::new(),
			deferred: IndexMap::new(),
			unrendered: HashMap::new(),
			touched: Vec::new(),
		}
	}

	pub fn options(&self) -> DiffOptions {
		self.options
	}

	pub fn arena(&self) -> &NodeArena {
		&self.arena
	}

	pub fn root(&self) -> Option<NodeId> {
		self.arena.root()
	}

	pub fn node(&self, id: NodeId) -> Option<&ReconciliationNode> {
		self.arena.get(id)
	}

	/// Diffs the retained tree against `description` and returns the
	/// mutation list in depth-first pre-order.
	pub fn reconcile(&mut self, description: &Description) -> Vec<Mutation> {
		let mut ops = Vec::new();
		let previous: Vec<NodeId> = self.arena.root().into_iter().collect();
		let mut out_index = 0;
		let children = self.diff_group(
			None,
			&Path::root(),
			&mut out_index,
			previous,
			slice::from_ref(description),
			&mut Sink::new(&mut ops),
		);
		self.arena.set_root(children.first().copied());
		self.finish_pass();
		tracing::debug!(
			mutations = ops.len(),
			nodes = self.arena.len(),
			"reconciled description tree"
		);
		ops
	}

	/// Re-runs the nearest component at or above `node` and diffs only its
	/// subtree.
	pub fn rerender(&mut self, node: NodeId) -> ReconcileResult<Vec<Mutation>> {
		self.resume_enclosing(node);
		if !self.arena.contains(node) {
			return Err(ReconcileError::UnknownNode(node));
		}
		let Some(component) = self.arena.owning_component(node) else {
			tracing::debug!(node = %node, "no component owns node, nothing to re-render");
			return Ok(Vec::new());
		};
		let mut ops = Vec::new();
		let (parent_path, mut out_index) = self.output_position(component);
		let mut sink = Sink::new(&mut ops);
		if self.arena.is_hidden(component) {
			self.rerender_in_place(component, &parent_path, &mut out_index, &mut sink.muted());
		} else {
			self.rerender_in_place(component, &parent_path, &mut out_index, &mut sink);
		}
		self.finish_pass();
		tracing::debug!(component = %component, mutations = ops.len(), "re-rendered component");
		Ok(ops)
	}

	/// Drains every node's queued effects in tree order.
	pub fn take_effects(&mut self) -> Vec<QueuedEffect> {
		let Some(root) = self.arena.root() else {
			return Vec::new();
		};
		let mut effects = Vec::new();
		for id in self.arena.subtree(root) {
			if let Some(node) = self.arena.get_mut(id) {
				effects.extend(
					node.pending_effects
						.drain(..)
						.map(|effect| QueuedEffect { node: id, effect }),
				);
			}
		}
		effects
	}

	pub(crate) fn diff_group(
		&mut self,
		parent: Option<NodeId>,
		parent_path: &Path,
		out_index: &mut usize,
		previous: Vec<NodeId>,
		next: &[Description],
		sink: &mut Sink<'_>,
	) -> Vec<NodeId> {
		if self.options.keyed && self.is_keyed_group(&previous, next) {
			return self.diff_keyed(parent, parent_path, out_index, previous, next, sink);
		}

		let mut by_index: BTreeMap<usize, NodeId> = previous
			.iter()
			.filter_map(|id| self.arena.get(*id).map(|node| (node.index, *id)))
			.collect();
		let len = next
			.len()
			.max(by_index.keys().next_back().map_or(0, |last| last + 1));
		let mut children = Vec::with_capacity(next.len());

		for index in 0..len {
			let prev = by_index.remove(&index);
			let desc = next.get(index).filter(|desc| self.is_renderable(desc));
			match (prev, desc) {
				(Some(prev), Some(desc)) if self.same_kind(prev, desc) => {
					self.update_node(prev, desc, index, parent_path, out_index, sink);
					children.push(prev);
				}
				(Some(prev), Some(desc)) => {
					self.remove_node(prev, parent_path, *out_index, sink);
					children.extend(self.insert_node(desc, parent, index, parent_path, out_index, sink));
				}
				(None, Some(desc)) => {
					children.extend(self.insert_node(desc, parent, index, parent_path, out_index, sink));
				}
				(Some(prev), None) => {
					if index < next.len() {
						tracing::debug!(node = %prev, index, "malformed description replaces node");
					}
					self.remove_node(prev, parent_path, *out_index, sink);
				}
				(None, None) => {
					tracing::debug!(index, "skipping malformed description");
				}
			}
		}
		children
	}

	fn is_keyed_group(&self, previous: &[NodeId], next: &[Description]) -> bool {
		if previous.is_empty() || next.is_empty() {
			return false;
		}
		let mut seen = HashSet::new();
		next.iter()
			.all(|desc| desc.key.as_ref().is_some_and(|key| seen.insert(key)))
			&& previous
				.iter()
				.all(|id| self.arena.get(*id).is_some_and(|node| node.key.is_some()))
	}

	fn diff_keyed(
		&mut self,
		parent: Option<NodeId>,
		parent_path: &Path,
		out_index: &mut usize,
		previous: Vec<NodeId>,
		next: &[Description],
		sink: &mut Sink<'_>,
	) -> Vec<NodeId> {
		let mut by_key: HashMap<String, NodeId> = previous
			.iter()
			.filter_map(|id| {
				let key = self.arena.get(*id)?.key.clone()?;
				Some((key, *id))
			})
			.collect();

		let mut matches = Vec::with_capacity(next.len());
		for desc in next {
			let candidate = desc
				.key
				.as_ref()
				.and_then(|key| by_key.get(key).copied())
				.filter(|id| self.is_renderable(desc) && self.same_kind(*id, desc));
			if let (Some(key), Some(_)) = (desc.key.as_ref(), candidate) {
				by_key.remove(key);
			}
			matches.push(candidate);
		}
		let matched: HashSet<NodeId> = matches.iter().flatten().copied().collect();

		// Visible previous nodes still waiting to be placed, in output order.
		// They occupy the slots starting at `out_index`.
		let mut pending: Vec<NodeId> = previous
			.iter()
			.copied()
			.filter(|id| self.width(*id) > 0)
			.collect();

		for id in previous.iter().filter(|id| !matched.contains(*id)) {
			if let Some(position) = pending.iter().position(|p| p == id) {
				sink.push(Mutation::Delete {
					parent_path: parent_path.clone(),
					target_path: parent_path.child(*out_index + position),
				});
				pending.remove(position);
			}
			self.drop_subtree(*id);
		}

		let mut children = Vec::with_capacity(next.len());
		let mut moves = 0;
		for (index, desc) in next.iter().enumerate() {
			match matches[index] {
				Some(id) => {
					if let Some(position) = pending.iter().position(|p| *p == id) {
						if position > 0 {
							sink.push(Mutation::Move {
								parent_path: parent_path.clone(),
								from: *out_index + position,
								to: *out_index,
							});
							moves += 1;
						}
						pending.remove(position);
					}
					self.update_node(id, desc, index, parent_path, out_index, sink);
					children.push(id);
				}
				None => {
					children.extend(self.insert_node(desc, parent, index, parent_path, out_index, sink));
				}
			}
		}
		tracing::debug!(parent = ?parent, moves, "keyed sibling group diffed");
		children
	}

	fn update_node(
		&mut self,
		id: NodeId,
		desc: &Description,
		index: usize,
		parent_path: &Path,
		out_index: &mut usize,
		sink: &mut Sink<'_>,
	) {
		let previous_width = self.width(id);
		let Some(node) = self.arena.get_mut(id) else {
			return;
		};
		node.index = index;
		node.key = desc.key.clone();
		// Unchanged props emit nothing, so `[A] -> [A, B]` yields only `insert(B)`.
		let previous_props = if node.props != desc.props {
			let old = mem::replace(&mut node.props, desc.props.clone());
			node.previous_version = Some(PreviousVersion {
				props: old.clone(),
				generation: node.generation,
			});
			node.generation += 1;
			node.mutation_kind = MutationKind::Update;
			self.touched.push(id);
			Some(old)
		} else {
			None
		};
		let was_offscreen = mem::replace(&mut node.is_offscreen, desc.offscreen);

		let mut detached = 0;
		match (was_offscreen, desc.offscreen) {
			(false, false) => self.patch(id, desc, previous_props, parent_path, out_index, sink),
			(false, true) => {
				if previous_width > 0 {
					sink.push(Mutation::Delete {
						parent_path: parent_path.clone(),
						target_path: parent_path.child(*out_index),
					});
				}
				self.patch(id, desc, previous_props, parent_path, &mut detached, &mut sink.muted());
				self.clear_output_refs(id);
			}
			(true, false) => {
				self.patch(id, desc, previous_props, parent_path, &mut detached, &mut sink.muted());
				self.emit_inserts(id, parent_path, out_index, sink);
			}
			(true, true) => {
				self.patch(id, desc, previous_props, parent_path, &mut detached, &mut sink.muted());
			}
		}
	}

	fn patch(
		&mut self,
		id: NodeId,
		desc: &Description,
		previous_props: Option<trellis_core::description::Props>,
		parent_path: &Path,
		out_index: &mut usize,
		sink: &mut Sink<'_>,
	) {
		let Some(node) = self.arena.get(id) else {
			return;
		};
		let target_path = parent_path.child(*out_index);
		match node.kind.clone() {
			Kind::Element(_) => {
				if let Some(previous_props) = previous_props {
					sink.push(Mutation::Update {
						parent_path: parent_path.clone(),
						target_path: target_path.clone(),
						node: id,
						props: node.props.clone(),
						previous_props,
					});
				}
				*out_index += 1;
				let previous = self.arena.children(id);
				let mut child_index = 0;
				let children = self.diff_group(
					Some(id),
					&target_path,
					&mut child_index,
					previous,
					&desc.children,
					sink,
				);
				self.arena.set_children(id, &children);
			}
			Kind::Text => {
				if let Some(previous_props) = previous_props {
					sink.push(Mutation::Update {
						parent_path: parent_path.clone(),
						target_path,
						node: id,
						props: node.props.clone(),
						previous_props,
					});
				}
				*out_index += 1;
			}
			Kind::Component(_) => self.rerender_in_place(id, parent_path, out_index, sink),
		}
	}

	pub(crate) fn rerender_in_place(
		&mut self,
		id: NodeId,
		parent_path: &Path,
		out_index: &mut usize,
		sink: &mut Sink<'_>,
	) {
		self.resume(id);
		let rendered = self.render_component(id);
		let previous = self.arena.children(id);
		let children = self.diff_group(
			Some(id),
			parent_path,
			out_index,
			previous,
			slice::from_ref(&rendered),
			sink,
		);
		self.arena.set_children(id, &children);
	}

	fn insert_node(
		&mut self,
		desc: &Description,
		parent: Option<NodeId>,
		index: usize,
		parent_path: &Path,
		out_index: &mut usize,
		sink: &mut Sink<'_>,
	) -> Option<NodeId> {
		let id = self.build(desc, parent, index)?;
		self.emit_inserts(id, parent_path, out_index, sink);
		Some(id)
	}

	/// Creates retained nodes for a description subtree. Ids are allocated
	/// in depth-first pre-order.
	pub(crate) fn build(
		&mut self,
		desc: &Description,
		parent: Option<NodeId>,
		index: usize,
	) -> Option<NodeId> {
		if !self.is_renderable(desc) {
			tracing::debug!(index, "skipping malformed description");
			return None;
		}
		let kind = desc.kind.clone()?;
		let id = self.alloc_described(desc, kind.clone(), parent, index);
		let children: Vec<NodeId> = match kind {
			Kind::Element(_) => desc
				.children
				.iter()
				.enumerate()
				.filter_map(|(position, child)| self.build(child, Some(id), position))
				.collect(),
			Kind::Text => Vec::new(),
			Kind::Component(_) => {
				let rendered = self.render_component(id);
				self.build(&rendered, Some(id), 0).into_iter().collect()
			}
		};
		self.arena.set_children(id, &children);
		Some(id)
	}

	/// Allocates a node carrying `desc`'s key, props and visibility.
	/// Children are not built.
	pub(crate) fn alloc_described(
		&mut self,
		desc: &Description,
		kind: Kind,
		parent: Option<NodeId>,
		index: usize,
	) -> NodeId {
		let id = self.arena.alloc(kind, parent, index);
		self.touched.push(id);
		if let Some(node) = self.arena.get_mut(id) {
			node.key = desc.key.clone();
			node.props = desc.props.clone();
			node.is_offscreen = desc.offscreen;
		}
		id
	}

	/// Emits inserts for a retained subtree at `out_index` in pre-order.
	pub(crate) fn emit_inserts(
		&mut self,
		id: NodeId,
		parent_path: &Path,
		out_index: &mut usize,
		sink: &mut Sink<'_>,
	) {
		let Some((kind, props)) = self
			.arena
			.get(id)
			.filter(|node| !node.is_offscreen)
			.map(|node| (node.kind.clone(), node.props.clone()))
		else {
			return;
		};
		let output = match kind {
			Kind::Element(tag) => OutputKind::Element(tag),
			Kind::Text => OutputKind::Text,
			Kind::Component(_) => {
				for child in self.arena.children(id) {
					self.emit_inserts(child, parent_path, out_index, sink);
				}
				return;
			}
		};
		if sink.is_live()
			&& let Some(node) = self.arena.get_mut(id)
		{
			node.output_ref = Some(id);
		}
		let target_path = parent_path.child(*out_index);
		sink.push(Mutation::Insert {
			parent_path: parent_path.clone(),
			target_path: target_path.clone(),
			node: id,
			output,
			props,
		});
		*out_index += 1;
		let mut child_index = 0;
		for child in self.arena.children(id) {
			self.emit_inserts(child, &target_path, &mut child_index, sink);
		}
	}

	fn remove_node(&mut self, id: NodeId, parent_path: &Path, out_index: usize, sink: &mut Sink<'_>) {
		if self.width(id) > 0 {
			sink.push(Mutation::Delete {
				parent_path: parent_path.clone(),
				target_path: parent_path.child(out_index),
			});
		}
		self.drop_subtree(id);
	}

	/// Discards a retained subtree. Actors hosted inside it are unregistered.
	pub(crate) fn drop_subtree(&mut self, id: NodeId) {
		let removed = self.arena.remove_subtree(id);
		for node in &removed {
			self.actors.remove_host(node.id);
			self.unrendered.remove(&node.id);
		}
		tracing::debug!(node = %id, removed = removed.len(), "dropped retained subtree");
	}

	fn clear_output_refs(&mut self, id: NodeId) {
		for node in self.arena.subtree(id) {
			if let Some(node) = self.arena.get_mut(node) {
				node.output_ref = None;
			}
		}
	}

	/// Runs a component's render function in its scope.
	pub(crate) fn render_component(&mut self, id: NodeId) -> Description {
		let Some(node) = self.arena.get_mut(id) else {
			return Description::malformed();
		};
		let Kind::Component(name) = &node.kind else {
			return Description::malformed();
		};
		let Some(render) = self.registry.component(name) else {
			tracing::warn!(component = %name, "component is not registered");
			return Description::malformed();
		};
		let props = node.props.clone();
		let mut scope = Scope::enter(node);
		let rendered = render(&props, &mut scope);
		scope.exit(node);
		rendered
	}

	/// Number of output slots a node occupies in its parent's output list.
	pub(crate) fn width(&self, id: NodeId) -> usize {
		let Some(node) = self.arena.get(id) else {
			return 0;
		};
		if node.is_offscreen {
			return 0;
		}
		if let Some(span) = self.unrendered.get(&id) {
			return span.width;
		}
		match node.kind {
			Kind::Element(_) | Kind::Text => 1,
			Kind::Component(_) => self
				.arena
				.children(id)
				.first()
				.map_or(0, |child| self.width(*child)),
		}
	}

	/// Output parent path and slot index of a node, computed from the
	/// retained tree.
	pub(crate) fn output_position(&self, id: NodeId) -> (Path, usize) {
		let mut offset = 0;
		let mut current = id;
		loop {
			let Some(parent) = self.arena.get(current).and_then(|node| node.parent) else {
				return (Path::root(), offset);
			};
			for sibling in self.arena.children(parent) {
				if sibling == current {
					break;
				}
				offset += self.width(sibling);
			}
			let parent_is_component = self
				.arena
				.get(parent)
				.is_some_and(|node| node.kind.is_component());
			if !parent_is_component {
				let (grandparent_path, index) = self.output_position(parent);
				return (grandparent_path.child(index), offset);
			}
			current = parent;
		}
	}

	pub(crate) fn is_renderable(&self, desc: &Description) -> bool {
		match &desc.kind {
			None => false,
			Some(Kind::Component(name)) => self.registry.has_component(name),
			Some(_) => true,
		}
	}

	fn same_kind(&self, id: NodeId, desc: &Description) -> bool {
		self.arena
			.get(id)
			.is_some_and(|node| desc.kind.as_ref() == Some(&node.kind))
	}

	/// Closes the diff window: clears every transient mutation kind.
	pub(crate) fn finish_pass(&mut self) {
		for id in self.touched.drain(..) {
			if let Some(node) = self.arena.get_mut(id) {
				node.mutation_kind = MutationKind::None;
			}
		}
	}

	pub(crate) fn set_hydration_mode(&mut self, root: NodeId, mode: HydrationMode) {
		for id in self.arena.subtree(root) {
			if let Some(node) = self.arena.get_mut(id) {
				node.hydration_mode = mode;
			}
		}
	}

	/// Forgets the retained tree entirely, restarting id allocation.
	pub(crate) fn reset(&mut self) {
		if !self.arena.is_empty() {
			tracing::debug!(nodes = self.arena.len(), "discarding retained tree");
		}
		self.arena.reset();
		self.actors.clear();
		self.deferred.clear();
		self.unrendered.clear();
		self.touched.clear();
	}
}

impl std::fmt::Debug for Reconciler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Reconciler")
			.field("options", &self.options)
			.field("nodes", &self.arena.len())
			.field("actors", &self.actors.len())
			.field("deferred", &self.deferred.len())
			.field("unrendered", &self.unrendered.len())
			.finish()
	}
}
