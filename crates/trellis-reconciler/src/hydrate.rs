//! Hydration passes over server-rendered markup.
//!
//! Hydration builds the retained tree from the same description the server
//! rendered, so node ids line up with the server's ownership markers, and
//! then emits `hydrate` mutations for the regions the strategy selects:
//!
//! - `Full`: every node.
//! - `Selective`: only island subtrees (`data-tr-island`).
//! - `Progressive`: everything except islands deferred on a dependency
//!   (`data-tr-defer`); those follow on [`Reconciler::resolve_dependency`].
//! - `Resumable`: nothing. See [`Reconciler::init_hydration`].
//!
//! Resumable roots never run a component before an interaction reaches it.
//! The retained tree is rebuilt from the description alone, and every
//! component is kept as an unrendered leaf holding the id span recorded in
//! the server's [`ResumePlan`]. The first event, update or actor
//! registration inside that span renders the component into exactly those
//! ids, so the server's ownership markers keep naming the right nodes.

use crate::diff::Reconciler;
use crate::node::HydrationMode;
use trellis_core::description::{Kind, PropValue, Props};
use trellis_core::hydration::{HydrationStrategy, ResumePlan, ResumeSpan};
use trellis_core::ids::NodeId;
use trellis_core::markers::{DEFER_ATTR, ISLAND_ATTR};
use trellis_core::mutation::{Mutation, OutputKind, Path};
use trellis_core::Description;

/// Which nodes a hydration walk emits mutations for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
	All,
	Islands { inside: bool },
	Shell,
}

impl Region {
	fn for_strategy(strategy: HydrationStrategy) -> Self {
		match strategy {
			HydrationStrategy::Full | HydrationStrategy::Resumable => Region::All,
			HydrationStrategy::Selective => Region::Islands { inside: false },
			HydrationStrategy::Progressive => Region::Shell,
		}
	}
}

/// Returns true if the props mark an island root.
pub fn is_island(props: &Props) -> bool {
	props
		.get(ISLAND_ATTR)
		.is_some_and(|value| !matches!(value, PropValue::Bool(false) | PropValue::Null))
}

/// Returns the dependency an island waits on, if any.
pub fn deferred_on(props: &Props) -> Option<&str> {
	props
		.get(DEFER_ATTR)
		.and_then(PropValue::as_str)
		.filter(|dependency| !dependency.is_empty())
}

impl Reconciler {
	/// Adopts server-rendered markup described by `description`.
	pub fn hydrate(&mut self, description: &Description, strategy: HydrationStrategy) -> Vec<Mutation> {
		let root = self.adopt(description, HydrationMode::Analyzing);
		let mut ops = Vec::new();
		if let Some(root) = root {
			let mut out_index = 0;
			self.hydrate_walk(
				root,
				&Path::root(),
				&mut out_index,
				Region::for_strategy(strategy),
				&mut ops,
			);
		}
		self.finish_pass();
		tracing::info!(
			strategy = %strategy,
			mutations = ops.len(),
			deferred = self.deferred.len(),
			"hydrated retained tree"
		);
		ops
	}

	/// Records the retained tree for resumable hydration without running a
	/// hydration pass or any component. Every node stays resumable-pending
	/// until an interaction wakes it.
	///
	/// Components missing from `plan` cannot be placed in the server's id
	/// sequence and are rendered upfront instead.
	pub fn init_hydration(&mut self, description: &Description, plan: &ResumePlan) {
		self.reset();
		let root = self.build_skeleton(description, None, 0, plan);
		self.arena.set_root(root);
		if let Some(root) = root {
			self.set_hydration_mode(root, HydrationMode::ResumablePending);
			self.adopt_output_refs(root);
		}
		self.finish_pass();
		tracing::info!(
			nodes = self.arena.len(),
			unrendered = self.unrendered.len(),
			"retained tree initialized for resumable hydration"
		);
	}

	/// Records the id span of every retained component.
	///
	/// Spans are contiguous only for a tree built by a single pass from
	/// empty, which is what a server render is.
	pub fn resume_plan(&self) -> ResumePlan {
		let Some(root) = self.arena.root() else {
			return ResumePlan::default();
		};
		let spans = self
			.arena
			.subtree(root)
			.into_iter()
			.filter(|id| self.arena.get(*id).is_some_and(|node| node.kind.is_component()))
			.map(|id| ResumeSpan {
				node: id,
				len: self.arena.subtree(id).len() as u64,
				width: self.width(id),
			})
			.collect();
		ResumePlan { spans }
	}

	/// Renders `node` if it is an unrendered component, or else the
	/// unrendered component whose span holds `node`.
	pub(crate) fn resume_enclosing(&mut self, node: NodeId) {
		if self.unrendered.is_empty() || self.resume(node) {
			return;
		}
		let enclosing = self
			.unrendered
			.values()
			.find(|span| span.encloses(node))
			.map(|span| span.node);
		if let Some(component) = enclosing {
			self.resume(component);
		}
	}

	/// Renders an unrendered component into the ids its server render used.
	/// Returns false if `id` was not waiting.
	pub(crate) fn resume(&mut self, id: NodeId) -> bool {
		let Some(span) = self.unrendered.remove(&id) else {
			return false;
		};
		let next = self.arena.next_id();
		self.arena.set_next_id(id.0 + 1);
		let rendered = self.render_component(id);
		let children: Vec<NodeId> = self.build(&rendered, Some(id), 0).into_iter().collect();
		self.arena.set_next_id(next.max(self.arena.next_id()));
		self.arena.set_children(id, &children);
		if !self.arena.is_hidden(id) {
			for child in &children {
				self.adopt_output_refs(*child);
			}
		}
		self.set_hydration_mode(id, HydrationMode::None);

		let built = self.arena.subtree(id).len() as u64;
		if built != span.len {
			tracing::warn!(
				node = %id,
				expected = span.len,
				built,
				"resumed component diverged from its server render"
			);
		}
		tracing::debug!(node = %id, nodes = built, "component resumed");
		true
	}

	/// Like [`Reconciler::build`], but components found in `plan` are kept
	/// unrendered and skip their recorded span.
	fn build_skeleton(
		&mut self,
		desc: &Description,
		parent: Option<NodeId>,
		index: usize,
		plan: &ResumePlan,
	) -> Option<NodeId> {
		if !self.is_renderable(desc) {
			tracing::debug!(index, "skipping malformed description");
			return None;
		}
		let kind = desc.kind.clone()?;
		if kind.is_component() {
			let Some(span) = plan.span(NodeId(self.arena.next_id())).copied() else {
				tracing::debug!(index, "component missing from resume plan, rendering upfront");
				return self.build(desc, parent, index);
			};
			let id = self.alloc_described(desc, kind, parent, index);
			self.arena.set_next_id(span.node.0 + span.len.max(1));
			self.unrendered.insert(id, span);
			return Some(id);
		}
		let id = self.alloc_described(desc, kind.clone(), parent, index);
		let children: Vec<NodeId> = match kind {
			Kind::Element(_) => desc
				.children
				.iter()
				.enumerate()
				.filter_map(|(position, child)| self.build_skeleton(child, Some(id), position, plan))
				.collect(),
			_ => Vec::new(),
		};
		self.arena.set_children(id, &children);
		Some(id)
	}

	/// Hydrates the islands deferred on `dependency`.
	pub fn resolve_dependency(&mut self, dependency: &str) -> Vec<Mutation> {
		let Some(islands) = self.deferred.shift_remove(dependency) else {
			tracing::debug!(dependency, "no islands wait on dependency");
			return Vec::new();
		};
		let mut ops = Vec::new();
		for island in islands {
			if !self.arena.contains(island) || self.arena.is_hidden(island) {
				continue;
			}
			let (parent_path, mut out_index) = self.output_position(island);
			self.hydrate_region(island, &parent_path, &mut out_index, Region::Shell, &mut ops);
		}
		self.finish_pass();
		tracing::debug!(dependency, mutations = ops.len(), "resolved deferred islands");
		ops
	}

	fn adopt(&mut self, description: &Description, mode: HydrationMode) -> Option<NodeId> {
		self.reset();
		let root = self.build(description, None, 0);
		self.arena.set_root(root);
		if let Some(root) = root {
			self.set_hydration_mode(root, mode);
		}
		root
	}

	fn hydrate_walk(
		&mut self,
		id: NodeId,
		parent_path: &Path,
		out_index: &mut usize,
		region: Region,
		ops: &mut Vec<Mutation>,
	) {
		let Some(node) = self.arena.get(id) else {
			return;
		};
		if node.is_offscreen {
			self.set_hydration_mode(id, HydrationMode::None);
			return;
		}
		if region == Region::Shell
			&& is_island(&node.props)
			&& let Some(dependency) = deferred_on(&node.props)
		{
			tracing::debug!(node = %id, dependency, "island deferred");
			self.deferred
				.entry(dependency.to_string())
				.or_default()
				.push(id);
			*out_index += self.width(id);
			return;
		}
		self.hydrate_region(id, parent_path, out_index, region, ops);
	}

	/// Hydrates `id` itself, then walks its children.
	fn hydrate_region(
		&mut self,
		id: NodeId,
		parent_path: &Path,
		out_index: &mut usize,
		region: Region,
		ops: &mut Vec<Mutation>,
	) {
		let Some(node) = self.arena.get(id) else {
			return;
		};
		let region = match region {
			Region::Islands { inside } => Region::Islands {
				inside: inside || is_island(&node.props),
			},
			other => other,
		};
		let include = !matches!(region, Region::Islands { inside: false });
		let kind = node.kind.clone();
		let props = node.props.clone();
		if let Some(node) = self.arena.get_mut(id) {
			node.hydration_mode = HydrationMode::None;
		}

		let output = match kind {
			Kind::Component(_) => {
				for child in self.arena.children(id) {
					self.hydrate_walk(child, parent_path, out_index, region, ops);
				}
				return;
			}
			Kind::Element(tag) => OutputKind::Element(tag),
			Kind::Text => OutputKind::Text,
		};
		let child_path = parent_path.child(*out_index);
		*out_index += 1;
		if let Some(node) = self.arena.get_mut(id) {
			node.output_ref = Some(id);
		}
		if include {
			ops.push(Mutation::Hydrate {
				parent_path: parent_path.clone(),
				target_path: child_path.clone(),
				node: id,
				output,
				props,
			});
		}
		let mut child_index = 0;
		for child in self.arena.children(id) {
			self.hydrate_walk(child, &child_path, &mut child_index, region, ops);
		}
	}

	fn adopt_output_refs(&mut self, id: NodeId) {
		let Some(node) = self.arena.get_mut(id) else {
			return;
		};
		if node.is_offscreen {
			return;
		}
		if !node.kind.is_component() {
			node.output_ref = Some(id);
		}
		for child in self.arena.children(id) {
			self.adopt_output_refs(child);
		}
	}
}
