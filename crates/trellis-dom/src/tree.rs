//! The live output tree.
//!
//! An arena of element and text nodes under a single container. Mutations
//! address nodes by child-index [`Path`] from the container, so the tree
//! only needs to support positional resolution and positional edits.
//!
//! The tree also serializes to HTML, which is what server-side rendering
//! produces and what hydration later adopts.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use trellis_core::description::HandlerRef;
use trellis_core::ids::NodeId;
use trellis_core::markers::is_ownership_marker;
use trellis_core::mutation::Path;

/// Identifier of a node in the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(usize);

impl fmt::Display for OutputId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputNodeKind {
	Container,
	Element(String),
	Text(String),
}

/// A listener bound on an output node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundListener {
	pub handler: HandlerRef,
	/// Reconciliation node the binding came from.
	pub owner: NodeId,
}

#[derive(Debug, Clone)]
pub struct OutputNode {
	kind: OutputNodeKind,
	attributes: BTreeMap<String, String>,
	listeners: BTreeMap<String, BoundListener>,
	children: Vec<OutputId>,
	parent: Option<OutputId>,
	owner: Option<NodeId>,
}

impl OutputNode {
	fn new(kind: OutputNodeKind) -> Self {
		Self {
			kind,
			attributes: BTreeMap::new(),
			listeners: BTreeMap::new(),
			children: Vec::new(),
			parent: None,
			owner: None,
		}
	}

	pub fn kind(&self) -> &OutputNodeKind {
		&self.kind
	}

	/// Tag name for elements.
	pub fn tag(&self) -> Option<&str> {
		match &self.kind {
			OutputNodeKind::Element(tag) => Some(tag),
			_ => None,
		}
	}

	/// Content for text nodes.
	pub fn text(&self) -> Option<&str> {
		match &self.kind {
			OutputNodeKind::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn is_text(&self) -> bool {
		matches!(self.kind, OutputNodeKind::Text(_))
	}

	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.get(name).map(String::as_str)
	}

	pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
		self.attributes
			.iter()
			.map(|(name, value)| (name.as_str(), value.as_str()))
	}

	pub fn listener(&self, event: &str) -> Option<&BoundListener> {
		self.listeners.get(event)
	}

	pub fn listeners(&self) -> impl Iterator<Item = (&str, &BoundListener)> {
		self.listeners
			.iter()
			.map(|(event, listener)| (event.as_str(), listener))
	}

	pub fn children(&self) -> &[OutputId] {
		&self.children
	}

	pub fn parent(&self) -> Option<OutputId> {
		self.parent
	}

	/// Reconciliation node this output node was committed or hydrated for.
	pub fn owner(&self) -> Option<NodeId> {
		self.owner
	}
}

/// Arena of output nodes rooted at a container.
#[derive(Debug, Clone)]
pub struct OutputTree {
	nodes: HashMap<OutputId, OutputNode>,
	container: OutputId,
	next_id: usize,
}

impl Default for OutputTree {
	fn default() -> Self {
		Self::new()
	}
}

impl OutputTree {
	/// Creates an empty tree with a container.
	pub fn new() -> Self {
		let container = OutputId(0);
		let mut nodes = HashMap::new();
		nodes.insert(container, OutputNode::new(OutputNodeKind::Container));
		Self {
			nodes,
			container,
			next_id: 1,
		}
	}

	pub fn container(&self) -> OutputId {
		self.container
	}

	pub fn get(&self, id: OutputId) -> Option<&OutputNode> {
		self.nodes.get(&id)
	}

	/// Number of nodes, excluding the container.
	pub fn len(&self) -> usize {
		self.nodes.len() - 1
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Creates a detached element.
	pub fn create_element(&mut self, tag: impl Into<String>) -> OutputId {
		self.create(OutputNodeKind::Element(tag.into()))
	}

	/// Creates a detached text node.
	pub fn create_text(&mut self, text: impl Into<String>) -> OutputId {
		self.create(OutputNodeKind::Text(text.into()))
	}

	fn create(&mut self, kind: OutputNodeKind) -> OutputId {
		let id = OutputId(self.next_id);
		self.next_id += 1;
		self.nodes.insert(id, OutputNode::new(kind));
		id
	}

	/// Appends a new element under `parent`.
	pub fn append_element(&mut self, parent: OutputId, tag: impl Into<String>) -> Option<OutputId> {
		let len = self.get(parent)?.children.len();
		let child = self.create_element(tag);
		self.insert_child(parent, len, child).then_some(child)
	}

	/// Appends a new text node under `parent`.
	pub fn append_text(&mut self, parent: OutputId, text: impl Into<String>) -> Option<OutputId> {
		let len = self.get(parent)?.children.len();
		let child = self.create_text(text);
		self.insert_child(parent, len, child).then_some(child)
	}

	/// Inserts a detached node as child `index` of `parent`.
	///
	/// Returns false, and discards `child`, if `parent` is missing, is a
	/// text node, or `index` is past the end.
	pub fn insert_child(&mut self, parent: OutputId, index: usize, child: OutputId) -> bool {
		let accepted = self
			.nodes
			.get(&parent)
			.is_some_and(|node| !node.is_text() && index <= node.children.len());
		if !accepted || !self.nodes.contains_key(&child) {
			self.discard(child);
			return false;
		}
		if let Some(node) = self.nodes.get_mut(&parent) {
			node.children.insert(index, child);
		}
		if let Some(node) = self.nodes.get_mut(&child) {
			node.parent = Some(parent);
		}
		true
	}

	/// Removes child `index` of `parent` with its whole subtree.
	pub fn remove_child(&mut self, parent: OutputId, index: usize) -> Option<OutputId> {
		let node = self.nodes.get_mut(&parent)?;
		if index >= node.children.len() {
			return None;
		}
		let child = node.children.remove(index);
		self.discard(child);
		Some(child)
	}

	/// Moves child `from` of `parent` to position `to`.
	pub fn move_child(&mut self, parent: OutputId, from: usize, to: usize) -> bool {
		let Some(node) = self.nodes.get_mut(&parent) else {
			return false;
		};
		if from >= node.children.len() || to >= node.children.len() {
			return false;
		}
		let child = node.children.remove(from);
		node.children.insert(to, child);
		true
	}

	fn discard(&mut self, id: OutputId) {
		let mut stack = vec![id];
		while let Some(id) = stack.pop() {
			if let Some(node) = self.nodes.remove(&id) {
				stack.extend(node.children);
			}
		}
	}

	/// Removes everything under the container.
	pub fn clear(&mut self) {
		let children = self
			.nodes
			.get_mut(&self.container)
			.map(|container| std::mem::take(&mut container.children))
			.unwrap_or_default();
		for child in children {
			self.discard(child);
		}
	}

	/// Walks `path` from the container.
	pub fn resolve(&self, path: &Path) -> Option<OutputId> {
		path.as_slice()
			.iter()
			.try_fold(self.container, |current, &index| {
				self.get(current)?.children.get(index).copied()
			})
	}

	/// Returns the child-index path of `id` from the container.
	pub fn path_of(&self, id: OutputId) -> Option<Path> {
		let mut indices = Vec::new();
		let mut current = id;
		while current != self.container {
			let parent = self.get(current)?.parent?;
			let index = self
				.get(parent)?
				.children
				.iter()
				.position(|&child| child == current)?;
			indices.push(index);
			current = parent;
		}
		indices.reverse();
		Some(Path(indices))
	}

	/// Returns `id` and its descendants in pre-order.
	pub fn descendants(&self, id: OutputId) -> Vec<OutputId> {
		let mut out = Vec::new();
		let mut stack = vec![id];
		while let Some(id) = stack.pop() {
			let Some(node) = self.get(id) else {
				continue;
			};
			out.push(id);
			stack.extend(node.children.iter().rev().copied());
		}
		out
	}

	pub fn set_attribute(&mut self, id: OutputId, name: impl Into<String>, value: impl Into<String>) {
		if let Some(node) = self.nodes.get_mut(&id)
			&& !node.is_text()
		{
			node.attributes.insert(name.into(), value.into());
		}
	}

	pub fn remove_attribute(&mut self, id: OutputId, name: &str) -> Option<String> {
		self.nodes.get_mut(&id)?.attributes.remove(name)
	}

	pub fn set_text(&mut self, id: OutputId, text: impl Into<String>) {
		if let Some(node) = self.nodes.get_mut(&id)
			&& let OutputNodeKind::Text(content) = &mut node.kind
		{
			*content = text.into();
		}
	}

	pub fn bind_listener(&mut self, id: OutputId, event: impl Into<String>, listener: BoundListener) {
		if let Some(node) = self.nodes.get_mut(&id) {
			node.listeners.insert(event.into(), listener);
		}
	}

	pub fn unbind_listener(&mut self, id: OutputId, event: &str) -> Option<BoundListener> {
		self.nodes.get_mut(&id)?.listeners.remove(event)
	}

	/// Unbinds every listener in the tree. Markers are kept.
	pub fn clear_listeners(&mut self) {
		for node in self.nodes.values_mut() {
			node.listeners.clear();
		}
	}

	pub fn set_owner(&mut self, id: OutputId, owner: NodeId) {
		if let Some(node) = self.nodes.get_mut(&id) {
			node.owner = Some(owner);
		}
	}

	/// Serializes the container's children to HTML.
	pub fn to_html(&self) -> String {
		self.serialize(true)
	}

	/// Serializes to HTML without ownership markers.
	pub fn to_html_stripped(&self) -> String {
		self.serialize(false)
	}

	fn serialize(&self, markers: bool) -> String {
		let mut out = String::new();
		if let Some(container) = self.get(self.container) {
			for &child in &container.children {
				self.write_node(child, markers, &mut out);
			}
		}
		out
	}

	fn write_node(&self, id: OutputId, markers: bool, out: &mut String) {
		let Some(node) = self.get(id) else {
			return;
		};
		match &node.kind {
			OutputNodeKind::Text(text) => escape_into(text, false, out),
			OutputNodeKind::Container => {
				for &child in &node.children {
					self.write_node(child, markers, out);
				}
			}
			OutputNodeKind::Element(tag) => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in &node.attributes {
					if !markers && is_ownership_marker(name) {
						continue;
					}
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					escape_into(value, true, out);
					out.push('"');
				}
				out.push('>');
				for &child in &node.children {
					self.write_node(child, markers, out);
				}
				out.push_str("</");
				out.push_str(tag);
				out.push('>');
			}
		}
	}
}

fn escape_into(value: &str, attribute: bool, out: &mut String) {
	for c in value.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' if attribute => out.push_str("&quot;"),
			c => out.push(c),
		}
	}
}
