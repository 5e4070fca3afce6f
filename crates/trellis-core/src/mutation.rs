//! Mutations: atomic instructions from the reconciler to the render root.
//!
//! The reconciler runs off the rendering context and never holds a live
//! output-tree handle, so every mutation addresses its target positionally
//! with index paths from the output container.

use crate::description::Props;
use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered child-index sequence from the output container.
///
/// The empty path addresses the container itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<usize>);

impl Path {
	/// The container path.
	pub fn root() -> Self {
		Self(Vec::new())
	}

	/// Returns this path extended by one child index.
	pub fn child(&self, index: usize) -> Self {
		let mut indices = self.0.clone();
		indices.push(index);
		Self(indices)
	}

	/// Returns the parent path, or `None` for the container.
	pub fn parent(&self) -> Option<Self> {
		let (_, rest) = self.0.split_last()?;
		Some(Self(rest.to_vec()))
	}

	/// Returns the last index, or `None` for the container.
	pub fn last(&self) -> Option<usize> {
		self.0.last().copied()
	}

	/// Number of indices.
	pub fn depth(&self) -> usize {
		self.0.len()
	}

	/// Returns true if `self` is a strict prefix of `other`.
	pub fn is_ancestor_of(&self, other: &Path) -> bool {
		self.0.len() < other.0.len() && other.0.starts_with(&self.0)
	}

	/// Returns the indices.
	pub fn as_slice(&self) -> &[usize] {
		&self.0
	}
}

impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "/")?;
		let parts: Vec<String> = self.0.iter().map(usize::to_string).collect();
		write!(f, "{}", parts.join("/"))
	}
}

impl From<Vec<usize>> for Path {
	fn from(indices: Vec<usize>) -> Self {
		Self(indices)
	}
}

/// What an inserted output node is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "tag", rename_all = "snake_case")]
pub enum OutputKind {
	Element(String),
	Text,
}

/// Mutation discriminant, for inspection and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationOp {
	Insert,
	Update,
	Delete,
	Hydrate,
	Move,
}

impl fmt::Display for MutationOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			MutationOp::Insert => "insert",
			MutationOp::Update => "update",
			MutationOp::Delete => "delete",
			MutationOp::Hydrate => "hydrate",
			MutationOp::Move => "move",
		};
		f.write_str(name)
	}
}

/// One atomic instruction produced by a diff pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
	/// Create an output node and insert it at the last index of `target_path`.
	Insert {
		parent_path: Path,
		target_path: Path,
		node: NodeId,
		output: OutputKind,
		props: Props,
	},
	/// Reconcile the props of an existing output node.
	Update {
		parent_path: Path,
		target_path: Path,
		node: NodeId,
		props: Props,
		previous_props: Props,
	},
	/// Remove the output node at `target_path`.
	Delete {
		parent_path: Path,
		target_path: Path,
	},
	/// Attach props and listeners to existing server-rendered markup.
	///
	/// `output` is what the markup at `target_path` is expected to be.
	Hydrate {
		parent_path: Path,
		target_path: Path,
		node: NodeId,
		output: OutputKind,
		props: Props,
	},
	/// Reorder a child within its parent (keyed diffing only).
	Move {
		parent_path: Path,
		from: usize,
		to: usize,
	},
}

impl Mutation {
	/// Returns the discriminant.
	pub fn op(&self) -> MutationOp {
		match self {
			Mutation::Insert { .. } => MutationOp::Insert,
			Mutation::Update { .. } => MutationOp::Update,
			Mutation::Delete { .. } => MutationOp::Delete,
			Mutation::Hydrate { .. } => MutationOp::Hydrate,
			Mutation::Move { .. } => MutationOp::Move,
		}
	}

	/// Returns the parent path.
	pub fn parent_path(&self) -> &Path {
		match self {
			Mutation::Insert { parent_path, .. }
			| Mutation::Update { parent_path, .. }
			| Mutation::Delete { parent_path, .. }
			| Mutation::Hydrate { parent_path, .. }
			| Mutation::Move { parent_path, .. } => parent_path,
		}
	}

	/// Returns the target path. For moves this is the destination.
	pub fn target_path(&self) -> Path {
		match self {
			Mutation::Insert { target_path, .. }
			| Mutation::Update { target_path, .. }
			| Mutation::Delete { target_path, .. }
			| Mutation::Hydrate { target_path, .. } => target_path.clone(),
			Mutation::Move {
				parent_path, to, ..
			} => parent_path.child(*to),
		}
	}

	/// Returns the owning reconciliation node, if the mutation carries one.
	pub fn node(&self) -> Option<NodeId> {
		match self {
			Mutation::Insert { node, .. }
			| Mutation::Update { node, .. }
			| Mutation::Hydrate { node, .. } => Some(*node),
			Mutation::Delete { .. } | Mutation::Move { .. } => None,
		}
	}
}

impl fmt::Display for Mutation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.node() {
			Some(node) => write!(f, "{}({} @ {})", self.op(), node, self.target_path()),
			None => write!(f, "{}(@ {})", self.op(), self.target_path()),
		}
	}
}
