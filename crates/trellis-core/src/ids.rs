//! Identifiers shared by both execution contexts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of a reconciliation node.
///
/// Ids are allocated by the reconciler in depth-first pre-order starting at
/// zero, so a server render and a client hydration of the same description
/// agree on every id.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl NodeId {
	/// Returns the raw id.
	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for NodeId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.parse().map(NodeId)
	}
}

/// Caller-facing handle to a reconciliation node.
///
/// The rendering context never holds a reconciliation node itself; it holds
/// this id and sends it across the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeRef(pub NodeId);

impl NodeRef {
	/// Returns the referenced node id.
	pub fn id(self) -> NodeId {
		self.0
	}
}

impl From<NodeId> for NodeRef {
	fn from(id: NodeId) -> Self {
		Self(id)
	}
}

/// Label of a transition batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionId(pub u64);

impl fmt::Display for TransitionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "t{}", self.0)
	}
}

/// Sequence number of a request sent to the reconciler.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestSeq(pub u64);

impl RequestSeq {
	/// Returns the following sequence number.
	pub fn next(self) -> Self {
		Self(self.0 + 1)
	}
}

/// Logical actor identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
	/// Creates a new actor id.
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}
}

impl fmt::Display for ActorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ActorId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}
