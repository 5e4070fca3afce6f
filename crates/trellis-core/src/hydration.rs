//! Hydration strategies, the device signals used to choose one, and the
//! resume plan a server render leaves behind for resumable roots.

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How existing server-rendered markup is taken over by the client.
///
/// This is a closed set; a render root selects exactly one per lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HydrationStrategy {
	/// One upfront hydration pass over the whole tree.
	#[default]
	Full,
	/// Only explicitly marked interactive regions (islands) are hydrated.
	Selective,
	/// The shell is hydrated first; dependency-bound islands later.
	Progressive,
	/// No upfront pass; nodes wake on first interaction.
	Resumable,
}

impl HydrationStrategy {
	/// All strategies, in declaration order.
	pub const ALL: [HydrationStrategy; 4] = [
		HydrationStrategy::Full,
		HydrationStrategy::Selective,
		HydrationStrategy::Progressive,
		HydrationStrategy::Resumable,
	];

	/// Returns the lowercase name.
	pub fn as_str(self) -> &'static str {
		match self {
			HydrationStrategy::Full => "full",
			HydrationStrategy::Selective => "selective",
			HydrationStrategy::Progressive => "progressive",
			HydrationStrategy::Resumable => "resumable",
		}
	}
}

impl fmt::Display for HydrationStrategy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing an unknown strategy or network class name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {value}")]
pub struct ParseNameError {
	what: &'static str,
	value: String,
}

impl FromStr for HydrationStrategy {
	type Err = ParseNameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		HydrationStrategy::ALL
			.into_iter()
			.find(|strategy| strategy.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| ParseNameError {
				what: "hydration strategy",
				value: s.to_string(),
			})
	}
}

/// Effective network class, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NetworkClass {
	#[serde(rename = "slow-2g")]
	Slow2g,
	#[serde(rename = "2g")]
	TwoG,
	#[serde(rename = "3g")]
	ThreeG,
	#[serde(rename = "4g")]
	#[default]
	FourG,
}

impl FromStr for NetworkClass {
	type Err = ParseNameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"slow-2g" => Ok(NetworkClass::Slow2g),
			"2g" => Ok(NetworkClass::TwoG),
			"3g" => Ok(NetworkClass::ThreeG),
			"4g" => Ok(NetworkClass::FourG),
			_ => Err(ParseNameError {
				what: "network class",
				value: s.to_string(),
			}),
		}
	}
}

/// Device signals supplied by the host for strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceSignals {
	pub is_low_powered_device: bool,
	pub effective_network_class: NetworkClass,
}

impl DeviceSignals {
	/// Creates device signals.
	pub fn new(is_low_powered_device: bool, effective_network_class: NetworkClass) -> Self {
		Self {
			is_low_powered_device,
			effective_network_class,
		}
	}
}

/// Id range and output width of one component in a server render.
///
/// Ids are allocated in pre-order, so a component's subtree holds exactly
/// the ids `node .. node + len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeSpan {
	pub node: NodeId,
	pub len: u64,
	/// Output slots the component's rendered subtree occupies (0 or 1).
	pub width: usize,
}

impl ResumeSpan {
	/// True if `id` lies strictly inside the component's subtree.
	pub fn encloses(&self, id: NodeId) -> bool {
		id.0 > self.node.0 && id.0 < self.node.0 + self.len
	}
}

/// Every component of a server render, in pre-order.
///
/// A resumable root rebuilds the retained tree from the description
/// without running any component; the plan tells it which ids each
/// skipped component would have used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePlan {
	pub spans: Vec<ResumeSpan>,
}

impl ResumePlan {
	pub fn is_empty(&self) -> bool {
		self.spans.is_empty()
	}

	/// The span recorded for the component with id `node`.
	pub fn span(&self, node: NodeId) -> Option<&ResumeSpan> {
		self.spans.iter().find(|span| span.node == node)
	}

	/// Serializes the plan into an attribute value.
	pub fn to_attr(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	pub fn from_attr(value: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(value)
	}
}
