//! Channel payloads exchanged between the render root and the reconciler.
//!
//! Every payload is plain data. Requests flow from the root to the
//! reconciler and are processed in send order; each request except
//! [`ToReconciler::Shutdown`] is answered by exactly one [`ToRoot`] reply
//! carrying the request's sequence number.

use crate::description::{Description, HandlerRef};
use crate::hydration::{HydrationStrategy, ResumePlan};
use crate::ids::{ActorId, NodeId, RequestSeq, TransitionId};
use crate::mutation::Mutation;
use serde::{Deserialize, Serialize};

/// Priority label of a request. Labels do not reorder processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
	#[default]
	High,
	Low,
}

/// An event delivered to node logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
	pub event_type: String,
	#[serde(default)]
	pub detail: serde_json::Value,
}

impl EventData {
	/// Creates an event with no detail.
	pub fn new(event_type: impl Into<String>) -> Self {
		Self {
			event_type: event_type.into(),
			detail: serde_json::Value::Null,
		}
	}

	/// Attaches a detail payload.
	pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
		self.detail = detail;
		self
	}
}

/// A point-to-point message between logical actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorMessage {
	pub from: ActorId,
	pub to: ActorId,
	pub payload: serde_json::Value,
}

/// A side effect queued by node logic, run by collaborators after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
	pub name: String,
	#[serde(default)]
	pub payload: serde_json::Value,
}

/// An effect together with the node that queued it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEffect {
	pub node: NodeId,
	pub effect: EffectDescriptor,
}

/// Requests from the render root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToReconciler {
	/// Diff a full description tree against the retained tree.
	Render {
		seq: RequestSeq,
		description: Description,
		priority: Priority,
		strategy: Option<HydrationStrategy>,
	},
	/// Build the retained tree from server-rendered markup's description and
	/// emit hydrate mutations for the regions the strategy selects.
	Hydrate {
		seq: RequestSeq,
		description: Description,
		strategy: HydrationStrategy,
	},
	/// Record the retained tree without running any component (resumable).
	/// Components stay unrendered until an interaction reaches them.
	InitHydration {
		seq: RequestSeq,
		description: Description,
		strategy: HydrationStrategy,
		plan: ResumePlan,
	},
	/// Re-render the component owning `node`.
	Update {
		seq: RequestSeq,
		node: NodeId,
		priority: Priority,
		transition: Option<TransitionId>,
	},
	RegisterActor {
		seq: RequestSeq,
		node: NodeId,
		actor: ActorId,
	},
	UnregisterActor {
		seq: RequestSeq,
		actor: ActorId,
	},
	SendMessage {
		seq: RequestSeq,
		message: ActorMessage,
	},
	/// Wake a resumable node and run its listener for `event`.
	ExecuteResumableListener {
		seq: RequestSeq,
		node: NodeId,
		event: EventData,
	},
	/// Run a bound listener on an already-hydrated node.
	DispatchEvent {
		seq: RequestSeq,
		node: NodeId,
		handler: HandlerRef,
		event: EventData,
	},
	/// Hydrate islands deferred on `dependency` (progressive hydration).
	ResolveDependency {
		seq: RequestSeq,
		dependency: String,
	},
	/// Stop the background context.
	Shutdown,
}

impl ToReconciler {
	/// Returns the request's sequence number. `Shutdown` has none.
	pub fn seq(&self) -> Option<RequestSeq> {
		match self {
			ToReconciler::Render { seq, .. }
			| ToReconciler::Hydrate { seq, .. }
			| ToReconciler::InitHydration { seq, .. }
			| ToReconciler::Update { seq, .. }
			| ToReconciler::RegisterActor { seq, .. }
			| ToReconciler::UnregisterActor { seq, .. }
			| ToReconciler::SendMessage { seq, .. }
			| ToReconciler::ExecuteResumableListener { seq, .. }
			| ToReconciler::DispatchEvent { seq, .. }
			| ToReconciler::ResolveDependency { seq, .. } => Some(*seq),
			ToReconciler::Shutdown => None,
		}
	}

	/// Returns the wire name of the request.
	pub fn name(&self) -> &'static str {
		match self {
			ToReconciler::Render { .. } => "RENDER",
			ToReconciler::Hydrate { .. } => "HYDRATE",
			ToReconciler::InitHydration { .. } => "INIT_HYDRATION",
			ToReconciler::Update { .. } => "UPDATE",
			ToReconciler::RegisterActor { .. } => "REGISTER_ACTOR",
			ToReconciler::UnregisterActor { .. } => "UNREGISTER_ACTOR",
			ToReconciler::SendMessage { .. } => "SEND_MESSAGE",
			ToReconciler::ExecuteResumableListener { .. } => "EXECUTE_RESUMABLE_LISTENER",
			ToReconciler::DispatchEvent { .. } => "DISPATCH_EVENT",
			ToReconciler::ResolveDependency { .. } => "RESOLVE_DEPENDENCY",
			ToReconciler::Shutdown => "SHUTDOWN",
		}
	}
}

/// The body of a commit reply.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommitBatch {
	/// Sequence number of the request this batch answers.
	pub seq: RequestSeq,
	/// Depth-first pre-order mutation list.
	pub mutations: Vec<Mutation>,
	/// Effects to run after the mutations are applied.
	#[serde(default)]
	pub effects: Vec<QueuedEffect>,
	pub completed_transition: Option<TransitionId>,
}

impl CommitBatch {
	/// Creates an empty batch answering `seq`.
	pub fn empty(seq: RequestSeq) -> Self {
		Self {
			seq,
			..Self::default()
		}
	}
}

/// Replies from the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "batch", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToRoot {
	/// Result of a full-tree pass.
	Commit(CommitBatch),
	/// Result of an incremental pass.
	CommitPartial(CommitBatch),
}

impl ToRoot {
	/// Returns the batch.
	pub fn batch(&self) -> &CommitBatch {
		match self {
			ToRoot::Commit(batch) | ToRoot::CommitPartial(batch) => batch,
		}
	}

	/// Consumes the reply and returns the batch.
	pub fn into_batch(self) -> CommitBatch {
		match self {
			ToRoot::Commit(batch) | ToRoot::CommitPartial(batch) => batch,
		}
	}

	/// Returns true for partial commits.
	pub fn is_partial(&self) -> bool {
		matches!(self, ToRoot::CommitPartial(_))
	}
}
