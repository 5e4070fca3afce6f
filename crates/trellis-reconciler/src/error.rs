//! Error types for the background reconciler.

use thiserror::Error;
use trellis_core::description::HandlerRef;
use trellis_core::ids::NodeId;

/// Result type for reconciler operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Failures of incremental requests.
///
/// None of these abort a diff pass. The worker logs them and answers the
/// request with an empty batch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconcileError {
	/// The node is not (or no longer) part of the retained tree.
	#[error("node {0} is not in the retained tree")]
	UnknownNode(NodeId),

	/// No handler is registered under this name.
	#[error("no handler registered as '{0}'")]
	UnknownHandler(HandlerRef),

	/// The node has no binding for the event type.
	#[error("node {node} has no '{event}' listener")]
	NoListener { node: NodeId, event: String },

	/// The worker thread could not be spawned.
	#[error("failed to spawn reconciler thread: {0}")]
	Spawn(#[from] std::io::Error),
}
