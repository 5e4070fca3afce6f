//! Ownership and region markers.
//!
//! Ownership markers are written into the output tree on non-hydrating
//! commits. They record which reconciliation node owns an output node and
//! which node owns each interaction, so a resumable root can wake exactly
//! that node without having executed anything upfront.
//!
//! ```text
//! <button data-tr-node="4" data-tr-on-click="4">+</button>
//! ```

/// Attribute naming the reconciliation node that owns an output node.
pub const NODE_MARKER: &str = "data-tr-node";

/// Prefix of per-event ownership attributes (`data-tr-on-click`).
pub const LISTENER_MARKER_PREFIX: &str = "data-tr-on-";

/// Prop marking the root of an interactive region.
pub const ISLAND_ATTR: &str = "data-tr-island";

/// Prop naming the data dependency an island waits on under progressive hydration.
pub const DEFER_ATTR: &str = "data-tr-defer";

/// Container attribute holding the serialized
/// [`ResumePlan`](crate::hydration::ResumePlan) of a server render.
pub const RESUME_ATTR: &str = "data-tr-resume";

/// Returns the ownership attribute for an event type.
pub fn listener_marker(event: &str) -> String {
	format!("{}{}", LISTENER_MARKER_PREFIX, event)
}

/// Returns the event type of an ownership attribute.
pub fn marker_event(attr: &str) -> Option<&str> {
	attr.strip_prefix(LISTENER_MARKER_PREFIX)
		.filter(|event| !event.is_empty())
}

/// Returns true for any ownership marker attribute.
pub fn is_ownership_marker(attr: &str) -> bool {
	attr == NODE_MARKER || marker_event(attr).is_some()
}
