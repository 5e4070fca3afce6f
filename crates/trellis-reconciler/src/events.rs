//! Event handling on the reconciler side.
//!
//! Handlers run in the scope of the component owning the target node, and
//! that component is re-rendered afterwards. A resumable node is woken
//! first: the component holding it is rendered for the first time if it
//! never was, and its owner's subtree leaves the resumable-pending state.

use crate::component::Scope;
use crate::diff::Reconciler;
use crate::error::{ReconcileError, ReconcileResult};
use crate::node::HydrationMode;
use trellis_core::description::{HandlerRef, event_name};
use trellis_core::ids::NodeId;
use trellis_core::message::EventData;
use trellis_core::mutation::Mutation;

impl Reconciler {
	/// Runs `handler` for an event delivered to `node`.
	pub fn dispatch(
		&mut self,
		node: NodeId,
		handler: &HandlerRef,
		event: &EventData,
	) -> ReconcileResult<Vec<Mutation>> {
		self.resume_enclosing(node);
		if !self.arena.contains(node) {
			return Err(ReconcileError::UnknownNode(node));
		}
		let callback = self
			.registry
			.handler(handler)
			.ok_or_else(|| ReconcileError::UnknownHandler(handler.clone()))?;
		let owner = self.arena.owning_component(node).unwrap_or(node);
		if let Some(target) = self.arena.get_mut(owner) {
			let mut scope = Scope::enter(target);
			callback(&mut scope, event);
			scope.exit(target);
		}
		tracing::debug!(
			node = %node,
			owner = %owner,
			handler = %handler,
			event = %event.event_type,
			"handler ran"
		);
		self.rerender(owner)
	}

	/// Wakes a resumable node and runs its listener for `event`.
	pub fn wake(&mut self, node: NodeId, event: &EventData) -> ReconcileResult<Vec<Mutation>> {
		self.resume_enclosing(node);
		if !self.arena.contains(node) {
			return Err(ReconcileError::UnknownNode(node));
		}
		let handler = self
			.listener(node, &event.event_type)
			.cloned()
			.ok_or_else(|| ReconcileError::NoListener {
				node,
				event: event.event_type.clone(),
			})?;

		let owner = self.arena.owning_component(node).unwrap_or(node);
		let mut woken = 0;
		for id in self.arena.subtree(owner) {
			if let Some(entry) = self.arena.get_mut(id)
				&& entry.hydration_mode == HydrationMode::ResumablePending
			{
				entry.hydration_mode = HydrationMode::None;
				woken += 1;
			}
		}
		tracing::debug!(node = %node, owner = %owner, woken, "resumable node woken");
		self.dispatch(node, &handler, event)
	}

	/// Returns the handler bound to `event` on `node`, if any.
	pub fn listener(&self, node: NodeId, event: &str) -> Option<&HandlerRef> {
		self.arena
			.get(node)?
			.props
			.iter()
			.find(|(key, _)| event_name(key).as_deref() == Some(event))
			.and_then(|(_, value)| value.as_handler())
	}
}
