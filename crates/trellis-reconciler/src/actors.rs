//! Actor messaging.
//!
//! Logical actors are hosted by reconciliation nodes. A message sent to an
//! actor is appended to its host node's mailbox, and the host component is
//! re-rendered so its logic can drain the mailbox with
//! [`Scope::take_messages`](crate::component::Scope::take_messages).
//!
//! Delivery is at-most-once and unacknowledged: a message for an unknown
//! actor is dropped.

use crate::diff::Reconciler;
use crate::error::{ReconcileError, ReconcileResult};
use std::collections::HashMap;
use trellis_core::ids::{ActorId, NodeId};
use trellis_core::message::ActorMessage;
use trellis_core::mutation::Mutation;

/// Maps actor ids to the nodes hosting them.
#[derive(Debug, Default)]
pub struct ActorDirectory {
	hosts: HashMap<ActorId, NodeId>,
}

impl ActorDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Associates `actor` with `host`, replacing any previous host.
	pub fn register(&mut self, actor: ActorId, host: NodeId) -> Option<NodeId> {
		self.hosts.insert(actor, host)
	}

	pub fn unregister(&mut self, actor: &ActorId) -> Option<NodeId> {
		self.hosts.remove(actor)
	}

	pub fn host(&self, actor: &ActorId) -> Option<NodeId> {
		self.hosts.get(actor).copied()
	}

	/// Forgets every actor hosted by `node`.
	pub fn remove_host(&mut self, node: NodeId) -> usize {
		let before = self.hosts.len();
		self.hosts.retain(|_, host| *host != node);
		before - self.hosts.len()
	}

	pub fn clear(&mut self) {
		self.hosts.clear();
	}

	pub fn len(&self) -> usize {
		self.hosts.len()
	}

	pub fn is_empty(&self) -> bool {
		self.hosts.is_empty()
	}
}

impl Reconciler {
	/// Registers `actor` on the component owning `node` (or `node` itself
	/// when no component owns it).
	pub fn register_actor(&mut self, node: NodeId, actor: ActorId) -> ReconcileResult<()> {
		self.resume_enclosing(node);
		if !self.arena.contains(node) {
			return Err(ReconcileError::UnknownNode(node));
		}
		let host = self.arena.owning_component(node).unwrap_or(node);
		if let Some(previous) = self.actors.register(actor.clone(), host) {
			tracing::debug!(actor = %actor, previous = %previous, "actor re-registered");
		}
		tracing::debug!(actor = %actor, host = %host, "actor registered");
		Ok(())
	}

	pub fn unregister_actor(&mut self, actor: &ActorId) -> bool {
		let removed = self.actors.unregister(actor).is_some();
		tracing::debug!(actor = %actor, removed, "actor unregistered");
		removed
	}

	/// Appends a message to the target's mailbox and re-renders the host.
	pub fn deliver(&mut self, message: ActorMessage) -> ReconcileResult<Vec<Mutation>> {
		let Some(host) = self.actors.host(&message.to) else {
			tracing::debug!(from = %message.from, to = %message.to, "dropping message for unknown actor");
			return Ok(Vec::new());
		};
		let Some(node) = self.arena.get_mut(host) else {
			self.actors.remove_host(host);
			return Ok(Vec::new());
		};
		tracing::trace!(from = %message.from, to = %message.to, host = %host, "message enqueued");
		node.mailbox.push_back(message);
		self.rerender(host)
	}
}
