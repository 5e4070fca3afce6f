//! Component and handler registry, and the scope node logic runs in.
//!
//! Description trees only carry names: a [`Kind::Component`] names a
//! render function and a [`HandlerRef`] names an event handler. Both are
//! registered here, on the reconciler side of the channel, so no closure
//! ever has to be copied across it.
//!
//! [`Kind::Component`]: trellis_core::description::Kind::Component

use crate::node::ReconciliationNode;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::mem;
use std::sync::Arc;
use trellis_core::description::{Description, HandlerRef, Props};
use trellis_core::ids::NodeId;
use trellis_core::message::{ActorMessage, EffectDescriptor, EventData};

/// Render function of a component. Returns exactly one child description.
pub type RenderFn = dyn Fn(&Props, &mut Scope) -> Description + Send + Sync;

/// Event handler. Runs in the scope of the owning component.
pub type HandlerFn = dyn Fn(&mut Scope, &EventData) + Send + Sync;

/// Named render functions and event handlers.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
	components: HashMap<String, Arc<RenderFn>>,
	handlers: HashMap<HandlerRef, Arc<HandlerFn>>,
}

impl ComponentRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a component render function under `name`.
	pub fn register_component<F>(&mut self, name: impl Into<String>, render: F) -> &mut Self
	where
		F: Fn(&Props, &mut Scope) -> Description + Send + Sync + 'static,
	{
		self.components.insert(name.into(), Arc::new(render));
		self
	}

	/// Registers an event handler under `name`.
	pub fn register_handler<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
	where
		F: Fn(&mut Scope, &EventData) + Send + Sync + 'static,
	{
		self.handlers.insert(HandlerRef::new(name), Arc::new(handler));
		self
	}

	pub fn component(&self, name: &str) -> Option<Arc<RenderFn>> {
		self.components.get(name).cloned()
	}

	pub fn handler(&self, name: &HandlerRef) -> Option<Arc<HandlerFn>> {
		self.handlers.get(name).cloned()
	}

	pub fn has_component(&self, name: &str) -> bool {
		self.components.contains_key(name)
	}
}

impl fmt::Debug for ComponentRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut components: Vec<&String> = self.components.keys().collect();
		components.sort();
		let mut handlers: Vec<&HandlerRef> = self.handlers.keys().collect();
		handlers.sort();
		f.debug_struct("ComponentRegistry")
			.field("components", &components)
			.field("handlers", &handlers)
			.finish()
	}
}

/// Access to one node's state, mailbox and effect queue while its logic runs.
///
/// State cells are positional: the n-th `use_state` call in a render reads
/// the n-th cell, and the cells survive every pass in which the node keeps
/// its position and kind.
#[derive(Debug)]
pub struct Scope {
	node: NodeId,
	state: Vec<Value>,
	cursor: usize,
	mailbox: VecDeque<ActorMessage>,
	effects: Vec<EffectDescriptor>,
}

impl Scope {
	/// Moves the node's state and mailbox into a scope.
	pub(crate) fn enter(node: &mut ReconciliationNode) -> Self {
		Self {
			node: node.id,
			state: mem::take(&mut node.local_state),
			cursor: 0,
			mailbox: mem::take(&mut node.mailbox),
			effects: Vec::new(),
		}
	}

	/// Moves everything back into the node. Queued effects are appended to
	/// the node's pending effects.
	pub(crate) fn exit(self, node: &mut ReconciliationNode) {
		node.local_state = self.state;
		// Messages that arrived while the logic ran stay behind the undrained ones.
		let mut mailbox = self.mailbox;
		mailbox.append(&mut node.mailbox);
		node.mailbox = mailbox;
		node.pending_effects.extend(self.effects);
	}

	/// Id of the node this scope belongs to.
	pub fn node(&self) -> NodeId {
		self.node
	}

	/// Returns the next state cell, initializing it on first use.
	pub fn use_state(&mut self, init: impl Into<Value>) -> (usize, Value) {
		let slot = self.cursor;
		self.cursor += 1;
		if slot >= self.state.len() {
			self.state.push(init.into());
		}
		(slot, self.state[slot].clone())
	}

	/// Reads a state cell.
	pub fn state(&self, slot: usize) -> Option<&Value> {
		self.state.get(slot)
	}

	/// Writes a state cell, growing the cell list with nulls if needed.
	pub fn set_state(&mut self, slot: usize, value: impl Into<Value>) {
		if slot >= self.state.len() {
			self.state.resize(slot + 1, Value::Null);
		}
		self.state[slot] = value.into();
	}

	/// Drains delivered actor messages in arrival order.
	pub fn take_messages(&mut self) -> Vec<ActorMessage> {
		self.mailbox.drain(..).collect()
	}

	/// Queues a side effect to run after the next commit.
	pub fn queue_effect(&mut self, name: impl Into<String>, payload: impl Into<Value>) {
		self.effects.push(EffectDescriptor {
			name: name.into(),
			payload: payload.into(),
		});
	}
}
