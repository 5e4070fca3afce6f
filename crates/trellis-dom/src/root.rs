//! Render Root
//!
//! The rendering-context half of Trellis. A [`Root`] owns the live output
//! tree and one background reconciler thread. Public calls never block on
//! the reconciler: they encode a request, send it and return its sequence
//! number. Replies are picked up by [`Root::frame`] (non-blocking, once per
//! frame) or [`Root::settle`] (blocking until every request is answered),
//! and applied to the live tree in arrival order.
//!
//! ```text
//! render/hydrate/update ──▶ requests ──▶ reconciler thread
//!                                              │
//! frame()/settle() ◀── COMMIT/COMMIT_PARTIAL ◀─┘ ──▶ apply ──▶ effects
//! ```
//!
//! If the reconciler thread dies the channel closes, the root is marked
//! failed and the live tree stays as last committed. Only
//! [`Root::unmount`] is valid afterwards.

use crate::commit::{self, CommitMode};
use crate::config::RootConfig;
use crate::delegation::{self, EventDelegator};
use crate::error::{CommitError, RootError, RootResult};
use crate::hydration::HydrationConfig;
use crate::tree::OutputTree;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use trellis_core::description::Description;
use trellis_core::hydration::{DeviceSignals, HydrationStrategy, ResumePlan};
use trellis_core::ids::{ActorId, NodeRef, RequestSeq, TransitionId};
use trellis_core::markers::RESUME_ATTR;
use trellis_core::message::{ActorMessage, EventData, Priority, QueuedEffect, ToReconciler, ToRoot};
use trellis_core::mutation::Path;
use trellis_core::wire;
use trellis_reconciler::{ComponentRegistry, WorkerHandle};

type EffectHook = dyn FnMut(&QueuedEffect);

struct PendingTransition {
	outstanding: usize,
	on_pending_change: Box<dyn FnMut(bool)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
	Running,
	Failed,
	Unmounted,
}

/// What one [`Root::frame`] applied.
#[derive(Debug, Default)]
pub struct FrameReport {
	/// Commits applied, in arrival order.
	pub commits: usize,
	/// Mutations applied.
	pub applied: usize,
	/// Mutations skipped because their path did not resolve.
	pub skipped: Vec<CommitError>,
	/// Transitions whose pending flag went back to false.
	pub completed_transitions: Vec<TransitionId>,
	/// Effects delivered with the commits.
	pub effects: Vec<QueuedEffect>,
}

/// Rendering-context root of one output tree.
pub struct Root {
	tree: OutputTree,
	config: RootConfig,
	worker: Option<WorkerHandle>,
	lifecycle: Lifecycle,
	seq: RequestSeq,
	outstanding: usize,
	queued: VecDeque<ToRoot>,
	transitions: HashMap<TransitionId, PendingTransition>,
	active_transition: Option<TransitionId>,
	next_transition: u64,
	strategy: Option<HydrationStrategy>,
	/// Sequence number of the hydration request whose commit is not yet applied.
	hydrate_seq: Option<RequestSeq>,
	signals: DeviceSignals,
	delegator: EventDelegator,
	effect_hooks: HashMap<String, Vec<Box<EffectHook>>>,
}

impl fmt::Debug for Root {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Root")
			.field("lifecycle", &self.lifecycle)
			.field("seq", &self.seq)
			.field("outstanding", &self.outstanding)
			.field("queued", &self.queued.len())
			.field("strategy", &self.strategy)
			.field("transitions", &self.transitions.len())
			.field("nodes", &self.tree.len())
			.finish_non_exhaustive()
	}
}

impl Root {
	/// Mounts a root on `container` and starts its reconciler thread.
	///
	/// `container` is empty for client rendering, or holds server-rendered
	/// markup to be adopted by [`Root::hydrate`].
	pub fn new(
		container: OutputTree,
		registry: impl Into<Arc<ComponentRegistry>>,
		config: RootConfig,
	) -> RootResult<Self> {
		let worker = trellis_reconciler::spawn(registry.into(), config.diff)?;
		tracing::info!(
			keyed = config.diff.keyed,
			strategy = ?config.hydration.strategy,
			"render root mounted"
		);
		Ok(Self {
			tree: container,
			config,
			worker: Some(worker),
			lifecycle: Lifecycle::Running,
			seq: RequestSeq::default(),
			outstanding: 0,
			queued: VecDeque::new(),
			transitions: HashMap::new(),
			active_transition: None,
			next_transition: 1,
			strategy: None,
			hydrate_seq: None,
			signals: DeviceSignals::default(),
			delegator: EventDelegator::new(),
			effect_hooks: HashMap::new(),
		})
	}

	/// The live output tree.
	pub fn tree(&self) -> &OutputTree {
		&self.tree
	}

	pub fn config(&self) -> &RootConfig {
		&self.config
	}

	/// Device signals handed to the strategy selector.
	pub fn set_device_signals(&mut self, signals: DeviceSignals) {
		self.signals = signals;
	}

	/// The hydration strategy, once chosen.
	pub fn strategy(&self) -> Option<HydrationStrategy> {
		self.strategy
	}

	/// Requests sent but not yet answered.
	pub fn outstanding(&self) -> usize {
		self.outstanding
	}

	/// True while requests or received commits are still pending.
	pub fn has_pending_work(&self) -> bool {
		self.outstanding > 0 || !self.queued.is_empty()
	}

	/// True until the commit answering the hydration request is applied.
	pub fn is_hydrating(&self) -> bool {
		self.hydrate_seq.is_some()
	}

	pub fn is_failed(&self) -> bool {
		self.lifecycle == Lifecycle::Failed
	}

	/// Event types delegated on the container (resumable roots only).
	pub fn delegated_event_types(&self) -> Vec<String> {
		self.delegator.event_types().map(str::to_string).collect()
	}

	fn ensure_running(&self) -> RootResult<()> {
		match self.lifecycle {
			Lifecycle::Running => Ok(()),
			Lifecycle::Failed => Err(RootError::ChannelClosed),
			Lifecycle::Unmounted => Err(RootError::Unmounted),
		}
	}

	fn fail(&mut self) -> RootError {
		if self.lifecycle == Lifecycle::Running {
			tracing::error!(
				outstanding = self.outstanding,
				"reconciler channel closed, live tree frozen"
			);
			self.lifecycle = Lifecycle::Failed;
		}
		RootError::ChannelClosed
	}

	fn send<F>(&mut self, build: F) -> RootResult<RequestSeq>
	where
		F: FnOnce(RequestSeq) -> ToReconciler,
	{
		self.ensure_running()?;
		let seq = self.seq.next();
		let request = build(seq);
		let frame = wire::encode("request", &request)?;
		let Some(worker) = &self.worker else {
			return Err(RootError::Unmounted);
		};
		if worker.requests.send(frame).is_err() {
			return Err(self.fail());
		}
		self.seq = seq;
		self.outstanding += 1;
		tracing::debug!(request = request.name(), seq = seq.0, "request sent");
		Ok(seq)
	}

	/// Sends a full description tree to be diffed against the retained tree.
	pub fn render(&mut self, description: Description) -> RootResult<RequestSeq> {
		let strategy = self.strategy;
		self.send(|seq| ToReconciler::Render {
			seq,
			description,
			priority: Priority::High,
			strategy,
		})
	}

	/// Adopts the server-rendered markup in the container.
	///
	/// The strategy is chosen on the first call, from `config` or else from
	/// the root configuration, and is kept for the root's lifetime. Later
	/// calls ignore `config`.
	pub fn hydrate(
		&mut self,
		description: Description,
		config: Option<HydrationConfig>,
	) -> RootResult<HydrationStrategy> {
		self.ensure_running()?;
		let strategy = match self.strategy {
			Some(strategy) => {
				if config.is_some() {
					tracing::debug!(strategy = %strategy, "hydration strategy already chosen");
				}
				strategy
			}
			None => {
				let config = config.unwrap_or_else(|| self.config.hydration.strategy.to_config());
				let strategy = config.choose(&self.signals);
				tracing::info!(strategy = %strategy, ?config, "hydration strategy chosen");
				self.strategy = Some(strategy);
				strategy
			}
		};

		let seq = if strategy == HydrationStrategy::Resumable {
			let plan = self.resume_plan();
			let seq = self.send(|seq| ToReconciler::InitHydration {
				seq,
				description,
				strategy,
				plan,
			})?;
			self.delegator
				.activate(self.config.delegation.event_types.iter().cloned());
			self.delegator.discover(&self.tree);
			seq
		} else {
			self.send(|seq| ToReconciler::Hydrate {
				seq,
				description,
				strategy,
			})?
		};
		self.hydrate_seq = Some(seq);
		Ok(strategy)
	}

	/// Reads the resume plan a server render left on the container.
	fn resume_plan(&self) -> ResumePlan {
		let Some(value) = self
			.tree
			.get(self.tree.container())
			.and_then(|container| container.attribute(RESUME_ATTR))
		else {
			tracing::debug!("container carries no resume plan");
			return ResumePlan::default();
		};
		ResumePlan::from_attr(value).unwrap_or_else(|err| {
			tracing::warn!(error = %err, "ignoring unreadable resume plan");
			ResumePlan::default()
		})
	}

	/// Asks the reconciler to re-render the component owning `node`.
	///
	/// Inside [`Root::start_transition`] the update is sent at low priority
	/// and tagged with the active transition.
	pub fn schedule_update(&mut self, node: NodeRef) -> RootResult<RequestSeq> {
		let transition = self.active_transition;
		let priority = if transition.is_some() {
			Priority::Low
		} else {
			Priority::High
		};
		let seq = self.send(|seq| ToReconciler::Update {
			seq,
			node: node.id(),
			priority,
			transition,
		})?;
		if let Some(id) = transition
			&& let Some(pending) = self.transitions.get_mut(&id)
		{
			pending.outstanding += 1;
		}
		Ok(seq)
	}

	/// Runs `callback` with a new transition active.
	///
	/// `on_pending_change(true)` fires immediately, and
	/// `on_pending_change(false)` once every update scheduled under the
	/// transition has been committed.
	pub fn start_transition<F, P>(&mut self, callback: F, on_pending_change: P) -> TransitionId
	where
		F: FnOnce(&mut Self),
		P: FnMut(bool) + 'static,
	{
		let id = TransitionId(self.next_transition);
		self.next_transition += 1;
		let mut on_pending_change = on_pending_change;
		on_pending_change(true);
		self.transitions.insert(
			id,
			PendingTransition {
				outstanding: 0,
				on_pending_change: Box::new(on_pending_change),
			},
		);

		let enclosing = self.active_transition.replace(id);
		callback(self);
		self.active_transition = enclosing;

		if self.transitions.get(&id).is_some_and(|pending| pending.outstanding == 0)
			&& let Some(mut pending) = self.transitions.remove(&id)
		{
			(pending.on_pending_change)(false);
		}
		tracing::debug!(transition = %id, "transition started");
		id
	}

	fn complete_transition(&mut self, id: TransitionId) -> bool {
		let Some(pending) = self.transitions.get_mut(&id) else {
			return false;
		};
		pending.outstanding = pending.outstanding.saturating_sub(1);
		if pending.outstanding > 0 || self.active_transition == Some(id) {
			return false;
		}
		if let Some(mut pending) = self.transitions.remove(&id) {
			(pending.on_pending_change)(false);
		}
		tracing::debug!(transition = %id, "transition settled");
		true
	}

	/// Registers `actor` as hosted by the component owning `node`.
	pub fn register_actor(&mut self, node: NodeRef, actor: impl Into<ActorId>) -> RootResult<RequestSeq> {
		let actor = actor.into();
		self.send(|seq| ToReconciler::RegisterActor {
			seq,
			node: node.id(),
			actor,
		})
	}

	pub fn unregister_actor(&mut self, actor: impl Into<ActorId>) -> RootResult<RequestSeq> {
		let actor = actor.into();
		self.send(|seq| ToReconciler::UnregisterActor { seq, actor })
	}

	/// Sends a message to an actor's mailbox. There is no acknowledgement;
	/// messages to unknown actors are dropped by the reconciler.
	pub fn send_message(
		&mut self,
		from: impl Into<ActorId>,
		to: impl Into<ActorId>,
		payload: impl Into<serde_json::Value>,
	) -> RootResult<RequestSeq> {
		let message = ActorMessage {
			from: from.into(),
			to: to.into(),
			payload: payload.into(),
		};
		self.send(|seq| ToReconciler::SendMessage { seq, message })
	}

	/// Delivers a user event targeted at the output node at `target`.
	///
	/// Resumable roots route it through the container's delegated listener
	/// to the nearest marked owner; other roots deliver it to every bound
	/// listener it bubbles through. Returns how many requests were sent.
	pub fn dispatch_event(&mut self, target: &Path, event: EventData) -> RootResult<usize> {
		self.ensure_running()?;
		let Some(target_id) = self.tree.resolve(target) else {
			tracing::debug!(target = %target, event = %event.event_type, "event target not in tree");
			return Ok(0);
		};

		if self.strategy == Some(HydrationStrategy::Resumable) {
			if !self.delegator.listens_to(&event.event_type) {
				tracing::debug!(event = %event.event_type, "no delegated listener for event type");
				return Ok(0);
			}
			let Some(node) = self
				.delegator
				.resolve_owner(&self.tree, target_id, &event.event_type)
			else {
				tracing::debug!(target = %target, event = %event.event_type, "no marked owner, event dropped");
				return Ok(0);
			};
			self.send(|seq| ToReconciler::ExecuteResumableListener { seq, node, event })?;
			return Ok(1);
		}

		let listeners = delegation::bubble(&self.tree, target_id, &event.event_type);
		for listener in &listeners {
			let event = event.clone();
			self.send(|seq| ToReconciler::DispatchEvent {
				seq,
				node: listener.owner,
				handler: listener.handler.clone(),
				event,
			})?;
		}
		Ok(listeners.len())
	}

	/// Signals that a data dependency is available, hydrating the islands
	/// progressive hydration deferred on it.
	pub fn resolve_dependency(&mut self, dependency: impl Into<String>) -> RootResult<RequestSeq> {
		let dependency = dependency.into();
		self.send(|seq| ToReconciler::ResolveDependency { seq, dependency })
	}

	/// Registers a hook for effects named `name`, run after the commit
	/// carrying them is applied.
	pub fn on_effect<F>(&mut self, name: impl Into<String>, hook: F)
	where
		F: FnMut(&QueuedEffect) + 'static,
	{
		self.effect_hooks
			.entry(name.into())
			.or_default()
			.push(Box::new(hook));
	}

	/// Returns the node owning the output node at `path`.
	pub fn node_ref_at(&self, path: &Path) -> Option<NodeRef> {
		let id = self.tree.resolve(path)?;
		self.tree.get(id)?.owner().map(NodeRef)
	}

	fn replies(&self) -> RootResult<Receiver<Vec<u8>>> {
		self.worker
			.as_ref()
			.map(|worker| worker.replies.clone())
			.ok_or(RootError::Unmounted)
	}

	fn receive(&mut self, frame: &[u8]) -> RootResult<()> {
		let reply: ToRoot = wire::decode("reply", frame)?;
		self.outstanding = self.outstanding.saturating_sub(1);
		tracing::trace!(seq = reply.batch().seq.0, partial = reply.is_partial(), "reply received");
		self.queued.push_back(reply);
		Ok(())
	}

	/// Applies every reply that has arrived, without blocking.
	pub fn frame(&mut self) -> RootResult<FrameReport> {
		self.ensure_running()?;
		let replies = self.replies()?;
		let disconnected = loop {
			match replies.try_recv() {
				Ok(frame) => self.receive(&frame)?,
				Err(TryRecvError::Empty) => break false,
				Err(TryRecvError::Disconnected) => break true,
			}
		};
		let report = self.apply_queued();
		if disconnected {
			return Err(self.fail());
		}
		Ok(report)
	}

	/// Blocks until every request is answered, then applies the replies.
	/// Gives up after the configured `settle_timeout_ms`.
	pub fn settle(&mut self) -> RootResult<FrameReport> {
		let timeout = self.config.channel.settle_timeout();
		self.settle_within(timeout)
	}

	pub fn settle_within(&mut self, timeout: Duration) -> RootResult<FrameReport> {
		self.ensure_running()?;
		let replies = self.replies()?;
		let deadline = Instant::now() + timeout;
		while self.outstanding > 0 {
			let remaining = deadline.saturating_duration_since(Instant::now());
			match replies.recv_timeout(remaining) {
				Ok(frame) => self.receive(&frame)?,
				Err(RecvTimeoutError::Timeout) => {
					return Err(RootError::SettleTimeout {
						waited: timeout,
						outstanding: self.outstanding,
					});
				}
				Err(RecvTimeoutError::Disconnected) => {
					let report = self.apply_queued();
					tracing::warn!(
						commits = report.commits,
						applied = report.applied,
						skipped = report.skipped.len(),
						effects = report.effects.len(),
						"applied commits received before the channel closed"
					);
					return Err(self.fail());
				}
			}
		}
		self.frame()
	}

	fn apply_queued(&mut self) -> FrameReport {
		let mut report = FrameReport::default();
		while let Some(reply) = self.queued.pop_front() {
			let partial = reply.is_partial();
			let batch = reply.into_batch();
			let mode = if self.hydrate_seq == Some(batch.seq) {
				self.hydrate_seq = None;
				CommitMode::Hydrate
			} else {
				CommitMode::Render
			};
			let outcome = commit::apply(&mut self.tree, &batch.mutations, mode);
			if self.delegator.is_active() {
				for event in &outcome.marked_events {
					self.delegator.register(event.clone());
				}
			}
			tracing::debug!(
				seq = batch.seq.0,
				partial,
				applied = outcome.applied,
				skipped = outcome.skipped.len(),
				"commit applied"
			);
			report.commits += 1;
			report.applied += outcome.applied;
			report.skipped.extend(outcome.skipped);

			if let Some(id) = batch.completed_transition
				&& self.complete_transition(id)
			{
				report.completed_transitions.push(id);
			}
			for effect in batch.effects {
				if let Some(hooks) = self.effect_hooks.get_mut(&effect.effect.name) {
					for hook in hooks.iter_mut() {
						hook(&effect);
					}
				}
				report.effects.push(effect);
			}
		}
		report
	}

	/// Stops the reconciler thread and clears the live tree. Valid in every
	/// state, including after the channel closed.
	pub fn unmount(&mut self) {
		if let Some(worker) = self.worker.take() {
			if let Ok(frame) = wire::encode("request", &ToReconciler::Shutdown) {
				let _ = worker.requests.send(frame);
			}
			drop(worker.requests);
			if worker.thread.join().is_err() {
				tracing::warn!("reconciler thread panicked");
			}
		}
		self.tree.clear();
		self.queued.clear();
		self.transitions.clear();
		self.effect_hooks.clear();
		self.delegator.clear();
		self.outstanding = 0;
		self.active_transition = None;
		self.hydrate_seq = None;
		if self.lifecycle != Lifecycle::Unmounted {
			tracing::info!("render root unmounted");
		}
		self.lifecycle = Lifecycle::Unmounted;
	}
}

impl Drop for Root {
	fn drop(&mut self) {
		if let Some(worker) = self.worker.take()
			&& let Ok(frame) = wire::encode("request", &ToReconciler::Shutdown)
		{
			let _ = worker.requests.send(frame);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::cell::RefCell;
	use std::rc::Rc;

	fn root() -> Root {
		Root::new(OutputTree::new(), ComponentRegistry::new(), RootConfig::default()).unwrap()
	}

	#[rstest]
	fn test_render_commits_on_settle() {
		// Arrange
		let mut root = root();

		// Act
		let seq = root.render(Description::element("p").child(Description::text("hi"))).unwrap();
		let report = root.settle().unwrap();

		// Assert
		assert_eq!(seq, RequestSeq(1));
		assert_eq!(report.commits, 1);
		assert_eq!(report.applied, 2);
		assert_eq!(root.tree().to_html_stripped(), "<p>hi</p>");
		assert_eq!(root.outstanding(), 0);
	}

	#[rstest]
	fn test_transition_without_updates_settles_immediately() {
		// Arrange
		let mut root = root();
		let seen = Rc::new(RefCell::new(Vec::new()));
		let log = Rc::clone(&seen);

		// Act
		root.start_transition(|_| {}, move |pending| log.borrow_mut().push(pending));

		// Assert
		assert_eq!(*seen.borrow(), vec![true, false]);
	}

	#[rstest]
	fn test_unmount_rejects_later_calls() {
		// Arrange
		let mut root = root();
		root.render(Description::element("div")).unwrap();
		root.settle().unwrap();

		// Act
		root.unmount();

		// Assert
		assert!(root.tree().is_empty());
		assert!(matches!(root.render(Description::element("div")), Err(RootError::Unmounted)));
		assert!(matches!(root.frame(), Err(RootError::Unmounted)));
		root.unmount();
	}

	#[rstest]
	fn test_hydrating_flag_clears_after_commit() {
		// Arrange
		let mut tree = OutputTree::new();
		tree.append_element(tree.container(), "main").unwrap();
		let mut root = Root::new(tree, ComponentRegistry::new(), RootConfig::default()).unwrap();

		// Act
		let strategy = root.hydrate(Description::element("main"), None).unwrap();
		let before = root.is_hydrating();
		root.settle().unwrap();

		// Assert
		assert_eq!(strategy, HydrationStrategy::Full);
		assert!(before);
		assert!(!root.is_hydrating());
	}
}
