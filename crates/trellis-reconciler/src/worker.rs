//! Background context.
//!
//! One named thread per render root owns the [`Reconciler`]. Requests
//! arrive as encoded frames and are processed strictly in arrival order;
//! each one (except `SHUTDOWN`) is answered with exactly one
//! `COMMIT`/`COMMIT_PARTIAL` frame carrying the request's sequence number.
//!
//! ```text
//! requests: Vec<u8> ──▶ decode ──▶ Reconciler ──▶ encode ──▶ replies: Vec<u8>
//! ```

use crate::component::ComponentRegistry;
use crate::diff::{DiffOptions, Reconciler};
use crate::error::{ReconcileError, ReconcileResult};
use crossbeam_channel::{Receiver, Sender, unbounded};
use serde::Deserialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use trellis_core::ids::RequestSeq;
use trellis_core::message::{CommitBatch, ToReconciler, ToRoot};
use trellis_core::mutation::Mutation;
use trellis_core::wire;

/// Name of the background thread.
pub const THREAD_NAME: &str = "trellis-reconciler";

/// Root-side ends of a running background context.
#[derive(Debug)]
pub struct WorkerHandle {
	pub requests: Sender<Vec<u8>>,
	pub replies: Receiver<Vec<u8>>,
	pub thread: JoinHandle<()>,
}

/// Spawns the background context for one render root.
pub fn spawn(registry: Arc<ComponentRegistry>, options: DiffOptions) -> ReconcileResult<WorkerHandle> {
	let (request_tx, request_rx) = unbounded::<Vec<u8>>();
	let (reply_tx, reply_rx) = unbounded::<Vec<u8>>();
	let thread = thread::Builder::new()
		.name(THREAD_NAME.to_string())
		.spawn(move || {
			let span = tracing::info_span!("reconciler");
			let _guard = span.enter();
			run(Reconciler::with_options(registry, options), request_rx, reply_tx);
		})
		.map_err(ReconcileError::Spawn)?;
	tracing::debug!(keyed = options.keyed, "reconciler thread spawned");
	Ok(WorkerHandle {
		requests: request_tx,
		replies: reply_rx,
		thread,
	})
}

fn run(mut reconciler: Reconciler, requests: Receiver<Vec<u8>>, replies: Sender<Vec<u8>>) {
	for frame in requests.iter() {
		let request: ToReconciler = match wire::decode("request", &frame) {
			Ok(request) => request,
			Err(err) => {
				let Some(seq) = salvage_seq(&frame) else {
					tracing::warn!(error = %err, "discarding undecodable request");
					continue;
				};
				tracing::warn!(error = %err, seq = seq.0, "undecodable request, answering with an empty batch");
				if !send_reply(&replies, &ToRoot::CommitPartial(CommitBatch::empty(seq))) {
					break;
				}
				continue;
			}
		};
		if matches!(request, ToReconciler::Shutdown) {
			tracing::debug!("shutdown requested");
			break;
		}
		let Some(reply) = respond(&mut reconciler, request) else {
			continue;
		};
		if !send_reply(&replies, &reply) {
			break;
		}
	}
	tracing::info!(nodes = reconciler.arena().len(), "reconciler stopped");
}

/// The sequence number of a request whose body failed to decode.
#[derive(Deserialize)]
struct SeqOnly {
	seq: Option<RequestSeq>,
}

fn salvage_seq(frame: &[u8]) -> Option<RequestSeq> {
	wire::decode::<SeqOnly>("request", frame).ok()?.seq
}

/// Encodes and sends one reply. Returns `false` once the root is gone.
fn send_reply(replies: &Sender<Vec<u8>>, reply: &ToRoot) -> bool {
	let frame = match wire::encode("reply", reply) {
		Ok(frame) => frame,
		Err(err) => {
			let batch = CommitBatch::empty(reply.batch().seq);
			let fallback = if reply.is_partial() {
				ToRoot::CommitPartial(batch)
			} else {
				ToRoot::Commit(batch)
			};
			tracing::warn!(error = %err, seq = reply.batch().seq.0, "failed to encode reply, sending an empty batch");
			match wire::encode("reply", &fallback) {
				Ok(frame) => frame,
				Err(err) => {
					tracing::error!(error = %err, "failed to encode empty batch");
					return true;
				}
			}
		}
	};
	if replies.send(frame).is_err() {
		tracing::debug!("render root disconnected");
		return false;
	}
	true
}

/// Processes one request and builds its reply.
pub fn respond(reconciler: &mut Reconciler, request: ToReconciler) -> Option<ToRoot> {
	let name = request.name();
	let seq = request.seq()?;
	tracing::trace!(request = name, seq = seq.0, "processing request");

	let (partial, mutations, completed_transition) = match request {
		ToReconciler::Render {
			description,
			priority,
			strategy,
			..
		} => {
			tracing::debug!(?priority, ?strategy, "render requested");
			(false, reconciler.reconcile(&description), None)
		}
		ToReconciler::Hydrate {
			description,
			strategy,
			..
		} => (false, reconciler.hydrate(&description, strategy), None),
		ToReconciler::InitHydration {
			description, plan, ..
		} => {
			reconciler.init_hydration(&description, &plan);
			(false, Vec::new(), None)
		}
		ToReconciler::Update {
			node, transition, ..
		} => (true, or_empty(name, reconciler.rerender(node)), transition),
		ToReconciler::RegisterActor { node, actor, .. } => {
			if let Err(err) = reconciler.register_actor(node, actor) {
				tracing::warn!(request = name, error = %err, "actor registration failed");
			}
			(true, Vec::new(), None)
		}
		ToReconciler::UnregisterActor { actor, .. } => {
			reconciler.unregister_actor(&actor);
			(true, Vec::new(), None)
		}
		ToReconciler::SendMessage { message, .. } => {
			(true, or_empty(name, reconciler.deliver(message)), None)
		}
		ToReconciler::ExecuteResumableListener { node, event, .. } => {
			(true, or_empty(name, reconciler.wake(node, &event)), None)
		}
		ToReconciler::DispatchEvent {
			node,
			handler,
			event,
			..
		} => (true, or_empty(name, reconciler.dispatch(node, &handler, &event)), None),
		ToReconciler::ResolveDependency { dependency, .. } => {
			(true, reconciler.resolve_dependency(&dependency), None)
		}
		ToReconciler::Shutdown => return None,
	};

	let batch = CommitBatch {
		seq,
		mutations,
		effects: reconciler.take_effects(),
		completed_transition,
	};
	Some(if partial {
		ToRoot::CommitPartial(batch)
	} else {
		ToRoot::Commit(batch)
	})
}

fn or_empty(request: &'static str, result: ReconcileResult<Vec<Mutation>>) -> Vec<Mutation> {
	result.unwrap_or_else(|err| {
		tracing::warn!(request, error = %err, "request failed, answering with an empty batch");
		Vec::new()
	})
}
