//! Trellis Core - plain-data model shared by both execution contexts
//!
//! Trellis renders in two contexts: the rendering context owns the live
//! output tree, and a background context owns the reconciler and its
//! retained node tree. The contexts share no memory. Everything in this
//! crate is plain data that crosses the channel between them.
//!
//! ## Modules
//!
//! - [`description`]: description trees (`kind` + `props` + `children`)
//! - [`mutation`]: positional mutations emitted by a diff pass
//! - [`message`]: request and reply payloads
//! - [`hydration`]: hydration strategies, device signals and resume plans
//! - [`markers`]: ownership and region marker attributes
//! - [`wire`]: frame codec
//!
//! ## Protocol
//!
//! ```text
//! Root ──RENDER/HYDRATE/UPDATE/...──▶ Reconciler
//! Root ◀──────COMMIT/COMMIT_PARTIAL── Reconciler
//! ```

pub mod description;
pub mod hydration;
pub mod ids;
pub mod markers;
pub mod message;
pub mod mutation;
pub mod wire;

pub use description::{Description, HandlerRef, Kind, PropValue, Props};
pub use hydration::{
	DeviceSignals, HydrationStrategy, NetworkClass, ParseNameError, ResumePlan, ResumeSpan,
};
pub use ids::{ActorId, NodeId, NodeRef, RequestSeq, TransitionId};
pub use message::{
	ActorMessage, CommitBatch, EffectDescriptor, EventData, Priority, QueuedEffect, ToReconciler,
	ToRoot,
};
pub use mutation::{Mutation, MutationOp, OutputKind, Path};
pub use wire::{WireError, WireResult};
