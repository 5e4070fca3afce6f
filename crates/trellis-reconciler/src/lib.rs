//! Trellis Reconciler - the background diff engine
//!
//! This crate owns everything that runs off the rendering context:
//!
//! - [`node`]: the retained reconciliation node tree
//! - [`diff`]: the positional (optionally keyed) diff engine
//! - [`component`]: named render functions, handlers and their [`Scope`]
//! - [`hydrate`]: hydration passes per strategy
//! - [`events`]: handler dispatch and resumable wake-up
//! - [`actors`]: actor registration and FIFO mailboxes
//! - [`worker`]: the background thread speaking the wire protocol
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use trellis_core::Description;
//! use trellis_reconciler::{ComponentRegistry, Reconciler};
//!
//! let mut reconciler = Reconciler::new(Arc::new(ComponentRegistry::new()));
//! let tree = Description::element("p").child(Description::text("hi"));
//!
//! assert_eq!(reconciler.reconcile(&tree).len(), 2);
//! assert!(reconciler.reconcile(&tree).is_empty());
//! ```

pub mod actors;
pub mod component;
pub mod diff;
pub mod error;
pub mod events;
pub mod hydrate;
pub mod node;
pub mod worker;

pub use actors::ActorDirectory;
pub use component::{ComponentRegistry, HandlerFn, RenderFn, Scope};
pub use diff::{DiffOptions, Reconciler};
pub use error::{ReconcileError, ReconcileResult};
pub use node::{HydrationMode, MutationKind, NodeArena, PreviousVersion, ReconciliationNode};
pub use worker::{WorkerHandle, spawn};
