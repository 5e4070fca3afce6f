//! # Trellis
//!
//! A dual-context incremental renderer. Component logic and diffing run on
//! a background reconciler thread; the rendering context owns the live
//! output tree and only ever applies the positional mutations the
//! reconciler sends back. Server-rendered markup can be adopted with one of
//! four hydration strategies, including a resumable mode that executes
//! nothing until the first interaction.
//!
//! ## Crates
//!
//! - [`core`]: description trees, mutations and the wire protocol
//! - [`reconciler`]: the retained node tree, diff engine and actor mailboxes
//! - [`dom`]: the render root, output tree, hydration and delegation
//!
//! ## Feature Flags
//!
//! - `reconciler` - background reconciler without the rendering context
//! - `dom` - render root (implies `reconciler`)
//! - `full` (default) - everything
//!
//! ## Quick Example
//!
//! ```no_run
//! use trellis::prelude::*;
//!
//! # fn main() -> Result<(), RootError> {
//! let mut registry = ComponentRegistry::new();
//! registry
//!     .register_component("Counter", |_, scope| {
//!         let (_, count) = scope.use_state(0);
//!         Description::element("button")
//!             .on("click", "increment")
//!             .child(Description::text(count.to_string()))
//!     })
//!     .register_handler("increment", |scope, _| {
//!         let count = scope.state(0).and_then(|v| v.as_i64()).unwrap_or_default();
//!         scope.set_state(0, count + 1);
//!     });
//!
//! let mut root = Root::new(OutputTree::new(), registry, RootConfig::default())?;
//! root.render(Description::component("Counter"))?;
//! root.settle()?;
//! root.dispatch_event(&Path(vec![0]), EventData::new("click"))?;
//! root.settle()?;
//! assert_eq!(root.tree().to_html_stripped(), "<button>1</button>");
//! root.unmount();
//! # Ok(())
//! # }
//! ```

pub mod core {
	//! Plain-data model shared by both execution contexts.
	pub use trellis_core::*;
}

#[cfg(feature = "reconciler")]
pub mod reconciler {
	//! Background reconciler.
	pub use trellis_reconciler::*;
}

#[cfg(feature = "dom")]
pub mod dom {
	//! Rendering context.
	pub use trellis_dom::*;
}

pub use trellis_core::{
	Description, HandlerRef, HydrationStrategy, Mutation, NodeId, NodeRef, Path, PropValue,
};

#[cfg(feature = "reconciler")]
pub use trellis_reconciler::{ComponentRegistry, DiffOptions, Reconciler, Scope};

#[cfg(feature = "dom")]
pub use trellis_dom::{
	HydrationConfig, OutputTree, Root, RootConfig, RootError, RootResult, render_to_string,
	render_to_tree,
};

/// Common imports.
pub mod prelude {
	pub use trellis_core::{
		ActorId, Description, DeviceSignals, EventData, HandlerRef, HydrationStrategy, Kind,
		NetworkClass, NodeId, NodeRef, Path, PropValue, TransitionId,
	};

	#[cfg(feature = "reconciler")]
	pub use trellis_reconciler::{ComponentRegistry, DiffOptions, Reconciler, Scope};

	#[cfg(feature = "dom")]
	pub use trellis_dom::{
		FrameReport, HydrationConfig, OutputTree, Root, RootConfig, RootError, RootResult,
		render_to_string, render_to_tree,
	};
}
