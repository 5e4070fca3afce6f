//! Trellis DOM - the rendering context
//!
//! This crate owns the live output tree and everything that touches it:
//!
//! - [`tree`]: the output tree arena and its HTML serialization
//! - [`commit`]: applying mutation lists, writing ownership markers
//! - [`root`]: the [`Root`] driving the reconciler thread
//! - [`hydration`]: strategy selection for adopting server markup
//! - [`delegation`]: container-level event delegation for resumable roots
//! - [`ssr`]: server-side rendering to a tree or a string
//! - [`config`]: TOML configuration
//!
//! ## Example
//!
//! ```no_run
//! use trellis_core::Description;
//! use trellis_dom::{OutputTree, Root, RootConfig};
//! use trellis_reconciler::ComponentRegistry;
//!
//! # fn main() -> Result<(), trellis_dom::RootError> {
//! let mut root = Root::new(OutputTree::new(), ComponentRegistry::new(), RootConfig::default())?;
//! root.render(Description::element("p").child(Description::text("hello")))?;
//! root.settle()?;
//! assert_eq!(root.tree().to_html_stripped(), "<p>hello</p>");
//! root.unmount();
//! # Ok(())
//! # }
//! ```

pub mod commit;
pub mod config;
pub mod delegation;
pub mod error;
pub mod hydration;
pub mod root;
pub mod ssr;
pub mod tree;

pub use commit::{CommitMode, CommitOutcome, PropDiff, diff_props};
pub use config::RootConfig;
pub use delegation::EventDelegator;
pub use error::{CommitError, ConfigError, RootError, RootResult};
pub use hydration::{HydrationConfig, adaptive_strategy};
pub use root::{FrameReport, Root};
pub use ssr::{render_to_string, render_to_tree};
pub use tree::{BoundListener, OutputId, OutputNode, OutputNodeKind, OutputTree};
