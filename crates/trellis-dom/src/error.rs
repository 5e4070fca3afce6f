//! Error types for the render root.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use trellis_core::mutation::{MutationOp, Path};
use trellis_core::wire::WireError;
use trellis_reconciler::ReconcileError;

/// Result type for render root operations.
pub type RootResult<T> = Result<T, RootError>;

/// Render root failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RootError {
	/// The background context is gone. The live tree stays as last
	/// committed and only `unmount` remains valid.
	#[error("reconciler channel closed")]
	ChannelClosed,

	#[error("render root has been unmounted")]
	Unmounted,

	/// `settle` gave up with replies still outstanding.
	#[error("timed out after {waited:?} with {outstanding} replies outstanding")]
	SettleTimeout { waited: Duration, outstanding: usize },

	#[error("wire error: {0}")]
	Wire(#[from] WireError),

	#[error("failed to start reconciler: {0}")]
	Spawn(#[from] ReconcileError),
}

/// A mutation that could not be applied. Only that mutation is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CommitError {
	/// No output node (or insertion slot) exists at the path.
	#[error("{op} at {path}: path does not resolve")]
	UnresolvedPath { op: MutationOp, path: Path },

	/// Server-rendered markup does not match the description.
	#[error("hydrate at {path}: expected {expected}, found {found}")]
	StructureMismatch {
		path: Path,
		expected: String,
		found: String,
	},
}

/// Configuration loading failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
	#[error("failed to read {}: {source}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),
}
