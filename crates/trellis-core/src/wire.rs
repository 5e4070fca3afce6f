//! Wire codec for channel frames.
//!
//! Frames are byte buffers. Encoding every payload before it crosses the
//! channel guarantees nothing but plain data (no closures, no live handles)
//! ever reaches the other execution context.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;

/// Wire codec errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WireError {
	/// A payload could not be encoded.
	#[error("failed to encode {message}: {source}")]
	Encode {
		message: &'static str,
		#[source]
		source: serde_json::Error,
	},

	/// A frame could not be decoded.
	#[error("failed to decode {message} frame ({len} bytes): {source}")]
	Decode {
		message: &'static str,
		len: usize,
		#[source]
		source: serde_json::Error,
	},
}

/// Encodes a payload into a frame.
pub fn encode<T: Serialize>(message: &'static str, payload: &T) -> WireResult<Vec<u8>> {
	serde_json::to_vec(payload).map_err(|source| WireError::Encode { message, source })
}

/// Decodes a frame into a payload.
pub fn decode<T: DeserializeOwned>(message: &'static str, frame: &[u8]) -> WireResult<T> {
	serde_json::from_slice(frame).map_err(|source| WireError::Decode {
		message,
		len: frame.len(),
		source,
	})
}
