//! Protocol error types.

use thiserror::Error;

/// Errors produced while encoding or decoding protocol frames.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Frame bytes were not valid JSON, or did not match the envelope shape.
    ///
    /// Fatal for that frame only - the sender may retry with a valid frame.
    #[error("frame decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// A message could not be serialized to JSON.
    ///
    /// Indicates a bug (all message types are serializable by construction).
    #[error("frame encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}
