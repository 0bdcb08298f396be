//! The inbound frame envelope.
//!
//! Peers send JSON objects of the shape `{ "type": string, ...fields }`.
//! The envelope is deliberately open: any `type` decodes, and fields a
//! given frame kind does not use are simply `None`. Command dispatch and
//! shape validation happen later, in [`crate::Command::parse`] - a frame
//! with an unknown `type` must survive decoding so the host can ignore it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{errors::ProtoError, types::DeviceProfile};

/// Frame kind of a greeting.
pub const KIND_HELLO: &str = "hello";
/// Frame kind of a challenge verification.
pub const KIND_VERIFY: &str = "verify";

/// A decoded peer-to-host frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    /// Frame kind: `hello`, `verify`, or any command type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Pre-shared key, required on every non-`hello` frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// Device profile; mandatory on `hello`, optional elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<DeviceProfile>,
    /// Selected emoji, on `verify` frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Command-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl InboundFrame {
    /// Decode a frame from raw JSON bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtoError> {
        serde_json::from_slice(bytes).map_err(ProtoError::Decode)
    }

    /// Encode the frame to JSON bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ProtoError> {
        serde_json::to_vec(self).map_err(ProtoError::Encode)
    }

    /// Build a `hello` greeting.
    pub fn hello(profile: Option<DeviceProfile>, auth: Option<String>) -> Self {
        Self { kind: KIND_HELLO.to_string(), auth, profile, answer: None, data: None }
    }

    /// Build a `verify` frame answering a pending challenge.
    pub fn verify(answer: impl Into<String>) -> Self {
        Self {
            kind: KIND_VERIFY.to_string(),
            auth: None,
            profile: None,
            answer: Some(answer.into()),
            data: None,
        }
    }

    /// Build a command frame carrying the pre-shared key.
    pub fn command(kind: impl Into<String>, auth: impl Into<String>, data: Option<Value>) -> Self {
        Self { kind: kind.into(), auth: Some(auth.into()), profile: None, answer: None, data }
    }

    /// Whether this frame is a greeting.
    pub fn is_hello(&self) -> bool {
        self.kind == KIND_HELLO
    }

    /// Whether this frame is a challenge verification.
    pub fn is_verify(&self) -> bool {
        self.kind == KIND_VERIFY
    }
}
