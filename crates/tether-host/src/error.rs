//! Host driver error types.

use thiserror::Error;

use crate::storage::KvError;
use tether_proto::ProtoError;

/// Errors that can escape the host driver.
///
/// Deliberately small: per the failure policy, malformed peer input,
/// unavailable capabilities, and transient resource failures are absorbed
/// inside the driver (ignored, logged, or degraded per-field). What remains
/// is persistence on the credential path - the one place where losing a
/// write would strand every companion.
#[derive(Debug, Error)]
pub enum HostError {
    /// Credential or known-device persistence failed.
    ///
    /// May be transient (I/O) or fatal (corruption); the in-memory
    /// credential stays authoritative either way.
    #[error(transparent)]
    Storage(#[from] KvError),

    /// A protocol value could not be encoded.
    ///
    /// Indicates a bug - host messages are serializable by construction.
    #[error(transparent)]
    Proto(#[from] ProtoError),
}
