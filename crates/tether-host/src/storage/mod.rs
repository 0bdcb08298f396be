//! Key-value persistence for credentials and known devices.
//!
//! The core consumes persistence as a plain get/set/remove store; what
//! backs it is an adapter concern. Two backends ship here: [`MemoryKv`]
//! for tests and simulation, and [`RedbKv`] for production.

mod memory;
mod redb;

use thiserror::Error;

pub use self::{memory::MemoryKv, redb::RedbKv};

/// Errors from a key-value backend.
#[derive(Debug, Error)]
pub enum KvError {
    /// Underlying I/O or database failure.
    ///
    /// May be transient (disk pressure, lock contention); callers on
    /// non-critical paths degrade with a warning rather than abort.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// A stored value could not be (de)serialized.
    ///
    /// Indicates corruption or a format change; the affected record is
    /// treated as absent.
    #[error("storage serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for KvError {
    fn from(err: serde_json::Error) -> Self {
        KvError::Serialization(err.to_string())
    }
}

/// Key-value store abstraction.
///
/// Must be Clone (shared between the credential store and callers),
/// Send + Sync, and synchronous. Implementations typically share internal
/// state via Arc, so clones access the same underlying storage.
pub trait KvStore: Clone + Send + Sync + 'static {
    /// Fetch the value stored under `key`. `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Remove the value stored under `key`. No-op if absent.
    fn remove(&self, key: &str) -> Result<(), KvError>;
}
