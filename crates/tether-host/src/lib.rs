//! Host-side session manager for the Tether companion protocol.
//!
//! Companions discover the host through a shared rendezvous room, prove
//! themselves with a pre-shared key or an interactive emoji challenge, and
//! then exchange state snapshots and commands. This crate owns everything
//! on the host side of that exchange: the credential store, the peer
//! registry, the authentication state machine, the command router, and the
//! state synchronizer.
//!
//! # Architecture
//!
//! The core is a pure state machine in the action pattern:
//!
//! ```text
//! HostEvent ──▶ HostDriver::process_event ──▶ Vec<HostAction>
//! ```
//!
//! The transport, the host UI, and the clock/RNG are injected seams
//! ([`HostCapabilities`], [`Environment`], [`storage::KvStore`]), so the
//! whole protocol runs deterministically under test with no real I/O.
//! Actions in a returned vector are ordered; runtimes must execute them in
//! order (the cheap `state` push always precedes the heavy wallpaper and
//! widget wave, with no timing assumption).

pub mod auth;
pub mod capabilities;
pub mod config;
pub mod credentials;
pub mod driver;
pub mod env;
pub mod error;
pub mod registry;
pub mod router;
pub mod storage;
pub mod sync;

pub use auth::{CHALLENGE_OPTIONS, PendingAuthSession};
pub use capabilities::{CapabilityError, HostCapabilities, HostNotice};
pub use config::HostConfig;
pub use credentials::{Credential, CredentialStore, KnownDevice};
pub use driver::{HostAction, HostDriver, HostEvent};
pub use env::{Environment, SystemEnv};
pub use error::HostError;
pub use registry::{ConnectedPeer, PeerRegistry, PeerSnapshot};
pub use storage::{KvError, KvStore, MemoryKv, RedbKv};
