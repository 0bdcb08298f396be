//! Deterministic simulation harness for Tether protocol testing.
//!
//! Provides a seeded, virtual-time [`Environment`] implementation and an
//! in-memory world that executes driver actions the way a real runtime
//! would: unicast and broadcast delivery into per-peer inboxes, the host's
//! out-of-band challenge display, and room membership across credential
//! rotations. Every pairing flow is reproducible from a seed.
//!
//! [`Environment`]: tether_host::Environment

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod scripted_caps;
pub mod sim_env;
pub mod sim_host;

pub use scripted_caps::ScriptedCaps;
pub use sim_env::{SimEnv, SimInstant};
pub use sim_host::SimHost;
