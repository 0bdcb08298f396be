//! Wire vocabulary for the Tether companion protocol.
//!
//! Tether pairs a host with remote companion devices over an opaque
//! peer-to-peer data channel. Every frame on that channel is a JSON object
//! `{ "type": string, ...fields }`. This crate defines both directions of
//! the vocabulary:
//!
//! - [`InboundFrame`]: the open envelope peers send to the host. It is a
//!   struct rather than a tagged enum so that unknown command types decode
//!   cleanly and can be ignored (older hosts must tolerate newer peers).
//! - [`Command`]: the typed commands the host actually dispatches, parsed
//!   out of an envelope's `(type, data)` pair.
//! - [`HostMessage`]: the closed, fully typed set of host-to-peer messages.
//!
//! # Invariants
//!
//! - Decoding arbitrary bytes never panics; it returns [`ProtoError`].
//! - Unknown inbound `type` strings parse to [`ParseOutcome::Unknown`], not
//!   an error.
//! - Each [`HostMessage`] variant serializes with exactly one `type` tag.

pub mod command;
pub mod envelope;
pub mod errors;
pub mod message;
pub mod types;

pub use command::{Command, ParseOutcome};
pub use envelope::InboundFrame;
pub use errors::ProtoError;
pub use message::{AuthFailureReason, Channel, HostMessage};
pub use types::{
    AccentColor, AppEntry, DeviceProfile, HostStateSnapshot, MediaState, NotificationItem, PeerId,
    WallpaperKind, WallpaperSource, WallpaperThumb,
};
