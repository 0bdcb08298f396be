//! Fuzz target for inbound frame decoding and command parsing.
//!
//! Peers are untrusted: arbitrary bytes must decode to either a frame or
//! an error, and any decoded frame must parse to a command outcome. This
//! fuzzer should NEVER panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_proto::{Command, InboundFrame};

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = InboundFrame::decode(data) {
        let _ = Command::parse(&frame.kind, frame.data.as_ref());
    }
});
