//! Fuzz target for the full event loop.
//!
//! Feeds arbitrary frame bytes from a handful of peer ids into a live
//! driver, interleaved with departures and ticks. No input sequence may
//! panic the driver; the worst legal outcome is a credential rotation.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tether_host::{
    HostCapabilities, HostConfig, HostDriver, HostEvent, MemoryKv, SystemEnv,
};
use tether_proto::PeerId;

/// Provider with every capability left unsupported.
struct NoCaps;

impl HostCapabilities for NoCaps {}

fuzz_target!(|data: &[u8]| {
    let Ok(mut driver) =
        HostDriver::new(SystemEnv::new(), NoCaps, MemoryKv::new(), HostConfig::default())
    else {
        return;
    };

    for chunk in data.chunks(16) {
        let (control, payload) = chunk.split_first().unwrap_or((&0, &[]));
        let peer_id = PeerId::new(format!("peer-{}", control % 4));
        let event = match control % 8 {
            6 => HostEvent::PeerLeft { peer_id },
            7 => HostEvent::Tick,
            _ => HostEvent::FrameReceived { peer_id, payload: payload.to_vec() },
        };
        let _ = driver.process_event(event);
    }
});
