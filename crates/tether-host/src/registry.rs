//! Connected-peer registry.
//!
//! Single source of truth for "who is connected now". A peer id appears
//! here if and only if the transport currently considers it connected and
//! it has passed authentication at least once this session. The registry
//! is the only writer of [`ConnectedPeer`] entries; everything else reads
//! through [`PeerRegistry::snapshot`].

use std::collections::HashMap;

use serde::Serialize;

use tether_proto::{DeviceProfile, PeerId};

/// A currently connected, authenticated peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedPeer<I> {
    /// The peer's profile; a placeholder until a real one arrives.
    pub profile: DeviceProfile,
    /// Unix timestamp (seconds) of first successful authentication this
    /// session.
    pub connected_at_secs: u64,
    /// Monotonic timestamp of the last frame or heartbeat.
    pub last_seen: I,
}

/// Read-only view of a connected peer, for the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerSnapshot {
    /// Transport identifier.
    pub peer_id: PeerId,
    /// Current profile.
    pub profile: DeviceProfile,
    /// Unix timestamp (seconds) of first authentication this session.
    pub connected_at_secs: u64,
}

/// Registry of currently connected peers.
///
/// Generic over the instant type so virtual time works in simulation.
#[derive(Debug, Default)]
pub struct PeerRegistry<I> {
    peers: HashMap<PeerId, ConnectedPeer<I>>,
}

impl<I: Copy> PeerRegistry<I> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { peers: HashMap::new() }
    }

    /// Register or refresh a peer.
    ///
    /// Merge rule: a `None` or placeholder profile never downgrades an
    /// existing real profile - a heartbeat without profile data must not
    /// strip a peer's displayed identity. Returns the profile now stored.
    pub fn register(
        &mut self,
        peer_id: &PeerId,
        profile: Option<DeviceProfile>,
        now: I,
        now_secs: u64,
    ) -> DeviceProfile {
        match self.peers.get_mut(peer_id) {
            Some(existing) => {
                existing.last_seen = now;
                if let Some(incoming) = profile {
                    if !incoming.is_placeholder() || existing.profile.is_placeholder() {
                        existing.profile = incoming;
                    }
                }
                existing.profile.clone()
            },
            None => {
                let profile = profile.unwrap_or_else(DeviceProfile::placeholder);
                self.peers.insert(
                    peer_id.clone(),
                    ConnectedPeer {
                        profile: profile.clone(),
                        connected_at_secs: now_secs,
                        last_seen: now,
                    },
                );
                profile
            },
        }
    }

    /// Refresh a peer's liveness timestamp. Returns `false` if unknown.
    pub fn touch(&mut self, peer_id: &PeerId, now: I) -> bool {
        match self.peers.get_mut(peer_id) {
            Some(peer) => {
                peer.last_seen = now;
                true
            },
            None => false,
        }
    }

    /// Remove a peer. Returns its entry if it existed.
    pub fn remove(&mut self, peer_id: &PeerId) -> Option<ConnectedPeer<I>> {
        self.peers.remove(peer_id)
    }

    /// Remove every peer (credential rotation).
    pub fn clear(&mut self) {
        self.peers.clear();
    }

    /// Whether a peer is registered.
    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    /// A peer's current profile, if registered.
    pub fn profile(&self, peer_id: &PeerId) -> Option<&DeviceProfile> {
        self.peers.get(peer_id).map(|p| &p.profile)
    }

    /// All connected peer ids.
    pub fn peer_ids(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.keys()
    }

    /// Number of connected peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Whether no peers are connected.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Read-only copy for the host UI, ordered by connect time then id for
    /// stable display.
    pub fn snapshot(&self) -> Vec<PeerSnapshot> {
        let mut out: Vec<PeerSnapshot> = self
            .peers
            .iter()
            .map(|(peer_id, peer)| PeerSnapshot {
                peer_id: peer_id.clone(),
                profile: peer.profile.clone(),
                connected_at_secs: peer.connected_at_secs,
            })
            .collect();
        out.sort_by(|a, b| {
            a.connected_at_secs.cmp(&b.connected_at_secs).then_with(|| a.peer_id.cmp(&b.peer_id))
        });
        out
    }
}
