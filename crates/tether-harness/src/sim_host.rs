//! Simulated host: the driver plus a miniature runtime.
//!
//! Executes [`HostAction`] vectors the way a production runtime would:
//! unicast sends land in per-peer inboxes, broadcasts fan out to every
//! registered peer, the challenge answer goes to a simulated host display,
//! and room invalidations are recorded so tests can follow rotations.

use std::collections::HashMap;

use tracing::debug;

use tether_host::{
    HostAction, HostConfig, HostDriver, HostError, HostEvent, HostNotice, MemoryKv,
};
use tether_proto::{HostMessage, InboundFrame, PeerId};

use crate::{ScriptedCaps, SimEnv};

/// A host driver wired to an in-memory world.
pub struct SimHost {
    driver: HostDriver<SimEnv, ScriptedCaps, MemoryKv>,
    inboxes: HashMap<PeerId, Vec<HostMessage>>,
    displayed_answer: Option<String>,
    notices: Vec<HostNotice>,
    rooms_joined: Vec<String>,
}

impl SimHost {
    /// Create a simulated host over the given environment and provider.
    ///
    /// # Panics
    ///
    /// Panics if the driver cannot initialize, which cannot happen over
    /// in-memory storage.
    #[allow(clippy::expect_used)]
    pub fn new(env: SimEnv, caps: ScriptedCaps, config: HostConfig) -> Self {
        let driver = HostDriver::new(env, caps, MemoryKv::new(), config)
            .expect("in-memory storage cannot fail");
        let room = driver.pairing_code().to_string();
        Self {
            driver,
            inboxes: HashMap::new(),
            displayed_answer: None,
            notices: Vec::new(),
            rooms_joined: vec![room],
        }
    }

    /// Direct access to the driver's control surface.
    pub fn driver(&self) -> &HostDriver<SimEnv, ScriptedCaps, MemoryKv> {
        &self.driver
    }

    /// Mutable access to the driver's control surface.
    pub fn driver_mut(&mut self) -> &mut HostDriver<SimEnv, ScriptedCaps, MemoryKv> {
        &mut self.driver
    }

    /// The current pre-shared key.
    pub fn psk(&self) -> String {
        self.driver.psk().to_string()
    }

    /// Deliver an encoded frame from a peer and execute the response.
    ///
    /// # Errors
    ///
    /// Propagates driver errors (credential persistence only).
    pub fn deliver(&mut self, peer: &str, frame: &InboundFrame) -> Result<(), HostError> {
        let payload = frame.encode()?;
        let actions = self.driver.process_event(HostEvent::FrameReceived {
            peer_id: PeerId::new(peer),
            payload,
        })?;
        self.execute(actions);
        Ok(())
    }

    /// Signal a peer departure.
    ///
    /// # Errors
    ///
    /// Propagates driver errors.
    pub fn peer_left(&mut self, peer: &str) -> Result<(), HostError> {
        let actions =
            self.driver.process_event(HostEvent::PeerLeft { peer_id: PeerId::new(peer) })?;
        self.execute(actions);
        Ok(())
    }

    /// Run one housekeeping tick.
    ///
    /// # Errors
    ///
    /// Propagates driver errors.
    pub fn tick(&mut self) -> Result<(), HostError> {
        let actions = self.driver.process_event(HostEvent::Tick)?;
        self.execute(actions);
        Ok(())
    }

    /// Execute an action vector against the simulated world.
    pub fn execute(&mut self, actions: Vec<HostAction>) {
        for action in actions {
            match action {
                HostAction::Send { peer_id, message } => {
                    self.inboxes.entry(peer_id).or_default().push(message);
                },
                HostAction::Broadcast { message } => {
                    for peer in self.driver.peers() {
                        self.inboxes.entry(peer.peer_id).or_default().push(message.clone());
                    }
                },
                HostAction::ShowChallengeAnswer { answer } => {
                    self.displayed_answer = Some(answer);
                },
                HostAction::ClearChallengeDisplay => {
                    self.displayed_answer = None;
                },
                HostAction::Notify { notice } => {
                    self.notices.push(notice);
                },
                HostAction::RoomInvalidated { room_id } => {
                    debug!(%room_id, "simulated runtime rejoining new room");
                    self.rooms_joined.push(room_id);
                },
            }
        }
    }

    /// The emoji currently shown on the simulated host display.
    pub fn displayed_answer(&self) -> Option<&str> {
        self.displayed_answer.as_deref()
    }

    /// Every pairing notice surfaced so far.
    pub fn notices(&self) -> &[HostNotice] {
        &self.notices
    }

    /// Every rendezvous room this host has joined, oldest first.
    pub fn rooms_joined(&self) -> &[String] {
        &self.rooms_joined
    }

    /// Messages delivered to a peer so far, in order.
    pub fn inbox(&self, peer: &str) -> &[HostMessage] {
        self.inboxes.get(&PeerId::new(peer)).map_or(&[], Vec::as_slice)
    }

    /// Take and clear a peer's inbox.
    pub fn drain_inbox(&mut self, peer: &str) -> Vec<HostMessage> {
        self.inboxes.remove(&PeerId::new(peer)).unwrap_or_default()
    }

    /// The most recent message of the given wire kind in a peer's inbox.
    pub fn last_of_kind(&self, peer: &str, kind: &str) -> Option<&HostMessage> {
        self.inbox(peer).iter().rev().find(|message| message.kind() == kind)
    }
}
