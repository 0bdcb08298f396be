//! The host session driver.
//!
//! A pure event→action state machine in the Sans-IO style: the transport
//! feeds [`HostEvent`]s in, the driver returns [`HostAction`]s out, and
//! all clock/RNG access goes through the injected [`Environment`]. The
//! runtime executes a returned action vector front to back; ordering
//! inside one vector is the only sequencing contract (there are no timing
//! assumptions between actions).

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    auth::{self, PendingAuthSession},
    capabilities::{CapabilityError, HostCapabilities, HostNotice},
    config::HostConfig,
    credentials::{CredentialStore, KnownDevice},
    env::Environment,
    error::HostError,
    registry::{PeerRegistry, PeerSnapshot},
    storage::KvStore,
    sync::Synchronizer,
};
use tether_proto::{
    AuthFailureReason, Command, DeviceProfile, HostMessage, InboundFrame, PeerId,
};

/// Inputs to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The transport delivered a raw frame from a peer.
    FrameReceived {
        /// Transport identifier of the sender.
        peer_id: PeerId,
        /// Raw frame bytes, not yet decoded.
        payload: Vec<u8>,
    },
    /// The transport reported a peer disconnected.
    PeerLeft {
        /// Transport identifier of the departed peer.
        peer_id: PeerId,
    },
    /// Periodic housekeeping: challenge expiry, deferred peer-list retry.
    Tick,
}

/// Outputs of the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    /// Send a message to one peer.
    Send {
        /// Recipient.
        peer_id: PeerId,
        /// The message.
        message: HostMessage,
    },
    /// Send a message to every connected peer.
    Broadcast {
        /// The message.
        message: HostMessage,
    },
    /// Show the challenge answer emoji on the host's own display.
    ///
    /// The display is a single surface shared by all pending challenges;
    /// the most recently issued answer wins.
    ShowChallengeAnswer {
        /// The emoji the pairing peer must pick.
        answer: String,
    },
    /// Remove the challenge answer from the host display.
    ///
    /// Because the display is one shared surface, resolving or expiring any
    /// pending session clears it, even while another session is still
    /// pending. That peer re-greets to get a fresh challenge shown.
    ClearChallengeDisplay,
    /// Surface a pairing notice in the host UI.
    Notify {
        /// The notice.
        notice: HostNotice,
    },
    /// The credential was rotated: the runtime must leave the old
    /// rendezvous room and listen in the new one. Previously trusted
    /// peers are already dropped when this action is returned.
    RoomInvalidated {
        /// The new rendezvous room id.
        room_id: String,
    },
}

/// Host-side session manager.
///
/// Owns the authentication state machine, the peer registry, the command
/// router, and the state synchronizer. Everything effectful is behind the
/// three injected seams: `E` for time and randomness, `C` for the
/// embedding host, `K` for persistence.
pub struct HostDriver<E: Environment, C: HostCapabilities, K: KvStore> {
    env: E,
    pub(crate) caps: C,
    pub(crate) config: HostConfig,
    pub(crate) sync: Synchronizer,
    credentials: CredentialStore<K>,
    registry: PeerRegistry<E::Instant>,
    pending: HashMap<PeerId, PendingAuthSession<E::Instant>>,
    discovery: bool,
    peer_list_dirty: bool,
}

impl<E: Environment, C: HostCapabilities, K: KvStore> HostDriver<E, C, K> {
    /// Create a driver, loading (or generating) the persisted credential.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be read or written.
    pub fn new(env: E, caps: C, kv: K, config: HostConfig) -> Result<Self, HostError> {
        let credentials = CredentialStore::load_or_generate(kv, &env)?;
        let sync = Synchronizer::new(
            config.thumbnail_max_width,
            config.thumbnail_quality,
            config.shell_app_name.clone(),
        );
        let discovery = config.discovery_default;
        info!(room_id = %credentials.room_id(), "host session manager ready");
        Ok(Self {
            env,
            caps,
            config,
            sync,
            credentials,
            registry: PeerRegistry::new(),
            pending: HashMap::new(),
            discovery,
            peer_list_dirty: false,
        })
    }

    /// Process one event, returning the ordered actions it produced.
    ///
    /// # Errors
    ///
    /// Returns an error only on credential-persistence failure during a
    /// rotation; malformed or unexpected peer input never errors.
    pub fn process_event(&mut self, event: HostEvent) -> Result<Vec<HostAction>, HostError> {
        match event {
            HostEvent::FrameReceived { peer_id, payload } => self.handle_frame(peer_id, &payload),
            HostEvent::PeerLeft { peer_id } => Ok(self.handle_peer_left(&peer_id)),
            HostEvent::Tick => Ok(self.handle_tick()),
        }
    }

    fn handle_frame(
        &mut self,
        peer_id: PeerId,
        payload: &[u8],
    ) -> Result<Vec<HostAction>, HostError> {
        let frame = match InboundFrame::decode(payload) {
            Ok(frame) => frame,
            Err(err) => {
                debug!(%peer_id, %err, "discarding undecodable frame");
                return Ok(Vec::new());
            },
        };

        if frame.is_hello() {
            return Ok(self.handle_hello(peer_id, frame));
        }
        if frame.is_verify() {
            return self.handle_verify(&peer_id, &frame);
        }
        self.handle_command_frame(&peer_id, frame)
    }

    /// The greeting: PSK fast path, emoji challenge, or refusal.
    fn handle_hello(&mut self, peer_id: PeerId, frame: InboundFrame) -> Vec<HostAction> {
        let has_identity = frame.profile.as_ref().is_some_and(|p| !p.name.is_empty());
        if !has_identity {
            debug!(%peer_id, "greeting without a device profile");
            return vec![HostAction::Send {
                peer_id,
                message: HostMessage::AuthFailed {
                    reason: Some(AuthFailureReason::ProfileMissing),
                },
            }];
        }

        if self.credentials.psk_matches(frame.auth.as_deref()) {
            return self.trust_peer(peer_id, frame.profile, false);
        }

        if !self.discovery {
            debug!(%peer_id, "greeting without key while discovery is disabled");
            return vec![HostAction::Send {
                peer_id,
                message: HostMessage::DiscoveryDisabled,
            }];
        }

        let (options, answer) = auth::draw_challenge(|bound| self.env.random_index(bound));
        info!(%peer_id, "issuing pairing challenge");
        self.pending.insert(
            peer_id.clone(),
            PendingAuthSession {
                answer: answer.clone(),
                issued_at: self.env.now(),
                candidate_profile: frame.profile,
            },
        );
        vec![
            HostAction::ShowChallengeAnswer { answer },
            HostAction::Send { peer_id, message: HostMessage::Challenge { options } },
        ]
    }

    /// A challenge answer. Correct answers promote the peer; wrong answers
    /// are treated as a security event and rotate the credential.
    fn handle_verify(
        &mut self,
        peer_id: &PeerId,
        frame: &InboundFrame,
    ) -> Result<Vec<HostAction>, HostError> {
        let Some(session) = self.pending.remove(peer_id) else {
            debug!(%peer_id, "verify with no pending challenge, ignoring");
            return Ok(Vec::new());
        };

        // A stale answer is staleness, not an attack: refuse without
        // rotating.
        if self.env.now() - session.issued_at > self.config.challenge_ttl {
            debug!(%peer_id, "challenge answered after expiry");
            return Ok(vec![
                HostAction::Send {
                    peer_id: peer_id.clone(),
                    message: HostMessage::AuthFailed {
                        reason: Some(AuthFailureReason::ChallengeExpired),
                    },
                },
                HostAction::ClearChallengeDisplay,
            ]);
        }

        if session.matches(frame.answer.as_deref().unwrap_or_default()) {
            return Ok(self.trust_peer(peer_id.clone(), session.candidate_profile, true));
        }

        let device_name =
            session.candidate_profile.map_or_else(DeviceProfile::placeholder, |p| p).name;
        warn!(%peer_id, %device_name, "challenge answered incorrectly, rotating credential");
        let mut actions = vec![
            HostAction::Send {
                peer_id: peer_id.clone(),
                message: HostMessage::AuthFailed {
                    reason: Some(AuthFailureReason::ChallengeFailed),
                },
            },
            HostAction::ClearChallengeDisplay,
            HostAction::Notify { notice: HostNotice::PairingFailed { device_name } },
        ];
        actions.extend(self.invalidate_room()?);
        Ok(actions)
    }

    /// Any frame that is neither `hello` nor `verify`: a command. Requires
    /// the sender to present the PSK or already be registered; a valid PSK
    /// on any frame also refreshes registration (liveness after a host
    /// restart).
    fn handle_command_frame(
        &mut self,
        peer_id: &PeerId,
        frame: InboundFrame,
    ) -> Result<Vec<HostAction>, HostError> {
        let mut actions = Vec::new();
        if self.credentials.psk_matches(frame.auth.as_deref()) {
            // Key knowledge supersedes a pending challenge here too.
            if self.pending.remove(peer_id).is_some() {
                actions.push(HostAction::ClearChallengeDisplay);
            }
            let newly_trusted = !self.registry.contains(peer_id);
            let now_secs = self.env.wall_clock_secs();
            let stored =
                self.registry.register(peer_id, frame.profile.clone(), self.env.now(), now_secs);
            if newly_trusted {
                info!(%peer_id, device = %stored.name, "peer re-trusted via key");
                self.credentials.remember_device(&stored, now_secs);
                self.refresh_peer_list();
            }
        } else if self.registry.contains(peer_id) {
            self.registry.touch(peer_id, self.env.now());
        } else {
            debug!(%peer_id, kind = %frame.kind, "ignoring frame from untrusted peer");
            return Ok(Vec::new());
        }

        actions.extend(self.dispatch(peer_id, Command::parse(&frame.kind, frame.data.as_ref())));
        Ok(actions)
    }

    fn handle_peer_left(&mut self, peer_id: &PeerId) -> Vec<HostAction> {
        let mut actions = Vec::new();
        if self.pending.remove(peer_id).is_some() {
            debug!(%peer_id, "peer left mid-challenge");
            actions.push(HostAction::ClearChallengeDisplay);
        }
        if self.registry.remove(peer_id).is_some() {
            info!(%peer_id, "peer left");
            self.refresh_peer_list();
        }
        actions
    }

    fn handle_tick(&mut self) -> Vec<HostAction> {
        let now = self.env.now();
        let ttl = self.config.challenge_ttl;
        let expired: Vec<PeerId> = self
            .pending
            .iter()
            .filter(|(_, session)| now - session.issued_at > ttl)
            .map(|(peer_id, _)| peer_id.clone())
            .collect();

        let mut actions = Vec::new();
        for peer_id in expired {
            debug!(%peer_id, "challenge expired unanswered");
            self.pending.remove(&peer_id);
            actions.push(HostAction::ClearChallengeDisplay);
        }

        if self.peer_list_dirty {
            self.refresh_peer_list();
        }
        actions
    }

    /// Promote a peer to trusted: register it, remember its device, and
    /// send the welcome plus the ordered full-state wave.
    fn trust_peer(
        &mut self,
        peer_id: PeerId,
        profile: Option<DeviceProfile>,
        via_challenge: bool,
    ) -> Vec<HostAction> {
        // A PSK greeting supersedes any challenge still pending for this
        // peer: it already proved key knowledge, so a stale answer arriving
        // later must not count against it.
        let had_pending = self.pending.remove(&peer_id).is_some();
        let now_secs = self.env.wall_clock_secs();
        let stored = self.registry.register(&peer_id, profile, self.env.now(), now_secs);
        self.credentials.remember_device(&stored, now_secs);
        self.refresh_peer_list();
        info!(%peer_id, device = %stored.name, via_challenge, "peer trusted");

        let mut actions = Vec::new();
        if via_challenge {
            actions.push(HostAction::Send {
                peer_id: peer_id.clone(),
                message: HostMessage::Authorized {
                    psk: self.credentials.credential().preshared_key.clone(),
                    device_name: stored.name.clone(),
                },
            });
            actions.push(HostAction::Notify {
                notice: HostNotice::PairingSucceeded { device_name: stored.name.clone() },
            });
            actions.push(HostAction::ClearChallengeDisplay);
        } else {
            if had_pending {
                actions.push(HostAction::ClearChallengeDisplay);
            }
            actions.push(HostAction::Send {
                peer_id: peer_id.clone(),
                message: HostMessage::Welcome { device_name: stored.name },
            });
        }

        for message in self.sync.full_state_wave(&self.caps) {
            actions.push(HostAction::Send { peer_id: peer_id.clone(), message });
        }
        actions
    }

    /// Rotate the credential and drop every session that trusted the old
    /// one. In-memory state is consistent before the action is returned.
    fn invalidate_room(&mut self) -> Result<Vec<HostAction>, HostError> {
        let credential = self.credentials.rotate(&self.env)?;
        let room_id = credential.room_id.clone();
        info!(%room_id, "credential rotated, room invalidated");
        self.registry.clear();
        self.pending.clear();
        self.refresh_peer_list();
        Ok(vec![HostAction::RoomInvalidated { room_id }])
    }

    /// Push the current peer list to the host UI. An unavailable hook
    /// leaves the list dirty; the next tick retries instead of dropping
    /// the notification.
    fn refresh_peer_list(&mut self) {
        let peers = self.registry.snapshot();
        match self.caps.peers_changed(&peers) {
            Ok(()) => self.peer_list_dirty = false,
            Err(CapabilityError::Unsupported) => self.peer_list_dirty = true,
            Err(CapabilityError::Failed(reason)) => {
                warn!(%reason, "peer list refresh failed");
                self.peer_list_dirty = true;
            },
        }
    }

    // ── Host-local control surface ──────────────────────────────────

    /// The current rendezvous room id, shown in the host's pairing QR.
    pub fn pairing_code(&self) -> &str {
        self.credentials.room_id()
    }

    /// The current pre-shared key (for the host UI's own QR payload).
    pub fn psk(&self) -> &str {
        &self.credentials.credential().preshared_key
    }

    /// Operator-initiated credential rotation.
    ///
    /// # Errors
    ///
    /// Returns an error if the fresh credential cannot be persisted.
    pub fn rotate_credential(&mut self) -> Result<Vec<HostAction>, HostError> {
        let had_pending = !self.pending.is_empty();
        let mut actions = self.invalidate_room()?;
        if had_pending {
            actions.insert(0, HostAction::ClearChallengeDisplay);
        }
        Ok(actions)
    }

    /// Enable or disable interactive discovery. While disabled, greetings
    /// without a valid key are refused instead of challenged.
    pub fn set_discovery(&mut self, enabled: bool) {
        info!(enabled, "discovery toggled");
        self.discovery = enabled;
    }

    /// Whether interactive discovery is currently enabled.
    pub fn discovery_enabled(&self) -> bool {
        self.discovery
    }

    /// Operator rejection of a pending challenge: refuse the peer without
    /// rotating the credential (the answer was never exposed).
    pub fn reject_pending_challenge(&mut self, peer_id: &PeerId) -> Vec<HostAction> {
        match self.pending.remove(peer_id) {
            Some(_) => {
                info!(%peer_id, "pending challenge rejected by operator");
                vec![
                    HostAction::Send {
                        peer_id: peer_id.clone(),
                        message: HostMessage::AuthFailed {
                            reason: Some(AuthFailureReason::Rejected),
                        },
                    },
                    HostAction::ClearChallengeDisplay,
                ]
            },
            None => Vec::new(),
        }
    }

    /// Currently connected peers.
    pub fn peers(&self) -> Vec<PeerSnapshot> {
        self.registry.snapshot()
    }

    /// Previously paired devices, by profile name.
    pub fn known_devices(&self) -> HashMap<String, KnownDevice> {
        self.credentials.known_devices()
    }

    // ── On-demand facet pushes ──────────────────────────────────────

    /// The ordered full-state wave, to one peer or broadcast.
    pub fn push_full_state(&self, target: Option<&PeerId>) -> Vec<HostAction> {
        let wave = self.sync.full_state_wave(&self.caps);
        match target {
            Some(peer_id) => wave
                .into_iter()
                .map(|message| HostAction::Send { peer_id: peer_id.clone(), message })
                .collect(),
            None => wave.into_iter().map(|message| HostAction::Broadcast { message }).collect(),
        }
    }

    /// Broadcast the current wallpaper.
    pub fn push_wallpaper_update(&self) -> HostAction {
        HostAction::Broadcast { message: self.sync.wallpaper_update(&self.caps) }
    }

    /// Broadcast the current widget snapshots.
    pub fn push_widget_update(&self) -> HostAction {
        HostAction::Broadcast { message: self.sync.widget_update(&self.caps) }
    }

    /// Activate an app UI descriptor and broadcast it. The descriptor is
    /// cached and replayed to peers that connect later.
    pub fn set_app_ui(&mut self, descriptor: Value) -> HostAction {
        HostAction::Broadcast { message: self.sync.set_app_ui(descriptor) }
    }

    /// Clear the active app UI with an explicit-null broadcast.
    pub fn clear_app_ui(&mut self) -> HostAction {
        HostAction::Broadcast { message: self.sync.clear_app_ui() }
    }

    /// Broadcast an incremental app UI update.
    pub fn push_app_ui_update(&self, data: Value) -> HostAction {
        HostAction::Broadcast { message: HostMessage::AppUiUpdate { data } }
    }

    /// Broadcast the current notification list.
    pub fn push_notification_update(&self) -> HostAction {
        HostAction::Broadcast { message: self.sync.notification_update(&self.caps) }
    }

    /// Broadcast the current media session.
    pub fn push_media_update(&self) -> HostAction {
        HostAction::Broadcast { message: self.sync.media_update(&self.caps) }
    }

    /// Broadcast the start of a live activity.
    pub fn push_live_activity_start(&self, data: Value) -> HostAction {
        HostAction::Broadcast { message: HostMessage::LiveActivityStart { data } }
    }

    /// Prompt one peer to upload, correlating an earlier `uploadData`.
    pub fn push_request_upload(&self, peer_id: &PeerId, data: Value) -> HostAction {
        HostAction::Send {
            peer_id: peer_id.clone(),
            message: HostMessage::RequestUpload { data },
        }
    }
}
