//! Credential and known-device persistence.
//!
//! The credential pairs a rendezvous room id with the pre-shared key that
//! gates all ongoing traffic. It is generated lazily on first startup and
//! replaced atomically on rotation: the in-memory copy is swapped first
//! and is authoritative the moment rotation returns, so a concurrent
//! greeting can never be checked against a half-old credential.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    env::Environment,
    storage::{KvError, KvStore},
};
use tether_proto::DeviceProfile;

/// Storage key for the credential record.
const KEY_CREDENTIAL: &str = "credential";

/// Storage key for the known-devices map.
const KEY_KNOWN_DEVICES: &str = "known_devices";

/// Entropy of the room identifier, in bytes (hex doubles the length).
const ROOM_ID_BYTES: usize = 8;

/// Entropy of the pre-shared key, in bytes.
const PSK_BYTES: usize = 32;

/// The host's pairing credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Rendezvous room identifier peers use to locate the host.
    #[serde(rename = "roomId")]
    pub room_id: String,
    /// Pre-shared key; the long-lived trust token for ongoing traffic.
    #[serde(rename = "presharedKey")]
    pub preshared_key: String,
}

impl Credential {
    /// Generate a fresh credential from the environment's CSPRNG.
    pub fn generate<E: Environment>(env: &E) -> Self {
        let mut room = [0u8; ROOM_ID_BYTES];
        env.random_bytes(&mut room);
        let mut psk = [0u8; PSK_BYTES];
        env.random_bytes(&mut psk);
        Self { room_id: hex::encode(room), preshared_key: hex::encode(psk) }
    }
}

/// A previously paired device, remembered by profile name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownDevice {
    /// The profile as last presented.
    pub profile: DeviceProfile,
    /// Unix timestamp (seconds) of the last successful registration.
    pub last_seen_secs: u64,
}

/// Credential and known-device store over a key-value backend.
///
/// Owns the in-memory credential; the backend is write-through. A backend
/// read failure at load time falls back to generating a fresh credential
/// (the old one is unusable anyway if we cannot read it), while a write
/// failure surfaces as an error on the credential path and a warning on
/// the known-devices path.
#[derive(Debug, Clone)]
pub struct CredentialStore<K: KvStore> {
    kv: K,
    credential: Credential,
}

impl<K: KvStore> CredentialStore<K> {
    /// Load the persisted credential, generating and persisting a fresh one
    /// if none exists.
    pub fn load_or_generate<E: Environment>(kv: K, env: &E) -> Result<Self, KvError> {
        let credential = match kv.get(KEY_CREDENTIAL)? {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(credential) => credential,
                Err(e) => {
                    warn!(error = %e, "stored credential unreadable, regenerating");
                    let fresh = Credential::generate(env);
                    kv.set(KEY_CREDENTIAL, &serde_json::to_vec(&fresh)?)?;
                    fresh
                },
            },
            None => {
                let fresh = Credential::generate(env);
                kv.set(KEY_CREDENTIAL, &serde_json::to_vec(&fresh)?)?;
                fresh
            },
        };
        Ok(Self { kv, credential })
    }

    /// The current credential.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The current rendezvous room id.
    pub fn room_id(&self) -> &str {
        &self.credential.room_id
    }

    /// Whether `auth` matches the current pre-shared key.
    pub fn psk_matches(&self, auth: Option<&str>) -> bool {
        auth == Some(self.credential.preshared_key.as_str())
    }

    /// Replace the credential with a freshly generated one.
    ///
    /// Single atomic replace-and-persist: the in-memory swap happens first,
    /// so even if persistence fails the old PSK stops authenticating
    /// immediately.
    pub fn rotate<E: Environment>(&mut self, env: &E) -> Result<&Credential, KvError> {
        self.credential = Credential::generate(env);
        self.kv.set(KEY_CREDENTIAL, &serde_json::to_vec(&self.credential)?)?;
        Ok(&self.credential)
    }

    /// Upsert a device into the persisted known-devices map.
    ///
    /// Placeholder profiles are skipped - they carry no identity worth
    /// remembering. Storage failures log a warning; forgetting a device is
    /// recoverable, blocking authentication is not.
    pub fn remember_device(&self, profile: &DeviceProfile, now_secs: u64) {
        if profile.is_placeholder() {
            return;
        }
        let mut devices = self.known_devices();
        devices.insert(
            profile.name.clone(),
            KnownDevice { profile: profile.clone(), last_seen_secs: now_secs },
        );
        match serde_json::to_vec(&devices) {
            Ok(bytes) => {
                if let Err(e) = self.kv.set(KEY_KNOWN_DEVICES, &bytes) {
                    warn!(error = %e, device = %profile.name, "failed to persist known device");
                }
            },
            Err(e) => warn!(error = %e, "failed to serialize known devices"),
        }
    }

    /// The persisted known-devices map. Unreadable state degrades to empty.
    pub fn known_devices(&self) -> HashMap<String, KnownDevice> {
        match self.kv.get(KEY_KNOWN_DEVICES) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "known devices unreadable, starting empty");
                HashMap::new()
            }),
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!(error = %e, "failed to read known devices");
                HashMap::new()
            },
        }
    }
}
