//! End-to-end pairing flows under simulation.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::time::Duration;

use tether_harness::{ScriptedCaps, SimEnv, SimHost};
use tether_host::{HostConfig, HostNotice};
use tether_proto::{DeviceProfile, HostMessage, InboundFrame};

fn world(seed: u64) -> (SimHost, SimEnv, ScriptedCaps) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let env = SimEnv::with_seed(seed);
    let caps = ScriptedCaps::new();
    let host = SimHost::new(env.clone(), caps.clone(), HostConfig::default());
    (host, env, caps)
}

fn hello(name: &str, auth: Option<String>) -> InboundFrame {
    InboundFrame::hello(Some(DeviceProfile::named(name)), auth)
}

#[test]
fn psk_fast_path_reconnect() {
    let (mut host, _env, _caps) = world(1);
    let psk = host.psk();

    host.deliver("phone", &hello("Alice", Some(psk))).unwrap();

    let kinds: Vec<&str> = host.inbox("phone").iter().map(HostMessage::kind).collect();
    assert_eq!(kinds, vec!["welcome", "state", "wallpaperUpdate", "widgetUpdate", "appList"]);
    assert!(host.displayed_answer().is_none());
    assert_eq!(host.driver().peers().len(), 1);
}

#[test]
fn interactive_pairing_via_the_host_display() {
    let (mut host, _env, caps) = world(2);

    host.deliver("phone", &hello("Alice", None)).unwrap();

    // The companion sees sixteen options; the operator reads the answer
    // off the host screen.
    let options = match host.last_of_kind("phone", "challenge").unwrap() {
        HostMessage::Challenge { options } => options.clone(),
        other => panic!("expected challenge, got {other:?}"),
    };
    assert_eq!(options.len(), 16);
    let answer = host.displayed_answer().unwrap().to_string();
    assert!(options.contains(&answer));

    host.deliver("phone", &InboundFrame::verify(answer)).unwrap();

    // The peer now holds the PSK for future fast-path greetings.
    let issued_psk = match host.last_of_kind("phone", "authorized").unwrap() {
        HostMessage::Authorized { psk, device_name } => {
            assert_eq!(device_name, "Alice");
            psk.clone()
        },
        other => panic!("expected authorized, got {other:?}"),
    };
    assert_eq!(issued_psk, host.psk());
    assert!(host.displayed_answer().is_none());
    assert!(matches!(
        host.notices().last().unwrap(),
        HostNotice::PairingSucceeded { device_name } if device_name == "Alice"
    ));
    assert_eq!(caps.state().peer_lists.last().unwrap()[0].profile.name, "Alice");

    // Reconnect later with the issued key: no challenge this time.
    host.peer_left("phone").unwrap();
    host.deliver("phone", &hello("Alice", Some(issued_psk))).unwrap();
    assert!(host.displayed_answer().is_none());
    assert!(host.last_of_kind("phone", "welcome").is_some());
}

#[test]
fn wrong_answer_burns_the_room_for_everyone() {
    let (mut host, _env, _caps) = world(3);
    let old_psk = host.psk();

    host.deliver("tablet", &hello("Bob", Some(old_psk.clone()))).unwrap();

    host.deliver("phone", &hello("Mallory", None)).unwrap();
    let options = match host.last_of_kind("phone", "challenge").unwrap() {
        HostMessage::Challenge { options } => options.clone(),
        other => panic!("expected challenge, got {other:?}"),
    };
    let answer = host.displayed_answer().unwrap();
    let wrong = options.iter().find(|option| *option != answer).unwrap().clone();

    host.deliver("phone", &InboundFrame::verify(wrong)).unwrap();

    assert!(host.last_of_kind("phone", "auth_failed").is_some());
    assert!(matches!(
        host.notices().last().unwrap(),
        HostNotice::PairingFailed { device_name } if device_name == "Mallory"
    ));

    // The runtime rejoined a fresh room and every peer was dropped.
    assert_eq!(host.rooms_joined().len(), 2);
    assert_ne!(host.rooms_joined()[0], host.rooms_joined()[1]);
    assert!(host.driver().peers().is_empty());

    // The old key authenticates nobody, trusted peers included.
    host.drain_inbox("tablet");
    host.deliver("tablet", &hello("Bob", Some(old_psk))).unwrap();
    assert!(host.last_of_kind("tablet", "welcome").is_none());
    assert!(host.last_of_kind("tablet", "challenge").is_some());
}

#[test]
fn stale_verify_from_a_trusted_peer_is_harmless() {
    let (mut host, _env, _caps) = world(6);
    let psk = host.psk();

    // The companion gets challenged, then finds its stored key and
    // re-greets before anyone picks an emoji.
    host.deliver("phone", &hello("Alice", None)).unwrap();
    assert!(host.displayed_answer().is_some());
    host.deliver("phone", &hello("Alice", Some(psk.clone()))).unwrap();
    assert!(host.last_of_kind("phone", "welcome").is_some());
    assert!(host.displayed_answer().is_none());

    // A leftover wrong answer from that peer must not burn the room.
    host.deliver("phone", &InboundFrame::verify("🦖")).unwrap();

    assert_eq!(host.psk(), psk);
    assert_eq!(host.rooms_joined().len(), 1);
    assert_eq!(host.driver().peers().len(), 1);
}

#[test]
fn challenge_expires_quietly() {
    let (mut host, env, _caps) = world(4);

    host.deliver("phone", &hello("Alice", None)).unwrap();
    let answer = host.displayed_answer().unwrap().to_string();

    env.advance(HostConfig::default().challenge_ttl + Duration::from_secs(1));
    host.tick().unwrap();

    // The display is cleared and the stale answer is dead.
    assert!(host.displayed_answer().is_none());
    host.drain_inbox("phone");
    host.deliver("phone", &InboundFrame::verify(answer)).unwrap();
    assert!(host.inbox("phone").is_empty());

    // A fresh greeting starts a fresh challenge.
    host.deliver("phone", &hello("Alice", None)).unwrap();
    assert!(host.displayed_answer().is_some());
}

#[test]
fn same_seed_reproduces_the_same_challenge() {
    let (mut a, _env_a, _caps_a) = world(42);
    let (mut b, _env_b, _caps_b) = world(42);

    a.deliver("phone", &hello("Alice", None)).unwrap();
    b.deliver("phone", &hello("Alice", None)).unwrap();

    assert_eq!(a.displayed_answer(), b.displayed_answer());
    assert_eq!(a.last_of_kind("phone", "challenge"), b.last_of_kind("phone", "challenge"));
}
