//! Unit tests for the broadcaster.

#![allow(clippy::unwrap_used)]

use tokio::sync::broadcast::error::TryRecvError;

use crate::{broadcast::Broadcaster, store::ConfigSnapshot, transport::MAX_FRAME_LENGTH};

#[test]
fn publish_sends_once_on_each_channel() {
    let broadcaster = Broadcaster::new();
    let mut network = broadcaster.subscribe_network();
    let mut local = broadcaster.subscribe_local();

    broadcaster.publish(&ConfigSnapshot::new(100, "v1"));

    let payload = network.try_recv().unwrap();
    assert_eq!(
        ConfigSnapshot::from_wire(&payload).unwrap(),
        ConfigSnapshot::new(100, "v1")
    );
    assert_eq!(local.try_recv().unwrap().as_ref(), b"v1");

    assert!(matches!(network.try_recv(), Err(TryRecvError::Empty)));
    assert!(matches!(local.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn publish_local_skips_network() {
    let broadcaster = Broadcaster::new();
    let mut network = broadcaster.subscribe_network();
    let mut local = broadcaster.subscribe_local();

    broadcaster.publish_local("only here");

    assert_eq!(local.try_recv().unwrap().as_ref(), b"only here");
    assert!(matches!(network.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn publish_without_subscribers_is_lost() {
    let broadcaster = Broadcaster::new();

    broadcaster.publish(&ConfigSnapshot::new(1, "nobody listens"));

    let mut late = broadcaster.subscribe_network();
    assert!(matches!(late.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn clones_share_channels() {
    let broadcaster = Broadcaster::new();
    let mut network = broadcaster.subscribe_network();

    broadcaster.clone().publish_network(&ConfigSnapshot::new(7, "shared"));

    assert!(network.try_recv().is_ok());
}

#[test]
fn oversized_snapshot_is_refused_on_both_channels() {
    let broadcaster = Broadcaster::with_max_payload(64);
    let mut network = broadcaster.subscribe_network();
    let mut local = broadcaster.subscribe_local();

    broadcaster.publish(&ConfigSnapshot::new(1, "x".repeat(65)));
    broadcaster.publish(&ConfigSnapshot::new(2, "small"));

    let payload = network.try_recv().unwrap();
    assert_eq!(ConfigSnapshot::from_wire(&payload).unwrap().timestamp, 2);
    assert_eq!(local.try_recv().unwrap().as_ref(), b"small");
    assert!(matches!(network.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn payload_limit_is_capped_at_frame_length() {
    let broadcaster = Broadcaster::with_max_payload(usize::MAX);

    assert_eq!(broadcaster.max_payload(), MAX_FRAME_LENGTH);
    assert_eq!(Broadcaster::new().max_payload(), MAX_FRAME_LENGTH);
}
