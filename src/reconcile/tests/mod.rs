//! Unit tests for reconciliation, driven without any network.

#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]

use std::{fs, path::PathBuf, time::Duration};

use bytes::Bytes;
use tempfile::TempDir;
use tokio::sync::{
    broadcast::{self, error::TryRecvError},
    mpsc,
};

use crate::{
    ConfsyncError,
    broadcast::Broadcaster,
    reconcile::{Reconciliation, Reconciler},
    store::{ConfigSnapshot, LocalStore, nanos_to_system_time},
};

struct Node {
    _dir: TempDir,
    path: PathBuf,
    store: LocalStore,
    reconciler: Reconciler,
    network: broadcast::Receiver<Bytes>,
    local: broadcast::Receiver<Bytes>,
}

impl Node {
    fn with_file(body: &str, timestamp: i64) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, body).unwrap();
        stamp(&path, timestamp);

        let store = LocalStore::open(&path).unwrap();
        let broadcaster = Broadcaster::new();
        let network = broadcaster.subscribe_network();
        let local = broadcaster.subscribe_local();

        Self {
            _dir: dir,
            path,
            reconciler: Reconciler::new(store.clone(), broadcaster),
            store,
            network,
            local,
        }
    }

    fn receive(&self, timestamp: i64, body: &str) -> Reconciliation {
        let payload = ConfigSnapshot::new(timestamp, body).to_wire().unwrap();
        self.reconciler.reconcile(&payload).unwrap()
    }

    fn content(&self) -> String {
        fs::read_to_string(&self.path).unwrap()
    }

    fn network_sent(&mut self) -> Option<ConfigSnapshot> {
        match self.network.try_recv() {
            Ok(payload) => Some(ConfigSnapshot::from_wire(&payload).unwrap()),
            Err(TryRecvError::Empty) => None,
            Err(e) => panic!("unexpected network channel state: {e:?}"),
        }
    }

    fn local_sent(&mut self) -> Option<String> {
        match self.local.try_recv() {
            Ok(payload) => Some(String::from_utf8(payload.to_vec()).unwrap()),
            Err(TryRecvError::Empty) => None,
            Err(e) => panic!("unexpected local channel state: {e:?}"),
        }
    }
}

fn stamp(path: &PathBuf, timestamp: i64) {
    let file = fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(nanos_to_system_time(timestamp)).unwrap();
}

#[test]
fn newer_remote_overwrites_local_file() {
    let node = Node::with_file("v1", 100);

    let outcome = node.receive(200, "v2");

    assert_eq!(outcome, Reconciliation::AppliedRemote { timestamp: 200 });
    assert_eq!(node.content(), "v2");
    assert_eq!(node.store.read().unwrap().timestamp, 200);
}

#[test]
fn applying_remote_only_publishes_locally() {
    let mut node = Node::with_file("v1", 100);

    node.receive(200, "v2");

    assert_eq!(node.local_sent().as_deref(), Some("v2"));
    assert_eq!(node.network_sent(), None);
}

#[test]
fn older_remote_pushes_local_snapshot_back() {
    let mut node = Node::with_file("authoritative", 300);

    let outcome = node.receive(200, "stale");

    assert_eq!(outcome, Reconciliation::PushedLocal { timestamp: 300 });
    assert_eq!(node.content(), "authoritative");
    assert_eq!(
        node.network_sent(),
        Some(ConfigSnapshot::new(300, "authoritative"))
    );
    assert_eq!(node.local_sent(), None);
}

#[test]
fn equal_timestamp_is_a_no_op() {
    let mut node = Node::with_file("same", 100);

    let outcome = node.receive(100, "same");

    assert_eq!(outcome, Reconciliation::Converged);
    assert_eq!(node.network_sent(), None);
    assert_eq!(node.local_sent(), None);
}

#[test]
fn equal_timestamp_with_different_body_is_not_detected() {
    let node = Node::with_file("mine", 100);

    let outcome = node.receive(100, "theirs");

    assert_eq!(outcome, Reconciliation::Converged);
    assert_eq!(node.content(), "mine");
}

#[test]
fn same_snapshot_twice_changes_file_once() {
    let mut node = Node::with_file("v1", 100);

    let first = node.receive(200, "v2");
    let second = node.receive(200, "v2");

    assert_eq!(first, Reconciliation::AppliedRemote { timestamp: 200 });
    assert_eq!(second, Reconciliation::Converged);
    assert_eq!(node.local_sent().as_deref(), Some("v2"));
    assert_eq!(node.local_sent(), None);
    assert_eq!(node.network_sent(), None);
}

#[test]
fn edits_are_always_reread_from_disk() {
    let mut node = Node::with_file("v1", 100);

    fs::write(&node.path, "edited elsewhere").unwrap();
    stamp(&node.path, 500);

    let outcome = node.receive(200, "v2");

    assert_eq!(outcome, Reconciliation::PushedLocal { timestamp: 500 });
    assert_eq!(
        node.network_sent(),
        Some(ConfigSnapshot::new(500, "edited elsewhere"))
    );
}

#[test]
fn deleted_local_file_is_restored_from_remote() {
    let node = Node::with_file("v1", 100);
    fs::remove_file(&node.path).unwrap();

    let outcome = node.receive(50, "from peer");

    assert_eq!(outcome, Reconciliation::AppliedRemote { timestamp: 50 });
    assert_eq!(node.content(), "from peer");
}

#[test]
fn malformed_payload_is_recoverable() {
    let node = Node::with_file("v1", 100);

    let result = node.reconciler.reconcile(b"{\"Time\": \"soon\"}");

    match result {
        Err(e @ ConfsyncError::MalformedMessage { .. }) => assert!(e.is_recoverable()),
        other => panic!("expected malformed message, got {other:?}"),
    }
    assert_eq!(node.content(), "v1");
}

#[test]
fn scenario_remote_newer_discards_concurrent_local_edit() {
    let mut node = Node::with_file("", 10);

    assert_eq!(
        node.receive(100, "v1"),
        Reconciliation::AppliedRemote { timestamp: 100 }
    );
    assert_eq!(node.content(), "v1");

    assert_eq!(
        node.receive(200, "v2"),
        Reconciliation::AppliedRemote { timestamp: 200 }
    );
    assert_eq!(node.content(), "v2");

    fs::write(&node.path, "v2-local").unwrap();
    stamp(&node.path, 150);

    assert_eq!(
        node.receive(200, "v2"),
        Reconciliation::AppliedRemote { timestamp: 200 }
    );
    assert_eq!(node.content(), "v2");
}

#[tokio::test]
async fn run_survives_malformed_messages() {
    let mut node = Node::with_file("v1", 100);
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(node.reconciler.clone().run(inbound_rx));

    inbound_tx.send(Bytes::from_static(b"\x00garbage")).unwrap();
    inbound_tx
        .send(Bytes::from(ConfigSnapshot::new(200, "v2").to_wire().unwrap()))
        .unwrap();

    let applied = tokio::time::timeout(Duration::from_secs(5), node.local.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(applied.as_ref(), b"v2");
    assert_eq!(node.content(), "v2");
    assert!(!task.is_finished());
    task.abort();
}

#[tokio::test]
async fn run_ends_when_subscription_closes() {
    let node = Node::with_file("v1", 100);
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Bytes>();
    drop(inbound_tx);

    let result = node.reconciler.clone().run(inbound_rx).await;

    assert!(matches!(result, Err(ConfsyncError::Transport { .. })));
}
