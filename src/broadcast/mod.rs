//! Fan-out of config snapshots to peers and local consumers.
//!
//! Two logical channels are kept: the network channel carries serialized
//! snapshots to remote peers, the local channel carries only the raw body
//! for same-host consumers. Both are best-effort: a message sent while no
//! one listens is gone.
//!
//! Payloads above the size limit are refused with a warning instead of being
//! handed to the endpoints, where they would fail the send and cut the link.

#[cfg(test)]
mod tests;

use bytes::Bytes;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use crate::{store::ConfigSnapshot, transport::MAX_FRAME_LENGTH};

const CHANNEL_CAPACITY: usize = 1000;

/// Publishes snapshots on the network and local channels.
///
/// Cloning yields another handle onto the same pair of channels.
#[derive(Clone)]
pub struct Broadcaster {
    network: broadcast::Sender<Bytes>,
    local: broadcast::Sender<Bytes>,
    max_payload: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    /// Creates a broadcaster with no subscribers.
    pub fn new() -> Self {
        Self::with_max_payload(MAX_FRAME_LENGTH)
    }

    /// Creates a broadcaster that refuses payloads larger than `max_payload`
    /// bytes. The limit never exceeds [`MAX_FRAME_LENGTH`].
    pub fn with_max_payload(max_payload: usize) -> Self {
        let (network, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (local, _) = broadcast::channel(CHANNEL_CAPACITY);

        Self {
            network,
            local,
            max_payload: max_payload.min(MAX_FRAME_LENGTH),
        }
    }

    /// Largest payload this broadcaster sends.
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Sends `snapshot` to peers, then its body to local consumers.
    pub fn publish(&self, snapshot: &ConfigSnapshot) {
        self.publish_network(snapshot);
        self.publish_local(&snapshot.body);
    }

    /// Sends the serialized snapshot on the network channel only.
    pub fn publish_network(&self, snapshot: &ConfigSnapshot) {
        let payload = match snapshot.to_wire() {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "Failed to serialize snapshot");
                return;
            }
        };

        if payload.len() > self.max_payload {
            warn!(
                timestamp = snapshot.timestamp,
                len = payload.len(),
                limit = self.max_payload,
                "Snapshot too large for the network channel, not sent"
            );
            return;
        }

        match self.network.send(Bytes::from(payload)) {
            Ok(receivers) => {
                debug!(timestamp = snapshot.timestamp, receivers, "Published snapshot to network");
            }
            Err(_) => {
                debug!(timestamp = snapshot.timestamp, "No network subscribers, snapshot dropped");
            }
        }
    }

    /// Sends the raw body on the local channel only.
    pub fn publish_local(&self, body: &str) {
        if body.len() > self.max_payload {
            warn!(
                len = body.len(),
                limit = self.max_payload,
                "Body too large for the local channel, not sent"
            );
            return;
        }

        let payload = Bytes::copy_from_slice(body.as_bytes());

        if self.local.send(payload).is_err() {
            debug!(len = body.len(), "No local subscribers, body dropped");
        }
    }

    /// Receives every network payload published after this call.
    pub fn subscribe_network(&self) -> broadcast::Receiver<Bytes> {
        self.network.subscribe()
    }

    /// Receives every local body published after this call.
    pub fn subscribe_local(&self) -> broadcast::Receiver<Bytes> {
        self.local.subscribe()
    }
}
