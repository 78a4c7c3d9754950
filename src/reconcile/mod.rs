//! Last-writer-wins reconciliation of inbound snapshots.
//!
//! Every inbound snapshot is compared against a fresh read of the local file:
//!
//! - remote newer: the local file is replaced and the new body goes out on
//!   the local channel only, so the update does not echo back into the mesh.
//! - remote older: the local snapshot is pushed back onto the network channel
//!   so the lagging peer catches up without asking.
//! - equal: nothing to do.
//!
//! Equal timestamps are taken to mean equal content. Two different writes
//! that happen to share a timestamp are not told apart.
//!
//! Applying a remote snapshot never publishes it on the network channel
//! from here. The change detector does see the write and broadcasts the file
//! once, but the file carries the remote's timestamp, so every peer that
//! already has it treats the broadcast as converged and nothing is sent on.

#[cfg(test)]
mod tests;

use std::cmp::Ordering;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    ConfsyncError, Result,
    broadcast::Broadcaster,
    store::{ConfigSnapshot, LocalStore},
};

/// Outcome of reconciling one inbound snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The local file was stale and now holds the remote snapshot.
    AppliedRemote {
        /// Timestamp of the applied snapshot
        timestamp: i64,
    },
    /// The remote peer was stale; the local snapshot was re-broadcast.
    PushedLocal {
        /// Timestamp of the re-broadcast local snapshot
        timestamp: i64,
    },
    /// Both sides already agree.
    Converged,
}

/// Applies inbound network snapshots to the local store.
#[derive(Clone)]
pub struct Reconciler {
    store: LocalStore,
    broadcaster: Broadcaster,
}

impl Reconciler {
    /// Creates a reconciler over the given store and broadcaster.
    pub fn new(store: LocalStore, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }

    /// Reconciles one inbound wire payload.
    ///
    /// # Errors
    /// Returns `ConfsyncError::MalformedMessage` if the payload is not a
    /// snapshot, and `ConfsyncError::ConfigIo` if the local file cannot be
    /// read or replaced.
    pub fn reconcile(&self, payload: &[u8]) -> Result<Reconciliation> {
        let candidate = ConfigSnapshot::from_wire(payload)?;
        self.apply(candidate)
    }

    /// Reconciles one already-parsed candidate snapshot.
    ///
    /// A missing local file loses against any candidate.
    ///
    /// # Errors
    /// Returns `ConfsyncError::ConfigIo` if the local file cannot be read or
    /// replaced.
    pub fn apply(&self, candidate: ConfigSnapshot) -> Result<Reconciliation> {
        let local = self.store.read_existing()?;

        let ordering = match &local {
            Some(local) => candidate.timestamp.cmp(&local.timestamp),
            None => Ordering::Greater,
        };

        match (ordering, local) {
            (Ordering::Greater, _) => {
                self.store.write_at(&candidate.body, candidate.timestamp)?;
                self.broadcaster.publish_local(&candidate.body);

                info!(timestamp = candidate.timestamp, "Applied newer remote config");
                Ok(Reconciliation::AppliedRemote {
                    timestamp: candidate.timestamp,
                })
            }
            (Ordering::Less, Some(local)) => {
                self.broadcaster.publish_network(&local);

                debug!(
                    remote = candidate.timestamp,
                    local = local.timestamp,
                    "Peer is stale, pushed local config"
                );
                Ok(Reconciliation::PushedLocal {
                    timestamp: local.timestamp,
                })
            }
            _ => Ok(Reconciliation::Converged),
        }
    }

    /// Reconciles inbound payloads until the subscription channel closes.
    ///
    /// Malformed payloads are logged and skipped.
    ///
    /// # Errors
    /// Returns the first non-recoverable error, such as a failed write to
    /// the local file.
    pub async fn run(self, mut inbound: mpsc::UnboundedReceiver<Bytes>) -> Result<()> {
        while let Some(payload) = inbound.recv().await {
            match self.reconcile(&payload) {
                Ok(outcome) => debug!(?outcome, "Reconciled inbound snapshot"),
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, len = payload.len(), "Dropped inbound message");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ConfsyncError::transport(
            "subscription channel closed",
            "subscriber",
        ))
    }
}
