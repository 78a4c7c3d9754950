//! Daemon settings.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional TOML settings file, and command-line flags. All fields have
//! defaults so an empty or absent settings file is valid.

mod general;
mod loading;
mod paths;


pub use general::{GeneralConfig, LogLevel};
pub use paths::ConfigPaths;

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::transport::MAX_FRAME_LENGTH;

/// Complete settings for one confsync node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// General application settings.
    pub general: GeneralConfig,

    /// Path of the config file kept in sync across the mesh.
    pub file: PathBuf,

    /// Request endpoint of a running peer to join. `None` starts a fresh mesh.
    pub bootstrap: Option<String>,

    /// Host the network endpoints listen on.
    pub bind_host: String,

    /// Host advertised to peers in join handshakes.
    pub advertise_host: String,

    /// Port of the join request endpoint. `0` lets the OS pick one.
    pub request_port: u16,

    /// Port of the network publish endpoint. `0` lets the OS pick one.
    pub publish_port: u16,

    /// Unix socket carrying raw config bodies to same-host consumers.
    pub local_socket: PathBuf,

    /// Join every peer learned from the bootstrap reply, not only the
    /// bootstrap target itself.
    pub transitive_join: bool,

    /// Delay between binding endpoints and the initial publish, in
    /// milliseconds. Gives freshly linked peers time to connect.
    pub settle_delay_ms: u64,

    /// Delay before a dropped or refused subscription link is retried,
    /// in milliseconds.
    pub reconnect_delay_ms: u64,

    /// Largest serialized snapshot sent to peers, in bytes. Larger ones are
    /// logged and not sent. Capped at what a frame can carry.
    pub max_snapshot_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            file: PathBuf::from("config.json"),
            bootstrap: None,
            bind_host: "0.0.0.0".to_string(),
            advertise_host: "127.0.0.1".to_string(),
            request_port: 0,
            publish_port: 0,
            local_socket: PathBuf::from("confsyncd.sock"),
            transitive_join: false,
            settle_delay_ms: 500,
            reconnect_delay_ms: 1000,
            max_snapshot_bytes: MAX_FRAME_LENGTH,
        }
    }
}

impl Settings {
    /// Delay before the initial publish.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Delay between subscription reconnect attempts.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
