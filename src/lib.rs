//! Confsync - keeps one configuration file identical across a mesh of peers.
//!
//! Every node watches its local copy of the file, broadcasts each change to
//! the peers subscribed to it, and reconciles what it receives using
//! last-writer-wins on the file's modification time. New nodes join through
//! any running peer.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use confsync::{config::Settings, daemon::Daemon};
//!
//! # async fn start() -> confsync::Result<()> {
//! let settings = Settings {
//!     bootstrap: Some("10.0.0.1:5555".to_string()),
//!     ..Settings::default()
//! };
//!
//! Daemon::bind(settings).await?.run().await
//! # }
//! ```

/// Fan-out of snapshots to the network and local channels.
pub mod broadcast;

/// Command-line flags for the daemon binary.
pub mod cli;

/// Daemon settings, loaded from TOML.
pub mod config;

/// Core error types and result aliases.
pub mod core;

/// Wiring of one mesh node.
pub mod daemon;

/// Join handshake and the list of joined peers.
pub mod membership;

/// Last-writer-wins reconciliation of inbound snapshots.
pub mod reconcile;

/// The synchronized file on disk.
pub mod store;

/// Logging setup.
pub mod tracing_config;

/// Framed TCP and Unix socket endpoints.
pub mod transport;

/// Filesystem change detection for the synchronized file.
pub mod watcher;

/// Re-exported core types for convenience.
pub use core::{ConfsyncError, Result};
