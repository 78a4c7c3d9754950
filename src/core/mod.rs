use std::{
    fmt,
    path::{Path, PathBuf},
    result,
};

use thiserror::Error;

/// Error types for the confsync daemon.
///
/// Variants follow the daemon's failure taxonomy. Whether an error is fatal
/// is decided by the call site: bind failures and write failures abort the
/// process, malformed inbound messages are logged and dropped.
#[derive(Error, Debug)]
pub enum ConfsyncError {
    /// The synchronized config file could not be opened, read, stat'd or written
    #[error("config I/O error on '{path}': {details}")]
    ConfigIo {
        /// Path of the config file
        path: PathBuf,
        /// I/O error details
        details: String,
    },

    /// The file-change notification source could not be set up
    #[error("failed to watch '{path}': {details}")]
    WatchSetup {
        /// Path that was to be watched
        path: PathBuf,
        /// Watcher error details
        details: String,
    },

    /// An inbound wire message could not be parsed
    #[error("malformed {kind} message: {details}")]
    MalformedMessage {
        /// Which message was expected (snapshot, join request, join reply)
        kind: &'static str,
        /// Parse error details
        details: String,
    },

    /// A send, connect or bind on a transport endpoint failed
    #[error("transport error on '{endpoint}': {details}")]
    Transport {
        /// Endpoint involved in the failure
        endpoint: String,
        /// Transport error details
        details: String,
    },

    /// A long-running task ended or panicked
    #[error("{task} task failed: {details}")]
    TaskFailed {
        /// Name of the task
        task: &'static str,
        /// Why it ended
        details: String,
    },

    /// The daemon settings file could not be read or parsed
    #[error("failed to load settings from '{location}': {details}")]
    Settings {
        /// Location of the settings being loaded
        location: String,
        /// Error details
        details: String,
    },
}

/// A specialized `Result` type for confsync operations.
pub type Result<T> = result::Result<T, ConfsyncError>;

impl ConfsyncError {
    /// Creates a config I/O error for the given file.
    pub fn config_io(error: impl fmt::Display, path: &Path) -> Self {
        ConfsyncError::ConfigIo {
            path: path.to_path_buf(),
            details: error.to_string(),
        }
    }

    /// Creates a transport error for the given endpoint.
    pub fn transport(error: impl fmt::Display, endpoint: impl Into<String>) -> Self {
        ConfsyncError::Transport {
            endpoint: endpoint.into(),
            details: error.to_string(),
        }
    }

    /// Creates a malformed message error.
    pub fn malformed(kind: &'static str, error: impl fmt::Display) -> Self {
        ConfsyncError::MalformedMessage {
            kind,
            details: error.to_string(),
        }
    }

    /// Returns true for errors that only cost a single message.
    ///
    /// Receive loops use this to decide between dropping the offending
    /// message and ending the loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConfsyncError::MalformedMessage { .. })
    }
}

