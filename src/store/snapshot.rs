use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::{ConfsyncError, Result};

/// One version of the synchronized config file.
///
/// The timestamp is the file's modification time in nanoseconds since the
/// Unix epoch. Snapshots are always derived from disk, never kept around as
/// the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Modification time in nanoseconds.
    #[serde(rename = "Time")]
    pub timestamp: i64,
    /// Full file content.
    #[serde(rename = "Body")]
    pub body: String,
}

impl ConfigSnapshot {
    /// Creates a snapshot from its parts.
    pub fn new(timestamp: i64, body: impl Into<String>) -> Self {
        Self {
            timestamp,
            body: body.into(),
        }
    }

    /// Serializes the snapshot into its network wire form.
    ///
    /// # Errors
    /// Returns `ConfsyncError::MalformedMessage` if serialization fails.
    pub fn to_wire(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ConfsyncError::malformed("snapshot", e))
    }

    /// Parses a snapshot from its network wire form.
    ///
    /// # Errors
    /// Returns `ConfsyncError::MalformedMessage` if the payload is not a
    /// snapshot.
    pub fn from_wire(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(|e| ConfsyncError::malformed("snapshot", e))
    }
}

/// Converts a filesystem time into signed nanoseconds since the Unix epoch.
///
/// Saturates at the `i64` range; times before the epoch are negative.
pub fn system_time_to_nanos(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_nanos())
            .map(|nanos| -nanos)
            .unwrap_or(i64::MIN),
    }
}

/// Converts signed nanoseconds since the Unix epoch into a filesystem time.
pub fn nanos_to_system_time(nanos: i64) -> SystemTime {
    let magnitude = std::time::Duration::from_nanos(nanos.unsigned_abs());
    if nanos >= 0 {
        UNIX_EPOCH + magnitude
    } else {
        UNIX_EPOCH - magnitude
    }
}
