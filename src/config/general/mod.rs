mod log_level;

pub use log_level::LogLevel;
use serde::{Deserialize, Serialize};

/// General settings that affect the daemon as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GeneralConfig {
    /// Logging level used when `RUST_LOG` is not set.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory for rotated log files. Logs go to stdout only when unset.
    #[serde(default)]
    pub log_dir: Option<std::path::PathBuf>,
}
