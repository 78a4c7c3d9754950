use serde::{Deserialize, Serialize};
use std::fmt;

/// Logging level for the daemon.
///
/// Controls the verbosity of log output, from critical errors only
/// to detailed trace information.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only fatal conditions.
    Error,

    /// Dropped messages, lost links and other recoverable trouble.
    Warn,

    /// Startup, joins and reconciliation outcomes (default level).
    #[default]
    Info,

    /// Every broadcast and every inbound frame.
    Debug,

    /// Everything, including per-connection plumbing.
    Trace,
}

impl LogLevel {
    /// Raises the level by `steps`, saturating at [`LogLevel::Trace`].
    ///
    /// Used for repeated `-v` flags.
    pub fn raised(self, steps: u8) -> Self {
        let order = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let current = order.iter().position(|level| *level == self).unwrap_or(2);
        let target = (current + usize::from(steps)).min(order.len() - 1);
        order[target]
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}
