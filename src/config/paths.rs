use std::{
    env,
    io::{Error, ErrorKind},
    path::PathBuf,
};

/// Utility struct for locating the daemon's own files
///
/// Follows the XDG Base Directory specification for the settings file.
pub struct ConfigPaths;

impl ConfigPaths {
    /// Returns the settings directory path for the daemon
    ///
    /// - First checks `XDG_CONFIG_HOME`
    /// - Falls back to `$HOME/.config`
    /// - Appends "confsync" to the base config directory
    ///
    /// # Errors
    /// Returns an error if neither `XDG_CONFIG_HOME` nor `HOME` environment variables are set
    pub fn config_dir() -> Result<PathBuf, Error> {
        let config_home = env::var("XDG_CONFIG_HOME")
            .or_else(|_| env::var("HOME").map(|home| format!("{home}/.config")))
            .map_err(|_| {
                Error::new(
                    ErrorKind::NotFound,
                    "Neither XDG_CONFIG_HOME nor HOME environment variable found",
                )
            })?;

        Ok(PathBuf::from(config_home).join("confsync"))
    }

    /// Returns the path of the default settings file, if it can be located
    pub fn settings_file() -> Option<PathBuf> {
        Self::config_dir()
            .ok()
            .map(|dir| dir.join("confsyncd.toml"))
    }
}
