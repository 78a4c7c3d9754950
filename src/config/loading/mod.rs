use std::{fs, path::Path};

use tracing::{debug, instrument};

use super::{ConfigPaths, Settings};
use crate::{ConfsyncError, Result};

impl Settings {
    /// Loads settings from an explicit file, or from the default location.
    ///
    /// An explicit path must exist. Without one, the XDG settings file is
    /// used when present and built-in defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ConfsyncError::Settings` if the file cannot be read or is not
    /// valid TOML for [`Settings`].
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> Result<Settings> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        match ConfigPaths::settings_file() {
            Some(path) if path.exists() => Self::load_file(&path),
            _ => {
                debug!("No settings file found, using defaults");
                Ok(Settings::default())
            }
        }
    }

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ConfsyncError::Settings` if the file cannot be read or parsed.
    pub fn load_file(path: &Path) -> Result<Settings> {
        let content = fs::read_to_string(path).map_err(|e| ConfsyncError::Settings {
            location: path.display().to_string(),
            details: e.to_string(),
        })?;

        let settings = Self::from_toml(&content).map_err(|e| match e {
            ConfsyncError::Settings { details, .. } => ConfsyncError::Settings {
                location: path.display().to_string(),
                details,
            },
            other => other,
        })?;

        debug!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    /// Parses settings from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `ConfsyncError::Settings` if the content is not valid TOML for
    /// [`Settings`].
    pub fn from_toml(content: &str) -> Result<Settings> {
        toml::from_str(content).map_err(|e| ConfsyncError::Settings {
            location: "string".to_string(),
            details: e.to_string(),
        })
    }
}
