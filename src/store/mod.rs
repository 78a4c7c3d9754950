//! Local copy of the synchronized config file.
//!
//! The store never caches: every read goes to disk so that edits made by
//! other processes are always observed.

mod snapshot;

#[cfg(test)]
mod tests;

pub use snapshot::{ConfigSnapshot, nanos_to_system_time, system_time_to_nanos};

use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use crate::{ConfsyncError, Result};

/// Reads and writes the config file kept in sync across the mesh.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    /// Opens the store for an existing config file.
    ///
    /// The path is canonicalized so that it matches the paths reported by
    /// the file watcher.
    ///
    /// # Errors
    /// Returns `ConfsyncError::ConfigIo` if the file does not exist or its
    /// path cannot be resolved.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let canonical = path
            .canonicalize()
            .map_err(|e| ConfsyncError::config_io(e, path))?;

        Ok(Self { path: canonical })
    }

    /// Canonical path of the config file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current snapshot from disk.
    ///
    /// # Errors
    /// Returns `ConfsyncError::ConfigIo` if the file cannot be opened, read or
    /// stat'd, or if its content is not UTF-8.
    pub fn read(&self) -> Result<ConfigSnapshot> {
        let mut file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        self.read_from(&mut file)
    }

    /// Reads the current snapshot, treating a missing file as absent.
    ///
    /// # Errors
    /// Returns `ConfsyncError::ConfigIo` for any failure other than the file
    /// not existing.
    pub fn read_existing(&self) -> Result<Option<ConfigSnapshot>> {
        match File::open(&self.path) {
            Ok(mut file) => self.read_from(&mut file).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Overwrites the file, letting the filesystem assign a new mtime.
    ///
    /// This is how a local edit looks to the mesh. The daemon never calls it:
    /// reconciliation goes through [`write_at`](Self::write_at) so an applied
    /// snapshot keeps the timestamp it arrived with.
    ///
    /// # Errors
    /// Returns `ConfsyncError::ConfigIo` if the write fails.
    #[instrument(skip(self, body), fields(path = %self.path.display(), len = body.len()))]
    pub fn write(&self, body: &str) -> Result<()> {
        fs::write(&self.path, body).map_err(|e| self.io_error(e))?;
        debug!("Wrote config file");
        Ok(())
    }

    /// Replaces the file with `body` and pins its mtime to `timestamp`.
    ///
    /// The new content is staged in a sibling file and renamed into place, so
    /// readers observe either the old snapshot or the complete new one, and
    /// the new one always reports `timestamp`.
    ///
    /// # Errors
    /// Returns `ConfsyncError::ConfigIo` if staging, stamping or renaming
    /// fails.
    #[instrument(skip(self, body), fields(path = %self.path.display(), len = body.len()))]
    pub fn write_at(&self, body: &str, timestamp: i64) -> Result<()> {
        let staging = self.staging_path();

        let result = self.stage(&staging, body, timestamp).and_then(|()| {
            fs::rename(&staging, &self.path).map_err(|e| self.io_error(e))
        });

        if result.is_err() {
            let _ = fs::remove_file(&staging);
        }
        result?;

        debug!(timestamp, "Replaced config file");
        Ok(())
    }

    fn stage(&self, staging: &Path, body: &str, timestamp: i64) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(staging)
            .map_err(|e| self.io_error(e))?;

        file.write_all(body.as_bytes())
            .map_err(|e| self.io_error(e))?;

        if let Ok(metadata) = fs::metadata(&self.path) {
            file.set_permissions(metadata.permissions())
                .map_err(|e| self.io_error(e))?;
        }

        file.set_modified(nanos_to_system_time(timestamp))
            .map_err(|e| self.io_error(e))?;
        file.sync_all().map_err(|e| self.io_error(e))?;

        Ok(())
    }

    fn read_from(&self, file: &mut File) -> Result<ConfigSnapshot> {
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| self.io_error(e))?;

        let modified = file
            .metadata()
            .and_then(|metadata| metadata.modified())
            .map_err(|e| self.io_error(e))?;

        let body = String::from_utf8(content).map_err(|e| self.io_error(e))?;

        Ok(ConfigSnapshot::new(system_time_to_nanos(modified), body))
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(self.path.file_name().unwrap_or_default());
        name.push(".confsync-tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, error: impl std::fmt::Display) -> ConfsyncError {
        ConfsyncError::config_io(error, &self.path)
    }
}
