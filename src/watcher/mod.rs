//! Local change detection.
//!
//! Every notification for the config file is answered with a fresh read and
//! a full broadcast. There is no debouncing: a single edit that fires several
//! notifications produces several identical broadcasts, which peers treat as
//! no-ops.

mod file_watcher;


pub use file_watcher::{FileEvent, FileEventKind, FileWatcher};

use tokio::sync::mpsc;
use tracing::{debug, instrument, trace, warn};

use crate::{ConfsyncError, Result, broadcast::Broadcaster, store::LocalStore};

/// Re-reads and re-broadcasts the config file whenever it changes on disk.
pub struct ChangeDetector {
    store: LocalStore,
    broadcaster: Broadcaster,
    watcher: FileWatcher,
    events: mpsc::UnboundedReceiver<FileEvent>,
}

impl ChangeDetector {
    /// Sets up the watch on the store's file.
    ///
    /// # Errors
    /// Returns `ConfsyncError::WatchSetup` if the file cannot be watched.
    #[instrument(skip_all, fields(path = %store.path().display()))]
    pub fn new(store: LocalStore, broadcaster: Broadcaster) -> Result<Self> {
        let (watcher, events) =
            FileWatcher::watch(store.path()).map_err(|e| ConfsyncError::WatchSetup {
                path: store.path().to_path_buf(),
                details: e.to_string(),
            })?;

        debug!("Watching config file");
        Ok(Self {
            store,
            broadcaster,
            watcher,
            events,
        })
    }

    /// Reacts to notifications until the watcher shuts down.
    ///
    /// Waiting on the event channel is the idle state; handling one event is
    /// the reacting state.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.react(&event);
        }

        warn!(path = %self.watcher.target().display(), "File watcher stopped");
    }

    fn react(&self, event: &FileEvent) {
        trace!(path = %event.path.display(), kind = ?event.kind, "Config file notification");

        if event.kind == FileEventKind::Removed {
            debug!("Config file removed, waiting for it to reappear");
            return;
        }

        match self.store.read() {
            Ok(snapshot) => {
                debug!(timestamp = snapshot.timestamp, "Local change detected");
                self.broadcaster.publish(&snapshot);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read config file after change");
            }
        }
    }
}
