use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc;
use tracing::warn;

/// A file system event for the watched file.
#[derive(Debug, Clone)]
pub struct FileEvent {
    /// The path of the file that changed
    pub path: PathBuf,
    /// The type of change that occurred
    pub kind: FileEventKind,
}

/// The type of file system change that occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum FileEventKind {
    /// File content or metadata changed, or the file was renamed into place
    Modified,
    /// File was created
    Created,
    /// File was removed
    Removed,
}

/// Watches a single file through its parent directory.
///
/// Watching the directory rather than the file keeps notifications flowing
/// when editors replace the file by renaming a new one over it. Events for
/// other entries in the directory are filtered out before they reach the
/// receiver.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    target: PathBuf,
}

impl FileWatcher {
    /// Starts watching `target` and returns the watcher and its event receiver.
    ///
    /// `target` should be canonical so that it compares equal to the paths
    /// reported by the platform backend. The receiver is unbounded since
    /// file events are infrequent but bursty.
    ///
    /// # Errors
    /// Returns error if the path has no parent directory or the platform
    /// watcher cannot be initialized or attached to it.
    pub fn watch(target: &Path) -> Result<(Self, mpsc::UnboundedReceiver<FileEvent>), notify::Error> {
        let directory = target
            .parent()
            .ok_or_else(|| notify::Error::path_not_found().add_path(target.to_path_buf()))?
            .to_path_buf();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let filter = target.to_path_buf();

        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(error = %e, "File watcher backend error");
                    return;
                }
            };

            let kind = match event.kind {
                EventKind::Create(_) => FileEventKind::Created,
                EventKind::Modify(_) => FileEventKind::Modified,
                EventKind::Remove(_) => FileEventKind::Removed,
                _ => return,
            };

            for path in event.paths {
                if path != filter {
                    continue;
                }

                let _ = event_tx.send(FileEvent {
                    path,
                    kind: kind.clone(),
                });
            }
        })?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        Ok((
            Self {
                _watcher: watcher,
                target: target.to_path_buf(),
            },
            event_rx,
        ))
    }

    /// The file being watched.
    pub fn target(&self) -> &Path {
        &self.target
    }
}
