// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::watch::patterns::WatchScope;
use crate::watch::{FsEvent, FsEventKind};

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping this handle
/// stops file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    root: PathBuf,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatcherHandle {
    /// Canonical root being observed; event paths are absolute below it.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Map a notify event kind onto the kinds the reactor cares about.
///
/// Access events and metadata-only changes are dropped.
pub fn classify(kind: &EventKind) -> Option<FsEventKind> {
    match kind {
        EventKind::Create(_) => Some(FsEventKind::Create),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(FsEventKind::Modify),
        EventKind::Remove(_) => Some(FsEventKind::Remove),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}

/// Observe `scopes` below `root` and forward relevant events to `tx`.
///
/// A scope whose directory does not exist yet is skipped with a warning.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    scopes: &[WatchScope],
    tx: mpsc::UnboundedSender<FsEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);

    // Called synchronously on notify's own thread.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let Some(kind) = classify(&event.kind) else {
                    return;
                };
                if event.paths.is_empty() {
                    return;
                }
                if tx
                    .send(FsEvent {
                        kind,
                        paths: event.paths,
                    })
                    .is_err()
                {
                    debug!("watch event receiver dropped");
                }
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    for scope in scopes {
        let dir = root.join(&scope.dir);
        if !dir.is_dir() {
            warn!(dir = ?dir, "watch directory missing; changes below it are not seen");
            continue;
        }
        let mode = if scope.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&dir, mode)?;
        debug!(dir = ?dir, recursive = scope.recursive, "watching");
    }
    info!(root = ?root, scopes = scopes.len(), "file watcher started");

    Ok(WatcherHandle {
        _inner: watcher,
        root,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind};

    #[test]
    fn only_content_changes_are_forwarded() {
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            Some(FsEventKind::Create)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(FsEventKind::Modify)
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File)),
            Some(FsEventKind::Remove)
        );
        assert_eq!(classify(&EventKind::Access(AccessKind::Read)), None);
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime))),
            None
        );
    }
}
