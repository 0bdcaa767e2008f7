// src/watch/event_handler.rs

//! Turns filesystem events into binding triggers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::BindingId;
use crate::fs::FileSystem;
use crate::watch::hash::ContentHashes;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchPattern;
use crate::watch::{FsEvent, FsEventKind};

/// Matching side of one watch binding.
#[derive(Debug, Clone)]
pub struct BindingFilter {
    pub pattern: WatchPattern,
    /// Skip modify events that leave the file's content unchanged.
    pub use_hash: bool,
}

/// Matches events against every binding's pattern.
#[derive(Debug)]
pub struct BindingMatcher {
    root: PathBuf,
    filters: Vec<BindingFilter>,
    fs: Arc<dyn FileSystem>,
    hashes: ContentHashes,
}

impl BindingMatcher {
    pub fn new(root: impl Into<PathBuf>, filters: Vec<BindingFilter>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            filters,
            fs,
            hashes: ContentHashes::new(),
        }
    }

    /// Bindings triggered by `event`, each at most once, in binding order.
    pub fn matching(&mut self, event: &FsEvent) -> Vec<BindingId> {
        let mut hit = vec![false; self.filters.len()];

        for path in &event.paths {
            let Some(rel) = relative_str(&self.root, path) else {
                warn!(?path, root = ?self.root, "could not relativize event path");
                continue;
            };

            let matched: Vec<BindingId> = self
                .filters
                .iter()
                .enumerate()
                .filter(|(_, f)| f.pattern.matches(&rel))
                .map(|(id, _)| id)
                .collect();
            if matched.is_empty() {
                continue;
            }

            // Hash once per path, only if some matching binding cares.
            let content_changed = if matched.iter().any(|&id| self.filters[id].use_hash) {
                self.content_changed(event.kind, &rel, path)
            } else {
                true
            };

            for id in matched {
                if self.filters[id].use_hash && !content_changed {
                    debug!(path = %rel, pattern = %self.filters[id].pattern.as_str(), "unchanged content; not triggering");
                    continue;
                }
                hit[id] = true;
            }
        }

        let ids: Vec<BindingId> = hit
            .iter()
            .enumerate()
            .filter_map(|(id, &h)| h.then_some(id))
            .collect();
        if !ids.is_empty() {
            debug!(kind = ?event.kind, paths = ?event.paths, bindings = ?ids, "event matched bindings");
        }
        ids
    }

    fn content_changed(&mut self, kind: FsEventKind, rel: &str, path: &Path) -> bool {
        let contents = match kind {
            FsEventKind::Remove => None,
            FsEventKind::Create | FsEventKind::Modify => self.fs.read(path).ok(),
        };
        let changed = self.hashes.observe(rel, contents.as_deref());
        // Only a modify can be a no-op; create/remove always count.
        changed || kind != FsEventKind::Modify
    }
}
