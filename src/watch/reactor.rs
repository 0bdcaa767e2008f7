// src/watch/reactor.rs

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::model::{ConfigFile, WatchAction};
use crate::dag::node::{work_fn, TaskNode};
use crate::dag::registry::TaskRegistry;
use crate::engine::runtime::BoundReaction;
use crate::engine::{BindingId, Reaction, ReactorCore, ReactorEvent, ReactorRuntime};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::server::livereload::LiveReload;
use crate::shutdown::Shutdown;
use crate::types::TriggerWhileRunningBehaviour;
use crate::watch::event_handler::{BindingFilter, BindingMatcher};
use crate::watch::patterns::{watch_scopes, WatchPattern};
use crate::watch::watcher::spawn_watcher;
use crate::watch::FsEvent;

/// Glob bindings plus the loop that reacts to them.
///
/// Build it with [`watch`](Self::watch) calls, then [`run`](Self::run) it
/// until shutdown. Reactions of one binding never overlap; different
/// bindings react independently.
pub struct WatchReactor {
    registry: Arc<TaskRegistry>,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    behaviour: TriggerWhileRunningBehaviour,
    queue_length: usize,
    filters: Vec<BindingFilter>,
    reactions: Vec<BoundReaction>,
}

impl std::fmt::Debug for WatchReactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchReactor")
            .field("root", &self.root)
            .field("behaviour", &self.behaviour)
            .field("queue_length", &self.queue_length)
            .field("reactions", &self.reactions)
            .finish_non_exhaustive()
    }
}

impl WatchReactor {
    pub fn new(registry: Arc<TaskRegistry>, root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            root: root.into(),
            fs: Arc::new(RealFileSystem),
            behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: 16,
            filters: Vec::new(),
            reactions: Vec::new(),
        }
    }

    /// Bindings from `[[watch]]`, policy from `[config]`.
    pub fn from_config(
        cfg: &ConfigFile,
        registry: Arc<TaskRegistry>,
        root: impl Into<PathBuf>,
        reload: LiveReload,
    ) -> Result<Self> {
        let section = cfg.config();
        let mut reactor = Self::new(registry, root)
            .with_policy(section.triggered_while_running_behaviour, section.queue_length);

        for binding in cfg.watch() {
            let reaction = match (&binding.run, &binding.action) {
                (Some(task), _) => Reaction::Task(TaskNode::leaf(task.clone())),
                (None, Some(WatchAction::Reload)) | (None, None) => {
                    let reload = reload.clone();
                    Reaction::Callback(work_fn(move || {
                        reload.reload();
                        async { Ok(()) }
                    }))
                }
            };
            if binding.use_hash {
                reactor.watch_hashed(&binding.pattern, reaction)?;
            } else {
                reactor.watch(&binding.pattern, reaction)?;
            }
        }
        Ok(reactor)
    }

    pub fn with_policy(mut self, behaviour: TriggerWhileRunningBehaviour, queue_length: usize) -> Self {
        self.behaviour = behaviour;
        self.queue_length = queue_length;
        self
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Bind `pattern` (relative to the root) to `reaction`.
    pub fn watch(&mut self, pattern: &str, reaction: Reaction) -> Result<BindingId> {
        self.bind(pattern, reaction, false)
    }

    /// Like [`watch`](Self::watch), but modify events that leave a file's
    /// content unchanged are ignored.
    pub fn watch_hashed(&mut self, pattern: &str, reaction: Reaction) -> Result<BindingId> {
        self.bind(pattern, reaction, true)
    }

    fn bind(&mut self, pattern: &str, reaction: Reaction, use_hash: bool) -> Result<BindingId> {
        let compiled = WatchPattern::new(pattern)?;
        let id = self.filters.len();
        debug!(binding = id, %pattern, %reaction, use_hash, "added watch binding");
        self.filters.push(BindingFilter {
            pattern: compiled,
            use_hash,
        });
        self.reactions.push(BoundReaction {
            label: pattern.to_string(),
            reaction,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Observe the real filesystem until `shutdown` fires.
    pub async fn run(mut self, shutdown: Shutdown) -> Result<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        let scopes = watch_scopes(self.filters.iter().map(|f| f.pattern.as_str()));
        let handle = spawn_watcher(&self.root, &scopes, tx)?;
        self.root = handle.root().to_path_buf();

        let result = self.run_with_events(rx, shutdown).await;
        drop(handle);
        result
    }

    /// Same as [`run`](Self::run), fed from an arbitrary event source.
    ///
    /// Stops when `shutdown` fires or `events` closes, after in-flight
    /// reactions settle.
    pub async fn run_with_events(
        self,
        mut events: mpsc::UnboundedReceiver<FsEvent>,
        mut shutdown: Shutdown,
    ) -> Result<()> {
        let (event_tx, event_rx) = mpsc::channel(256);
        let core = ReactorCore::new(self.filters.len(), self.behaviour, self.queue_length);
        let runtime = ReactorRuntime::new(
            core,
            self.reactions,
            self.registry,
            event_tx.clone(),
            event_rx,
        );
        let runtime = tokio::spawn(runtime.run());

        let mut matcher = BindingMatcher::new(self.root, self.filters, self.fs);
        info!("watching for changes");

        'observe: loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("watch event source closed");
                        break;
                    };
                    for binding in matcher.matching(&event) {
                        if event_tx.send(ReactorEvent::BindingTriggered { binding }).await.is_err() {
                            break 'observe;
                        }
                    }
                }
            }
        }

        // The loop may already be gone if it failed; that surfaces below.
        let _ = event_tx.send(ReactorEvent::ShutdownRequested).await;
        runtime
            .await
            .map_err(|e| anyhow::anyhow!("watch reactor task failed: {e}"))?
    }
}
