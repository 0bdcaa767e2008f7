// src/session.rs

//! One build session: the registry with every built-in task and group, plus
//! the shared pieces the long-lived tasks need.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::assets::{register_asset_tasks, AssetContext};
use crate::config::model::ConfigFile;
use crate::dag::builtin::{DEV_SERVER, WATCH_FILES};
use crate::dag::graph::register_groups;
use crate::dag::node::{work_fn, TaskNode};
use crate::dag::registry::{RegistryRef, TaskRegistry};
use crate::dag::scheduler::run_once;
use crate::errors::{AssetdagError, Result};
use crate::fs::FileSystem;
use crate::server::{DevServer, LiveReload};
use crate::shutdown::{Shutdown, ShutdownTrigger};
use crate::watch::WatchReactor;

type ServerSlot = Arc<Mutex<Option<DevServer>>>;

#[derive(Debug)]
pub struct Session {
    registry: Arc<TaskRegistry>,
    cfg: ConfigFile,
    root: PathBuf,
    reload: LiveReload,
    server: ServerSlot,
}

impl Session {
    /// Register the asset tasks, `watchFiles`, `devServer` and all groups.
    pub fn new(
        cfg: &ConfigFile,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let root = root.into();
        let reload = LiveReload::new();
        let server: ServerSlot = Arc::new(Mutex::new(None));
        let handle = RegistryRef::new();

        let ctx = AssetContext::new(&root, fs.clone())
            .with_reload(reload.clone(), cfg.server().root.clone());

        let mut registry = TaskRegistry::new();
        register_asset_tasks(&mut registry, cfg, &ctx)?;

        {
            let cfg = cfg.clone();
            let root = root.clone();
            let reload = reload.clone();
            let shutdown = shutdown.clone();
            let handle = handle.clone();
            registry.define_task(
                WATCH_FILES,
                work_fn(move || {
                    let cfg = cfg.clone();
                    let root = root.clone();
                    let reload = reload.clone();
                    let shutdown = shutdown.clone();
                    let handle = handle.clone();
                    let fs = fs.clone();
                    async move {
                        let registry = handle.get()?;
                        WatchReactor::from_config(&cfg, registry, root, reload)?
                            .with_fs(fs)
                            .run(shutdown)
                            .await
                    }
                }),
            )?;
        }

        {
            let section = cfg.server().clone();
            let serve_root = root.join(&section.root);
            let reload = reload.clone();
            let server = Arc::clone(&server);
            registry.define_task(
                DEV_SERVER,
                work_fn(move || {
                    let section = section.clone();
                    let serve_root = serve_root.clone();
                    let reload = reload.clone();
                    let server = Arc::clone(&server);
                    let shutdown = shutdown.clone();
                    async move {
                        let bound = server.lock().await.take();
                        let bound = match bound {
                            Some(bound) => bound,
                            None => DevServer::bind(&section, serve_root, reload).await?,
                        };
                        bound.serve(shutdown).await
                    }
                }),
            )?;
        }

        register_groups(cfg, &mut registry)?;

        let registry = Arc::new(registry);
        handle.bind(&registry);

        Ok(Self {
            registry,
            cfg: cfg.clone(),
            root,
            reload,
            server,
        })
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ConfigFile {
        &self.cfg
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reload(&self) -> &LiveReload {
        &self.reload
    }

    /// Resolve `task` and, if it will start the dev server, bind the port up
    /// front so a taken port fails the session before anything runs.
    pub async fn prepare(&self, task: &str) -> Result<TaskNode> {
        let node = self.registry.resolve(task)?;
        if self.registry.reaches(&node, DEV_SERVER) {
            let mut slot = self.server.lock().await;
            if slot.is_none() {
                let serve_root = self.root.join(&self.cfg.server().root);
                *slot = Some(DevServer::bind(self.cfg.server(), serve_root, self.reload.clone()).await?);
            }
        }
        debug!(task, node = %node, "prepared task");
        Ok(node)
    }

    /// Run `task` to completion.
    pub async fn run(&self, task: &str) -> Result<()> {
        let node = self.prepare(task).await?;
        info!(task, root = ?self.root, "running");
        run_once(Arc::clone(&self.registry), node).await
    }

    /// Run `task` until it finishes or `interrupt` resolves.
    ///
    /// A task that starts `watchFiles` or `devServer` is stopped through
    /// `trigger` and winds down normally. Anything else is dropped on the
    /// spot, which kills running tools, and fails with
    /// [`AssetdagError::Interrupted`].
    pub async fn run_until<F>(&self, task: &str, trigger: ShutdownTrigger, interrupt: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let node = self.prepare(task).await?;
        let long_lived = self.registry.reaches(&node, WATCH_FILES)
            || self.registry.reaches(&node, DEV_SERVER);
        info!(task, root = ?self.root, long_lived, "running");

        let run = run_once(Arc::clone(&self.registry), node);
        tokio::pin!(run, interrupt);

        tokio::select! {
            res = &mut run => return res,
            _ = &mut interrupt => {}
        }

        if long_lived {
            trigger.trigger();
            return run.await;
        }
        warn!(task, "interrupted; stopping running tools");
        Err(AssetdagError::Interrupted(task.to_string()))
    }
}
