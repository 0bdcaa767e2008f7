// src/lib.rs

pub mod assets;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::cli::{CliArgs, Command};
use crate::config::loader::{default_config_path, load_or_default};
use crate::config::model::ConfigFile;
use crate::dag::builtin::{is_builtin, DEFAULT_TASK};
use crate::dag::registry::TaskEntry;
use crate::fs::RealFileSystem;
use crate::session::Session;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the session registry (asset tasks, watch reactor, dev server, groups)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let cfg = load_or_default(&config_path)?;
    let root = config_root_dir(&config_path);

    let (trigger, shutdown) = shutdown::channel();
    let session = Session::new(&cfg, &root, Arc::new(RealFileSystem), shutdown)?;

    match args.command.unwrap_or(Command::Run { task: None }) {
        Command::List => {
            print!("{}", render_task_list(&session));
            Ok(())
        }
        Command::Run { task } => {
            let task = task.as_deref().unwrap_or(DEFAULT_TASK);
            session.run_until(task, trigger, shutdown::ctrl_c()).await?;
            Ok(())
        }
    }
}

/// Figure out the project root.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetdag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetdag.toml" (parent = ""),
///   we fall back to the current working directory "."
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Dry-run output: tasks, groups and watch bindings.
pub fn render_task_list(session: &Session) -> String {
    let cfg: &ConfigFile = session.config();
    let registry = session.registry();
    let mut out = String::new();

    out.push_str("assetdag tasks\n");
    out.push_str(&format!(
        "  config.triggered_while_running_behaviour = {:?}\n",
        cfg.config().triggered_while_running_behaviour
    ));
    out.push_str(&format!("  config.queue_length = {}\n", cfg.config().queue_length));
    out.push_str(&format!(
        "  server = {}:{} (root {})\n\n",
        cfg.server().host,
        cfg.server().port,
        cfg.server().root
    ));

    out.push_str("tasks:\n");
    for name in registry.names().filter(|n| is_builtin(n)) {
        out.push_str(&format!("  - {name}\n"));
    }

    out.push_str("groups:\n");
    for name in registry.names() {
        if let Some(TaskEntry::Group(node)) = registry.entry(name) {
            let marker = if name == DEFAULT_TASK { " (default)" } else { "" };
            out.push_str(&format!("  - {name}{marker}: {node}\n"));
        }
    }

    out.push_str("watch:\n");
    for binding in cfg.watch() {
        let reaction = match (&binding.run, &binding.action) {
            (Some(task), _) => format!("run {task}"),
            (None, Some(action)) => format!("{action:?}").to_lowercase(),
            (None, None) => "nothing".to_string(),
        };
        let hashed = if binding.use_hash { " [hash]" } else { "" };
        out.push_str(&format!("  - {} -> {reaction}{hashed}\n", binding.pattern));
    }

    debug!("task list rendered (no execution)");
    out
}
