// src/exec/transform.rs

//! Byte-in, byte-out transforms backed by external tools.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::errors::{AssetdagError, Result};
use crate::types::BoxFuture;

/// Environment variable holding the path of the file being transformed.
pub const SOURCE_ENV: &str = "ASSETDAG_SOURCE";

/// A deterministic transform from input bytes to output bytes.
///
/// `source` is the file the input came from; it is informational (tools can
/// use it to resolve relative imports) and must not be written to.
pub trait Transform: Send + Sync {
    fn name(&self) -> &str;

    fn apply<'a>(&'a self, input: Vec<u8>, source: &'a Path) -> BoxFuture<'a, Result<Vec<u8>>>;
}

/// Runs a shell command with the input on stdin and takes stdout as output.
///
/// Non-zero exit is a [`AssetdagError::Transform`] carrying stderr as the
/// diagnostic.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    name: String,
    cmd: String,
    cwd: PathBuf,
}

impl CommandTransform {
    pub fn new(cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        let cmd = cmd.into();
        let name = cmd
            .split_whitespace()
            .next()
            .unwrap_or("command")
            .to_string();
        Self {
            name,
            cmd,
            cwd: cwd.into(),
        }
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        }
    }

    fn failure(&self, source: &Path, diagnostic: impl Into<String>) -> AssetdagError {
        AssetdagError::Transform {
            tool: self.name.clone(),
            path: source.to_path_buf(),
            diagnostic: diagnostic.into(),
        }
    }

    async fn run(&self, input: Vec<u8>, source: &Path) -> Result<Vec<u8>> {
        debug!(tool = %self.name, cmd = %self.cmd, source = ?source, "running transform");

        let mut cmd = self.shell();
        cmd.current_dir(&self.cwd)
            .env(SOURCE_ENV, source)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| self.failure(source, format!("failed to spawn `{}`: {e}", self.cmd)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.failure(source, "child stdin was not captured"))?;

        // Feed stdin concurrently so a tool that streams output before
        // reading all input cannot deadlock on a full pipe.
        let feeder = tokio::spawn(async move {
            // A tool may exit without reading everything; that shows up in
            // its exit status, not here.
            let _ = stdin.write_all(&input).await;
            let _ = stdin.shutdown().await;
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.failure(source, format!("waiting for `{}`: {e}", self.cmd)))?;
        let _ = feeder.await;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let diagnostic = if stderr.is_empty() {
                format!("exited with status {}", output.status)
            } else {
                stderr
            };
            return Err(self.failure(source, diagnostic));
        }

        if !stderr.is_empty() {
            debug!(tool = %self.name, source = ?source, "stderr: {}", stderr);
        }
        trace!(tool = %self.name, bytes = output.stdout.len(), "transform produced output");
        Ok(output.stdout)
    }
}

impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, input: Vec<u8>, source: &'a Path) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(self.run(input, source))
    }
}

/// Passes bytes through unchanged.
#[derive(Debug, Clone, Default)]
pub struct Identity;

impl Transform for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn apply<'a>(&'a self, input: Vec<u8>, _source: &'a Path) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move { Ok(input) })
    }
}

/// Applies transforms left to right, stopping at the first failure.
#[derive(Clone)]
pub struct Pipeline {
    name: String,
    stages: Vec<Arc<dyn Transform>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Transform>>) -> Self {
        let name = stages
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(" | ");
        Self { name, stages }
    }
}

impl Transform for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, input: Vec<u8>, source: &'a Path) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let mut bytes = input;
            for stage in &self.stages {
                bytes = stage.apply(bytes, source).await?;
            }
            Ok(bytes)
        })
    }
}

/// Build the transform for a configured command; `""` means pass-through.
pub fn transform_for(cmd: &str, cwd: &Path) -> Arc<dyn Transform> {
    if cmd.trim().is_empty() {
        Arc::new(Identity)
    } else {
        Arc::new(CommandTransform::new(cmd, cwd))
    }
}
