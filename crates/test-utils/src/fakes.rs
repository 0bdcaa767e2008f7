#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetdag::dag::{work_fn, Work};
use assetdag::errors::{AssetdagError, Result};
use assetdag::exec::Transform;
use assetdag::types::BoxFuture;

type TransformFn = dyn Fn(&[u8]) -> std::result::Result<Vec<u8>, String> + Send + Sync;

/// In-process stand-in for an external tool.
///
/// - applies a closure to the input bytes
/// - records which source paths it was applied to
/// - reports closure errors as `AssetdagError::Transform`, like a tool
///   exiting non-zero
pub struct FakeTransform {
    name: String,
    f: Box<TransformFn>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeTransform {
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&[u8]) -> std::result::Result<Vec<u8>, String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            f: Box::new(f),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Wraps the input as `name(<input>)`; inputs containing `BROKEN` fail
    /// with a compiler-style diagnostic.
    pub fn wrapping(name: &str) -> Self {
        let tag = name.to_string();
        Self::new(name, move |input| {
            let text = String::from_utf8_lossy(input);
            if text.contains("BROKEN") {
                return Err(format!("Error: unexpected token in {tag} input"));
            }
            Ok(format!("{tag}({text})").into_bytes())
        })
    }

    /// Drops the last `n` bytes (an optimizer that always saves `n` bytes).
    pub fn shrinking(name: &str, n: usize) -> Self {
        Self::new(name, move |input| {
            Ok(input[..input.len().saturating_sub(n)].to_vec())
        })
    }

    /// Appends `n` bytes (an optimizer that makes things worse).
    pub fn growing(name: &str, n: usize) -> Self {
        Self::new(name, move |input| {
            let mut out = input.to_vec();
            out.extend(std::iter::repeat_n(b'!', n));
            Ok(out)
        })
    }

    /// Handle on the recorded source paths; stays valid after the transform
    /// is moved into an `Arc<dyn Transform>`.
    pub fn calls(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        Arc::clone(&self.calls)
    }

    pub fn shared(self) -> Arc<dyn Transform> {
        Arc::new(self)
    }
}

impl Transform for FakeTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply<'a>(&'a self, input: Vec<u8>, source: &'a Path) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(source.to_path_buf());
            (self.f)(&input).map_err(|diagnostic| AssetdagError::Transform {
                tool: self.name.clone(),
                path: source.to_path_buf(),
                diagnostic,
            })
        })
    }
}

/// Shared, ordered log of `start:<name>` / `end:<name>` entries.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|e| e == entry)
    }
}

/// Work that logs `start:<name>`, sleeps for `delay`, then logs `end:<name>`.
pub fn recording_work(log: &EventLog, name: &str, delay: Duration) -> Arc<dyn Work> {
    let log = log.clone();
    let name = name.to_string();
    work_fn(move || {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.push(format!("start:{name}"));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            log.push(format!("end:{name}"));
            Ok(())
        }
    })
}

/// Work that logs `start:<name>` and then fails.
pub fn failing_work(log: &EventLog, name: &str) -> Arc<dyn Work> {
    let log = log.clone();
    let name = name.to_string();
    work_fn(move || {
        let log = log.clone();
        let name = name.clone();
        async move {
            log.push(format!("start:{name}"));
            Err(AssetdagError::TaskFailed {
                task: name,
                reason: "boom".to_string(),
            })
        }
    })
}
