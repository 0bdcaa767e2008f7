use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Boxed, sendable future used at the trait seams (`Work`, `Transform`).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Behaviour when a watch event arrives while the bound reaction is still
/// running.
///
/// - `Queue`: remember the trigger and run the reaction again once the
///   current invocation settles, once per queued event (default).
/// - `Cancel`: drop any previously queued trigger and only keep the latest.
///   The running invocation itself is never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

/// What a live-reload client should do after a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadNotice {
    /// Full page reload.
    Reload,
    /// Re-fetch stylesheets only; paths are relative to the server root.
    Css(Vec<String>),
}

impl ReloadNotice {
    /// SSE event name for this notice.
    pub fn event_name(&self) -> &'static str {
        match self {
            ReloadNotice::Reload => "reload",
            ReloadNotice::Css(_) => "css",
        }
    }
}
