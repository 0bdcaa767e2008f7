// src/shutdown.rs

//! Session-wide shutdown signal.
//!
//! Long-lived tasks (`watchFiles`, `devServer`) hold a [`Shutdown`] and stop
//! once it fires. Nothing is interrupted mid-flight: the reactor finishes
//! in-progress reactions and the server stops accepting connections.
//! One-shot runs do not listen to it; see `Session::run_until`.

use tokio::sync::watch;
use tracing::{info, warn};

/// Firing side; owned by `main` (Ctrl-C) or by tests.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Listening side. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger/listener pair.
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        info!("shutdown requested");
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is triggered or the trigger is dropped.
    pub async fn wait(&mut self) {
        // `wait_for` errors only when the sender is gone; treat that as a
        // shutdown as well.
        let _ = self.rx.wait_for(|fired| *fired).await;
    }
}

/// Resolve on Ctrl-C. Never resolves if the signal handler cannot be
/// installed.
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
