//! Readiness gates for application lifecycle milestones
//!
//! A [`ReadinessGate`] is owned by the application and opened exactly once.
//! Plugins and command handlers hold [`ReadySignal`]s and may wait on them,
//! e.g. to defer opening a document until the application has started.

use std::sync::Arc;

use tokio::sync::watch;

/// Write side of a one-shot readiness flag
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadinessGate {
    /// Create a closed gate
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Open the gate, waking every waiter. Opening twice is a no-op.
    pub fn open(&self) {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        });
    }

    /// Whether the gate has been opened
    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// Read-only handle for waiters
    pub fn signal(&self) -> ReadySignal {
        ReadySignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a [`ReadinessGate`]
#[derive(Debug, Clone)]
pub struct ReadySignal {
    rx: watch::Receiver<bool>,
}

impl ReadySignal {
    /// Whether the milestone has been reached
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the milestone is reached.
    ///
    /// Returns `false` if the gate was dropped without ever being opened.
    pub async fn wait(&self) -> bool {
        let mut rx = self.rx.clone();
        rx.wait_for(|ready| *ready).await.is_ok()
    }
}
