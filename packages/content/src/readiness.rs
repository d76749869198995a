//! One-shot readiness latches.
//!
//! A waiter that subscribes after the latch was set returns immediately, so
//! producers and consumers may start in any order.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct ReadySignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the latch is set
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Race the latch against `timeout`; `true` if the latch won
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Signals shared by everything that enhances one page load
#[derive(Debug, Clone, Default)]
pub struct PageSignals {
    /// Document parsed and available for mutation
    pub dom_ready: ReadySignal,
    /// Dynamic section loader finished its initial population
    pub sections_loaded: ReadySignal,
}

impl PageSignals {
    pub fn new() -> Self {
        Self::default()
    }
}
