//! ## annex-engine::readiness
//! **Controller-wide readiness barrier**
//!
//! Ready once every expected worker has reported its first sync. The flag
//! never goes back to false.

use std::collections::HashSet;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tracing::info;

#[derive(Debug)]
pub struct ReadinessGate {
    expected: usize,
    synced: Mutex<HashSet<usize>>,
    ready: RwLock<bool>,
    notify: Notify,
}

impl ReadinessGate {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            synced: Mutex::new(HashSet::new()),
            ready: RwLock::new(expected == 0),
            notify: Notify::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.read()
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn synced(&self) -> usize {
        self.synced.lock().len()
    }

    /// Records that `worker` finished its initial listing. Repeated reports are
    /// counted once. Returns true for the call that made the controller ready.
    pub fn mark_synced(&self, worker: usize) -> bool {
        let mut synced = self.synced.lock();
        synced.insert(worker);
        if synced.len() < self.expected {
            return false;
        }

        let mut ready = self.ready.write();
        if *ready {
            return false;
        }
        *ready = true;
        drop(ready);

        info!(watchers = self.expected, "Every watcher synced, controller is ready");
        self.notify.notify_waiters();
        true
    }

    /// Resolves once the controller is ready.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }
}
