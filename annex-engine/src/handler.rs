//! ## annex-engine::handler
//! **Readiness gating and routing into the vault**
//!
//! Every event is applied to each mapping its subscription feeds. Until the
//! controller is ready, events are dropped and counted. An unknown mapping
//! is a wiring fault and fails the worker.

use std::sync::Arc;

use annex_core::{MetricsVault, ResourceSample};
use annex_telemetry::MetricsRecorder;
use tracing::debug;

use crate::error::WatchError;
use crate::readiness::ReadinessGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Part of an initial listing or relist.
    Listed,
    Added,
    Modified,
    Deleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Listed => "listed",
            EventKind::Added => "added",
            EventKind::Modified => "modified",
            EventKind::Deleted => "deleted",
        }
    }
}

pub struct EventHandler {
    vault: Arc<MetricsVault>,
    readiness: Arc<ReadinessGate>,
    metrics: Arc<MetricsRecorder>,
}

impl EventHandler {
    pub fn new(
        vault: Arc<MetricsVault>,
        readiness: Arc<ReadinessGate>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            vault,
            readiness,
            metrics,
        }
    }

    /// Applies one event to every mapping in `mappings`.
    ///
    /// `previous` is the last sample stored for the same object, if any. For
    /// `Deleted`, `sample` must be the state the object was stored with.
    /// Returns false when the event was dropped by the readiness gate.
    pub fn handle(
        &self,
        resource: &str,
        mappings: &[String],
        kind: EventKind,
        previous: Option<&ResourceSample>,
        sample: &ResourceSample,
    ) -> Result<bool, WatchError> {
        if !self.readiness.is_ready() {
            debug!(
                resource,
                event = kind.as_str(),
                namespace = %sample.meta.namespace,
                name = %sample.meta.name,
                "Controller not ready, dropping event"
            );
            self.metrics.inc_dropped_event(resource);
            return Ok(false);
        }

        for mapping in mappings {
            let outcome = match kind {
                EventKind::Deleted => {
                    if self.vault.clear(mapping, sample)? {
                        "cleared"
                    } else {
                        "absent"
                    }
                }
                _ => self
                    .vault
                    .store_update(mapping, previous, sample)?
                    .as_str(),
            };
            self.metrics.inc_store_outcome(mapping, outcome);
        }

        self.metrics.inc_watch_event(resource, kind.as_str());
        Ok(true)
    }
}
