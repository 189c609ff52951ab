//! ## annex-engine::worker
//! **Event loop of one subscription**
//!
//! A worker buffers its initial listing, reports its first sync to the
//! readiness gate and waits for every other worker before applying the
//! listing. Later relists are reconciled against what the worker stored:
//! objects missing from the new listing are cleared.

use std::collections::BTreeMap;
use std::sync::Arc;

use annex_core::ResourceSample;
use annex_telemetry::MetricsRecorder;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::WatchError;
use crate::handler::{EventHandler, EventKind};
use crate::readiness::ReadinessGate;
use crate::source::{WatchEvent, WatchStream};
use crate::subscription::Subscription;

/// Lifecycle of a worker. Relists after `Watching` do not change the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkerPhase {
    Init,
    Listing,
    Synced,
    Watching,
    Failed,
}

type ObjectKey = (String, String);

fn object_key(sample: &ResourceSample) -> ObjectKey {
    (sample.meta.namespace.clone(), sample.meta.name.clone())
}

pub(crate) struct Worker {
    id: usize,
    resource: String,
    mappings: Vec<String>,
    handler: Arc<EventHandler>,
    readiness: Arc<ReadinessGate>,
    metrics: Arc<MetricsRecorder>,
    phase: WorkerPhase,
    /// Last sample applied per object.
    known: BTreeMap<ObjectKey, ResourceSample>,
    /// Listing in progress, if any.
    listing: Option<BTreeMap<ObjectKey, ResourceSample>>,
}

impl Worker {
    pub(crate) fn new(
        id: usize,
        subscription: &Subscription,
        handler: Arc<EventHandler>,
        readiness: Arc<ReadinessGate>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            id,
            resource: subscription.resource_label(),
            mappings: subscription.mappings.clone(),
            handler,
            readiness,
            metrics,
            phase: WorkerPhase::Init,
            known: BTreeMap::new(),
            listing: None,
        }
    }

    /// Consumes `stream` until `token` is cancelled or the stream fails.
    ///
    /// A stream error, a stream end or a routing error is returned and leaves
    /// the worker `Failed`.
    pub(crate) async fn run(
        mut self,
        mut stream: WatchStream,
        token: CancellationToken,
    ) -> Result<(), WatchError> {
        self.set_phase(WorkerPhase::Listing);

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!("Watch cancelled");
                    return Ok(());
                }
                next = stream.next() => next,
            };

            let result = match next {
                Some(Ok(event)) => self.apply(event, &token).await,
                Some(Err(err)) => Err(err),
                None => Err(WatchError::StreamEnded(self.resource.clone())),
            };

            if let Err(err) = result {
                self.set_phase(WorkerPhase::Failed);
                error!(error = %err, "Watch worker failed");
                return Err(err);
            }
        }
    }

    async fn apply(&mut self, event: WatchEvent, token: &CancellationToken) -> Result<(), WatchError> {
        match event {
            WatchEvent::Restarted => {
                debug!("Listing started");
                self.listing = Some(BTreeMap::new());
            }
            WatchEvent::Listed(sample) => {
                self.listing
                    .get_or_insert_with(BTreeMap::new)
                    .insert(object_key(&sample), sample);
            }
            WatchEvent::Synced => {
                let listing = self.listing.take().unwrap_or_default();
                if self.phase < WorkerPhase::Synced {
                    self.first_sync(listing.len(), token).await;
                    if token.is_cancelled() {
                        return Ok(());
                    }
                }
                self.reconcile(listing)?;
            }
            WatchEvent::Added(sample) => self.update(EventKind::Added, sample)?,
            WatchEvent::Modified(sample) => self.update(EventKind::Modified, sample)?,
            WatchEvent::Deleted(sample) => {
                let key = object_key(&sample);
                let stored = self.known.remove(&key).unwrap_or(sample);
                self.handle(EventKind::Deleted, None, &stored)?;
            }
        }
        Ok(())
    }

    async fn first_sync(&mut self, objects: usize, token: &CancellationToken) {
        self.set_phase(WorkerPhase::Synced);
        info!(objects, "Initial listing complete");

        self.readiness.mark_synced(self.id);
        self.metrics
            .watchers_synced
            .set(self.readiness.synced() as i64);

        tokio::select! {
            biased;
            _ = token.cancelled() => return,
            _ = self.readiness.wait() => {}
        }
        self.set_phase(WorkerPhase::Watching);
    }

    fn update(&mut self, kind: EventKind, sample: ResourceSample) -> Result<(), WatchError> {
        let key = object_key(&sample);
        let previous = self.known.get(&key);
        if self.handle(kind, previous, &sample)? {
            self.known.insert(key, sample);
        }
        Ok(())
    }

    /// Applies a complete listing, clearing objects it no longer contains.
    fn reconcile(&mut self, listing: BTreeMap<ObjectKey, ResourceSample>) -> Result<(), WatchError> {
        let stale: Vec<ObjectKey> = self
            .known
            .keys()
            .filter(|key| !listing.contains_key(*key))
            .cloned()
            .collect();
        if !stale.is_empty() {
            info!(stale = stale.len(), "Clearing objects missing from relist");
        }
        for key in stale {
            if let Some(stored) = self.known.remove(&key) {
                self.handle(EventKind::Deleted, None, &stored)?;
            }
        }

        for (key, sample) in listing {
            let previous = self.known.get(&key);
            if self.handle(EventKind::Listed, previous, &sample)? {
                self.known.insert(key, sample);
            }
        }
        Ok(())
    }

    fn handle(
        &self,
        kind: EventKind,
        previous: Option<&ResourceSample>,
        sample: &ResourceSample,
    ) -> Result<bool, WatchError> {
        self.handler
            .handle(&self.resource, &self.mappings, kind, previous, sample)
    }

    fn set_phase(&mut self, phase: WorkerPhase) {
        debug!(from = ?self.phase, to = ?phase, "Worker phase");
        self.phase = phase;
    }
}
