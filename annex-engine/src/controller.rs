//! ## annex-engine::controller
//! **Watch supervision**
//!
//! Runs one worker task per subscription. The first worker failure cancels
//! every other worker and is returned; the exporter never keeps serving a
//! partial view.

use std::sync::Arc;

use annex_core::MetricsVault;
use annex_telemetry::{EventLogger, MetricsRecorder};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, Instrument};

use crate::error::WatchError;
use crate::handler::EventHandler;
use crate::readiness::ReadinessGate;
use crate::source::WatchSource;
use crate::subscription::Subscription;
use crate::worker::Worker;

pub struct WatchController<S> {
    source: Arc<S>,
    handler: Arc<EventHandler>,
    readiness: Arc<ReadinessGate>,
    metrics: Arc<MetricsRecorder>,
    subscriptions: Vec<Subscription>,
}

impl<S: WatchSource> WatchController<S> {
    pub fn new(
        source: S,
        vault: Arc<MetricsVault>,
        subscriptions: Vec<Subscription>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        let readiness = Arc::new(ReadinessGate::new(subscriptions.len()));
        metrics.watchers_expected.set(subscriptions.len() as i64);
        metrics.watchers_synced.set(0);

        let handler = Arc::new(EventHandler::new(vault, readiness.clone(), metrics.clone()));
        Self {
            source: Arc::new(source),
            handler,
            readiness,
            metrics,
            subscriptions,
        }
    }

    /// Shared readiness flag, for health reporting.
    pub fn readiness(&self) -> Arc<ReadinessGate> {
        self.readiness.clone()
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Runs every worker until `token` is cancelled or one of them fails.
    ///
    /// Returns `Ok(())` after a clean cancellation and the first worker error
    /// otherwise. `token` is cancelled on failure.
    #[instrument(name = "watch_controller", skip_all, fields(watchers = self.subscriptions.len()))]
    pub async fn run(self, token: CancellationToken) -> Result<(), WatchError> {
        let mut workers = JoinSet::new();

        for (id, subscription) in self.subscriptions.iter().enumerate() {
            let stream = self
                .source
                .watch(&subscription.resource, &subscription.namespace);
            let worker = Worker::new(
                id,
                subscription,
                self.handler.clone(),
                self.readiness.clone(),
                self.metrics.clone(),
            );
            let span = EventLogger::watch_span(
                &subscription.resource_label(),
                &subscription.namespace.to_string(),
            );
            workers.spawn(worker.run(stream, token.child_token()).instrument(span));
        }
        info!(watchers = workers.len(), "Watchers started");
        if workers.is_empty() {
            token.cancelled().await;
            return Ok(());
        }

        let mut result = Ok(());
        while let Some(joined) = workers.join_next().await {
            let outcome = joined.map_err(WatchError::from).and_then(|r| r);
            if let Err(err) = outcome {
                if result.is_ok() {
                    error!(error = %err, "Watcher failed, stopping every watcher");
                    token.cancel();
                    result = Err(err);
                }
            }
        }

        if result.is_ok() {
            info!("Watchers stopped");
        }
        result
    }
}
