//! ## annex-telemetry::metrics
//! **Exporter self-metrics and text exposition**

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Metrics error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Exposition is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    /// Handled watch events by resource and event type.
    pub watch_events: IntCounterVec,
    /// Events observed before the readiness barrier, by resource.
    pub dropped_events: IntCounterVec,
    /// Store/Clear results by mapping and outcome.
    pub store_outcomes: IntCounterVec,
    pub watchers_expected: IntGauge,
    pub watchers_synced: IntGauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, TelemetryError> {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Result<Self, TelemetryError> {
        let watch_events = IntCounterVec::new(
            Opts::new("annex_watch_events_total", "Handled watch events"),
            &["resource", "event"],
        )?;
        let dropped_events = IntCounterVec::new(
            Opts::new(
                "annex_watch_events_dropped_total",
                "Watch events dropped before every watcher synced",
            ),
            &["resource"],
        )?;
        let store_outcomes = IntCounterVec::new(
            Opts::new("annex_store_outcomes_total", "Collector store and clear results"),
            &["mapping", "outcome"],
        )?;
        let watchers_expected =
            IntGauge::new("annex_watchers_expected", "Configured watch subscriptions")?;
        let watchers_synced = IntGauge::new(
            "annex_watchers_synced",
            "Watch subscriptions that completed their initial listing",
        )?;

        registry.register(Box::new(watch_events.clone()))?;
        registry.register(Box::new(dropped_events.clone()))?;
        registry.register(Box::new(store_outcomes.clone()))?;
        registry.register(Box::new(watchers_expected.clone()))?;
        registry.register(Box::new(watchers_synced.clone()))?;

        Ok(Self {
            registry,
            watch_events,
            dropped_events,
            store_outcomes,
            watchers_expected,
            watchers_synced,
        })
    }

    /// Renders every registered metric in the text exposition format.
    pub fn gather_metrics(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    pub fn inc_watch_event(&self, resource: &str, event: &str) {
        self.watch_events.with_label_values(&[resource, event]).inc();
    }

    pub fn inc_dropped_event(&self, resource: &str) {
        self.dropped_events.with_label_values(&[resource]).inc();
    }

    pub fn inc_store_outcome(&self, mapping: &str, outcome: &str) {
        self.store_outcomes
            .with_label_values(&[mapping, outcome])
            .inc();
    }
}
