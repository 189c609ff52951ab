//! # annex telemetry
//!
//! Logging setup and the exporter's own metrics. The prometheus registry
//! owned by [`MetricsRecorder`] is the single registry of the process: the
//! metrics vault registers its collectors on it and `/metrics` renders it.

pub mod logging;
pub mod metrics;

pub use logging::{EventLogger, LogFormat};
pub use metrics::{MetricsRecorder, TelemetryError};
