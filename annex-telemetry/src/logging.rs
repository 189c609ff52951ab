//! ## annex-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! `RUST_LOG` takes precedence over the configured filter.

use std::str::FromStr;

use tracing::{info_span, Span};
use tracing_subscriber::{fmt, EnvFilter};

/// Output format of the process logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. A second call is a no-op.
    pub fn init(default_filter: &str, format: LogFormat) {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let builder = fmt().with_env_filter(filter).with_thread_names(true);
        let _ = match format {
            LogFormat::Text => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
    }

    /// Span wrapping the lifetime of one watch worker.
    pub fn watch_span(resource: &str, namespace: &str) -> Span {
        info_span!("watch", resource = resource, namespace = namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn parses_formats() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[traced_test]
    #[test]
    fn watch_span_carries_fields() {
        let span = EventLogger::watch_span("deployments.v1.apps", "prod");
        let _guard = span.enter();
        tracing::info!("worker started");
        assert!(logs_contain("worker started"));
        assert!(logs_contain("deployments.v1.apps"));
    }
}
