//! Startup wiring: registry, vault, discovery, watch controller and HTTP server.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use annex_config::{AnnexConfig, MappingConfig};
use annex_core::{Mapping, MetricsVault};
use annex_discovery::{KubeDiscovery, ResolvedResource, ResourceResolver};
use annex_engine::{plan_subscriptions, KubeWatchSource, NamespaceScope, WatchController};
use annex_telemetry::MetricsRecorder;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::server::{self, AppState};

pub fn mapping_from_config(config: &MappingConfig) -> Mapping {
    Mapping {
        name: config.name.clone(),
        help: config.help.clone(),
        labels: config.labels.clone(),
        annotations: config.annotations.clone(),
        reference_labels: config.reference_labels.clone(),
        reference_annotations: config.reference_annotations.clone(),
        max_revisions: config.max_revisions,
        only_labels_and_annotations: config.only_labels_and_annotations,
    }
}

/// Runs the exporter until a shutdown signal or the first fatal error.
#[instrument(name = "exporter", skip_all)]
pub async fn run(config: AnnexConfig) -> anyhow::Result<()> {
    let metrics = Arc::new(MetricsRecorder::new()?);
    let mut vault = MetricsVault::new(metrics.registry.clone());
    vault
        .register_mappings(config.mappings.iter().map(mapping_from_config))
        .context("Failed to register mappings")?;
    let vault = Arc::new(vault);

    let client = kube_client(config.kube.kubeconfig.as_deref()).await?;
    let resolver = ResourceResolver::discover(&KubeDiscovery::new(client.clone()))
        .await
        .context("API discovery failed")?;

    let mut resolved: Vec<(String, Vec<ResolvedResource>)> = Vec::new();
    for mapping in &config.mappings {
        let resolution = resolver
            .resolve(&mapping.resources)
            .with_context(|| format!("Failed to resolve resources of mapping '{}'", mapping.name))?;
        if !resolution.warnings.is_empty() {
            warn!(
                mapping = %mapping.name,
                ambiguous = resolution.warnings.len(),
                "Some resource aliases were ambiguous"
            );
        }
        resolved.push((mapping.name.clone(), resolution.resources));
    }

    let namespaces: Vec<NamespaceScope> = config
        .kube
        .namespaces
        .iter()
        .map(|ns| NamespaceScope::parse(ns))
        .collect();
    let subscriptions = plan_subscriptions(
        resolved
            .iter()
            .map(|(name, resources)| (name.as_str(), resources.as_slice())),
        &namespaces,
    );
    info!(subscriptions = subscriptions.len(), "Planned watches");

    let controller = WatchController::new(
        KubeWatchSource::new(client),
        vault,
        subscriptions,
        metrics.clone(),
    );
    let state = AppState {
        metrics,
        readiness: controller.readiness(),
    };

    let address: SocketAddr = config
        .server
        .address
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.server.address))?;
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    let token = CancellationToken::new();
    tokio::spawn(shutdown_signal(token.clone()));

    let watching = async {
        let result = controller.run(token.clone()).await;
        token.cancel();
        result
    };
    let serving = async {
        let result = server::serve(listener, state, token.clone()).await;
        token.cancel();
        result
    };
    let (watched, served) = tokio::join!(watching, serving);

    watched.context("Watch controller failed")?;
    served.context("Metrics server failed")?;
    info!("Exporter stopped");
    Ok(())
}

async fn kube_client(kubeconfig: Option<&Path>) -> anyhow::Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        None => kube::Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };
    Ok(Client::try_from(config)?)
}

/// Cancels `token` on SIGINT or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
        _ = token.cancelled() => return,
    }
    token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mapping_converts() {
        let config = AnnexConfig::default();
        let mapping = mapping_from_config(&config.mappings[0]);
        assert_eq!(mapping.name, "kube_annotations_exporter");
        assert_eq!(mapping.max_revisions, 3);
        assert!(mapping.validate().is_ok());
    }
}
