use std::path::PathBuf;

use annex_config::{AnnexConfig, ConfigError};
use clap::Parser;

/// Exports labels and annotations of Kubernetes resources as Prometheus
/// metrics, keeping a bounded history of revisions per object.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "annotations-exporter", version, about)]
pub struct Cli {
    /// YAML configuration file. `config/annex.yaml` is read when present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Listen address of the metrics server
    #[arg(long = "server.address")]
    pub server_address: Option<String>,

    /// `tracing` filter directive; `RUST_LOG` takes precedence
    #[arg(long)]
    pub log_filter: Option<String>,

    /// `text` or `json`
    #[arg(long)]
    pub log_format: Option<String>,

    /// Kubeconfig path; in-cluster or default inference when unset
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Namespaces to watch; an empty value watches every namespace
    #[arg(long, value_delimiter = ',')]
    pub namespaces: Option<Vec<String>>,

    /// Resources as `<resource>/<group>` or `<resource>/<version>/<group>`
    #[arg(long, value_delimiter = ',')]
    pub resources: Option<Vec<String>>,

    /// Tracked label keys
    #[arg(long, value_delimiter = ',')]
    pub labels: Option<Vec<String>>,

    /// Tracked annotation keys
    #[arg(long, value_delimiter = ',')]
    pub annotations: Option<Vec<String>>,

    /// Label keys that take part in the object identity
    #[arg(long, value_delimiter = ',')]
    pub reference_labels: Option<Vec<String>>,

    /// Annotation keys that take part in the object identity
    #[arg(long, value_delimiter = ',')]
    pub reference_annotations: Option<Vec<String>>,

    /// Revisions kept per identity
    #[arg(long)]
    pub max_revisions: Option<usize>,

    /// Key identities on reference labels and annotations only
    #[arg(long)]
    pub only_labels_and_annotations: bool,
}

impl Cli {
    /// Loads the layered configuration and applies the flags on top.
    pub fn load_config(&self) -> Result<AnnexConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AnnexConfig::load_from_path(path)?,
            None => AnnexConfig::load()?,
        };
        self.apply_overrides(&mut config);
        config.check()?;
        Ok(config)
    }

    /// Mapping flags edit the first configured mapping.
    pub fn apply_overrides(&self, config: &mut AnnexConfig) {
        if let Some(address) = &self.server_address {
            config.server.address = address.clone();
        }
        if let Some(filter) = &self.log_filter {
            config.telemetry.log_filter = filter.clone();
        }
        if let Some(format) = &self.log_format {
            config.telemetry.log_format = format.clone();
        }
        if let Some(path) = &self.kubeconfig {
            config.kube.kubeconfig = Some(path.clone());
        }
        if let Some(namespaces) = &self.namespaces {
            config.kube.namespaces = if namespaces.is_empty() {
                vec![String::new()]
            } else {
                namespaces.clone()
            };
        }

        let Some(mapping) = config.mappings.first_mut() else {
            return;
        };
        let overrides = [
            (&self.resources, &mut mapping.resources),
            (&self.labels, &mut mapping.labels),
            (&self.annotations, &mut mapping.annotations),
            (&self.reference_labels, &mut mapping.reference_labels),
            (&self.reference_annotations, &mut mapping.reference_annotations),
        ];
        for (flag, target) in overrides {
            if let Some(values) = flag {
                *target = values.clone();
            }
        }
        if let Some(max) = self.max_revisions {
            mapping.max_revisions = max;
        }
        if self.only_labels_and_annotations {
            mapping.only_labels_and_annotations = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annex_config::DEFAULT_MAPPING_NAME;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("annotations-exporter").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn no_flags_keep_defaults() {
        let mut config = AnnexConfig::default();
        parse(&[]).apply_overrides(&mut config);
        assert_eq!(config.server.address, "0.0.0.0:5000");
        assert_eq!(config.mappings[0].name, DEFAULT_MAPPING_NAME);
        assert_eq!(config.mappings[0].max_revisions, 3);
    }

    #[test]
    fn mapping_flags_edit_first_mapping() {
        let cli = parse(&[
            "--server.address",
            "127.0.0.1:9000",
            "--namespaces",
            "prod,staging",
            "--resources",
            "pods/v1/,deployments/apps",
            "--labels",
            "app.kubernetes.io/name",
            "--reference-annotations",
            "ci/pipeline",
            "--max-revisions",
            "5",
            "--only-labels-and-annotations",
        ]);
        let mut config = AnnexConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.server.address, "127.0.0.1:9000");
        assert_eq!(config.kube.namespaces, vec!["prod", "staging"]);
        let mapping = &config.mappings[0];
        assert_eq!(mapping.resources, vec!["pods/v1/", "deployments/apps"]);
        assert_eq!(mapping.labels, vec!["app.kubernetes.io/name"]);
        assert_eq!(mapping.reference_annotations, vec!["ci/pipeline"]);
        assert!(mapping.annotations.is_empty());
        assert_eq!(mapping.max_revisions, 5);
        assert!(mapping.only_labels_and_annotations);
        assert!(config.check().is_ok());
    }

    #[test]
    fn invalid_override_fails_validation() {
        let mut config = AnnexConfig::default();
        parse(&["--max-revisions", "0"]).apply_overrides(&mut config);
        assert!(config.check().is_err());
    }
}
