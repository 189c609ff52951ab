//! # annex Configuration
//!
//! Layered configuration for the exporter.
//!
//! Hierarchy:
//! 1. Default values
//! 2. YAML file (`config/annex.yaml` unless a path is given)
//! 3. `ANNEX_*` environment variables, `__` separating nested keys
//!
//! Command-line overrides are applied by the binary on top of the result.

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod validation;

pub use error::ConfigError;

/// Default configuration file, read when present.
pub const DEFAULT_CONFIG_PATH: &str = "config/annex.yaml";

/// Name of the mapping built from defaults and command-line flags.
pub const DEFAULT_MAPPING_NAME: &str = "kube_annotations_exporter";

/// Top-level configuration container.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnnexConfig {
    #[validate(nested)]
    #[serde(default)]
    pub server: ServerConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[validate(nested)]
    #[serde(default)]
    pub kube: KubeConfig,

    /// Exported metrics. Mapping-related command-line flags edit the first one.
    #[validate(length(min = 1))]
    #[validate(nested)]
    #[validate(custom(function = validation::validate_unique_mapping_names))]
    #[serde(default = "default_mappings")]
    pub mappings: Vec<MappingConfig>,
}

impl Default for AnnexConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            telemetry: TelemetryConfig::default(),
            kube: KubeConfig::default(),
            mappings: default_mappings(),
        }
    }
}

/// HTTP listener serving `/metrics` and `/healthz`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(custom(function = validation::validate_socket_address))]
    #[serde(default = "default_address")]
    pub address: String,
}

fn default_address() -> String {
    "0.0.0.0:5000".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelemetryConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// `text` or `json`.
    #[validate(custom(function = validation::validate_log_format))]
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_filter() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KubeConfig {
    /// Kubeconfig path; in-cluster or default inference when unset.
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Namespaces to watch. The empty string stands for all namespaces.
    #[validate(length(min = 1))]
    #[serde(default = "default_namespaces")]
    pub namespaces: Vec<String>,
}

fn default_namespaces() -> Vec<String> {
    vec![String::new()]
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            namespaces: default_namespaces(),
        }
    }
}

/// One exported metric and the resources feeding it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct MappingConfig {
    #[validate(custom(function = validation::validate_metric_name))]
    pub name: String,

    #[serde(default = "default_help")]
    pub help: String,

    /// `<resource>/<group>` or `<resource>/<version>/<group>`.
    #[validate(length(min = 1))]
    #[validate(custom(function = validation::validate_resource_descriptors))]
    #[serde(default = "default_resources")]
    pub resources: Vec<String>,

    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default)]
    pub annotations: Vec<String>,

    #[serde(default)]
    pub reference_labels: Vec<String>,

    #[serde(default)]
    pub reference_annotations: Vec<String>,

    #[validate(range(min = 1, max = 64))]
    #[serde(default = "default_max_revisions")]
    pub max_revisions: usize,

    #[serde(default)]
    pub only_labels_and_annotations: bool,
}

fn default_help() -> String {
    "Kubernetes labels and annotations of watched resources".into()
}

fn default_resources() -> Vec<String> {
    [
        "deployments/apps",
        "ingresses/v1/networking.k8s.io",
        "sts/apps",
        "daemonsets/apps",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_revisions() -> usize {
    3
}

fn default_mappings() -> Vec<MappingConfig> {
    vec![MappingConfig::default()]
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MAPPING_NAME.into(),
            help: default_help(),
            resources: default_resources(),
            labels: Vec::new(),
            annotations: Vec::new(),
            reference_labels: Vec::new(),
            reference_annotations: Vec::new(),
            max_revisions: default_max_revisions(),
            only_labels_and_annotations: false,
        }
    }
}

impl AnnexConfig {
    /// Loads defaults, `config/annex.yaml` if present, then `ANNEX_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Self::defaults();
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        }
        Self::extract(figment)
    }

    /// Loads defaults, the given YAML file, then `ANNEX_*` variables.
    /// A missing file is an error.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Self::extract(Self::defaults().merge(Yaml::file(path)))
    }

    /// Re-validates after programmatic edits such as command-line overrides.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        Ok(())
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(AnnexConfig::default()))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment
            .merge(Env::prefixed("ANNEX_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn default_config_validates() {
        let config = AnnexConfig::default();
        config.validate().expect("Default config should validate");
        assert_eq!(config.mappings[0].name, DEFAULT_MAPPING_NAME);
        assert_eq!(config.kube.namespaces, vec![String::new()]);
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "annex.yaml",
                r#"
server:
  address: "127.0.0.1:9100"
kube:
  namespaces: ["prod", "staging"]
mappings:
  - name: team_labels
    resources: ["pods/v1/"]
    labels: ["app.kubernetes.io/name"]
    reference_labels: ["team"]
    max_revisions: 5
"#,
            )?;

            let config = AnnexConfig::load_from_path("annex.yaml").expect("config loads");
            assert_eq!(config.server.address, "127.0.0.1:9100");
            assert_eq!(config.kube.namespaces, vec!["prod", "staging"]);
            assert_eq!(config.mappings.len(), 1);
            let mapping = &config.mappings[0];
            assert_eq!(mapping.max_revisions, 5);
            assert_eq!(mapping.help, default_help());
            assert!(!mapping.only_labels_and_annotations);
            Ok(())
        });
    }

    #[test]
    fn environment_override() {
        Jail::expect_with(|jail| {
            jail.set_env("ANNEX_SERVER__ADDRESS", "127.0.0.1:6000");
            let config = AnnexConfig::load().expect("config loads");
            assert_eq!(config.server.address, "127.0.0.1:6000");
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_reported() {
        assert!(matches!(
            AnnexConfig::load_from_path("does/not/exist.yaml"),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_revisions() {
        let mut config = AnnexConfig::default();
        config.mappings[0].max_revisions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_mapping_names() {
        let mut config = AnnexConfig::default();
        config.mappings.push(MappingConfig::default());
        let err = ConfigError::from(config.validate().unwrap_err());
        assert!(err.to_string().contains("duplicate_mapping_name"));
    }

    #[test]
    fn rejects_malformed_descriptor() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "annex.yaml",
                "mappings:\n  - name: broken\n    resources: [\"deployments\"]\n",
            )?;
            let err = AnnexConfig::load_from_path("annex.yaml").unwrap_err();
            assert!(err.to_string().contains("invalid_resource_descriptor"));
            Ok(())
        });
    }
}
