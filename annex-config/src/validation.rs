//! Custom validation functions for configuration.

use std::collections::HashSet;
use std::net::SocketAddr;

use validator::ValidationError;

use crate::MappingConfig;

/// `<resource>/<group>` or `<resource>/<version>/<group>`; the group may be
/// empty for the core API group.
pub fn validate_resource_descriptors(descriptors: &[String]) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^[A-Za-z0-9.\-]+/([A-Za-z0-9\-]+/)?[A-Za-z0-9.\-]*$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;

    if descriptors.iter().all(|d| re.is_match(d)) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_resource_descriptor"))
    }
}

/// Prometheus metric name: `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn validate_metric_name(name: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^[a-zA-Z_:][a-zA-Z0-9_:]*$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_metric_name"))
    }
}

pub fn validate_unique_mapping_names(mappings: &[MappingConfig]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    if mappings.iter().all(|m| seen.insert(m.name.as_str())) {
        Ok(())
    } else {
        Err(ValidationError::new("duplicate_mapping_name"))
    }
}

pub fn validate_socket_address(address: &str) -> Result<(), ValidationError> {
    address
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_socket_address"))
}

pub fn validate_log_format(format: &str) -> Result<(), ValidationError> {
    if ["text", "json"].contains(&format.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_descriptors() {
        let ok = |d: &str| validate_resource_descriptors(&[d.to_string()]).is_ok();
        assert!(ok("deployments/apps"));
        assert!(ok("ingresses/v1/networking.k8s.io"));
        assert!(ok("pods/"));
        assert!(ok("pods/v1/"));
        assert!(!ok("pods"));
        assert!(!ok("a/b/c/d"));
    }

    #[test]
    fn metric_names() {
        assert!(validate_metric_name("kube_annotations_exporter").is_ok());
        assert!(validate_metric_name("9lives").is_err());
        assert!(validate_metric_name("with-dash").is_err());
    }

    #[test]
    fn socket_addresses() {
        assert!(validate_socket_address("0.0.0.0:5000").is_ok());
        assert!(validate_socket_address(":5000").is_err());
    }
}
