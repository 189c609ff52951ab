//! Resource descriptors as typed by users, and canonical resource triples.

use std::fmt;
use std::str::FromStr;

use crate::error::ResolutionError;

/// Canonical (group, version, resource) triple. The core group is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// `group/version`, or just `version` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionResource {
    /// `resource.version.group`, matching kubectl's fully qualified form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}.{}", self.resource, self.version)
        } else {
            write!(f, "{}.{}.{}", self.resource, self.version, self.group)
        }
    }
}

/// `<resource>/<group>` or `<resource>/<version>/<group>`.
///
/// `resource` may be any alias: plural, singular, kind or short name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    pub resource: String,
    pub version: Option<String>,
    pub group: String,
}

impl FromStr for ResourceDescriptor {
    type Err = ResolutionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = raw.split('/').collect();
        let descriptor = match parts.as_slice() {
            [resource, group] => ResourceDescriptor {
                resource: resource.to_string(),
                version: None,
                group: group.to_string(),
            },
            [resource, version, group] if !version.is_empty() => ResourceDescriptor {
                resource: resource.to_string(),
                version: Some(version.to_string()),
                group: group.to_string(),
            },
            _ => return Err(ResolutionError::Malformed(raw.to_string())),
        };
        if descriptor.resource.is_empty() {
            return Err(ResolutionError::Malformed(raw.to_string()));
        }
        Ok(descriptor)
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}/{}/{}", self.resource, version, self.group),
            None => write!(f, "{}/{}", self.resource, self.group),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_group_form() {
        let d: ResourceDescriptor = "deployments/apps".parse().unwrap();
        assert_eq!(d.resource, "deployments");
        assert_eq!(d.version, None);
        assert_eq!(d.group, "apps");
    }

    #[test]
    fn parses_versioned_form() {
        let d: ResourceDescriptor = "ingresses/v1/networking.k8s.io".parse().unwrap();
        assert_eq!(d.version.as_deref(), Some("v1"));
        assert_eq!(d.group, "networking.k8s.io");
        assert_eq!(d.to_string(), "ingresses/v1/networking.k8s.io");
    }

    #[test]
    fn core_group_is_empty() {
        let d: ResourceDescriptor = "pods/v1/".parse().unwrap();
        assert_eq!(d.group, "");
        assert_eq!(d.version.as_deref(), Some("v1"));
    }

    #[test]
    fn rejects_malformed() {
        for raw in ["pods", "/apps", "a/b/c/d", "pods//apps"] {
            assert!(
                matches!(raw.parse::<ResourceDescriptor>(), Err(ResolutionError::Malformed(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn displays_qualified_name() {
        assert_eq!(
            GroupVersionResource::new("apps", "v1", "deployments").to_string(),
            "deployments.v1.apps"
        );
        assert_eq!(GroupVersionResource::new("", "v1", "pods").to_string(), "pods.v1");
        assert_eq!(GroupVersionResource::new("", "v1", "pods").api_version(), "v1");
    }
}
