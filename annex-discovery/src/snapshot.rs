//! Transport-independent view of the cluster's API discovery.

use async_trait::async_trait;

use crate::error::ResolutionError;

/// One resource type as advertised by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoveredResource {
    /// Plural resource name, e.g. `deployments`.
    pub name: String,
    pub singular_name: String,
    pub kind: String,
    pub short_names: Vec<String>,
    pub namespaced: bool,
    pub verbs: Vec<String>,
}

impl DiscoveredResource {
    /// Subresources such as `pods/log` cannot be watched on their own.
    pub fn is_subresource(&self) -> bool {
        self.name.contains('/')
    }

    pub fn is_watchable(&self) -> bool {
        !self.is_subresource()
            && ["list", "watch"]
                .iter()
                .all(|verb| self.verbs.iter().any(|v| v == verb))
    }
}

/// All resources served under one group/version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiResourceGroup {
    pub group: String,
    pub version: String,
    pub resources: Vec<DiscoveredResource>,
}

/// Discovery results in the order they were discovered. Within a group the
/// preferred version comes first.
pub type DiscoverySnapshot = Vec<ApiResourceGroup>;

#[async_trait]
pub trait DiscoverySource: Send + Sync {
    async fn discover(&self) -> Result<DiscoverySnapshot, ResolutionError>;
}
