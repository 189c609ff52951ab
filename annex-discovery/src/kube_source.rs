//! Discovery backed by the Kubernetes API server.

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIGroup, APIResourceList};
use kube::Client;
use tracing::{debug, instrument};

use crate::error::ResolutionError;
use crate::snapshot::{ApiResourceGroup, DiscoveredResource, DiscoverySnapshot, DiscoverySource};

pub struct KubeDiscovery {
    client: Client,
}

impl KubeDiscovery {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DiscoverySource for KubeDiscovery {
    #[instrument(skip_all)]
    async fn discover(&self) -> Result<DiscoverySnapshot, ResolutionError> {
        let mut snapshot = Vec::new();

        let core = self.client.list_core_api_versions().await?;
        for version in core.versions {
            let list = self.client.list_core_api_resources(&version).await?;
            snapshot.push(convert("", &version, list));
        }

        let groups = self.client.list_api_groups().await?;
        for group in groups.groups {
            for (group_version, version) in versions_preferred_first(&group) {
                let list = self.client.list_api_group_resources(&group_version).await?;
                snapshot.push(convert(&group.name, &version, list));
            }
        }

        debug!(
            group_versions = snapshot.len(),
            resources = snapshot.iter().map(|g| g.resources.len()).sum::<usize>(),
            "API discovery complete"
        );
        Ok(snapshot)
    }
}

/// `(group_version, version)` pairs with the preferred version first.
fn versions_preferred_first(group: &APIGroup) -> Vec<(String, String)> {
    let preferred = group
        .preferred_version
        .as_ref()
        .map(|v| v.group_version.clone());

    let mut versions: Vec<(String, String)> = group
        .versions
        .iter()
        .map(|v| (v.group_version.clone(), v.version.clone()))
        .collect();
    versions.sort_by_key(|(group_version, _)| Some(group_version) != preferred.as_ref());
    versions
}

fn convert(group: &str, version: &str, list: APIResourceList) -> ApiResourceGroup {
    let resources = list
        .resources
        .into_iter()
        .map(|resource| DiscoveredResource {
            name: resource.name,
            singular_name: resource.singular_name,
            kind: resource.kind,
            short_names: resource.short_names.unwrap_or_default(),
            namespaced: resource.namespaced,
            verbs: resource.verbs,
        })
        .collect();

    ApiResourceGroup {
        group: group.to_string(),
        version: version.to_string(),
        resources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::GroupVersionForDiscovery;

    fn gv(version: &str) -> GroupVersionForDiscovery {
        GroupVersionForDiscovery {
            group_version: format!("autoscaling/{version}"),
            version: version.to_string(),
        }
    }

    #[test]
    fn preferred_version_leads() {
        let group = APIGroup {
            name: "autoscaling".into(),
            preferred_version: Some(gv("v2")),
            versions: vec![gv("v1"), gv("v2")],
            ..APIGroup::default()
        };
        let versions = versions_preferred_first(&group);
        assert_eq!(versions[0].1, "v2");
        assert_eq!(versions[1].1, "v1");
    }
}
