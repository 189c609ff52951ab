//! ## annex-discovery::resolver
//! **Alias table over one discovery snapshot**
//!
//! Every watchable resource is reachable by its plural name, singular name,
//! kind, lower-cased kind and short names, each with and without an explicit
//! version. Lookups are exact.
//!
//! Ties are broken by discovery order. Candidates that differ only in version
//! resolve silently to the first discovered (preferred) version; candidates
//! naming different resources resolve to the first one and raise an
//! [`AmbiguityWarning`].

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::descriptor::{GroupVersionResource, ResourceDescriptor};
use crate::error::ResolutionError;
use crate::snapshot::{ApiResourceGroup, DiscoverySource};

/// A resolved resource type with what the watch layer needs to address it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedResource {
    pub gvr: GroupVersionResource,
    pub kind: String,
    pub namespaced: bool,
}

/// An alias matched more than one distinct resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguityWarning {
    pub descriptor: String,
    pub chosen: GroupVersionResource,
    pub candidates: Vec<GroupVersionResource>,
}

/// Resolved resources in request order plus any ambiguity warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub resources: Vec<ResolvedResource>,
    pub warnings: Vec<AmbiguityWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AliasKey {
    alias: String,
    version: Option<String>,
    group: String,
}

pub struct ResourceResolver {
    aliases: HashMap<AliasKey, Vec<ResolvedResource>>,
}

impl ResourceResolver {
    /// Queries `source` once and builds the alias table.
    pub async fn discover<S>(source: &S) -> Result<Self, ResolutionError>
    where
        S: DiscoverySource + ?Sized,
    {
        let snapshot = source.discover().await?;
        Ok(Self::from_snapshot(&snapshot))
    }

    pub fn from_snapshot(snapshot: &[ApiResourceGroup]) -> Self {
        let mut aliases: HashMap<AliasKey, Vec<ResolvedResource>> = HashMap::new();

        for group in snapshot {
            for resource in group.resources.iter().filter(|r| r.is_watchable()) {
                let resolved = ResolvedResource {
                    gvr: GroupVersionResource::new(&group.group, &group.version, &resource.name),
                    kind: resource.kind.clone(),
                    namespaced: resource.namespaced,
                };

                let lower_kind = resource.kind.to_lowercase();
                let mut names: Vec<&str> = vec![
                    resource.name.as_str(),
                    resource.singular_name.as_str(),
                    resource.kind.as_str(),
                    lower_kind.as_str(),
                ];
                names.extend(resource.short_names.iter().map(String::as_str));

                let mut seen = Vec::with_capacity(names.len());
                for name in names.into_iter().filter(|n| !n.is_empty()) {
                    if seen.contains(&name) {
                        continue;
                    }
                    seen.push(name);

                    for version in [Some(group.version.clone()), None] {
                        let key = AliasKey {
                            alias: name.to_string(),
                            version,
                            group: group.group.clone(),
                        };
                        let candidates = aliases.entry(key).or_default();
                        if !candidates.contains(&resolved) {
                            candidates.push(resolved.clone());
                        }
                    }
                }
            }
        }

        debug!(aliases = aliases.len(), "Built resource alias table");
        Self { aliases }
    }

    /// Resolves every descriptor, failing on the first malformed or unknown one.
    pub fn resolve<S: AsRef<str>>(&self, descriptors: &[S]) -> Result<Resolution, ResolutionError> {
        let mut resolution = Resolution::default();
        for raw in descriptors {
            let descriptor: ResourceDescriptor = raw.as_ref().parse()?;
            let (resource, warning) = self.resolve_one(&descriptor)?;
            info!(descriptor = %descriptor, resource = %resource.gvr, "Resolved resource");
            resolution.resources.push(resource);
            resolution.warnings.extend(warning);
        }
        Ok(resolution)
    }

    pub fn resolve_one(
        &self,
        descriptor: &ResourceDescriptor,
    ) -> Result<(ResolvedResource, Option<AmbiguityWarning>), ResolutionError> {
        let key = AliasKey {
            alias: descriptor.resource.clone(),
            version: descriptor.version.clone(),
            group: descriptor.group.clone(),
        };
        let candidates = self
            .aliases
            .get(&key)
            .filter(|candidates| !candidates.is_empty())
            .ok_or_else(|| ResolutionError::Unknown(descriptor.to_string()))?;

        let chosen = candidates[0].clone();
        let mut distinct: Vec<&ResolvedResource> = Vec::new();
        for candidate in candidates {
            let same_resource = |other: &&ResolvedResource| {
                other.gvr.group == candidate.gvr.group
                    && other.gvr.resource == candidate.gvr.resource
            };
            if !distinct.iter().any(same_resource) {
                distinct.push(candidate);
            }
        }

        let warning = (distinct.len() > 1).then(|| {
            let warning = AmbiguityWarning {
                descriptor: descriptor.to_string(),
                chosen: chosen.gvr.clone(),
                candidates: distinct.iter().map(|c| c.gvr.clone()).collect(),
            };
            warn!(
                descriptor = %warning.descriptor,
                chosen = %warning.chosen,
                candidates = ?warning.candidates.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "Ambiguous resource alias, using the first discovered match"
            );
            warning
        });

        Ok((chosen, warning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{DiscoveredResource, DiscoverySnapshot};
    use async_trait::async_trait;
    use tracing_test::traced_test;

    fn resource(name: &str, singular: &str, kind: &str, short: &[&str]) -> DiscoveredResource {
        DiscoveredResource {
            name: name.into(),
            singular_name: singular.into(),
            kind: kind.into(),
            short_names: short.iter().map(|s| s.to_string()).collect(),
            namespaced: true,
            verbs: ["get", "list", "watch"].map(String::from).to_vec(),
        }
    }

    fn group(group: &str, version: &str, resources: Vec<DiscoveredResource>) -> ApiResourceGroup {
        ApiResourceGroup {
            group: group.into(),
            version: version.into(),
            resources,
        }
    }

    fn snapshot() -> DiscoverySnapshot {
        let mut log = resource("pods/log", "", "Pod", &[]);
        log.verbs = vec!["get".into()];
        let mut bindings = resource("bindings", "binding", "Binding", &[]);
        bindings.verbs = vec!["create".into()];

        vec![
            group(
                "",
                "v1",
                vec![resource("pods", "pod", "Pod", &["po"]), log, bindings],
            ),
            group(
                "apps",
                "v1",
                vec![
                    resource("deployments", "deployment", "Deployment", &["deploy"]),
                    resource("statefulsets", "statefulset", "StatefulSet", &["sts"]),
                ],
            ),
            group(
                "apps",
                "v1beta1",
                vec![resource("deployments", "deployment", "Deployment", &["deploy"])],
            ),
            group(
                "example.io",
                "v1",
                vec![
                    resource("widgets", "widget", "Widget", &["wd"]),
                    resource("wonders", "wonder", "Wonder", &["wd"]),
                ],
            ),
        ]
    }

    fn resolve(raw: &str) -> Result<Resolution, ResolutionError> {
        ResourceResolver::from_snapshot(&snapshot()).resolve(&[raw])
    }

    fn gvr(raw: &str) -> GroupVersionResource {
        resolve(raw).unwrap().resources.remove(0).gvr
    }

    #[test]
    fn resolves_every_alias() {
        let expected = GroupVersionResource::new("apps", "v1", "statefulsets");
        for raw in [
            "statefulsets/apps",
            "statefulset/apps",
            "StatefulSet/apps",
            "statefulset/v1/apps",
            "sts/apps",
            "sts/v1/apps",
        ] {
            assert_eq!(gvr(raw), expected, "{raw}");
        }
    }

    #[test]
    fn resolves_core_group() {
        let resolution = resolve("po/").unwrap();
        let pod = &resolution.resources[0];
        assert_eq!(pod.gvr, GroupVersionResource::new("", "v1", "pods"));
        assert_eq!(pod.kind, "Pod");
        assert!(pod.namespaced);
    }

    #[test]
    fn explicit_version_is_honoured() {
        assert_eq!(
            gvr("deployments/v1beta1/apps"),
            GroupVersionResource::new("apps", "v1beta1", "deployments")
        );
    }

    #[test]
    fn versionless_alias_prefers_first_discovered_version_without_warning() {
        let resolution = resolve("deploy/apps").unwrap();
        assert_eq!(
            resolution.resources[0].gvr,
            GroupVersionResource::new("apps", "v1", "deployments")
        );
        assert!(resolution.warnings.is_empty());
    }

    #[traced_test]
    #[test]
    fn ambiguous_short_name_warns_and_picks_first() {
        let resolution = resolve("wd/example.io").unwrap();
        assert_eq!(
            resolution.resources[0].gvr,
            GroupVersionResource::new("example.io", "v1", "widgets")
        );
        assert_eq!(resolution.warnings.len(), 1);
        assert_eq!(resolution.warnings[0].candidates.len(), 2);
        assert!(logs_contain("Ambiguous resource alias"));
    }

    #[test]
    fn unknown_resource_is_named() {
        match resolve("gadgets/example.io") {
            Err(ResolutionError::Unknown(name)) => assert_eq!(name, "gadgets/example.io"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unwatchable_resources_are_not_resolvable() {
        assert!(matches!(resolve("bindings/"), Err(ResolutionError::Unknown(_))));
        assert!(matches!(resolve("pods/log/"), Err(ResolutionError::Unknown(_))));
    }

    #[test]
    fn resolution_is_deterministic() {
        let descriptors = ["wd/example.io", "sts/apps", "deploy/apps", "pods/"];
        let first = ResourceResolver::from_snapshot(&snapshot())
            .resolve(&descriptors)
            .unwrap();
        let second = ResourceResolver::from_snapshot(&snapshot())
            .resolve(&descriptors)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.resources.len(), 4);
        assert_eq!(first.warnings.len(), 1);
    }

    struct StaticDiscovery(DiscoverySnapshot);

    #[async_trait]
    impl DiscoverySource for StaticDiscovery {
        async fn discover(&self) -> Result<DiscoverySnapshot, ResolutionError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn discovers_through_source() {
        let resolver = ResourceResolver::discover(&StaticDiscovery(snapshot()))
            .await
            .unwrap();
        let resolution = resolver.resolve(&["Deployment/apps"]).unwrap();
        assert_eq!(resolution.resources[0].gvr.resource, "deployments");
    }
}
