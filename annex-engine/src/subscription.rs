//! ## annex-engine::subscription
//! **One watch per (resource type, namespace scope)**
//!
//! Mappings sharing a resource type share its watch; each event is applied to
//! every mapping in the subscription.

use std::collections::{BTreeMap, BTreeSet};

use annex_discovery::ResolvedResource;

use crate::source::NamespaceScope;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub resource: ResolvedResource,
    pub namespace: NamespaceScope,
    /// Mapping names fed by this watch, in first-seen order.
    pub mappings: Vec<String>,
}

impl Subscription {
    /// Resource label used in logs and self-metrics.
    pub fn resource_label(&self) -> String {
        self.resource.gvr.to_string()
    }
}

/// Groups mapping resources into subscriptions, ordered by resource then scope.
///
/// Cluster-scoped resources are watched once regardless of `namespaces`. When
/// any scope is [`NamespaceScope::All`], specific namespaces are redundant and
/// dropped.
pub fn plan_subscriptions<'a, I>(mappings: I, namespaces: &[NamespaceScope]) -> Vec<Subscription>
where
    I: IntoIterator<Item = (&'a str, &'a [ResolvedResource])>,
{
    let scopes: BTreeSet<NamespaceScope> = if namespaces.is_empty()
        || namespaces.contains(&NamespaceScope::All)
    {
        BTreeSet::from([NamespaceScope::All])
    } else {
        namespaces.iter().cloned().collect()
    };

    let mut grouped: BTreeMap<(ResolvedResource, NamespaceScope), Vec<String>> = BTreeMap::new();
    for (mapping, resources) in mappings {
        for resource in resources {
            let resource_scopes: Vec<NamespaceScope> = if resource.namespaced {
                scopes.iter().cloned().collect()
            } else {
                vec![NamespaceScope::All]
            };

            for scope in resource_scopes {
                let names = grouped.entry((resource.clone(), scope)).or_default();
                if !names.iter().any(|name| name == mapping) {
                    names.push(mapping.to_string());
                }
            }
        }
    }

    grouped
        .into_iter()
        .map(|((resource, namespace), mappings)| Subscription {
            resource,
            namespace,
            mappings,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use annex_discovery::GroupVersionResource;

    fn resolved(group: &str, resource: &str, kind: &str, namespaced: bool) -> ResolvedResource {
        ResolvedResource {
            gvr: GroupVersionResource::new(group, "v1", resource),
            kind: kind.into(),
            namespaced,
        }
    }

    fn scopes(names: &[&str]) -> Vec<NamespaceScope> {
        names.iter().map(|n| NamespaceScope::parse(n)).collect()
    }

    #[test]
    fn shares_watches_between_mappings() {
        let deployments = resolved("apps", "deployments", "Deployment", true);
        let statefulsets = resolved("apps", "statefulsets", "StatefulSet", true);
        let first = vec![deployments.clone(), statefulsets.clone()];
        let second = vec![deployments.clone()];

        let plan = plan_subscriptions(
            [("first", first.as_slice()), ("second", second.as_slice())],
            &scopes(&["prod"]),
        );

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].resource, deployments);
        assert_eq!(plan[0].mappings, vec!["first", "second"]);
        assert_eq!(plan[1].resource, statefulsets);
        assert_eq!(plan[1].mappings, vec!["first"]);
        assert_eq!(plan[1].namespace, NamespaceScope::Namespace("prod".into()));
    }

    #[test]
    fn one_subscription_per_namespace() {
        let pods = vec![resolved("", "pods", "Pod", true)];
        let plan = plan_subscriptions([("m", pods.as_slice())], &scopes(&["b", "a", "b"]));
        let namespaces: Vec<_> = plan.iter().map(|s| s.namespace.to_string()).collect();
        assert_eq!(namespaces, vec!["a", "b"]);
    }

    #[test]
    fn all_namespaces_subsumes_specific_ones() {
        let pods = vec![resolved("", "pods", "Pod", true)];
        let plan = plan_subscriptions([("m", pods.as_slice())], &scopes(&["prod", ""]));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].namespace, NamespaceScope::All);
    }

    #[test]
    fn cluster_scoped_resources_are_watched_once() {
        let nodes = vec![resolved("", "nodes", "Node", false)];
        let plan = plan_subscriptions([("m", nodes.as_slice())], &scopes(&["a", "b"]));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].namespace, NamespaceScope::All);
    }
}
