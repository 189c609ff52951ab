//! ## annex-engine::source
//! **Inbound event contract**
//!
//! A watch source delivers, per resource type and namespace scope, an initial
//! listing terminated by [`WatchEvent::Synced`], followed by live changes in
//! server order. A later [`WatchEvent::Restarted`] starts a fresh listing.
//! Objects arrive already normalized into [`ResourceSample`]s.

use std::fmt;

use annex_core::ResourceSample;
use annex_discovery::ResolvedResource;
use futures::stream::BoxStream;

use crate::error::WatchError;

/// Namespace a subscription is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamespaceScope {
    All,
    Namespace(String),
}

impl NamespaceScope {
    /// The empty string selects every namespace.
    pub fn parse(namespace: &str) -> Self {
        if namespace.is_empty() {
            NamespaceScope::All
        } else {
            NamespaceScope::Namespace(namespace.to_string())
        }
    }
}

impl fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceScope::All => f.write_str("*"),
            NamespaceScope::Namespace(namespace) => f.write_str(namespace),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A (re)list begins; following `Listed` objects replace the known set.
    Restarted,
    Listed(ResourceSample),
    /// The listing is complete.
    Synced,
    Added(ResourceSample),
    Modified(ResourceSample),
    /// Carries the last state the server reported for the object.
    Deleted(ResourceSample),
}

pub type WatchStream = BoxStream<'static, Result<WatchEvent, WatchError>>;

pub trait WatchSource: Send + Sync + 'static {
    fn watch(&self, resource: &ResolvedResource, namespace: &NamespaceScope) -> WatchStream;
}
