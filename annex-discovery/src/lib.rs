//! # annex Discovery
//!
//! Turns descriptors such as `deployments/apps` or
//! `ingresses/v1/networking.k8s.io` into canonical group/version/resource
//! triples, using one snapshot of the cluster's API discovery taken at
//! startup.

pub mod descriptor;
pub mod error;
pub mod kube_source;
pub mod resolver;
pub mod snapshot;

pub use descriptor::{GroupVersionResource, ResourceDescriptor};
pub use error::ResolutionError;
pub use kube_source::KubeDiscovery;
pub use resolver::{AmbiguityWarning, Resolution, ResolvedResource, ResourceResolver};
pub use snapshot::{ApiResourceGroup, DiscoveredResource, DiscoverySnapshot, DiscoverySource};
