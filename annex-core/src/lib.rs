//! # annex-core
//!
//! Revision-tracked metrics cache for cluster resource labels and annotations.
//!
//! ### Key Submodules:
//! - `sample`: uniform, kind-agnostic representation of an observed object
//! - `mapping`: static description of which fields become metric labels
//! - `hash`: order-sensitive 64-bit identity keys
//! - `collector`: bounded revision history per identity, rendered on scrape
//! - `vault`: routes samples to collectors by mapping name
//!
//! ### Known limitations:
//! - Identity hash collisions are not detected; two identities sharing a key
//!   share one revision history.

pub mod collector;
pub mod error;
pub mod hash;
pub mod mapping;
pub mod sample;
pub mod vault;

pub mod prelude {
    pub use crate::collector::{MetricPoint, RevisionCollector, StoreOutcome};
    pub use crate::error::CoreError;
    pub use crate::mapping::Mapping;
    pub use crate::sample::{ResourceMeta, ResourceSample};
    pub use crate::vault::MetricsVault;
}

pub use collector::{RevisionCollector, StoreOutcome};
pub use error::CoreError;
pub use mapping::Mapping;
pub use sample::{ResourceMeta, ResourceSample};
pub use vault::MetricsVault;
