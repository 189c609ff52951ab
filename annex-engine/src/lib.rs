//! # annex engine
//!
//! Supervises one watch worker per (resource type, namespace scope) and feeds
//! their events into the metrics vault.
//!
//! ### Key Submodules:
//! - `source`: the inbound event contract and the [`WatchSource`] seam
//! - `kube_source`: `kube::runtime::watcher` adapter
//! - `readiness`: controller-wide readiness barrier
//! - `handler`: readiness gating and vault routing
//! - `worker`: per-subscription event loop
//! - `controller`: spawns, joins and fails workers together

pub mod controller;
pub mod error;
pub mod handler;
pub mod kube_source;
pub mod readiness;
pub mod source;
pub mod subscription;
mod worker;

pub use controller::WatchController;
pub use error::WatchError;
pub use handler::{EventHandler, EventKind};
pub use kube_source::KubeWatchSource;
pub use readiness::ReadinessGate;
pub use source::{NamespaceScope, WatchEvent, WatchSource, WatchStream};
pub use subscription::{plan_subscriptions, Subscription};
pub use worker::WorkerPhase;

pub mod prelude {
    pub use super::{
        EventHandler, NamespaceScope, ReadinessGate, Subscription, WatchController, WatchError,
        WatchEvent, WatchSource,
    };
}
