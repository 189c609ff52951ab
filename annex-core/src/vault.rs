//! ## annex-core::vault
//! **Mapping name → collector routing**
//!
//! The vault is populated once at startup and read-only afterwards, so it can
//! be shared between watch workers without a lock of its own. Each collector
//! guards its own entries.

use std::collections::HashMap;

use prometheus::Registry;
use tracing::{debug, info};

use crate::collector::{RevisionCollector, StoreOutcome};
use crate::error::CoreError;
use crate::mapping::Mapping;
use crate::sample::ResourceSample;

pub struct MetricsVault {
    registry: Registry,
    collectors: HashMap<String, RevisionCollector>,
}

impl MetricsVault {
    /// Creates an empty vault registering its collectors with `registry`.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            collectors: HashMap::new(),
        }
    }

    /// Builds and registers one collector per mapping.
    ///
    /// Fails on the first invalid or duplicate mapping; collectors registered
    /// before the failure stay registered.
    pub fn register_mappings<I>(&mut self, mappings: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = Mapping>,
    {
        for mapping in mappings {
            if self.collectors.contains_key(&mapping.name) {
                return Err(CoreError::DuplicateMapping(mapping.name));
            }

            let collector = RevisionCollector::new(mapping)?;
            self.registry.register(Box::new(collector.clone()))?;

            let name = collector.mapping().name.clone();
            info!(
                mapping = %name,
                labels = ?collector.label_names(),
                max_revisions = collector.mapping().max_revisions,
                "Registered mapping"
            );
            self.collectors.insert(name, collector);
        }
        Ok(())
    }

    pub fn store(&self, mapping: &str, sample: &ResourceSample) -> Result<StoreOutcome, CoreError> {
        let outcome = self.collector(mapping)?.store(sample);
        debug!(
            mapping,
            kind = %sample.meta.kind,
            namespace = %sample.meta.namespace,
            name = %sample.meta.name,
            outcome = outcome.as_str(),
            "Store"
        );
        Ok(outcome)
    }

    /// Stores `sample` for an object previously stored as `previous`.
    ///
    /// When a reference value changed, the object's identity moved and the
    /// entry under the old identity is cleared first. Identities without meta
    /// fields can be shared between objects and are never cleared here.
    pub fn store_update(
        &self,
        mapping: &str,
        previous: Option<&ResourceSample>,
        sample: &ResourceSample,
    ) -> Result<StoreOutcome, CoreError> {
        let collector = self.collector(mapping)?;
        if let Some(previous) = previous {
            let m = collector.mapping();
            if !m.only_labels_and_annotations && m.identity_key(previous) != m.identity_key(sample)
            {
                collector.clear(previous);
                debug!(
                    mapping,
                    namespace = %sample.meta.namespace,
                    name = %sample.meta.name,
                    "Identity moved, cleared previous entry"
                );
            }
        }
        self.store(mapping, sample)
    }

    pub fn clear(&self, mapping: &str, sample: &ResourceSample) -> Result<bool, CoreError> {
        let removed = self.collector(mapping)?.clear(sample);
        debug!(
            mapping,
            kind = %sample.meta.kind,
            namespace = %sample.meta.namespace,
            name = %sample.meta.name,
            removed,
            "Clear"
        );
        Ok(removed)
    }

    pub fn collector(&self, mapping: &str) -> Result<&RevisionCollector, CoreError> {
        self.collectors
            .get(mapping)
            .ok_or_else(|| CoreError::UnknownMapping(mapping.to_string()))
    }

    pub fn mapping_names(&self) -> impl Iterator<Item = &str> {
        self.collectors.keys().map(String::as_str)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
