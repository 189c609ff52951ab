//! ## annex-core::collector
//! **Bounded revision history per resource identity**
//!
//! Each entry holds `max_revisions` slots. Slot 0 is the current state and
//! slot N-1 the oldest retained one. A store that renders differently from
//! slot 0 shifts every revision one slot back (evicting the last) and takes
//! slot 0; an identical store is a no-op. Entries live until cleared.
//!
//! On scrape every populated slot becomes one gauge point whose value is its
//! revision number.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use prometheus::core::{Collector, Desc};
use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use tracing::trace;

use crate::error::CoreError;
use crate::mapping::Mapping;
use crate::sample::ResourceSample;

/// One rendered state of an entry. The last value is the revision marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    number: usize,
    values: Vec<String>,
}

impl Revision {
    fn current(mut values: Vec<String>) -> Self {
        values.push("0".to_string());
        Self { number: 0, values }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    /// Label values, revision marker included.
    pub fn label_values(&self) -> &[String] {
        &self.values
    }

    fn state(&self) -> &[String] {
        &self.values[..self.values.len() - 1]
    }

    fn renumber(&mut self, number: usize) {
        self.number = number;
        if let Some(marker) = self.values.last_mut() {
            *marker = number.to_string();
        }
    }
}

/// What a store did to the entry it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// First observation of the identity.
    Created,
    /// Rendering equal to the current revision.
    Unchanged,
    /// New current revision; `evicted` is set when the oldest one fell off.
    Revised { evicted: bool },
}

impl StoreOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreOutcome::Created => "created",
            StoreOutcome::Unchanged => "unchanged",
            StoreOutcome::Revised { evicted: false } => "revised",
            StoreOutcome::Revised { evicted: true } => "evicted",
        }
    }
}

#[derive(Debug)]
struct Entry {
    slots: Box<[Option<Revision>]>,
}

impl Entry {
    fn new(depth: usize, current: Revision) -> Self {
        let mut slots = vec![None; depth].into_boxed_slice();
        slots[0] = Some(current);
        Self { slots }
    }

    fn push(&mut self, candidate: Revision) -> StoreOutcome {
        if let Some(current) = &self.slots[0] {
            if current.state() == candidate.state() {
                return StoreOutcome::Unchanged;
            }
        }

        let evicted = self.slots[self.slots.len() - 1].is_some();
        // The oldest slot rotates to the front and is overwritten below.
        self.slots.rotate_right(1);
        self.slots[0] = Some(candidate);
        for (number, slot) in self.slots.iter_mut().enumerate().skip(1) {
            if let Some(revision) = slot {
                revision.renumber(number);
            }
        }
        StoreOutcome::Revised { evicted }
    }

    fn revisions(&self) -> impl Iterator<Item = &Revision> {
        self.slots.iter().flatten()
    }
}

/// A single exported sample: label values in schema order and the gauge value.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub label_values: Vec<String>,
    pub value: f64,
}

/// Per-mapping cache rendered as one gauge family.
///
/// Clones share the same entry arena.
#[derive(Debug, Clone)]
pub struct RevisionCollector {
    mapping: Arc<Mapping>,
    desc: Desc,
    entries: Arc<RwLock<HashMap<u64, Entry>>>,
}

impl RevisionCollector {
    pub fn new(mapping: Mapping) -> Result<Self, CoreError> {
        mapping.validate()?;
        let desc = Desc::new(
            mapping.name.clone(),
            mapping.help.clone(),
            mapping.label_schema(),
            HashMap::new(),
        )?;
        Ok(Self {
            mapping: Arc::new(mapping),
            desc,
            entries: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Sanitized label names, in the order of every point's label values.
    pub fn label_names(&self) -> &[String] {
        &self.desc.variable_labels
    }

    pub fn store(&self, sample: &ResourceSample) -> StoreOutcome {
        let key = self.mapping.identity_key(sample);
        let candidate = Revision::current(self.mapping.render_values(sample));

        let mut entries = self.entries.write();
        let outcome = match entries.get_mut(&key) {
            Some(entry) => entry.push(candidate),
            None => {
                entries.insert(key, Entry::new(self.mapping.max_revisions, candidate));
                StoreOutcome::Created
            }
        };
        trace!(
            mapping = %self.mapping.name,
            key = %format_args!("{key:016x}"),
            outcome = outcome.as_str(),
            "Stored sample"
        );
        outcome
    }

    /// Removes every revision of the sample's identity. Returns whether an entry existed.
    pub fn clear(&self, sample: &ResourceSample) -> bool {
        let key = self.mapping.identity_key(sample);
        let removed = self.entries.write().remove(&key).is_some();
        trace!(
            mapping = %self.mapping.name,
            key = %format_args!("{key:016x}"),
            removed,
            "Cleared sample"
        );
        removed
    }

    /// Number of tracked identities.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Every populated slot of every entry, in no particular order.
    pub fn points(&self) -> Vec<MetricPoint> {
        let entries = self.entries.read();
        entries
            .values()
            .flat_map(Entry::revisions)
            .map(|revision| MetricPoint {
                label_values: revision.label_values().to_vec(),
                value: revision.number() as f64,
            })
            .collect()
    }

    fn encode_point(&self, point: MetricPoint) -> Metric {
        let labels: Vec<LabelPair> = self
            .label_names()
            .iter()
            .zip(point.label_values)
            .map(|(name, value)| {
                let mut pair = LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value);
                pair
            })
            .collect();

        let mut gauge = Gauge::default();
        gauge.set_value(point.value);

        let mut metric = Metric::default();
        metric.set_label(labels.into());
        metric.set_gauge(gauge);
        metric
    }
}

impl Collector for RevisionCollector {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let metrics: Vec<Metric> = self
            .points()
            .into_iter()
            .map(|point| self.encode_point(point))
            .collect();

        let mut family = MetricFamily::default();
        family.set_name(self.mapping.name.clone());
        family.set_help(self.mapping.help.clone());
        family.set_field_type(MetricType::GAUGE);
        family.set_metric(metrics.into());
        vec![family]
    }
}
