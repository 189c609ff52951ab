//! ## annex-core::mapping
//! **Static description of one exported metric**
//!
//! A mapping decides which sample fields form the cache identity, which are
//! rendered as tracked values, and how many distinct revisions are retained.
//! The rendered tuple and the metric label schema share one ordering:
//!
//! 1. meta fields (unless identity is labels/annotations only)
//! 2. reference label values
//! 3. reference annotation values
//! 4. tracked annotation values
//! 5. tracked label values
//! 6. revision

use crate::error::CoreError;
use crate::hash::identity_hash;
use crate::sample::{ResourceSample, META_FIELD_NAMES};

/// Prefix applied to every generated label name.
pub const LABEL_PREFIX: &str = "annotations_exporter_";

/// Name of the trailing label carrying the revision number.
pub const REVISION_LABEL: &str = "revision";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub name: String,
    pub help: String,
    /// Tracked label keys, rendered but not part of the identity.
    pub labels: Vec<String>,
    /// Tracked annotation keys, rendered but not part of the identity.
    pub annotations: Vec<String>,
    /// Label keys whose values join the identity vector.
    pub reference_labels: Vec<String>,
    /// Annotation keys whose values join the identity vector.
    pub reference_annotations: Vec<String>,
    pub max_revisions: usize,
    /// Drop the meta fields from the identity, keying only on reference values.
    pub only_labels_and_annotations: bool,
}

impl Mapping {
    pub fn new(name: impl Into<String>, help: impl Into<String>, max_revisions: usize) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            labels: Vec::new(),
            annotations: Vec::new(),
            reference_labels: Vec::new(),
            reference_annotations: Vec::new(),
            max_revisions,
            only_labels_and_annotations: false,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.is_empty() {
            return Err(self.invalid("name must not be empty"));
        }
        if self.max_revisions == 0 {
            return Err(self.invalid("max_revisions must be at least 1"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> CoreError {
        CoreError::InvalidMapping {
            name: self.name.clone(),
            reason: reason.to_string(),
        }
    }

    /// Ordered identity vector of `sample` under this mapping.
    ///
    /// Store and Clear both key entries through this function.
    pub fn identity_vector<'s>(&self, sample: &'s ResourceSample) -> Vec<&'s str> {
        let mut fields = Vec::with_capacity(self.identity_len());
        if !self.only_labels_and_annotations {
            fields.extend(sample.meta.fields());
        }
        fields.extend(self.reference_labels.iter().map(|key| sample.label(key)));
        fields.extend(
            self.reference_annotations
                .iter()
                .map(|key| sample.annotation(key)),
        );
        fields
    }

    pub fn identity_key(&self, sample: &ResourceSample) -> u64 {
        identity_hash(self.identity_vector(sample))
    }

    /// Identity vector followed by tracked annotation and label values.
    /// The revision marker is not included.
    pub fn render_values(&self, sample: &ResourceSample) -> Vec<String> {
        let identity = self.identity_vector(sample);
        let mut values = Vec::with_capacity(self.schema_len());
        values.extend(identity.into_iter().map(str::to_owned));
        values.extend(
            self.annotations
                .iter()
                .map(|key| sample.annotation(key).to_owned()),
        );
        values.extend(self.labels.iter().map(|key| sample.label(key).to_owned()));
        values
    }

    /// Full metric label schema, sanitized, ending with the revision label.
    pub fn label_schema(&self) -> Vec<String> {
        let meta: &[&str] = if self.only_labels_and_annotations {
            &[]
        } else {
            &META_FIELD_NAMES
        };

        let label_prefix = format!("{LABEL_PREFIX}label_");
        let annotation_prefix = format!("{LABEL_PREFIX}annotation_");

        let mut schema = Vec::with_capacity(self.schema_len());
        schema.extend(meta.iter().map(|name| prefixed(LABEL_PREFIX, name)));
        schema.extend(self.reference_labels.iter().map(|k| prefixed(&label_prefix, k)));
        schema.extend(
            self.reference_annotations
                .iter()
                .map(|k| prefixed(&annotation_prefix, k)),
        );
        schema.extend(self.annotations.iter().map(|k| prefixed(&annotation_prefix, k)));
        schema.extend(self.labels.iter().map(|k| prefixed(&label_prefix, k)));
        schema.push(prefixed(LABEL_PREFIX, REVISION_LABEL));
        schema
    }

    fn identity_len(&self) -> usize {
        let meta = if self.only_labels_and_annotations {
            0
        } else {
            META_FIELD_NAMES.len()
        };
        meta + self.reference_labels.len() + self.reference_annotations.len()
    }

    fn schema_len(&self) -> usize {
        self.identity_len() + self.annotations.len() + self.labels.len() + 1
    }
}

fn prefixed(prefix: &str, name: &str) -> String {
    sanitize_label_name(&format!("{prefix}{name}"))
}

/// Lower-cases and replaces `/`, `.` and `-` with `_`.
pub fn sanitize_label_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| match c {
            '/' | '.' | '-' => '_',
            other => other,
        })
        .collect()
}
