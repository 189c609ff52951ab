//! ## annex-core::sample
//! **Normalized view of one observed resource**
//!
//! Every resource kind, built-in or custom, is reduced to the same shape:
//! four identity fields plus generic label and annotation maps. The kind is
//! carried as data, never as a type.

use std::collections::BTreeMap;

/// Label names of the identity fields, in the order [`ResourceMeta::fields`] yields them.
pub const META_FIELD_NAMES: [&str; 4] = ["api_version", "kind", "namespace", "name"];

/// Identity fields of an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceMeta {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceMeta {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Ordered identity vector: API version, kind, namespace, name.
    pub fn fields(&self) -> [&str; 4] {
        [&self.api_version, &self.kind, &self.namespace, &self.name]
    }
}

/// One observation of a resource, produced per watch event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSample {
    pub meta: ResourceMeta,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl ResourceSample {
    pub fn new(meta: ResourceMeta) -> Self {
        Self {
            meta,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Label value for `key`, or the empty string when absent.
    pub fn label(&self, key: &str) -> &str {
        self.labels.get(key).map_or("", String::as_str)
    }

    /// Annotation value for `key`, or the empty string when absent.
    pub fn annotation(&self, key: &str) -> &str {
        self.annotations.get(key).map_or("", String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_keys_read_as_empty() {
        let sample = ResourceSample::new(ResourceMeta::new("v1", "Pod", "default", "web"))
            .with_label("app", "web");
        assert_eq!(sample.label("app"), "web");
        assert_eq!(sample.label("tier"), "");
        assert_eq!(sample.annotation("owner"), "");
    }

    #[test]
    fn meta_fields_follow_label_name_order() {
        let meta = ResourceMeta::new("apps/v1", "Deployment", "prod", "api");
        let fields = meta.fields();
        assert_eq!(fields.len(), META_FIELD_NAMES.len());
        assert_eq!(fields, ["apps/v1", "Deployment", "prod", "api"]);
    }
}
