//! ## annex-engine::kube_source
//! **`kube::runtime::watcher` adapter**
//!
//! Watches resolved resources as `DynamicObject`s and normalizes them into
//! samples. An expired resource version (410 Gone) is left to the watcher's
//! own relist; any other watch error fails the worker.

use std::collections::HashSet;

use annex_core::{ResourceMeta, ResourceSample};
use annex_discovery::ResolvedResource;
use futures::{future, Stream, StreamExt};
use kube::api::{Api, ApiResource, DynamicObject};
use kube::core::GroupVersionKind;
use kube::runtime::watcher::{self, Event};
use kube::Client;
use tracing::debug;

use crate::error::WatchError;
use crate::source::{NamespaceScope, WatchEvent, WatchSource, WatchStream};

pub struct KubeWatchSource {
    client: Client,
    config: watcher::Config,
}

impl KubeWatchSource {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            config: watcher::Config::default(),
        }
    }
}

impl WatchSource for KubeWatchSource {
    fn watch(&self, resource: &ResolvedResource, namespace: &NamespaceScope) -> WatchStream {
        let gvk = GroupVersionKind::gvk(&resource.gvr.group, &resource.gvr.version, &resource.kind);
        let api_resource = ApiResource::from_gvk_with_plural(&gvk, &resource.gvr.resource);

        let api: Api<DynamicObject> = match namespace {
            NamespaceScope::Namespace(ns) if resource.namespaced => {
                Api::namespaced_with(self.client.clone(), ns, &api_resource)
            }
            _ => Api::all_with(self.client.clone(), &api_resource),
        };
        debug!(resource = %resource.gvr, namespace = %namespace, "Opening watch");

        let stream = watcher::watcher(api, self.config.clone());
        adapt(stream, resource.gvr.to_string(), EventTranslator::new(&api_resource))
    }
}

/// HTTP status the API server uses for an expired resource version.
const GONE: u16 = 410;

/// Translates a raw watcher stream. An expired resource version is not an
/// error here: the watcher relists on its own and the relist reaches the
/// worker as `Restarted`, `Listed` and `Synced`. Every other error is
/// passed on.
fn adapt<S>(events: S, resource: String, mut translator: EventTranslator) -> WatchStream
where
    S: Stream<Item = Result<Event<DynamicObject>, watcher::Error>> + Send + 'static,
{
    events
        .filter_map(move |event| {
            let item = match event {
                Ok(event) => Some(Ok(translator.translate(event))),
                Err(watcher::Error::WatchError(response)) if response.code == GONE => {
                    debug!(
                        resource = %resource,
                        reason = %response.message,
                        "Resource version expired, watcher relists"
                    );
                    None
                }
                Err(err) => Some(Err(WatchError::Stream {
                    resource: resource.clone(),
                    message: err.to_string(),
                })),
            };
            future::ready(item)
        })
        .boxed()
}

/// Maps watcher events onto [`WatchEvent`]s, telling additions from
/// modifications by the objects seen since the last listing.
struct EventTranslator {
    api_version: String,
    kind: String,
    seen: HashSet<(String, String)>,
}

impl EventTranslator {
    fn new(api_resource: &ApiResource) -> Self {
        Self {
            api_version: api_resource.api_version.clone(),
            kind: api_resource.kind.clone(),
            seen: HashSet::new(),
        }
    }

    fn translate(&mut self, event: Event<DynamicObject>) -> WatchEvent {
        match event {
            Event::Init => {
                self.seen.clear();
                WatchEvent::Restarted
            }
            Event::InitApply(object) => {
                let sample = self.normalize(object);
                self.seen.insert(key(&sample));
                WatchEvent::Listed(sample)
            }
            Event::InitDone => WatchEvent::Synced,
            Event::Apply(object) => {
                let sample = self.normalize(object);
                if self.seen.insert(key(&sample)) {
                    WatchEvent::Added(sample)
                } else {
                    WatchEvent::Modified(sample)
                }
            }
            Event::Delete(object) => {
                let sample = self.normalize(object);
                self.seen.remove(&key(&sample));
                WatchEvent::Deleted(sample)
            }
        }
    }

    /// Absent labels or annotations become empty maps; missing type metadata
    /// falls back to the watched resource's.
    fn normalize(&self, object: DynamicObject) -> ResourceSample {
        let (api_version, kind) = match object.types {
            Some(types) if !types.api_version.is_empty() && !types.kind.is_empty() => {
                (types.api_version, types.kind)
            }
            _ => (self.api_version.clone(), self.kind.clone()),
        };
        let metadata = object.metadata;

        ResourceSample {
            meta: ResourceMeta {
                api_version,
                kind,
                namespace: metadata.namespace.unwrap_or_default(),
                name: metadata.name.unwrap_or_default(),
            },
            labels: metadata.labels.unwrap_or_default(),
            annotations: metadata.annotations.unwrap_or_default(),
        }
    }
}

fn key(sample: &ResourceSample) -> (String, String) {
    (sample.meta.namespace.clone(), sample.meta.name.clone())
}
