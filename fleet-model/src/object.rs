use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// The portion of a Kubernetes object every kind carries, independent of
/// its `spec`/`status` shape.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: Option<String>,
    pub uid: Option<String>,
    pub creation_timestamp: Option<DateTime<Utc>>,
    pub labels: BTreeMap<String, String>,
}

/// A resource as returned by the cluster client capability (spec.md §6).
///
/// The concrete wire encoding of Kubernetes resources is an out-of-scope
/// collaborator concern (spec.md §1); this crate only needs a uniform
/// shape to carry `metadata` plus a kind-specific `data` payload that
/// Transformers (fleet-core) know how to interpret. This mirrors the
/// `DynamicObject` pattern used by `kube-rs` client code in the wider
/// ecosystem.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ResourceObject {
    pub metadata: ObjectMeta,
    pub data: serde_json::Value,
}

impl ResourceObject {
    pub fn new(metadata: ObjectMeta, data: serde_json::Value) -> Self {
        Self { metadata, data }
    }

    pub fn field(&self, pointer: &str) -> Option<&serde_json::Value> {
        self.data.pointer(pointer)
    }
}
