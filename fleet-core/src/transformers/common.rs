//! Helpers shared by every per-kind `Transformer`: the `name`/`namespace`
//! cell prefix every row carries, identity construction, age rendering,
//! and small JSON field accessors over `ResourceObject::data`.

use chrono::Utc;
use fleet_model::{ResourceIdentity, ResourceKind, ResourceObject};

use crate::formatting;

/// `[name, namespace?]`, the prefix every kind's `row()` shares
/// (spec.md §4.8: "name, [namespace], ...").
pub fn name_and_namespace_cells(resource: &ResourceObject, show_namespace: bool) -> Vec<String> {
    let mut cells = vec![resource.metadata.name.clone()];
    if show_namespace {
        cells.push(resource.metadata.namespace.clone().unwrap_or_default());
    }
    cells
}

pub fn identity(context: &str, kind: ResourceKind, resource: &ResourceObject) -> ResourceIdentity {
    ResourceIdentity::new(
        context,
        resource.metadata.namespace.clone().unwrap_or_default(),
        kind,
        resource.metadata.name.clone(),
        resource.metadata.uid.clone(),
    )
}

/// Largest-unit age string from `metadata.creation_timestamp`, or
/// `"unknown"` when absent (spec.md §4.1 `ago`).
pub fn age_cell(resource: &ResourceObject) -> String {
    match resource.metadata.creation_timestamp {
        Some(ts) => formatting::format_age(ts, Utc::now()),
        None => "unknown".to_string(),
    }
}

pub fn str_field(resource: &ResourceObject, pointer: &str) -> Option<String> {
    resource
        .field(pointer)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

pub fn num_field(resource: &ResourceObject, pointer: &str) -> Option<f64> {
    resource.field(pointer).and_then(|v| v.as_f64())
}

/// The Pod/Ingress/Service cell convention: absent or empty renders as
/// `"-"` (spec.md §4.8: "ip (`\"-\"` if empty), node (`\"-\"` if empty)",
/// "class (`\"<none>\"` if unset)" uses its own sentinel, see
/// `dash_if_empty_with`).
pub fn dash_if_empty(s: Option<String>) -> String {
    dash_if_empty_with(s, "-")
}

pub fn dash_if_empty_with(s: Option<String>, sentinel: &str) -> String {
    match s {
        Some(s) if !s.is_empty() => s,
        _ => sentinel.to_string(),
    }
}

/// `k=v` pairs joined with `,`, used for Deployment selectors
/// (spec.md §4.8).
pub fn join_map(map: &serde_json::Map<String, serde_json::Value>) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}={}", v.as_str().unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Builds the JSON value template-driven columns evaluate against: the
/// resource's raw `data`, plus a synthesized `metadata` object (the
/// Template Engine only sees `ResourceObject::data`, not the Rust-side
/// `ObjectMeta`) so templates like `{{ ago(.metadata.creationTimestamp) }}`
/// resolve the same way they would against a raw Kubernetes object.
pub fn template_context(resource: &ResourceObject) -> serde_json::Value {
    let mut obj = resource.data.as_object().cloned().unwrap_or_default();
    obj.insert(
        "metadata".to_string(),
        serde_json::json!({
            "name": resource.metadata.name,
            "namespace": resource.metadata.namespace,
            "creationTimestamp": resource.metadata.creation_timestamp.map(|t| t.to_rfc3339()),
        }),
    );
    serde_json::Value::Object(obj)
}
