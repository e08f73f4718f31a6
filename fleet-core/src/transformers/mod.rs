//! Transformer Registry (spec.md §4.8): maps each supported
//! `ResourceKind` to the logic that turns a `ResourceObject` into
//! table headers, a row of cells, sortable values, and (for kinds that
//! support it) grouped aggregates.
//!
//! Cell rendering is split between Rust code (the bulk of per-kind
//! formatting, which is fixed and performance-sensitive) and the
//! Template Engine (`crate::template::TemplateEngine`) for the one
//! column spec.md calls out as "template-driven but with documented
//! fallback" (Service age). Every transformer receives the engine so
//! it can register and fall back the same way.

mod common;
mod configmap;
mod deployment;
mod ingress;
mod pod;
mod secret;
mod service;
mod statefulset;

use std::collections::HashMap;

use fleet_model::{ResourceIdentity, ResourceKind, ResourceObject};

use crate::template::TemplateEngine;

/// A comparable cell value for sorting (spec.md §4.8 `SortValue`).
/// Unknown columns return the column name itself as a `Text`, per spec.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Text(String),
    Number(f64),
}

impl SortValue {
    pub fn unknown_column(column: &str) -> Self {
        SortValue::Text(column.to_string())
    }
}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => a.partial_cmp(b),
            (SortValue::Text(a), SortValue::Text(b)) => a.partial_cmp(b),
            // Mixed comparisons shouldn't arise within one column; fall
            // back to comparing the display text so sorting stays total.
            (a, b) => a.to_display_string().partial_cmp(&b.to_display_string()),
        }
    }
}

impl SortValue {
    pub fn to_display_string(&self) -> String {
        match self {
            SortValue::Text(s) => s.clone(),
            SortValue::Number(n) => n.to_string(),
        }
    }
}

/// One row worth of output: its identity plus cell strings in header
/// order.
pub type RowOutput = (Vec<String>, ResourceIdentity);

/// Per-kind row production (spec.md §4.8).
pub trait Transformer: Send + Sync {
    fn headers(&self, show_namespace: bool, multi_context: bool) -> Vec<String>;

    fn row(
        &self,
        context: &str,
        resource: &ResourceObject,
        show_namespace: bool,
        engine: &TemplateEngine,
    ) -> RowOutput;

    fn sort_value(&self, resource: &ResourceObject, column: &str) -> SortValue;

    fn can_group(&self) -> bool {
        false
    }

    /// The key used to group resources that should aggregate into one
    /// row (Deployments group by `(namespace, name)`; kinds that don't
    /// group return `None`).
    fn unique_key(&self, _resource: &ResourceObject) -> Option<String> {
        None
    }

    /// Aggregation contract (spec.md §4.8): identity from the first
    /// resource, counters summed, age the minimum creation timestamp,
    /// template-derived columns from the first resource. `resources`
    /// MUST be non-empty and share `unique_key`.
    fn aggregate(
        &self,
        _context: &str,
        _resources: &[&ResourceObject],
        _show_namespace: bool,
        _engine: &TemplateEngine,
    ) -> Option<RowOutput> {
        None
    }
}

/// Fixed, closed mapping from `ResourceKind` to its `Transformer`
/// (spec.md §4.8 lists exactly these seven kinds; custom resources are
/// an explicit Non-goal).
pub struct TransformerRegistry {
    transformers: HashMap<ResourceKind, Box<dyn Transformer>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        let mut transformers: HashMap<ResourceKind, Box<dyn Transformer>> = HashMap::new();
        transformers.insert(ResourceKind::Pod, Box::new(pod::PodTransformer));
        transformers.insert(ResourceKind::Deployment, Box::new(deployment::DeploymentTransformer));
        transformers.insert(ResourceKind::StatefulSet, Box::new(statefulset::StatefulSetTransformer));
        transformers.insert(ResourceKind::Service, Box::new(service::ServiceTransformer));
        transformers.insert(ResourceKind::Ingress, Box::new(ingress::IngressTransformer));
        transformers.insert(ResourceKind::ConfigMap, Box::new(configmap::ConfigMapTransformer));
        transformers.insert(ResourceKind::Secret, Box::new(secret::SecretTransformer));
        Self { transformers }
    }

    pub fn get(&self, kind: ResourceKind) -> &dyn Transformer {
        self.transformers[&kind].as_ref()
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
