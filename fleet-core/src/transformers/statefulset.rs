//! StatefulSet row rendering (spec.md §4.8): the simplest table, just
//! name/[namespace]/ready/age.

use fleet_model::{ResourceKind, ResourceObject};
use serde_json::Value as Json;

use super::common::{age_cell, identity, name_and_namespace_cells};
use super::{RowOutput, SortValue, Transformer};
use crate::template::TemplateEngine;

pub struct StatefulSetTransformer;

fn u64_field(resource: &ResourceObject, pointer: &str) -> u64 {
    resource.field(pointer).and_then(Json::as_u64).unwrap_or(0)
}

impl Transformer for StatefulSetTransformer {
    fn headers(&self, show_namespace: bool, multi_context: bool) -> Vec<String> {
        let mut headers = Vec::new();
        if multi_context {
            headers.push("CONTEXT".to_string());
        }
        headers.push("NAME".to_string());
        if show_namespace {
            headers.push("NAMESPACE".to_string());
        }
        headers.push("READY".to_string());
        headers.push("AGE".to_string());
        headers
    }

    fn row(
        &self,
        context: &str,
        resource: &ResourceObject,
        show_namespace: bool,
        _engine: &TemplateEngine,
    ) -> RowOutput {
        let ready = u64_field(resource, "/status/readyReplicas");
        let desired = resource
            .field("/spec/replicas")
            .and_then(Json::as_u64)
            .unwrap_or_else(|| u64_field(resource, "/status/replicas"));
        let mut cells = name_and_namespace_cells(resource, show_namespace);
        cells.push(format!("{ready}/{desired}"));
        cells.push(age_cell(resource));
        (cells, identity(context, ResourceKind::StatefulSet, resource))
    }

    fn sort_value(&self, resource: &ResourceObject, column: &str) -> SortValue {
        match column {
            "NAME" => SortValue::Text(resource.metadata.name.clone()),
            "NAMESPACE" => SortValue::Text(resource.metadata.namespace.clone().unwrap_or_default()),
            "READY" => SortValue::Number(u64_field(resource, "/status/readyReplicas") as f64),
            "AGE" => SortValue::Number(
                resource
                    .metadata
                    .creation_timestamp
                    .map(|ts| ts.timestamp() as f64)
                    .unwrap_or(0.0),
            ),
            other => SortValue::unknown_column(other),
        }
    }
}
