//! ConfigMap row rendering (spec.md §4.8): name, [namespace], data
//! count, age.

use fleet_model::{ResourceKind, ResourceObject};
use serde_json::Value as Json;

use super::common::{age_cell, identity, name_and_namespace_cells};
use super::{RowOutput, SortValue, Transformer};
use crate::template::TemplateEngine;

pub struct ConfigMapTransformer;

fn data_count(resource: &ResourceObject) -> usize {
    resource.field("/data").and_then(Json::as_object).map_or(0, |m| m.len())
}

impl Transformer for ConfigMapTransformer {
    fn headers(&self, show_namespace: bool, multi_context: bool) -> Vec<String> {
        let mut headers = Vec::new();
        if multi_context {
            headers.push("CONTEXT".to_string());
        }
        headers.push("NAME".to_string());
        if show_namespace {
            headers.push("NAMESPACE".to_string());
        }
        headers.push("DATA".to_string());
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
        let mut cells = name_and_namespace_cells(resource, show_namespace);
        cells.push(data_count(resource).to_string());
        cells.push(age_cell(resource));
        (cells, identity(context, ResourceKind::ConfigMap, resource))
    }

    fn sort_value(&self, resource: &ResourceObject, column: &str) -> SortValue {
        match column {
            "NAME" => SortValue::Text(resource.metadata.name.clone()),
            "NAMESPACE" => SortValue::Text(resource.metadata.namespace.clone().unwrap_or_default()),
            "DATA" => SortValue::Number(data_count(resource) as f64),
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

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_model::ObjectMeta;
    use serde_json::json;

    #[test]
    fn data_cell_counts_keys() {
        let resource = ResourceObject::new(
            ObjectMeta {
                name: "app-config".to_string(),
                namespace: Some("default".to_string()),
                creation_timestamp: Some(chrono::Utc::now()),
                ..Default::default()
            },
            json!({"data": {"a": "1", "b": "2", "c": "3"}}),
        );
        let engine = TemplateEngine::new(16);
        let (cells, _) = ConfigMapTransformer.row("prod", &resource, false, &engine);
        assert_eq!(cells[1], "3");
    }
}
