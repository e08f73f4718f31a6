//! Secret row rendering (spec.md §4.8): name, [namespace], type, data
//! count, age. The only difference from ConfigMap is the extra `type`
//! column.

use fleet_model::{ResourceKind, ResourceObject};
use serde_json::Value as Json;

use super::common::{age_cell, identity, name_and_namespace_cells};
use super::{RowOutput, SortValue, Transformer};
use crate::template::TemplateEngine;

pub struct SecretTransformer;

fn data_count(resource: &ResourceObject) -> usize {
    resource.field("/data").and_then(Json::as_object).map_or(0, |m| m.len())
}

fn secret_type(resource: &ResourceObject) -> String {
    resource
        .field("/type")
        .and_then(Json::as_str)
        .unwrap_or("Opaque")
        .to_string()
}

impl Transformer for SecretTransformer {
    fn headers(&self, show_namespace: bool, multi_context: bool) -> Vec<String> {
        let mut headers = Vec::new();
        if multi_context {
            headers.push("CONTEXT".to_string());
        }
        headers.push("NAME".to_string());
        if show_namespace {
            headers.push("NAMESPACE".to_string());
        }
        headers.extend(["TYPE", "DATA", "AGE"].map(str::to_string));
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
        cells.push(secret_type(resource));
        cells.push(data_count(resource).to_string());
        cells.push(age_cell(resource));
        (cells, identity(context, ResourceKind::Secret, resource))
    }

    fn sort_value(&self, resource: &ResourceObject, column: &str) -> SortValue {
        match column {
            "NAME" => SortValue::Text(resource.metadata.name.clone()),
            "NAMESPACE" => SortValue::Text(resource.metadata.namespace.clone().unwrap_or_default()),
            "TYPE" => SortValue::Text(secret_type(resource)),
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
    fn type_defaults_to_opaque() {
        let resource = ResourceObject::new(
            ObjectMeta {
                name: "tls-cert".to_string(),
                namespace: Some("default".to_string()),
                creation_timestamp: Some(chrono::Utc::now()),
                ..Default::default()
            },
            json!({"data": {"tls.crt": "...", "tls.key": "..."}}),
        );
        let engine = TemplateEngine::new(16);
        let (cells, _) = SecretTransformer.row("prod", &resource, false, &engine);
        assert_eq!(cells[1], "Opaque");
        assert_eq!(cells[2], "2");
    }
}
