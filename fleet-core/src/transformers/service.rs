//! Service row rendering (spec.md §4.8). The `age` column is the one
//! spec.md calls out as "template-driven but with documented
//! fallback": rendered through a named template so deployments of this
//! crate can restyle it without a code change, falling back to the
//! plain `age_cell` formatting if the template is missing or fails to
//! execute (spec.md §7: template errors must never blank a cell).

use fleet_model::{ResourceKind, ResourceObject};
use serde_json::Value as Json;

use super::common::{age_cell, dash_if_empty, identity, name_and_namespace_cells, template_context};
use super::{RowOutput, SortValue, Transformer};
use crate::template::TemplateEngine;

pub struct ServiceTransformer;

const AGE_TEMPLATE_NAME: &str = "service.age";
const AGE_TEMPLATE_SOURCE: &str = "{{ ago(.metadata.creationTimestamp) }}";

fn ports_cell(resource: &ResourceObject) -> String {
    let Some(Json::Array(ports)) = resource.field("/spec/ports") else {
        return "-".to_string();
    };
    if ports.is_empty() {
        return "-".to_string();
    }
    ports
        .iter()
        .filter_map(|p| {
            let port = p.get("port").and_then(Json::as_u64)?;
            let protocol = p.get("protocol").and_then(Json::as_str).unwrap_or("TCP");
            Some(match p.get("nodePort").and_then(Json::as_u64) {
                Some(node_port) => format!("{port}:{node_port}/{protocol}"),
                None => format!("{port}/{protocol}"),
            })
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn age_with_fallback(resource: &ResourceObject, engine: &TemplateEngine) -> String {
    if engine.register_named(AGE_TEMPLATE_NAME, AGE_TEMPLATE_SOURCE).is_ok() {
        if let Ok(rendered) = engine.execute_named(AGE_TEMPLATE_NAME, &template_context(resource)) {
            return rendered;
        }
    }
    age_cell(resource)
}

impl Transformer for ServiceTransformer {
    fn headers(&self, show_namespace: bool, multi_context: bool) -> Vec<String> {
        let mut headers = Vec::new();
        if multi_context {
            headers.push("CONTEXT".to_string());
        }
        headers.push("NAME".to_string());
        if show_namespace {
            headers.push("NAMESPACE".to_string());
        }
        headers.extend(["TYPE", "CLUSTER-IP", "PORTS", "AGE"].map(str::to_string));
        headers
    }

    fn row(
        &self,
        context: &str,
        resource: &ResourceObject,
        show_namespace: bool,
        engine: &TemplateEngine,
    ) -> RowOutput {
        let mut cells = name_and_namespace_cells(resource, show_namespace);
        cells.push(
            resource
                .field("/spec/type")
                .and_then(Json::as_str)
                .unwrap_or("ClusterIP")
                .to_string(),
        );
        cells.push(dash_if_empty(
            resource
                .field("/spec/clusterIP")
                .and_then(Json::as_str)
                .map(str::to_string),
        ));
        cells.push(ports_cell(resource));
        cells.push(age_with_fallback(resource, engine));
        (cells, identity(context, ResourceKind::Service, resource))
    }

    fn sort_value(&self, resource: &ResourceObject, column: &str) -> SortValue {
        match column {
            "NAME" => SortValue::Text(resource.metadata.name.clone()),
            "NAMESPACE" => SortValue::Text(resource.metadata.namespace.clone().unwrap_or_default()),
            "TYPE" => SortValue::Text(
                resource
                    .field("/spec/type")
                    .and_then(Json::as_str)
                    .unwrap_or("ClusterIP")
                    .to_string(),
            ),
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
    fn ports_cell_joins_with_protocol() {
        let resource = ResourceObject::new(
            ObjectMeta {
                name: "web".to_string(),
                namespace: Some("default".to_string()),
                creation_timestamp: Some(chrono::Utc::now()),
                ..Default::default()
            },
            json!({
                "spec": {
                    "type": "NodePort",
                    "clusterIP": "10.0.0.1",
                    "ports": [{"port": 80, "nodePort": 30080, "protocol": "TCP"}]
                }
            }),
        );
        let engine = TemplateEngine::new(16);
        let (cells, _) = ServiceTransformer.row("prod", &resource, false, &engine);
        assert_eq!(cells[2], "NodePort");
        assert_eq!(cells[3], "10.0.0.1");
        assert_eq!(cells[4], "80:30080/TCP");
    }

    #[test]
    fn age_falls_back_when_creation_timestamp_missing() {
        let resource = ResourceObject::new(ObjectMeta::default(), json!({}));
        let engine = TemplateEngine::new(16);
        let (cells, _) = ServiceTransformer.row("prod", &resource, false, &engine);
        assert_eq!(cells.last().unwrap(), "unknown");
    }
}
