//! Deployment row rendering and aggregation (spec.md §4.8). Deployments
//! are the only kind that groups (`can_group`); aggregation merges
//! resources sharing a `(namespace, name)` unique key — the case where
//! the same Deployment name is seen across multiple contexts and the
//! caller asked for a grouped view.

use fleet_model::{ObjectMeta, ResourceIdentity, ResourceKind, ResourceObject};
use serde_json::Value as Json;

use super::common::{age_cell, identity, join_map, name_and_namespace_cells};
use super::{RowOutput, SortValue, Transformer};
use crate::template::TemplateEngine;

pub struct DeploymentTransformer;

fn containers(resource: &ResourceObject) -> Vec<&Json> {
    resource
        .field("/spec/template/spec/containers")
        .and_then(Json::as_array)
        .map(|v| v.iter().collect())
        .unwrap_or_default()
}

fn container_names(resource: &ResourceObject) -> String {
    containers(resource)
        .iter()
        .filter_map(|c| c.get("name").and_then(Json::as_str))
        .collect::<Vec<_>>()
        .join(",")
}

fn images(resource: &ResourceObject) -> String {
    containers(resource)
        .iter()
        .filter_map(|c| c.get("image").and_then(Json::as_str))
        .collect::<Vec<_>>()
        .join(",")
}

fn selector(resource: &ResourceObject) -> String {
    resource
        .field("/spec/selector/matchLabels")
        .and_then(Json::as_object)
        .map(join_map)
        .unwrap_or_default()
}

fn u64_field(resource: &ResourceObject, pointer: &str) -> u64 {
    resource.field(pointer).and_then(Json::as_u64).unwrap_or(0)
}

fn ready_cell(resource: &ResourceObject) -> String {
    let ready = u64_field(resource, "/status/readyReplicas");
    let desired = resource
        .field("/spec/replicas")
        .and_then(Json::as_u64)
        .unwrap_or_else(|| u64_field(resource, "/status/replicas"));
    format!("{ready}/{desired}")
}

impl Transformer for DeploymentTransformer {
    fn headers(&self, show_namespace: bool, multi_context: bool) -> Vec<String> {
        let mut headers = Vec::new();
        if multi_context {
            headers.push("CONTEXT".to_string());
        }
        headers.push("NAME".to_string());
        if show_namespace {
            headers.push("NAMESPACE".to_string());
        }
        headers.extend(
            [
                "READY",
                "UP-TO-DATE",
                "AVAILABLE",
                "AGE",
                "CONTAINERS",
                "IMAGES",
                "SELECTOR",
            ]
            .map(str::to_string),
        );
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
        cells.push(ready_cell(resource));
        cells.push(u64_field(resource, "/status/updatedReplicas").to_string());
        cells.push(u64_field(resource, "/status/availableReplicas").to_string());
        cells.push(age_cell(resource));
        cells.push(container_names(resource));
        cells.push(images(resource));
        cells.push(selector(resource));
        (cells, identity(context, ResourceKind::Deployment, resource))
    }

    fn sort_value(&self, resource: &ResourceObject, column: &str) -> SortValue {
        match column {
            "NAME" => SortValue::Text(resource.metadata.name.clone()),
            "NAMESPACE" => SortValue::Text(resource.metadata.namespace.clone().unwrap_or_default()),
            "READY" => SortValue::Number(u64_field(resource, "/status/readyReplicas") as f64),
            "UP-TO-DATE" => SortValue::Number(u64_field(resource, "/status/updatedReplicas") as f64),
            "AVAILABLE" => SortValue::Number(u64_field(resource, "/status/availableReplicas") as f64),
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

    fn can_group(&self) -> bool {
        true
    }

    fn unique_key(&self, resource: &ResourceObject) -> Option<String> {
        Some(format!(
            "{}/{}",
            resource.metadata.namespace.as_deref().unwrap_or_default(),
            resource.metadata.name
        ))
    }

    fn aggregate(
        &self,
        context: &str,
        resources: &[&ResourceObject],
        show_namespace: bool,
        engine: &TemplateEngine,
    ) -> Option<RowOutput> {
        let first = *resources.first()?;
        let (_, base_identity) = self.row(context, first, show_namespace, engine);

        let ready: u64 = resources.iter().map(|r| u64_field(r, "/status/readyReplicas")).sum();
        let desired: u64 = resources
            .iter()
            .map(|r| {
                r.field("/spec/replicas")
                    .and_then(Json::as_u64)
                    .unwrap_or_else(|| u64_field(r, "/status/replicas"))
            })
            .sum();
        let updated: u64 = resources.iter().map(|r| u64_field(r, "/status/updatedReplicas")).sum();
        let available: u64 = resources
            .iter()
            .map(|r| u64_field(r, "/status/availableReplicas"))
            .sum();
        let min_created = resources
            .iter()
            .filter_map(|r| r.metadata.creation_timestamp)
            .min();

        let mut cells = name_and_namespace_cells(first, show_namespace);
        cells.push(format!("{ready}/{desired}"));
        cells.push(updated.to_string());
        cells.push(available.to_string());
        cells.push(match min_created {
            Some(ts) => crate::formatting::format_age(ts, chrono::Utc::now()),
            None => "unknown".to_string(),
        });
        cells.push(container_names(first));
        cells.push(images(first));
        cells.push(selector(first));

        Some((
            cells,
            ResourceIdentity::new(
                base_identity.context.clone(),
                first.metadata.namespace.clone().unwrap_or_default(),
                ResourceKind::Deployment,
                first.metadata.name.clone(),
                first.metadata.uid.clone(),
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment(data: Json) -> ResourceObject {
        ResourceObject::new(
            ObjectMeta {
                name: "api".to_string(),
                namespace: Some("default".to_string()),
                uid: Some("u-1".to_string()),
                creation_timestamp: Some(chrono::Utc::now()),
                labels: Default::default(),
            },
            data,
        )
    }

    #[test]
    fn aggregate_sums_counters_and_keeps_first_images() {
        let a = deployment(json!({
            "spec": {"replicas": 3, "template": {"spec": {"containers": [{"name": "api", "image": "api:1"}]}}},
            "status": {"readyReplicas": 3, "updatedReplicas": 3, "availableReplicas": 3}
        }));
        let b = deployment(json!({
            "spec": {"replicas": 2},
            "status": {"readyReplicas": 1, "updatedReplicas": 2, "availableReplicas": 1}
        }));
        let engine = TemplateEngine::new(16);
        let (cells, _) = DeploymentTransformer
            .aggregate("prod", &[&a, &b], false, &engine)
            .unwrap();
        assert_eq!(cells[1], "4/5");
        assert_eq!(cells[2], "5");
        assert_eq!(cells[3], "4");
        assert_eq!(cells[5], "api");
    }
}
