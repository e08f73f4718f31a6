//! Ingress row rendering (spec.md §4.8).

use fleet_model::{ResourceKind, ResourceObject};
use serde_json::Value as Json;

use super::common::{age_cell, dash_if_empty_with, identity, name_and_namespace_cells};
use super::{RowOutput, SortValue, Transformer};
use crate::template::TemplateEngine;

pub struct IngressTransformer;

fn hosts(resource: &ResourceObject) -> Vec<String> {
    resource
        .field("/spec/rules")
        .and_then(Json::as_array)
        .map(|rules| {
            rules
                .iter()
                .filter_map(|r| r.get("host").and_then(Json::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// First 3 hosts, then `"+ N more..."` once the total exceeds 4
/// (spec.md §4.8: "first 3 + `\"+ N more...\"` when >4").
fn hosts_cell(resource: &ResourceObject) -> String {
    let hosts = hosts(resource);
    if hosts.is_empty() {
        return "-".to_string();
    }
    if hosts.len() > 4 {
        let shown = hosts[..3].join(",");
        format!("{shown},+ {} more...", hosts.len() - 3)
    } else {
        hosts.join(",")
    }
}

fn address_cell(resource: &ResourceObject) -> String {
    let entries = resource
        .field("/status/loadBalancer/ingress")
        .and_then(Json::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|i| {
                    i.get("ip")
                        .or_else(|| i.get("hostname"))
                        .and_then(Json::as_str)
                })
                .map(str::to_string)
                .collect::<Vec<_>>()
                .join(",")
        });
    dash_if_empty_with(entries, "<none>")
}

fn has_tls(resource: &ResourceObject) -> bool {
    resource
        .field("/spec/tls")
        .and_then(Json::as_array)
        .is_some_and(|tls| !tls.is_empty())
}

fn ports_cell(resource: &ResourceObject) -> &'static str {
    if has_tls(resource) {
        "80, 443"
    } else {
        "80"
    }
}

impl Transformer for IngressTransformer {
    fn headers(&self, show_namespace: bool, multi_context: bool) -> Vec<String> {
        let mut headers = Vec::new();
        if multi_context {
            headers.push("CONTEXT".to_string());
        }
        headers.push("NAME".to_string());
        if show_namespace {
            headers.push("NAMESPACE".to_string());
        }
        headers.extend(["CLASS", "HOSTS", "ADDRESS", "PORTS", "AGE"].map(str::to_string));
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
        cells.push(dash_if_empty_with(
            resource
                .field("/spec/ingressClassName")
                .and_then(Json::as_str)
                .map(str::to_string),
            "<none>",
        ));
        cells.push(hosts_cell(resource));
        cells.push(address_cell(resource));
        cells.push(ports_cell(resource).to_string());
        cells.push(age_cell(resource));
        (cells, identity(context, ResourceKind::Ingress, resource))
    }

    fn sort_value(&self, resource: &ResourceObject, column: &str) -> SortValue {
        match column {
            "NAME" => SortValue::Text(resource.metadata.name.clone()),
            "NAMESPACE" => SortValue::Text(resource.metadata.namespace.clone().unwrap_or_default()),
            "CLASS" => SortValue::Text(
                resource
                    .field("/spec/ingressClassName")
                    .and_then(Json::as_str)
                    .unwrap_or_default()
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
