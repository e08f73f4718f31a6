//! Pod row rendering (spec.md §4.8).
//!
//! CPU/memory usage is not carried on the raw Kubernetes pod object; the
//! Fleet Client merges `PodMetrics` (spec.md §6, fetched separately via
//! `ClusterClient::list_pod_metrics`) onto the resource at
//! `/status/usage/cpuMillicores` and `/status/usage/memoryBytes` before
//! handing it to this transformer. Their absence (no metrics server, or
//! the optional call returning `None`) is not an error; the cell
//! degrades to `"-"`.

use fleet_model::ResourceKind;
use serde_json::Value as Json;

use super::common::{age_cell, dash_if_empty, identity, name_and_namespace_cells, str_field};
use super::{RowOutput, SortValue, Transformer};
use crate::formatting;
use crate::styling::threshold_style;
use crate::template::TemplateEngine;

pub struct PodTransformer;

struct ContainerStatus {
    ready: bool,
    restart_count: u64,
    waiting_reason: Option<String>,
    terminated_reason: Option<String>,
    terminated_finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn container_statuses(resource: &fleet_model::ResourceObject) -> Vec<ContainerStatus> {
    let Some(Json::Array(items)) = resource.field("/status/containerStatuses") else {
        return Vec::new();
    };
    items
        .iter()
        .map(|c| {
            let ready = c.get("ready").and_then(Json::as_bool).unwrap_or(false);
            let restart_count = c.get("restartCount").and_then(Json::as_u64).unwrap_or(0);
            let state = c.get("state");
            let waiting_reason = state
                .and_then(|s| s.get("waiting"))
                .and_then(|w| w.get("reason"))
                .and_then(Json::as_str)
                .map(str::to_string);
            let terminated = state.and_then(|s| s.get("terminated"));
            let terminated_reason = terminated
                .and_then(|t| t.get("reason"))
                .and_then(Json::as_str)
                .map(str::to_string);
            let terminated_finished_at = terminated
                .and_then(|t| t.get("finishedAt"))
                .and_then(Json::as_str)
                .and_then(formatting::parse_timestamp);
            ContainerStatus {
                ready,
                restart_count,
                waiting_reason,
                terminated_reason,
                terminated_finished_at,
            }
        })
        .collect()
}

fn ready_cell(statuses: &[ContainerStatus]) -> String {
    let ready = statuses.iter().filter(|c| c.ready).count();
    format!("{ready}/{}", statuses.len())
}

fn status_cell(resource: &fleet_model::ResourceObject, statuses: &[ContainerStatus]) -> String {
    let phase = str_field(resource, "/status/phase").unwrap_or_else(|| "Unknown".to_string());
    statuses
        .iter()
        .find_map(|c| c.waiting_reason.clone().or_else(|| c.terminated_reason.clone()))
        .unwrap_or(phase)
}

fn restarts_cell(statuses: &[ContainerStatus]) -> String {
    let total: u64 = statuses.iter().map(|c| c.restart_count).sum();
    if total == 0 {
        return "0".to_string();
    }
    let last_termination = statuses.iter().filter_map(|c| c.terminated_finished_at).max();
    match last_termination {
        Some(ts) => format!("{total} ({} ago)", formatting::format_age(ts, chrono::Utc::now())),
        None => total.to_string(),
    }
}

fn cpu_cell(resource: &fleet_model::ResourceObject) -> String {
    let usage = resource.field("/status/usage/cpuMillicores").and_then(Json::as_u64);
    let Some(usage) = usage else {
        return "-".to_string();
    };
    let request = sum_container_field(resource, "cpu", formatting::parse_millicores);
    let text = formatting::format_millicores(usage);
    match request {
        Some(r) if r > 0 => threshold_style(usage as f64 / r as f64, &text),
        _ => text,
    }
}

fn memory_cell(resource: &fleet_model::ResourceObject) -> String {
    let usage = resource.field("/status/usage/memoryBytes").and_then(Json::as_u64);
    let Some(usage) = usage else {
        return "-".to_string();
    };
    let request = sum_container_field(resource, "memory", formatting::parse_memory_quantity);
    let text = formatting::humanize_bytes(usage);
    match request {
        Some(r) if r > 0 => threshold_style(usage as f64 / r as f64, &text),
        _ => text,
    }
}

fn sum_container_field(
    resource: &fleet_model::ResourceObject,
    field: &str,
    parse: impl Fn(&str) -> Option<u64>,
) -> Option<u64> {
    let Json::Array(containers) = resource.field("/spec/containers")? else {
        return None;
    };
    let mut total = 0u64;
    let mut any = false;
    for container in containers {
        if let Some(raw) = container
            .pointer(&format!("/resources/requests/{field}"))
            .and_then(Json::as_str)
        {
            if let Some(v) = parse(raw) {
                total += v;
                any = true;
            }
        }
    }
    any.then_some(total)
}

impl Transformer for PodTransformer {
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
            ["READY", "STATUS", "RESTARTS", "AGE", "CPU", "MEMORY", "IP", "NODE"]
                .map(str::to_string),
        );
        headers
    }

    fn row(
        &self,
        context: &str,
        resource: &fleet_model::ResourceObject,
        show_namespace: bool,
        _engine: &TemplateEngine,
    ) -> RowOutput {
        let statuses = container_statuses(resource);
        let mut cells = name_and_namespace_cells(resource, show_namespace);
        cells.push(ready_cell(&statuses));
        cells.push(status_cell(resource, &statuses));
        cells.push(restarts_cell(&statuses));
        cells.push(age_cell(resource));
        cells.push(cpu_cell(resource));
        cells.push(memory_cell(resource));
        cells.push(dash_if_empty(str_field(resource, "/status/podIP")));
        cells.push(dash_if_empty(str_field(resource, "/spec/nodeName")));
        (cells, identity(context, ResourceKind::Pod, resource))
    }

    fn sort_value(&self, resource: &fleet_model::ResourceObject, column: &str) -> SortValue {
        match column {
            "NAME" => SortValue::Text(resource.metadata.name.clone()),
            "NAMESPACE" => SortValue::Text(resource.metadata.namespace.clone().unwrap_or_default()),
            "READY" => {
                let statuses = container_statuses(resource);
                let ready = statuses.iter().filter(|c| c.ready).count();
                SortValue::Number(if statuses.is_empty() {
                    0.0
                } else {
                    ready as f64 / statuses.len() as f64
                })
            }
            "STATUS" => SortValue::Text(status_cell(resource, &container_statuses(resource))),
            "RESTARTS" => {
                let total: u64 = container_statuses(resource).iter().map(|c| c.restart_count).sum();
                SortValue::Number(total as f64)
            }
            "AGE" => SortValue::Number(
                resource
                    .metadata
                    .creation_timestamp
                    .map(|ts| ts.timestamp() as f64)
                    .unwrap_or(0.0),
            ),
            "NODE" => SortValue::Text(str_field(resource, "/spec/nodeName").unwrap_or_default()),
            "IP" => SortValue::Text(str_field(resource, "/status/podIP").unwrap_or_default()),
            other => SortValue::unknown_column(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_model::ObjectMeta;
    use serde_json::json;

    fn pod(data: Json) -> fleet_model::ResourceObject {
        fleet_model::ResourceObject::new(
            ObjectMeta {
                name: "web-1".to_string(),
                namespace: Some("default".to_string()),
                uid: Some("u-1".to_string()),
                creation_timestamp: Some(chrono::Utc::now()),
                labels: Default::default(),
            },
            data,
        )
    }

    #[test]
    fn ready_and_status_reflect_container_states() {
        let resource = pod(json!({
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    {"ready": true, "restartCount": 0, "state": {"running": {}}},
                    {"ready": false, "restartCount": 2, "state": {"waiting": {"reason": "CrashLoopBackOff"}}}
                ]
            }
        }));
        let engine = TemplateEngine::new(16);
        let (cells, _) = PodTransformer.row("prod", &resource, false, &engine);
        assert_eq!(cells[1], "1/2");
        assert_eq!(cells[2], "CrashLoopBackOff");
        assert_eq!(cells[3], "2");
    }

    #[test]
    fn cpu_cell_applies_threshold_style_against_request() {
        let resource = pod(json!({
            "spec": {"containers": [{"resources": {"requests": {"cpu": "1000m"}}}]},
            "status": {"usage": {"cpuMillicores": 950}}
        }));
        let engine = TemplateEngine::new(16);
        let (cells, _) = PodTransformer.row("prod", &resource, false, &engine);
        assert_eq!(cells[5], "<fg=red>950m</fg>");
    }

    #[test]
    fn missing_usage_renders_dash() {
        let resource = pod(json!({}));
        let engine = TemplateEngine::new(16);
        let (cells, _) = PodTransformer.row("prod", &resource, false, &engine);
        assert_eq!(cells[5], "-");
        assert_eq!(cells[6], "-");
        assert_eq!(cells[7], "-");
        assert_eq!(cells[8], "-");
    }
}
