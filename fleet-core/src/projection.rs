//! Row Projection (spec.md §4.7): turns the current resource set for a
//! kind — possibly decorated with originating context, possibly from
//! several contexts at once — into an ordered `RowSnapshot` via the
//! Transformer Registry and the Template Engine.
//!
//! Grouping/aggregation (spec.md §4.8) is applied before sorting: when
//! the caller asks for a grouped view and the kind's transformer
//! supports it (`Transformer::can_group`), resources sharing a
//! `unique_key` collapse into one aggregated row first.

use std::cmp::Ordering;
use std::collections::HashMap;

use fleet_model::{Row, RowSnapshot, ResourceKind, ResourceObject, SortDirection};

use crate::template::TemplateEngine;
use crate::transformers::{SortValue, TransformerRegistry};

/// Display/sort options a caller supplies for one projection
/// (spec.md §4.7's sort column/direction, §4.8's `show_namespace`,
/// `multi_context`, and grouping toggle).
#[derive(Debug, Clone)]
pub struct ProjectionOptions {
    pub show_namespace: bool,
    pub multi_context: bool,
    pub group: bool,
    pub sort_column: String,
    pub sort_direction: SortDirection,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            show_namespace: false,
            multi_context: false,
            group: false,
            sort_column: "NAME".to_string(),
            sort_direction: SortDirection::Ascending,
        }
    }
}

/// Intermediate row before the cells are frozen into `fleet_model::Row`:
/// carries the `SortValue` the comparator needs and is discarded once
/// sorting is done.
struct Projected {
    cells: Vec<String>,
    identity: fleet_model::ResourceIdentity,
    sort_value: SortValue,
}

pub struct RowProjector<'a> {
    registry: &'a TransformerRegistry,
    engine: &'a TemplateEngine,
}

impl<'a> RowProjector<'a> {
    pub fn new(registry: &'a TransformerRegistry, engine: &'a TemplateEngine) -> Self {
        Self { registry, engine }
    }

    /// Projects `resources` (each tagged with its originating context)
    /// into an ordered snapshot.
    ///
    /// Ordering (spec.md §4.7): primary is `options.sort_column`/
    /// `sort_direction` via the transformer's `SortValue`; secondary is
    /// name ascending; tertiary is context ascending — both tiebreaks
    /// applied regardless of the primary direction.
    pub fn project(
        &self,
        kind: ResourceKind,
        resources: &[(String, ResourceObject)],
        options: &ProjectionOptions,
    ) -> RowSnapshot {
        let transformer = self.registry.get(kind);

        let mut projected: Vec<Projected> = if options.group && transformer.can_group() {
            project_grouped(
                transformer,
                self.engine,
                resources,
                options.show_namespace,
                &options.sort_column,
            )
        } else {
            resources
                .iter()
                .map(|(context, resource)| {
                    let (cells, identity) =
                        transformer.row(context, resource, options.show_namespace, self.engine);
                    let sort_value = transformer.sort_value(resource, &options.sort_column);
                    Projected {
                        cells,
                        identity,
                        sort_value,
                    }
                })
                .collect()
        };

        if options.multi_context {
            for p in &mut projected {
                p.cells.insert(0, p.identity.context.clone());
            }
        }

        projected.sort_by(|a, b| compare(a, b, options.sort_direction));

        let rows = projected
            .into_iter()
            .map(|p| Row {
                cells: p.cells,
                identity: p.identity,
            })
            .collect();

        RowSnapshot {
            rows,
            sort_column: options.sort_column.clone(),
            sort_direction: options.sort_direction,
        }
    }

}

/// Groups `resources` by `Transformer::unique_key` (ignoring context,
/// the case "the same Deployment name is seen across multiple
/// contexts") and aggregates each group into one row (spec.md §4.8).
/// Group order follows first-seen order, not hash order, so an
/// unsorted projection stays deterministic. The aggregate's context and
/// `SortValue` are both taken from the group's first resource, matching
/// the aggregation contract's "template-derived columns use the first
/// resource".
fn project_grouped(
    transformer: &dyn crate::transformers::Transformer,
    engine: &TemplateEngine,
    resources: &[(String, ResourceObject)],
    show_namespace: bool,
    sort_column: &str,
) -> Vec<Projected> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&(String, ResourceObject)>> = HashMap::new();
    for entry @ (_, resource) in resources {
        let Some(key) = transformer.unique_key(resource) else {
            continue;
        };
        let group = groups.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        group.push(entry);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let members = groups.remove(&key)?;
            let (first_context, _) = members.first()?;
            let refs: Vec<&ResourceObject> = members.iter().map(|(_, r)| r).collect();
            let (cells, identity) = transformer.aggregate(first_context, &refs, show_namespace, engine)?;
            let sort_value = transformer.sort_value(refs[0], sort_column);
            Some(Projected {
                cells,
                identity,
                sort_value,
            })
        })
        .collect()
}

fn compare(a: &Projected, b: &Projected, direction: SortDirection) -> Ordering {
    let primary = a
        .sort_value
        .partial_cmp(&b.sort_value)
        .unwrap_or(Ordering::Equal);
    let primary = match direction {
        SortDirection::Ascending => primary,
        SortDirection::Descending => primary.reverse(),
    };
    primary
        .then_with(|| a.identity.name.cmp(&b.identity.name))
        .then_with(|| a.identity.context.cmp(&b.identity.context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_model::ObjectMeta;
    use serde_json::json;

    fn pod(context: &str, name: &str, uid: &str) -> (String, ResourceObject) {
        (
            context.to_string(),
            ResourceObject::new(
                ObjectMeta {
                    name: name.to_string(),
                    namespace: Some("default".to_string()),
                    uid: Some(uid.to_string()),
                    creation_timestamp: Some(chrono::Utc::now()),
                    labels: Default::default(),
                },
                json!({"status": {"phase": "Running"}}),
            ),
        )
    }

    fn deployment(context: &str, name: &str, ready: u64, desired: u64) -> (String, ResourceObject) {
        (
            context.to_string(),
            ResourceObject::new(
                ObjectMeta {
                    name: name.to_string(),
                    namespace: Some("default".to_string()),
                    uid: Some(format!("{context}-{name}")),
                    creation_timestamp: Some(chrono::Utc::now()),
                    labels: Default::default(),
                },
                json!({"spec": {"replicas": desired}, "status": {"readyReplicas": ready}}),
            ),
        )
    }

    #[test]
    fn multi_context_prepends_context_cell() {
        let registry = TransformerRegistry::new();
        let engine = TemplateEngine::new(16);
        let projector = RowProjector::new(&registry, &engine);
        let resources = vec![pod("staging", "web-1", "u-1")];
        let options = ProjectionOptions {
            multi_context: true,
            ..Default::default()
        };
        let snapshot = projector.project(ResourceKind::Pod, &resources, &options);
        assert_eq!(snapshot.rows[0].cells[0], "staging");
        assert_eq!(snapshot.rows[0].cells[1], "web-1");
    }

    #[test]
    fn ties_break_by_name_then_context() {
        let registry = TransformerRegistry::new();
        let engine = TemplateEngine::new(16);
        let projector = RowProjector::new(&registry, &engine);
        let resources = vec![
            pod("staging", "web-1", "u-1"),
            pod("prod", "web-1", "u-2"),
            pod("prod", "app-0", "u-3"),
        ];
        let options = ProjectionOptions {
            sort_column: "STATUS".to_string(),
            ..Default::default()
        };
        let snapshot = projector.project(ResourceKind::Pod, &resources, &options);
        let names: Vec<_> = snapshot.rows.iter().map(|r| r.identity.name.clone()).collect();
        // Equal STATUS for all three rows, so order falls to name asc
        // then context asc: app-0, then web-1/prod before web-1/staging.
        assert_eq!(names, vec!["app-0", "web-1", "web-1"]);
        assert_eq!(snapshot.rows[1].identity.context, "prod");
        assert_eq!(snapshot.rows[2].identity.context, "staging");
    }

    #[test]
    fn grouped_deployment_sums_across_contexts() {
        let registry = TransformerRegistry::new();
        let engine = TemplateEngine::new(16);
        let projector = RowProjector::new(&registry, &engine);
        let resources = vec![
            deployment("staging", "api", 3, 3),
            deployment("prod", "api", 1, 2),
        ];
        let options = ProjectionOptions {
            group: true,
            ..Default::default()
        };
        let snapshot = projector.project(ResourceKind::Deployment, &resources, &options);
        assert_eq!(snapshot.rows.len(), 1);
        assert_eq!(snapshot.rows[0].cells[1], "4/5");
    }

    #[test]
    fn ungrouped_deployment_keeps_one_row_per_context() {
        let registry = TransformerRegistry::new();
        let engine = TemplateEngine::new(16);
        let projector = RowProjector::new(&registry, &engine);
        let resources = vec![
            deployment("staging", "api", 3, 3),
            deployment("prod", "api", 1, 2),
        ];
        let options = ProjectionOptions::default();
        let snapshot = projector.project(ResourceKind::Deployment, &resources, &options);
        assert_eq!(snapshot.rows.len(), 2);
    }
}
