use async_trait::async_trait;
use fleet_model::{FleetError, ResourceKind, ResourceObject, Row, WatchEvent};

use crate::cluster_client::{ByteStream, LogOptions};

/// One context's list failed while others in the same fan-out
/// succeeded (spec.md §4.7, §7): partial results are preferred over a
/// global failure.
#[derive(Debug, Clone)]
pub struct ContextError {
    pub context: String,
    pub error: String,
    pub transient: bool,
}

/// The result of an aggregated, multi-context list.
#[derive(Debug, Clone)]
pub struct AggregatedRows {
    pub rows: Vec<Row>,
    pub partial_errors: Vec<ContextError>,
}

/// The fleet client capability exposed to UI/orchestration layers
/// (spec.md §6). `fleet-core::FleetClient` is the sole implementation;
/// this trait exists so tests and any future alternate implementation
/// have a documented, stable surface to target.
#[async_trait]
pub trait FleetClientApi: Send + Sync {
    async fn list_kind_across_contexts(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<AggregatedRows, FleetError>;

    async fn subscribe_kind(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<tokio::sync::mpsc::Receiver<WatchEvent<ResourceObject>>, FleetError>;

    async fn delete(
        &self,
        context: &str,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), FleetError>;

    async fn logs(
        &self,
        context: &str,
        namespace: &str,
        pod: &str,
        options: LogOptions,
    ) -> Result<ByteStream, FleetError>;

    async fn invalidate_namespace(&self, namespace: &str);
}
