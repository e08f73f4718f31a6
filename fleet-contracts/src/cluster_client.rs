use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_model::{ChangeKind, ResourceKind, ResourceObject};
use futures::stream::BoxStream;
use std::pin::Pin;

/// Options accepted by `logs` (spec.md §6).
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub follow: bool,
    pub tail_lines: Option<i64>,
    pub previous: bool,
    pub since_time: Option<DateTime<Utc>>,
    pub timestamps: bool,
    pub container: Option<String>,
}

/// A single item of an upstream watch stream, before it is wrapped into
/// a `fleet_model::WatchEvent` with fleet-level context.
#[derive(Debug, Clone)]
pub struct RawWatchEvent {
    pub change_kind: ChangeKind,
    pub object: Option<ResourceObject>,
}

pub type ByteStream = Pin<Box<dyn futures::Stream<Item = std::io::Result<Vec<u8>>> + Send>>;
pub type WatchStream = BoxStream<'static, Result<RawWatchEvent, ClusterClientError>>;

/// Kinds of failure a `ClusterClient` call can surface, distinguished by
/// whether the Fleet Client's fan-out should retry them (spec.md §7).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClusterClientError {
    #[error("transient: {0}")]
    Transient(String),
    #[error("permanent: {0}")]
    Permanent(String),
}

impl ClusterClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ClusterClientError::Transient(_))
    }
}

/// The cluster client capability the Fleet Data Plane consumes
/// (spec.md §6). One implementation exists per context; the concrete
/// wire encoding and the HTTP/gRPC transport underneath it are
/// out-of-scope collaborators — this crate only fixes the shape of the
/// calls the core issues against them.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Lists all resources of `kind` in `namespace`, returning the items
    /// plus an opaque version token from the upstream list.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<(Vec<ResourceObject>, String), ClusterClientError>;

    /// Opens a watch stream for `kind` in `namespace`.
    async fn watch(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<WatchStream, ClusterClientError>;

    /// Deletes a named resource.
    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClusterClientError>;

    /// Streams log bytes for a pod's container.
    async fn logs(
        &self,
        namespace: &str,
        pod: &str,
        options: LogOptions,
    ) -> Result<ByteStream, ClusterClientError>;

    /// Lists namespace names — used by the Health Monitor's lightweight
    /// liveness probe.
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterClientError>;

    /// Pod CPU/memory metrics, keyed by pod name. Absence (`Ok(None)`)
    /// is not an error — metrics columns degrade to `"-"`.
    async fn list_pod_metrics(
        &self,
        namespace: &str,
    ) -> Result<Option<Vec<PodMetrics>>, ClusterClientError> {
        let _ = namespace;
        Ok(None)
    }

    /// Node CPU/memory metrics, keyed by node name.
    async fn list_node_metrics(&self) -> Result<Option<Vec<NodeMetrics>>, ClusterClientError> {
        Ok(None)
    }
}

#[derive(Debug, Clone)]
pub struct PodMetrics {
    pub name: String,
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct NodeMetrics {
    pub name: String,
    pub cpu_millicores: u64,
    pub memory_bytes: u64,
}
