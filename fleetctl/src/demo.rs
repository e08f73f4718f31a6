//! In-memory `ClusterClient` used for smoke-testing the fleet data
//! plane without a real cluster, the same role `ferrex-server`'s
//! `dev_handlers.rs`/`demo/mod.rs` play for manual testing: scripted
//! resources, a watch stream driven by a broadcast channel, and a
//! delete that actually mutates the backing store so the whole
//! pipeline (list → cache → project; subscribe → coalesce → select) is
//! exercisable end to end.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use fleet_contracts::{
    ByteStream, ClusterClient, ClusterClientError, LogOptions, NodeMetrics, PodMetrics,
    RawWatchEvent, WatchStream,
};
use fleet_model::{ChangeKind, ObjectMeta, ResourceKind, ResourceObject};
use futures::stream;
use parking_lot::Mutex;
use tokio::sync::broadcast;

type Store = HashMap<(ResourceKind, String), Vec<ResourceObject>>;

/// One context's worth of scripted data. Every demo context gets an
/// independent copy so `--contexts prod,staging` shows genuinely
/// distinct fleets rather than mirrored data.
pub struct DemoClusterClient {
    context: String,
    store: Mutex<Store>,
    events: broadcast::Sender<(ResourceKind, String, RawWatchEvent)>,
}

impl DemoClusterClient {
    pub fn new(context: impl Into<String>) -> Arc<Self> {
        let context = context.into();
        let (events, _rx) = broadcast::channel(256);
        Arc::new(Self {
            store: Mutex::new(seed_store(&context)),
            context,
            events,
        })
    }
}

fn meta(name: &str, namespace: &str, seed: &str) -> ObjectMeta {
    ObjectMeta {
        name: name.to_string(),
        namespace: Some(namespace.to_string()),
        uid: Some(format!(
            "{:x}",
            fnv_hash(&format!("{namespace}/{name}/{seed}"))
        )),
        creation_timestamp: Some(Utc::now()),
        labels: Default::default(),
    }
}

/// FNV-1a, used only to derive stable demo uids without pulling in a
/// hashing dependency the rest of the crate has no other use for.
fn fnv_hash(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn seed_store(context: &str) -> Store {
    let mut store: Store = HashMap::new();

    let pods = vec![
        scripted_pod(context, "default", "web-1", "Running", 1, 1, 0),
        scripted_pod(context, "default", "web-2", "Running", 1, 1, 0),
        scripted_pod(context, "default", "database-2", "Running", 1, 1, 2),
        scripted_pod(context, "kube-system", "coredns-7d6", "Running", 1, 1, 0),
    ];
    store.insert((ResourceKind::Pod, "default".to_string()), pods[..3].to_vec());
    store.insert(
        (ResourceKind::Pod, "kube-system".to_string()),
        pods[3..].to_vec(),
    );

    let deployment = ResourceObject::new(
        meta("web", "default", "deploy"),
        serde_json::json!({
            "spec": {"replicas": 2, "selector": {"app": "web"}},
            "status": {"readyReplicas": 2, "updatedReplicas": 2, "availableReplicas": 2},
            "containers": ["web"],
            "images": ["registry.example/web:1.4.0"],
        }),
    );
    store.insert(
        (ResourceKind::Deployment, "default".to_string()),
        vec![deployment],
    );

    let service = ResourceObject::new(
        meta("web", "default", "svc"),
        serde_json::json!({
            "spec": {"type": "ClusterIP", "clusterIP": "10.0.0.42", "ports": [{"port": 80}]},
        }),
    );
    store.insert(
        (ResourceKind::Service, "default".to_string()),
        vec![service],
    );

    store
}

fn scripted_pod(
    context: &str,
    namespace: &str,
    name: &str,
    phase: &str,
    ready: u32,
    total: u32,
    restarts: u32,
) -> ResourceObject {
    ResourceObject::new(
        meta(name, namespace, context),
        serde_json::json!({
            "status": {
                "phase": phase,
                "podIP": "10.1.2.3",
                "containerStatuses": (0..total).map(|i| serde_json::json!({
                    "ready": i < ready,
                    "restartCount": restarts,
                })).collect::<Vec<_>>(),
            },
            "spec": {"nodeName": "node-1"},
        }),
    )
}

#[async_trait]
impl ClusterClient for DemoClusterClient {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<(Vec<ResourceObject>, String), ClusterClientError> {
        let store = self.store.lock();
        let items = store
            .get(&(kind, namespace.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok((items, Utc::now().timestamp().to_string()))
    }

    async fn watch(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<WatchStream, ClusterClientError> {
        let mut rx = self.events.subscribe();
        let namespace = namespace.to_string();
        let watch = async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok((event_kind, event_ns, raw)) => {
                        if event_kind == kind && event_ns == namespace {
                            yield Ok::<RawWatchEvent, ClusterClientError>(raw);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Ok(Box::pin(watch))
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), ClusterClientError> {
        let removed = {
            let mut store = self.store.lock();
            let Some(items) = store.get_mut(&(kind, namespace.to_string())) else {
                return Err(ClusterClientError::Permanent(format!(
                    "{namespace}/{name} not found"
                )));
            };
            let before = items.len();
            items.retain(|r| r.metadata.name != name);
            before != items.len()
        };
        if !removed {
            return Err(ClusterClientError::Permanent(format!(
                "{namespace}/{name} not found"
            )));
        }
        let _ = self.events.send((
            kind,
            namespace.to_string(),
            RawWatchEvent {
                change_kind: ChangeKind::Deleted,
                object: Some(ResourceObject::new(
                    meta(name, namespace, &self.context),
                    serde_json::Value::Null,
                )),
            },
        ));
        Ok(())
    }

    async fn logs(
        &self,
        namespace: &str,
        pod: &str,
        options: LogOptions,
    ) -> Result<ByteStream, ClusterClientError> {
        let lines: Vec<String> = (1..=options.tail_lines.unwrap_or(5).max(1))
            .map(|i| format!("[{namespace}/{pod}] demo log line {i}\n"))
            .collect();
        let chunks = lines
            .into_iter()
            .map(|l| Ok(l.into_bytes()))
            .collect::<Vec<_>>();
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterClientError> {
        Ok(vec!["default".to_string(), "kube-system".to_string()])
    }

    async fn list_pod_metrics(
        &self,
        namespace: &str,
    ) -> Result<Option<Vec<PodMetrics>>, ClusterClientError> {
        let store = self.store.lock();
        let Some(pods) = store.get(&(ResourceKind::Pod, namespace.to_string())) else {
            return Ok(None);
        };
        Ok(Some(
            pods.iter()
                .map(|p| PodMetrics {
                    name: p.metadata.name.clone(),
                    cpu_millicores: 120,
                    memory_bytes: 64 * 1024 * 1024,
                })
                .collect(),
        ))
    }

    async fn list_node_metrics(&self) -> Result<Option<Vec<NodeMetrics>>, ClusterClientError> {
        Ok(Some(vec![NodeMetrics {
            name: "node-1".to_string(),
            cpu_millicores: 1800,
            memory_bytes: 8 * 1024 * 1024 * 1024,
        }]))
    }
}
