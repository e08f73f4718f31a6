//! Fleet Client (spec.md §4.7): the hard center. Integrates the
//! Resource Cache, Connection Pool, Watch Coalescer, Event Processor
//! and Transformer Registry behind the `FleetClientApi` capability
//! (spec.md §6) — parallel list fan-out across contexts, watch
//! subscription with reconnect backoff, delete/logs passthrough, and
//! row projection with the current view's sort/display settings.
//!
//! Selection stability (the other half of "Row Projection & Selection
//! Tracker") lives in `crate::selection::SelectionTracker`, owned by
//! whatever UI-layer collaborator holds the cursor — the Fleet Client
//! produces `RowSnapshot`s; it doesn't need to know which row is
//! focused to produce one correctly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fleet_contracts::{
    AggregatedRows, ByteStream, ClusterClientError, ContextError, FleetClientApi, LogOptions,
    PodMetrics,
};
use fleet_model::{CacheKey, FleetError, ResourceKind, ResourceObject, SortDirection, WatchEvent};

use crate::cache::{start_cleanup_routine, ResourceCache};
use crate::coalescer::WatchCoalescer;
use crate::event_processor::{Batch, BatchProcessor, EventProcessor, ProcessResult};
use crate::health::{ContextHealth, HealthMonitor};
use crate::pool::{ClientFactory, ConnectionPool};
use crate::projection::{ProjectionOptions, RowProjector};
use crate::template::TemplateEngine;
use crate::transformers::TransformerRegistry;

/// Exponential backoff parameters for watch resubscription (spec.md
/// §4.5, §6 `Reconnect{Base,Cap,Factor,MaxAttempts}`). Mirrors
/// `fleet_config::ReconnectConfig`'s shape; duplicated here rather than
/// depended on, so `fleet-core` stays free of a `fleet-config`
/// dependency (the same split `ferrex-core`/`ferrex-config` keep).
#[derive(Debug, Clone, Copy)]
pub struct ReconnectBackoff {
    pub base: Duration,
    pub cap: Duration,
    pub factor: f64,
    pub max_attempts: u32,
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            factor: 2.0,
            max_attempts: 10,
        }
    }
}

/// Every option spec.md §6 lists, in `fleet-core`'s own vocabulary. The
/// `fleetctl` binary builds this from `fleet_config::Configuration`.
#[derive(Debug, Clone)]
pub struct FleetClientConfig {
    pub cache_size: usize,
    pub cache_ttl: Duration,
    pub parallel_fetch: bool,
    pub health_check_interval: Duration,
    pub context_timeout: Duration,
    pub max_connections: usize,
    pub watch_listener_buffer: usize,
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub reconnect: ReconnectBackoff,
}

impl Default for FleetClientConfig {
    fn default() -> Self {
        Self {
            cache_size: 1000,
            cache_ttl: Duration::from_secs(30),
            parallel_fetch: true,
            health_check_interval: Duration::from_secs(60),
            context_timeout: Duration::from_secs(10),
            max_connections: 50,
            watch_listener_buffer: 100,
            batch_size: 50,
            batch_timeout: Duration::from_millis(100),
            reconnect: ReconnectBackoff::default(),
        }
    }
}

/// The view settings `list_kind_across_contexts` projects with — held
/// by the Fleet Client itself since `FleetClientApi::list_kind_across_contexts`
/// (spec.md §6) takes only `(kind, namespace)`; sort/display are set
/// separately via `FleetClient::set_sort` et al., the same way a TUI's
/// "sort by column" keybinding would mutate view state out-of-band from
/// the data fetch.
#[derive(Debug, Clone)]
struct ViewState {
    sort_column: String,
    sort_direction: SortDirection,
    show_namespace: bool,
    group: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            sort_column: "NAME".to_string(),
            sort_direction: SortDirection::Ascending,
            show_namespace: false,
            group: false,
        }
    }
}

/// Routes batched watch events to precise cache invalidation (system
/// overview: "Events feed Event Processor, which batches and
/// invalidates the matching cache entries").
struct CacheInvalidator {
    cache: Arc<ResourceCache<ResourceObject>>,
}

#[async_trait]
impl BatchProcessor for CacheInvalidator {
    async fn process(&self, batch: &Batch) -> ProcessResult {
        for event in batch {
            self.cache.remove(&CacheKey::new(
                event.context.clone(),
                event.namespace.clone(),
                event.kind,
            ));
        }
        Ok(())
    }
}

pub struct FleetClient {
    cache: Arc<ResourceCache<ResourceObject>>,
    pool: Arc<ConnectionPool>,
    coalescer: Arc<WatchCoalescer>,
    event_processor: Arc<EventProcessor>,
    health_monitor: Arc<HealthMonitor>,
    registry: TransformerRegistry,
    engine: TemplateEngine,
    contexts: Mutex<Vec<String>>,
    view: Mutex<ViewState>,
    config: FleetClientConfig,
    cancel: CancellationToken,
}

impl FleetClient {
    pub fn new(contexts: Vec<String>, factory: ClientFactory, config: FleetClientConfig) -> Self {
        let pool = Arc::new(ConnectionPool::new(config.max_connections, factory));
        let cache = Arc::new(ResourceCache::new(config.cache_size, config.cache_ttl));
        let coalescer = Arc::new(WatchCoalescer::new(
            Arc::clone(&pool),
            config.watch_listener_buffer,
        ));
        let event_processor = Arc::new(EventProcessor::new(
            config.batch_size,
            config.batch_timeout,
            config.batch_size * 4,
        ));
        let health_monitor = Arc::new(HealthMonitor::new(
            Arc::clone(&pool),
            config.health_check_interval,
            config.context_timeout,
        ));
        let template_cache_capacity = config.cache_size;
        Self {
            cache,
            pool,
            coalescer,
            event_processor,
            health_monitor,
            registry: TransformerRegistry::new(),
            engine: TemplateEngine::new(template_cache_capacity),
            contexts: Mutex::new(contexts),
            view: Mutex::new(ViewState::default()),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawns the background machinery (spec.md §5): the cache's
    /// periodic expiry sweep, the event processor's batch workers, and
    /// the health monitor's probe loop. Idempotent to call once; a
    /// second call would spawn duplicate loops, so callers should guard
    /// against calling it twice (`fleetctl` calls it exactly once at
    /// startup).
    pub fn start(&self) {
        start_cleanup_routine(Arc::clone(&self.cache), self.config.cache_ttl, self.cancel.clone());
        self.event_processor.start(
            4,
            Arc::new(CacheInvalidator {
                cache: Arc::clone(&self.cache),
            }),
            self.cancel.clone(),
        );
        tokio::spawn(Arc::clone(&self.health_monitor).run(self.cancel.clone()));
        info!("fleet client started");
    }

    /// Tears down caches, pool, and coalescer in dependency order
    /// (spec.md §9: "coalescer → pool → cache"). Cancels every
    /// cooperative background task first so none of them race the
    /// teardown they're about to observe.
    pub async fn close(&self) {
        self.cancel.cancel();
        self.coalescer.shutdown();
        self.pool.clear();
        self.event_processor.stop(self.cancel.clone()).await;
        info!("fleet client closed");
    }

    pub fn set_sort(&self, column: impl Into<String>, direction: SortDirection) {
        let mut view = self.view.lock();
        view.sort_column = column.into();
        view.sort_direction = direction;
    }

    pub fn set_show_namespace(&self, show: bool) {
        self.view.lock().show_namespace = show;
    }

    pub fn set_group(&self, group: bool) {
        self.view.lock().group = group;
    }

    pub fn current_sort(&self) -> (String, SortDirection) {
        let view = self.view.lock();
        (view.sort_column.clone(), view.sort_direction)
    }

    pub fn contexts(&self) -> Vec<String> {
        self.contexts.lock().clone()
    }

    pub fn set_contexts(&self, contexts: Vec<String>) {
        *self.contexts.lock() = contexts;
    }

    /// Enables `context` in the fan-out set (spec.md §4.7 "context
    /// filter toggles"). A no-op if already enabled.
    pub fn enable_context(&self, context: impl Into<String>) {
        let context = context.into();
        let mut contexts = self.contexts.lock();
        if !contexts.contains(&context) {
            contexts.push(context);
        }
    }

    pub fn disable_context(&self, context: &str) {
        self.contexts.lock().retain(|c| c != context);
    }

    pub fn cache_metrics(&self) -> fleet_model::CacheMetricsSnapshot {
        self.cache.get_metrics()
    }

    pub fn health_updates(&self) -> tokio::sync::watch::Receiver<Vec<ContextHealth>> {
        self.health_monitor.subscribe()
    }

    async fn fetch_one_context(
        &self,
        context: &str,
        namespace: &str,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceObject>, ContextError> {
        let key = CacheKey::new(context, namespace, kind);
        if let Some((snapshots, _version_token)) = self.cache.get(&key) {
            return Ok(snapshots);
        }

        let pooled = self.pool.get(context).map_err(|e| ContextError {
            context: context.to_string(),
            error: e.to_string(),
            transient: false,
        })?;

        match tokio::time::timeout(self.config.context_timeout, pooled.client.list(kind, namespace)).await {
            Ok(Ok((items, version_token))) => {
                self.cache.set(key, items.clone(), version_token);
                Ok(items)
            }
            Ok(Err(e)) => Err(ContextError {
                context: context.to_string(),
                error: e.to_string(),
                transient: e.is_transient(),
            }),
            Err(_) => Err(ContextError {
                context: context.to_string(),
                error: "context timeout".to_string(),
                transient: true,
            }),
        }
    }

    /// Merges `ClusterClient::list_pod_metrics` onto matching pod
    /// objects before projection (spec.md §6: metrics are optional;
    /// their absence leaves CPU/memory columns rendering `"-"`). Only
    /// invoked for `ResourceKind::Pod`.
    async fn merge_pod_metrics(
        &self,
        contexts: &[String],
        namespace: &str,
        resources: &mut [(String, ResourceObject)],
    ) {
        for context in contexts {
            let Ok(pooled) = self.pool.get(context) else {
                continue;
            };
            let Ok(Some(metrics)) = pooled.client.list_pod_metrics(namespace).await else {
                continue;
            };
            let by_name: HashMap<&str, &PodMetrics> =
                metrics.iter().map(|m| (m.name.as_str(), m)).collect();
            for (ctx, resource) in resources.iter_mut() {
                if ctx != context {
                    continue;
                }
                if let Some(m) = by_name.get(resource.metadata.name.as_str()) {
                    set_pod_usage(resource, m.cpu_millicores, m.memory_bytes);
                }
            }
        }
    }
}

fn set_pod_usage(resource: &mut ResourceObject, cpu_millicores: u64, memory_bytes: u64) {
    if !resource.data.is_object() {
        resource.data = serde_json::json!({});
    }
    let obj = resource.data.as_object_mut().expect("just ensured object");
    let status = obj
        .entry("status")
        .or_insert_with(|| serde_json::json!({}));
    if !status.is_object() {
        *status = serde_json::json!({});
    }
    let usage = status
        .as_object_mut()
        .expect("just ensured object")
        .entry("usage")
        .or_insert_with(|| serde_json::json!({}));
    if !usage.is_object() {
        *usage = serde_json::json!({});
    }
    let usage = usage.as_object_mut().expect("just ensured object");
    usage.insert("cpuMillicores".to_string(), serde_json::json!(cpu_millicores));
    usage.insert("memoryBytes".to_string(), serde_json::json!(memory_bytes));
}

fn to_fleet_error(context: &str, e: ClusterClientError) -> FleetError {
    if e.is_transient() {
        FleetError::TransientUpstream {
            context: context.to_string(),
            message: e.to_string(),
        }
    } else {
        FleetError::PermanentUpstream {
            context: context.to_string(),
            message: e.to_string(),
        }
    }
}

/// One context's contribution to `subscribe_kind`: retries `subscribe`
/// with exponential backoff whenever the upstream watch ends, up to
/// `backoff.max_attempts`, resetting the attempt counter after each
/// successful (re)connection — "restarted whenever a fresh user
/// subscription arrives" (spec.md §4.5) describes the counter's scope
/// as this whole function's invocation, which is exactly one per
/// `subscribe_kind` call per context.
async fn run_context_subscription(
    coalescer: Arc<WatchCoalescer>,
    event_processor: Arc<EventProcessor>,
    key: fleet_model::WatchKey,
    out: mpsc::Sender<WatchEvent<ResourceObject>>,
    backoff: ReconnectBackoff,
    cancel: CancellationToken,
) {
    let mut attempt = 0u32;
    let mut delay = backoff.base;

    loop {
        if cancel.is_cancelled() {
            return;
        }

        match coalescer.subscribe(key.clone()).await {
            Ok((listener_id, mut rx)) => {
                attempt = 0;
                delay = backoff.base;
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            coalescer.unsubscribe(&key, listener_id);
                            return;
                        }
                        event = rx.recv() => {
                            match event {
                                Some(event) => {
                                    let _ = event_processor.enqueue(event.clone()).await;
                                    if out.send(event).await.is_err() {
                                        coalescer.unsubscribe(&key, listener_id);
                                        return;
                                    }
                                }
                                None => break,
                            }
                        }
                    }
                }
            }
            Err(e) => {
                warn!(%key, error = %e, attempt, "watch subscription failed");
            }
        }

        attempt += 1;
        if attempt > backoff.max_attempts {
            warn!(%key, attempts = attempt - 1, "watch resubscription exhausted, giving up");
            return;
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        delay = delay.mul_f64(backoff.factor).min(backoff.cap);
    }
}

#[async_trait]
impl FleetClientApi for FleetClient {
    async fn list_kind_across_contexts(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<AggregatedRows, FleetError> {
        let contexts = self.contexts.lock().clone();

        let fetched: Vec<(String, Result<Vec<ResourceObject>, ContextError>)> = if self.config.parallel_fetch {
            let futures = contexts
                .iter()
                .map(|ctx| async move { (ctx.clone(), self.fetch_one_context(ctx, namespace, kind).await) });
            futures::future::join_all(futures).await
        } else {
            let mut out = Vec::with_capacity(contexts.len());
            for ctx in &contexts {
                out.push((ctx.clone(), self.fetch_one_context(ctx, namespace, kind).await));
            }
            out
        };

        let mut resources: Vec<(String, ResourceObject)> = Vec::new();
        let mut partial_errors = Vec::new();
        for (ctx, result) in fetched {
            match result {
                Ok(items) => resources.extend(items.into_iter().map(|item| (ctx.clone(), item))),
                Err(e) => partial_errors.push(e),
            }
        }

        if kind == ResourceKind::Pod {
            self.merge_pod_metrics(&contexts, namespace, &mut resources).await;
        }

        let view = self.view.lock().clone();
        let multi_context = contexts.len() > 1;
        let projector = RowProjector::new(&self.registry, &self.engine);
        let options = ProjectionOptions {
            show_namespace: view.show_namespace,
            multi_context,
            group: view.group,
            sort_column: view.sort_column,
            sort_direction: view.sort_direction,
        };
        let snapshot = projector.project(kind, &resources, &options);

        Ok(AggregatedRows {
            rows: snapshot.rows,
            partial_errors,
        })
    }

    async fn subscribe_kind(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<mpsc::Receiver<WatchEvent<ResourceObject>>, FleetError> {
        let contexts = self.contexts.lock().clone();
        if contexts.is_empty() {
            return Err(FleetError::Internal("no contexts configured".to_string()));
        }

        let buffer = self.config.watch_listener_buffer * contexts.len();
        let (tx, rx) = mpsc::channel(buffer.max(self.config.watch_listener_buffer));

        for context in contexts {
            let key = CacheKey::new(context, namespace.to_string(), kind);
            let coalescer = Arc::clone(&self.coalescer);
            let event_processor = Arc::clone(&self.event_processor);
            let cancel = self.cancel.clone();
            let backoff = self.config.reconnect;
            let out = tx.clone();
            tokio::spawn(async move {
                run_context_subscription(coalescer, event_processor, key, out, backoff, cancel).await;
            });
        }

        Ok(rx)
    }

    async fn delete(
        &self,
        context: &str,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), FleetError> {
        let pooled = self.pool.get(context)?;
        pooled
            .client
            .delete(kind, namespace, name)
            .await
            .map_err(|e| to_fleet_error(context, e))?;
        self.cache
            .remove(&CacheKey::new(context, namespace, kind));
        Ok(())
    }

    async fn logs(
        &self,
        context: &str,
        namespace: &str,
        pod: &str,
        options: LogOptions,
    ) -> Result<ByteStream, FleetError> {
        let pooled = self.pool.get(context)?;
        pooled
            .client
            .logs(namespace, pod, options)
            .await
            .map_err(|e| to_fleet_error(context, e))
    }

    async fn invalidate_namespace(&self, namespace: &str) {
        self.cache.invalidate_namespace(namespace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_contracts::{ClusterClient, ClusterClientError as CCErr, RawWatchEvent, WatchStream};
    use fleet_model::ObjectMeta;
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedClient {
        pods: Vec<ResourceObject>,
        list_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ClusterClient for ScriptedClient {
        async fn list(
            &self,
            _kind: ResourceKind,
            _namespace: &str,
        ) -> Result<(Vec<ResourceObject>, String), CCErr> {
            self.list_calls.fetch_add(1, Ordering::Relaxed);
            Ok((self.pods.clone(), "v1".to_string()))
        }

        async fn watch(&self, _kind: ResourceKind, _namespace: &str) -> Result<WatchStream, CCErr> {
            Ok(Box::pin(stream::iter(Vec::<Result<RawWatchEvent, CCErr>>::new())))
        }

        async fn delete(&self, _kind: ResourceKind, _namespace: &str, _name: &str) -> Result<(), CCErr> {
            Ok(())
        }

        async fn logs(
            &self,
            _namespace: &str,
            _pod: &str,
            _options: LogOptions,
        ) -> Result<ByteStream, CCErr> {
            Err(CCErr::Permanent("unused".into()))
        }

        async fn list_namespaces(&self) -> Result<Vec<String>, CCErr> {
            Ok(vec!["default".to_string()])
        }
    }

    fn pod(name: &str, uid: &str) -> ResourceObject {
        ResourceObject::new(
            ObjectMeta {
                name: name.to_string(),
                namespace: Some("default".to_string()),
                uid: Some(uid.to_string()),
                creation_timestamp: Some(chrono::Utc::now()),
                labels: Default::default(),
            },
            serde_json::json!({"status": {"phase": "Running"}}),
        )
    }

    #[tokio::test]
    async fn list_across_contexts_caches_and_merges() {
        let list_calls = Arc::new(AtomicUsize::new(0));
        let pods = vec![pod("web-1", "u-1")];
        let calls_for_factory = Arc::clone(&list_calls);
        let pods_for_factory = pods.clone();
        let factory: ClientFactory = Arc::new(move |_ctx| {
            Ok(Arc::new(ScriptedClient {
                pods: pods_for_factory.clone(),
                list_calls: Arc::clone(&calls_for_factory),
            }) as Arc<dyn ClusterClient>)
        });

        let config = FleetClientConfig {
            cache_ttl: Duration::from_secs(60),
            ..FleetClientConfig::default()
        };
        let fleet = FleetClient::new(vec!["prod".to_string()], factory, config);

        let first = fleet
            .list_kind_across_contexts(ResourceKind::Pod, "default")
            .await
            .unwrap();
        assert_eq!(first.rows.len(), 1);
        assert!(first.partial_errors.is_empty());
        assert_eq!(list_calls.load(Ordering::Relaxed), 1);

        // Second call within TTL should hit the cache, not re-list.
        let second = fleet
            .list_kind_across_contexts(ResourceKind::Pod, "default")
            .await
            .unwrap();
        assert_eq!(second.rows.len(), 1);
        assert_eq!(list_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn failing_context_yields_partial_result() {
        struct FailingClient;
        #[async_trait]
        impl ClusterClient for FailingClient {
            async fn list(&self, _kind: ResourceKind, _namespace: &str) -> Result<(Vec<ResourceObject>, String), CCErr> {
                Err(CCErr::Transient("upstream unreachable".into()))
            }
            async fn watch(&self, _kind: ResourceKind, _namespace: &str) -> Result<WatchStream, CCErr> {
                Err(CCErr::Permanent("unused".into()))
            }
            async fn delete(&self, _kind: ResourceKind, _namespace: &str, _name: &str) -> Result<(), CCErr> {
                Ok(())
            }
            async fn logs(&self, _namespace: &str, _pod: &str, _options: LogOptions) -> Result<ByteStream, CCErr> {
                Err(CCErr::Permanent("unused".into()))
            }
            async fn list_namespaces(&self) -> Result<Vec<String>, CCErr> {
                Ok(vec![])
            }
        }

        let good_pods = vec![pod("web-1", "u-1")];
        let good_pods_for_factory = good_pods.clone();
        let factory: ClientFactory = Arc::new(move |ctx: &str| {
            if ctx == "flaky" {
                Ok(Arc::new(FailingClient) as Arc<dyn ClusterClient>)
            } else {
                Ok(Arc::new(ScriptedClient {
                    pods: good_pods_for_factory.clone(),
                    list_calls: Arc::new(AtomicUsize::new(0)),
                }) as Arc<dyn ClusterClient>)
            }
        });

        let fleet = FleetClient::new(
            vec!["prod".to_string(), "flaky".to_string()],
            factory,
            FleetClientConfig::default(),
        );

        let result = fleet
            .list_kind_across_contexts(ResourceKind::Pod, "default")
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.partial_errors.len(), 1);
        assert_eq!(result.partial_errors[0].context, "flaky");
        assert!(result.partial_errors[0].transient);
    }

    #[tokio::test]
    async fn delete_invalidates_the_affected_cache_entry() {
        let pods = vec![pod("web-1", "u-1")];
        let factory: ClientFactory = Arc::new(move |_ctx| {
            Ok(Arc::new(ScriptedClient {
                pods: pods.clone(),
                list_calls: Arc::new(AtomicUsize::new(0)),
            }) as Arc<dyn ClusterClient>)
        });
        let fleet = FleetClient::new(vec!["prod".to_string()], factory, FleetClientConfig::default());

        fleet
            .list_kind_across_contexts(ResourceKind::Pod, "default")
            .await
            .unwrap();
        assert_eq!(fleet.cache_metrics().misses, 1);

        fleet
            .delete("prod", ResourceKind::Pod, "default", "web-1")
            .await
            .unwrap();

        // Cache entry gone, so the next list is a miss again, not a hit.
        fleet
            .list_kind_across_contexts(ResourceKind::Pod, "default")
            .await
            .unwrap();
        assert_eq!(fleet.cache_metrics().misses, 2);
    }

    #[tokio::test]
    async fn subscribe_on_empty_contexts_errs() {
        let factory: ClientFactory = Arc::new(|_ctx| {
            Ok(Arc::new(ScriptedClient {
                pods: vec![],
                list_calls: Arc::new(AtomicUsize::new(0)),
            }) as Arc<dyn ClusterClient>)
        });
        let fleet = FleetClient::new(vec![], factory, FleetClientConfig::default());
        let err = fleet.subscribe_kind(ResourceKind::Pod, "default").await.unwrap_err();
        assert!(matches!(err, FleetError::Internal(_)));
    }
}
