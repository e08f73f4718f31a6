//! Periodic liveness probing of pooled clients (spec.md §4.4).
//!
//! Every `interval`, snapshots the pool and concurrently probes each
//! client with a `list_namespaces()` call under `timeout`. A failed
//! probe removes the client from the pool; the monitor never
//! re-creates one — that happens lazily on the pool's next `get`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::pool::ConnectionPool;

/// Per-probe result a caller may observe (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct ContextHealth {
    pub context: String,
    pub healthy: bool,
    pub last_check: DateTime<Utc>,
    pub error: Option<String>,
    pub response_time: Duration,
}

pub struct HealthMonitor {
    pool: Arc<ConnectionPool>,
    interval: Duration,
    probe_timeout: Duration,
    report: tokio::sync::watch::Sender<Vec<ContextHealth>>,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ConnectionPool>, interval: Duration, probe_timeout: Duration) -> Self {
        let (report, _) = tokio::sync::watch::channel(Vec::new());
        Self {
            pool,
            interval,
            probe_timeout,
            report,
        }
    }

    /// The most recent full round of probe results.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<Vec<ContextHealth>> {
        self.report.subscribe()
    }

    /// Runs the probe loop until `cancel` fires. Each tick probes every
    /// currently pooled client concurrently; results are published to
    /// `subscribe()` and failing clients are evicted from the pool.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(interval = ?self.interval, "health monitor started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("health monitor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.probe_once().await;
                }
            }
        }
    }

    /// Runs exactly one probe round. Exposed separately from `run` so
    /// tests and `fleetctl health` can trigger a round on demand.
    pub async fn probe_once(&self) {
        let pooled = self.pool.snapshot();
        let mut results = Vec::with_capacity(pooled.len());
        let probes = pooled.into_iter().map(|client| {
            let timeout = self.probe_timeout;
            async move {
                let started = Instant::now();
                let outcome =
                    tokio::time::timeout(timeout, client.client.list_namespaces()).await;
                let response_time = started.elapsed();
                match outcome {
                    Ok(Ok(_)) => {
                        client.record_health_check(Instant::now());
                        debug!(context = %client.context_name, ?response_time, "health probe ok");
                        ContextHealth {
                            context: client.context_name.clone(),
                            healthy: true,
                            last_check: Utc::now(),
                            error: None,
                            response_time,
                        }
                    }
                    Ok(Err(e)) => {
                        client.mark_unhealthy();
                        warn!(context = %client.context_name, error = %e, "health probe failed");
                        ContextHealth {
                            context: client.context_name.clone(),
                            healthy: false,
                            last_check: Utc::now(),
                            error: Some(e.to_string()),
                            response_time,
                        }
                    }
                    Err(_) => {
                        client.mark_unhealthy();
                        warn!(context = %client.context_name, ?timeout, "health probe timed out");
                        ContextHealth {
                            context: client.context_name.clone(),
                            healthy: false,
                            last_check: Utc::now(),
                            error: Some("probe timed out".to_string()),
                            response_time,
                        }
                    }
                }
            }
        });

        for result in futures::future::join_all(probes).await {
            if !result.healthy {
                self.pool.remove(&result.context);
            }
            results.push(result);
        }

        let _ = self.report.send(results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ClientFactory;
    use fleet_contracts::{ClusterClient, ClusterClientError, LogOptions, WatchStream};
    use fleet_model::{ResourceKind, ResourceObject};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct ScriptedClient {
        fail: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl ClusterClient for ScriptedClient {
        async fn list(
            &self,
            _kind: ResourceKind,
            _namespace: &str,
        ) -> Result<(Vec<ResourceObject>, String), ClusterClientError> {
            Ok((vec![], "v0".into()))
        }

        async fn watch(
            &self,
            _kind: ResourceKind,
            _namespace: &str,
        ) -> Result<WatchStream, ClusterClientError> {
            Err(ClusterClientError::Permanent("unused".into()))
        }

        async fn delete(
            &self,
            _kind: ResourceKind,
            _namespace: &str,
            _name: &str,
        ) -> Result<(), ClusterClientError> {
            Ok(())
        }

        async fn logs(
            &self,
            _namespace: &str,
            _pod: &str,
            _options: LogOptions,
        ) -> Result<fleet_contracts::ByteStream, ClusterClientError> {
            Err(ClusterClientError::Permanent("unused".into()))
        }

        async fn list_namespaces(&self) -> Result<Vec<String>, ClusterClientError> {
            if self.fail.load(Ordering::Relaxed) {
                Err(ClusterClientError::Transient("upstream down".into()))
            } else {
                Ok(vec!["default".into()])
            }
        }
    }

    #[tokio::test]
    async fn failing_probe_evicts_client_from_pool() {
        let fail = Arc::new(AtomicBool::new(true));
        let fail_for_factory = Arc::clone(&fail);
        let factory: ClientFactory = Arc::new(move |_ctx| {
            Ok(Arc::new(ScriptedClient {
                fail: Arc::clone(&fail_for_factory),
            }) as Arc<dyn ClusterClient>)
        });
        let pool = Arc::new(ConnectionPool::new(4, factory));
        pool.get("ctx-a").unwrap();

        let monitor = Arc::new(HealthMonitor::new(
            Arc::clone(&pool),
            Duration::from_secs(60),
            Duration::from_secs(1),
        ));
        monitor.probe_once().await;

        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn healthy_probe_keeps_client_pooled() {
        let fail = Arc::new(AtomicBool::new(false));
        let factory: ClientFactory = Arc::new(move |_ctx| {
            Ok(Arc::new(ScriptedClient {
                fail: Arc::clone(&fail),
            }) as Arc<dyn ClusterClient>)
        });
        let pool = Arc::new(ConnectionPool::new(4, factory));
        pool.get("ctx-a").unwrap();

        let monitor = Arc::new(HealthMonitor::new(
            Arc::clone(&pool),
            Duration::from_secs(60),
            Duration::from_secs(1),
        ));
        monitor.probe_once().await;

        assert_eq!(pool.len(), 1);
    }
}
