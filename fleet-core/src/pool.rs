//! Bounded pool of per-context cluster clients (spec.md §4.3).
//!
//! Reader-biased: `get` takes a read lock in the common case (client
//! already exists) and only escalates to a write lock, with a
//! double-check, when it needs to create one. The pool does not probe
//! health itself — that is the Health Monitor's job, which reads
//! `snapshot()` and calls `remove` on failing contexts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use fleet_contracts::ClusterClient;
use fleet_model::FleetError;
use parking_lot::{Mutex, RwLock};
use tracing::info;

/// A factory invoked on first use of a context. Out-of-scope wire
/// details (kubeconfig discovery, transport construction) live behind
/// this closure, supplied by whatever assembles the `FleetClient`.
pub type ClientFactory =
    Arc<dyn Fn(&str) -> Result<Arc<dyn ClusterClient>, FleetError> + Send + Sync>;

/// `{ context_name, underlying_client, last_health_check, healthy }`
/// (spec.md §3).
pub struct PooledClient {
    pub context_name: String,
    pub client: Arc<dyn ClusterClient>,
    last_health_check: Mutex<Option<Instant>>,
    healthy: AtomicBool,
}

impl PooledClient {
    fn new(context_name: String, client: Arc<dyn ClusterClient>) -> Self {
        Self {
            context_name,
            client,
            last_health_check: Mutex::new(None),
            healthy: AtomicBool::new(true),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::Relaxed);
    }

    pub fn record_health_check(&self, at: Instant) {
        *self.last_health_check.lock() = Some(at);
    }

    pub fn last_health_check(&self) -> Option<Instant> {
        *self.last_health_check.lock()
    }
}

pub struct ConnectionPool {
    clients: RwLock<HashMap<String, Arc<PooledClient>>>,
    max_connections: usize,
    factory: ClientFactory,
}

impl ConnectionPool {
    pub fn new(max_connections: usize, factory: ClientFactory) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            max_connections,
            factory,
        }
    }

    /// Returns the pooled client for `context`, creating it if absent.
    /// Refuses creation (without disturbing existing entries) once the
    /// pool holds `max_connections` distinct contexts.
    pub fn get(&self, context: &str) -> Result<Arc<PooledClient>, FleetError> {
        if let Some(existing) = self.clients.read().get(context) {
            return Ok(Arc::clone(existing));
        }

        let mut clients = self.clients.write();
        // Double-checked: another writer may have created it between
        // our read-lock release and taking the write lock.
        if let Some(existing) = clients.get(context) {
            return Ok(Arc::clone(existing));
        }

        if clients.len() >= self.max_connections {
            return Err(FleetError::PoolExhausted {
                capacity: self.max_connections,
            });
        }

        let client = (self.factory)(context)?;
        let pooled = Arc::new(PooledClient::new(context.to_string(), client));
        clients.insert(context.to_string(), Arc::clone(&pooled));
        info!(context, "pooled client created");
        Ok(pooled)
    }

    /// Idempotent: removing an absent context is a no-op.
    pub fn remove(&self, context: &str) {
        if self.clients.write().remove(context).is_some() {
            info!(context, "pooled client removed");
        }
    }

    pub fn clear(&self) {
        let mut clients = self.clients.write();
        let count = clients.len();
        clients.clear();
        if count > 0 {
            info!(count, "connection pool cleared");
        }
    }

    /// The current set of pooled clients, for the Health Monitor to
    /// probe. A snapshot, not a live view: entries created or removed
    /// after this call are not reflected.
    pub fn snapshot(&self) -> Vec<Arc<PooledClient>> {
        self.clients.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_contracts::{ClusterClientError, LogOptions, WatchStream};
    use fleet_model::{ResourceKind, ResourceObject};

    struct StubClient;

    #[async_trait::async_trait]
    impl ClusterClient for StubClient {
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
            Err(ClusterClientError::Permanent("not implemented".into()))
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
            Err(ClusterClientError::Permanent("not implemented".into()))
        }

        async fn list_namespaces(&self) -> Result<Vec<String>, ClusterClientError> {
            Ok(vec!["default".into()])
        }
    }

    fn stub_factory() -> ClientFactory {
        Arc::new(|_ctx: &str| Ok(Arc::new(StubClient) as Arc<dyn ClusterClient>))
    }

    #[test]
    fn get_creates_then_reuses_same_client() {
        let pool = ConnectionPool::new(2, stub_factory());
        let a = pool.get("ctx-a").unwrap();
        let b = pool.get("ctx-a").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn get_refuses_beyond_capacity() {
        let pool = ConnectionPool::new(1, stub_factory());
        pool.get("ctx-a").unwrap();
        let err = pool.get("ctx-b").unwrap_err();
        assert!(matches!(err, FleetError::PoolExhausted { capacity: 1 }));
    }

    #[test]
    fn remove_and_clear_are_idempotent() {
        let pool = ConnectionPool::new(2, stub_factory());
        pool.get("ctx-a").unwrap();
        pool.remove("ctx-a");
        pool.remove("ctx-a");
        assert!(pool.is_empty());
        pool.get("ctx-a").unwrap();
        pool.clear();
        pool.clear();
        assert!(pool.is_empty());
    }
}
