//! Deduplicates upstream watches: N subscribers on the same
//! `(context, namespace, kind)` share one upstream watch (spec.md §4.5).
//!
//! Locking discipline (spec.md §5): one mutex guards the `active_watches`
//! map; each record has its own mutex guarding its listener list, so
//! dispatching to listeners never blocks a concurrent `subscribe`/
//! `unsubscribe` on an unrelated key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fleet_contracts::{ClusterClientError, RawWatchEvent};
use fleet_model::{ChangeKind, FleetError, ResourceObject, WatchEvent, WatchKey};
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::pool::ConnectionPool;

pub type ListenerId = u64;

struct Listener {
    id: ListenerId,
    sender: mpsc::Sender<WatchEvent<ResourceObject>>,
}

struct WatchRecord {
    listeners: Arc<Mutex<Vec<Listener>>>,
    dispatch_handle: tokio::task::JoinHandle<()>,
}

impl Drop for WatchRecord {
    fn drop(&mut self) {
        self.dispatch_handle.abort();
    }
}

pub struct WatchCoalescer {
    active: Mutex<HashMap<WatchKey, Arc<WatchRecord>>>,
    pool: Arc<ConnectionPool>,
    listener_buffer: usize,
    next_listener_id: AtomicU64,
}

impl WatchCoalescer {
    pub fn new(pool: Arc<ConnectionPool>, listener_buffer: usize) -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            pool,
            listener_buffer,
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Subscribes to `key`. If an upstream watch is already active for
    /// it, attaches a new listener channel; otherwise opens the
    /// upstream watch via the pool and spawns the dispatch loop.
    pub async fn subscribe(
        &self,
        key: WatchKey,
    ) -> Result<(ListenerId, mpsc::Receiver<WatchEvent<ResourceObject>>), FleetError> {
        let (tx, rx) = mpsc::channel(self.listener_buffer);
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);

        // Fast path: record already exists. Taking the map lock only to
        // read and immediately attach keeps it held for O(1) work.
        {
            let active = self.active.lock();
            if let Some(record) = active.get(&key) {
                record.listeners.lock().push(Listener { id, sender: tx });
                debug!(%key, id, "attached listener to existing watch");
                return Ok((id, rx));
            }
        }

        let client = self.pool.get(&key.context)?;
        let stream = client
            .client
            .watch(key.kind, &key.namespace)
            .await
            .map_err(|e| upstream_error(&key.context, e))?;

        let listeners = Arc::new(Mutex::new(vec![Listener { id, sender: tx }]));
        let dispatch_handle = spawn_dispatch_loop(key.clone(), stream, Arc::clone(&listeners));
        let record = Arc::new(WatchRecord {
            listeners,
            dispatch_handle,
        });

        let mut active = self.active.lock();
        // Double-check: another subscriber may have raced us and
        // already installed a record while we awaited `watch`. Keep
        // theirs (it was first), fold our listener into it, and let
        // our own record drop — its `Drop` impl aborts the now-
        // redundant dispatch task and upstream watch.
        if let Some(existing) = active.get(&key) {
            existing
                .listeners
                .lock()
                .append(&mut record.listeners.lock());
            return Ok((id, rx));
        }

        info!(%key, "opened upstream watch");
        active.insert(key, record);
        Ok((id, rx))
    }

    /// Removes `listener` from `key`'s fan-out. If it was the last
    /// listener, stops the upstream watch and drops the record.
    pub fn unsubscribe(&self, key: &WatchKey, listener: ListenerId) {
        let mut active = self.active.lock();
        let Some(record) = active.get(key) else {
            return;
        };
        let became_empty = {
            let mut listeners = record.listeners.lock();
            listeners.retain(|l| l.id != listener);
            listeners.is_empty()
        };
        if became_empty {
            active.remove(key);
            info!(%key, "upstream watch stopped, last listener unsubscribed");
        }
    }

    /// Number of active upstream watches. Exposed for the testable
    /// invariant in spec.md §8 ("for any WatchKey with ≥1 active
    /// listener, exactly one upstream watch exists").
    pub fn active_watch_count(&self) -> usize {
        self.active.lock().len()
    }

    pub fn is_watching(&self, key: &WatchKey) -> bool {
        self.active.lock().contains_key(key)
    }

    /// Tears down every active watch: closes all listener channels and
    /// aborts every dispatch task (spec.md §5 "Active listener channels
    /// MUST be closed on coalescer teardown"). Used by the Fleet
    /// Client's `Close()` as the first step of its coalescer → pool →
    /// cache shutdown order (spec.md §9).
    pub fn shutdown(&self) {
        let drained: Vec<_> = self.active.lock().drain().collect();
        let count = drained.len();
        // Dropping each `Arc<WatchRecord>` runs its `Drop` impl, which
        // aborts the dispatch task; the task's own drop of `listeners`
        // then closes every sender, so subscribers see stream end.
        drop(drained);
        if count > 0 {
            info!(count, "watch coalescer shut down");
        }
    }
}

fn upstream_error(context: &str, e: ClusterClientError) -> FleetError {
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

fn spawn_dispatch_loop(
    key: WatchKey,
    mut stream: fleet_contracts::WatchStream,
    listeners: Arc<Mutex<Vec<Listener>>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            match item {
                Ok(RawWatchEvent { change_kind, object }) => {
                    dispatch_event(&key, change_kind, object, &listeners);
                }
                Err(e) if e.is_transient() => {
                    warn!(%key, error = %e, "transient watch error, continuing");
                }
                Err(e) => {
                    warn!(%key, error = %e, "terminal watch error, closing fan-out");
                    break;
                }
            }
        }
        debug!(%key, "upstream watch stream ended");
        // Dropping `listeners`'s senders (by letting the Vec go out of
        // scope with the task) closes every attached receiver, so
        // subscribers observe the stream end rather than hanging.
    })
}

fn dispatch_event(
    key: &WatchKey,
    change_kind: ChangeKind,
    object: Option<ResourceObject>,
    listeners: &Mutex<Vec<Listener>>,
) {
    let event = WatchEvent::new(change_kind, object, key.context.clone(), key.namespace.clone(), key.kind);
    let listeners = listeners.lock();
    for listener in listeners.iter() {
        // Non-blocking: a full buffer means this listener's copy of the
        // event is dropped, never the producer stalling on a slow
        // consumer (spec.md §4.5).
        if let Err(mpsc::error::TrySendError::Full(_)) = listener.sender.try_send(event.clone()) {
            warn!(%key, listener = listener.id, "listener buffer full, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_contracts::{ByteStream, ClusterClient, LogOptions, WatchStream};
    use fleet_model::{CacheKey, ObjectMeta, ResourceKind};
    use futures::stream;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedWatchClient {
        events: Mutex<Option<Vec<Result<RawWatchEvent, ClusterClientError>>>>,
        watch_calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ClusterClient for ScriptedWatchClient {
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
            self.watch_calls.fetch_add(1, Ordering::Relaxed);
            let events = self.events.lock().take().unwrap_or_default();
            Ok(Box::pin(stream::iter(events)))
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
        ) -> Result<ByteStream, ClusterClientError> {
            Err(ClusterClientError::Permanent("unused".into()))
        }

        async fn list_namespaces(&self) -> Result<Vec<String>, ClusterClientError> {
            Ok(vec![])
        }
    }

    fn test_object(name: &str) -> ResourceObject {
        ResourceObject::new(
            ObjectMeta {
                name: name.to_string(),
                ..Default::default()
            },
            serde_json::Value::Null,
        )
    }

    fn scripted_events(n: usize) -> Vec<Result<RawWatchEvent, ClusterClientError>> {
        (0..n)
            .map(|i| {
                Ok(RawWatchEvent {
                    change_kind: ChangeKind::Modified,
                    object: Some(test_object(&format!("pod-{i}"))),
                })
            })
            .collect()
    }

    #[tokio::test]
    async fn second_subscriber_does_not_open_second_upstream_watch() {
        let watch_calls = Arc::new(AtomicUsize::new(0));
        let calls_for_factory = Arc::clone(&watch_calls);
        let factory: crate::pool::ClientFactory = Arc::new(move |_ctx| {
            Ok(Arc::new(ScriptedWatchClient {
                events: Mutex::new(Some(scripted_events(3))),
                watch_calls: Arc::clone(&calls_for_factory),
            }) as Arc<dyn ClusterClient>)
        });
        let pool = Arc::new(ConnectionPool::new(4, factory));
        let coalescer = WatchCoalescer::new(pool, 100);

        let key = CacheKey::new("ctx", "default", ResourceKind::Pod);
        let (id_a, mut rx_a) = coalescer.subscribe(key.clone()).await.unwrap();
        let (id_b, mut rx_b) = coalescer.subscribe(key.clone()).await.unwrap();

        assert_eq!(coalescer.active_watch_count(), 1);
        assert_eq!(watch_calls.load(Ordering::Relaxed), 1);

        for _ in 0..3 {
            assert!(rx_a.recv().await.is_some());
            assert!(rx_b.recv().await.is_some());
        }

        coalescer.unsubscribe(&key, id_a);
        assert!(coalescer.is_watching(&key));
        coalescer.unsubscribe(&key, id_b);
        assert!(!coalescer.is_watching(&key));
    }

    struct DelayedWatchClient {
        events: Mutex<Option<Vec<Result<RawWatchEvent, ClusterClientError>>>>,
        delay: std::time::Duration,
    }

    #[async_trait::async_trait]
    impl ClusterClient for DelayedWatchClient {
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
            let events = self.events.lock().take().unwrap_or_default();
            let delay = self.delay;
            let paced = stream::unfold(events.into_iter(), move |mut iter| async move {
                let next = iter.next()?;
                tokio::time::sleep(delay).await;
                Some((next, iter))
            });
            Ok(Box::pin(paced))
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
        ) -> Result<ByteStream, ClusterClientError> {
            Err(ClusterClientError::Permanent("unused".into()))
        }

        async fn list_namespaces(&self) -> Result<Vec<String>, ClusterClientError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn slow_listener_drops_events_fast_listener_sees_all() {
        let factory: crate::pool::ClientFactory = Arc::new(move |_ctx| {
            Ok(Arc::new(DelayedWatchClient {
                events: Mutex::new(Some(scripted_events(5))),
                delay: std::time::Duration::from_millis(20),
            }) as Arc<dyn ClusterClient>)
        });
        let pool = Arc::new(ConnectionPool::new(4, factory));
        // A buffer of 2 against 5 paced events leaves room for the slow
        // listener to overflow while it is deliberately left unread.
        let coalescer = WatchCoalescer::new(pool, 2);

        let key = CacheKey::new("ctx", "default", ResourceKind::Pod);
        let (_slow_id, mut slow_rx) = coalescer.subscribe(key.clone()).await.unwrap();
        let (_fast_id, mut fast_rx) = coalescer.subscribe(key.clone()).await.unwrap();

        let fast_reader = tokio::spawn(async move {
            let mut count = 0;
            while fast_rx.recv().await.is_some() {
                count += 1;
            }
            count
        });

        // Outlast the 5 * 20ms paced stream before touching the slow
        // receiver, so its backlog has already overflowed.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        let mut slow_count = 0;
        while let Ok(Some(_event)) =
            tokio::time::timeout(std::time::Duration::from_millis(20), slow_rx.recv()).await
        {
            slow_count += 1;
        }

        let fast_count = fast_reader.await.unwrap();
        assert_eq!(fast_count, 5, "fast listener must see every event");
        assert!(
            slow_count < 5,
            "slow listener must have dropped at least one event, saw {slow_count}"
        );
    }
}
