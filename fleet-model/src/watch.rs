use crate::cache::CacheKey;
use chrono::{DateTime, Utc};

/// A single upstream watch is keyed identically to a cache entry
/// (spec.md §3): at most one active watch per `(context, namespace, kind)`.
pub type WatchKey = CacheKey;

/// The kind of change carried by a `WatchEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Error,
}

/// A watch event, timestamped at reception rather than at origin
/// (spec.md §3).
#[derive(Debug, Clone)]
pub struct WatchEvent<T> {
    pub change_kind: ChangeKind,
    pub object: Option<T>,
    pub context: String,
    pub namespace: String,
    pub kind: crate::kind::ResourceKind,
    pub timestamp: DateTime<Utc>,
}

impl<T> WatchEvent<T> {
    pub fn new(
        change_kind: ChangeKind,
        object: Option<T>,
        context: impl Into<String>,
        namespace: impl Into<String>,
        kind: crate::kind::ResourceKind,
    ) -> Self {
        Self {
            change_kind,
            object,
            context: context.into(),
            namespace: namespace.into(),
            kind,
            timestamp: Utc::now(),
        }
    }
}
