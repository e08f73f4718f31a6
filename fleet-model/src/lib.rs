//! Core data model definitions shared across fleet-view crates.
//!
//! Pure data types only: no I/O, no async, no locking. The components in
//! `fleet-core` build their concurrency and caching machinery on top of
//! these.

pub mod cache;
pub mod error;
pub mod identity;
pub mod kind;
pub mod object;
pub mod row;
pub mod selection;
pub mod template;
pub mod watch;

pub use cache::{CacheEntry, CacheKey, CacheMetricsSnapshot, VersionToken};
pub use error::{FleetError, Result};
pub use identity::ResourceIdentity;
pub use kind::{ResourceKind, UnknownKind};
pub use object::{ObjectMeta, ResourceObject};
pub use row::{Row, RowSnapshot, SortDirection};
pub use selection::Selection;
pub use template::TemplateError;
pub use watch::{ChangeKind, WatchEvent, WatchKey};
