//! Fleet data plane core (spec.md §1, §4): the stateful machinery
//! behind multi-cluster resource viewing — cache, pool, coalescer,
//! event processor, health monitor, template engine, transformer
//! registry, row projection, selection tracking, and the fleet client
//! that wires them together behind `fleet_contracts::FleetClientApi`.

pub mod cache;
pub mod coalescer;
pub mod event_processor;
pub mod fleet;
pub mod formatting;
pub mod health;
pub mod pool;
pub mod projection;
pub mod selection;
pub mod styling;
pub mod template;
pub mod transformers;

pub use cache::{start_cleanup_routine, ResourceCache};
pub use coalescer::{ListenerId, WatchCoalescer};
pub use event_processor::{Batch, BatchProcessor, EventProcessor, ProcessResult};
pub use fleet::{FleetClient, FleetClientConfig, ReconnectBackoff};
pub use health::{ContextHealth, HealthMonitor};
pub use pool::{ClientFactory, ConnectionPool, PooledClient};
pub use projection::{ProjectionOptions, RowProjector};
pub use selection::SelectionTracker;
pub use template::TemplateEngine;
pub use transformers::{SortValue, Transformer, TransformerRegistry};
