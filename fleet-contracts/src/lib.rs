//! Trait surfaces describing the two external collaborators the fleet
//! data plane interacts with (spec.md §1, §6): the cluster client
//! capability it consumes, and the fleet client capability it exposes.

pub mod cluster_client;
pub mod fleet_client;

pub mod prelude {
    pub use super::cluster_client::{
        ByteStream, ClusterClient, ClusterClientError, LogOptions, NodeMetrics, PodMetrics,
        RawWatchEvent, WatchStream,
    };
    pub use super::fleet_client::{AggregatedRows, ContextError, FleetClientApi};
}

pub use cluster_client::{
    ByteStream, ClusterClient, ClusterClientError, LogOptions, NodeMetrics, PodMetrics,
    RawWatchEvent, WatchStream,
};
pub use fleet_client::{AggregatedRows, ContextError, FleetClientApi};
