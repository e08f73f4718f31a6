//! Layered configuration for the fleet data plane: compiled-in defaults,
//! an optional TOML file, environment variables, and (at the `fleetctl`
//! boundary) explicit CLI overrides — the same layering
//! `ferrex-config` performs for the media server.

pub mod loader;
pub mod model;
pub mod source;

pub use loader::{load, ConfigError};
pub use model::{ConfigMetadata, Configuration, ReconnectConfig};
