use crate::model::{ConfigMetadata, Configuration};
use crate::source::ConfigurationSource;
use config::{Config, Environment, File};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
}

/// Loads `Configuration` by layering, in increasing priority:
///
/// 1. compiled-in defaults (`Configuration::default()`)
/// 2. an optional TOML file at `file_path`
/// 3. environment variables prefixed `FLEETVIEW_` (e.g.
///    `FLEETVIEW_CACHE_SIZE=2000`)
///
/// This mirrors the layering `ferrex-config` performs for its own
/// `Config` struct. CLI-flag overrides (highest priority) are applied by
/// the caller on the returned `Configuration`, since only `fleetctl`
/// knows the flag surface.
pub fn load(file_path: Option<&str>) -> Result<(Configuration, ConfigMetadata), ConfigError> {
    let defaults = ConfigurationSource::from(Configuration::default());

    let mut builder = Config::builder()
        .set_default("cache_size", defaults.cache_size as i64)?
        .set_default("cache_ttl_secs", defaults.cache_ttl_secs as i64)?
        .set_default("parallel_fetch", defaults.parallel_fetch)?
        .set_default(
            "health_check_interval_secs",
            defaults.health_check_interval_secs as i64,
        )?
        .set_default("context_timeout_secs", defaults.context_timeout_secs as i64)?
        .set_default("max_connections", defaults.max_connections as i64)?
        .set_default(
            "watch_listener_buffer",
            defaults.watch_listener_buffer as i64,
        )?
        .set_default("batch_size", defaults.batch_size as i64)?
        .set_default("batch_timeout_ms", defaults.batch_timeout_ms as i64)?
        .set_default("reconnect_base_secs", defaults.reconnect_base_secs as i64)?
        .set_default("reconnect_cap_secs", defaults.reconnect_cap_secs as i64)?
        .set_default("reconnect_factor", defaults.reconnect_factor)?
        .set_default(
            "reconnect_max_attempts",
            defaults.reconnect_max_attempts as i64,
        )?;

    let mut file_loaded = false;
    if let Some(path) = file_path {
        debug!("attempting to load configuration file at {}", path);
        builder = builder.add_source(File::with_name(path).required(false));
        file_loaded = std::path::Path::new(path).exists();
        if file_loaded {
            info!("loaded configuration overrides from {}", path);
        } else {
            warn!("configuration file {} not found, using defaults", path);
        }
    }

    let env_source = Environment::with_prefix("FLEETVIEW").separator("__");
    builder = builder.add_source(env_source);

    let assembled = builder.build()?;
    let source: ConfigurationSource = assembled.try_deserialize()?;

    let env_overrides_applied = std::env::vars()
        .filter(|(k, _)| k.starts_with("FLEETVIEW__"))
        .count();

    let metadata = ConfigMetadata {
        file_path: file_path.map(str::to_string),
        file_loaded,
        env_overrides_applied,
    };

    Ok((source.into(), metadata))
}
