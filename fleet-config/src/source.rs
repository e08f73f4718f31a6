use crate::model::{Configuration, ReconnectConfig};
use serde::Deserialize;
use std::time::Duration;

/// The serde-friendly shape configuration is read into before being
/// converted to `Configuration`'s `Duration`-typed fields. Durations are
/// expressed in the units their field name carries (`_secs`/`_ms`),
/// matching how `ferrex-config` keeps its file/env layer in plain
/// primitives and converts once at the edge.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigurationSource {
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
    pub parallel_fetch: bool,
    pub health_check_interval_secs: u64,
    pub context_timeout_secs: u64,
    pub max_connections: usize,
    pub watch_listener_buffer: usize,
    pub batch_size: usize,
    pub batch_timeout_ms: u64,
    pub reconnect_base_secs: u64,
    pub reconnect_cap_secs: u64,
    pub reconnect_factor: f64,
    pub reconnect_max_attempts: u32,
}

impl Default for ConfigurationSource {
    fn default() -> Self {
        Configuration::default().into()
    }
}

impl From<Configuration> for ConfigurationSource {
    fn from(c: Configuration) -> Self {
        Self {
            cache_size: c.cache_size,
            cache_ttl_secs: c.cache_ttl.as_secs(),
            parallel_fetch: c.parallel_fetch,
            health_check_interval_secs: c.health_check_interval.as_secs(),
            context_timeout_secs: c.context_timeout.as_secs(),
            max_connections: c.max_connections,
            watch_listener_buffer: c.watch_listener_buffer,
            batch_size: c.batch_size,
            batch_timeout_ms: c.batch_timeout.as_millis() as u64,
            reconnect_base_secs: c.reconnect.base.as_secs(),
            reconnect_cap_secs: c.reconnect.cap.as_secs(),
            reconnect_factor: c.reconnect.factor,
            reconnect_max_attempts: c.reconnect.max_attempts,
        }
    }
}

impl From<ConfigurationSource> for Configuration {
    fn from(s: ConfigurationSource) -> Self {
        Self {
            cache_size: s.cache_size,
            cache_ttl: Duration::from_secs(s.cache_ttl_secs),
            parallel_fetch: s.parallel_fetch,
            health_check_interval: Duration::from_secs(s.health_check_interval_secs),
            context_timeout: Duration::from_secs(s.context_timeout_secs),
            max_connections: s.max_connections,
            watch_listener_buffer: s.watch_listener_buffer,
            batch_size: s.batch_size,
            batch_timeout: Duration::from_millis(s.batch_timeout_ms),
            reconnect: ReconnectConfig {
                base: Duration::from_secs(s.reconnect_base_secs),
                cap: Duration::from_secs(s.reconnect_cap_secs),
                factor: s.reconnect_factor,
                max_attempts: s.reconnect_max_attempts,
            },
        }
    }
}
