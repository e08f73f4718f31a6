use std::time::Duration;

/// Exhaustive set of options the core recognizes (spec.md §6).
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Max cache entries. Default 1000.
    pub cache_size: usize,
    /// Per-entry freshness. Default 30s.
    pub cache_ttl: Duration,
    /// Parallel vs sequential context fan-out. Default true.
    pub parallel_fetch: bool,
    /// Probe period. Default 60s.
    pub health_check_interval: Duration,
    /// Per-context op timeout. Default 10s.
    pub context_timeout: Duration,
    /// Pool capacity. Default 50.
    pub max_connections: usize,
    /// Per-listener queue depth. Default 100.
    pub watch_listener_buffer: usize,
    /// Event processor batch size. Default 50.
    pub batch_size: usize,
    /// Event processor batch timeout. Default 100ms.
    pub batch_timeout: Duration,
    pub reconnect: ReconnectConfig,
}

/// Exponential backoff parameters for watch resubscription (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectConfig {
    pub base: Duration,
    pub cap: Duration,
    pub factor: f64,
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            factor: 2.0,
            max_attempts: 10,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            cache_size: 1000,
            cache_ttl: Duration::from_secs(30),
            parallel_fetch: true,
            health_check_interval: Duration::from_secs(60),
            context_timeout: Duration::from_secs(10),
            max_connections: 50,
            watch_listener_buffer: 100,
            batch_size: 50,
            batch_timeout: Duration::from_millis(100),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Which layer supplied the effective configuration, kept for
/// diagnostics the way `ferrex-config::ConfigMetadata` tracks
/// provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMetadata {
    pub file_path: Option<String>,
    pub file_loaded: bool,
    pub env_overrides_applied: usize,
}
