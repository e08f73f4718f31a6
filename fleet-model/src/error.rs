use thiserror::Error;

/// Error taxonomy for the fleet data plane (spec.md §7).
///
/// Variants are kinds, not wire types: callers match on `is_transient()`
/// rather than on specific upstream error types, since the concrete
/// cluster client implementation is an out-of-scope collaborator.
#[derive(Error, Debug)]
pub enum FleetError {
    /// Network/timeout/rate-limited upstream failure. Retried with
    /// backoff at the subscription boundary; surfaced per-context in
    /// fan-out without aborting the aggregate.
    #[error("transient upstream error on {context}: {message}")]
    TransientUpstream { context: String, message: String },

    /// 4xx-equivalent upstream failure (not found, forbidden). Not
    /// retried.
    #[error("permanent upstream error on {context}: {message}")]
    PermanentUpstream { context: String, message: String },

    /// The connection pool is at `MaxConnections` capacity.
    #[error("connection pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },

    /// A long-running task observed its cancellation token fire.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// Template parse or execution error (spec.md §4.1, §7).
    #[error("template error: {0}")]
    Template(#[from] crate::template::TemplateError),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FleetError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FleetError::TransientUpstream { .. })
    }

    pub fn context_name(&self) -> Option<&str> {
        match self {
            FleetError::TransientUpstream { context, .. }
            | FleetError::PermanentUpstream { context, .. } => Some(context.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
