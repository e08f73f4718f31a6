use thiserror::Error;

/// Errors surfaced by `Validate`/`Execute`/`ExecuteNamed` (spec.md §4.1).
///
/// Defined here (rather than in `fleet-core`, where the engine itself
/// lives) so the shared `FleetError` can wrap it without a dependency
/// cycle between `fleet-model` and `fleet-core`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("undefined function: {0}")]
    UndefinedFunction(String),

    #[error("unknown named template: {0}")]
    UnknownNamedTemplate(String),

    #[error("execution error: {0}")]
    Execution(String),
}
