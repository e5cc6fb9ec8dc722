//! Core error types

use thiserror::Error;

/// Result type for registry and source-building operations
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors raised by registries and the declarative source builder
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A metric with this name is already registered
    #[error("metric '{0}' already exists in the registry")]
    DuplicateName(String),

    /// The object declares no metrics and is not a source itself
    #[error("no declared metrics found")]
    NoDeclaredMetrics,

    /// The object is a source and declares metrics, but carries no registry
    /// to deposit them into
    #[error("hybrid source declares metrics but carries no registry")]
    HybridWithoutRegistry,
}
