//! Error types for CairnDB operations.

use thiserror::Error;

/// Result type alias using CairnDB's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during CairnDB operations.
///
/// Every variant is recoverable. Callers are expected to branch on the kind;
/// nothing in the crate retries on their behalf.
#[derive(Debug, Error)]
pub enum Error {
    /// Vector length disagrees with the collection's dimension.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Record id already present in the collection, or repeated in one batch.
    #[error("duplicate record id: {0}")]
    DuplicateId(String),

    /// No collection with the given name.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// A different collection already uses the given name.
    #[error("collection already exists: {0}")]
    CollectionAlreadyExists(String),

    /// Collection name violates the naming rules.
    #[error("invalid collection name {name:?}: {reason}")]
    InvalidCollectionName { name: String, reason: String },

    /// Malformed request (misaligned columns, record without content, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid filter expression.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The embedding provider needs a credential and none is configured.
    #[error("no credential configured for {provider} (set one of: {env_vars})")]
    CredentialMissing { provider: String, env_vars: String },

    /// The embedding provider could not be reached or failed the request.
    #[error("embedding provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    /// The embedding provider throttled the request.
    #[error("embedding provider {provider} rate limited the request{}", retry_hint(.retry_after_secs))]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// IO error during storage operations.
    #[error("io error: {0}")]
    IoError(String),

    /// WAL corruption detected.
    #[error("WAL corrupted: {0}")]
    WalCorrupted(String),

    /// Catalog manifest or data file could not be decoded.
    #[error("catalog corrupted: {0}")]
    CatalogCorrupted(String),

    /// A blocking task of the async API panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl Error {
    /// Returns true for provider failures a caller may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::RateLimited { .. } | Error::ProviderUnavailable { .. }
        )
    }
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(", retry after {secs}s"),
        None => String::new(),
    }
}
