//! Error types for the access decision engine

use thiserror::Error;

/// Access decision errors
///
/// Every variant is terminal for the request that produced it.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Caller lacks the scope, role or policy the operation requires
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Caller is authenticated but does not own the target resource
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Path/body id mismatch or missing resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store backend failure
    #[error("Store error: {0}")]
    Store(String),
}

impl AuthzError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            AuthzError::Forbidden(_) => "forbidden",
            AuthzError::Unauthorized(_) => "unauthorized",
            AuthzError::NotFound(_) => "not_found",
            AuthzError::Store(_) => "store",
        }
    }
}

/// Result type for access decision operations
pub type Result<T> = std::result::Result<T, AuthzError>;
