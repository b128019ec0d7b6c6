//! Error types for the session layer

use thiserror::Error;

/// Result type alias for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication failures surfaced by the refresh pipeline
///
/// Cloneable so one refresh outcome can be delivered to every caller waiting
/// on the same cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No refresh token in the store; the session cannot be renewed
    #[error("no refresh token available")]
    NoRefreshToken,

    /// The refresh endpoint could not be reached or answered garbage
    #[error("token refresh failed: {message}")]
    Network {
        /// Transport-level failure description
        message: String,
    },

    /// The refresh endpoint answered but refused to issue new tokens
    #[error("token refresh rejected: {message}")]
    Rejected {
        /// Server-provided rejection message
        message: String,
    },
}

impl AuthError {
    /// Create a network error from a transport failure
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a rejection error from a server refusal
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Whether the server explicitly refused the refresh token
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Device key-value store failures
///
/// Never escapes [`crate::store::TokenStore`]: reads fall back to `None` and
/// write failures are logged, keeping token access infallible for callers.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying I/O failure
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend unavailable or misbehaving
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}
