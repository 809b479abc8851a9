//! Error types for MPC connection operations

use thiserror::Error;

/// Result type alias for MPC connection operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving credentials or driving remote operations
///
/// Every payload is an owned string so the same error value can be handed to
/// every waiter of a shared refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // ============ Credential Errors ============
    /// No token set is stored for the device
    #[error("No credentials stored for device: {0}")]
    NoCredentials(String),

    /// Access, refresh and bootstrap tokens are all expired
    #[error("All credential tiers expired for device: {0}")]
    AuthExhausted(String),

    /// The remote refresh call failed
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// A credential could not be decoded
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    // ============ Remote Operation Errors ============
    /// The remote operation reached a failure status
    #[error("Operation {operation_id} failed: {reason}")]
    OperationFailed {
        operation_id: String,
        reason: String,
    },

    /// Polling deadline or poll budget exceeded before the target status
    #[error("Operation {operation_id} timed out after {waited_ms}ms")]
    OperationTimedOut { operation_id: String, waited_ms: u64 },

    /// The caller stopped waiting for the operation
    #[error("Wait for operation {0} was cancelled")]
    Cancelled(String),

    /// A completed operation carried no usable result
    #[error("Operation {0} completed without a result")]
    MissingOperationResult(String),

    // ============ Network Errors ============
    /// Transport-level failure
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    // ============ Wallet Errors ============
    /// Account not present in the wallet
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    // ============ Storage Errors ============
    /// Credential storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    // ============ Internal Errors ============
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error is a connectivity problem the caller may retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_))
    }

    /// Check if the user has to re-authenticate out-of-band
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Error::NoCredentials(_) | Error::AuthExhausted(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Error::InvalidToken(e.to_string())
    }
}

impl From<hex::FromHexError> for Error {
    fn from(e: hex::FromHexError) -> Self {
        Error::Serialization(e.to_string())
    }
}
