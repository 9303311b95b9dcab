//! Error types for the client-core library
//!
//! Every fallible operation in this crate returns [`ClientResult`]. Errors are
//! grouped into categories (see [`ClientError::category`]) so that callers and
//! the retry helpers in [`crate::client::recovery`] can decide how to react
//! without matching on every variant.
//!
//! # Propagation policy
//!
//! - **Lifecycle** errors (`InitializationFailed`, `HandshakeFailed`,
//!   `ApprovalRejected`, `DisconnectFailed`) are recovered by the coordinator
//!   and reported through outcome values rather than `Err`.
//! - **Request** errors (`RequestFailed`, `RequestRejected`, `OperationTimeout`)
//!   propagate to the caller because they carry user-actionable meaning.
//! - **Precondition** errors indicate a caller bug, such as dispatching a
//!   request without an active session.
//!
//! # Examples
//!
//! ```rust
//! use ledgerlink_client_core::ClientError;
//!
//! let err = ClientError::RequestRejected { reason: "User rejected the request".to_string() };
//! assert_eq!(err.category(), "request");
//! assert!(!err.is_recoverable());
//!
//! let err = ClientError::InitializationFailed { reason: "relay unreachable".to_string() };
//! assert!(err.is_recoverable());
//! ```

use thiserror::Error;

/// Result type for client-core operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while coordinating a wallet-pairing session
#[derive(Debug, Error)]
pub enum ClientError {
    /// The underlying protocol client could not be constructed
    #[error("Client initialization failed: {reason}")]
    InitializationFailed { reason: String },

    /// The connection handshake could not be initiated or completed
    #[error("Connection handshake failed: {reason}")]
    HandshakeFailed { reason: String },

    /// The remote wallet (or its user) rejected the session proposal
    #[error("Session proposal rejected: {reason}")]
    ApprovalRejected { reason: String },

    /// The disconnect notice could not be delivered
    #[error("Disconnect failed for topic {topic}: {reason}")]
    DisconnectFailed { topic: String, reason: String },

    /// A session request failed in transport or in the wallet
    #[error("Request {method} failed: {reason}")]
    RequestFailed { method: String, reason: String },

    /// The wallet user declined a session request
    #[error("Request rejected by wallet: {reason}")]
    RequestRejected { reason: String },

    /// An operation was invoked in a state that does not allow it
    #[error("Precondition failed for {operation}: {reason}")]
    PreconditionFailed { operation: String, reason: String },

    /// An operation did not complete in time
    #[error("Operation timed out after {duration_ms}ms")]
    OperationTimeout { duration_ms: u64 },

    /// A chain identifier is not of the form `namespace:reference`
    #[error("Invalid chain id '{value}': {reason}")]
    InvalidChainId { value: String, reason: String },

    /// An account identifier is not of the form `namespace:reference:address`
    #[error("Invalid account id '{value}': {reason}")]
    InvalidAccountId { value: String, reason: String },

    /// No request vocabulary is known for a namespace
    #[error("Unsupported namespace: {namespace}")]
    UnsupportedNamespace { namespace: String },

    /// A configuration value is missing or out of range
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    /// A request or response payload could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ClientError {
    /// Create a handshake error
    pub fn handshake(reason: impl Into<String>) -> Self {
        Self::HandshakeFailed { reason: reason.into() }
    }

    /// Create a precondition error for the named operation
    pub fn precondition(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a request error for the named method
    pub fn request(method: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RequestFailed {
            method: method.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError { message: message.into() }
    }

    /// Short category name used in structured logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::InitializationFailed { .. } => "initialization",
            Self::HandshakeFailed { .. } | Self::ApprovalRejected { .. } => "handshake",
            Self::DisconnectFailed { .. } => "disconnect",
            Self::RequestFailed { .. } | Self::RequestRejected { .. } => "request",
            Self::PreconditionFailed { .. } => "precondition",
            Self::OperationTimeout { .. } => "timeout",
            Self::InvalidChainId { .. }
            | Self::InvalidAccountId { .. }
            | Self::UnsupportedNamespace { .. } => "identifier",
            Self::InvalidConfiguration { .. } => "configuration",
            Self::Serialization(_) => "serialization",
            Self::InternalError { .. } => "internal",
        }
    }

    /// Whether retrying the same operation may succeed
    ///
    /// Rejections by the wallet user and caller bugs are never recoverable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InitializationFailed { .. }
                | Self::HandshakeFailed { .. }
                | Self::DisconnectFailed { .. }
                | Self::RequestFailed { .. }
                | Self::OperationTimeout { .. }
        )
    }
}
