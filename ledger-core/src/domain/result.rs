//! Result and error types for the core library

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ClientId, MovementId};

/// Core library error type
///
/// Every failure a caller can observe carries one of these kinds, so the
/// CLI (or any other front end) can render a precise message without
/// inspecting strings.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Client {0} not found")]
    ClientNotFound(ClientId),

    #[error("Sender client {0} not found")]
    SenderNotFound(ClientId),

    #[error("Recipient client {0} not found")]
    RecipientNotFound(ClientId),

    #[error("Movement {0} not found")]
    MovementNotFound(MovementId),

    #[error("Movement {0} cannot be reversed")]
    MovementNotReversible(MovementId),

    #[error("Invalid amount {0}: must be greater than zero")]
    InvalidAmount(Decimal),

    #[error("Invalid movement: {0}")]
    InvalidMovement(String),

    #[error("Movement {movement} does not belong to client {client}")]
    OwnershipMismatch {
        movement: MovementId,
        client: ClientId,
    },

    #[error("Store temporarily unavailable: {0}")]
    TransientStore(String),

    #[error("Cache temporarily unavailable: {0}")]
    TransientCache(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a transient store error (timeouts, busy database)
    pub fn transient_store(msg: impl Into<String>) -> Self {
        Self::TransientStore(msg.into())
    }

    /// Create a transient cache error
    pub fn transient_cache(msg: impl Into<String>) -> Self {
        Self::TransientCache(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an invalid movement error
    pub fn invalid_movement(msg: impl Into<String>) -> Self {
        Self::InvalidMovement(msg.into())
    }

    /// Stable machine-readable tag for this error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::ClientNotFound(_) => "client_not_found",
            Error::SenderNotFound(_) => "sender_not_found",
            Error::RecipientNotFound(_) => "recipient_not_found",
            Error::MovementNotFound(_) => "movement_not_found",
            Error::MovementNotReversible(_) => "movement_not_reversible",
            Error::InvalidAmount(_) => "invalid_amount",
            Error::InvalidMovement(_) => "invalid_movement",
            Error::OwnershipMismatch { .. } => "ownership_mismatch",
            Error::TransientStore(_) => "transient_store_error",
            Error::TransientCache(_) => "transient_cache_error",
            Error::Conflict(_) => "conflict",
            Error::Store(_) => "store_error",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientStore(_) | Error::TransientCache(_))
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        let msg = err.to_string();
        let lower = msg.to_lowercase();
        if lower.contains("constraint") || lower.contains("duplicate key") {
            Error::Conflict(msg)
        } else if lower.contains("database is locked")
            || lower.contains("resource temporarily unavailable")
        {
            Error::TransientStore(msg)
        } else {
            Error::Store(msg)
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let mut context = HashMap::new();
                context.insert("kind".to_string(), serde_json::Value::from(e.kind()));
                Self::fail_with_context(e.to_string(), context)
            }
        }
    }
}
