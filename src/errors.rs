use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Stable error category handed to the calling layer, which maps it to its
/// own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DatabaseError(_) | Self::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Message suitable for the caller. Storage failures return a generic
    /// message; the underlying `DbErr` stays reachable through `source()`.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            _ => self.to_string(),
        }
    }

    pub fn not_found(order_no: &str) -> Self {
        ServiceError::NotFound(format!("return order {} not found", order_no))
    }

    pub fn already_cancelled(order_no: &str) -> Self {
        ServiceError::Conflict(format!("order {} is already cancelled", order_no))
    }

    pub fn not_in_draft(order_no: &str) -> Self {
        ServiceError::Conflict(format!("order {} not in draft", order_no))
    }

    /// Wraps a storage failure that happened while managing a transaction.
    pub fn transaction(stage: &str, err: DbErr) -> Self {
        ServiceError::InternalError(format!("transaction {} failed: {}", stage, err))
    }
}
