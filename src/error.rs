// 🚫 Error Taxonomy
// Every action either succeeds or fails with exactly one of these.
// None of them is retried: each is terminal for the triggering request.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Policy denial. Nothing was written.
    #[error("forbidden: {action} ({reason})")]
    Forbidden {
        action: &'static str,
        reason: &'static str,
    },

    /// A system-wide rule would break (last admin, household creator, ...).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Bad input: malformed draft, duplicate e-mail, unknown enum value.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No acting user could be resolved for the request.
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        AppError::NotFound { entity, id }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        AppError::InvariantViolation(message.into())
    }

    /// Short machine-readable tag, used in API envelopes and logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Forbidden { .. } => "forbidden",
            AppError::InvariantViolation(_) => "invariant_violation",
            AppError::NotFound { .. } => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Database(_) => "database",
            AppError::Serialization(_) => "serialization",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
