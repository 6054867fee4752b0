//! # tessera-error
//!
//! Error taxonomy for the tessera query builder.
//!
//! Every [`Error`] maps to a stable numeric code (TESSERA-XXXX) so callers
//! can branch on the failure kind without matching message text.

mod code;
mod suggest;

pub use code::{ErrorCategory, ErrorCode};
pub use suggest::closest_match;

use serde::Serialize;

/// Boxed error produced by a database driver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid model type `{type_name}`: {reason}")]
    ModelType { type_name: String, reason: String },

    #[error("unknown field `{field}`{}", suggestion_suffix(.suggestion))]
    UnknownField {
        field: String,
        suggestion: Option<String>,
    },

    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    #[error("invalid identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("cannot convert column `{column}`: expected {expected}, found {found}")]
    Conversion {
        column: String,
        expected: String,
        found: String,
    },

    #[error("unsupported expression: {0}")]
    UnsupportedExpression(String),

    #[error("unsupported table reference: {0}")]
    UnsupportedTable(String),

    #[error("unsupported assignable: {0}")]
    UnsupportedAssignable(String),

    #[error("insert requires at least one row")]
    InsertZeroRow,

    #[error("update requires at least one assignment")]
    UpdateNoSet,

    #[error("no rows in result set")]
    NoRows,

    #[error("sharded query requires a WHERE clause")]
    NoWhereClause,

    #[error("operator `{0}` cannot be used for shard routing")]
    UnsupportedRoutingOperator(String),

    #[error("model `{0}` has no sharding rule")]
    ShardingNotConfigured(String),

    #[error("predicate does not route to any shard")]
    NoDestination,

    #[error("unknown shard `{0}`")]
    UnknownShard(String),

    #[error("transaction has already been committed or rolled back")]
    TxDone,

    #[error("session error: {0}")]
    Session(#[source] BoxError),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean `{}`?)", s),
        None => String::new(),
    }
}

impl Error {
    /// Wrap a driver error.
    pub fn session<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Session(err.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ModelType { .. } => ErrorCode::ModelType,
            Error::UnknownField { .. } => ErrorCode::UnknownField,
            Error::UnknownColumn(_) => ErrorCode::UnknownColumn,
            Error::InvalidIdentifier(_) => ErrorCode::InvalidIdentifier,
            Error::Conversion { .. } => ErrorCode::Conversion,
            Error::UnsupportedExpression(_) => ErrorCode::UnsupportedExpression,
            Error::UnsupportedTable(_) => ErrorCode::UnsupportedTable,
            Error::UnsupportedAssignable(_) => ErrorCode::UnsupportedAssignable,
            Error::InsertZeroRow => ErrorCode::InsertZeroRow,
            Error::UpdateNoSet => ErrorCode::UpdateNoSet,
            Error::NoRows => ErrorCode::NoRows,
            Error::NoWhereClause => ErrorCode::NoWhereClause,
            Error::UnsupportedRoutingOperator(_) => ErrorCode::UnsupportedRoutingOperator,
            Error::ShardingNotConfigured(_) => ErrorCode::ShardingNotConfigured,
            Error::NoDestination => ErrorCode::NoDestination,
            Error::UnknownShard(_) => ErrorCode::UnknownShard,
            Error::TxDone => ErrorCode::TxDone,
            Error::Session(_) => ErrorCode::Session,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }

    /// Whether retrying the same statement may succeed.
    ///
    /// Only driver failures qualify; everything else is deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Session(_))
    }

    /// Structured form for log sinks.
    pub fn report(&self) -> ErrorReport {
        let hint = match self {
            Error::UnknownField {
                suggestion: Some(s),
                ..
            } => Some(format!("Did you mean '{}'?", s)),
            Error::NoWhereClause | Error::NoDestination => {
                Some("Filter on the model's shard keys with `eq`".to_string())
            }
            _ => None,
        };
        ErrorReport {
            code: self.code(),
            message: self.to_string(),
            hint,
        }
    }
}

/// Serializable snapshot of an [`Error`].
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"code":"{}","message":"Serialization failed"}}"#,
                self.code
            )
        })
    }
}

/// Result type alias for tessera operations
pub type Result<T> = std::result::Result<T, Error>;
