use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following the TESSERA-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Model and registry errors
/// - **2000-2999**: Statement construction errors
/// - **3000-3999**: Shard routing errors
/// - **4000-4999**: Execution errors
/// - **5000-5999**: Internal errors
///
/// Codes are stable across versions (semver contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Model Errors (1000-1999) ===
    /// TESSERA-1001: Registered type is not a valid record
    ModelType = 1001,
    /// TESSERA-1002: Field name not present in the model
    UnknownField = 1002,
    /// TESSERA-1003: Result column not present in the model
    UnknownColumn = 1003,
    /// TESSERA-1004: Identifier cannot be quoted safely
    InvalidIdentifier = 1004,
    /// TESSERA-1005: Result value does not fit the field type
    Conversion = 1005,

    // === Statement Errors (2000-2999) ===
    /// TESSERA-2001: Expression variant not valid in this position
    UnsupportedExpression = 2001,
    /// TESSERA-2002: Table reference variant not valid in this position
    UnsupportedTable = 2002,
    /// TESSERA-2003: Assignable variant not valid in this position
    UnsupportedAssignable = 2003,
    /// TESSERA-2004: INSERT without rows
    InsertZeroRow = 2004,
    /// TESSERA-2005: UPDATE without SET entries
    UpdateNoSet = 2005,
    /// TESSERA-2006: Query returned no row where one was expected
    NoRows = 2006,

    // === Sharding Errors (3000-3999) ===
    /// TESSERA-3001: Sharded query without a WHERE clause
    NoWhereClause = 3001,
    /// TESSERA-3002: Predicate operator cannot be routed
    UnsupportedRoutingOperator = 3002,
    /// TESSERA-3003: Model has no shard keys
    ShardingNotConfigured = 3003,
    /// TESSERA-3004: Routing produced no destination
    NoDestination = 3004,
    /// TESSERA-3005: Destination database is not in the shard set
    UnknownShard = 3005,

    // === Execution Errors (4000-4999) ===
    /// TESSERA-4001: Error reported by the database session
    Session = 4001,
    /// TESSERA-4002: Transaction already committed or rolled back
    TxDone = 4002,

    /// TESSERA-9999: Unknown/unclassified error
    Unknown = 9999,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Get the formatted code string (e.g., "TESSERA-1002")
    pub fn as_str(&self) -> String {
        format!("TESSERA-{:04}", self.as_u16())
    }

    pub fn category(&self) -> ErrorCategory {
        match self.as_u16() {
            1000..=1999 => ErrorCategory::Model,
            2000..=2999 => ErrorCategory::Statement,
            3000..=3999 => ErrorCategory::Sharding,
            4000..=4999 => ErrorCategory::Execution,
            _ => ErrorCategory::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> String {
        code.as_str()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        let num: u16 = s
            .strip_prefix("TESSERA-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| "Invalid format".to_string())?;
        Self::try_from(num).map_err(|_| "Unknown code".to_string())
    }
}

impl TryFrom<u16> for ErrorCode {
    type Error = String;

    fn try_from(n: u16) -> std::result::Result<Self, Self::Error> {
        match n {
            1001 => Ok(Self::ModelType),
            1002 => Ok(Self::UnknownField),
            1003 => Ok(Self::UnknownColumn),
            1004 => Ok(Self::InvalidIdentifier),
            1005 => Ok(Self::Conversion),
            2001 => Ok(Self::UnsupportedExpression),
            2002 => Ok(Self::UnsupportedTable),
            2003 => Ok(Self::UnsupportedAssignable),
            2004 => Ok(Self::InsertZeroRow),
            2005 => Ok(Self::UpdateNoSet),
            2006 => Ok(Self::NoRows),
            3001 => Ok(Self::NoWhereClause),
            3002 => Ok(Self::UnsupportedRoutingOperator),
            3003 => Ok(Self::ShardingNotConfigured),
            3004 => Ok(Self::NoDestination),
            3005 => Ok(Self::UnknownShard),
            4001 => Ok(Self::Session),
            4002 => Ok(Self::TxDone),
            9999 => Ok(Self::Unknown),
            _ => Err(format!("Unknown error code: {}", n)),
        }
    }
}

/// High-level error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorCategory {
    Model,
    Statement,
    Sharding,
    Execution,
    Internal,
}
