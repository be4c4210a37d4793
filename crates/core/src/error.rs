//! Unified error types for the metrics engine.
//!
//! Error codes:
//! - SRC_001: Event source failed or returned nothing
//! - SINK_001: Table sink failed
//! - CONN_001: Warehouse connection could not be opened
//! - SCHEMA_001-003: Table shape errors
//! - CFG_001: Configuration errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Schema error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// SCHEMA_001: Tables have incompatible dimensions
    DimensionMismatch,
    /// SCHEMA_002: Two metric columns share a name
    ColumnCollision,
    /// SCHEMA_003: Referenced metric column does not exist
    UnknownColumn,
}

impl SchemaErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DimensionMismatch => "SCHEMA_001",
            Self::ColumnCollision => "SCHEMA_002",
            Self::UnknownColumn => "SCHEMA_003",
        }
    }
}

/// Unified error type for the metrics engine.
#[derive(Debug, Error)]
pub enum Error {
    /// The event source failed, or returned no rows.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("publish failed for {table}: {message}")]
    Publish { table: String, message: String },

    #[error("connection error: {0}")]
    Connection(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("column collision: {0}")]
    ColumnCollision(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn publish(table: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Publish {
            table: table.into(),
            message: msg.into(),
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn column_collision(column: impl Into<String>) -> Self {
        Self::ColumnCollision(column.into())
    }

    pub fn unknown_column(column: impl Into<String>) -> Self {
        Self::UnknownColumn(column.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the stable error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "SRC_001",
            Self::Publish { .. } => "SINK_001",
            Self::Connection(_) => "CONN_001",
            Self::Schema(_) => SchemaErrorCode::DimensionMismatch.code(),
            Self::ColumnCollision(_) => SchemaErrorCode::ColumnCollision.code(),
            Self::UnknownColumn(_) => SchemaErrorCode::UnknownColumn.code(),
            Self::Config(_) => "CFG_001",
            Self::Internal(_) => "INT_001",
        }
    }
}
