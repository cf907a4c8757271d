//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, initialization, and query failures.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
///
/// Covers connection, initialization and statement failures. Business rule
/// violations (missing nodes, duplicate names, broken chains) are reported by
/// the service layer instead.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A stored row could not be decoded
    #[error("Invalid row in ui_routes: {0}")]
    InvalidRow(String),
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create an invalid row error
    pub fn invalid_row(msg: impl Into<String>) -> Self {
        Self::InvalidRow(msg.into())
    }

    /// Whether SQLite gave up waiting for a lock (`SQLITE_BUSY`/`SQLITE_LOCKED`)
    ///
    /// Busy errors are transient: the same statement can succeed once the
    /// other writer commits.
    pub fn is_busy(&self) -> bool {
        let message = match self {
            Self::LibsqlError(e) => e.to_string(),
            Self::SqlExecutionError { context } => context.clone(),
            _ => return false,
        };
        let message = message.to_ascii_lowercase();
        message.contains("database is locked")
            || message.contains("database table is locked")
            || message.contains("sqlite_busy")
    }

    /// Whether the failure is a `UNIQUE` constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::LibsqlError(e) => e.to_string().contains("UNIQUE constraint failed"),
            Self::SqlExecutionError { context } => context.contains("UNIQUE constraint failed"),
            _ => false,
        }
    }
}
