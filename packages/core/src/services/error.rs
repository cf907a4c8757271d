//! Service Layer Error Types
//!
//! This module defines the error taxonomy of the route forest. Each variant
//! maps to one HTTP status class for the serving layer.

use crate::config::ConfigError;
use crate::db::DatabaseError;
use crate::models::ValidationError;
use thiserror::Error;

/// Route service errors
#[derive(Error, Debug)]
pub enum RouteServiceError {
    /// Referenced node (by name, id or computed position) does not exist
    #[error("Route not found: {what}")]
    NotFound { what: String },

    /// Duplicate name or violated structural precondition
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored chain is broken (cycle, dangling pointer, duplicate claim, depth cap)
    #[error("Route data integrity violation: {0}")]
    IntegrityViolation(String),

    /// Malformed payload patch or route description
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Database operation failed
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    /// Seed file could not be read
    #[error("Failed to read seed data: {0}")]
    Io(#[from] std::io::Error),

    /// Seed file is not valid JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Store settings are unusable
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RouteServiceError {
    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a not found error for a `(role, name)` lookup
    pub fn route_not_found(role: &str, name: &str) -> Self {
        Self::not_found(format!("'{}' in role '{}'", name, role))
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an integrity violation error
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::IntegrityViolation(msg.into())
    }

    /// Create a serialization error
    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// HTTP status class the serving layer should answer with
    pub fn status_class(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Conflict(_) | Self::Validation(_) | Self::Serialization(_) => 400,
            Self::IntegrityViolation(_) | Self::Database(_) | Self::Io(_) | Self::Config(_) => 500,
        }
    }

    /// Whether retrying the whole operation may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(e) if e.is_busy())
    }
}
