//! UIRoute Core
//!
//! This crate stores the navigation routes of a web UI as one ordered forest
//! per role in a single libsql table, and provides the operations an admin
//! surface needs to edit them.
//!
//! # Architecture
//!
//! - **Back-pointer ordering**: each row stores the id of the sibling before it
//!   (`prev_sibling`, 0 for the first child); there is no position column
//! - **Id relations**: parent and sibling links are plain integer columns
//!   resolved by lookups, never an in-memory object graph
//! - **One transaction per operation**: every pointer rewrite of a mutation
//!   commits together or not at all
//! - **Checked reads**: traversal verifies each chain it walks and reports
//!   corruption instead of returning a truncated tree
//!
//! # Modules
//!
//! - [`models`] - Route rows, trees, seed descriptions and payload patches
//! - [`db`] - Database layer with libsql integration and route events
//! - [`services`] - Traversal, mutations and bulk loading
//! - [`operations`] - Per-role locks and busy retries
//! - [`config`] - Store settings

pub mod config;
pub mod db;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use config::{ConfigError, RouteStoreConfig};
pub use db::{DatabaseError, DatabaseService, RouteEvent};
pub use models::*;
pub use services::*;
