//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - Write/read transaction control
//! - Typed row access to the `ui_routes` table (`RouteStore`)
//! - Domain events announced after commits
//!
//! # Architecture
//!
//! The forest is a single table. Parent links and sibling order are plain
//! integer columns (`parent`, `prev_sibling`) resolved by id lookups; there
//! is no in-memory object graph.

mod database;
mod error;
pub mod events;
mod route_store;

pub use database::{DatabaseService, DEFAULT_BUSY_TIMEOUT_MS};
pub use error::DatabaseError;
pub use events::RouteEvent;
pub use route_store::RouteStore;
