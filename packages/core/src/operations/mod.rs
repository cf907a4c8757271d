//! Mutation Concurrency Support
//!
//! Supporting types used by `RouteService` to keep sibling chains consistent
//! under concurrent writers:
//!
//! - [`RoleLockTable`] serializes mutations per role inside one process
//! - [`MutationRetry`] replays a rolled-back mutation when SQLite reports busy

pub mod mutation_retry;
pub mod role_locks;

pub use mutation_retry::MutationRetry;
pub use role_locks::RoleLockTable;
