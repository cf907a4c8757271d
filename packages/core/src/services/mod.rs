//! Business Services
//!
//! This module contains the route forest logic:
//!
//! - `Traversal` - Read-side navigation of sibling chains with integrity checks
//! - `RouteService` - Structural mutations, payload patches and the read API
//! - `BulkLoader` - Idempotent seeding, plugin visibility and full resets
//!
//! Services coordinate between the database layer and the serving layer,
//! enforcing the single-chain invariant on every write.

pub mod bulk_loader;
pub mod error;
pub mod route_service;
pub mod traversal;

pub use bulk_loader::{read_seed_dir, BulkLoader, PluginState, RoleSeed};
pub use error::RouteServiceError;
pub use route_service::{MoveTarget, RouteService, SeedReport};
pub use traversal::{Traversal, DEFAULT_MAX_DEPTH};
