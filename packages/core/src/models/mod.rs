//! Data Models
//!
//! This module contains the data structures of the route forest:
//!
//! - `RouteNode` - one persisted route row (id, role, parent, prev_sibling, payload)
//! - `RouteTree` - a role's materialized forest
//! - `RouteSpec` - declarative route descriptions used for seeding
//! - `PayloadPatch` - validated partial payload updates

mod payload;
mod route_node;
mod route_spec;
mod route_tree;

pub use payload::{PayloadPatch, ValidationError};
pub use route_node::{normalize_payload, NewRouteNode, RouteNode, NO_PREV_SIBLING, ROOT_PARENT};
pub use route_spec::RouteSpec;
pub use route_tree::{RouteTree, RouteTreeNode};
