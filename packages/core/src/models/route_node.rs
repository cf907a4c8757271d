//! Route Node Data Structures
//!
//! A `RouteNode` is one row of the `ui_routes` table: a named UI route that
//! belongs to exactly one role's forest.
//!
//! # Ordering Model
//!
//! Sibling order is stored as a single back-pointer per row:
//!
//! - `parent = 0` marks a root-level node
//! - `prev_sibling = 0` marks the first child of its `(role, parent)` group
//! - otherwise `prev_sibling` is the id of the sibling immediately before
//!
//! Nothing else encodes position, so reading the order always goes through
//! [`crate::services::Traversal`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel parent id for root-level nodes
pub const ROOT_PARENT: i64 = 0;

/// Sentinel back-pointer for the first node of a sibling chain
pub const NO_PREV_SIBLING: i64 = 0;

/// One persisted UI route node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteNode {
    /// Synthetic id, stable for the node's lifetime (never 0)
    pub id: i64,

    /// Lookup handle, unique within `role`
    pub name: String,

    /// Partition key; forests of different roles never interact
    pub role: String,

    /// Containing node id, or [`ROOT_PARENT`]
    pub parent: i64,

    /// Preceding sibling id, or [`NO_PREV_SIBLING`]
    pub prev_sibling: i64,

    /// Route metadata (path, component, meta, hidden, ...)
    pub payload: Value,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl RouteNode {
    pub fn is_root(&self) -> bool {
        self.parent == ROOT_PARENT
    }

    pub fn is_first(&self) -> bool {
        self.prev_sibling == NO_PREV_SIBLING
    }

    /// Whether the payload marks this route as hidden
    pub fn is_hidden(&self) -> bool {
        self.payload
            .get("hidden")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Row values for an insert (id and timestamps are assigned by the database)
#[derive(Debug, Clone)]
pub struct NewRouteNode<'a> {
    pub name: &'a str,
    pub role: &'a str,
    pub parent: i64,
    pub prev_sibling: i64,
    pub payload: &'a Value,
}

/// Normalize a payload before it is stored
///
/// Stored payloads are always objects carrying the node's name and never
/// carrying a `children` array (children are rebuilt on materialization).
pub fn normalize_payload(name: &str, payload: Value) -> Option<Value> {
    let mut map = match payload {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        _ => return None,
    };
    map.remove("children");
    map.insert("name".to_string(), Value::String(name.to_string()));
    Some(Value::Object(map))
}
