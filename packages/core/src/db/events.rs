//! Domain Events for the route forest
//!
//! `RouteService` announces every committed change on a tokio broadcast
//! channel so that the serving layer can drop cached navigation trees without
//! polling the table.
//!
//! # Event Flow
//!
//! 1. A mutation commits its transaction
//! 2. The matching `RouteEvent` is sent on the broadcast channel
//! 3. Every subscriber receives it asynchronously
//!
//! Rolled-back operations emit nothing.

use crate::models::RouteNode;
use serde::{Deserialize, Serialize};

/// Domain events emitted after a successful commit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RouteEvent {
    /// A node was inserted by an administrative call
    #[serde(rename = "route:created")]
    NodeCreated { node: RouteNode },

    /// A node changed position (possibly under a new parent)
    #[serde(rename = "route:moved")]
    NodeMoved { node: RouteNode },

    /// A node's name or payload changed
    #[serde(rename = "route:updated")]
    NodeUpdated { node: RouteNode },

    /// A node and its descendants were removed
    #[serde(rename = "route:deleted")]
    NodesDeleted { role: String, ids: Vec<i64> },

    /// A role's forest was seeded
    #[serde(rename = "route:seeded")]
    Seeded { role: String, inserted: usize },

    /// The whole table was wiped and reseeded
    #[serde(rename = "route:reset")]
    Reset,
}

impl RouteEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            RouteEvent::NodeCreated { .. } => "route:created",
            RouteEvent::NodeMoved { .. } => "route:moved",
            RouteEvent::NodeUpdated { .. } => "route:updated",
            RouteEvent::NodesDeleted { .. } => "route:deleted",
            RouteEvent::Seeded { .. } => "route:seeded",
            RouteEvent::Reset => "route:reset",
        }
    }

    /// Role whose forest changed, `None` when every role is affected
    pub fn role(&self) -> Option<&str> {
        match self {
            RouteEvent::NodeCreated { node }
            | RouteEvent::NodeMoved { node }
            | RouteEvent::NodeUpdated { node } => Some(&node.role),
            RouteEvent::NodesDeleted { role, .. } | RouteEvent::Seeded { role, .. } => Some(role),
            RouteEvent::Reset => None,
        }
    }
}
