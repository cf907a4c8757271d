//! Materialized route trees
//!
//! The read-side shape handed to the serving layer: a role's roots in sibling
//! order, each with its ordered children.

use crate::models::route_node::RouteNode;
use crate::models::route_spec::RouteSpec;
use serde::Serialize;
use serde_json::Value;

/// One node of a materialized tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTreeNode {
    pub id: i64,
    pub name: String,
    pub payload: Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteTreeNode>,
}

impl RouteTreeNode {
    pub fn from_node(node: RouteNode, children: Vec<RouteTreeNode>) -> Self {
        Self {
            id: node.id,
            name: node.name,
            payload: node.payload,
            children,
        }
    }

    /// Route object in the UI's format (payload plus a `children` array)
    pub fn to_ui_route(&self) -> Value {
        let mut route = self.payload.clone();
        if !self.children.is_empty() {
            if let Some(map) = route.as_object_mut() {
                map.insert(
                    "children".to_string(),
                    Value::Array(self.children.iter().map(RouteTreeNode::to_ui_route).collect()),
                );
            }
        }
        route
    }

    /// Seed description reproducing this subtree (ids dropped)
    pub fn to_spec(&self) -> RouteSpec {
        RouteSpec::new(self.name.clone(), self.payload.clone())
            .with_children(self.children.iter().map(RouteTreeNode::to_spec).collect())
    }
}

/// A role's complete forest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteTree {
    pub role: String,
    pub routes: Vec<RouteTreeNode>,
}

impl RouteTree {
    pub fn to_ui_routes(&self) -> Vec<Value> {
        self.routes.iter().map(RouteTreeNode::to_ui_route).collect()
    }

    pub fn to_specs(&self) -> Vec<RouteSpec> {
        self.routes.iter().map(RouteTreeNode::to_spec).collect()
    }

    /// Names of the root routes in order
    pub fn root_names(&self) -> Vec<&str> {
        self.routes.iter().map(|route| route.name.as_str()).collect()
    }

    /// Shape of the tree as nested names, used to compare structure
    pub fn outline(&self) -> Vec<(String, Vec<String>)> {
        fn flatten(node: &RouteTreeNode, prefix: &str, out: &mut Vec<String>) {
            for child in &node.children {
                let path = format!("{}/{}", prefix, child.name);
                out.push(path.clone());
                flatten(child, &path, out);
            }
        }

        self.routes
            .iter()
            .map(|root| {
                let mut descendants = Vec::new();
                flatten(root, &root.name, &mut descendants);
                (root.name.clone(), descendants)
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
