//! Declarative route descriptions used for seeding
//!
//! Seed files use the UI's own route format: an array of route objects, each
//! with a `name`, arbitrary metadata and an optional ordered `children` array.

use crate::models::payload::ValidationError;
use serde::Deserialize;
use serde_json::Value;

/// One route description plus its ordered children
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct RouteSpec {
    pub name: String,
    /// Route metadata without the `children` key
    pub payload: Value,
    pub children: Vec<RouteSpec>,
}

impl RouteSpec {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<RouteSpec>) -> Self {
        self.children = children;
        self
    }

    /// Role declared by `meta.roles[0]`, if any
    pub fn declared_role(&self) -> Option<&str> {
        self.payload
            .get("meta")
            .and_then(|meta| meta.get("roles"))
            .and_then(Value::as_array)
            .and_then(|roles| roles.first())
            .and_then(Value::as_str)
    }

    /// Total number of descriptions in this subtree, self included
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(RouteSpec::subtree_size).sum::<usize>()
    }
}

impl TryFrom<Value> for RouteSpec {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut map) = value else {
            return Err(ValidationError::InvalidRouteSpec(
                "route description must be an object".to_string(),
            ));
        };

        let name = map
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ValidationError::InvalidRouteSpec("route description needs a non-empty name".to_string())
            })?;

        let children = match map.remove("children") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(RouteSpec::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ValidationError::InvalidRouteSpec(format!(
                    "children of '{}' must be an array",
                    name
                )))
            }
        };

        Ok(Self {
            name,
            payload: Value::Object(map),
            children,
        })
    }
}
