//! Route payload patches
//!
//! Administrative callers may only change a fixed set of payload fields.
//! A patch is parsed from raw JSON up front so that a malformed request is
//! rejected before any row is touched.

use serde_json::{Map, Value};
use thiserror::Error;

/// Validation errors for route payloads and patches
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Payload must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("Unrecognized payload field: {0}")]
    UnknownField(String),

    #[error("Field '{field}' must be a {expected}")]
    InvalidFieldType {
        field: String,
        expected: &'static str,
    },

    #[error("Field '{0}' cannot be patched")]
    ReadOnlyField(String),

    #[error("Invalid route description: {0}")]
    InvalidRouteSpec(String),
}

/// Partial update of a route payload
///
/// `None` means "leave untouched". Stored fields outside this set are never
/// modified by a patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadPatch {
    pub hidden: Option<bool>,
    pub path: Option<String>,
    pub component: Option<String>,
    pub redirect: Option<String>,
    pub title: Option<String>,
    pub icon: Option<String>,
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expect_string(field: &str, value: &Value) -> Result<String, ValidationError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::InvalidFieldType {
            field: field.to_string(),
            expected: "string",
        })
}

impl PayloadPatch {
    /// Parse a patch from a JSON object
    ///
    /// Accepted keys: `hidden` (bool), `path`, `component`, `redirect`
    /// (strings) and `meta` (object with optional string `title`/`icon`).
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let fields = value
            .as_object()
            .ok_or_else(|| ValidationError::NotAnObject(json_type_name(value).to_string()))?;

        let mut patch = PayloadPatch::default();
        for (key, field) in fields {
            match key.as_str() {
                "hidden" => {
                    patch.hidden =
                        Some(field.as_bool().ok_or_else(|| ValidationError::InvalidFieldType {
                            field: "hidden".to_string(),
                            expected: "boolean",
                        })?);
                }
                "path" => patch.path = Some(expect_string("path", field)?),
                "component" => patch.component = Some(expect_string("component", field)?),
                "redirect" => patch.redirect = Some(expect_string("redirect", field)?),
                "meta" => patch.parse_meta(field)?,
                "name" | "children" => return Err(ValidationError::ReadOnlyField(key.clone())),
                other => return Err(ValidationError::UnknownField(other.to_string())),
            }
        }

        Ok(patch)
    }

    fn parse_meta(&mut self, meta: &Value) -> Result<(), ValidationError> {
        let fields = meta
            .as_object()
            .ok_or_else(|| ValidationError::InvalidFieldType {
                field: "meta".to_string(),
                expected: "object",
            })?;

        for (key, field) in fields {
            match key.as_str() {
                "title" => self.title = Some(expect_string("meta.title", field)?),
                "icon" => self.icon = Some(expect_string("meta.icon", field)?),
                "roles" => return Err(ValidationError::ReadOnlyField("meta.roles".to_string())),
                other => return Err(ValidationError::UnknownField(format!("meta.{}", other))),
            }
        }

        Ok(())
    }

    /// Visibility-only patch
    pub fn hidden(hidden: bool) -> Self {
        Self {
            hidden: Some(hidden),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == PayloadPatch::default()
    }

    /// Merge the patch into a stored payload
    pub fn apply(&self, payload: &mut Value) {
        if !payload.is_object() {
            *payload = Value::Object(Map::new());
        }
        let Some(map) = payload.as_object_mut() else {
            return;
        };

        if let Some(hidden) = self.hidden {
            map.insert("hidden".to_string(), Value::Bool(hidden));
        }
        for (key, value) in [
            ("path", &self.path),
            ("component", &self.component),
            ("redirect", &self.redirect),
        ] {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::String(value.clone()));
            }
        }

        if self.title.is_none() && self.icon.is_none() {
            return;
        }
        let meta = map
            .entry("meta")
            .or_insert_with(|| Value::Object(Map::new()));
        if !meta.is_object() {
            *meta = Value::Object(Map::new());
        }
        if let Some(meta) = meta.as_object_mut() {
            if let Some(title) = &self.title {
                meta.insert("title".to_string(), Value::String(title.clone()));
            }
            if let Some(icon) = &self.icon {
                meta.insert("icon".to_string(), Value::String(icon.clone()));
            }
        }
    }
}
