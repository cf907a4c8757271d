//! Route store configuration
//!
//! Settings are loaded from a JSON file (every field optional) and then
//! overridden from the environment:
//!
//! * `UIROUTE_DB_PATH` - database file location
//! * `UIROUTE_SEED_DIR` - directory of `*.json` route descriptions
//! * `UIROUTE_MAX_DEPTH` - recursion cap for tree materialization
//!
//! The default database lives at `~/.uiroute/database/uiroute.db`.

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use crate::services::traversal::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DB_PATH_ENV: &str = "UIROUTE_DB_PATH";
pub const SEED_DIR_ENV: &str = "UIROUTE_SEED_DIR";
pub const MAX_DEPTH_ENV: &str = "UIROUTE_MAX_DEPTH";

/// Largest accepted `mutation_retries`
pub const MAX_MUTATION_RETRIES: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to determine home directory")]
    NoHomeDirectory,
}

/// Settings of one route store
///
/// All fields use `#[serde(default)]` so partial config files deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouteStoreConfig {
    pub db_path: PathBuf,

    /// Where `route-tool seed` and `reset` look for route descriptions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_dir: Option<PathBuf>,

    pub max_depth: usize,

    pub busy_timeout_ms: u64,

    /// Retries after a busy failure (0 = single attempt)
    pub mutation_retries: usize,

    /// Role whose root routes are appended to every other role's navigation
    pub fallback_role: String,

    /// Plugin catalog key -> route name toggled by its enabled state
    pub plugin_routes: BTreeMap<String, String>,
}

impl Default for RouteStoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_database_path().unwrap_or_else(|_| PathBuf::from("uiroute.db")),
            seed_dir: None,
            max_depth: DEFAULT_MAX_DEPTH,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            mutation_retries: 3,
            fallback_role: String::new(),
            plugin_routes: default_plugin_routes(),
        }
    }
}

/// Default plugin catalog
pub fn default_plugin_routes() -> BTreeMap<String, String> {
    [
        ("checkmarx", "Checkmarx"),
        ("cmas", "Cmas"),
        ("postman", "Postmans"),
        ("webinspect", "Webinspects"),
        ("zap", "Zap"),
        ("sbom", "Sbom"),
        ("sonarqube", "Sonarqube"),
        ("sideex", "Sideex"),
        ("excalidraw", "Whiteboard"),
    ]
    .into_iter()
    .map(|(plugin, route)| (plugin.to_string(), route.to_string()))
    .collect()
}

/// `~/.uiroute/database/uiroute.db`
pub fn default_database_path() -> Result<PathBuf, ConfigError> {
    let home_dir = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;

    Ok(home_dir
        .join(".uiroute")
        .join("database")
        .join("uiroute.db"))
}

impl RouteStoreConfig {
    /// Config for a database at `db_path`, everything else default
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON file, returning defaults when the file doesn't exist
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: Self = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `UIROUTE_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DB_PATH_ENV) {
            tracing::info!("Using database path from {}: {}", DB_PATH_ENV, path);
            self.db_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(SEED_DIR_ENV) {
            self.seed_dir = Some(PathBuf::from(dir));
        }
        if let Some(depth) = lookup(MAX_DEPTH_ENV) {
            self.max_depth = depth.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{} must be a positive integer, got '{}'",
                    MAX_DEPTH_ENV, depth
                ))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path must not be empty".to_string()));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".to_string()));
        }
        if self.mutation_retries > MAX_MUTATION_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "mutation_retries must be at most {}, got {}",
                MAX_MUTATION_RETRIES, self.mutation_retries
            )));
        }
        if let Some((plugin, _)) = self.plugin_routes.iter().find(|(_, route)| route.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "plugin '{}' maps to an empty route name",
                plugin
            )));
        }
        Ok(())
    }

    /// Route name toggled by `plugin`, if it is in the catalog
    pub fn plugin_route(&self, plugin: &str) -> Option<&str> {
        self.plugin_routes.get(plugin).map(String::as_str)
    }
}
