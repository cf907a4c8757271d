//! Bulk Loader
//!
//! Idempotent seeding of route forests from declarative JSON files, plugin
//! driven visibility toggles, and the full wipe-and-reseed used when the
//! default route set changes between releases.
//!
//! # Seed Files
//!
//! A seed directory holds `*.json` files, read in file-name order. Each file
//! is an array of route descriptions:
//!
//! ```json
//! [
//!   { "name": "Project", "path": "/project", "meta": { "roles": ["admin"] },
//!     "children": [ { "name": "Issues", "path": "issues" } ] }
//! ]
//! ```
//!
//! A top-level description belongs to the role named by `meta.roles[0]`, or
//! to the fallback role `""` when it declares none. Children inherit their
//! root's role.

use crate::db::{RouteEvent, RouteStore};
use crate::models::RouteSpec;
use crate::services::error::RouteServiceError;
use crate::services::route_service::{RouteService, SeedReport};
use std::path::{Path, PathBuf};

/// Route descriptions of one role, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSeed {
    pub role: String,
    pub specs: Vec<RouteSpec>,
}

/// Plugin enabled state as reported by the plugin catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginState {
    pub plugin: String,
    pub disabled: bool,
}

impl PluginState {
    pub fn new(plugin: impl Into<String>, disabled: bool) -> Self {
        Self {
            plugin: plugin.into(),
            disabled,
        }
    }
}

/// Group top-level descriptions by declared role, keeping first-seen order
pub fn group_by_role(specs: Vec<RouteSpec>) -> Vec<RoleSeed> {
    let mut groups: Vec<RoleSeed> = Vec::new();
    for spec in specs {
        let role = spec.declared_role().unwrap_or_default().to_string();
        match groups.iter_mut().find(|group| group.role == role) {
            Some(group) => group.specs.push(spec),
            None => groups.push(RoleSeed {
                role,
                specs: vec![spec],
            }),
        }
    }
    groups
}

/// Read every `*.json` file of `dir` in file-name order
pub async fn read_seed_dir(dir: &Path) -> Result<Vec<RoleSeed>, RouteServiceError> {
    let mut files: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if is_json && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut specs = Vec::new();
    for path in &files {
        let contents = tokio::fs::read_to_string(path).await?;
        let file_specs: Vec<RouteSpec> = serde_json::from_str(&contents).map_err(|e| {
            RouteServiceError::serialization_error(format!("{}: {}", path.display(), e))
        })?;
        tracing::debug!(
            "Read {} route description(s) from {}",
            file_specs.len(),
            path.display()
        );
        specs.extend(file_specs);
    }

    Ok(group_by_role(specs))
}

/// Seeding and catalog-driven updates on top of a [`RouteService`]
#[derive(Clone)]
pub struct BulkLoader {
    service: RouteService,
}

impl BulkLoader {
    pub fn new(service: RouteService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &RouteService {
        &self.service
    }

    /// Seed every role described in `dir`; safe to rerun on every start
    pub async fn seed_from_dir(&self, dir: &Path) -> Result<SeedReport, RouteServiceError> {
        let mut total = SeedReport::default();
        for group in read_seed_dir(dir).await? {
            let report = self.service.seed_defaults(&group.role, &group.specs).await?;
            total.merge(report);
        }
        Ok(total)
    }

    /// Hide or show the route owned by `plugin`
    ///
    /// Unknown plugins are a no-op and return 0.
    pub async fn apply_plugin_state(
        &self,
        plugin: &str,
        disabled: bool,
    ) -> Result<usize, RouteServiceError> {
        let Some(route) = self.service.config().plugin_route(plugin) else {
            tracing::debug!("Plugin '{}' owns no route", plugin);
            return Ok(0);
        };
        let route = route.to_string();
        self.service.set_visibility(&route, disabled).await
    }

    /// Wipe every role, reseed from `dir` and replay `plugins`
    ///
    /// All of it is one transaction: a failure anywhere leaves the previous
    /// forest in place.
    pub async fn reset_all(
        &self,
        dir: &Path,
        plugins: &[PluginState],
    ) -> Result<SeedReport, RouteServiceError> {
        let groups = read_seed_dir(dir).await?;
        let groups = &groups;

        let mut roles = {
            let conn = self.service.database().connect_with_timeout().await?;
            RouteStore::new(&conn).roles().await?
        };
        roles.extend(groups.iter().map(|group| group.role.clone()));
        let _guards = self.service.locks().lock_many(&roles).await;

        let service = &self.service;
        let report = service
            .retry()
            .run("reset", move || async move {
                let conn = service.write_conn().await?;
                let result = async {
                    let editor = service.editor(&conn);
                    let removed = editor.store().delete_all().await?;
                    tracing::debug!("Removed {} route(s) before reseeding", removed);

                    let mut report = SeedReport::default();
                    for group in groups {
                        report.merge(editor.seed(&group.role, &group.specs).await?);
                    }
                    for state in plugins {
                        if let Some(route) = service.config().plugin_route(&state.plugin) {
                            editor.set_hidden(route, state.disabled).await?;
                        }
                    }
                    Ok::<_, RouteServiceError>(report)
                }
                .await;
                service.database().finish(&conn, result).await
            })
            .await?;

        tracing::info!(
            "Reset route forest: {} route(s) across {} role(s)",
            report.inserted,
            groups.len()
        );
        self.service.emit_event(RouteEvent::Reset);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: serde_json::Value) -> RouteSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_group_by_role_keeps_source_order() {
        let groups = group_by_role(vec![
            spec(json!({"name": "Project", "meta": {"roles": ["admin"]}})),
            spec(json!({"name": "Error"})),
            spec(json!({"name": "Profile", "meta": {"roles": ["admin"]}})),
            spec(json!({"name": "Home", "meta": {"roles": ["viewer"]}})),
        ]);

        let roles: Vec<&str> = groups.iter().map(|g| g.role.as_str()).collect();
        assert_eq!(roles, vec!["admin", "", "viewer"]);
        let admin: Vec<&str> = groups[0].specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(admin, vec!["Project", "Profile"]);
    }

    #[tokio::test]
    async fn test_read_seed_dir_sorts_files_and_skips_others() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("b.json"),
            r#"[{"name": "Second", "meta": {"roles": ["admin"]}}]"#,
        )
        .unwrap();
        std::fs::write(
            temp_dir.path().join("a.json"),
            r#"[{"name": "First", "meta": {"roles": ["admin"]}}]"#,
        )
        .unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "not routes").unwrap();

        let groups = read_seed_dir(temp_dir.path()).await.unwrap();
        assert_eq!(groups.len(), 1);
        let names: Vec<&str> = groups[0].specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_read_seed_dir_reports_bad_json() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("broken.json"), "[{").unwrap();

        let err = read_seed_dir(temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, RouteServiceError::Serialization(_)));
        assert!(err.to_string().contains("broken.json"));
    }
}
