//! RouteStore - typed row access for `ui_routes`
//!
//! `RouteStore` borrows one connection so that every primitive of an
//! operation runs inside the same transaction. It holds no business rules:
//! ordering, validation and relinking belong to the traversal and mutation
//! layers.
//!
//! # Row Format
//!
//! Columns are always selected in this order:
//! id, name, role, parent, prev_sibling, payload, created_at, updated_at

use crate::db::error::DatabaseError;
use crate::models::{NewRouteNode, RouteNode};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use libsql::{Connection, Row};
use serde_json::Value;

const SELECT_COLUMNS: &str =
    "SELECT id, name, role, parent, prev_sibling, payload, created_at, updated_at FROM ui_routes";

/// Node Store primitives over a borrowed connection
#[derive(Clone, Copy)]
pub struct RouteStore<'c> {
    conn: &'c Connection,
}

impl<'c> RouteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Write timestamp with microsecond precision, so that two writes within
    /// the same second still produce increasing `updated_at` values
    fn now_timestamp() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Parse timestamp from database - handles both SQLite and RFC3339 formats
    ///
    /// Rows written by `RouteStore` carry RFC3339 with microseconds; SQLite's
    /// own `CURRENT_TIMESTAMP` format ("YYYY-MM-DD HH:MM:SS") is still accepted.
    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        Err(DatabaseError::invalid_row(format!(
            "Unable to parse timestamp '{}' as SQLite or RFC3339 format",
            s
        )))
    }

    /// Convert libsql::Row to RouteNode
    fn row_to_node(row: &Row) -> Result<RouteNode, DatabaseError> {
        let id: i64 = row.get(0)?;
        let name: String = row.get(1)?;
        let role: String = row.get(2)?;
        let parent: i64 = row.get(3)?;
        let prev_sibling: i64 = row.get(4)?;
        let payload_json: String = row.get(5)?;
        let created_at_str: String = row.get(6)?;
        let updated_at_str: String = row.get(7)?;

        let payload: Value = serde_json::from_str(&payload_json).map_err(|e| {
            DatabaseError::invalid_row(format!("Failed to parse payload of route {}: {}", id, e))
        })?;

        Ok(RouteNode {
            id,
            name,
            role,
            parent,
            prev_sibling,
            payload,
            created_at: Self::parse_timestamp(&created_at_str)?,
            updated_at: Self::parse_timestamp(&updated_at_str)?,
        })
    }

    async fn query_nodes(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<RouteNode>, DatabaseError> {
        let mut rows = self.conn.query(sql, params).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to query ui_routes: {}", e))
        })?;

        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn query_one(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<RouteNode>, DatabaseError> {
        Ok(self.query_nodes(sql, params).await?.into_iter().next())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<RouteNode>, DatabaseError> {
        self.query_one(&format!("{} WHERE id = ?", SELECT_COLUMNS), [id])
            .await
    }

    pub async fn find_by_name(
        &self,
        role: &str,
        name: &str,
    ) -> Result<Option<RouteNode>, DatabaseError> {
        self.query_one(
            &format!("{} WHERE role = ? AND name = ?", SELECT_COLUMNS),
            (role, name),
        )
        .await
    }

    /// Every node with this name, across all roles
    pub async fn find_all_by_name(&self, name: &str) -> Result<Vec<RouteNode>, DatabaseError> {
        self.query_nodes(
            &format!("{} WHERE name = ? ORDER BY role, id", SELECT_COLUMNS),
            [name],
        )
        .await
    }

    /// Nodes occupying the slot `(role, parent, prev_sibling)`
    ///
    /// A healthy chain returns at most one node; more than one means two
    /// siblings claim the same predecessor. `excluding` skips a node that is
    /// being relocated and may still carry its old pointer.
    pub async fn find_by_position(
        &self,
        role: &str,
        parent: i64,
        prev_sibling: i64,
        excluding: Option<i64>,
    ) -> Result<Vec<RouteNode>, DatabaseError> {
        self.query_nodes(
            &format!(
                "{} WHERE role = ? AND parent = ? AND prev_sibling = ? AND id != ? ORDER BY id",
                SELECT_COLUMNS
            ),
            (role, parent, prev_sibling, excluding.unwrap_or(0)),
        )
        .await
    }

    /// Children of `parent` in storage order (not sibling order)
    pub async fn children_of(
        &self,
        role: &str,
        parent: i64,
    ) -> Result<Vec<RouteNode>, DatabaseError> {
        self.query_nodes(
            &format!("{} WHERE role = ? AND parent = ? ORDER BY id", SELECT_COLUMNS),
            (role, parent),
        )
        .await
    }

    async fn query_count(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to count routes: {}", e)))?;

        let count: i64 = match rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    pub async fn count_children(&self, role: &str, parent: i64) -> Result<u64, DatabaseError> {
        self.query_count(
            "SELECT COUNT(*) FROM ui_routes WHERE role = ? AND parent = ?",
            (role, parent),
        )
        .await
    }

    /// Number of rows in a role's forest
    pub async fn count_in_role(&self, role: &str) -> Result<u64, DatabaseError> {
        self.query_count("SELECT COUNT(*) FROM ui_routes WHERE role = ?", [role])
            .await
    }

    /// Distinct roles present in the table
    pub async fn roles(&self) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT DISTINCT role FROM ui_routes ORDER BY role", ())
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to list roles: {}", e)))?;

        let mut roles = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::sql_execution(e.to_string()))?
        {
            roles.push(row.get::<String>(0)?);
        }
        Ok(roles)
    }

    /// Insert a row and return its generated id
    pub async fn insert(&self, node: NewRouteNode<'_>) -> Result<i64, DatabaseError> {
        let now = Self::now_timestamp();
        self.conn
            .execute(
                "INSERT INTO ui_routes (name, role, parent, prev_sibling, payload, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                (
                    node.name,
                    node.role,
                    node.parent,
                    node.prev_sibling,
                    node.payload.to_string(),
                    now.clone(),
                    now,
                ),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to insert route: {}", e)))?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Move a row to `(parent, prev_sibling)`
    pub async fn set_position(
        &self,
        id: i64,
        parent: i64,
        prev_sibling: i64,
    ) -> Result<u64, DatabaseError> {
        self.conn
            .execute(
                "UPDATE ui_routes SET parent = ?, prev_sibling = ?, updated_at = ? WHERE id = ?",
                (parent, prev_sibling, Self::now_timestamp(), id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to reposition route: {}", e)))
    }

    pub async fn set_prev_sibling(&self, id: i64, prev_sibling: i64) -> Result<u64, DatabaseError> {
        self.conn
            .execute(
                "UPDATE ui_routes SET prev_sibling = ?, updated_at = ? WHERE id = ?",
                (prev_sibling, Self::now_timestamp(), id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to relink route: {}", e)))
    }

    pub async fn update_payload(&self, id: i64, payload: &Value) -> Result<u64, DatabaseError> {
        self.conn
            .execute(
                "UPDATE ui_routes SET payload = ?, updated_at = ? WHERE id = ?",
                (payload.to_string(), Self::now_timestamp(), id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to update payload: {}", e)))
    }

    pub async fn update_name(
        &self,
        id: i64,
        name: &str,
        payload: &Value,
    ) -> Result<u64, DatabaseError> {
        self.conn
            .execute(
                "UPDATE ui_routes SET name = ?, payload = ?, updated_at = ? WHERE id = ?",
                (name, payload.to_string(), Self::now_timestamp(), id),
            )
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to rename route: {}", e)))
    }

    pub async fn delete(&self, id: i64) -> Result<u64, DatabaseError> {
        self.conn
            .execute("DELETE FROM ui_routes WHERE id = ?", [id])
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to delete route: {}", e)))
    }

    /// Remove every row of every role
    pub async fn delete_all(&self) -> Result<u64, DatabaseError> {
        self.conn
            .execute("DELETE FROM ui_routes", ())
            .await
            .map_err(|e| DatabaseError::sql_execution(format!("Failed to clear ui_routes: {}", e)))
    }
}
