//! Database Connection Management
//!
//! This module provides the database connection, schema initialization and
//! transaction control for the route forest, using libsql (embedded SQLite).
//!
//! # Architecture
//!
//! - **Single table**: every role's forest lives in `ui_routes`
//! - **WAL mode**: readers keep a consistent snapshot while a writer commits
//! - **Immediate write transactions**: `BEGIN IMMEDIATE` takes the write lock
//!   up front, so two structural edits can never interleave their pointer
//!   reads and writes, even across processes sharing the file
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions** to avoid SQLite
//! thread-safety violations when the Tokio runtime moves futures between threads.
//!
//! A mutation is one connection running:
//!
//! ```no_run
//! # use uiroute_core::db::{DatabaseService, DatabaseError};
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), DatabaseError> {
//! # let db = DatabaseService::new(PathBuf::from("./routes.db")).await?;
//! let conn = db.connect_with_timeout().await?;
//! db.begin_immediate(&conn).await?;
//! let result: Result<u64, DatabaseError> = async {
//!     // ... reads and pointer writes on `conn` ...
//!     Ok(0)
//! }
//! .await;
//! db.finish(&conn, result).await?;
//! # Ok(())
//! # }
//! ```

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Default SQLite busy timeout
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Database service for managing the libsql connection and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database connection (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,

    busy_timeout_ms: u64,
}

impl DatabaseService {
    /// Create a new DatabaseService with the default busy timeout
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::new_with_timeout(db_path, DEFAULT_BUSY_TIMEOUT_MS).await
    }

    /// Create a new DatabaseService
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Initialize the schema (CREATE TABLE IF NOT EXISTS)
    /// 4. Enable WAL mode and the busy timeout
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new_with_timeout(
        db_path: PathBuf,
        busy_timeout_ms: u64,
    ) -> Result<Self, DatabaseError> {
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
            busy_timeout_ms,
        };

        service.initialize_schema(is_new_database).await?;

        tracing::debug!(path = %service.db_path.display(), "Route database ready");
        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// Idempotent: safe to run against an existing database.
    ///
    /// # Schema
    ///
    /// - `ui_routes`: one row per route node, `UNIQUE(role, name)`
    /// - `idx_ui_routes_position`: `(role, parent, prev_sibling)` for sibling lookups
    /// - `idx_ui_routes_name`: cross-role lookups by name (visibility toggles)
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS ui_routes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                -- 0 = root level
                parent INTEGER NOT NULL DEFAULT 0,
                -- 0 = first child of (role, parent)
                prev_sibling INTEGER NOT NULL DEFAULT 0,
                payload JSON NOT NULL DEFAULT '{}',
                created_at DATETIME DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at DATETIME DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE (role, name)
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create ui_routes table: {}", e))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_ui_routes_position
             ON ui_routes(role, parent, prev_sibling)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_ui_routes_position': {}",
                e
            ))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_ui_routes_name ON ui_routes(name)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_ui_routes_name': {}",
                e
            ))
        })?;

        // Flush the schema for fresh files so a second connection opened right
        // away sees the table.
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// **⚠️ WARNING**: Only use this in synchronous, single-threaded contexts.
    /// In async functions use `connect_with_timeout()` instead.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout configured
    ///
    /// **✅ RECOMMENDED**: Use this for all async functions.
    ///
    /// With the busy timeout set, a connection that finds the write lock taken
    /// waits for it instead of failing immediately with `SQLITE_BUSY`.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, &format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms))
            .await?;

        Ok(conn)
    }

    /// Start a write transaction holding the database write lock
    pub async fn begin_immediate(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin write transaction: {}", e))
        })?;
        Ok(())
    }

    /// Start a read transaction
    ///
    /// In WAL mode every statement of the transaction sees the same snapshot,
    /// taken at its first read.
    pub async fn begin_read(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        conn.execute("BEGIN DEFERRED", ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to begin read transaction: {}", e))
        })?;
        Ok(())
    }

    /// Commit on success, roll back on failure
    ///
    /// Returns the operation's own result; a failed COMMIT is rolled back and
    /// reported instead.
    pub async fn finish<T, E>(
        &self,
        conn: &libsql::Connection,
        result: Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        match result {
            Ok(value) => {
                if let Err(e) = conn.execute("COMMIT", ()).await {
                    let _rollback = conn.execute("ROLLBACK", ()).await;
                    return Err(DatabaseError::sql_execution(format!(
                        "Failed to commit transaction: {}",
                        e
                    ))
                    .into());
                }
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = conn.execute("ROLLBACK", ()).await {
                    tracing::warn!("Failed to roll back transaction: {}", e);
                }
                Err(err)
            }
        }
    }

    /// Flush the WAL into the main database file
    pub async fn checkpoint(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
            .await
    }
}
