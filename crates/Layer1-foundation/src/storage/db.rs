//! SQLite Storage for the plugin catalog
//!
//! 플러그인 카탈로그 저장:
//! - Plugins: 설치된 플러그인 (soft delete)
//! - Plugin Event Handlers: 이벤트 바인딩과 우선순위
//!
//! 설정 데이터는 JSON (storage/json/)에서 관리
//!
//! ## Migration System
//!
//! Database schema is versioned. Migrations run automatically on startup.
//! - Version 1: Initial schema (plugins, plugin_event_handlers)
//! - Version 2: Partial unique index on active plugin codes, handler scope index

use crate::config::PluginSystemConfig;
use crate::{Error, Result};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Storage service for persisting the plugin catalog
#[derive(Clone)]
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

impl Storage {
    /// Create a new storage instance under `data_dir`
    pub fn new(data_dir: &Path, file_name: &str) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| Error::Persistence(format!("Failed to create data directory: {}", e)))?;

        let db_path = data_dir.join(file_name);
        let conn = Connection::open(&db_path)
            .map_err(|e| Error::Persistence(format!("Failed to open database: {}", e)))?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )
        .map_err(|e| Error::Persistence(format!("Failed to set pragmas: {}", e)))?;

        Self::from_connection(conn)
    }

    /// Open the database described by the plugin system config
    pub fn from_config(config: &PluginSystemConfig) -> Result<Self> {
        Self::new(&config.data_dir(), config.database_file())
    }

    /// Create an in-memory storage (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            Error::Persistence(format!("Failed to create in-memory database: {}", e))
        })?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Persistence(format!("Failed to set pragmas: {}", e)))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        storage.initialize_schema()?;
        storage.run_migrations()?;

        Ok(storage)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Internal("Lock poisoned".to_string()))
    }

    /// Get current schema version from database
    pub fn get_schema_version(&self) -> Result<i32> {
        let conn = self.lock()?;

        conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| Error::Persistence(format!("Failed to get schema version: {}", e)))
    }

    /// Initialize database schema (base tables)
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Installed plugins (never physically removed)
            CREATE TABLE IF NOT EXISTS plugins (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL,
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                class_name TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                source INTEGER NOT NULL DEFAULT 0,
                deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_plugins_code
                ON plugins(code);

            -- Event bindings owned by a plugin
            CREATE TABLE IF NOT EXISTS plugin_event_handlers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plugin_id INTEGER NOT NULL,
                event TEXT NOT NULL,
                handler TEXT NOT NULL,
                handler_type TEXT NOT NULL,
                priority INTEGER NOT NULL DEFAULT 0,
                deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (plugin_id) REFERENCES plugins(id)
            );

            CREATE INDEX IF NOT EXISTS idx_plugin_event_handlers_plugin
                ON plugin_event_handlers(plugin_id, event);

            -- Insert initial schema version if not exists
            INSERT OR IGNORE INTO schema_version (version) VALUES (1);
            "#,
        )
        .map_err(|e| Error::Persistence(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    /// Run all pending migrations
    fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version()?;

        if current_version >= CURRENT_SCHEMA_VERSION {
            debug!(
                "Database schema is up to date (version {})",
                current_version
            );
            return Ok(());
        }

        info!(
            "Running database migrations from version {} to {}",
            current_version, CURRENT_SCHEMA_VERSION
        );

        let conn = self.lock()?;

        // Run migrations sequentially
        for version in (current_version + 1)..=CURRENT_SCHEMA_VERSION {
            match version {
                2 => Self::migrate_v2(&conn)?,
                _ => {
                    warn!("Unknown migration version: {}", version);
                }
            }

            // Record migration
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![version],
            )
            .map_err(|e| Error::Persistence(format!("Failed to record migration: {}", e)))?;

            info!("Applied migration to version {}", version);
        }

        Ok(())
    }

    /// Migration to version 2: active code uniqueness and priority scope lookups
    fn migrate_v2(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_plugins_active_code
                ON plugins(code) WHERE deleted = 0;

            CREATE INDEX IF NOT EXISTS idx_plugin_event_handlers_scope
                ON plugin_event_handlers(event, handler_type, deleted, priority);
            "#,
        )
        .map_err(|e| Error::Persistence(format!("Failed to apply migration v2: {}", e)))
    }

    // ========================================================================
    // Connection access
    // ========================================================================

    /// Run a read-only closure against the connection
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside a single SQLite transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
    /// The original error is returned unchanged after a successful rollback.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Persistence(format!("Failed to begin transaction: {}", e)))?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()
                    .map_err(|e| Error::Persistence(format!("Failed to commit: {}", e)))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rb) = tx.rollback() {
                    return Err(Error::Persistence(format!(
                        "rollback failed: {} (original error: {})",
                        rb, e
                    )));
                }
                debug!("Transaction rolled back: {}", e);
                Err(e)
            }
        }
    }
}
