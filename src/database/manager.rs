use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database path: {0}")]
    InvalidPath(String),

    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const CREATE_TODOS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS todos (
        id          INTEGER  PRIMARY KEY AUTOINCREMENT,
        subject     TEXT     NOT NULL CHECK(subject <> ''),
        description TEXT     NOT NULL DEFAULT '',
        created_at  DATETIME NOT NULL DEFAULT (DATETIME('now')),
        updated_at  DATETIME NOT NULL DEFAULT (DATETIME('now'))
    )
"#;

const CREATE_UPDATED_AT_TRIGGER: &str = r#"
    CREATE TRIGGER IF NOT EXISTS trigger_todos_updated_at AFTER UPDATE ON todos
    BEGIN
        UPDATE todos SET updated_at = DATETIME('now') WHERE id == NEW.id;
    END
"#;

/// Path value that selects a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Owns pool creation and schema bootstrap for the TODO store
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open the pool described by `config` and make sure the schema exists
    pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
        let pool = if config.path.as_path() == Path::new(MEMORY_PATH) {
            Self::memory_pool().await?
        } else {
            Self::file_pool(&config.path, config.max_connections).await?
        };

        Self::init_schema(&pool).await?;
        Ok(pool)
    }

    /// Single-connection in-memory pool. Every connection to `:memory:` is a
    /// separate database, so the pool must never replace its one connection.
    pub async fn memory_pool() -> Result<SqlitePool, DatabaseError> {
        let options: SqliteConnectOptions = "sqlite::memory:".parse()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        info!("Created in-memory database pool");
        Ok(pool)
    }

    async fn file_pool(path: &Path, max_connections: u32) -> Result<SqlitePool, DatabaseError> {
        if path.as_os_str().is_empty() {
            return Err(DatabaseError::InvalidPath(path.display().to_string()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        info!("Created database pool for: {}", path.display());
        Ok(pool)
    }

    /// Create the todos table and its updated_at trigger if they are missing
    pub async fn init_schema(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::query(CREATE_TODOS_TABLE).execute(pool).await?;
        sqlx::query(CREATE_UPDATED_AT_TRIGGER).execute(pool).await?;
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &SqlitePool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Close the pool on shutdown
    pub async fn close(pool: &SqlitePool) {
        pool.close().await;
        info!("Closed database pool");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let pool = DatabaseManager::memory_pool().await.unwrap();
        DatabaseManager::init_schema(&pool).await.unwrap();
        DatabaseManager::init_schema(&pool).await.unwrap();

        let row = sqlx::query("SELECT COUNT(*) AS n FROM sqlite_master WHERE name IN ('todos', 'trigger_todos_updated_at')")
            .fetch_one(&pool)
            .await
            .unwrap();
        let n: i64 = row.get("n");
        assert_eq!(n, 2);
    }

    #[tokio::test]
    async fn empty_subject_is_rejected_by_schema() {
        let pool = DatabaseManager::memory_pool().await.unwrap();
        DatabaseManager::init_schema(&pool).await.unwrap();

        let result = sqlx::query("INSERT INTO todos(subject, description) VALUES('', 'x')")
            .execute(&pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn health_check_pings_pool() {
        let pool = DatabaseManager::memory_pool().await.unwrap();
        assert!(DatabaseManager::health_check(&pool).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_empty_path() {
        let config = DatabaseConfig {
            path: "".into(),
            max_connections: 1,
            statement_timeout_ms: 1_000,
            max_page_size: 10,
        };
        let err = DatabaseManager::connect(&config).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidPath(_)));
    }
}
