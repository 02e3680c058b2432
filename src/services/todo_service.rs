use sqlx::SqlitePool;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::database::models::Todo;

#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    /// Update or delete matched no rows
    #[error("Todo not found")]
    NotFound,
    #[error("Invalid page size: {0}")]
    InvalidPageSize(i64),
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

const INSERT: &str = "INSERT INTO todos(subject, description) VALUES(?, ?)";
const UPDATE: &str = "UPDATE todos SET subject = ?, description = ? WHERE id = ?";
const CONFIRM: &str = "SELECT id, subject, description, created_at, updated_at FROM todos WHERE id = ?";
const READ: &str = "SELECT id, subject, description, created_at, updated_at FROM todos ORDER BY id DESC LIMIT ?";
const READ_BEFORE: &str =
    "SELECT id, subject, description, created_at, updated_at FROM todos WHERE id < ? ORDER BY id DESC LIMIT ?";

/// CRUD over the `todos` table.
///
/// Every operation is bounded by the statement timeout; dropping the returned
/// future cancels whatever statement is in flight. Write-then-confirm pairs run
/// in one transaction so the confirmation read always sees the row it wrote.
#[derive(Clone)]
pub struct TodoService {
    pool: SqlitePool,
    statement_timeout: Duration,
    max_page_size: i64,
}

impl TodoService {
    pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_MAX_PAGE_SIZE: i64 = 100;

    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            statement_timeout: Self::DEFAULT_STATEMENT_TIMEOUT,
            max_page_size: Self::DEFAULT_MAX_PAGE_SIZE,
        }
    }

    pub fn from_config(pool: SqlitePool, config: &DatabaseConfig) -> Self {
        Self::new(pool)
            .with_statement_timeout(config.statement_timeout())
            .with_max_page_size(config.max_page_size)
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: i64) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a todo and return it as stored, with server-assigned id and timestamps
    pub async fn create_todo(&self, subject: &str, description: &str) -> Result<Todo, TodoError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(INSERT)
                .bind(subject)
                .bind(description)
                .execute(&mut *tx)
                .await?;
            let id = result.last_insert_rowid();

            let todo = sqlx::query_as::<_, Todo>(CONFIRM)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

            tx.commit().await?;
            debug!("Created todo {}", todo.id);
            Ok::<_, TodoError>(todo)
        })
        .await
    }

    /// Keyset pagination, newest first.
    ///
    /// `prev_id` is the last id of the previous page; only rows with a strictly
    /// smaller id are returned. `None`, or a non-positive id, starts from the
    /// newest row. `size` must be positive and is clamped to the configured
    /// maximum.
    pub async fn read_todos(&self, prev_id: Option<i64>, size: i64) -> Result<Vec<Todo>, TodoError> {
        if size <= 0 {
            return Err(TodoError::InvalidPageSize(size));
        }
        let limit = size.min(self.max_page_size);

        self.bounded(async {
            let todos = match prev_id.filter(|id| *id > 0) {
                Some(prev_id) => {
                    sqlx::query_as::<_, Todo>(READ_BEFORE)
                        .bind(prev_id)
                        .bind(limit)
                        .fetch_all(&self.pool)
                        .await?
                }
                None => {
                    sqlx::query_as::<_, Todo>(READ)
                        .bind(limit)
                        .fetch_all(&self.pool)
                        .await?
                }
            };
            Ok::<_, TodoError>(todos)
        })
        .await
    }

    /// Overwrite subject and description. Storage refreshes `updated_at`.
    pub async fn update_todo(&self, id: i64, subject: &str, description: &str) -> Result<Todo, TodoError> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;

            let result = sqlx::query(UPDATE)
                .bind(subject)
                .bind(description)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                debug!("Update matched no todo with id {}", id);
                return Err(TodoError::NotFound);
            }

            let todo = sqlx::query_as::<_, Todo>(CONFIRM)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok::<_, TodoError>(todo)
        })
        .await
    }

    /// Delete every todo whose id is in `ids` with a single statement.
    ///
    /// An empty slice is a no-op. Succeeds when at least one row was removed;
    /// which of the ids were missing is not reported.
    pub async fn delete_todos(&self, ids: &[i64]) -> Result<(), TodoError> {
        if ids.is_empty() {
            return Ok(());
        }

        self.bounded(async {
            let placeholders = vec!["?"; ids.len()].join(", ");
            let sql = format!("DELETE FROM todos WHERE id IN ({})", placeholders);

            let mut query = sqlx::query(&sql);
            for id in ids {
                query = query.bind(*id);
            }

            let result = query.execute(&self.pool).await?;
            if result.rows_affected() == 0 {
                debug!("Delete matched none of {} ids", ids.len());
                return Err(TodoError::NotFound);
            }
            Ok::<_, TodoError>(())
        })
        .await
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, TodoError>
    where
        F: Future<Output = Result<T, TodoError>>,
    {
        tokio::time::timeout(self.statement_timeout, op)
            .await
            .map_err(|_| TodoError::Timeout(self.statement_timeout))?
    }
}
