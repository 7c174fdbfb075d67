//! Database layer: migrations and the SQLite-backed document store.

use std::fmt::Display;
use std::str::FromStr;

use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};
use waqf_ledger::{Document, DocumentStore, StoreError, VersionToken};

use crate::errors::Result;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let connect = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // Each in-memory connection is its own database, so pin the pool to one.
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    }
    .connect_with(connect)
    .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Document store
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    key: String,
    data: String,
    version: i64,
}

impl DocumentRow {
    fn into_document(self) -> std::result::Result<Document, StoreError> {
        Ok(Document {
            data: serde_json::from_str(&self.data).map_err(backend)?,
            version: VersionToken::new(u64::try_from(self.version).map_err(backend)?),
            key: self.key,
        })
    }
}

fn backend(err: impl Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// [`DocumentStore`] over the `documents` table.
///
/// Versions are per document: a create writes version 1 and every accepted
/// update increments it. Both writes are single conditional statements, so a
/// stale writer sees zero affected rows and gets [`StoreError::Conflict`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl DocumentStore for SqliteStore {
    async fn get(
        &self,
        collection: &str,
        key: &str,
    ) -> std::result::Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT key, data, version FROM documents WHERE collection = ?1 AND key = ?2",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(DocumentRow::into_document).transpose()
    }

    async fn set(
        &self,
        collection: &str,
        key: &str,
        data: Value,
        expected: Option<VersionToken>,
    ) -> std::result::Result<VersionToken, StoreError> {
        let body = serde_json::to_string(&data).map_err(backend)?;

        let (rows_affected, version) = match expected {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO documents (collection, key, data, version)
                    VALUES (?1, ?2, ?3, 1)
                    "#,
                )
                .bind(collection)
                .bind(key)
                .bind(&body)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
                (result.rows_affected(), 1)
            }
            Some(expected) => {
                let current = i64::try_from(expected.raw()).map_err(backend)?;
                let result = sqlx::query(
                    r#"
                    UPDATE documents
                    SET    data = ?3, version = version + 1, updated_at = strftime('%s', 'now')
                    WHERE  collection = ?1 AND key = ?2 AND version = ?4
                    "#,
                )
                .bind(collection)
                .bind(key)
                .bind(&body)
                .bind(current)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
                (result.rows_affected(), expected.raw() + 1)
            }
        };

        if rows_affected == 0 {
            debug!(collection, key, "Conditional write rejected");
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                key: key.to_string(),
            });
        }
        Ok(VersionToken::new(version))
    }

    async fn list(&self, collection: &str) -> std::result::Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT key, data, version FROM documents WHERE collection = ?1 ORDER BY key ASC",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }
}
