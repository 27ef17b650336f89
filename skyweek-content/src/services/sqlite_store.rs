//! SQLite document store
//!
//! Local backend for the document store protocol. Every collection lives
//! in one `documents` table keyed by (collection, natural_key), where the
//! natural key is the conflict field values joined with a unit separator.
//! Filters naming the whole conflict key become a primary key lookup; any
//! other filter is pushed into SQL through the JSON1 functions.

use super::store_client::{
    merge_documents, scalar_text, Collection, Document, DocumentStore, Filter, StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::path::Path;

const KEY_SEPARATOR: char = '\u{1f}';

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// SQLite-backed document store
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Open (creating if needed) the store file
    pub async fn connect(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Database(e.to_string()))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to document store: {}", db_url);

        let pool = SqlitePool::connect(&db_url).await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory store; a single connection keeps one database
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        init_tables(&pool).await?;
        Ok(Self { pool })
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: Collection) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE collection = ?")
            .bind(collection.name())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn init_tables(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            natural_key TEXT NOT NULL,
            body TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (collection, natural_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Document store tables initialized");
    Ok(())
}

fn natural_key(record: &Document, conflict_key: &[&str]) -> Result<String, StoreError> {
    let mut parts = Vec::with_capacity(conflict_key.len());
    for field in conflict_key {
        let value = record
            .get(*field)
            .and_then(scalar_text)
            .ok_or_else(|| StoreError::Parse(format!("record missing conflict field '{}'", field)))?;
        parts.push(value);
    }
    Ok(parts.join(&KEY_SEPARATOR.to_string()))
}

/// Natural key when the filter pins every conflict field
fn filter_key(filter: &Filter, conflict_key: &[&str]) -> Option<String> {
    let parts = conflict_key
        .iter()
        .map(|field| {
            filter
                .conditions()
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, value)| value.as_str())
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join(&KEY_SEPARATOR.to_string()))
}

/// One equality condition over the stored body
///
/// Compares the same text form `scalar_text` produces. Reals and
/// unparseable bodies stay candidates so the row-level check decides.
fn push_condition(query: &mut QueryBuilder<'_, Sqlite>, field: &str, expected: &str) {
    let path = format!("$.\"{}\"", field);
    query.push(" AND CASE WHEN NOT json_valid(body) THEN 1 ELSE CASE json_type(body, ");
    query.push_bind(path.clone());
    query.push(") WHEN 'text' THEN json_extract(body, ");
    query.push_bind(path.clone());
    query.push(") = ");
    query.push_bind(expected.to_string());
    query.push(" WHEN 'integer' THEN CAST(json_extract(body, ");
    query.push_bind(path);
    query.push(") AS TEXT) = ");
    query.push_bind(expected.to_string());
    query.push(" WHEN 'true' THEN ");
    query.push_bind(expected.to_string());
    query.push(" = 'true' WHEN 'false' THEN ");
    query.push_bind(expected.to_string());
    query.push(" = 'false' WHEN 'real' THEN 1 ELSE 0 END END");
}

fn parse_body(body: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Parse("stored body is not an object".to_string())),
        Err(e) => Err(StoreError::Parse(e.to_string())),
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let rows = match filter_key(filter, collection.conflict_key()) {
            Some(key) => {
                sqlx::query("SELECT natural_key, body FROM documents WHERE collection = ? AND natural_key = ?")
                    .bind(collection.name())
                    .bind(key)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let mut query: QueryBuilder<Sqlite> =
                    QueryBuilder::new("SELECT natural_key, body FROM documents WHERE collection = ");
                query.push_bind(collection.name());
                for (field, expected) in filter.conditions() {
                    push_condition(&mut query, field, expected);
                }
                query.push(" ORDER BY natural_key");
                let rows = query.build().fetch_all(&self.pool).await?;
                rows
            }
        };

        let mut documents = Vec::new();
        for row in rows {
            let body: String = row.get("body");
            match parse_body(&body) {
                Ok(document) if filter.matches(&document) => documents.push(document),
                Ok(_) => {}
                Err(e) => {
                    let key: String = row.get("natural_key");
                    tracing::warn!(
                        collection = collection.name(),
                        key = %key.replace(KEY_SEPARATOR, "/"),
                        error = %e,
                        "Skipping unreadable stored document"
                    );
                }
            }
        }
        Ok(documents)
    }

    async fn upsert(
        &self,
        collection: Collection,
        record: Document,
        conflict_key: &[&str],
    ) -> Result<Document, StoreError> {
        let key = natural_key(&record, conflict_key)?;
        let mut tx = self.pool.begin().await?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE collection = ? AND natural_key = ?",
        )
        .bind(collection.name())
        .bind(&key)
        .fetch_optional(&mut *tx)
        .await?;

        let merged = match existing {
            Some(body) => match parse_body(&body) {
                Ok(mut document) => {
                    merge_documents(&mut document, record);
                    document
                }
                Err(e) => {
                    tracing::warn!(collection = collection.name(), error = %e, "Replacing unreadable stored document");
                    record
                }
            },
            None => record,
        };

        let body = serde_json::to_string(&merged).map_err(|e| StoreError::Parse(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, natural_key, body, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(collection, natural_key) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection.name())
        .bind(&key)
        .bind(&body)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(merged)
    }
}
