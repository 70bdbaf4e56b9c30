use async_trait::async_trait;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::debug;
use uuid::Uuid;

use crate::store::{Document, DocumentStore, Record, StoreError, check_field};

/// All collections share one table; each row is a JSON document.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection VARCHAR(64) NOT NULL,
    id         VARCHAR(128) NOT NULL,
    body       JSON NOT NULL,
    created_at TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6),
    updated_at TIMESTAMP(6) NOT NULL DEFAULT CURRENT_TIMESTAMP(6) ON UPDATE CURRENT_TIMESTAMP(6),
    PRIMARY KEY (collection, id)
)
"#;

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = MySqlPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

fn parse_body(raw: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Document::new()),
    }
}

fn to_records(rows: Vec<(String, String)>) -> Result<Vec<Record>, StoreError> {
    rows.into_iter()
        .map(|(id, raw)| Ok(Record { id, body: parse_body(&raw)? }))
        .collect()
}

#[async_trait]
impl DocumentStore for MySqlStore {
    fn backend(&self) -> &'static str {
        "mysql"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let raw = sqlx::query_scalar::<_, String>(
            "SELECT CAST(body AS CHAR) FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        raw.as_deref().map(parse_body).transpose()
    }

    async fn find_by(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Record>, StoreError> {
        check_field(field)?;
        let path = format!("$.{}", field);
        debug!(collection, path = %path, value = %value, "Querying documents by field");

        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT id, CAST(body AS CHAR)
            FROM documents
            WHERE collection = ? AND JSON_EXTRACT(body, ?) = CAST(? AS JSON)
            ORDER BY created_at
            "#,
        )
        .bind(collection)
        .bind(&path)
        .bind(value.to_string())
        .fetch_all(&self.pool)
        .await?;

        to_records(rows)
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT id, CAST(body AS CHAR) FROM documents WHERE collection = ? ORDER BY created_at",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        to_records(rows)
    }

    async fn create(&self, collection: &str, id: Option<&str>, body: Document) -> Result<String, StoreError> {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let body = serde_json::to_string(&body)?;

        let result = sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(&id)
            .bind(body)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(id),
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
                Err(StoreError::Conflict {
                    collection: collection.to_string(),
                    id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<bool, StoreError> {
        let patch = serde_json::to_string(&patch)?;

        let result = sqlx::query(
            "UPDATE documents SET body = JSON_MERGE_PATCH(body, ?) WHERE collection = ? AND id = ?",
        )
        .bind(patch)
        .bind(collection)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // MySQL reports 0 affected rows when the patch changed nothing
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists > 0)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
