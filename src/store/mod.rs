//! Narrow document-store interface used by every directory handler.

pub mod memory;
pub mod mysql;
pub mod repository;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use async_trait::async_trait;
use derive_more::{Display, Error};
use serde_json::{Map, Value, json};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;
pub use repository::{Collection, Repository};

/// A JSON object as stored in a collection.
pub type Document = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub body: Document,
}

#[derive(Debug, Display, Error)]
pub enum StoreError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "invalid document: {}", _0)]
    Serde(serde_json::Error),

    #[display(fmt = "document '{}' already exists in '{}'", id, collection)]
    Conflict { collection: String, id: String },

    #[display(fmt = "invalid field name '{}'", field)]
    InvalidField { field: String },

    #[display(fmt = "store lock poisoned")]
    Poisoned,
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e)
    }
}

impl ResponseError for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            StoreError::Conflict { .. } => StatusCode::CONFLICT,
            StoreError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "Document store failure");
                "Something went wrong, Contact with system admin".to_string()
            }
            _ => self.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

/// get-by-id, query-by-field, list, create, merge-update and delete over
/// named collections of JSON documents.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Short backend name reported by `/health`.
    fn backend(&self) -> &'static str;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Documents whose top-level `field` equals `value`, oldest first.
    async fn find_by(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Record>, StoreError>;

    /// Every document of the collection, oldest first.
    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError>;

    /// Insert under `id`, or a fresh UUID when `None`. Returns the id used.
    async fn create(&self, collection: &str, id: Option<&str>, body: Document) -> Result<String, StoreError>;

    /// JSON merge-patch (RFC 7396). `false` when the document does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<bool, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}

/// Apply `patch` to `target`: `null` removes a key, objects merge
/// recursively, everything else replaces.
pub fn merge_patch(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(&key);
            }
            Value::Object(inner) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => merge_patch(existing, inner),
                _ => {
                    let mut fresh = Document::new();
                    merge_patch(&mut fresh, inner);
                    target.insert(key, Value::Object(fresh));
                }
            },
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// Field names end up in JSON paths; keep them to plain identifiers.
pub(crate) fn check_field(field: &str) -> Result<(), StoreError> {
    let valid = !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidField {
            field: field.to_string(),
        })
    }
}
