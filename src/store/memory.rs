use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::store::{Document, DocumentStore, Record, StoreError, check_field, merge_patch};

/// Process-local store, used when no database is configured and in tests.
/// Each collection keeps insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .map(|r| r.body.clone()))
    }

    async fn find_by(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Record>, StoreError> {
        check_field(field)?;
        let collections = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        Ok(collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.body.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.read().map_err(|_| StoreError::Poisoned)?;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn create(&self, collection: &str, id: Option<&str>, body: Document) -> Result<String, StoreError> {
        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut collections = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        let records = collections.entry(collection.to_string()).or_default();

        if records.iter().any(|r| r.id == id) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id,
            });
        }

        records.push(Record { id: id.clone(), body });
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.iter_mut().find(|r| r.id == id));

        match record {
            Some(record) => {
                merge_patch(&mut record.body, patch);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().map_err(|_| StoreError::Poisoned)?;
        let Some(records) = collections.get_mut(collection) else {
            return Ok(false);
        };

        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[actix_web::test]
    async fn create_get_update_delete() {
        let store = MemoryStore::new();

        let id = store
            .create("employees", Some("102"), doc(json!({"name": "Ali", "status": "active"})))
            .await
            .unwrap();
        assert_eq!(id, "102");

        assert!(
            store
                .update("employees", "102", doc(json!({"status": "inactive"})))
                .await
                .unwrap()
        );
        let body = store.get("employees", "102").await.unwrap().unwrap();
        assert_eq!(Value::Object(body), json!({"name": "Ali", "status": "inactive"}));

        assert!(store.delete("employees", "102").await.unwrap());
        assert!(!store.delete("employees", "102").await.unwrap());
        assert_eq!(store.get("employees", "102").await.unwrap(), None);
    }

    #[actix_web::test]
    async fn duplicate_ids_conflict() {
        let store = MemoryStore::new();
        store.create("users", Some("admin"), Document::new()).await.unwrap();

        let err = store.create("users", Some("admin"), Document::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[actix_web::test]
    async fn generated_ids_are_unique() {
        let store = MemoryStore::new();
        let a = store.create("requests", None, Document::new()).await.unwrap();
        let b = store.create("requests", None, Document::new()).await.unwrap();
        assert_ne!(a, b);
    }

    #[actix_web::test]
    async fn find_by_matches_field_and_keeps_order() {
        let store = MemoryStore::new();
        for (id, kind) in [("1", "leave"), ("2", "overtime"), ("3", "leave")] {
            store
                .create("requests", Some(id), doc(json!({"kind": kind})))
                .await
                .unwrap();
        }

        let leave = store.find_by("requests", "kind", &json!("leave")).await.unwrap();
        let ids: Vec<&str> = leave.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        assert!(store.find_by("requests", "kind", &json!("sick")).await.unwrap().is_empty());
        assert!(store.list("missing").await.unwrap().is_empty());
        assert!(!store.update("missing", "1", Document::new()).await.unwrap());
    }
}
