use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::store::{Document, DocumentStore, Record, StoreError};

/// A document type stored in one named collection.
pub trait Collection: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
}

/// Typed view over one collection. The document id is exposed to `T` as an
/// `"id"` key on read and never written into the stored body.
pub struct Repository<'a, T> {
    store: &'a dyn DocumentStore,
    _marker: PhantomData<T>,
}

impl<'a, T: Collection> Repository<'a, T> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    fn decode(id: &str, mut body: Document) -> Result<T, StoreError> {
        body.insert("id".to_string(), Value::String(id.to_string()));
        Ok(serde_json::from_value(Value::Object(body))?)
    }

    fn decode_all(records: Vec<Record>) -> Result<Vec<T>, StoreError> {
        records
            .into_iter()
            .map(|r| Self::decode(&r.id, r.body))
            .collect()
    }

    fn encode(doc: &T) -> Result<Document, StoreError> {
        match serde_json::to_value(doc)? {
            Value::Object(mut map) => {
                map.remove("id");
                Ok(map)
            }
            _ => Ok(Document::new()),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(|body| Self::decode(id, body))
            .transpose()
    }

    pub async fn find_by(&self, field: &str, value: impl Into<Value>) -> Result<Vec<T>, StoreError> {
        let records = self.store.find_by(T::COLLECTION, field, &value.into()).await?;
        Self::decode_all(records)
    }

    pub async fn list(&self) -> Result<Vec<T>, StoreError> {
        let records = self.store.list(T::COLLECTION).await?;
        Self::decode_all(records)
    }

    pub async fn create(&self, id: Option<&str>, doc: &T) -> Result<String, StoreError> {
        let body = Self::encode(doc)?;
        self.store.create(T::COLLECTION, id, body).await
    }

    /// Merge-patch with any serializable value that renders as an object.
    pub async fn update(&self, id: &str, patch: impl Serialize) -> Result<bool, StoreError> {
        let patch = match serde_json::to_value(patch)? {
            Value::Object(map) => map,
            _ => Document::new(),
        };
        self.store.update(T::COLLECTION, id, patch).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }
}
