// document-store-rs/src/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{run_pipeline, validate_collection, Document, DocumentStore, Stage, StoreError};

/// Volatile store used by tests and by the CLI when no data dir is set.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection in one call.
    pub async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        validate_collection(collection)?;
        let mut guard = self.collections.write().await;
        guard.entry(collection.to_string()).or_default().extend(documents);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        validate_collection(collection)?;
        let mut guard = self.collections.write().await;
        guard.entry(collection.to_string()).or_default().push(document);
        Ok(())
    }

    async fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        let snapshot = {
            let guard = self.collections.read().await;
            guard.get(collection).cloned().unwrap_or_default()
        };
        Ok(run_pipeline(snapshot, pipeline))
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let guard = self.collections.read().await;
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
