// document-store-rs/src/lib.rs
// Document store contract used by the directory tools, the outcome logger
// and the insight aggregator.
//
// Records are schemaless JSON objects grouped into named collections.
// Reads go through an aggregation pipeline (match / unwind / group / sort /
// limit) evaluated in process by both backends.

use async_trait::async_trait;

pub use shared_types_rs::Document;

mod memory;
mod ndjson;
pub mod pipeline;

pub use memory::MemoryDocumentStore;
pub use ndjson::NdjsonDocumentStore;
pub use pipeline::{compare_values, lookup_path, run_pipeline, value_text, Accumulator, Filter, GroupKey, Stage};

/// Store error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid collection name: {0}")]
    InvalidCollection(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append one record to a collection, creating the collection if needed.
    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Run an aggregation pipeline over every record of a collection.
    ///
    /// An unknown collection behaves like an empty one.
    async fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> Result<Vec<Document>, StoreError>;

    async fn list_collections(&self) -> Result<Vec<String>, StoreError>;

    /// Convenience wrapper: filter then cap.
    async fn find(&self, collection: &str, filter: Filter, limit: Option<usize>) -> Result<Vec<Document>, StoreError> {
        let mut stages = vec![Stage::Match(filter)];
        if let Some(limit) = limit {
            stages.push(Stage::Limit(limit));
        }
        self.aggregate(collection, &stages).await
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        Ok(self.aggregate(collection, &[]).await?.len())
    }
}

pub(crate) fn validate_collection(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}
