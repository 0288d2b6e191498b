// document-store-rs/src/ndjson.rs
// File-backed store: one append-only NDJSON file per collection.
//
// Reads load the whole collection and evaluate the pipeline in memory,
// which is adequate for single-node deployments and local analysis.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{run_pipeline, validate_collection, Document, DocumentStore, Stage, StoreError};

pub struct NdjsonDocumentStore {
    root: PathBuf,
    // serializes appends so concurrent writers never interleave partial lines
    write_lock: Mutex<()>,
}

impl NdjsonDocumentStore {
    /// Create a store rooted at `root`, creating the directory eagerly so a
    /// bad path fails at startup rather than on the first query.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.ndjson", collection))
    }

    async fn read_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let buf = fs::read_to_string(&path).await?;
        let mut out = Vec::new();
        for line in buf.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Document>(line) {
                Ok(doc) => out.push(doc),
                Err(err) => {
                    tracing::warn!(error = %err, collection, "failed to parse record line; skipping");
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for NdjsonDocumentStore {
    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        validate_collection(collection)?;
        let line = serde_json::to_string(&document)?;

        let _guard = self.write_lock.lock().await;
        fs::create_dir_all(&self.root).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.collection_path(collection))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    async fn aggregate(&self, collection: &str, pipeline: &[Stage]) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        let docs = self.read_all(collection).await?;
        Ok(run_pipeline(docs, pipeline))
    }

    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("ndjson") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
