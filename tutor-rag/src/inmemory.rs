//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. Nothing survives the
//! process; it is suitable for tests and throwaway sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::RetrievalResult;
use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::vectorstore::{IndexedVector, VectorStore, rank_results};

/// An in-memory vector store using cosine similarity for search.
///
/// Collections are stored as nested `HashMap`s: collection name → entry ID → entry.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, HashMap<String, IndexedVector>>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    fn missing(collection: &str) -> RagError {
        RagError::VectorStore {
            backend: "InMemory".to_string(),
            message: format!("collection '{collection}' does not exist"),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn reset_collection(&self, name: &str, _dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.insert(name.to_string(), HashMap::new());
        Ok(())
    }

    async fn upsert(&self, collection: &str, entry: &IndexedVector) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| Self::missing(collection))?;
        store.insert(entry.id(), entry.clone());
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        include_degraded: bool,
    ) -> Result<Vec<RetrievalResult>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;

        let scored: Vec<RetrievalResult> = store
            .values()
            .filter(|entry| include_degraded || !entry.degraded)
            .map(|entry| RetrievalResult {
                content: entry.chunk.content.clone(),
                metadata: entry.chunk.metadata.clone(),
                score: cosine_similarity(&entry.embedding, embedding),
                rank: 0,
            })
            .collect();

        Ok(rank_results(scored, top_k))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<IndexedVector>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| Self::missing(collection))?;
        Ok(store.get(id).cloned())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections.get(collection).map(HashMap::len).ok_or_else(|| Self::missing(collection))
    }

    fn backend(&self) -> &str {
        "InMemory"
    }
}
