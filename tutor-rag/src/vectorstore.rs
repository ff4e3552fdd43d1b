//! Vector store trait for persisting and searching chunk embeddings.

use async_trait::async_trait;

use crate::document::{Chunk, RetrievalResult};
use crate::error::Result;

/// A chunk together with its embedding, as persisted by a [`VectorStore`].
///
/// Entries are never mutated in place: writing an entry with an existing
/// [`id`](IndexedVector::id) replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVector {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
    /// The embedding is the zero-vector fallback.
    pub degraded: bool,
}

impl IndexedVector {
    /// The identity key the entry is stored under.
    pub fn id(&self) -> String {
        self.chunk.id()
    }
}

/// A storage backend for chunk embeddings with similarity search.
///
/// Implementations manage named collections of [`IndexedVector`]s.
/// Errors are reported to the caller; [`VectorIndex`](crate::VectorIndex)
/// decides how to degrade.
///
/// # Example
///
/// ```rust,ignore
/// use tutor_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("course_materials", 1536).await?;
/// store.upsert("course_materials", &entry).await?;
/// let results = store.search("course_materials", &query_embedding, 3, false).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Drop every entry of a collection and recreate it empty under the same
    /// name.
    ///
    /// Readers observe either the old contents or the empty collection, never
    /// a missing collection.
    async fn reset_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Insert or replace a single entry, keyed by [`IndexedVector::id`].
    async fn upsert(&self, collection: &str, entry: &IndexedVector) -> Result<()>;

    /// Return the `top_k` entries most similar to `embedding`, ordered by
    /// descending score with `rank` assigned from 0.
    ///
    /// Degraded entries are skipped unless `include_degraded` is set.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        include_degraded: bool,
    ) -> Result<Vec<RetrievalResult>>;

    /// Fetch a single entry by identity key.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<IndexedVector>>;

    /// Number of entries stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;

    /// A short backend name for log records.
    fn backend(&self) -> &str;
}

/// Sort scored entries by descending score, keep `top_k`, and assign ranks.
pub(crate) fn rank_results(
    mut scored: Vec<RetrievalResult>,
    top_k: usize,
) -> Vec<RetrievalResult> {
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    for (rank, result) in scored.iter_mut().enumerate() {
        result.rank = rank;
    }
    scored
}
