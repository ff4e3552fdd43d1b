//! The vector index: embedding, persistence and similarity search behind a
//! non-failing interface.
//!
//! [`VectorIndex`] composes a [`ResilientEmbedder`] with a [`VectorStore`]
//! bound to one named collection. Runtime failures are recovered here:
//! a chunk that cannot be stored is counted and skipped, a search that
//! cannot run returns no results.
//!
//! # Example
//!
//! ```rust,ignore
//! use tutor_rag::{InMemoryVectorStore, RagConfig, ResilientEmbedder, VectorIndex};
//!
//! let config = RagConfig::default();
//! let embedder = ResilientEmbedder::new(Arc::new(my_provider), &config);
//! let store = Arc::new(InMemoryVectorStore::new());
//! let index = VectorIndex::open(embedder, store, "docs", &config).await?;
//!
//! let report = index.add_documents(&chunks).await;
//! let results = index.search("what is photosynthesis?", 3).await;
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::RagConfig;
use crate::document::{Chunk, RetrievalResult};
use crate::embedding::{Embedding, ResilientEmbedder};
use crate::error::Result;
use crate::vectorstore::{IndexedVector, VectorStore};

/// Success and failure tally of a batch upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Entries written to the store.
    pub succeeded: usize,
    /// Entries the store rejected; they were skipped.
    pub failed: usize,
    /// Stored entries whose embedding is the zero-vector fallback.
    pub degraded: usize,
    /// Collection size after the batch, if it could be read.
    pub total_in_store: Option<usize>,
}

impl IngestReport {
    /// Fold another batch's tally into this one, keeping the later total.
    pub fn merge(&mut self, other: IngestReport) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.degraded += other.degraded;
        if other.total_in_store.is_some() {
            self.total_in_store = other.total_in_store;
        }
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "succeeded: {}, failed: {}, degraded: {}",
            self.succeeded, self.failed, self.degraded
        )?;
        if let Some(total) = self.total_in_store {
            write!(f, ", total in store: {total}")?;
        }
        Ok(())
    }
}

/// Persistent, searchable store of embedded chunks for one collection.
///
/// The index exclusively owns its store for the lifetime of the process;
/// callers only ever see [`RetrievalResult`]s.
pub struct VectorIndex {
    embedder: ResilientEmbedder,
    store: Arc<dyn VectorStore>,
    collection: String,
    include_degraded: bool,
}

impl VectorIndex {
    /// Bind `store` to `collection`, creating the collection if needed.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the collection cannot be created.
    pub async fn open(
        embedder: ResilientEmbedder,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        config: &RagConfig,
    ) -> Result<Self> {
        let collection = collection.into();
        store.create_collection(&collection, embedder.dimensions()).await?;
        info!(collection = %collection, backend = store.backend(), "opened vector index");

        Ok(Self { embedder, store, collection, include_degraded: !config.exclude_degraded })
    }

    /// The collection this index reads and writes.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The embedding client used for chunks and queries.
    pub fn embedder(&self) -> &ResilientEmbedder {
        &self.embedder
    }

    /// Embed and store each chunk, one at a time and in order.
    ///
    /// Embedding failures degrade to a zero vector (see
    /// [`ResilientEmbedder`]); storage failures are counted and the chunk is
    /// skipped. Every chunk is attempted.
    pub async fn add_documents(&self, chunks: &[Chunk]) -> IngestReport {
        if chunks.is_empty() {
            warn!(collection = %self.collection, "no chunks to add");
            return IngestReport { total_in_store: self.try_count().await, ..Default::default() };
        }

        info!(collection = %self.collection, chunks = chunks.len(), "adding chunks");
        let mut report = IngestReport::default();
        for chunk in chunks {
            let embedding = self.embedder.embed(&chunk.content).await;
            self.store_one(chunk, embedding, &mut report).await;
        }
        self.finish(report).await
    }

    /// Store chunks whose embeddings were computed elsewhere.
    ///
    /// Same partial-failure accounting as [`add_documents`](Self::add_documents).
    pub async fn upsert(&self, entries: Vec<(Chunk, Embedding)>) -> IngestReport {
        let mut report = IngestReport::default();
        for (chunk, embedding) in entries {
            self.store_one(&chunk, embedding, &mut report).await;
        }
        self.finish(report).await
    }

    async fn store_one(&self, chunk: &Chunk, embedding: Embedding, report: &mut IngestReport) {
        let entry = IndexedVector {
            chunk: chunk.clone(),
            embedding: embedding.vector,
            degraded: embedding.degraded,
        };

        match self.store.upsert(&self.collection, &entry).await {
            Ok(()) => {
                report.succeeded += 1;
                if entry.degraded {
                    report.degraded += 1;
                }
            }
            Err(e) => {
                report.failed += 1;
                error!(
                    id = %entry.id(),
                    chars = chunk.content.chars().count(),
                    error = %e,
                    "failed to store chunk, skipping"
                );
            }
        }
    }

    async fn finish(&self, mut report: IngestReport) -> IngestReport {
        report.total_in_store = self.try_count().await;
        info!(collection = %self.collection, %report, "upsert finished");
        report
    }

    /// Retrieve the `k` chunks most similar to `query`, best first.
    ///
    /// Returns an empty `Vec` when the collection is empty, when the query
    /// embedding degraded, or when the store fails. "No context" is an
    /// expected outcome, not an error.
    pub async fn search(&self, query: &str, k: usize) -> Vec<RetrievalResult> {
        let embedding = self.embedder.embed(query).await;
        if embedding.degraded {
            warn!(collection = %self.collection, "query embedding degraded, returning no results");
            return Vec::new();
        }

        match self.store.search(&self.collection, &embedding.vector, k, self.include_degraded).await
        {
            Ok(results) => {
                info!(collection = %self.collection, results = results.len(), "search completed");
                results
            }
            Err(e) => {
                error!(collection = %self.collection, error = %e, "vector search failed");
                Vec::new()
            }
        }
    }

    /// Remove every stored vector, leaving an empty collection of the same
    /// name.
    ///
    /// # Errors
    ///
    /// Returns the store's error; the previous contents remain in that case.
    pub async fn clear(&self) -> Result<()> {
        if let Err(e) =
            self.store.reset_collection(&self.collection, self.embedder.dimensions()).await
        {
            error!(collection = %self.collection, error = %e, "failed to clear vector index");
            return Err(e);
        }
        info!(collection = %self.collection, "cleared vector index");
        Ok(())
    }

    /// Number of stored vectors.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the collection cannot be read.
    pub async fn count(&self) -> Result<usize> {
        self.store.count(&self.collection).await.inspect_err(|e| {
            warn!(collection = %self.collection, error = %e, "failed to count entries");
        })
    }

    async fn try_count(&self) -> Option<usize> {
        self.count().await.ok()
    }
}
