//! Vector index behaviour: idempotent upserts, degradation and clearing.

use std::sync::Arc;

use async_trait::async_trait;
use tutor_rag::{
    Chunk, ChunkMetadata, EmbeddingProvider, FileType, InMemoryVectorStore, IndexedVector,
    MockEmbeddingProvider, RagConfig, RagError, ResilientEmbedder, RetrievalResult, VectorIndex,
    VectorStore,
};

const DIM: usize = 64;

fn config() -> RagConfig {
    RagConfig::builder().embedding_dimensions(DIM).build().unwrap()
}

fn chunk(filename: &str, page: u32, chunk_id: u32, content: &str) -> Chunk {
    let metadata = ChunkMetadata {
        filename: filename.to_string(),
        filepath: format!("data/{filename}"),
        filetype: FileType::from_path(std::path::Path::new(filename)).unwrap(),
        page_number: page,
        chunk_id,
    };
    Chunk::new(content, metadata).unwrap()
}

async fn open_index(
    provider: impl EmbeddingProvider + 'static,
    store: Arc<dyn VectorStore>,
    config: &RagConfig,
) -> VectorIndex {
    let embedder = ResilientEmbedder::new(Arc::new(provider), config);
    VectorIndex::open(embedder, store, "course_materials", config).await.unwrap()
}

#[tokio::test]
async fn reindexing_the_same_chunks_does_not_grow_the_index() {
    let config = config();
    let index =
        open_index(MockEmbeddingProvider::new(DIM), Arc::new(InMemoryVectorStore::new()), &config)
            .await;
    let chunks = vec![
        chunk("lecture01.pdf", 1, 0, "Introduction to algorithms"),
        chunk("lecture01.pdf", 2, 0, "Asymptotic notation and big O"),
        chunk("notes.txt", 0, 0, "Sorting is covered next week"),
    ];

    let first = index.add_documents(&chunks).await;
    assert_eq!(first.succeeded, 3);
    assert_eq!(first.total_in_store, Some(3));

    let second = index.add_documents(&chunks).await;
    assert_eq!(second.succeeded, 3);
    assert_eq!(index.count().await.unwrap(), 3);
}

#[tokio::test]
async fn upsert_replaces_content_under_the_same_identity() {
    let config = config();
    let store = Arc::new(InMemoryVectorStore::new());
    let index = open_index(MockEmbeddingProvider::new(DIM), store.clone(), &config).await;

    index.add_documents(&[chunk("bio.pdf", 3, 0, "old text")]).await;
    index.add_documents(&[chunk("bio.pdf", 3, 0, "new text")]).await;

    let stored = store.get("course_materials", "bio.pdf_3_0").await.unwrap().unwrap();
    assert_eq!(stored.chunk.content, "new text");
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn empty_index_search_returns_nothing() {
    let config = config();
    let index =
        open_index(MockEmbeddingProvider::new(DIM), Arc::new(InMemoryVectorStore::new()), &config)
            .await;

    assert!(index.search("anything at all", 3).await.is_empty());
    assert_eq!(index.add_documents(&[]).await.succeeded, 0);
}

#[tokio::test]
async fn search_ranks_the_most_similar_chunk_first() {
    let config = config();
    let index =
        open_index(MockEmbeddingProvider::new(DIM), Arc::new(InMemoryVectorStore::new()), &config)
            .await;
    index
        .add_documents(&[
            chunk("cs.pdf", 1, 0, "hash tables give constant time lookup"),
            chunk("cs.pdf", 2, 0, "binary search tree insertion and deletion"),
            chunk("cs.pdf", 3, 0, "graph traversal with breadth first search"),
        ])
        .await;

    let results = index.search("binary search tree", 2).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metadata.page_number, 2);
    assert_eq!(results[0].rank, 0);
    assert_eq!(results[1].rank, 1);
    assert!(results[0].score >= results[1].score);
}

#[tokio::test]
async fn clear_leaves_an_empty_searchable_collection() {
    let config = config();
    let index =
        open_index(MockEmbeddingProvider::new(DIM), Arc::new(InMemoryVectorStore::new()), &config)
            .await;
    let chunks = [chunk("a.txt", 0, 0, "some content"), chunk("a.txt", 0, 1, "more")];
    index.add_documents(&chunks).await;

    index.clear().await.unwrap();

    assert_eq!(index.count().await.unwrap(), 0);
    assert!(index.search("some content", 3).await.is_empty());
    index.add_documents(&[chunk("a.txt", 0, 0, "some content")]).await;
    assert_eq!(index.count().await.unwrap(), 1);
}

#[tokio::test]
async fn embedding_outage_degrades_to_zero_vectors() {
    let config = config();
    let store = Arc::new(InMemoryVectorStore::new());
    let index = open_index(MockEmbeddingProvider::failing(DIM), store.clone(), &config).await;

    let report = index
        .add_documents(&[chunk("a.txt", 0, 0, "first"), chunk("a.txt", 0, 1, "second")])
        .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.degraded, 2);
    assert_eq!(report.failed, 0);

    let stored = store.get("course_materials", "a.txt_0_1").await.unwrap().unwrap();
    assert!(stored.degraded);
    assert_eq!(stored.embedding, vec![0.0; DIM]);

    // The query embedding degrades too, so nothing is returned.
    assert!(index.search("first", 3).await.is_empty());
}

#[tokio::test]
async fn degraded_entries_are_excluded_unless_configured() {
    let store = Arc::new(InMemoryVectorStore::new());
    let excluded = config();
    let index = open_index(MockEmbeddingProvider::new(DIM), store.clone(), &excluded).await;
    index.add_documents(&[chunk("good.txt", 0, 0, "recursion and induction")]).await;

    let zero = IndexedVector {
        chunk: chunk("bad.txt", 0, 0, "recursion and induction"),
        embedding: vec![0.0; DIM],
        degraded: true,
    };
    store.upsert("course_materials", &zero).await.unwrap();

    let results = index.search("recursion", 5).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].metadata.filename, "good.txt");

    let included = RagConfig { exclude_degraded: false, ..config() };
    let index = open_index(MockEmbeddingProvider::new(DIM), store, &included).await;
    assert_eq!(index.search("recursion", 5).await.len(), 2);
}

#[tokio::test]
async fn long_input_is_truncated_before_embedding() {
    struct LengthCheck;

    #[async_trait]
    impl EmbeddingProvider for LengthCheck {
        async fn embed(&self, text: &str) -> tutor_rag::Result<Vec<f32>> {
            assert!(text.chars().count() <= 10);
            Ok(vec![1.0; DIM])
        }

        fn dimensions(&self) -> usize {
            DIM
        }
    }

    let config =
        RagConfig::builder().embedding_dimensions(DIM).max_embedding_chars(10).build().unwrap();
    let embedder = ResilientEmbedder::new(Arc::new(LengthCheck), &config);
    let embedding = embedder.embed(&"长".repeat(50)).await;
    assert!(!embedding.degraded);
}

/// A store that rejects one identity and otherwise delegates.
struct FlakyStore {
    inner: InMemoryVectorStore,
    reject: String,
}

#[async_trait]
impl VectorStore for FlakyStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> tutor_rag::Result<()> {
        self.inner.create_collection(name, dimensions).await
    }

    async fn reset_collection(&self, name: &str, dimensions: usize) -> tutor_rag::Result<()> {
        self.inner.reset_collection(name, dimensions).await
    }

    async fn upsert(&self, collection: &str, entry: &IndexedVector) -> tutor_rag::Result<()> {
        if entry.id() == self.reject {
            return Err(RagError::VectorStore {
                backend: "flaky".to_string(),
                message: "disk full".to_string(),
            });
        }
        self.inner.upsert(collection, entry).await
    }

    async fn search(
        &self,
        _collection: &str,
        _embedding: &[f32],
        _top_k: usize,
        _include_degraded: bool,
    ) -> tutor_rag::Result<Vec<RetrievalResult>> {
        Err(RagError::VectorStore { backend: "flaky".to_string(), message: "offline".to_string() })
    }

    async fn get(&self, collection: &str, id: &str) -> tutor_rag::Result<Option<IndexedVector>> {
        self.inner.get(collection, id).await
    }

    async fn count(&self, collection: &str) -> tutor_rag::Result<usize> {
        self.inner.count(collection).await
    }

    fn backend(&self) -> &str {
        "flaky"
    }
}

#[tokio::test]
async fn store_failures_are_counted_and_skipped() {
    let config = config();
    let store = FlakyStore { inner: InMemoryVectorStore::new(), reject: "a.txt_0_1".to_string() };
    let index = open_index(MockEmbeddingProvider::new(DIM), Arc::new(store), &config).await;

    let report = index
        .add_documents(&[
            chunk("a.txt", 0, 0, "one"),
            chunk("a.txt", 0, 1, "two"),
            chunk("a.txt", 0, 2, "three"),
        ])
        .await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.total_in_store, Some(2));

    // Search failures surface as an empty result, not an error.
    assert!(index.search("one", 3).await.is_empty());
}

/// A store whose collection exists but cannot be read or written.
struct UnreadableStore;

#[async_trait]
impl VectorStore for UnreadableStore {
    async fn create_collection(&self, _name: &str, _dimensions: usize) -> tutor_rag::Result<()> {
        Ok(())
    }

    async fn reset_collection(&self, _name: &str, _dimensions: usize) -> tutor_rag::Result<()> {
        Err(Self::error())
    }

    async fn upsert(&self, _collection: &str, _entry: &IndexedVector) -> tutor_rag::Result<()> {
        Err(Self::error())
    }

    async fn search(
        &self,
        _collection: &str,
        _embedding: &[f32],
        _top_k: usize,
        _include_degraded: bool,
    ) -> tutor_rag::Result<Vec<RetrievalResult>> {
        Err(Self::error())
    }

    async fn get(&self, _collection: &str, _id: &str) -> tutor_rag::Result<Option<IndexedVector>> {
        Err(Self::error())
    }

    async fn count(&self, _collection: &str) -> tutor_rag::Result<usize> {
        Err(Self::error())
    }

    fn backend(&self) -> &str {
        "unreadable"
    }
}

impl UnreadableStore {
    fn error() -> RagError {
        RagError::VectorStore { backend: "unreadable".to_string(), message: "locked".to_string() }
    }
}

#[tokio::test]
async fn only_administrative_operations_surface_store_errors() {
    let config = config();
    let store = Arc::new(UnreadableStore);
    let index = open_index(MockEmbeddingProvider::new(DIM), store, &config).await;

    let report = index.add_documents(&[chunk("a.txt", 0, 0, "one")]).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.total_in_store, None);
    assert!(index.search("one", 3).await.is_empty());

    assert!(matches!(index.count().await, Err(RagError::VectorStore { .. })));
    assert!(matches!(index.clear().await, Err(RagError::VectorStore { .. })));
}
