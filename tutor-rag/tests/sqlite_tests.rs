//! SQLite vector store: persistence across reopen, overwrite and reset.
#![cfg(feature = "sqlite")]

use std::sync::Arc;

use tutor_rag::{
    Chunk, ChunkMetadata, FileType, IndexedVector, MockEmbeddingProvider, RagConfig,
    ResilientEmbedder, SqliteVectorStore, VectorIndex, VectorStore,
};

const DIM: usize = 8;

fn entry(chunk_id: u32, content: &str, embedding: Vec<f32>, degraded: bool) -> IndexedVector {
    let metadata = ChunkMetadata {
        filename: "slides.pptx".to_string(),
        filepath: "data/slides.pptx".to_string(),
        filetype: FileType::Pptx,
        page_number: 4,
        chunk_id,
    };
    IndexedVector { chunk: Chunk::new(content, metadata).unwrap(), embedding, degraded }
}

fn unit(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[axis] = 1.0;
    v
}

#[tokio::test]
async fn entries_survive_reopening() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = SqliteVectorStore::open(dir.path()).await.unwrap();
        store.create_collection("course", DIM).await.unwrap();
        store.upsert("course", &entry(0, "persisted slide", unit(0), false)).await.unwrap();
        store.close().await;
    }

    let store = SqliteVectorStore::open(dir.path()).await.unwrap();
    store.create_collection("course", DIM).await.unwrap();
    assert_eq!(store.count("course").await.unwrap(), 1);

    let stored = store.get("course", "slides.pptx_4_0").await.unwrap().unwrap();
    assert_eq!(stored.chunk.content, "persisted slide");
    assert_eq!(stored.chunk.metadata.filetype, FileType::Pptx);
    assert_eq!(stored.embedding, unit(0));
    assert!(!stored.degraded);
}

#[tokio::test]
async fn upsert_overwrites_and_search_ranks() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteVectorStore::open(dir.path()).await.unwrap();
    store.create_collection("course", DIM).await.unwrap();

    store.upsert("course", &entry(0, "first draft", unit(0), false)).await.unwrap();
    store.upsert("course", &entry(0, "final text", unit(1), false)).await.unwrap();
    store.upsert("course", &entry(1, "other", unit(2), false)).await.unwrap();
    store.upsert("course", &entry(2, "fallback", vec![0.0; DIM], true)).await.unwrap();
    assert_eq!(store.count("course").await.unwrap(), 3);

    let results = store.search("course", &unit(1), 5, false).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].content, "final text");
    assert_eq!(results[0].rank, 0);
    assert!((results[0].score - 1.0).abs() < 1e-6);

    let with_degraded = store.search("course", &unit(1), 5, true).await.unwrap();
    assert_eq!(with_degraded.len(), 3);

    let missing = store.get("course", "slides.pptx_4_9").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn clearing_through_the_index_empties_the_table() {
    let dir = tempfile::tempdir().unwrap();
    let config = RagConfig::builder().embedding_dimensions(DIM).build().unwrap();
    let store = Arc::new(SqliteVectorStore::open(dir.path()).await.unwrap());
    let embedder = ResilientEmbedder::new(Arc::new(MockEmbeddingProvider::new(DIM)), &config);
    let index = VectorIndex::open(embedder, store, "course materials", &config).await.unwrap();

    let metadata = ChunkMetadata {
        filename: "notes.txt".to_string(),
        filepath: "data/notes.txt".to_string(),
        filetype: FileType::Txt,
        page_number: 0,
        chunk_id: 0,
    };
    let report = index.add_documents(&[Chunk::new("dynamic programming", metadata).unwrap()]).await;
    assert_eq!(report.total_in_store, Some(1));
    assert_eq!(index.search("dynamic programming", 3).await.len(), 1);

    index.clear().await.unwrap();
    assert_eq!(index.count().await.unwrap(), 0);
    assert!(index.search("dynamic programming", 3).await.is_empty());
}
