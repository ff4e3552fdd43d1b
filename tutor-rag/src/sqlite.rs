//! SQLite vector store backend.
//!
//! Provides [`SqliteVectorStore`] which implements [`VectorStore`] on a
//! single SQLite file using [sqlx](https://docs.rs/sqlx), so an index
//! survives process restarts.
//!
//! Each collection is a table with columns `id`, `content`, `metadata`
//! (JSON), `embedding` (little-endian `f32` blob) and `degraded`. Search is
//! an exhaustive cosine scan, which is adequate for a course-sized corpus.
//!
//! The store is opened once per process through a single-connection pool.
//! Concurrent writer processes on the same path are not coordinated.
//!
//! # Example
//!
//! ```rust,ignore
//! use tutor_rag::sqlite::SqliteVectorStore;
//!
//! let store = SqliteVectorStore::open("./vector_db").await?;
//! store.create_collection("course_materials", 1536).await?;
//! ```

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::debug;

use crate::document::{Chunk, ChunkMetadata, RetrievalResult};
use crate::embedding::cosine_similarity;
use crate::error::{RagError, Result};
use crate::vectorstore::{IndexedVector, VectorStore, rank_results};

/// File name of the database inside the configured store directory.
pub const DATABASE_FILE: &str = "index.sqlite3";

/// A [`VectorStore`] persisted in a SQLite database file.
pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    /// Open (creating if needed) the store under the directory `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let dir = path.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let options =
            SqliteConnectOptions::new().filename(dir.join(DATABASE_FILE)).create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(Self::map_err)?;

        debug!(path = %dir.display(), "opened sqlite vector store");
        Ok(Self { pool })
    }

    /// Create a store from an existing connection pool.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close the connection pool, flushing pending writes.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn map_err(e: sqlx::Error) -> RagError {
        RagError::VectorStore { backend: "sqlite".to_string(), message: e.to_string() }
    }

    /// Sanitize a collection name for use as a table name.
    /// Only allows alphanumeric characters and underscores.
    fn table_name(name: &str) -> Result<String> {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if sanitized.is_empty() {
            return Err(RagError::VectorStore {
                backend: "sqlite".to_string(),
                message: "collection name is empty after sanitization".to_string(),
            });
        }
        Ok(format!("tutor_{sanitized}"))
    }

    fn create_table_sql(table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (\
                id TEXT PRIMARY KEY, \
                content TEXT NOT NULL, \
                metadata TEXT NOT NULL, \
                embedding BLOB NOT NULL, \
                degraded INTEGER NOT NULL DEFAULT 0\
            )"
        )
    }

    fn decode_entry(row: &SqliteRow) -> Result<IndexedVector> {
        let content: String = row.try_get("content").map_err(Self::map_err)?;
        let metadata: String = row.try_get("metadata").map_err(Self::map_err)?;
        let embedding: Vec<u8> = row.try_get("embedding").map_err(Self::map_err)?;
        let degraded: i64 = row.try_get("degraded").map_err(Self::map_err)?;

        let metadata: ChunkMetadata = serde_json::from_str(&metadata)?;
        Ok(IndexedVector {
            chunk: Chunk { content, metadata },
            embedding: decode_embedding(&embedding),
            degraded: degraded != 0,
        })
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let table = Self::table_name(name)?;
        sqlx::query(&Self::create_table_sql(&table))
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;

        debug!(collection = name, table = %table, dimensions, "created sqlite table");
        Ok(())
    }

    async fn reset_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let table = Self::table_name(name)?;

        // Drop and recreate inside one transaction so no reader ever sees the
        // table missing.
        let mut tx = self.pool.begin().await.map_err(Self::map_err)?;
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&mut *tx)
            .await
            .map_err(Self::map_err)?;
        sqlx::query(&Self::create_table_sql(&table))
            .execute(&mut *tx)
            .await
            .map_err(Self::map_err)?;
        tx.commit().await.map_err(Self::map_err)?;

        debug!(collection = name, table = %table, dimensions, "reset sqlite table");
        Ok(())
    }

    async fn upsert(&self, collection: &str, entry: &IndexedVector) -> Result<()> {
        let table = Self::table_name(collection)?;
        let upsert_sql = format!(
            "INSERT INTO {table} (id, content, metadata, embedding, degraded) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT (id) DO UPDATE SET \
                content = excluded.content, \
                metadata = excluded.metadata, \
                embedding = excluded.embedding, \
                degraded = excluded.degraded"
        );
        let metadata = serde_json::to_string(&entry.chunk.metadata)?;

        sqlx::query(&upsert_sql)
            .bind(entry.id())
            .bind(&entry.chunk.content)
            .bind(metadata)
            .bind(encode_embedding(&entry.embedding))
            .bind(entry.degraded)
            .execute(&self.pool)
            .await
            .map_err(Self::map_err)?;

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        include_degraded: bool,
    ) -> Result<Vec<RetrievalResult>> {
        let table = Self::table_name(collection)?;
        let select_sql = if include_degraded {
            format!("SELECT content, metadata, embedding, degraded FROM {table}")
        } else {
            format!("SELECT content, metadata, embedding, degraded FROM {table} WHERE degraded = 0")
        };

        let rows = sqlx::query(&select_sql).fetch_all(&self.pool).await.map_err(Self::map_err)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let entry = Self::decode_entry(row)?;
            let score = cosine_similarity(&entry.embedding, embedding);
            scored.push(RetrievalResult {
                content: entry.chunk.content,
                metadata: entry.chunk.metadata,
                score,
                rank: 0,
            });
        }

        debug!(collection, scanned = scored.len(), top_k, "sqlite similarity scan");
        Ok(rank_results(scored, top_k))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<IndexedVector>> {
        let table = Self::table_name(collection)?;
        let row = sqlx::query(&format!(
            "SELECT content, metadata, embedding, degraded FROM {table} WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::map_err)?;

        row.as_ref().map(Self::decode_entry).transpose()
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let table = Self::table_name(collection)?;
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .map_err(Self::map_err)?;
        Ok(count as usize)
    }

    fn backend(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_blob_round_trips_exact_bits() {
        let original = vec![0.0, -1.5, f32::MIN_POSITIVE, 3.25e7];
        assert_eq!(decode_embedding(&encode_embedding(&original)), original);
    }

    #[test]
    fn table_names_are_sanitized() {
        assert_eq!(
            SqliteVectorStore::table_name("course-materials").unwrap(),
            "tutor_course_materials"
        );
        assert!(SqliteVectorStore::table_name("").is_err());
    }
}
