//! Embedding provider trait and the degrade-not-fail embedding client.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::RagConfig;
use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends behind a unified async
/// interface. Errors are returned as-is; [`ResilientEmbedder`] applies the
/// truncation and zero-vector fallback policy on top.
///
/// # Example
///
/// ```rust,ignore
/// use tutor_rag::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A short provider name for log records.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// The outcome of [`ResilientEmbedder::embed`].
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    /// `true` when the provider failed and `vector` is the all-zero fallback.
    pub degraded: bool,
}

/// Wraps an [`EmbeddingProvider`] with length-safety truncation and a
/// zero-vector fallback.
///
/// Inputs longer than `max_chars` characters are cut to that length before
/// submission; trailing content is lost. A provider error, or a response of
/// the wrong dimensionality, never reaches the caller: it is logged and an
/// all-zero vector of the configured dimensionality is returned instead, so
/// a single bad chunk cannot abort a long ingestion run.
#[derive(Clone)]
pub struct ResilientEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    max_chars: usize,
    dimensions: usize,
}

impl ResilientEmbedder {
    /// Wrap `provider`, taking the truncation threshold and dimensionality
    /// from `config`.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &RagConfig) -> Self {
        Self {
            provider,
            max_chars: config.max_embedding_chars,
            dimensions: config.embedding_dimensions,
        }
    }

    /// The dimensionality every returned vector has.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed `text`, degrading to a zero vector on failure.
    pub async fn embed(&self, text: &str) -> Embedding {
        let char_count = text.chars().count();
        let input = if char_count > self.max_chars {
            warn!(
                provider = self.provider.name(),
                chars = char_count,
                limit = self.max_chars,
                "text exceeds embedding limit, truncating"
            );
            text.chars().take(self.max_chars).collect::<String>()
        } else {
            text.to_string()
        };

        match self.provider.embed(&input).await {
            Ok(vector) if vector.len() == self.dimensions => {
                debug!(provider = self.provider.name(), dimensions = vector.len(), "embedded text");
                Embedding { vector, degraded: false }
            }
            Ok(vector) => {
                warn!(
                    provider = self.provider.name(),
                    expected = self.dimensions,
                    actual = vector.len(),
                    "embedding has unexpected dimensionality, using zero vector"
                );
                self.zero()
            }
            Err(e) => {
                let preview: String = input.chars().take(100).collect();
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    chars = input.chars().count(),
                    preview = %preview,
                    "embedding failed, using zero vector"
                );
                self.zero()
            }
        }
    }

    fn zero(&self) -> Embedding {
        Embedding { vector: vec![0.0; self.dimensions], degraded: true }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
