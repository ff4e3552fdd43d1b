//! Configuration for chunking, retrieval and answer generation.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters shared by the chunker, the index and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of top results to retrieve per question.
    pub top_k: usize,
    /// Texts longer than this many characters are truncated before embedding.
    ///
    /// Derived from the embedding service's 2048-token ceiling with a
    /// conservative estimate of one token per one to three CJK characters.
    pub max_embedding_chars: usize,
    /// Dimensionality of the embedding model; the zero-vector fallback uses it.
    pub embedding_dimensions: usize,
    /// Number of conversation messages (user and assistant) kept as history.
    pub history_turns: usize,
    /// Sampling temperature for answer generation.
    pub temperature: f32,
    /// Upper bound on generated answer length, in tokens.
    pub max_output_tokens: u32,
    /// Skip entries stored with a zero-vector fallback embedding at query time.
    pub exclude_degraded: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 3,
            max_embedding_chars: 2000,
            embedding_dimensions: 1536,
            history_turns: 10,
            temperature: 0.7,
            max_output_tokens: 1500,
            exclude_degraded: true,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are mutually consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `max_embedding_chars == 0` or `embedding_dimensions == 0`
    /// - `history_turns` is odd (history holds whole exchanges)
    /// - `temperature` lies outside `[0, 2]`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.max_embedding_chars == 0 {
            return Err(RagError::Config(
                "max_embedding_chars must be greater than zero".to_string(),
            ));
        }
        if self.embedding_dimensions == 0 {
            return Err(RagError::Config(
                "embedding_dimensions must be greater than zero".to_string(),
            ));
        }
        if self.history_turns % 2 != 0 {
            return Err(RagError::Config(format!(
                "history_turns ({}) must be even",
                self.history_turns
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RagError::Config(format!(
                "temperature ({}) must be within [0, 2]",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of results retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the embedding truncation threshold in characters.
    pub fn max_embedding_chars(mut self, chars: usize) -> Self {
        self.config.max_embedding_chars = chars;
        self
    }

    /// Set the embedding dimensionality.
    pub fn embedding_dimensions(mut self, dims: usize) -> Self {
        self.config.embedding_dimensions = dims;
        self
    }

    /// Set how many history messages are replayed to the model.
    pub fn history_turns(mut self, turns: usize) -> Self {
        self.config.history_turns = turns;
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the generated answer length limit.
    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.config.max_output_tokens = tokens;
        self
    }

    /// Choose whether degraded (zero-vector) entries are excluded from search.
    pub fn exclude_degraded(mut self, exclude: bool) -> Self {
        self.config.exclude_degraded = exclude;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
