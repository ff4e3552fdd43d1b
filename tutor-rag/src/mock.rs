//! Deterministic, network-free providers for tests, demos and offline runs.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::model::{ChatModel, ChatRequest, Role};

/// Bag-of-words embeddings: every lowercased alphanumeric token is hashed
/// into one of `dimensions` buckets and the counts are L2-normalised.
///
/// Texts sharing vocabulary score a high cosine similarity, which is enough
/// to exercise retrieval ranking without a real model.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    failing: bool,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, failing: false }
    }

    /// A provider whose every call fails.
    pub fn failing(dimensions: usize) -> Self {
        Self { dimensions, failing: true }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.failing {
            return Err(RagError::Embedding {
                provider: "mock".to_string(),
                message: "simulated outage".to_string(),
            });
        }

        let mut emb = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return Ok(emb);
        }
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            emb[(fnv1a(token) % self.dimensions as u64) as usize] += 1.0;
        }

        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// 64-bit FNV-1a, stable across platforms and compiler versions.
fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[derive(Debug, Clone)]
enum Behavior {
    Reply(String),
    Echo,
    Fail(String),
}

/// A scripted chat model that records every request it receives.
#[derive(Debug)]
pub struct MockChatModel {
    behavior: Behavior,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatModel {
    /// Always answer with `reply`.
    pub fn new(reply: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Reply(reply.into()))
    }

    /// Answer with the content of the last user message.
    pub fn echo() -> Self {
        Self::with_behavior(Behavior::Echo)
    }

    /// Fail every request with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fail(message.into()))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self { behavior, requests: Mutex::new(Vec::new()) }
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let reply = match &self.behavior {
            Behavior::Reply(reply) => Ok(reply.clone()),
            Behavior::Echo => Ok(request
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default()),
            Behavior::Fail(message) => {
                Err(RagError::Model { provider: "mock".to_string(), message: message.clone() })
            }
        };
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(request);
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let provider = MockEmbeddingProvider::new(64);
        let query = provider.embed("binary search tree").await.unwrap();
        let close = provider.embed("A binary search tree keeps keys ordered").await.unwrap();
        let far = provider.embed("photosynthesis in plant cells").await.unwrap();
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }
}
