//! # tutor-rag
//!
//! Retrieval-augmented course tutor: answers student questions grounded in
//! ingested course material (PDF, PPTX, DOCX, TXT) and cites its sources.
//!
//! ## Overview
//!
//! The crate is organised as a pipeline of small components:
//!
//! - [`DocumentLoader`] - extracts one record per page, slide or file
//! - [`SentenceChunker`] - splits unpaged text at sentence boundaries
//! - [`ResilientEmbedder`] - wraps an [`EmbeddingProvider`] with truncation
//!   and a zero-vector fallback
//! - [`VectorIndex`] - embeds, persists and searches chunks through a
//!   [`VectorStore`] ([`InMemoryVectorStore`] or [`SqliteVectorStore`])
//! - [`CourseAssistant`] - retrieve, assemble, prompt and generate
//! - [`Evaluator`] - scores answers with an LLM judge
//!
//! Runtime provider failures degrade instead of propagating: a failed
//! embedding becomes a zero vector, a failed search returns no results and
//! a failed generation becomes an error message in the answer.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tutor_rag::{
//!     Chunker, CourseAssistant, DocumentLoader, InMemoryVectorStore, RagConfig,
//!     ResilientEmbedder, SentenceChunker, VectorIndex,
//!     openai::{OpenAIChatModel, OpenAIEmbeddingProvider, ProviderConfig},
//! };
//!
//! let config = RagConfig::default();
//! let provider = ProviderConfig::from_env()?;
//! let embedder =
//!     ResilientEmbedder::new(Arc::new(OpenAIEmbeddingProvider::new(&provider)?), &config);
//! let index = Arc::new(
//!     VectorIndex::open(embedder, Arc::new(InMemoryVectorStore::new()), "course", &config)
//!         .await?,
//! );
//!
//! let records = DocumentLoader::new("./data").load_all();
//! let chunks = SentenceChunker::from_config(&config).split_documents(&records);
//! index.add_documents(&chunks).await;
//!
//! let assistant = CourseAssistant::builder()
//!     .config(config)
//!     .index(index)
//!     .model(Arc::new(OpenAIChatModel::new(&provider)?))
//!     .build()?;
//! let answer = assistant.answer_question("What is a B-tree?", None).await;
//! ```
//!
//! ## Features
//!
//! - `openai` - OpenAI-compatible embedding and chat clients
//! - `sqlite` - persistent SQLite vector store
//! - `loaders` - PDF, PPTX, DOCX and TXT extraction
//! - `full` - all of the above (default)

pub mod assistant;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod history;
pub mod index;
pub mod inmemory;
#[cfg(feature = "loaders")]
pub mod loader;
pub mod mock;
pub mod model;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod vectorstore;

pub use assistant::{Answer, ChatSession, CourseAssistant, CourseAssistantBuilder};
pub use chunking::{Chunker, SentenceChunker, split_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, ChunkMetadata, DocumentRecord, FileType, RetrievalResult};
pub use embedding::{Embedding, EmbeddingProvider, ResilientEmbedder, cosine_similarity};
pub use error::{RagError, Result};
pub use eval::{EvaluationRecord, EvaluationReport, Evaluator};
pub use history::ConversationHistory;
pub use index::{IngestReport, VectorIndex};
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "loaders")]
pub use loader::{DocumentLoader, load_document};
pub use mock::{MockChatModel, MockEmbeddingProvider};
pub use model::{ChatMessage, ChatModel, ChatRequest, Role};
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbeddingProvider, ProviderConfig};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteVectorStore;
pub use vectorstore::{IndexedVector, VectorStore};
