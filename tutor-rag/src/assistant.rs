//! Retrieval-grounded question answering.
//!
//! The [`CourseAssistant`] runs one question through
//! retrieve → assemble → prompt → generate and always returns an
//! [`Answer`]: an empty retrieval becomes an explicit
//! [`NO_MATERIAL_FOUND`] context and a provider failure becomes an error
//! message in the answer text. [`ChatSession`] adds the bounded
//! conversation history of an interactive session.
//!
//! # Example
//!
//! ```rust,ignore
//! use tutor_rag::{ChatSession, CourseAssistant, RagConfig};
//!
//! let assistant = Arc::new(
//!     CourseAssistant::builder()
//!         .config(RagConfig::default())
//!         .index(Arc::new(index))
//!         .model(Arc::new(chat_model))
//!         .build()?,
//! );
//!
//! let mut session = ChatSession::new(assistant);
//! let answer = session.ask("What is a binary search tree?").await;
//! println!("{}", answer.answer);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::RagConfig;
use crate::document::RetrievalResult;
use crate::error::{RagError, Result};
use crate::history::ConversationHistory;
use crate::index::VectorIndex;
use crate::model::{ChatMessage, ChatModel, ChatRequest};

/// Context sent to the model when retrieval finds nothing.
pub const NO_MATERIAL_FOUND: &str = "(No relevant course material was found.)";

/// Role instruction for every answer.
pub const SYSTEM_PROMPT: &str = "\
You are a professional, patient and rigorous teaching assistant for this course. \
Your job is to help students understand the course content and answer their questions.

Follow these principles:
1. Ground every answer in the course material provided. Never invent information.
2. Cite your sources precisely, giving the file name and page or slide number.
3. Use precise academic language while staying friendly and encouraging.
4. Structure answers to complex questions as points or lists.
5. If the course material does not cover the question, say honestly that you do not know \
and suggest other references or asking the instructor.
6. Where useful, close with a guiding question that deepens the student's thinking.

Make sure your answers are accurate, helpful, and strictly based on the course material provided.";

/// The result of answering one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Generated answer, or a user-visible error message if generation failed.
    pub answer: String,
    /// The context block given to the model.
    pub context: String,
    /// The retrieved chunks, best first.
    pub retrieved_docs: Vec<RetrievalResult>,
}

impl Answer {
    /// Whether retrieval produced any course material.
    pub fn found_material(&self) -> bool {
        !self.retrieved_docs.is_empty()
    }

    /// Citation labels of the retrieved chunks, deduplicated by first
    /// appearance.
    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        for doc in &self.retrieved_docs {
            let label = doc.metadata.source_label();
            if !sources.contains(&label) {
                sources.push(label);
            }
        }
        sources
    }
}

/// Format retrieved chunks into the numbered context block.
///
/// Returns [`NO_MATERIAL_FOUND`] for an empty slice.
pub fn format_context(results: &[RetrievalResult]) -> String {
    if results.is_empty() {
        return NO_MATERIAL_FOUND.to_string();
    }

    let mut parts = vec!["Relevant course material:\n".to_string()];
    for (i, result) in results.iter().enumerate() {
        parts.push(format!(
            "\n[{}] Source: {}\n{}\n",
            i + 1,
            result.metadata.source_label(),
            result.content
        ));
    }
    parts.join("\n")
}

/// Build the user turn embedding the context block and the literal question.
pub fn user_prompt(context: &str, question: &str) -> String {
    format!(
        "Answer the student's question using the course material below.\n\
         \n\
         {context}\n\
         \n\
         Student question: {question}\n\
         \n\
         Make sure to:\n\
         1. Base the answer strictly on the course material above\n\
         2. Cite the source explicitly (e.g. \"According to lecture03.pdf (page 3) ...\")\n\
         3. If the course material does not contain the answer, say so honestly instead of guessing\n\
         4. Keep the answer professional and instructive\n\
         \n\
         Answer:"
    )
}

/// Answers questions from the vector index through a chat model.
///
/// Construct one via [`CourseAssistant::builder()`].
pub struct CourseAssistant {
    config: RagConfig,
    index: Arc<VectorIndex>,
    model: Arc<dyn ChatModel>,
}

impl CourseAssistant {
    /// Create a new [`CourseAssistantBuilder`].
    pub fn builder() -> CourseAssistantBuilder {
        CourseAssistantBuilder::default()
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector index.
    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Retrieve the `top_k` best chunks and format them as a context block.
    pub async fn retrieve_context(
        &self,
        question: &str,
        top_k: usize,
    ) -> (String, Vec<RetrievalResult>) {
        let results = self.index.search(question, top_k).await;
        (format_context(&results), results)
    }

    /// Assemble the full message list: system instruction, the most recent
    /// history messages, then the grounded user turn.
    pub fn build_messages(
        &self,
        question: &str,
        context: &str,
        history: Option<&ConversationHistory>,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        if let Some(history) = history {
            let skip = history.len().saturating_sub(self.config.history_turns);
            messages.extend(history.messages().skip(skip).cloned());
        }
        messages.push(ChatMessage::user(user_prompt(context, question)));
        messages
    }

    /// Ask the model for an answer; a failure becomes an error message.
    pub async fn generate_response(
        &self,
        question: &str,
        context: &str,
        history: Option<&ConversationHistory>,
    ) -> String {
        let request = ChatRequest::new(
            self.build_messages(question, context, history),
            self.config.temperature,
        )
        .with_max_output_tokens(self.config.max_output_tokens);

        match self.model.complete(request).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(model = self.model.name(), error = %e, "answer generation failed");
                format!("Error while generating the answer: {e}")
            }
        }
    }

    /// Answer a question using the configured `top_k`.
    pub async fn answer_question(
        &self,
        question: &str,
        history: Option<&ConversationHistory>,
    ) -> Answer {
        self.answer_with_top_k(question, history, self.config.top_k).await
    }

    /// Answer a question retrieving `top_k` chunks.
    pub async fn answer_with_top_k(
        &self,
        question: &str,
        history: Option<&ConversationHistory>,
        top_k: usize,
    ) -> Answer {
        let (context, retrieved_docs) = self.retrieve_context(question, top_k).await;
        let answer = self.generate_response(question, &context, history).await;

        info!(retrieved = retrieved_docs.len(), answer_chars = answer.chars().count(), "answered");
        Answer { answer, context, retrieved_docs }
    }
}

/// Builder for constructing a [`CourseAssistant`].
///
/// All fields are required.
#[derive(Default)]
pub struct CourseAssistantBuilder {
    config: Option<RagConfig>,
    index: Option<Arc<VectorIndex>>,
    model: Option<Arc<dyn ChatModel>>,
}

impl CourseAssistantBuilder {
    /// Set the configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the vector index to retrieve from.
    pub fn index(mut self, index: Arc<VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the chat model used for generation.
    pub fn model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Build the [`CourseAssistant`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a field is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<CourseAssistant> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        config.validate()?;
        let index = self.index.ok_or_else(|| RagError::Config("index is required".to_string()))?;
        let model = self.model.ok_or_else(|| RagError::Config("model is required".to_string()))?;

        Ok(CourseAssistant { config, index, model })
    }
}

/// An interactive session: a [`CourseAssistant`] plus bounded history.
pub struct ChatSession {
    assistant: Arc<CourseAssistant>,
    history: ConversationHistory,
}

impl ChatSession {
    pub fn new(assistant: Arc<CourseAssistant>) -> Self {
        let capacity = assistant.config().history_turns;
        Self { assistant, history: ConversationHistory::new(capacity) }
    }

    /// Answer a question in the context of the session, then record the
    /// exchange.
    pub async fn ask(&mut self, question: &str) -> Answer {
        let answer = self.assistant.answer_question(question, Some(&self.history)).await;
        self.history.push_exchange(question, answer.answer.clone());
        answer
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Forget the conversation so far.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}
