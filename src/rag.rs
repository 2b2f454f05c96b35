//! Question answering over the indexed papers.
//!
//! [`PaperChat::answer`] runs one retrieval-augmented turn: embed the
//! question, query the index, pack the hits into a budgeted context, and
//! ask the chat model. Calls are stateless; turn history is supplied by
//! the caller. Failures from any external call propagate unchanged.

use anyhow::Result;
use std::sync::Arc;

use crate::chat::{create_chat, ChatProvider};
use crate::config::Config;
use crate::context::build_context;
use crate::embedding::{create_embedder, embed_query, EmbeddingProvider};
use crate::models::{ChatMessage, Role};
use crate::store::{SqliteIndex, VectorIndex};

pub const SYSTEM_PROMPT: &str = "You are a helpful research assistant for a collection of papers. \
Use the provided context to answer the question. \
If the context does not contain the answer, say you do not know.";

/// Model answer plus the source listing it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: String,
    pub sources: String,
}

/// Retrieval and generation settings, read once from [`Config`].
#[derive(Debug, Clone)]
pub struct AnswerSettings {
    pub top_k: usize,
    pub max_context_chars: usize,
    pub temperature: f32,
}

impl AnswerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            max_context_chars: config.retrieval.max_context_chars,
            temperature: config.chat.temperature,
        }
    }
}

/// Retrieval-augmented chat over one index collection.
pub struct PaperChat {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatProvider>,
    settings: AnswerSettings,
}

impl PaperChat {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        chat: Arc<dyn ChatProvider>,
        settings: AnswerSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            chat,
            settings,
        }
    }

    /// Wire up the configured providers and the SQLite index.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let chat = create_chat(&config.chat)?;
        let index = SqliteIndex::open(&config.paths.index_dir(), &config.index.collection).await?;
        Ok(Self::new(
            embedder,
            Arc::new(index),
            chat,
            AnswerSettings::from_config(config),
        ))
    }

    /// Answer `question` given earlier `(user, assistant)` turns.
    ///
    /// `top_k` of `None` or `Some(0)` uses the configured default.
    pub async fn answer(
        &self,
        question: &str,
        history: &[(String, String)],
        top_k: Option<usize>,
    ) -> Result<Answer> {
        let k = top_k
            .filter(|k| *k > 0)
            .unwrap_or(self.settings.top_k);

        tracing::debug!(
            embedder = self.embedder.model_name(),
            chat = self.chat.model_name(),
            k,
            "answering question"
        );
        let query_vec = embed_query(self.embedder.as_ref(), question).await?;
        let result = self.index.query(&query_vec, k).await?;
        tracing::debug!(hits = result.len(), k, "retrieved chunks");

        let bundle = build_context(&result, self.settings.max_context_chars);
        let messages = build_messages(&bundle.context, question, history);

        let response = self
            .chat
            .complete(&messages, self.settings.temperature)
            .await?;

        Ok(Answer {
            answer: response.trim().to_string(),
            sources: bundle.sources,
        })
    }
}

/// Compose the chat request: system prompt, history, then the question
/// with its retrieved context.
pub fn build_messages(
    context: &str,
    question: &str,
    history: &[(String, String)],
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::new(Role::System, SYSTEM_PROMPT)];
    for (user, assistant) in history {
        if !user.is_empty() {
            messages.push(ChatMessage::new(Role::User, user.clone()));
        }
        if !assistant.is_empty() {
            messages.push(ChatMessage::new(Role::Assistant, assistant.clone()));
        }
    }
    messages.push(ChatMessage::new(
        Role::User,
        format!("Context:\n{}\n\nQuestion: {}", context, question),
    ));
    messages
}
