// Retrieval module
// Embeds a question, fetches the nearest chunks and streams a cited extractive answer


use serde::{Deserialize, Serialize};
use std::iter::FusedIterator;
use std::path::Path;
use std::sync::Arc;
use std::vec::IntoIter;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::{IndexStore, LanceStore, SimilarityHit};
use crate::embeddings::{Embedder, build_embedder};
use crate::{KbError, Result};

/// Characters of matched text carried in a citation
pub const SNIPPET_CHARS: usize = 240;
/// Characters per answer token
pub const SLICE_CHARS: usize = 180;
/// Hits quoted in the answer body
pub const ANSWER_HITS: usize = 2;
/// Sole token emitted when nothing matched
pub const NO_RESULTS_MESSAGE: &str = "I couldn't find anything relevant in the knowledge base.";
/// First token of every non-empty answer
pub const ANSWER_PREAMBLE: &str = "Answer (from your documents): ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nearest chunks fetched per question
    pub top_k: usize,
    /// Label used when a hit carries no source path
    pub fallback_source: String,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 5,
            fallback_source: "knowledgebase".to_string(),
        }
    }
}

/// Citation for one retrieved chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePayload {
    pub source: String,
    pub snippet: String,
}

/// One unit of a streamed answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnswerEvent {
    Source { payload: SourcePayload },
    Token { text: String },
}

/// A prior conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// A fully drained answer stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedAnswer {
    pub text: String,
    pub sources: Vec<SourcePayload>,
}

pub struct AnswerEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn IndexStore>,
    config: RetrievalConfig,
}

impl AnswerEngine {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn IndexStore>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Build the embedder and open the persistent store described by `config`
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = build_embedder(config)?;
        let store = LanceStore::from_config(config).await?;
        Ok(Self::new(embedder, Arc::new(store), config.retrieval.clone()))
    }

    /// Retrieve the nearest chunks for `query` and return the answer stream.
    ///
    /// Only retrieval happens here; the stream builds its events as they are
    /// pulled. `history` is accepted but does not influence the answer yet.
    /// Errors come only from the embedder or the store.
    #[inline]
    pub async fn answer(&self, query: &str, history: &[ChatMessage]) -> Result<AnswerStream> {
        debug!(
            "Answering query ({} chars, {} history turns)",
            query.chars().count(),
            history.len()
        );

        let embedder = Arc::clone(&self.embedder);
        let query_text = query.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed_query(&query_text))
            .await
            .map_err(|e| KbError::Embedding(format!("Embedding task failed: {}", e)))??;

        let hits = self.store.query(&vector, self.config.top_k).await?;
        info!("Retrieved {} hits", hits.len());

        Ok(AnswerStream::new(hits, self.config.fallback_source.clone()))
    }

    /// Answer `query` and drain the stream into a single object
    #[inline]
    pub async fn answer_collected(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<CollectedAnswer> {
        Ok(self.answer(query, history).await?.collect_answer())
    }
}

enum StreamState {
    Sources { next: usize },
    Body,
    Slices(IntoIter<String>),
    Done,
}

/// Pull-driven sequence of answer events.
///
/// Emits one citation per hit, then either the no-results message or the
/// preamble followed by the quoted body in fixed-size slices. A stream is
/// consumed once; ask again for a fresh one.
pub struct AnswerStream {
    hits: Vec<SimilarityHit>,
    fallback_source: String,
    state: StreamState,
}

impl AnswerStream {
    #[inline]
    pub fn new(hits: Vec<SimilarityHit>, fallback_source: String) -> Self {
        Self {
            hits,
            fallback_source,
            state: StreamState::Sources { next: 0 },
        }
    }

    /// Hits the stream was built from, best first
    #[inline]
    pub fn hits(&self) -> &[SimilarityHit] {
        &self.hits
    }

    /// Drain the remaining events into a [`CollectedAnswer`]
    #[inline]
    pub fn collect_answer(self) -> CollectedAnswer {
        let mut text = String::new();
        let mut sources = Vec::new();

        for event in self {
            match event {
                AnswerEvent::Source { payload } => sources.push(payload),
                AnswerEvent::Token { text: token } => text.push_str(&token),
            }
        }

        let trimmed = text.trim();
        let text = if trimmed.is_empty() {
            NO_RESULTS_MESSAGE.to_string()
        } else {
            trimmed.to_string()
        };

        CollectedAnswer { text, sources }
    }

    fn source_label<'a>(&'a self, hit: &'a SimilarityHit) -> &'a str {
        hit.source()
            .filter(|source| !source.is_empty())
            .unwrap_or(self.fallback_source.as_str())
    }

    fn citation(&self, hit: &SimilarityHit) -> AnswerEvent {
        AnswerEvent::Source {
            payload: SourcePayload {
                source: self.source_label(hit).to_string(),
                snippet: hit.text.chars().take(SNIPPET_CHARS).collect(),
            },
        }
    }

    fn body(&self) -> String {
        self.hits
            .iter()
            .take(ANSWER_HITS)
            .map(|hit| {
                let label = self.source_label(hit);
                let basename = Path::new(label).file_name().map_or_else(
                    || self.fallback_source.clone(),
                    |name| name.to_string_lossy().into_owned(),
                );
                format!("• {}\n(source: {})", hit.text.trim(), basename)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Split `text` into consecutive pieces of `size` characters
fn char_slices(text: &str, size: usize) -> Vec<String> {
    text.chars()
        .collect::<Vec<_>>()
        .chunks(size.max(1))
        .map(|chars| chars.iter().collect())
        .collect()
}

impl Iterator for AnswerStream {
    type Item = AnswerEvent;

    #[inline]
    fn next(&mut self) -> Option<AnswerEvent> {
        loop {
            match &mut self.state {
                StreamState::Sources { next } => {
                    if let Some(hit) = self.hits.get(*next) {
                        *next += 1;
                        return Some(self.citation(hit));
                    }

                    if self.hits.is_empty() {
                        self.state = StreamState::Done;
                        return Some(AnswerEvent::Token {
                            text: NO_RESULTS_MESSAGE.to_string(),
                        });
                    }

                    self.state = StreamState::Body;
                }
                StreamState::Body => {
                    let slices = char_slices(&self.body(), SLICE_CHARS);
                    self.state = StreamState::Slices(slices.into_iter());
                    return Some(AnswerEvent::Token {
                        text: ANSWER_PREAMBLE.to_string(),
                    });
                }
                StreamState::Slices(slices) => {
                    if let Some(text) = slices.next() {
                        return Some(AnswerEvent::Token { text });
                    }
                    self.state = StreamState::Done;
                }
                StreamState::Done => return None,
            }
        }
    }
}

impl FusedIterator for AnswerStream {}
