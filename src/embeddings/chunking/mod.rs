
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::{KbError, Result};

/// A chunk of document text ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChunk {
    /// The chunk text, trimmed and never empty
    pub content: String,
    /// Position of this chunk within its document
    pub chunk_index: usize,
    /// Length of `content` in characters
    pub char_count: usize,
}

/// Configuration for recursive character chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next
    pub chunk_overlap: usize,
    /// Separators in priority order; an empty string means a hard character cut
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
            separators: ["\n\n", "\n", ". ", " ", ""]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Self::default()
        }
    }
}

/// Split `text` into overlapping chunks of at most `chunk_size` characters.
///
/// Larger boundaries (paragraphs, lines, sentences, words) are preferred;
/// pieces that still do not fit are split again with the next separator.
/// Whitespace-only input produces no chunks.
#[inline]
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<ContentChunk>> {
    if config.chunk_size == 0 {
        return Err(KbError::Config(
            "chunk_size must be at least 1".to_string(),
        ));
    }
    if config.chunk_overlap >= config.chunk_size {
        return Err(KbError::Config(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    // the hard cut always ends the list so no piece can outgrow chunk_size
    let mut separators: Vec<&str> = config.separators.iter().map(String::as_str).collect();
    if separators.last() != Some(&"") {
        separators.push("");
    }

    let splitter = Splitter {
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
    };
    let chunks: Vec<ContentChunk> = splitter
        .split(text, &separators)
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| ContentChunk {
            char_count: char_len(&content),
            content,
            chunk_index,
        })
        .collect();

    debug!(
        "Chunked {} characters into {} chunks (avg {} chars)",
        char_len(text),
        chunks.len(),
        chunks.iter().map(|c| c.char_count).sum::<usize>() / chunks.len().max(1)
    );

    Ok(chunks)
}

struct Splitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Splitter {
    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, finer) = pick_separator(text, separators);

        let mut output = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                output.extend(self.merge(&fitting));
                fitting.clear();
            }

            if finer.is_empty() {
                push_trimmed(&mut output, piece);
            } else {
                output.extend(self.split(piece, finer));
            }
        }

        if !fitting.is_empty() {
            output.extend(self.merge(&fitting));
        }

        output
    }

    /// Greedily pack pieces into chunks, carrying a tail of up to
    /// `chunk_overlap` characters into each following chunk
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        "Created a chunk of {} characters, longer than the configured {}",
                        total, self.chunk_size
                    );
                }

                if !window.is_empty() {
                    push_trimmed(&mut chunks, &window.iter().copied().collect::<String>());

                    while total > self.chunk_overlap
                        || (total > 0 && total + len > self.chunk_size)
                    {
                        let Some(dropped) = window.pop_front() else {
                            break;
                        };
                        total -= char_len(dropped);
                    }
                }
            }

            window.push_back(piece);
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(&mut chunks, &window.iter().copied().collect::<String>());
        }

        chunks
    }
}

/// First separator present in `text` (or the hard cut), plus the finer ones after it
fn pick_separator<'s, 'a>(text: &str, separators: &'s [&'a str]) -> (&'a str, &'s [&'a str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }

    (separators.last().copied().unwrap_or(""), &[])
}

/// Split on `separator`, keeping it attached to the end of the preceding piece
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        // one piece per character
        return text.split_inclusive(|_: char| true).collect();
    }

    text.split_inclusive(separator)
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[inline]
fn char_len(text: &str) -> usize {
    text.chars().count()
}
