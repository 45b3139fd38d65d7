// Indexer module
// Walks files, extracts and chunks their text, then embeds and stores every chunk


use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::{DirEntry, WalkDir};

use crate::config::Config;
use crate::database::{IndexStore, LanceStore, Metadata, SOURCE_KEY};
use crate::embeddings::{ChunkingConfig, Embedder, build_embedder, chunk_text};
use crate::extract::extract_text;
use crate::{KbError, Result};

/// Ingestion pipeline from files to the index store
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn IndexStore>,
    chunking: ChunkingConfig,
}

/// Outcome of one ingestion call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Files found under the input path
    pub files_seen: usize,
    /// Unsupported files and files without extractable text
    pub files_skipped: usize,
    /// Files that contributed at least one chunk
    pub files_indexed: usize,
    /// Chunks embedded and written to the store
    pub chunks_stored: usize,
}

impl Indexer {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn IndexStore>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            chunking,
        }
    }

    /// Build the embedder and open the persistent store described by `config`
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = build_embedder(config)?;
        let store = LanceStore::from_config(config).await?;

        if embedder.dimension() != store.dimension() {
            return Err(KbError::DimensionMismatch {
                expected: store.dimension(),
                found: embedder.dimension(),
            });
        }

        Ok(Self::new(embedder, Arc::new(store), config.chunking.clone()))
    }

    #[inline]
    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    #[inline]
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Ingest a file or directory and return the number of chunks stored
    #[inline]
    pub async fn add_path(&self, path: &Path) -> Result<usize> {
        Ok(self.ingest(path).await?.chunks_stored)
    }

    /// Ingest a file or every file below a directory.
    ///
    /// All chunks from the call go to the embedder in one request and to the
    /// store in one `add`. A path that does not exist ingests nothing.
    #[inline]
    pub async fn ingest(&self, path: &Path) -> Result<IngestStats> {
        let files = collect_files(path);
        let mut stats = IngestStats {
            files_seen: files.len(),
            ..IngestStats::default()
        };

        if files.is_empty() {
            debug!("No files found at {}", path.display());
            return Ok(stats);
        }

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(files.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Reading {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut texts = Vec::new();
        let mut metadatas = Vec::new();

        for file in &files {
            bar.set_message(file.display().to_string());

            let Some(text) = extract_text(file).await else {
                stats.files_skipped += 1;
                bar.inc(1);
                continue;
            };

            if text.trim().is_empty() {
                debug!("No text extracted from {}", file.display());
                stats.files_skipped += 1;
                bar.inc(1);
                continue;
            }

            let chunks = chunk_text(&text, &self.chunking)?;
            let source = file.to_string_lossy().into_owned();
            debug!("{} produced {} chunks", source, chunks.len());

            for chunk in chunks {
                texts.push(chunk.content);
                metadatas.push(Metadata::from([(SOURCE_KEY.to_string(), source.clone())]));
            }
            stats.files_indexed += 1;
            bar.inc(1);
        }

        if texts.is_empty() {
            bar.finish_and_clear();
            info!(
                "Nothing to index under {} ({} files skipped)",
                path.display(),
                stats.files_skipped
            );
            return Ok(stats);
        }

        bar.set_message(format!("embedding {} chunks", texts.len()));
        let (texts, vectors) = self.embed(texts).await?;

        if vectors.len() != texts.len() {
            bar.finish_and_clear();
            return Err(KbError::Embedding(format!(
                "Embedder returned {} vectors for {} chunks",
                vectors.len(),
                texts.len()
            )));
        }

        let ids: Vec<String> = texts.iter().map(|_| Uuid::new_v4().to_string()).collect();
        let stored = texts.len();

        let result = self.store.add(vectors, texts, metadatas, ids).await;
        bar.finish_and_clear();
        result?;

        stats.chunks_stored = stored;
        info!(
            "Indexed {} chunks from {} of {} files under {}",
            stats.chunks_stored,
            stats.files_indexed,
            stats.files_seen,
            path.display()
        );
        Ok(stats)
    }

    /// Run the embedder off the async runtime, handing the texts back
    async fn embed(&self, texts: Vec<String>) -> Result<(Vec<String>, Vec<Vec<f32>>)> {
        let embedder = Arc::clone(&self.embedder);
        let (texts, vectors) = tokio::task::spawn_blocking(move || {
            let vectors = embedder.embed_documents(&texts);
            (texts, vectors)
        })
        .await
        .map_err(|e| KbError::Embedding(format!("Embedding task failed: {}", e)))?;

        Ok((texts, vectors?))
    }
}

/// Files to ingest for `path`, in lexicographic order.
///
/// Hidden entries are skipped and symlinks are not followed.
#[inline]
pub fn collect_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }
    if !path.is_dir() {
        return Vec::new();
    }

    WalkDir::new(path)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", path.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
