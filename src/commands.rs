use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{Config, EmbeddingProvider};
use crate::database::{IndexStore, LanceStore};
use crate::embeddings::OllamaClient;
use crate::indexer::Indexer;
use crate::retrieval::{AnswerEngine, AnswerEvent};
use crate::uploads::upload_files;

/// Ingest a file or directory into the knowledge base
#[inline]
pub async fn ingest_path(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("Path does not exist: {}", path.display());
    }

    let config = Config::load()?;
    let indexer = Indexer::from_config(&config)
        .await
        .context("Failed to initialize indexer")?;

    let stats = indexer.ingest(path).await?;
    info!("Ingestion finished: {:?}", stats);

    println!("Added {} chunks from {}", stats.chunks_stored, path.display());
    if stats.files_skipped > 0 {
        println!(
            "  Skipped {} of {} files (unsupported or empty)",
            stats.files_skipped, stats.files_seen
        );
    }

    Ok(())
}

/// Copy files into the uploads directory and ingest them
#[inline]
pub async fn upload(files: &[PathBuf]) -> Result<()> {
    for file in files {
        if !file.is_file() {
            bail!("Not a file: {}", file.display());
        }
    }

    let config = Config::load()?;
    let indexer = Indexer::from_config(&config)
        .await
        .context("Failed to initialize indexer")?;

    let report = upload_files(&indexer, files, &config.uploads_path()).await?;

    for name in &report.saved {
        println!("Saved {}", name);
    }
    println!(
        "Added {} chunks from {} files",
        report.chunks_added,
        report.saved.len()
    );

    Ok(())
}

/// Answer a question from the indexed documents
///
/// Prints citations and answer text as they are produced, one JSON event per
/// line with `json`, or the drained answer object with `collect`.
#[inline]
pub async fn ask(query: &str, top_k: Option<usize>, json: bool, collect: bool) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(top_k) = top_k {
        config.retrieval.top_k = top_k;
        config.validate()?;
    }

    let engine = AnswerEngine::from_config(&config)
        .await
        .context("Failed to initialize answer engine")?;

    if collect {
        let answer = engine.answer_collected(query, &[]).await?;
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    let stream = engine.answer(query, &[]).await?;
    let mut stdout = std::io::stdout().lock();
    let mut answering = false;

    for event in stream {
        if json {
            writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
            continue;
        }

        match event {
            AnswerEvent::Source { payload } => {
                writeln!(
                    stdout,
                    "📄 {}: {}",
                    payload.source,
                    payload.snippet.replace('\n', " ")
                )?;
            }
            AnswerEvent::Token { text } => {
                if !answering {
                    writeln!(stdout)?;
                    answering = true;
                }
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
        }
    }

    if !json {
        writeln!(stdout)?;
    }

    Ok(())
}

/// Show configuration paths, embedding provider health and index size
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("📊 Support-KB Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("📁 Paths:");
    println!("   ⚙️  Config: {}", config.config_file_path().display());
    println!("   🗄️  Vectors: {}", config.vector_database_path().display());
    println!("   📥 Uploads: {}", config.uploads_path().display());
    println!();

    println!("🤖 Embedding Status:");
    match config.embedding.provider {
        EmbeddingProvider::Ollama => match OllamaClient::new(&config) {
            Ok(client) => match client.health_check() {
                Ok(()) => {
                    println!(
                        "   ✅ Ollama: Connected ({}:{})",
                        config.ollama.host, config.ollama.port
                    );
                    println!("   📋 Model: {}", config.ollama.model);
                    println!("   🔢 Batch Size: {}", config.ollama.batch_size);
                }
                Err(e) => {
                    println!("   ⚠️  Ollama: Connected but unhealthy - {:#}", e);
                }
            },
            Err(e) => {
                println!("   ❌ Ollama: Failed to connect - {:#}", e);
            }
        },
        EmbeddingProvider::Hash => {
            println!("   ✅ Hash embedder: offline, no model required");
        }
    }
    println!("   📐 Dimension: {}", config.embedding.dimension);
    println!();

    println!("🔍 Vector Database Status:");
    match LanceStore::from_config(&config).await {
        Ok(store) => {
            println!("   ✅ LanceDB: Connected");
            match store.count().await {
                Ok(count) => println!("   📊 Stored chunks: {}", count),
                Err(e) => println!("   ⚠️  Stored chunks: unknown - {}", e),
            }
        }
        Err(e) => {
            println!("   ❌ LanceDB: Failed to open - {}", e);
        }
    }

    Ok(())
}
