#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end ingestion and retrieval with the offline hash embedder

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use support_kb::config::{Config, EmbeddingProvider};
use support_kb::database::{IndexStore, MemoryStore};
use support_kb::embeddings::{ChunkingConfig, Embedder, HashEmbedder};
use support_kb::indexer::Indexer;
use support_kb::retrieval::{
    AnswerEngine, AnswerEvent, NO_RESULTS_MESSAGE, RetrievalConfig, SNIPPET_CHARS,
};
use support_kb::uploads::upload_files;
use tempfile::TempDir;

const DIM: usize = 256;

fn memory_pipeline(chunking: ChunkingConfig) -> (Indexer, AnswerEngine) {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(DIM));
    let store: Arc<dyn IndexStore> = Arc::new(MemoryStore::new(DIM));
    let indexer = Indexer::new(Arc::clone(&embedder), Arc::clone(&store), chunking);
    let engine = AnswerEngine::new(embedder, store, RetrievalConfig::default());
    (indexer, engine)
}

fn hash_config(base_dir: &Path) -> Config {
    let mut config = Config::with_base_dir(base_dir);
    config.embedding.provider = EmbeddingProvider::Hash;
    config.embedding.dimension = DIM;
    config
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("should create parent dirs");
    }
    fs::write(&path, contents).expect("should write file");
    path
}

fn split(events: Vec<AnswerEvent>) -> (Vec<(String, String)>, String) {
    let mut sources = Vec::new();
    let mut text = String::new();
    for event in events {
        match event {
            AnswerEvent::Source { payload } => sources.push((payload.source, payload.snippet)),
            AnswerEvent::Token { text: token } => text.push_str(&token),
        }
    }
    (sources, text)
}

#[tokio::test]
async fn sky_scenario() {
    let docs = TempDir::new().expect("should create temp dir");
    let sky = write(docs.path(), "sky.txt", "The sky is blue.");
    let (indexer, engine) = memory_pipeline(ChunkingConfig::default());

    assert_eq!(indexer.add_path(&sky).await.expect("should ingest"), 1);

    let events: Vec<_> = engine
        .answer("What color is the sky?", &[])
        .await
        .expect("should answer")
        .collect();
    let (sources, text) = split(events);

    assert_eq!(
        sources,
        vec![(sky.to_string_lossy().into_owned(), "The sky is blue.".to_string())]
    );
    assert!(text.contains("The sky is blue."));
    assert!(text.contains("sky.txt"));
}

#[tokio::test]
async fn empty_store_yields_only_fallback() {
    let (_indexer, engine) = memory_pipeline(ChunkingConfig::default());

    let events: Vec<_> = engine
        .answer("Anything at all?", &[])
        .await
        .expect("should answer")
        .collect();

    assert_eq!(
        events,
        vec![AnswerEvent::Token {
            text: NO_RESULTS_MESSAGE.to_string()
        }]
    );
}

#[tokio::test]
async fn citations_follow_similarity_and_name_top_files() {
    let docs = TempDir::new().expect("should create temp dir");
    write(docs.path(), "a.txt", "Invoices are emailed monthly to the billing contact.");
    write(docs.path(), "b.txt", "Passwords can be reset from the login page.");
    let (indexer, engine) = memory_pipeline(ChunkingConfig::default());
    indexer.add_path(docs.path()).await.expect("should ingest");

    let stream = engine
        .answer("How do I reset my password from the login page?", &[])
        .await
        .expect("should answer");
    let distances: Vec<f32> = stream.hits().iter().map(|hit| hit.distance).collect();
    let hit_texts: Vec<String> = stream.hits().iter().map(|hit| hit.text.clone()).collect();
    let (sources, text) = split(stream.collect());

    assert_eq!(sources.len(), 2);
    assert!(sources[0].0.ends_with("b.txt"));
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
    for ((_, snippet), hit_text) in sources.iter().zip(&hit_texts) {
        assert!(snippet.chars().count() <= SNIPPET_CHARS);
        assert!(hit_text.starts_with(snippet.as_str()));
    }
    assert!(text.contains("a.txt"));
    assert!(text.contains("b.txt"));
}

#[tokio::test]
async fn corrupt_and_unsupported_files_are_skipped() {
    let docs = TempDir::new().expect("should create temp dir");
    write(docs.path(), "broken.pdf", "%PDF-1.4 this is not really a pdf");
    write(docs.path(), "data.json", "{\"a\": 1}");
    write(docs.path(), "guide.md", "# Guide\n\nRestart the router to fix most issues.");
    let (indexer, _engine) = memory_pipeline(ChunkingConfig::default());

    let stats = indexer.ingest(docs.path()).await.expect("should ingest");

    assert_eq!(stats.files_seen, 3);
    assert_eq!(stats.files_skipped, 2);
    assert_eq!(stats.files_indexed, 1);
    assert_eq!(stats.chunks_stored, 1);

    let corrupt_only = indexer
        .add_path(&docs.path().join("broken.pdf"))
        .await
        .expect("corrupt pdf is not an error");
    assert_eq!(corrupt_only, 0);
}

#[tokio::test]
async fn directory_total_matches_per_file_totals() {
    let docs = TempDir::new().expect("should create temp dir");
    let chunking = ChunkingConfig::new(100, 20);
    let files = [
        write(
            docs.path(),
            "policies/returns.md",
            &"Items may be returned within thirty days of delivery. ".repeat(8),
        ),
        write(
            docs.path(),
            "policies/warranty.txt",
            "Warranty covers manufacturing defects.\n\nIt does not cover accidental damage.",
        ),
        write(docs.path(), "faq.txt", &"Q: Do you ship abroad?\nA: Yes.\n".repeat(6)),
    ];

    let mut individual = 0;
    for file in &files {
        let (indexer, _engine) = memory_pipeline(chunking.clone());
        individual += indexer.add_path(file).await.expect("should ingest file");
    }

    let (indexer, _engine) = memory_pipeline(chunking);
    let batched = indexer
        .add_path(docs.path())
        .await
        .expect("should ingest directory");

    assert_eq!(batched, individual);
    assert!(batched > files.len());
}

#[tokio::test]
async fn persistent_pipeline_survives_restart() {
    let base = TempDir::new().expect("should create temp dir");
    let docs = TempDir::new().expect("should create temp dir");
    write(docs.path(), "hours.txt", "Support is available Monday to Friday.");
    let config = hash_config(base.path());

    {
        let indexer = Indexer::from_config(&config)
            .await
            .expect("should build indexer");
        assert_eq!(
            indexer.add_path(docs.path()).await.expect("should ingest"),
            1
        );
    }

    let engine = AnswerEngine::from_config(&config)
        .await
        .expect("should build engine");
    let answer = engine
        .answer_collected("When is support available?", &[])
        .await
        .expect("should answer");

    assert_eq!(answer.sources.len(), 1);
    assert!(answer.sources[0].source.ends_with("hours.txt"));
    assert!(answer.text.starts_with("Answer (from your documents):"));
    assert!(answer.text.contains("(source: hours.txt)"));
}

#[tokio::test]
async fn uploads_become_answerable() {
    let base = TempDir::new().expect("should create temp dir");
    let docs = TempDir::new().expect("should create temp dir");
    let file = write(docs.path(), "returns.md", "Returns need the original receipt.");
    let config = hash_config(base.path());

    let indexer = Indexer::from_config(&config)
        .await
        .expect("should build indexer");
    let report = upload_files(&indexer, &[file], &config.uploads_path())
        .await
        .expect("should upload");
    assert_eq!(report.saved, vec!["returns.md"]);
    assert_eq!(report.chunks_added, 1);

    let engine = AnswerEngine::new(
        Arc::clone(indexer.embedder()),
        Arc::clone(indexer.store()),
        config.retrieval.clone(),
    );
    let answer = engine
        .answer_collected("Do returns need a receipt?", &[])
        .await
        .expect("should answer");

    let staged = config.uploads_path().join("returns.md");
    assert_eq!(answer.sources[0].source, staged.to_string_lossy());
}
