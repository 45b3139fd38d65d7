use super::*;

#[test]
fn ensure_dimension_reports_first_mismatch() {
    let vectors = vec![vec![0.0; 4], vec![0.0; 3], vec![0.0; 5]];

    match ensure_dimension(4, &vectors) {
        Err(KbError::DimensionMismatch { expected, found }) => {
            assert_eq!(expected, 4);
            assert_eq!(found, 3);
        }
        other => panic!("expected dimension mismatch, got {:?}", other),
    }

    assert!(ensure_dimension(4, &vectors[..1]).is_ok());
    assert!(ensure_dimension(4, &[]).is_ok());
}

#[test]
fn build_hash_embedder_from_config() {
    let mut config = Config::default();
    config.embedding.provider = EmbeddingProvider::Hash;
    config.embedding.dimension = 32;

    let embedder = build_embedder(&config).expect("should build hash embedder");
    assert_eq!(embedder.dimension(), 32);

    let vector = embedder
        .embed_query("what colour is the sky")
        .expect("should embed query");
    assert_eq!(vector.len(), 32);
}

#[test]
fn build_ollama_embedder_from_config() {
    let config = Config::default();

    let embedder = build_embedder(&config).expect("should build ollama client");
    assert_eq!(embedder.dimension(), 768);
}
