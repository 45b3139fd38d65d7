use super::*;
use crate::database::SOURCE_KEY;

fn source(path: &str) -> Metadata {
    Metadata::from([(SOURCE_KEY.to_string(), path.to_string())])
}

async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new(2);
    store
        .add(
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![5.0, 5.0]],
            vec![
                "origin".to_string(),
                "near".to_string(),
                "far".to_string(),
            ],
            vec![source("o.txt"), source("n.txt"), source("f.txt")],
            vec!["1".to_string(), "2".to_string(), "3".to_string()],
        )
        .await
        .expect("should add records");
    store
}

#[tokio::test]
async fn empty_store_returns_no_hits() {
    let store = MemoryStore::new(3);
    let hits = store
        .query(&[0.0, 0.0, 0.0], 5)
        .await
        .expect("query on empty store is not an error");
    assert!(hits.is_empty());
    assert_eq!(store.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn hits_are_sorted_by_distance() {
    let store = seeded_store().await;

    let hits = store.query(&[0.9, 0.1], 3).await.expect("should query");

    let texts: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
    assert_eq!(texts, vec!["near", "origin", "far"]);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!(hits.iter().all(|h| h.distance >= 0.0));
    assert_eq!(hits[0].source(), Some("n.txt"));
}

#[tokio::test]
async fn k_larger_than_store_returns_everything() {
    let store = seeded_store().await;

    assert_eq!(store.query(&[0.0, 0.0], 10).await.expect("should query").len(), 3);
    assert_eq!(store.query(&[0.0, 0.0], 1).await.expect("should query").len(), 1);
    assert!(store.query(&[0.0, 0.0], 0).await.expect("should query").is_empty());
}

#[tokio::test]
async fn empty_add_is_noop() {
    let store = MemoryStore::new(2);
    store
        .add(Vec::new(), Vec::new(), Vec::new(), Vec::new())
        .await
        .expect("empty add succeeds");
    assert_eq!(store.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn mismatched_batch_is_rejected_without_writing() {
    let store = MemoryStore::new(2);
    let result = store
        .add(
            vec![vec![0.0, 0.0], vec![1.0, 1.0]],
            vec!["one".to_string()],
            vec![Metadata::new(), Metadata::new()],
            vec!["1".to_string(), "2".to_string()],
        )
        .await;

    assert!(matches!(result, Err(KbError::Validation(_))));
    assert_eq!(store.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn reused_id_is_rejected() {
    let store = seeded_store().await;
    let result = store
        .add(
            vec![vec![2.0, 2.0]],
            vec!["again".to_string()],
            vec![Metadata::new()],
            vec!["2".to_string()],
        )
        .await;

    assert!(matches!(result, Err(KbError::Validation(_))));
    assert_eq!(store.count().await.expect("should count"), 3);
}

#[tokio::test]
async fn query_with_wrong_width_fails() {
    let store = seeded_store().await;
    let result = store.query(&[0.0, 0.0, 0.0], 1).await;
    assert!(matches!(
        result,
        Err(KbError::DimensionMismatch {
            expected: 2,
            found: 3
        })
    ));
}

#[tokio::test]
async fn clones_share_contents() {
    let store = MemoryStore::new(2);
    let handle = store.clone();
    store
        .add(
            vec![vec![1.0, 1.0]],
            vec!["shared".to_string()],
            vec![Metadata::new()],
            vec!["x".to_string()],
        )
        .await
        .expect("should add");

    assert_eq!(handle.count().await.expect("should count"), 1);
}
