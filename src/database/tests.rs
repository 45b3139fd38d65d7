use super::*;

fn metadata(source: &str) -> Metadata {
    Metadata::from([(SOURCE_KEY.to_string(), source.to_string())])
}

#[test]
fn validate_batch_accepts_aligned_input() {
    let len = validate_batch(
        2,
        &[vec![0.0, 1.0], vec![1.0, 0.0]],
        &["a".to_string(), "b".to_string()],
        &[metadata("a.txt"), metadata("b.txt")],
        &["1".to_string(), "2".to_string()],
    )
    .expect("aligned batch is valid");

    assert_eq!(len, 2);
}

#[test]
fn validate_batch_rejects_length_mismatch() {
    let result = validate_batch(
        2,
        &[vec![0.0, 1.0], vec![1.0, 0.0]],
        &["only one".to_string()],
        &[metadata("a.txt"), metadata("b.txt")],
        &["1".to_string(), "2".to_string()],
    );

    assert!(matches!(result, Err(KbError::Validation(_))));
}

#[test]
fn validate_batch_rejects_wrong_width() {
    let result = validate_batch(
        3,
        &[vec![0.0, 1.0]],
        &["a".to_string()],
        &[metadata("a.txt")],
        &["1".to_string()],
    );

    assert!(matches!(result, Err(KbError::Validation(_))));
}

#[test]
fn validate_batch_rejects_duplicate_ids() {
    let result = validate_batch(
        1,
        &[vec![0.0], vec![1.0]],
        &["a".to_string(), "b".to_string()],
        &[Metadata::new(), Metadata::new()],
        &["same".to_string(), "same".to_string()],
    );

    assert!(matches!(result, Err(KbError::Validation(msg)) if msg.contains("same")));
}

#[test]
fn empty_batch_is_valid() {
    assert_eq!(validate_batch(4, &[], &[], &[], &[]).expect("empty is valid"), 0);
}

#[test]
fn hit_source_lookup() {
    let hit = SimilarityHit {
        text: "text".to_string(),
        metadata: metadata("docs/a.txt"),
        distance: 0.5,
    };
    assert_eq!(hit.source(), Some("docs/a.txt"));

    let bare = SimilarityHit {
        metadata: Metadata::new(),
        ..hit
    };
    assert_eq!(bare.source(), None);
}

#[test]
fn squared_l2_distance() {
    assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    assert_eq!(squared_l2(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
}
