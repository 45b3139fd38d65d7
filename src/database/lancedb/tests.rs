use super::parse_metadata as parse_metadata_impl;
use super::*;
use crate::database::SOURCE_KEY;

fn source(path: &str) -> Metadata {
    Metadata::from([(SOURCE_KEY.to_string(), path.to_string())])
}

#[test]
fn schema_declares_vector_width() {
    let schema = create_schema(5);
    assert_eq!(vector_dimension(&schema), Some(5));

    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["id", "vector", "text", "metadata", "created_at"]);
}

#[test]
fn schema_without_vector_column() {
    let schema = Schema::new(vec![Field::new("id", DataType::Utf8, false)]);
    assert_eq!(vector_dimension(&schema), None);
}

#[test]
fn record_batch_layout() {
    let batch = create_record_batch(
        2,
        &[vec![0.1, 0.2], vec![0.3, 0.4]],
        &["first".to_string(), "second".to_string()],
        &[source("a.txt"), Metadata::new()],
        &["id-1".to_string(), "id-2".to_string()],
    )
    .expect("should build record batch");

    assert_eq!(batch.num_rows(), 2);
    let metadata = batch
        .column_by_name("metadata")
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .expect("metadata column is a string array");
    assert_eq!(metadata.value(0), r#"{"source":"a.txt"}"#);
    assert_eq!(metadata.value(1), "{}");
}

#[test]
fn parse_batch_with_distances() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("text", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("_distance", DataType::Float32, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["near", "far"])),
            Arc::new(StringArray::from(vec![r#"{"source":"n.txt"}"#, "not json"])),
            Arc::new(Float32Array::from(vec![Some(0.25), None])),
        ],
    )
    .expect("should build batch");

    let hits = parse_search_batch(&batch).expect("should parse batch");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].text, "near");
    assert_eq!(hits[0].source(), Some("n.txt"));
    assert!((hits[0].distance - 0.25).abs() < f32::EPSILON);
    assert_eq!(hits[1].source(), None);
    assert_eq!(hits[1].distance, 0.0);
}

#[test]
fn parse_batch_missing_text_column() {
    let schema = Arc::new(Schema::new(vec![Field::new(
        "metadata",
        DataType::Utf8,
        false,
    )]));
    let batch = RecordBatch::try_new(schema, vec![Arc::new(StringArray::from(vec!["{}"]))])
        .expect("should build batch");

    assert!(matches!(
        parse_search_batch(&batch),
        Err(KbError::Database(_))
    ));
}

#[test]
fn malformed_metadata_is_empty() {
    assert!(parse_metadata_impl("[1, 2]").is_empty());
    assert_eq!(parse_metadata_impl(r#"{"source":"x.md"}"#), source("x.md"));
}
