// LanceDB vector database module
// Arrow schema and record conversion for the persistent index

#[cfg(test)]
mod tests;

pub mod vector_store;

use arrow::array::{Array, FixedSizeListArray, Float32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;
use tracing::warn;

use super::{Metadata, SimilarityHit};
use crate::{KbError, Result};

pub use vector_store::LanceStore;

/// Name of the table holding every indexed chunk
pub const TABLE_NAME: &str = "knowledgebase";

/// Create the table schema for vectors of width `vector_dim`
#[inline]
pub fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("text", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

/// Vector width declared by a table schema, if it has a vector column
#[inline]
pub fn vector_dimension(schema: &Schema) -> Option<usize> {
    schema
        .fields()
        .iter()
        .find(|field| field.name() == "vector")
        .and_then(|field| match field.data_type() {
            DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
            _ => None,
        })
}

/// Build a record batch from an already validated `add` batch
#[inline]
pub fn create_record_batch(
    vector_dim: usize,
    vectors: &[Vec<f32>],
    texts: &[String],
    metadatas: &[Metadata],
    ids: &[String],
) -> Result<RecordBatch> {
    let created_at = chrono::Utc::now().to_rfc3339();
    let len = vectors.len();

    let mut flat_values = Vec::with_capacity(len * vector_dim);
    for vector in vectors {
        flat_values.extend_from_slice(vector);
    }
    let field = Arc::new(Field::new("item", DataType::Float32, true));
    let vector_array = FixedSizeListArray::try_new(
        field,
        vector_dim as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| KbError::Database(format!("Failed to create vector array: {}", e)))?;

    let metadata_json = metadatas
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| KbError::Database(format!("Failed to serialize metadata: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from_iter_values(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from_iter_values(texts)),
        Arc::new(StringArray::from(metadata_json)),
        Arc::new(StringArray::from(vec![created_at; len])),
    ];

    RecordBatch::try_new(create_schema(vector_dim), arrays)
        .map_err(|e| KbError::Database(format!("Failed to create record batch: {}", e)))
}

/// Turn one batch of search output into hits
#[inline]
pub fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SimilarityHit>> {
    let texts = string_column(batch, "text")?;
    let metadatas = string_column(batch, "metadata")?;

    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut hits = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let distance = distances
            .filter(|d| !d.is_null(row))
            .map_or(0.0, |d| d.value(row).max(0.0));

        hits.push(SimilarityHit {
            text: texts.value(row).to_string(),
            metadata: parse_metadata(metadatas.value(row)),
            distance,
        });
    }

    Ok(hits)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| KbError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| KbError::Database(format!("Invalid {} column type", name)))
}

/// Malformed metadata degrades to an empty map
fn parse_metadata(raw: &str) -> Metadata {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Ignoring malformed metadata {:?}: {}", raw, e);
        Metadata::new()
    })
}
