#[cfg(test)]
mod tests;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{IndexStore, Metadata, SimilarityHit, squared_l2, validate_batch};
use crate::{KbError, Result};

#[derive(Debug, Clone)]
struct StoredRecord {
    id: String,
    vector: Vec<f32>,
    text: String,
    metadata: Metadata,
}

/// In-process index store with brute-force search. Contents live only as
/// long as the store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    dimension: usize,
    records: Arc<RwLock<Vec<StoredRecord>>>,
}

impl MemoryStore {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl IndexStore for MemoryStore {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    async fn add(
        &self,
        vectors: Vec<Vec<f32>>,
        texts: Vec<String>,
        metadatas: Vec<Metadata>,
        ids: Vec<String>,
    ) -> Result<()> {
        let len = validate_batch(self.dimension, &vectors, &texts, &metadatas, &ids)?;
        if len == 0 {
            return Ok(());
        }

        let mut records = self.records.write().await;

        if let Some(existing) = records.iter().find(|r| ids.contains(&r.id)) {
            return Err(KbError::Validation(format!(
                "Id already stored: {}",
                existing.id
            )));
        }

        records.extend(
            vectors
                .into_iter()
                .zip(texts)
                .zip(metadatas)
                .zip(ids)
                .map(|(((vector, text), metadata), id)| StoredRecord {
                    id,
                    vector,
                    text,
                    metadata,
                }),
        );

        debug!("Stored {} records ({} total)", len, records.len());
        Ok(())
    }

    #[inline]
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SimilarityHit>> {
        if vector.len() != self.dimension {
            return Err(KbError::DimensionMismatch {
                expected: self.dimension,
                found: vector.len(),
            });
        }

        let records = self.records.read().await;

        let mut scored: Vec<(f32, &StoredRecord)> = records
            .iter()
            .map(|record| (squared_l2(vector, &record.vector), record))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(distance, record)| SimilarityHit {
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                distance,
            })
            .collect())
    }

    #[inline]
    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }
}
