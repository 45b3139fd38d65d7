// Database module
// Index store contract plus LanceDB and in-memory implementations

pub mod lancedb;
pub mod memory;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};

use crate::{KbError, Result};

pub use self::lancedb::LanceStore;
pub use memory::MemoryStore;

/// Metadata attached to every stored chunk
pub type Metadata = BTreeMap<String, String>;

/// Metadata key holding the originating file path
pub const SOURCE_KEY: &str = "source";

/// A stored chunk returned by a nearest-neighbour query
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityHit {
    pub text: String,
    pub metadata: Metadata,
    /// Non-negative dissimilarity; lower is closer
    pub distance: f32,
}

impl SimilarityHit {
    /// The `source` metadata entry, if present
    #[inline]
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// Append-only store of (vector, text, metadata) records keyed by id.
///
/// Implementations serialise their own writes; callers add no locking.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Width of the vectors this store accepts
    fn dimension(&self) -> usize;

    /// Append aligned records. All four sequences must have the same length;
    /// an empty batch is a no-op.
    async fn add(
        &self,
        vectors: Vec<Vec<f32>>,
        texts: Vec<String>,
        metadatas: Vec<Metadata>,
        ids: Vec<String>,
    ) -> Result<()>;

    /// Up to `k` nearest records, ascending by distance. An empty store yields
    /// an empty result.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<SimilarityHit>>;

    /// Number of stored records
    async fn count(&self) -> Result<usize>;
}

/// Check an `add` batch and return its length
#[inline]
pub fn validate_batch(
    dimension: usize,
    vectors: &[Vec<f32>],
    texts: &[String],
    metadatas: &[Metadata],
    ids: &[String],
) -> Result<usize> {
    let len = vectors.len();
    if texts.len() != len || metadatas.len() != len || ids.len() != len {
        return Err(KbError::Validation(format!(
            "Batch length mismatch: {} vectors, {} texts, {} metadatas, {} ids",
            len,
            texts.len(),
            metadatas.len(),
            ids.len()
        )));
    }

    if let Some(vector) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(KbError::Validation(format!(
            "Vector has {} dimensions but the index expects {}",
            vector.len(),
            dimension
        )));
    }

    let mut seen = HashSet::with_capacity(len);
    if let Some(duplicate) = ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(KbError::Validation(format!(
            "Duplicate id in batch: {}",
            duplicate
        )));
    }

    Ok(len)
}

/// Squared Euclidean distance
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
