
use arrow::array::RecordBatchIterator;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use tracing::{debug, info};

use super::{TABLE_NAME, create_record_batch, create_schema, parse_search_batch, vector_dimension};
use crate::config::Config;
use crate::database::{IndexStore, Metadata, SimilarityHit, validate_batch};
use crate::{KbError, Result};

/// Persistent index store backed by a LanceDB table
pub struct LanceStore {
    connection: Connection,
    table: Table,
    dimension: usize,
}

impl LanceStore {
    /// Open the store configured for `config`
    #[inline]
    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.vector_database_path(), config.embedding.dimension).await
    }

    /// Open or create the index under `path`.
    ///
    /// # Arguments
    /// * `path` - Directory holding the LanceDB dataset
    /// * `dimension` - Vector width the caller's embedder produces
    ///
    /// # Returns
    /// * `Result<Self>` - The store, or [`KbError::DimensionMismatch`] when an
    ///   existing table was built with a different width
    #[inline]
    pub async fn open(path: &Path, dimension: usize) -> Result<Self> {
        debug!("Initializing LanceDB at path: {:?}", path);

        std::fs::create_dir_all(path).map_err(|e| {
            KbError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| KbError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        let table = Self::open_or_create_table(&connection, dimension).await?;

        info!(
            "Vector store ready at {} ({} dimensions)",
            path.display(),
            dimension
        );
        Ok(Self {
            connection,
            table,
            dimension,
        })
    }

    async fn open_or_create_table(connection: &Connection, dimension: usize) -> Result<Table> {
        let table_names = connection
            .table_names()
            .execute()
            .await
            .map_err(|e| KbError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.iter().any(|name| name == TABLE_NAME) {
            let table = connection
                .open_table(TABLE_NAME)
                .execute()
                .await
                .map_err(|e| KbError::Database(format!("Failed to open table: {}", e)))?;

            let schema = table
                .schema()
                .await
                .map_err(|e| KbError::Database(format!("Failed to get table schema: {}", e)))?;

            let existing = vector_dimension(&schema).ok_or_else(|| {
                KbError::Database("Could not find vector column or determine dimension".to_string())
            })?;
            if existing != dimension {
                return Err(KbError::DimensionMismatch {
                    expected: existing,
                    found: dimension,
                });
            }

            debug!("Opened existing table with {} dimensions", existing);
            return Ok(table);
        }

        info!("Creating {} table with {} dimensions", TABLE_NAME, dimension);
        connection
            .create_empty_table(TABLE_NAME, create_schema(dimension))
            .execute()
            .await
            .map_err(|e| KbError::Database(format!("Failed to create table: {}", e)))
    }

    /// Names of the tables in the underlying database
    #[inline]
    pub async fn table_names(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| KbError::Database(format!("Failed to list tables: {}", e)))
    }
}

#[async_trait]
impl IndexStore for LanceStore {
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
            debug!("No records to store");
            return Ok(());
        }

        let record_batch = create_record_batch(self.dimension, &vectors, &texts, &metadatas, &ids)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        self.table
            .add(reader)
            .execute()
            .await
            .map_err(|e| KbError::Database(format!("Failed to insert records: {}", e)))?;

        info!("Stored {} records", len);
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

        if k == 0 {
            return Ok(Vec::new());
        }

        let mut results = self
            .table
            .vector_search(vector)
            .map_err(|e| KbError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(k)
            .execute()
            .await
            .map_err(|e| KbError::Database(format!("Failed to execute search: {}", e)))?;

        let mut hits = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| KbError::Database(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(parse_search_batch(&batch)?);
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        debug!("Search returned {} hits", hits.len());
        Ok(hits)
    }

    #[inline]
    async fn count(&self) -> Result<usize> {
        self.table
            .count_rows(None)
            .await
            .map_err(|e| KbError::Database(format!("Failed to count rows: {}", e)))
    }
}
