#[cfg(test)]
mod tests;

use super::{BookDocument, DocumentIndex, DocumentMetadata, SearchResult, VectorRecord};
use crate::{RecsError, Result};
use arrow::array::{
    Array, ArrayRef, FixedSizeListArray, Float32Array, ListArray, ListBuilder,
    RecordBatchIterator, StringArray, StringBuilder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const TABLE_NAME: &str = "documents";

/// One on-disk LanceDB store holding a single table of embedded documents
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: usize,
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RecsError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| RecsError::Database(format!("Invalid {} column type", name)))
}

impl VectorStore {
    /// Open (or create) the store at `db_path`
    ///
    /// `dimension` is used for a fresh table; an existing table keeps the
    /// dimension it was built with until the next insert says otherwise.
    #[inline]
    pub async fn open(db_path: &Path, dimension: usize) -> Result<Self> {
        // file:// URIs need an absolute path or the first component is read as a host
        let db_path = &std::path::absolute(db_path).map_err(|e| {
            RecsError::Database(format!("Failed to resolve vector database path: {}", e))
        })?;
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            RecsError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());

        let connection = match lancedb::connect(&uri).execute().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to connect to LanceDB: {}", e);

                let error_msg = e.to_string().to_lowercase();
                if error_msg.contains("corrupt")
                    || error_msg.contains("invalid")
                    || error_msg.contains("malformed")
                {
                    warn!("Database corruption detected, attempting recovery");
                    Self::attempt_corruption_recovery(db_path)?;

                    lancedb::connect(&uri).execute().await.map_err(|e| {
                        RecsError::Database(format!(
                            "Failed to connect to LanceDB after recovery: {}",
                            e
                        ))
                    })?
                } else {
                    return Err(RecsError::Database(format!(
                        "Failed to connect to LanceDB: {}",
                        e
                    )));
                }
            }
        };

        let mut store = Self {
            connection,
            table_name: TABLE_NAME.to_string(),
            vector_dimension: dimension,
        };

        store.initialize_table_with_recovery().await?;

        info!("Vector store at {:?} initialized", db_path);
        Ok(store)
    }

    #[inline]
    pub fn vector_dimension(&self) -> usize {
        self.vector_dimension
    }

    async fn initialize_table(&mut self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RecsError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            match self.detect_existing_vector_dimension().await {
                Ok(dim) => {
                    self.vector_dimension = dim;
                    debug!("Detected existing vector dimension: {}", dim);
                }
                Err(e) => {
                    warn!(
                        "Could not detect vector dimension from existing table: {}",
                        e
                    );
                }
            }
            return Ok(());
        }

        self.create_table().await?;
        info!(
            "Documents table created with {} dimensions",
            self.vector_dimension
        );
        Ok(())
    }

    async fn create_table(&self) -> Result<()> {
        let schema = Self::create_schema(self.vector_dimension);
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| RecsError::Database(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    async fn detect_existing_vector_dimension(&self) -> Result<usize> {
        let table = self.open_table().await?;

        let schema = table
            .schema()
            .await
            .map_err(|e| RecsError::Database(format!("Failed to get table schema: {}", e)))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => Some(*size as usize),
                _ => None,
            })
            .ok_or_else(|| {
                RecsError::Database("Could not find vector column or determine dimension".to_string())
            })
    }

    fn create_schema(vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, true),
            Field::new(
                "isbns",
                DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))),
                false,
            ),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| RecsError::Database(format!("Failed to open table: {}", e)))
    }

    /// Store multiple records in one append
    #[inline]
    pub async fn store_batch(&mut self, records: Vec<VectorRecord>) -> Result<()> {
        let Some(first) = records.first() else {
            debug!("No records to store");
            return Ok(());
        };

        let vector_dim = first.vector.len();
        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(RecsError::InvalidInput(format!(
                "Record {} has {} dimensions, expected {}",
                bad.id,
                bad.vector.len(),
                vector_dim
            )));
        }

        if self.vector_dimension != vector_dim {
            info!(
                "Vector dimension changed from {} to {}, recreating table",
                self.vector_dimension, vector_dim
            );
            self.vector_dimension = vector_dim;
            self.drop_table_if_exists().await?;
            self.create_table().await?;
        }

        let record_batch = self.create_record_batch(&records)?;
        let table = self.open_table().await?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RecsError::Database(format!("Failed to insert documents: {}", e)))?;

        debug!("Stored {} documents", records.len());
        Ok(())
    }

    fn create_record_batch(&self, records: &[VectorRecord]) -> Result<RecordBatch> {
        let vector_dim = self.vector_dimension;
        let created_at = chrono::Utc::now().to_rfc3339();

        let mut flat_values = Vec::with_capacity(records.len() * vector_dim);
        let mut isbns = ListBuilder::new(StringBuilder::new());
        for record in records {
            flat_values.extend_from_slice(&record.vector);
            for isbn in &record.document.metadata.isbns {
                isbns.values().append_value(isbn);
            }
            isbns.append(true);
        }

        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            vector_dim as i32,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| RecsError::Database(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.id.as_str()),
            )),
            Arc::new(vector_array),
            Arc::new(StringArray::from_iter_values(
                records.iter().map(|r| r.document.content.as_str()),
            )),
            Arc::new(StringArray::from(
                records
                    .iter()
                    .map(|r| r.document.metadata.title.as_deref())
                    .collect::<Vec<_>>(),
            )),
            Arc::new(isbns.finish()),
            Arc::new(StringArray::from_iter_values(
                std::iter::repeat_n(created_at.as_str(), records.len()),
            )),
        ];

        RecordBatch::try_new(Self::create_schema(vector_dim), arrays)
            .map_err(|e| RecsError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// The `limit` documents nearest to `query_vector` by cosine distance
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        if query_vector.len() != self.vector_dimension {
            return Err(RecsError::InvalidInput(format!(
                "Query has {} dimensions, store holds {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self.open_table().await?;
        let results = table
            .vector_search(query_vector)
            .map_err(|e| RecsError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RecsError::Database(format!("Failed to execute search: {}", e)))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| RecsError::Database(format!("Failed to read result stream: {}", e)))?;

        let mut search_results = Vec::new();
        for batch in &batches {
            search_results.extend(Self::parse_search_batch(batch)?);
        }
        search_results.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        debug!("Parsed {} search results", search_results.len());
        Ok(search_results)
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
        let ids = column::<StringArray>(batch, "id")?;
        let contents = column::<StringArray>(batch, "content")?;
        let titles = column::<StringArray>(batch, "title")?;
        let isbn_lists = column::<ListArray>(batch, "isbns")?;
        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut search_results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let values = isbn_lists.value(row);
            let isbn_values = values
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| RecsError::Database("Invalid isbns item type".to_string()))?;
            let isbns = isbn_values
                .iter()
                .flatten()
                .map(ToString::to_string)
                .collect();

            let title = (!titles.is_null(row)).then(|| titles.value(row).to_string());

            let distance = distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            search_results.push(SearchResult {
                id: ids.value(row).to_string(),
                document: BookDocument::new(
                    contents.value(row),
                    DocumentMetadata { isbns, title },
                ),
                similarity_score: 1.0 - distance,
                distance,
            });
        }

        Ok(search_results)
    }

    /// Number of stored documents
    #[inline]
    pub async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RecsError::Database(format!("Failed to count rows: {}", e)))?;
        Ok(count as u64)
    }

    /// Drop every stored document and start from an empty table
    #[inline]
    pub async fn reset(&mut self) -> Result<()> {
        self.drop_table_if_exists().await?;
        self.create_table().await?;
        info!("Vector store reset");
        Ok(())
    }

    /// Compact data files after a bulk load
    #[inline]
    pub async fn optimize(&self) -> Result<()> {
        let table = self.open_table().await?;
        table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| RecsError::Database(format!("Failed to optimize table: {}", e)))?;
        debug!("Vector store optimization completed");
        Ok(())
    }

    /// Whether the table exists and can be counted
    #[inline]
    pub async fn validate_integrity(&self) -> bool {
        let table_names = match self.connection.table_names().execute().await {
            Ok(names) => names,
            Err(e) => {
                error!("Failed to list tables during integrity check: {}", e);
                return false;
            }
        };

        if !table_names.contains(&self.table_name) {
            warn!("Documents table missing during integrity check");
            return false;
        }

        match self.count().await {
            Ok(count) => {
                debug!("Integrity check passed, {} rows found", count);
                true
            }
            Err(e) => {
                error!("Integrity check failed: {}", e);
                false
            }
        }
    }

    fn attempt_corruption_recovery(db_path: &Path) -> Result<()> {
        warn!("Attempting database corruption recovery at {:?}", db_path);

        if db_path.exists() {
            let backup_path = db_path.with_extension("corrupted_backup");
            if let Err(e) = std::fs::rename(db_path, &backup_path) {
                error!("Failed to backup corrupted database: {}", e);
            } else {
                info!("Corrupted database backed up to {:?}", backup_path);
            }
        }

        if db_path.exists() {
            std::fs::remove_dir_all(db_path).map_err(|e| {
                RecsError::Database(format!("Failed to remove corrupted database: {}", e))
            })?;
        }

        std::fs::create_dir_all(db_path)?;
        info!("Database corruption recovery completed");
        Ok(())
    }

    async fn initialize_table_with_recovery(&mut self) -> Result<()> {
        match self.initialize_table().await {
            Ok(()) => Ok(()),
            Err(e) => {
                let error_msg = e.to_string().to_lowercase();
                if error_msg.contains("corrupt")
                    || error_msg.contains("invalid")
                    || error_msg.contains("schema")
                {
                    warn!("Table corruption detected during initialization: {}", e);

                    if let Err(drop_err) = self.drop_table_if_exists().await {
                        warn!("Failed to drop corrupted table: {}", drop_err);
                    }

                    self.initialize_table().await.map_err(|e| {
                        RecsError::Database(format!(
                            "Failed to recreate table after corruption: {}",
                            e
                        ))
                    })
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        let table_names =
            self.connection.table_names().execute().await.map_err(|e| {
                RecsError::Database(format!("Failed to list tables for drop: {}", e))
            })?;

        if table_names.contains(&self.table_name) {
            debug!("Dropping existing documents table");
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| RecsError::Database(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentIndex for VectorStore {
    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        self.search_similar(query, k).await
    }
}
