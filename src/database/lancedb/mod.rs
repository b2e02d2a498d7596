#[cfg(test)]
mod tests;

use super::{ChunkMetadata, IndexRecord, MetadataFilter, SearchResult, VectorIndex};
use crate::{KnowledgeError, Result};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const TABLE_NAME: &str = "knowledge";

/// Metadata columns that may appear in a query filter. Filter keys are
/// checked against this list before being spliced into a predicate.
const FILTER_COLUMNS: &[&str] = &["role", "role_name", "source_file"];

/// LanceDB-backed [`VectorIndex`].
pub struct LanceIndex {
    connection: Connection,
    /// Dimension of the vector column; adjusted if a batch with a
    /// different dimension arrives (the table is recreated).
    dimension: RwLock<usize>,
}

impl LanceIndex {
    /// Connect to (or create) the index at `db_path`.
    ///
    /// `dimension` is the expected embedding width; an existing table's
    /// schema takes precedence over it.
    #[inline]
    pub async fn connect(db_path: &Path, dimension: usize) -> Result<Self> {
        debug!("Opening LanceDB index at {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                KnowledgeError::Index(format!("Failed to create index directory: {e}"))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to connect to LanceDB: {e}")))?;

        let index = Self {
            connection,
            dimension: RwLock::new(dimension),
        };
        index.initialize_table(dimension).await?;

        info!("Vector index ready at {}", db_path.display());
        Ok(index)
    }

    async fn initialize_table(&self, default_dimension: usize) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to list tables: {e}")))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            match self.detect_dimension().await {
                Ok(dim) => {
                    debug!("Existing table has {}-dimensional vectors", dim);
                    *self.dimension.write().await = dim;
                }
                Err(e) => {
                    warn!(
                        "Could not detect vector dimension, assuming {}: {}",
                        default_dimension, e
                    );
                }
            }
            return Ok(());
        }

        self.create_table(default_dimension).await
    }

    async fn create_table(&self, dimension: usize) -> Result<()> {
        self.connection
            .create_empty_table(TABLE_NAME, schema(dimension))
            .execute()
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to create table: {e}")))?;
        debug!("Created table '{}' with {} dimensions", TABLE_NAME, dimension);
        Ok(())
    }

    async fn open_table(&self) -> Result<Table> {
        self.connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to open table: {e}")))
    }

    async fn detect_dimension(&self) -> Result<usize> {
        let table = self.open_table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to read table schema: {e}")))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(KnowledgeError::Index(
            "Vector column missing from table schema".to_string(),
        ))
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to list tables: {e}")))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            self.connection
                .drop_table(TABLE_NAME)
                .await
                .map_err(|e| KnowledgeError::Index(format!("Failed to drop table: {e}")))?;
        }
        Ok(())
    }

    fn record_batch(records: &[IndexRecord], dimension: usize) -> Result<RecordBatch> {
        let len = records.len();
        let mut ids = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut roles = Vec::with_capacity(len);
        let mut role_names = Vec::with_capacity(len);
        let mut source_files = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut total_chunks = Vec::with_capacity(len);
        let mut flat_vectors = Vec::with_capacity(len * dimension);

        for record in records {
            if record.vector.len() != dimension {
                return Err(KnowledgeError::Index(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    dimension,
                    record.vector.len()
                )));
            }
            ids.push(record.id.as_str());
            contents.push(record.content.as_str());
            roles.push(record.metadata.role.as_str());
            role_names.push(record.metadata.role_name.as_str());
            source_files.push(record.metadata.source_file.as_str());
            chunk_indices.push(record.metadata.chunk_index);
            total_chunks.push(record.metadata.total_chunks);
            flat_vectors.extend_from_slice(&record.vector);
        }

        let item_field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            item_field,
            dimension as i32,
            Arc::new(Float32Array::from(flat_vectors)),
            None,
        )
        .map_err(|e| KnowledgeError::Index(format!("Failed to build vector array: {e}")))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(roles)),
            Arc::new(StringArray::from(role_names)),
            Arc::new(StringArray::from(source_files)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(UInt32Array::from(total_chunks)),
        ];

        RecordBatch::try_new(schema(dimension), arrays)
            .map_err(|e| KnowledgeError::Index(format!("Failed to build record batch: {e}")))
    }

    fn filter_predicate(filter: &MetadataFilter) -> Result<Option<String>> {
        if filter.is_empty() {
            return Ok(None);
        }

        let mut predicates = Vec::with_capacity(filter.len());
        for (key, value) in filter {
            if !FILTER_COLUMNS.contains(&key.as_str()) {
                return Err(KnowledgeError::Index(format!(
                    "Unsupported filter key: {key}"
                )));
            }
            predicates.push(format!("{} = '{}'", key, value.replace('\'', "''")));
        }
        Ok(Some(predicates.join(" AND ")))
    }

    async fn collect_batches(
        mut stream: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to read result stream: {e}")))?
        {
            batches.push(batch);
        }
        Ok(batches)
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn upsert(&self, records: Vec<IndexRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let incoming = records[0].vector.len();
        {
            let mut dimension = self.dimension.write().await;
            if *dimension != incoming {
                info!(
                    "Embedding dimension changed from {} to {}, recreating table",
                    *dimension, incoming
                );
                self.drop_table_if_exists().await?;
                self.create_table(incoming).await?;
                *dimension = incoming;
            }
        }

        let batch = Self::record_batch(&records, incoming)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        let table = self.open_table().await?;
        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to upsert records: {e}")))?;

        debug!("Upserted {} records", records.len());
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<SearchResult>> {
        let table = self.open_table().await?;

        let mut query = table
            .vector_search(vector)
            .map_err(|e| KnowledgeError::Index(format!("Failed to build vector query: {e}")))?
            .column("vector")
            .limit(limit);

        if let Some(predicate) = Self::filter_predicate(filter)? {
            query = query.only_if(predicate);
        }

        let stream = query
            .execute()
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to execute query: {e}")))?;

        let mut results = Vec::new();
        for batch in Self::collect_batches(stream).await? {
            let ids = string_column(&batch, "id")?;
            let contents = string_column(&batch, "content")?;
            let distances = batch
                .column_by_name("_distance")
                .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

            for row in 0..batch.num_rows() {
                let distance = distances
                    .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });
                results.push(SearchResult {
                    id: ids.value(row).to_string(),
                    content: contents.value(row).to_string(),
                    metadata: row_metadata(&batch, row)?,
                    distance,
                });
            }
        }

        debug!("Query returned {} results", results.len());
        Ok(results)
    }

    async fn scan_metadata(&self) -> Result<Vec<ChunkMetadata>> {
        let table = self.open_table().await?;
        let stream = table
            .query()
            .execute()
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to scan table: {e}")))?;

        let mut metadata = Vec::new();
        for batch in Self::collect_batches(stream).await? {
            for row in 0..batch.num_rows() {
                metadata.push(row_metadata(&batch, row)?);
            }
        }
        Ok(metadata)
    }

    async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| KnowledgeError::Index(format!("Failed to count rows: {e}")))?;
        Ok(count as u64)
    }

    async fn drop_all(&self) -> Result<()> {
        let dimension = *self.dimension.read().await;
        self.drop_table_if_exists().await?;
        self.create_table(dimension).await?;
        info!("Index cleared");
        Ok(())
    }
}

fn schema(dimension: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                dimension as i32,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("role", DataType::Utf8, false),
        Field::new("role_name", DataType::Utf8, false),
        Field::new("source_file", DataType::Utf8, false),
        Field::new("chunk_index", DataType::UInt32, false),
        Field::new("total_chunks", DataType::UInt32, false),
    ]))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| KnowledgeError::Index(format!("Missing column: {name}")))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| KnowledgeError::Index(format!("Invalid type for column: {name}")))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| KnowledgeError::Index(format!("Missing column: {name}")))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| KnowledgeError::Index(format!("Invalid type for column: {name}")))
}

fn row_metadata(batch: &RecordBatch, row: usize) -> Result<ChunkMetadata> {
    Ok(ChunkMetadata {
        role: string_column(batch, "role")?.value(row).to_string(),
        role_name: string_column(batch, "role_name")?.value(row).to_string(),
        source_file: string_column(batch, "source_file")?.value(row).to_string(),
        chunk_index: u32_column(batch, "chunk_index")?.value(row),
        total_chunks: u32_column(batch, "total_chunks")?.value(row),
    })
}
