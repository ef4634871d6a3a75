
use super::{EmbeddedDocument, RecordDocument, RecordMetadata};
use crate::{RagError, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, Float64Array, RecordBatchIterator, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

const TABLE_NAME: &str = "service_records";

/// Vector database store using LanceDB for similarity search over the
/// per-record documents.
pub struct VectorStore {
    connection: Connection,
    vector_dimension: usize,
}

/// Search result from vector similarity search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: RecordDocument,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the vector database under the configured directory.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self, RagError> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RagError::Database(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            vector_dimension: config.ollama.embedding_dimension as usize,
        };

        store.initialize_table().await?;

        info!("Vector store initialized successfully");
        Ok(store)
    }

    /// Create the table if it does not exist yet. An existing table is left
    /// untouched so re-runs keep the already-built index.
    async fn initialize_table(&self) -> Result<(), RagError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&TABLE_NAME.to_string()) {
            debug!("Table {} already exists", TABLE_NAME);
            return Ok(());
        }

        info!(
            "Creating {} table with {} dimensions",
            TABLE_NAME, self.vector_dimension
        );

        let schema = self.create_schema();
        self.connection
            .create_empty_table(TABLE_NAME, schema)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.vector_dimension as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("problem_type", DataType::Utf8, false),
            Field::new("service_status", DataType::Utf8, false),
            Field::new("cost", DataType::Float64, false),
            Field::new("hours", DataType::Float64, false),
            Field::new("date", DataType::Utf8, false),
            Field::new("machine_id", DataType::Utf8, false),
        ]))
    }

    /// Number of documents currently stored. Zero means the bootstrap indexer
    /// still has to run.
    #[inline]
    pub async fn count_documents(&self) -> Result<u64, RagError> {
        let table = self
            .connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Insert a batch of embedded documents.
    #[inline]
    pub async fn store_documents_batch(
        &self,
        documents: Vec<EmbeddedDocument>,
    ) -> Result<(), RagError> {
        if documents.is_empty() {
            debug!("No documents to store");
            return Ok(());
        }

        debug!("Storing batch of {} documents", documents.len());

        for doc in &documents {
            if doc.vector.len() != self.vector_dimension {
                return Err(RagError::Database(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.vector_dimension,
                    doc.vector.len()
                )));
            }
        }

        let record_batch = self.create_record_batch(&documents)?;

        let table = self
            .connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to insert documents: {}", e)))?;

        info!("Successfully stored {} documents", documents.len());
        Ok(())
    }

    fn create_record_batch(&self, documents: &[EmbeddedDocument]) -> Result<RecordBatch, RagError> {
        let len = documents.len();

        let mut ids = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut problem_types = Vec::with_capacity(len);
        let mut service_statuses = Vec::with_capacity(len);
        let mut costs = Vec::with_capacity(len);
        let mut hours = Vec::with_capacity(len);
        let mut dates = Vec::with_capacity(len);
        let mut machine_ids = Vec::with_capacity(len);

        let mut flat_values = Vec::with_capacity(len * self.vector_dimension);
        for doc in documents {
            ids.push(doc.document.id.as_str());
            contents.push(doc.document.content.as_str());
            problem_types.push(doc.document.metadata.problem_type.as_str());
            service_statuses.push(doc.document.metadata.service_status.as_str());
            costs.push(doc.document.metadata.cost);
            hours.push(doc.document.metadata.hours);
            dates.push(doc.document.metadata.date.as_str());
            machine_ids.push(doc.document.metadata.machine_id.as_str());
            flat_values.extend_from_slice(&doc.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.vector_dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| RagError::Database(format!("Failed to create vector array: {}", e)))?;

        let schema = self.create_schema();
        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(problem_types)),
            Arc::new(StringArray::from(service_statuses)),
            Arc::new(Float64Array::from(costs)),
            Arc::new(Float64Array::from(hours)),
            Arc::new(StringArray::from(dates)),
            Arc::new(StringArray::from(machine_ids)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Search for the documents most similar to a query vector, ordered by
    /// relevance.
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, RagError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self
            .connection
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))?;

        let query = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(limit);

        let mut results = query
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

        let mut search_results = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?
        {
            search_results.extend(self.parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search results from stream", search_results.len());
        Ok(search_results)
    }

    fn parse_search_batch(&self, batch: &RecordBatch) -> Result<Vec<SearchResult>, RagError> {
        fn string_column<'a>(
            batch: &'a RecordBatch,
            name: &str,
        ) -> Result<&'a StringArray, RagError> {
            batch
                .column_by_name(name)
                .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
        }

        fn float_column<'a>(
            batch: &'a RecordBatch,
            name: &str,
        ) -> Result<&'a Float64Array, RagError> {
            batch
                .column_by_name(name)
                .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
        }

        let ids = string_column(batch, "id")?;
        let contents = string_column(batch, "content")?;
        let problem_types = string_column(batch, "problem_type")?;
        let service_statuses = string_column(batch, "service_status")?;
        let costs = float_column(batch, "cost")?;
        let hours = float_column(batch, "hours")?;
        let dates = string_column(batch, "date")?;
        let machine_ids = string_column(batch, "machine_id")?;

        let distances = batch
            .column_by_name("_distance")
            .map(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut search_results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let document = RecordDocument {
                id: ids.value(row).to_string(),
                content: contents.value(row).to_string(),
                metadata: RecordMetadata {
                    problem_type: problem_types.value(row).to_string(),
                    service_status: service_statuses.value(row).to_string(),
                    cost: costs.value(row),
                    hours: hours.value(row),
                    date: dates.value(row).to_string(),
                    machine_id: machine_ids.value(row).to_string(),
                },
            };

            let distance = distances
                .flatten()
                .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            search_results.push(SearchResult {
                document,
                similarity_score: 1.0 - distance,
                distance,
            });
        }

        debug!("Parsed {} search results", search_results.len());
        Ok(search_results)
    }
}
