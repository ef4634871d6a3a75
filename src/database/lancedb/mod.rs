// LanceDB vector database module
// Stores one document per maintenance record and serves similarity search
// for the semantic retrieval path.


pub mod vector_store;

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;

/// Retrieval unit derived 1:1 from a dataset row. Created once at index-build
/// time and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDocument {
    /// Row index at index-build time, as a stable string id
    pub id: String,
    /// Human-readable summary used for embedding and grounding
    pub content: String,
    pub metadata: RecordMetadata,
}

/// Structured fields carried alongside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub problem_type: String,
    pub service_status: String,
    pub cost: f64,
    pub hours: f64,
    pub date: String,
    pub machine_id: String,
}

/// A document paired with its embedding, ready for insertion.
#[derive(Debug, Clone)]
pub struct EmbeddedDocument {
    pub document: RecordDocument,
    pub vector: Vec<f32>,
}

/// Convert every dataset row into a retrieval document: the embedded content
/// is the problem type and service status, with the remaining fields carried
/// as metadata.
#[inline]
pub fn build_documents(dataset: &Dataset) -> Vec<RecordDocument> {
    dataset
        .records()
        .iter()
        .enumerate()
        .map(|(i, record)| RecordDocument {
            id: i.to_string(),
            content: format!("{} - {}", record.problem_type, record.service_status),
            metadata: RecordMetadata {
                problem_type: record.problem_type.clone(),
                service_status: record.service_status.clone(),
                cost: record.cost,
                hours: record.hours,
                date: record.date.clone(),
                machine_id: record.machine_id.clone(),
            },
        })
        .collect()
}
