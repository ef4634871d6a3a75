// Vector database module

pub mod lancedb;

pub use lancedb::{RecordDocument, RecordMetadata, build_documents};
