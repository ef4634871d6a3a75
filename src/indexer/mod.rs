// Bootstrap indexer
// Builds the vector index from the dataset exactly once: a populated index is
// left untouched so startup stays cheap after the first run. Rebuilds go
// through the explicit `index` command, which is just this bootstrap again
// after the caller removed the database directory.


use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::Config;
use crate::database::build_documents;
use crate::database::lancedb::EmbeddedDocument;
use crate::database::lancedb::vector_store::VectorStore;
use crate::dataset::Dataset;
use crate::ollama::OllamaClient;
use crate::{RagError, Result};

/// Embedding seam so the bootstrap can be exercised without a live model
/// server.
pub trait Embedder: Send + Sync {
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

impl Embedder for OllamaClient {
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        OllamaClient::embed_batch(self, texts)
    }
}

/// What the bootstrap did, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The index already held documents; nothing was embedded or written.
    AlreadyIndexed { documents: u64 },
    /// A fresh index was built from the dataset.
    Indexed { documents: usize },
}

/// Ensure the vector index exists and is populated.
///
/// Embedding runs in batches capped by the configured ceiling so one oversized
/// dataset cannot produce an unbounded write.
pub async fn bootstrap(
    config: &Config,
    dataset: &Dataset,
    embedder: &dyn Embedder,
    store: &VectorStore,
) -> Result<IndexOutcome> {
    let existing = store.count_documents().await?;
    if existing > 0 {
        info!(
            "Vector index already holds {} documents, skipping bootstrap",
            existing
        );
        return Ok(IndexOutcome::AlreadyIndexed {
            documents: existing,
        });
    }

    let documents = build_documents(dataset);
    if documents.is_empty() {
        info!("Dataset is empty, nothing to index");
        return Ok(IndexOutcome::Indexed { documents: 0 });
    }

    let ceiling = config.retrieval.index_batch_ceiling;
    info!(
        "Indexing {} documents in batches of up to {}",
        documents.len(),
        ceiling
    );

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(documents.len() as u64).with_style(
            ProgressStyle::with_template("{bar:30} [{pos}/{len}] Indexing service records")
                .expect("style template is valid"),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut stored = 0usize;
    for chunk in documents.chunks(ceiling) {
        let texts: Vec<String> = chunk.iter().map(|doc| doc.content.clone()).collect();
        debug!("Embedding batch of {} documents", texts.len());

        let vectors = embedder
            .embed_batch(&texts)
            .map_err(|e| RagError::Embedding(format!("Failed to embed batch: {}", e)))?;
        if vectors.len() != chunk.len() {
            return Err(RagError::Embedding(format!(
                "Embedding count mismatch: sent {} texts, got {} vectors",
                chunk.len(),
                vectors.len()
            )));
        }

        let embedded: Vec<EmbeddedDocument> = chunk
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(document, vector)| EmbeddedDocument { document, vector })
            .collect();

        store.store_documents_batch(embedded).await?;
        stored += chunk.len();
        bar.set_position(stored as u64);
    }

    bar.finish_and_clear();
    info!("Indexed {} documents", stored);
    Ok(IndexOutcome::Indexed { documents: stored })
}
