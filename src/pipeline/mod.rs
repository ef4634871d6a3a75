// Query-routing pipeline
//
// One question per turn: classify, then either synthesize-and-run an analysis
// snippet or retrieve similar records; compose the final answer with the
// generation model; fall back to hand-coded statistics when nothing else
// produced an answer. Every component failure is absorbed here and converted
// into strategy fallback; only an explicit quit ever ends the loop.

#[cfg(test)]
mod tests;

pub mod classifier;
pub mod fallback;
pub mod synthesizer;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::analysis::Analyst;
use crate::database::RecordDocument;
use crate::database::lancedb::vector_store::VectorStore;
use crate::dataset::Dataset;
use crate::ollama::OllamaClient;
use classifier::QueryKind;

/// Final answer when no strategy produced anything.
pub const NOT_FOUND_MESSAGE: &str =
    "Could not find relevant information in the service records for this question.";

/// Final answer when retrieval succeeded but the generation model is down.
pub const MODEL_UNAVAILABLE_MESSAGE: &str =
    "The language model is currently unavailable, so this question could not be answered. \
     Please try again.";

/// Completion service seam: a pure, possibly-slow, possibly-failing function
/// from prompt to text.
pub trait Completer: Send + Sync {
    fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Semantic retrieval seam. Implementations must return an empty sequence,
/// never an error, when nothing is close or the index is empty.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, question: &str, k: usize) -> Vec<RecordDocument>;
}

/// Retriever backed by the Ollama embedding model and the LanceDB index.
pub struct SemanticRetriever {
    client: Arc<OllamaClient>,
    store: Arc<VectorStore>,
}

impl SemanticRetriever {
    #[inline]
    pub fn new(client: Arc<OllamaClient>, store: Arc<VectorStore>) -> Self {
        Self { client, store }
    }
}

#[async_trait]
impl Retriever for SemanticRetriever {
    async fn retrieve(&self, question: &str, k: usize) -> Vec<RecordDocument> {
        let query_vector = match self.client.embed(question) {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Failed to embed question, treating retrieval as empty: {}", e);
                return Vec::new();
            }
        };

        match self.store.search_similar(&query_vector, k).await {
            Ok(results) => results.into_iter().map(|r| r.document).collect(),
            Err(e) => {
                warn!("Vector search failed, treating retrieval as empty: {}", e);
                Vec::new()
            }
        }
    }
}

/// The per-turn orchestrator. Holds the shared read-only dataset and the
/// external collaborators; constructed once at startup and reused for every
/// question.
pub struct QueryPipeline {
    dataset: Arc<Dataset>,
    retriever: Arc<dyn Retriever>,
    completer: Arc<dyn Completer>,
    top_k: usize,
}

impl QueryPipeline {
    #[inline]
    pub fn new(
        dataset: Arc<Dataset>,
        retriever: Arc<dyn Retriever>,
        completer: Arc<dyn Completer>,
        top_k: usize,
    ) -> Self {
        Self {
            dataset,
            retriever,
            completer,
            top_k,
        }
    }

    /// Resolve one question to a final answer. Never errors; every failure
    /// along the way falls through to the next strategy.
    #[inline]
    pub async fn answer(&self, question: &str) -> String {
        let kind = classifier::classify(question);
        debug!("Classified question as {:?}", kind);

        if kind == QueryKind::Quantitative {
            let analyst = Analyst::new(&*self.completer);
            if let Some(value) = analyst.analyze(question, &self.dataset) {
                match synthesizer::explain_result(&*self.completer, question, &value) {
                    Ok(text) => return text,
                    Err(e) => {
                        warn!("Result explanation failed, falling through: {}", e);
                    }
                }
            } else {
                debug!("Analysis produced no result, falling through to retrieval");
            }
        }

        let documents = self.retriever.retrieve(question, self.top_k).await;
        if documents.is_empty() {
            debug!("Retrieval returned nothing, trying fallback statistics");
            if let Some(text) = fallback::fallback_answer(question, &self.dataset) {
                return text;
            }
            return NOT_FOUND_MESSAGE.to_string();
        }

        match synthesizer::grounded_answer(&*self.completer, question, &documents) {
            Ok(text) => text,
            Err(e) => {
                warn!("Grounded answer synthesis failed: {}", e);
                fallback::fallback_answer(question, &self.dataset)
                    .unwrap_or_else(|| MODEL_UNAVAILABLE_MESSAGE.to_string())
            }
        }
    }
}
