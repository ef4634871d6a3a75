use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::config::Config;
use crate::database::lancedb::vector_store::VectorStore;
use crate::dataset::Dataset;
use crate::indexer::{self, IndexOutcome};
use crate::ollama::OllamaClient;
use crate::pipeline::{QueryPipeline, SemanticRetriever};

/// True when the input line asks to end the interactive session.
fn is_quit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "q" | "quit" | "exit")
}

/// Load the dataset from the CLI override or the configured path.
fn load_dataset(config: &Config, data: Option<PathBuf>) -> Result<Dataset> {
    let path = data.unwrap_or_else(|| config.dataset.path.clone());
    Dataset::load(&path).with_context(|| format!("Failed to load dataset from {}", path.display()))
}

/// Connect to Ollama and the vector store, then make sure the index holds the
/// dataset. Shared by the ask loop and the index command.
async fn prepare(
    config: &Config,
    dataset: &Dataset,
) -> Result<(Arc<OllamaClient>, Arc<VectorStore>, IndexOutcome)> {
    let client = Arc::new(OllamaClient::new(config).context("Failed to create Ollama client")?);

    // A degraded model server is not fatal here: retrieval and analysis
    // degrade per question, and the fallback statistics still work offline.
    if let Err(e) = client.health_check() {
        warn!("Ollama health check failed: {}", e);
        println!(
            "Warning: Ollama at {}:{} is not healthy ({}). Answers may be limited to built-in statistics.",
            config.ollama.host, config.ollama.port, e
        );
    }

    let store = Arc::new(
        VectorStore::new(config)
            .await
            .context("Failed to initialize vector store")?,
    );

    let outcome = indexer::bootstrap(config, dataset, client.as_ref(), store.as_ref())
        .await
        .context("Failed to bootstrap the vector index")?;

    Ok((client, store, outcome))
}

fn report_outcome(outcome: IndexOutcome) {
    match outcome {
        IndexOutcome::AlreadyIndexed { documents } => {
            println!(
                "Vector index already contains {} documents, reusing it.",
                documents
            );
        }
        IndexOutcome::Indexed { documents } => {
            println!("Indexed {} service records.", documents);
        }
    }
}

/// Interactive question loop over the maintenance log.
#[inline]
pub async fn run_ask_loop(data: Option<PathBuf>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let dataset = load_dataset(&config, data)?;
    println!(
        "Loaded {} service records ({}).",
        dataset.row_count(),
        Dataset::schema_description()
    );

    let (client, store, outcome) = prepare(&config, &dataset).await?;
    report_outcome(outcome);

    let dataset = Arc::new(dataset);
    let retriever = Arc::new(SemanticRetriever::new(Arc::clone(&client), store));
    let pipeline = QueryPipeline::new(
        Arc::clone(&dataset),
        retriever,
        client,
        config.retrieval.top_k,
    );

    println!();
    println!(
        "{}",
        style("Ask questions about the machine service records. Type 'q' to quit.").bold()
    );

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"\nAsk your question (q to quit): ").await?;
        stdout.flush().await?;

        // EOF ends the session the same way an explicit quit does.
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_quit(question) {
            break;
        }

        info!("Answering question: {}", question);
        let answer = pipeline.answer(question).await;
        println!("\n{}", answer);
    }

    Ok(())
}

/// Build (or reuse) the vector index without entering the ask loop.
#[inline]
pub async fn build_index(data: Option<PathBuf>) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let dataset = load_dataset(&config, data)?;
    println!("Loaded {} service records.", dataset.row_count());

    let (_client, _store, outcome) = prepare(&config, &dataset).await?;
    report_outcome(outcome);

    Ok(())
}

/// Report connectivity and index state.
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_else(|_| Config {
        ollama: Default::default(),
        dataset: Default::default(),
        retrieval: Default::default(),
        base_dir: Config::config_dir().unwrap_or_default(),
    });

    println!("{}", style("Service Log RAG Status").bold());
    println!("{}", "=".repeat(40));

    println!("Dataset:");
    match Dataset::load(&config.dataset.path) {
        Ok(dataset) => {
            println!(
                "  {} {} ({} records)",
                style("ok").green(),
                config.dataset.path.display(),
                dataset.row_count()
            );
        }
        Err(e) => {
            println!(
                "  {} {} ({})",
                style("missing").red(),
                config.dataset.path.display(),
                e
            );
        }
    }

    println!("Ollama:");
    match OllamaClient::new(&config) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "  {} connected ({}:{})",
                    style("ok").green(),
                    config.ollama.host,
                    config.ollama.port
                );
                println!("  embedding model: {}", config.ollama.embedding_model);
                println!("  generation model: {}", config.ollama.generation_model);
            }
            Err(e) => {
                println!("  {} reachable but unhealthy: {}", style("warn").yellow(), e);
            }
        },
        Err(e) => {
            println!("  {} failed to connect: {}", style("err").red(), e);
        }
    }

    println!("Vector index:");
    match VectorStore::new(&config).await {
        Ok(store) => match store.count_documents().await {
            Ok(count) => {
                println!("  {} {} documents", style("ok").green(), count);
            }
            Err(e) => {
                println!("  {} opened but unreadable: {}", style("warn").yellow(), e);
            }
        },
        Err(e) => {
            println!("  {} failed to open: {}", style("err").red(), e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_commands_end_the_session() {
        assert!(is_quit("q"));
        assert!(is_quit("quit"));
        assert!(is_quit("exit"));
    }

    #[test]
    fn quit_matching_is_case_insensitive() {
        assert!(is_quit("Q"));
        assert!(is_quit("QUIT"));
        assert!(is_quit("Exit"));
    }

    #[test]
    fn questions_are_not_quit_commands() {
        assert!(!is_quit("how many records are there?"));
        assert!(!is_quit("quit the leaking"));
        assert!(!is_quit("q "));
        assert!(!is_quit(""));
    }
}
