use clap::{Parser, Subcommand};
use servicelog_rag::commands::{build_index, run_ask_loop, show_status};
use servicelog_rag::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "servicelog-rag")]
#[command(about = "Question answering over machine service records with local models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive question loop
    Ask {
        /// Path to the service records CSV, overriding the configured path
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Build the vector index without starting the question loop
    Index {
        /// Path to the service records CSV, overriding the configured path
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Show dataset, model server, and index status
    Status,
    /// Configure Ollama connection and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask { data } => {
            run_ask_loop(data).await?;
        }
        Commands::Index { data } => {
            build_index(data).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
    }

    Ok(())
}
