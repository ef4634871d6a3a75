// Interactive configuration editor built on dialoguer.

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};

use super::settings::Config;

/// Print the current configuration to stdout.
#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("{}", style("Current configuration").bold());
    println!("  Config file: {}", config.config_file_path().display());
    println!();
    println!(
        "  Ollama endpoint:   {}://{}:{}",
        config.ollama.protocol, config.ollama.host, config.ollama.port
    );
    println!("  Embedding model:   {}", config.ollama.embedding_model);
    println!("  Generation model:  {}", config.ollama.generation_model);
    println!("  Embedding batch:   {}", config.ollama.batch_size);
    println!("  Vector dimension:  {}", config.ollama.embedding_dimension);
    println!();
    println!("  Dataset path:      {}", config.dataset.path.display());
    println!("  Retrieval top-k:   {}", config.retrieval.top_k);
    println!(
        "  Index batch limit: {}",
        config.retrieval.index_batch_ceiling
    );

    Ok(())
}

/// Walk the user through the connection and dataset settings and persist the
/// result.
#[inline]
pub fn run_interactive_config() -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    println!("{}", style("servicelog-rag configuration").bold());
    println!("Press Enter to keep the current value.");
    println!();

    config.ollama.host = Input::new()
        .with_prompt("Ollama host")
        .default(config.ollama.host.clone())
        .interact_text()
        .context("Failed to read host")?;

    config.ollama.port = Input::new()
        .with_prompt("Ollama port")
        .default(config.ollama.port)
        .interact_text()
        .context("Failed to read port")?;

    config.ollama.embedding_model = Input::new()
        .with_prompt("Embedding model")
        .default(config.ollama.embedding_model.clone())
        .interact_text()
        .context("Failed to read embedding model")?;

    config.ollama.generation_model = Input::new()
        .with_prompt("Generation model")
        .default(config.ollama.generation_model.clone())
        .interact_text()
        .context("Failed to read generation model")?;

    let dataset_path: String = Input::new()
        .with_prompt("Dataset CSV path")
        .default(config.dataset.path.display().to_string())
        .interact_text()
        .context("Failed to read dataset path")?;
    config.dataset.path = dataset_path.into();

    config
        .validate()
        .context("Configuration validation failed")?;

    let save = Confirm::new()
        .with_prompt("Save this configuration?")
        .default(true)
        .interact()
        .context("Failed to read confirmation")?;

    if save {
        config.save().context("Failed to save configuration")?;
        println!(
            "Configuration saved to {}",
            config.config_file_path().display()
        );
    } else {
        println!("Configuration not saved.");
    }

    Ok(())
}
