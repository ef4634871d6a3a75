// Configuration management module
// TOML-backed settings for the Ollama endpoint, dataset location, and
// retrieval tuning, plus an interactive editor.

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, DatasetConfig, OllamaConfig, RetrievalConfig};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
