use super::*;

#[test]
fn defaults_are_valid() {
    let config = Config {
        ollama: OllamaConfig::default(),
        dataset: DatasetConfig::default(),
        retrieval: RetrievalConfig::default(),
        base_dir: PathBuf::from("/tmp"),
    };

    assert!(config.validate().is_ok());
    assert_eq!(config.retrieval.top_k, 100);
    assert_eq!(config.retrieval.index_batch_ceiling, 5000);
    assert_eq!(config.dataset.path, PathBuf::from("machine_service.csv"));
}

#[test]
fn load_from_missing_dir_uses_defaults() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config::load_from(dir.path().join("does-not-exist")).expect("Failed to load");

    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.retrieval, RetrievalConfig::default());
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut config = Config::load_from(dir.path()).expect("Failed to load");
    config.ollama.host = "ollama.internal".to_string();
    config.ollama.generation_model = "llama3:8b".to_string();
    config.retrieval.top_k = 25;
    config.save().expect("Failed to save");

    let reloaded = Config::load_from(dir.path()).expect("Failed to reload");
    assert_eq!(reloaded.ollama.host, "ollama.internal");
    assert_eq!(reloaded.ollama.generation_model, "llama3:8b");
    assert_eq!(reloaded.retrieval.top_k, 25);
}

#[test]
fn rejects_invalid_protocol() {
    let ollama = OllamaConfig {
        protocol: "ftp".to_string(),
        ..OllamaConfig::default()
    };

    assert!(matches!(
        ollama.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));
}

#[test]
fn rejects_empty_model_names() {
    let ollama = OllamaConfig {
        generation_model: "  ".to_string(),
        ..OllamaConfig::default()
    };

    assert!(matches!(ollama.validate(), Err(ConfigError::InvalidModel(_))));
}

#[test]
fn rejects_out_of_range_batch_size() {
    let mut ollama = OllamaConfig {
        batch_size: 0,
        ..OllamaConfig::default()
    };
    assert!(matches!(
        ollama.validate(),
        Err(ConfigError::InvalidBatchSize(0))
    ));

    ollama.batch_size = 1001;
    assert!(matches!(
        ollama.validate(),
        Err(ConfigError::InvalidBatchSize(1001))
    ));
}

#[test]
fn rejects_oversized_index_batch_ceiling() {
    let mut config = Config {
        ollama: OllamaConfig::default(),
        dataset: DatasetConfig::default(),
        retrieval: RetrievalConfig::default(),
        base_dir: PathBuf::from("/tmp"),
    };
    config.retrieval.index_batch_ceiling = 5001;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidIndexBatchCeiling(5001))
    ));
}

#[test]
fn rejects_zero_top_k() {
    let mut config = Config {
        ollama: OllamaConfig::default(),
        dataset: DatasetConfig::default(),
        retrieval: RetrievalConfig::default(),
        base_dir: PathBuf::from("/tmp"),
    };
    config.retrieval.top_k = 0;

    assert!(matches!(config.validate(), Err(ConfigError::InvalidTopK(0))));
}

#[test]
fn ollama_url_includes_host_and_port() {
    let ollama = OllamaConfig::default();
    let url = ollama.url().expect("Failed to build URL");

    assert_eq!(url.host_str(), Some("localhost"));
    assert_eq!(url.port(), Some(11434));
}
