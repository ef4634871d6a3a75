use super::*;
use crate::config::{Config, DatasetConfig, OllamaConfig, RetrievalConfig};
use std::path::PathBuf;

fn test_config() -> Config {
    Config {
        ollama: OllamaConfig {
            protocol: "http".to_string(),
            host: "test-host".to_string(),
            port: 1234,
            embedding_model: "embed-model".to_string(),
            generation_model: "gen-model".to_string(),
            batch_size: 128,
            embedding_dimension: 1024,
        },
        dataset: DatasetConfig::default(),
        retrieval: RetrievalConfig::default(),
        base_dir: PathBuf::from("/tmp"),
    }
}

#[test]
fn client_configuration() {
    let client = OllamaClient::new(&test_config()).expect("Failed to create client");

    assert_eq!(client.embedding_model, "embed-model");
    assert_eq!(client.generation_model, "gen-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn client_builder_methods() {
    let client = OllamaClient::new(&test_config())
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(60))
        .with_retry_attempts(5);

    assert_eq!(client.retry_attempts, 5);
}

#[test]
fn validate_model_distinguishes_present_and_missing() {
    let client = OllamaClient::new(&test_config()).expect("Failed to create client");
    let models = vec![
        ModelInfo {
            name: "embed-model".to_string(),
            size: None,
            digest: None,
        },
        ModelInfo {
            name: "gen-model".to_string(),
            size: None,
            digest: None,
        },
    ];

    assert!(client.validate_model(&models, "embed-model").is_ok());
    assert!(client.validate_model(&models, "missing-model").is_err());
}

#[test]
fn embed_batch_of_nothing_is_empty() {
    let client = OllamaClient::new(&test_config()).expect("Failed to create client");

    let embeddings = client.embed_batch(&[]).expect("Empty batch should succeed");
    assert!(embeddings.is_empty());
}
