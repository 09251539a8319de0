//! Service configuration

use anyhow::Result;
use serde::Deserialize;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// API server port for predictions, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Kafka bootstrap servers
    #[serde(default = "default_kafka_brokers")]
    pub kafka_brokers: String,

    /// Topic carrying raw telemetry readings
    #[serde(default = "default_input_topic")]
    pub input_topic: String,

    /// Topic the enriched predictions are published to
    #[serde(default = "default_output_topic")]
    pub output_topic: String,

    /// Kafka consumer group id
    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    /// Path to the trained ONNX model artifact
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Optional JSON file listing feature columns; overrides the profile
    #[serde(default)]
    pub schema_path: Option<String>,

    /// Named feature profile used when no schema file is given
    #[serde(default = "default_feature_profile")]
    pub feature_profile: String,
}

fn default_api_port() -> u16 {
    8000
}

fn default_kafka_brokers() -> String {
    std::env::var("KAFKA_BROKER").unwrap_or_else(|_| "localhost:9092".to_string())
}

fn default_input_topic() -> String {
    "machine-data".to_string()
}

fn default_output_topic() -> String {
    "prediction-data".to_string()
}

fn default_consumer_group() -> String {
    "ml-rust-consumers".to_string()
}

fn default_model_path() -> String {
    "./model/model.onnx".to_string()
}

fn default_feature_profile() -> String {
    "minimal".to_string()
}

impl ServiceConfig {
    /// Load configuration from environment variables (INFERENCE_ prefix)
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("INFERENCE"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| ServiceConfig {
            api_port: default_api_port(),
            kafka_brokers: default_kafka_brokers(),
            input_topic: default_input_topic(),
            output_topic: default_output_topic(),
            consumer_group: default_consumer_group(),
            model_path: default_model_path(),
            schema_path: None,
            feature_profile: default_feature_profile(),
        }))
    }
}
