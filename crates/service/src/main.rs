//! Predictive maintenance inference service
//!
//! Runs the Kafka stream pipeline and the HTTP prediction API in one
//! process, sharing a single scoring engine between them.

use anyhow::Result;
use inference_lib::{
    FeatureExtractor, FeatureSchema, OnnxBackend, PipelineConfig, RngNoise, ScoringEngine,
    ServiceCounters, ServiceMetrics, StreamPipeline, TrainedScorer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting inference-service");

    // Load configuration
    let config = config::ServiceConfig::load()?;
    info!(
        brokers = %config.kafka_brokers,
        input_topic = %config.input_topic,
        output_topic = %config.output_topic,
        "Service configured"
    );

    let schema = match &config.schema_path {
        Some(path) => FeatureSchema::from_file(path)?,
        None => FeatureSchema::profile(&config.feature_profile)?,
    };
    info!(features = schema.len(), "Feature schema resolved");

    // A missing or unreadable model is not fatal: the heuristic scorer
    // keeps the service answering until an artifact is deployed.
    let noise = Arc::new(RngNoise::from_entropy());
    let engine = match OnnxBackend::from_path(&config.model_path, schema.len()) {
        Ok(backend) => {
            info!(model_path = %config.model_path, "Loaded ONNX model");
            let trained = TrainedScorer::new(Box::new(backend), FeatureExtractor::new(schema));
            Arc::new(ScoringEngine::with_model(trained, noise))
        }
        Err(e) => {
            warn!(
                model_path = %config.model_path,
                error = %e,
                "Model unavailable, falling back to heuristic scoring"
            );
            Arc::new(ScoringEngine::heuristic_only(noise))
        }
    };

    let counters = Arc::new(ServiceCounters::new());
    let metrics = ServiceMetrics::new();

    let pipeline = Arc::new(StreamPipeline::new(
        PipelineConfig {
            brokers: config.kafka_brokers.clone(),
            input_topic: config.input_topic.clone(),
            output_topic: config.output_topic.clone(),
            consumer_group: config.consumer_group.clone(),
        },
        engine.clone(),
        counters.clone(),
    ));

    let app_state = Arc::new(api::AppState {
        engine,
        counters,
        pipeline: pipeline.clone(),
        metrics,
        config: config.clone(),
    });

    let (shutdown_tx, _) = broadcast::channel(1);

    let mut pipeline_handle = tokio::spawn(pipeline.run(shutdown_tx.subscribe()));
    let mut api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Run until SIGINT or until either long-lived task fails
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("SIGINT received, shutting down");
        }
        result = &mut pipeline_handle => {
            api_handle.abort();
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(e.into()),
            };
        }
        result = &mut api_handle => {
            pipeline_handle.abort();
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(e.into()),
            };
        }
    }

    // Signal the pipeline to drain and give it a bounded window
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut pipeline_handle).await {
        Ok(Ok(Ok(()))) => info!("Stream pipeline drained"),
        Ok(Ok(Err(e))) => warn!(error = %e, "Pipeline exited with error during shutdown"),
        Ok(Err(e)) => warn!(error = %e, "Pipeline task failed during shutdown"),
        Err(_) => {
            warn!("Shutdown grace period expired, aborting pipeline");
            pipeline_handle.abort();
        }
    }
    api_handle.abort();

    info!("Shutdown complete");
    Ok(())
}
