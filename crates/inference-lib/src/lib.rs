//! Core library for the predictive maintenance inference service
//!
//! This crate provides the building blocks of the pipeline:
//! - Telemetry validation and lenient parsing
//! - Feature extraction with configurable schemas
//! - Scoring via a trained ONNX model or a rule-based heuristic
//! - Failure type classification
//! - The Kafka consume-score-publish stream pipeline
//! - Batch orchestration and service counters

pub mod batch;
pub mod counters;
pub mod features;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod scoring;
pub mod validate;

pub use batch::{process_batch, BatchError, BatchResponse, MAX_BATCH_SIZE};
pub use counters::{CounterSnapshot, ServiceCounters};
pub use features::{FeatureExtractor, FeatureSchema};
pub use models::*;
pub use observability::ServiceMetrics;
pub use pipeline::{PipelineConfig, PipelineState, StreamPipeline};
pub use scoring::{
    FixedNoise, HeuristicScorer, NoiseSource, OnnxBackend, RngNoise, ScoringEngine, TrainedScorer,
};
pub use validate::validate_reading;
