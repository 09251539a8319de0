//! Failure scoring engine
//!
//! Polymorphic over two prediction strategies: a trained ONNX model
//! and a rule-based heuristic. The heuristic is always constructed so
//! a failing model call degrades to it for that single call instead of
//! surfacing an error.

mod classify;
mod heuristic;
mod inference;
mod noise;

pub use classify::classify_failure;
pub use heuristic::{HeuristicScorer, ALERT_THRESHOLD, BASE_CONFIDENCE};
pub use inference::{ModelBackend, OnnxBackend, TrainedScorer, FALLBACK_CONFIDENCE};
pub use noise::{FixedNoise, NoiseSource, RngNoise};

use crate::models::{PredictionResult, TelemetryReading};
use crate::observability::ServiceMetrics;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Errors from the trained-model path. All variants are transient:
/// the engine answers them with the heuristic fallback.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("model inference failed: {0}")]
    Inference(String),
    #[error("feature vector has {got} values, model expects {expected}")]
    ShapeMismatch { got: usize, expected: usize },
}

/// Which strategy the engine was assembled with at startup.
enum ScorerKind {
    Trained(TrainedScorer),
    Heuristic,
}

/// Uniform scoring surface shared by the stream pipeline and the HTTP
/// handlers. Immutable after startup; safe to share behind an `Arc`.
pub struct ScoringEngine {
    kind: ScorerKind,
    heuristic: HeuristicScorer,
    metrics: ServiceMetrics,
}

impl ScoringEngine {
    /// Engine with only the rule-based scorer (no model artifact).
    pub fn heuristic_only(noise: Arc<dyn NoiseSource>) -> Self {
        Self {
            kind: ScorerKind::Heuristic,
            heuristic: HeuristicScorer::new(noise),
            metrics: ServiceMetrics::new(),
        }
    }

    /// Engine preferring the trained model, with heuristic fallback.
    pub fn with_model(trained: TrainedScorer, noise: Arc<dyn NoiseSource>) -> Self {
        Self {
            kind: ScorerKind::Trained(trained),
            heuristic: HeuristicScorer::new(noise),
            metrics: ServiceMetrics::new(),
        }
    }

    pub fn model_loaded(&self) -> bool {
        matches!(self.kind, ScorerKind::Trained(_))
    }

    /// Score one reading. Never fails: an inference error falls
    /// through to the heuristic for this call only.
    pub fn score(&self, reading: &TelemetryReading) -> PredictionResult {
        let start = std::time::Instant::now();
        let result = match &self.kind {
            ScorerKind::Trained(trained) => match trained.score(reading) {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Model inference failed, using heuristic fallback");
                    self.metrics.inc_model_fallbacks();
                    self.heuristic.score(reading)
                }
            },
            ScorerKind::Heuristic => self.heuristic.score(reading),
        };
        self.metrics
            .observe_inference_latency(start.elapsed().as_secs_f64());
        result
    }
}
