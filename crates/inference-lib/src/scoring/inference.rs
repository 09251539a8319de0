//! Trained-model scoring via tract
//!
//! Loads an ONNX binary-failure classifier and scores feature vectors
//! with it. The model backend sits behind a trait so the engine's
//! fallback path can be exercised without a real artifact.

use super::classify::classify_failure;
use super::ScoreError;
use crate::features::FeatureExtractor;
use crate::models::{round4, FailureType, FeatureVector, PredictionResult, TelemetryReading};
use anyhow::Context;
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::debug;

/// Confidence reported when the model emits a bare class score
/// instead of per-class probabilities.
pub const FALLBACK_CONFIDENCE: f64 = 0.85;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Raw inference capability: feature vector in, class scores out.
pub trait ModelBackend: Send + Sync {
    fn infer(&self, features: &FeatureVector) -> Result<Vec<f32>, ScoreError>;
}

/// ONNX backend running an optimized tract plan.
pub struct OnnxBackend {
    model: TractModel,
    num_features: usize,
}

impl OnnxBackend {
    pub fn from_path(path: impl AsRef<Path>, num_features: usize) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read model artifact {}", path.display()))?;
        Self::from_bytes(&bytes, num_features)
    }

    pub fn from_bytes(bytes: &[u8], num_features: usize) -> anyhow::Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .context("failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, num_features]).into())
            .context("failed to set input shape")?
            .into_optimized()
            .context("failed to optimize model")?
            .into_runnable()
            .context("failed to create runnable model")?;
        Ok(Self {
            model,
            num_features,
        })
    }
}

impl ModelBackend for OnnxBackend {
    fn infer(&self, features: &FeatureVector) -> Result<Vec<f32>, ScoreError> {
        if features.values.len() != self.num_features {
            return Err(ScoreError::ShapeMismatch {
                got: features.values.len(),
                expected: self.num_features,
            });
        }

        let input = tract_ndarray::Array2::from_shape_vec(
            (1, self.num_features),
            features.values.clone(),
        )
        .map_err(|e| ScoreError::Inference(e.to_string()))?;

        let result = self
            .model
            .run(tvec!(Tensor::from(input).into()))
            .map_err(|e| ScoreError::Inference(e.to_string()))?;
        let output = result
            .first()
            .ok_or_else(|| ScoreError::Inference("model produced no output".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| ScoreError::Inference(e.to_string()))?;
        Ok(view.iter().copied().collect())
    }
}

/// Scores readings with a trained model: extract features per the
/// deployed schema, run the backend, derive confidence and a composite
/// anomaly score, and label positives through the failure classifier.
pub struct TrainedScorer {
    backend: Box<dyn ModelBackend>,
    extractor: FeatureExtractor,
}

impl TrainedScorer {
    pub fn new(backend: Box<dyn ModelBackend>, extractor: FeatureExtractor) -> Self {
        Self { backend, extractor }
    }

    pub fn score(&self, reading: &TelemetryReading) -> Result<PredictionResult, ScoreError> {
        let start = Instant::now();
        let features = self.extractor.extract(reading);
        let outputs = self.backend.infer(&features)?;

        let (prediction, confidence) = interpret_outputs(&outputs)?;
        let anomaly_score = composite_anomaly_score(reading, confidence, prediction);
        let failure_type = if prediction == 1 {
            classify_failure(reading)
        } else {
            FailureType::NoFailure
        };

        debug!(
            elapsed_us = start.elapsed().as_micros() as u64,
            prediction, "Model inference completed"
        );

        Ok(PredictionResult {
            prediction,
            confidence: round4(confidence),
            anomaly_score: round4(anomaly_score),
            failure_type,
        })
    }
}

/// Map raw model outputs to (class, confidence). Two or more values
/// are treated as class probabilities; a single value as a failure
/// score with the fixed fallback confidence.
fn interpret_outputs(outputs: &[f32]) -> Result<(u8, f64), ScoreError> {
    match outputs {
        [] => Err(ScoreError::Inference(
            "model output was empty".to_string(),
        )),
        [score] => Ok((u8::from(*score > 0.5), FALLBACK_CONFIDENCE)),
        probs => {
            let (class, max) = probs
                .iter()
                .enumerate()
                .fold((0usize, f32::MIN), |(ci, cv), (i, &v)| {
                    if v > cv {
                        (i, v)
                    } else {
                        (ci, cv)
                    }
                });
            Ok((u8::from(class != 0), f64::from(max).clamp(0.0, 1.0)))
        }
    }
}

/// Composite anomaly score comparable with the heuristic scorer's:
/// confidence-derived base plus boosts for extreme sensor values.
pub(crate) fn composite_anomaly_score(
    reading: &TelemetryReading,
    confidence: f64,
    prediction: u8,
) -> f64 {
    let base = if prediction == 1 {
        confidence
    } else {
        1.0 - confidence
    };

    let mut boost = 0.0;
    if reading.torque > 65.0 {
        boost += 0.1;
    }
    if reading.tool_wear > 180.0 {
        boost += 0.1;
    }
    if reading.temp_diff() > 45.0 {
        boost += 0.1;
    }

    (base + boost).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSchema;
    use serde_json::json;

    /// Backend returning canned probabilities.
    struct StubBackend(Vec<f32>);

    impl ModelBackend for StubBackend {
        fn infer(&self, _features: &FeatureVector) -> Result<Vec<f32>, ScoreError> {
            Ok(self.0.clone())
        }
    }

    fn scorer(outputs: Vec<f32>) -> TrainedScorer {
        TrainedScorer::new(
            Box::new(StubBackend(outputs)),
            FeatureExtractor::new(FeatureSchema::minimal()),
        )
    }

    fn reading(value: serde_json::Value) -> TelemetryReading {
        TelemetryReading::from_json(&value)
    }

    #[test]
    fn test_negative_prediction() {
        let result = scorer(vec![0.9, 0.1]).score(&reading(json!({}))).unwrap();
        assert_eq!(result.prediction, 0);
        assert_eq!(result.failure_type, FailureType::NoFailure);
        assert!((result.confidence - 0.9).abs() < 1e-6);
        // Base anomaly is 1 - confidence for negatives.
        assert!((result.anomaly_score - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_positive_prediction_classified() {
        let r = reading(json!({
            "air_temperature": 300.0, "process_temperature": 350.0,
        }));
        let result = scorer(vec![0.2, 0.8]).score(&r).unwrap();
        assert_eq!(result.prediction, 1);
        assert_eq!(result.failure_type, FailureType::HeatDissipation);
        // 0.8 base + 0.1 temp_diff boost
        assert!((result.anomaly_score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_single_output_uses_fallback_confidence() {
        let result = scorer(vec![0.7]).score(&reading(json!({}))).unwrap();
        assert_eq!(result.prediction, 1);
        assert!((result.confidence - FALLBACK_CONFIDENCE).abs() < 1e-9);
    }

    #[test]
    fn test_empty_output_is_inference_error() {
        let err = scorer(vec![]).score(&reading(json!({}))).unwrap_err();
        assert!(matches!(err, ScoreError::Inference(_)));
    }

    #[test]
    fn test_composite_score_boosts_and_clamps() {
        let r = reading(json!({
            "air_temperature": 300.0, "process_temperature": 350.0,
            "torque": 70.0, "tool_wear": 200.0,
        }));
        // 0.95 base + 0.3 boosts clamps at 1.0
        assert_eq!(composite_anomaly_score(&r, 0.95, 1), 1.0);
        // Negative prediction uses 1 - confidence as base.
        let calm = reading(json!({}));
        assert!((composite_anomaly_score(&calm, 0.95, 0) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_shape_mismatch_detected() {
        struct StrictBackend;
        impl ModelBackend for StrictBackend {
            fn infer(&self, features: &FeatureVector) -> Result<Vec<f32>, ScoreError> {
                Err(ScoreError::ShapeMismatch {
                    got: features.values.len(),
                    expected: 10,
                })
            }
        }
        let scorer = TrainedScorer::new(
            Box::new(StrictBackend),
            FeatureExtractor::new(FeatureSchema::minimal()),
        );
        let err = scorer.score(&reading(json!({}))).unwrap_err();
        assert!(matches!(
            err,
            ScoreError::ShapeMismatch {
                got: 6,
                expected: 10
            }
        ));
    }
}
