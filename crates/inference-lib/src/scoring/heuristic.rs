//! Rule-based fallback scorer
//!
//! Priority-ordered additive rules mirroring the failure patterns of
//! the predictive-maintenance dataset. Always available; used when no
//! model artifact loads or when a model call fails.

use super::noise::NoiseSource;
use crate::models::{round4, FailureType, PredictionResult, TelemetryReading};
use std::sync::Arc;

/// Baseline confidence before any rule fires.
pub const BASE_CONFIDENCE: f64 = 0.85;

/// Anomaly score above which a reading is predicted as a failure.
pub const ALERT_THRESHOLD: f64 = 0.5;

/// Chance per call that the random-failure rule fires.
const RANDOM_FAILURE_PROBABILITY: f64 = 0.01;

pub struct HeuristicScorer {
    noise: Arc<dyn NoiseSource>,
}

impl HeuristicScorer {
    pub fn new(noise: Arc<dyn NoiseSource>) -> Self {
        Self { noise }
    }

    /// Score a reading through the rule set. Each firing rule adds to
    /// the anomaly score and overwrites the failure type, so later
    /// rules win the label.
    pub fn score(&self, reading: &TelemetryReading) -> PredictionResult {
        let mut anomaly_score: f64 = 0.0;
        let mut confidence = BASE_CONFIDENCE;
        let mut failure_type = FailureType::NoFailure;

        let temp_diff = reading.temp_diff();
        // Mechanical power in watts, same derivation as the power_w
        // feature column.
        let power_metric =
            reading.torque * (reading.rotational_speed * 2.0 * std::f64::consts::PI / 60.0);
        let wear_ratio = reading.tool_wear / 250.0;

        // Rule 1: tool wear
        if reading.tool_wear > 180.0 && reading.torque > 60.0 {
            anomaly_score += 0.4;
            failure_type = FailureType::ToolWear;
            confidence = 0.92;
        } else if reading.tool_wear > 200.0 {
            anomaly_score += 0.25;
            failure_type = FailureType::ToolWear;
            confidence = 0.88;
        }

        // Rule 2: heat dissipation
        if temp_diff > 50.0 {
            anomaly_score += 0.35;
            failure_type = FailureType::HeatDissipation;
            confidence = 0.90;
        } else if temp_diff > 40.0 {
            anomaly_score += 0.15;
        }

        // Rule 3: rotational overspeed
        if reading.rotational_speed > 2800.0 {
            anomaly_score += 0.3;
            failure_type = FailureType::Power;
            confidence = 0.87;
        }

        // Rule 4: overstrain
        if reading.torque > 70.0 && wear_ratio > 0.6 {
            anomaly_score += 0.35;
            failure_type = FailureType::Overstrain;
            confidence = 0.91;
        }

        // Rule 5: power metric outside the normal operating band
        if power_metric > 150_000.0 || power_metric < 15_000.0 {
            anomaly_score += 0.2;
        }

        // Rule 6: simulated irreducible uncertainty
        if self.noise.next_f64() < RANDOM_FAILURE_PROBABILITY {
            anomaly_score += 0.3;
            failure_type = FailureType::Random;
            confidence = 0.65;
        }

        let anomaly_score = anomaly_score.clamp(0.0, 1.0);
        let prediction = u8::from(anomaly_score > ALERT_THRESHOLD);
        if prediction == 0 {
            failure_type = FailureType::NoFailure;
        }

        // Symmetric jitter of up to +/-0.03 on the confidence.
        confidence += (self.noise.next_f64() - 0.5) * 0.06;
        let confidence = confidence.clamp(0.0, 1.0);

        PredictionResult {
            prediction,
            confidence: round4(confidence),
            anomaly_score: round4(anomaly_score),
            failure_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::noise::FixedNoise;
    use serde_json::json;

    fn scorer() -> HeuristicScorer {
        HeuristicScorer::new(Arc::new(FixedNoise(0.5)))
    }

    fn reading(value: serde_json::Value) -> TelemetryReading {
        TelemetryReading::from_json(&value)
    }

    #[test]
    fn test_nominal_reading_no_failure() {
        let r = reading(json!({
            "air_temperature": 300.0, "process_temperature": 310.0,
            "rotational_speed": 1500.0, "torque": 40.0, "tool_wear": 100.0,
        }));
        let result = scorer().score(&r);
        // Nominal power (~6.3 kW) sits below the band floor, so rule 5
        // contributes 0.2 -- still well under the alert threshold.
        assert_eq!(result.prediction, 0);
        assert_eq!(result.failure_type, FailureType::NoFailure);
        assert!((result.anomaly_score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_tool_wear_rule() {
        // tool_wear > 180 and torque > 60: +0.4 plus the low power band
        // contribution keeps the score above threshold.
        let r = reading(json!({
            "air_temperature": 300.0, "process_temperature": 310.0,
            "rotational_speed": 200.0, "torque": 65.0, "tool_wear": 190.0,
        }));
        let result = scorer().score(&r);
        assert_eq!(result.failure_type, FailureType::ToolWear);
        assert!(result.anomaly_score >= 0.4);
        assert_eq!(result.prediction, 1);
    }

    #[test]
    fn test_tool_wear_secondary_branch() {
        let r = reading(json!({
            "air_temperature": 300.0, "process_temperature": 310.0,
            "rotational_speed": 1500.0, "torque": 40.0, "tool_wear": 210.0,
        }));
        let result = scorer().score(&r);
        // 0.25 (wear) + 0.2 (power band) stays under the alert threshold.
        assert_eq!(result.prediction, 0);
        assert_eq!(result.failure_type, FailureType::NoFailure);
        assert!((result.anomaly_score - 0.45).abs() < 1e-9);
    }

    #[test]
    fn test_heat_dissipation_example() {
        // temp_diff = 65 > 50 (+0.35) plus the sub-band power
        // contribution (+0.2) crosses the alert threshold.
        let r = reading(json!({
            "machine_id": "M1", "air_temperature": 300.0,
            "process_temperature": 365.0, "rotational_speed": 1500.0,
            "torque": 40.0, "tool_wear": 100.0, "machine_type": "M",
        }));
        let result = scorer().score(&r);
        assert_eq!(result.failure_type, FailureType::HeatDissipation);
        assert_eq!(result.prediction, 1);
        assert!((result.anomaly_score - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_later_rule_overwrites_label() {
        let r = reading(json!({
            "air_temperature": 300.0, "process_temperature": 360.0,
            "rotational_speed": 2900.0, "torque": 40.0, "tool_wear": 100.0,
        }));
        let result = scorer().score(&r);
        assert_eq!(result.failure_type, FailureType::Power);
        assert_eq!(result.prediction, 1);
    }

    #[test]
    fn test_overstrain_rule() {
        let r = reading(json!({
            "air_temperature": 300.0, "process_temperature": 310.0,
            "rotational_speed": 1500.0, "torque": 75.0, "tool_wear": 170.0,
        }));
        let result = scorer().score(&r);
        assert_eq!(result.failure_type, FailureType::Overstrain);
    }

    #[test]
    fn test_random_rule_fires_when_noise_low() {
        let scorer = HeuristicScorer::new(Arc::new(FixedNoise(0.0)));
        let r = reading(json!({
            "air_temperature": 300.0, "process_temperature": 355.0,
            "rotational_speed": 1500.0, "torque": 40.0, "tool_wear": 100.0,
        }));
        let result = scorer.score(&r);
        // 0.35 (heat) + 0.2 (power band) + 0.3 (random) > 0.5
        assert_eq!(result.failure_type, FailureType::Random);
        assert_eq!(result.prediction, 1);
        // Jitter at noise 0.0 pulls confidence down by 0.03.
        assert!((result.confidence - 0.62).abs() < 1e-9);
    }

    #[test]
    fn test_scores_clamped_for_extreme_input() {
        let r = reading(json!({
            "air_temperature": 250.0, "process_temperature": 400.0,
            "rotational_speed": 10000.0, "torque": 300.0, "tool_wear": 500.0,
        }));
        let result = scorer().score(&r);
        assert!(result.anomaly_score <= 1.0);
        assert!(result.anomaly_score >= 0.0);
        assert!((0.0..=1.0).contains(&result.confidence));
        assert_eq!(result.prediction, 1);
    }

    #[test]
    fn test_prediction_zero_iff_no_failure() {
        let cases = [
            json!({"tool_wear": 210.0}),
            json!({"process_temperature": 365.0}),
            json!({"rotational_speed": 2900.0}),
            json!({"torque": 75.0, "tool_wear": 170.0}),
            json!({}),
        ];
        for case in cases {
            let result = scorer().score(&reading(case));
            assert_eq!(
                result.prediction == 0,
                result.failure_type == FailureType::NoFailure
            );
        }
    }
}
