//! Failure-mode classification for positive model predictions
//!
//! The trained model is binary, so when it flags a failure the label
//! comes from this priority-ordered rule set instead of the rule that
//! happened to fire in the heuristic scorer.

use crate::models::{FailureType, TelemetryReading};

/// Name the most likely failure mode for a reading. First match wins.
pub fn classify_failure(reading: &TelemetryReading) -> FailureType {
    let temp_diff = reading.temp_diff();

    if reading.tool_wear > 180.0 && reading.torque > 55.0 {
        FailureType::ToolWear
    } else if temp_diff > 45.0 {
        FailureType::HeatDissipation
    } else if reading.torque > 70.0 && reading.tool_wear > 150.0 {
        FailureType::Overstrain
    } else if reading.rotational_speed > 2700.0 {
        FailureType::Power
    } else {
        FailureType::Random
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(value: serde_json::Value) -> TelemetryReading {
        TelemetryReading::from_json(&value)
    }

    #[test]
    fn test_tool_wear_takes_priority() {
        // Also satisfies the heat condition; tool wear wins.
        let r = reading(json!({
            "air_temperature": 300.0, "process_temperature": 350.0,
            "tool_wear": 190.0, "torque": 60.0,
        }));
        assert_eq!(classify_failure(&r), FailureType::ToolWear);
    }

    #[test]
    fn test_heat_dissipation() {
        let r = reading(json!({
            "air_temperature": 300.0, "process_temperature": 350.0,
        }));
        assert_eq!(classify_failure(&r), FailureType::HeatDissipation);
    }

    #[test]
    fn test_overstrain() {
        let r = reading(json!({"torque": 75.0, "tool_wear": 160.0}));
        assert_eq!(classify_failure(&r), FailureType::Overstrain);
    }

    #[test]
    fn test_power() {
        let r = reading(json!({"rotational_speed": 2750.0}));
        assert_eq!(classify_failure(&r), FailureType::Power);
    }

    #[test]
    fn test_random_fallthrough() {
        let r = reading(json!({}));
        assert_eq!(classify_failure(&r), FailureType::Random);
    }
}
