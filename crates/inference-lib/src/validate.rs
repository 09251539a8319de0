//! Input validation for caller-supplied readings
//!
//! Collects every violation in one pass so callers can report all
//! problems at once. Validation never fails; an empty list means the
//! reading is acceptable.

use crate::models::{as_f64_lenient, MachineType};
use serde_json::Value;

/// Required numeric fields with their physical ranges and units.
const REQUIRED_FIELDS: [(&str, f64, f64, &str); 5] = [
    ("air_temperature", 250.0, 400.0, "Kelvin"),
    ("process_temperature", 250.0, 400.0, "Kelvin"),
    ("rotational_speed", 0.0, 10_000.0, "rpm"),
    ("torque", 0.0, 300.0, "Nm"),
    ("tool_wear", 0.0, 500.0, "minutes"),
];

/// Check a raw reading against the declared contract.
///
/// Returns an ordered list of human-readable violations: missing
/// fields, non-numeric values, out-of-range values, and an invalid
/// machine_type. machine_type is optional (downstream defaults to M).
pub fn validate_reading(data: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(obj) = data.as_object() else {
        errors.push("request body must be a JSON object".to_string());
        return errors;
    };

    for (field, lo, hi, unit) in REQUIRED_FIELDS {
        match obj.get(field) {
            None => errors.push(format!("Missing required field: '{field}'")),
            Some(raw) => match as_f64_lenient(raw) {
                Some(val) if val < lo || val > hi => errors.push(format!(
                    "'{field}' value {val} out of expected range [{lo}, {hi}] {unit}"
                )),
                Some(_) => {}
                None => errors.push(format!("'{field}' must be a number")),
            },
        }
    }

    if let Some(raw) = obj.get("machine_type") {
        let valid = raw
            .as_str()
            .and_then(MachineType::parse)
            .is_some();
        if !valid {
            errors.push("'machine_type' must be one of: 'L', 'M', 'H'".to_string());
        }
    }

    errors
}
