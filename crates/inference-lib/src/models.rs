//! Core data models for the inference pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Defaults applied when an optional numeric field is absent.
/// These match the training-set medians the model schema assumes.
pub const DEFAULT_AIR_TEMPERATURE: f64 = 300.0;
pub const DEFAULT_PROCESS_TEMPERATURE: f64 = 310.0;
pub const DEFAULT_ROTATIONAL_SPEED: f64 = 1500.0;
pub const DEFAULT_TORQUE: f64 = 40.0;
pub const DEFAULT_TOOL_WEAR: f64 = 100.0;

/// Machine quality class (Low / Medium / High).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineType {
    L,
    M,
    H,
}

impl MachineType {
    /// Integer encoding used by the feature schema (L=0, M=1, H=2).
    pub fn encoded(self) -> f64 {
        match self {
            MachineType::L => 0.0,
            MachineType::M => 1.0,
            MachineType::H => 2.0,
        }
    }

    /// Case-insensitive parse; anything else is treated as unknown.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "L" => Some(MachineType::L),
            "M" => Some(MachineType::M),
            "H" => Some(MachineType::H),
            _ => None,
        }
    }
}

/// One timestamped snapshot of a machine's sensor values.
///
/// Physical units are fixed: Kelvin for temperatures, rpm for speed,
/// Nm for torque, minutes for tool wear.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryReading {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<MachineType>,
    pub air_temperature: f64,
    pub process_temperature: f64,
    pub rotational_speed: f64,
    pub torque: f64,
    pub tool_wear: f64,
}

impl TelemetryReading {
    /// Build a reading from a JSON object, coercing numeric strings and
    /// filling absent fields with defaults. The stream path trusts the
    /// upstream schema and uses this lenient construction; the HTTP path
    /// validates first.
    pub fn from_json(value: &Value) -> Self {
        let num = |field: &str| value.get(field).and_then(as_f64_lenient);
        Self {
            machine_id: value
                .get("machine_id")
                .and_then(Value::as_str)
                .map(str::to_owned),
            machine_type: value
                .get("machine_type")
                .and_then(Value::as_str)
                .and_then(MachineType::parse),
            air_temperature: num("air_temperature").unwrap_or(DEFAULT_AIR_TEMPERATURE),
            process_temperature: num("process_temperature")
                .unwrap_or(DEFAULT_PROCESS_TEMPERATURE),
            rotational_speed: num("rotational_speed").unwrap_or(DEFAULT_ROTATIONAL_SPEED),
            torque: num("torque").unwrap_or(DEFAULT_TORQUE),
            tool_wear: num("tool_wear").unwrap_or(DEFAULT_TOOL_WEAR),
        }
    }

    /// Partition key for published records ("unknown" when no id is set).
    pub fn key(&self) -> &str {
        self.machine_id.as_deref().unwrap_or("unknown")
    }

    /// Process-minus-air temperature delta in Kelvin.
    pub fn temp_diff(&self) -> f64 {
        self.process_temperature - self.air_temperature
    }
}

/// Coerce a JSON value to f64 the way the upstream producers do:
/// numbers pass through, numeric strings are parsed.
pub(crate) fn as_f64_lenient(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Closed set of failure modes the classifier can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureType {
    #[serde(rename = "No Failure")]
    NoFailure,
    #[serde(rename = "Tool Wear Failure")]
    ToolWear,
    #[serde(rename = "Heat Dissipation Failure")]
    HeatDissipation,
    #[serde(rename = "Power Failure")]
    Power,
    #[serde(rename = "Overstrain Failure")]
    Overstrain,
    #[serde(rename = "Random Failures")]
    Random,
}

impl FailureType {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureType::NoFailure => "No Failure",
            FailureType::ToolWear => "Tool Wear Failure",
            FailureType::HeatDissipation => "Heat Dissipation Failure",
            FailureType::Power => "Power Failure",
            FailureType::Overstrain => "Overstrain Failure",
            FailureType::Random => "Random Failures",
        }
    }
}

impl std::fmt::Display for FailureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring outcome for one reading.
///
/// Invariant: `failure_type == NoFailure` exactly when `prediction == 0`.
/// `confidence` and `anomaly_score` are clamped to [0,1] and rounded to
/// four decimals before leaving the scoring engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: u8,
    pub confidence: f64,
    #[serde(rename = "anomalyScore")]
    pub anomaly_score: f64,
    pub failure_type: FailureType,
}

impl PredictionResult {
    pub fn is_alert(&self) -> bool {
        self.prediction == 1
    }
}

/// Reading merged with its prediction and a processing timestamp.
/// This is the unit published to the output topic.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub reading: TelemetryReading,
    #[serde(flatten)]
    pub result: PredictionResult,
    pub processed_at: DateTime<Utc>,
}

impl EnrichedRecord {
    pub fn new(reading: TelemetryReading, result: PredictionResult) -> Self {
        Self {
            reading,
            result,
            processed_at: Utc::now(),
        }
    }
}

/// Fixed-order numeric encoding of a reading, ready for model input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub values: Vec<f32>,
}

/// Round to four decimal places for wire output.
pub(crate) fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
