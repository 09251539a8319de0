//! Feature extraction for model inference
//!
//! Derives the numeric feature set from a telemetry reading and
//! projects it through a declared schema. The schema fixes column
//! order; it must match the ordering the model's coefficients were
//! fit against, so it is loaded alongside the model artifact rather
//! than hardcoded at call sites.

use crate::models::{FeatureVector, TelemetryReading};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Guard against division by zero in rpm_per_torque.
pub const TORQUE_EPSILON: f64 = 1e-6;

/// Column names understood by the extractor.
pub const KNOWN_COLUMNS: [&str; 10] = [
    "air_temperature",
    "process_temperature",
    "rotational_speed",
    "torque",
    "tool_wear",
    "type_encoded",
    "temp_diff",
    "power_w",
    "torque_x_wear",
    "rpm_per_torque",
];

/// An explicit ordered list of feature columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

/// On-disk schema shape, written next to the model artifact.
#[derive(Deserialize)]
struct SchemaFile {
    feature_cols: Vec<String>,
}

impl FeatureSchema {
    /// Six-feature profile used by the streaming deployment.
    pub fn minimal() -> Self {
        Self {
            columns: KNOWN_COLUMNS[..6].iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Ten-feature profile with derived interaction terms.
    pub fn extended() -> Self {
        Self {
            columns: KNOWN_COLUMNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Look up a named built-in profile.
    pub fn profile(name: &str) -> Result<Self> {
        match name {
            "minimal" => Ok(Self::minimal()),
            "extended" => Ok(Self::extended()),
            other => bail!("unknown feature profile '{other}'"),
        }
    }

    /// Build a schema from an explicit column list, rejecting names the
    /// extractor cannot compute.
    pub fn from_columns(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            bail!("feature schema must name at least one column");
        }
        for col in &columns {
            if !KNOWN_COLUMNS.contains(&col.as_str()) {
                bail!("unknown feature column '{col}'");
            }
        }
        Ok(Self { columns })
    }

    /// Load a schema from the metadata file shipped with a model.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read feature schema {}", path.display()))?;
        let parsed: SchemaFile = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse feature schema {}", path.display()))?;
        Self::from_columns(parsed.feature_cols)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Full derived feature set for one reading. Ephemeral; computed in
/// whole even when the schema projects only a subset.
#[derive(Debug, Clone)]
struct FeatureSet {
    air_temperature: f64,
    process_temperature: f64,
    rotational_speed: f64,
    torque: f64,
    tool_wear: f64,
    type_encoded: f64,
    temp_diff: f64,
    power_w: f64,
    torque_x_wear: f64,
    rpm_per_torque: f64,
}

impl FeatureSet {
    fn derive(reading: &TelemetryReading) -> Self {
        let type_encoded = reading.machine_type.map(|t| t.encoded()).unwrap_or(1.0);
        Self {
            air_temperature: reading.air_temperature,
            process_temperature: reading.process_temperature,
            rotational_speed: reading.rotational_speed,
            torque: reading.torque,
            tool_wear: reading.tool_wear,
            type_encoded,
            temp_diff: reading.temp_diff(),
            power_w: reading.torque * (reading.rotational_speed * 2.0 * std::f64::consts::PI
                / 60.0),
            torque_x_wear: reading.torque * reading.tool_wear,
            rpm_per_torque: reading.rotational_speed / (reading.torque + TORQUE_EPSILON),
        }
    }

    fn get(&self, column: &str) -> Option<f64> {
        match column {
            "air_temperature" => Some(self.air_temperature),
            "process_temperature" => Some(self.process_temperature),
            "rotational_speed" => Some(self.rotational_speed),
            "torque" => Some(self.torque),
            "tool_wear" => Some(self.tool_wear),
            "type_encoded" => Some(self.type_encoded),
            "temp_diff" => Some(self.temp_diff),
            "power_w" => Some(self.power_w),
            "torque_x_wear" => Some(self.torque_x_wear),
            "rpm_per_torque" => Some(self.rpm_per_torque),
            _ => None,
        }
    }
}

/// Projects readings into fixed-order feature vectors.
pub struct FeatureExtractor {
    schema: FeatureSchema,
}

impl FeatureExtractor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Derive and project the schema's columns, in schema order.
    pub fn extract(&self, reading: &TelemetryReading) -> FeatureVector {
        let set = FeatureSet::derive(reading);
        let values = self
            .schema
            .columns
            .iter()
            // Schema columns are validated at construction, so the
            // lookup cannot miss.
            .map(|col| set.get(col).unwrap_or_default() as f32)
            .collect();
        FeatureVector { values }
    }
}
