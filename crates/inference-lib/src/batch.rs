//! Batch orchestration for the synchronous prediction surface
//!
//! Applies validation and scoring to an ordered sequence of readings,
//! isolating per-item failures so one bad reading never aborts the
//! rest of the batch.

use crate::models::{PredictionResult, TelemetryReading};
use crate::scoring::ScoringEngine;
use crate::validate::validate_reading;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Hard cap on readings per batch call.
pub const MAX_BATCH_SIZE: usize = 100;

/// Whole-batch rejections; per-item failures are reported inline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("'readings' array is required and cannot be empty")]
    Empty,
    #[error("Batch size cannot exceed {MAX_BATCH_SIZE} readings")]
    TooLarge(usize),
}

/// Outcome for one batch item, tagged with its input index.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Success {
        index: usize,
        #[serde(flatten)]
        result: PredictionResult,
    },
    Failure {
        index: usize,
        error: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
    pub total: usize,
}

/// Validate and score each reading independently, in input order.
pub fn process_batch(
    engine: &ScoringEngine,
    readings: &[Value],
) -> Result<BatchResponse, BatchError> {
    if readings.is_empty() {
        return Err(BatchError::Empty);
    }
    if readings.len() > MAX_BATCH_SIZE {
        return Err(BatchError::TooLarge(readings.len()));
    }

    let results = readings
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let errors = validate_reading(raw);
            if !errors.is_empty() {
                return BatchItem::Failure {
                    index,
                    error: errors,
                };
            }
            let reading = TelemetryReading::from_json(raw);
            BatchItem::Success {
                index,
                result: engine.score(&reading),
            }
        })
        .collect::<Vec<_>>();

    let total = results.len();
    Ok(BatchResponse { results, total })
}
