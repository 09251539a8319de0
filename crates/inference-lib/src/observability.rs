//! Prometheus metrics for the inference service
//!
//! Registered once in a process-global registry; `ServiceMetrics` is a
//! cheap handle that any component can clone.

use prometheus::{register_histogram, register_int_counter, Histogram, IntCounter};
use std::sync::OnceLock;

/// Histogram buckets for inference latency (seconds).
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    inference_latency_seconds: Histogram,
    stream_messages_total: IntCounter,
    stream_alerts_total: IntCounter,
    stream_parse_errors_total: IntCounter,
    model_fallbacks_total: IntCounter,
    batch_readings_total: IntCounter,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            inference_latency_seconds: register_histogram!(
                "inference_latency_seconds",
                "Time spent scoring one telemetry reading",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            stream_messages_total: register_int_counter!(
                "stream_messages_total",
                "Telemetry messages scored by the stream pipeline"
            )
            .expect("Failed to register stream_messages_total"),

            stream_alerts_total: register_int_counter!(
                "stream_alerts_total",
                "Stream messages scored as predicted failures"
            )
            .expect("Failed to register stream_alerts_total"),

            stream_parse_errors_total: register_int_counter!(
                "stream_parse_errors_total",
                "Inbound messages skipped because the payload failed to parse"
            )
            .expect("Failed to register stream_parse_errors_total"),

            model_fallbacks_total: register_int_counter!(
                "model_fallbacks_total",
                "Model inference failures answered by the heuristic scorer"
            )
            .expect("Failed to register model_fallbacks_total"),

            batch_readings_total: register_int_counter!(
                "batch_readings_total",
                "Readings processed through the batch endpoint"
            )
            .expect("Failed to register batch_readings_total"),
        }
    }
}

/// Handle to the global metrics instance.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_inference_latency(&self, duration_secs: f64) {
        self.inner().inference_latency_seconds.observe(duration_secs);
    }

    pub fn inc_stream_messages(&self) {
        self.inner().stream_messages_total.inc();
    }

    pub fn inc_stream_alerts(&self) {
        self.inner().stream_alerts_total.inc();
    }

    pub fn inc_parse_errors(&self) {
        self.inner().stream_parse_errors_total.inc();
    }

    pub fn inc_model_fallbacks(&self) {
        self.inner().model_fallbacks_total.inc();
    }

    pub fn add_batch_readings(&self, count: u64) {
        self.inner().batch_readings_total.inc_by(count);
    }
}
