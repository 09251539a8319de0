//! Streaming consume-score-publish pipeline
//!
//! Owns the long-lived loop that reads telemetry from the input topic,
//! scores each message, and republishes the enriched record keyed by
//! machine id. Offset commits are left to the consumer's auto-commit,
//! so delivery is at-least-once: a crash can reprocess messages but
//! never silently drops them.

use crate::counters::ServiceCounters;
use crate::models::{EnrichedRecord, TelemetryReading};
use crate::observability::ServiceMetrics;
use crate::scoring::ScoringEngine;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use serde_json::Value;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// How long the drain phase waits for in-flight produced messages.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Broker connection settings for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub brokers: String,
    pub input_topic: String,
    pub output_topic: String,
    pub consumer_group: String,
}

/// Pipeline lifecycle, observable from the reporting surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Starting = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PipelineState::Starting,
            1 => PipelineState::Running,
            2 => PipelineState::Draining,
            _ => PipelineState::Stopped,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Starting => "starting",
            PipelineState::Running => "running",
            PipelineState::Draining => "draining",
            PipelineState::Stopped => "stopped",
        }
    }
}

/// Fatal pipeline failures. Everything message-local (bad payloads,
/// inference errors, delivery timeouts) is handled inside the loop.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("broker transport error: {0}")]
    Transport(#[from] KafkaError),
}

pub struct StreamPipeline {
    config: PipelineConfig,
    engine: Arc<ScoringEngine>,
    counters: Arc<ServiceCounters>,
    metrics: ServiceMetrics,
    state: AtomicU8,
}

impl StreamPipeline {
    pub fn new(
        config: PipelineConfig,
        engine: Arc<ScoringEngine>,
        counters: Arc<ServiceCounters>,
    ) -> Self {
        Self {
            config,
            engine,
            counters,
            metrics: ServiceMetrics::new(),
            state: AtomicU8::new(PipelineState::Starting as u8),
        }
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Relaxed))
    }

    fn set_state(&self, state: PipelineState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    fn build_consumer(&self) -> Result<StreamConsumer, KafkaError> {
        ClientConfig::new()
            .set("bootstrap.servers", &self.config.brokers)
            .set("group.id", &self.config.consumer_group)
            .set("auto.offset.reset", "latest")
            // Offset commits are the client's periodic auto-commit;
            // the loop never commits directly.
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "1000")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "3000")
            .create()
    }

    fn build_producer(&self) -> Result<FutureProducer, KafkaError> {
        ClientConfig::new()
            .set("bootstrap.servers", &self.config.brokers)
            .set("acks", "all")
            .set("linger.ms", "5")
            .set("batch.size", "16384")
            .set("message.timeout.ms", "5000")
            .create()
    }

    /// Parse and score one inbound payload, advancing the counters on
    /// success. A malformed payload is logged and skipped; it must
    /// never halt the loop or touch the counters.
    pub fn process(&self, payload: &[u8]) -> Option<EnrichedRecord> {
        let value: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Skipping malformed telemetry message");
                self.metrics.inc_parse_errors();
                return None;
            }
        };
        if !value.is_object() {
            warn!("Skipping non-object telemetry message");
            self.metrics.inc_parse_errors();
            return None;
        }

        // The stream path trusts the upstream schema: no validator,
        // lenient construction with defaults for absent fields.
        let reading = TelemetryReading::from_json(&value);
        let result = self.engine.score(&reading);
        let alert = result.is_alert();

        debug!(
            machine_id = reading.key(),
            prediction = result.prediction,
            confidence = result.confidence,
            anomaly_score = result.anomaly_score,
            failure_type = %result.failure_type,
            "Scored telemetry reading"
        );

        self.counters.record_scored(alert);
        self.metrics.inc_stream_messages();
        if alert {
            self.metrics.inc_stream_alerts();
        }

        Some(EnrichedRecord::new(reading, result))
    }

    async fn publish(&self, producer: &FutureProducer, record: &EnrichedRecord) {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize enriched record");
                return;
            }
        };

        let delivery = producer
            .send(
                FutureRecord::to(&self.config.output_topic)
                    .key(record.reading.key())
                    .payload(&payload),
                Timeout::After(FLUSH_TIMEOUT),
            )
            .await;

        // Delivery failures are message-local: log and move on, the
        // reading will be reprocessed after a restart if it matters.
        if let Err((e, _)) = delivery {
            warn!(error = %e, "Delivery failed for enriched record");
        }
    }

    /// Run the consume-score-publish loop until shutdown is signalled
    /// or a fatal transport error occurs.
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        let consumer = match self.build_consumer() {
            Ok(consumer) => consumer,
            Err(e) => {
                self.set_state(PipelineState::Stopped);
                return Err(e.into());
            }
        };
        let producer = match self.build_producer() {
            Ok(producer) => producer,
            Err(e) => {
                self.set_state(PipelineState::Stopped);
                return Err(e.into());
            }
        };
        if let Err(e) = consumer.subscribe(&[self.config.input_topic.as_str()]) {
            self.set_state(PipelineState::Stopped);
            return Err(e.into());
        }

        info!(
            topic = %self.config.input_topic,
            group = %self.config.consumer_group,
            "Stream pipeline subscribed"
        );
        self.set_state(PipelineState::Running);

        loop {
            tokio::select! {
                message = consumer.recv() => {
                    match message {
                        Ok(message) => {
                            let Some(payload) = message.payload() else {
                                debug!("Skipping message with empty payload");
                                continue;
                            };
                            if let Some(record) = self.process(payload) {
                                self.publish(&producer, &record).await;
                            }
                        }
                        // End of the partition's available data is a
                        // no-op, not a failure.
                        Err(KafkaError::PartitionEOF(partition)) => {
                            debug!(partition, "Reached end of partition");
                        }
                        Err(e) => {
                            self.set_state(PipelineState::Stopped);
                            return Err(e.into());
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutdown signal received, draining pipeline");
                    break;
                }
            }
        }

        self.set_state(PipelineState::Draining);
        if let Err(e) = producer.flush(Timeout::After(FLUSH_TIMEOUT)) {
            warn!(error = %e, "Producer flush did not complete cleanly");
        }
        drop(consumer);
        self.set_state(PipelineState::Stopped);
        info!("Stream pipeline stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::FixedNoise;
    use serde_json::json;

    fn pipeline() -> StreamPipeline {
        StreamPipeline::new(
            PipelineConfig {
                brokers: "localhost:9092".to_string(),
                input_topic: "machine-data".to_string(),
                output_topic: "prediction-data".to_string(),
                consumer_group: "ml-consumers".to_string(),
            },
            Arc::new(ScoringEngine::heuristic_only(Arc::new(FixedNoise(0.5)))),
            Arc::new(ServiceCounters::new()),
        )
    }

    #[test]
    fn test_starts_in_starting_state() {
        assert_eq!(pipeline().state(), PipelineState::Starting);
        assert_eq!(PipelineState::Starting.as_str(), "starting");
    }

    #[test]
    fn test_malformed_message_skipped_without_counting() {
        let pipeline = pipeline();

        assert!(pipeline.process(b"not json").is_none());
        assert!(pipeline.process(b"[1, 2, 3]").is_none());
        assert_eq!(pipeline.counters.snapshot().messages_processed, 0);

        // Subsequent messages still flow.
        let good = serde_json::to_vec(&json!({
            "machine_id": "M1",
            "air_temperature": 300.0, "process_temperature": 310.0,
            "rotational_speed": 1500.0, "torque": 40.0, "tool_wear": 100.0,
        }))
        .unwrap();
        assert!(pipeline.process(&good).is_some());
        assert_eq!(pipeline.counters.snapshot().messages_processed, 1);
    }

    #[test]
    fn test_alerting_message_counted_as_alert() {
        let pipeline = pipeline();
        let hot = serde_json::to_vec(&json!({
            "machine_id": "M1",
            "air_temperature": 300.0, "process_temperature": 365.0,
            "rotational_speed": 1500.0, "torque": 40.0, "tool_wear": 100.0,
        }))
        .unwrap();

        let record = pipeline.process(&hot).unwrap();
        assert_eq!(record.result.prediction, 1);

        let snapshot = pipeline.counters.snapshot();
        assert_eq!(snapshot.messages_processed, 1);
        assert_eq!(snapshot.alerts_generated, 1);
    }

    #[test]
    fn test_missing_machine_id_keys_as_unknown() {
        let pipeline = pipeline();
        let record = pipeline
            .process(br#"{"air_temperature": 300.0}"#)
            .unwrap();
        assert_eq!(record.reading.key(), "unknown");
    }

    #[test]
    fn test_counters_monotonic_across_mixed_inputs() {
        let pipeline = pipeline();
        let payloads: [&[u8]; 5] = [
            br#"{"machine_id": "a"}"#,
            b"garbage",
            br#"{"machine_id": "b", "process_temperature": 365.0}"#,
            b"{",
            br#"{"machine_id": "c"}"#,
        ];

        let mut last_messages = 0;
        for payload in payloads {
            let _ = pipeline.process(payload);
            let snapshot = pipeline.counters.snapshot();
            assert!(snapshot.messages_processed >= last_messages);
            assert!(snapshot.alerts_generated <= snapshot.messages_processed);
            last_messages = snapshot.messages_processed;
        }
        assert_eq!(last_messages, 3);
    }

    #[test]
    fn test_enriched_record_carries_timestamp() {
        let pipeline = pipeline();
        let record = pipeline.process(br#"{"machine_id": "M9"}"#).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["machine_id"], "M9");
        assert!(value["processed_at"].is_string());
    }
}
