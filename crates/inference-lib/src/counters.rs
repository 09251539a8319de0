//! Process-wide message counters
//!
//! Injected into the stream pipeline and read by the reporting
//! surface. Plain atomics: the pipeline increments, HTTP handlers
//! snapshot. Reset only by process restart.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ServiceCounters {
    messages_processed: AtomicU64,
    alerts_generated: AtomicU64,
}

impl ServiceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successfully scored message. Incrementing both
    /// counters here keeps alerts_generated <= messages_processed.
    pub fn record_scored(&self, alert: bool) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        if alert {
            self.alerts_generated.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            alerts_generated: self.alerts_generated.load(Ordering::Relaxed),
        }
    }
}

/// Read-only view for the reporting surface.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CounterSnapshot {
    pub messages_processed: u64,
    pub alerts_generated: u64,
}

impl CounterSnapshot {
    /// Alert rate as a percentage of processed messages.
    pub fn alert_rate_percent(&self) -> f64 {
        (self.alerts_generated as f64 / self.messages_processed.max(1) as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let snapshot = ServiceCounters::new().snapshot();
        assert_eq!(snapshot.messages_processed, 0);
        assert_eq!(snapshot.alerts_generated, 0);
        assert_eq!(snapshot.alert_rate_percent(), 0.0);
    }

    #[test]
    fn test_alerts_never_exceed_messages() {
        let counters = ServiceCounters::new();
        counters.record_scored(true);
        counters.record_scored(false);
        counters.record_scored(true);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.messages_processed, 3);
        assert_eq!(snapshot.alerts_generated, 2);
        assert!(snapshot.alerts_generated <= snapshot.messages_processed);
    }

    #[test]
    fn test_monotonic_under_concurrent_increments() {
        use std::sync::Arc;

        let counters = Arc::new(ServiceCounters::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || {
                    for i in 0..1000 {
                        counters.record_scored(i % 2 == 0);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.messages_processed, 4000);
        assert_eq!(snapshot.alerts_generated, 2000);
    }

    #[test]
    fn test_alert_rate() {
        let counters = ServiceCounters::new();
        for i in 0..10 {
            counters.record_scored(i < 3);
        }
        assert!((counters.snapshot().alert_rate_percent() - 30.0).abs() < 1e-9);
    }
}
