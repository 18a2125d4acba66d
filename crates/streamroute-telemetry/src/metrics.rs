//! Routing metrics keyed by stream and rule id
//!
//! Counters and timers are kept in local atomic tables so tests and the
//! engine itself can read them back, and every update is also published
//! through the `metrics` facade for whatever reporting backend the host
//! process has installed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use std::collections::HashMap;

/// Metrics collector for stream routing
#[derive(Clone)]
pub struct StreamMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    incoming: RwLock<HashMap<String, AtomicU64>>,
    exceptions: RwLock<HashMap<String, AtomicU64>>,
    rule_timeouts: RwLock<HashMap<String, AtomicU64>>,
    faults_exceeded: AtomicU64,
    execution: RwLock<HashMap<(String, String), RuleTimer>>,
    streams_evaluated: AtomicU64,
}

#[derive(Default)]
struct RuleTimer {
    samples: AtomicU64,
    total_micros: AtomicU64,
}

impl StreamMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Mark an incoming message for a matched stream
    pub fn mark_incoming(&self, stream_id: &str) {
        bump(&self.inner.incoming, stream_id);
        metrics::counter!("stream_incoming_total", "stream" => stream_id.to_string()).increment(1);
    }

    /// Mark a matcher evaluation failure for a stream
    pub fn mark_exception(&self, stream_id: &str) {
        bump(&self.inner.exceptions, stream_id);
        metrics::counter!("stream_rule_exceptions_total", "stream" => stream_id.to_string())
            .increment(1);
    }

    /// Mark a regex rule deadline exceedance for a stream
    pub fn mark_rule_timeout(&self, stream_id: &str) {
        bump(&self.inner.rule_timeouts, stream_id);
        metrics::counter!("stream_rule_timeouts_total", "stream" => stream_id.to_string())
            .increment(1);
    }

    /// Mark a stream auto-pause after exceeding its fault budget
    pub fn mark_faults_exceeded(&self) {
        self.inner.faults_exceeded.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("stream_faults_exceeded_total").increment(1);
    }

    /// Record a rule execution duration sample
    pub fn record_execution_time(&self, stream_id: &str, rule_id: &str, elapsed: Duration) {
        let micros = elapsed.as_micros() as u64;
        {
            let key = (stream_id.to_string(), rule_id.to_string());
            let timers = self.inner.execution.read();
            if let Some(timer) = timers.get(&key) {
                timer.samples.fetch_add(1, Ordering::Relaxed);
                timer.total_micros.fetch_add(micros, Ordering::Relaxed);
            } else {
                drop(timers);
                let mut timers = self.inner.execution.write();
                let timer = timers.entry(key).or_default();
                timer.samples.fetch_add(1, Ordering::Relaxed);
                timer.total_micros.fetch_add(micros, Ordering::Relaxed);
            }
        }
        metrics::histogram!(
            "stream_rule_execution_seconds",
            "stream" => stream_id.to_string(),
            "rule" => rule_id.to_string()
        )
        .record(elapsed.as_secs_f64());
    }

    /// Record how many streams were evaluated for one message
    pub fn record_streams_evaluated(&self, count: u64) {
        self.inner
            .streams_evaluated
            .fetch_add(count, Ordering::Relaxed);
        metrics::histogram!("stream_match_streams_evaluated").record(count as f64);
    }

    /// Incoming count for a stream
    pub fn incoming_count(&self, stream_id: &str) -> u64 {
        read(&self.inner.incoming, stream_id)
    }

    /// Exception count for a stream
    pub fn exception_count(&self, stream_id: &str) -> u64 {
        read(&self.inner.exceptions, stream_id)
    }

    /// Rule timeout count for a stream
    pub fn rule_timeout_count(&self, stream_id: &str) -> u64 {
        read(&self.inner.rule_timeouts, stream_id)
    }

    /// Total number of fault-budget exceedances
    pub fn faults_exceeded_count(&self) -> u64 {
        self.inner.faults_exceeded.load(Ordering::Relaxed)
    }

    /// Execution sample count for a stream rule
    pub fn execution_samples(&self, stream_id: &str, rule_id: &str) -> u64 {
        let key = (stream_id.to_string(), rule_id.to_string());
        self.inner
            .execution
            .read()
            .get(&key)
            .map(|t| t.samples.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Total streams evaluated across all messages
    pub fn streams_evaluated_total(&self) -> u64 {
        self.inner.streams_evaluated.load(Ordering::Relaxed)
    }
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn bump(table: &RwLock<HashMap<String, AtomicU64>>, key: &str) {
    let counters = table.read();
    if let Some(counter) = counters.get(key) {
        counter.fetch_add(1, Ordering::Relaxed);
        return;
    }
    drop(counters);
    table
        .write()
        .entry(key.to_string())
        .or_default()
        .fetch_add(1, Ordering::Relaxed);
}

fn read(table: &RwLock<HashMap<String, AtomicU64>>, key: &str) -> u64 {
    table
        .read()
        .get(key)
        .map(|c| c.load(Ordering::Relaxed))
        .unwrap_or(0)
}
