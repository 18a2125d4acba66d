//! Per-stream fault accounting and auto-pause
//!
//! Every regex deadline exceedance counts as one fault against the owning
//! stream. When a stream accumulates `stream_processing_max_faults`
//! consecutive faults it is paused through the persistence collaborator
//! and an operator notification is raised. A paused stream disappears
//! from the next rebuilt generation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use streamroute_core::{Notification, NotificationService, Stream, StreamPersistence};
use streamroute_telemetry::StreamMetrics;
use tracing::{error, warn};

use crate::config::EngineConfig;

/// Tracks consecutive rule failures per stream and pauses offenders
pub struct FaultManager {
    counters: RwLock<HashMap<String, AtomicU64>>,
    max_fault_count: u64,
    processing_timeout: Duration,
    persistence: Arc<dyn StreamPersistence>,
    notifier: Arc<dyn NotificationService>,
    metrics: StreamMetrics,
}

impl FaultManager {
    /// Create a fault manager from engine configuration
    pub fn new(
        config: &EngineConfig,
        persistence: Arc<dyn StreamPersistence>,
        notifier: Arc<dyn NotificationService>,
        metrics: StreamMetrics,
    ) -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            max_fault_count: config.stream_processing_max_faults,
            processing_timeout: config.processing_timeout(),
            persistence,
            notifier,
            metrics,
        }
    }

    /// The configured per-rule regex deadline
    pub fn processing_timeout(&self) -> Duration {
        self.processing_timeout
    }

    /// Current fault count for a stream
    pub fn fault_count(&self, stream_id: &str) -> u64 {
        self.counters
            .read()
            .get(stream_id)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Register one failure for a stream.
    ///
    /// Pauses the stream once the configured threshold is reached; a
    /// `max_fault_count` of zero disables auto-pause entirely. Never
    /// propagates errors back into message processing.
    pub async fn register_failure(&self, stream: &Stream) {
        let fault_count = self.increment(&stream.id);
        self.metrics.mark_rule_timeout(&stream.id);

        if self.max_fault_count > 0 && fault_count >= self.max_fault_count {
            self.register_pause(stream, fault_count).await;
        } else {
            warn!(
                stream = %stream.id,
                faults = fault_count,
                "stream rule timed out"
            );
        }
    }

    async fn register_pause(&self, stream: &Stream, fault_count: u64) {
        self.reset(&stream.id);
        self.metrics.mark_faults_exceeded();

        match self.persistence.pause(&stream.id).await {
            Ok(()) => {
                error!(
                    stream = %stream.id,
                    faults = fault_count,
                    "stream exceeded fault budget, pausing"
                );
                self.notifier
                    .publish_if_first(Notification {
                        stream_id: stream.id.clone(),
                        stream_title: stream.title.clone(),
                        fault_count,
                    })
                    .await;
            }
            Err(e) => {
                // Fail open on the administrative action; traffic keeps
                // flowing against the still-enabled stream.
                error!(
                    stream = %stream.id,
                    error = %e,
                    "failed to pause stream after fault budget exceeded"
                );
            }
        }
    }

    fn increment(&self, stream_id: &str) -> u64 {
        let counters = self.counters.read();
        if let Some(counter) = counters.get(stream_id) {
            return counter.fetch_add(1, Ordering::Relaxed) + 1;
        }
        drop(counters);
        self.counters
            .write()
            .entry(stream_id.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed)
            + 1
    }

    fn reset(&self, stream_id: &str) {
        if let Some(counter) = self.counters.read().get(stream_id) {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
