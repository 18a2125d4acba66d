//! Stream router
//!
//! Owns the current engine generation behind an atomically-swappable
//! reference. Message-processing threads only ever call [`StreamRouter::route`];
//! a background task rebuilds candidate generations on a fixed interval
//! and swaps them in only when the content fingerprint changed, so a
//! no-op rebuild cycle costs nothing but the candidate build itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use streamroute_core::{Message, Result, Stream, StreamPersistence};
use streamroute_telemetry::StreamMetrics;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::{Engine, StreamTestMatch};
use crate::fault::FaultManager;

/// Routes messages to matching streams against a hot-swappable generation
pub struct StreamRouter {
    engine: ArcSwap<Engine>,
    persistence: Arc<dyn StreamPersistence>,
    faults: Arc<FaultManager>,
    metrics: StreamMetrics,
    config: EngineConfig,
    rebuilds: AtomicU64,
    swaps: AtomicU64,
}

impl StreamRouter {
    /// Create a router, synchronously building the initial generation
    /// from the current enabled-stream list.
    pub async fn new(
        config: EngineConfig,
        persistence: Arc<dyn StreamPersistence>,
        faults: Arc<FaultManager>,
        metrics: StreamMetrics,
    ) -> Result<Arc<Self>> {
        let streams = persistence.load_all_enabled().await?;
        let engine = Engine::build(
            config.engine_variant,
            streams,
            metrics.clone(),
            faults.clone(),
        );
        info!(
            fingerprint = %engine.fingerprint(),
            streams = engine.streams().len(),
            "built initial routing generation"
        );

        Ok(Arc::new(Self {
            engine: ArcSwap::from_pointee(engine),
            persistence,
            faults,
            metrics,
            config,
            rebuilds: AtomicU64::new(0),
            swaps: AtomicU64::new(0),
        }))
    }

    /// Spawn the periodic rebuild task.
    ///
    /// A failed rebuild leaves the live generation untouched; the next
    /// tick retries.
    pub fn spawn_refresh_task(self: &Arc<Self>) -> JoinHandle<()> {
        let router = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(router.config.refresh_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = router.refresh_engine().await {
                    warn!(error = %e, "routing generation rebuild failed, keeping current");
                }
            }
        })
    }

    /// Rebuild a candidate generation and swap it in if its fingerprint
    /// differs from the live one.
    pub async fn refresh_engine(&self) -> Result<()> {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);

        let streams = self.persistence.load_all_enabled().await?;
        let candidate = Engine::build(
            self.config.engine_variant,
            streams,
            self.metrics.clone(),
            self.faults.clone(),
        );

        if self.engine.load().fingerprint() == candidate.fingerprint() {
            debug!("fingerprint unchanged, discarding candidate generation");
            return Ok(());
        }

        info!(
            fingerprint = %candidate.fingerprint(),
            streams = candidate.streams().len(),
            "swapping in new routing generation"
        );
        self.engine.store(Arc::new(candidate));
        self.swaps.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Route a message, returning the streams it matched.
    ///
    /// Reads the current generation once; an engine swap mid-flight
    /// never affects a routing decision already in progress.
    pub async fn route(&self, message: &Message) -> Vec<Arc<Stream>> {
        let engine = self.engine.load_full();
        let matched = engine.match_message(message).await;
        self.metrics
            .record_streams_evaluated(engine.streams().len() as u64);

        // Default-stream bookkeeping: a matched stream flagged to remove
        // its matches keeps the message off the default stream.
        if let Some(default_id) = self.config.default_stream_id.as_deref() {
            let removed = matched
                .iter()
                .any(|stream| stream.remove_matches_from_default_stream);
            if !removed {
                self.metrics.mark_incoming(default_id);
            }
        }

        matched
    }

    /// Diagnostic rule-by-rule evaluation against the live generation
    pub fn test_match(&self, message: &Message) -> Vec<StreamTestMatch> {
        self.engine.load().test_match(message)
    }

    /// Fingerprint of the live generation
    pub fn current_fingerprint(&self) -> String {
        self.engine.load().fingerprint().to_string()
    }

    /// Number of rebuild attempts so far
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }

    /// Number of generations actually swapped in after the initial build
    pub fn swap_count(&self) -> u64 {
        self.swaps.load(Ordering::Relaxed)
    }
}
