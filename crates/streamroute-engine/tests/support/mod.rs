//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use streamroute_core::{
    Notification, NotificationService, Result, RuleType, Stream, StreamPersistence, StreamRule,
};

/// In-memory stream store with recordable pause calls
#[derive(Default)]
pub struct MemoryStreams {
    streams: Mutex<Vec<Stream>>,
    paused: Mutex<Vec<String>>,
    fail_loads: Mutex<bool>,
}

impl MemoryStreams {
    pub fn new(streams: Vec<Stream>) -> Arc<Self> {
        Arc::new(Self {
            streams: Mutex::new(streams),
            ..Self::default()
        })
    }

    pub fn set_streams(&self, streams: Vec<Stream>) {
        *self.streams.lock() = streams;
    }

    pub fn set_fail_loads(&self, fail: bool) {
        *self.fail_loads.lock() = fail;
    }

    pub fn paused(&self) -> Vec<String> {
        self.paused.lock().clone()
    }
}

#[async_trait]
impl StreamPersistence for MemoryStreams {
    async fn load_all_enabled(&self) -> Result<Vec<Stream>> {
        if *self.fail_loads.lock() {
            return Err(streamroute_core::Error::persistence("store unavailable"));
        }
        Ok(self
            .streams
            .lock()
            .iter()
            .filter(|stream| stream.enabled)
            .cloned()
            .collect())
    }

    async fn pause(&self, stream_id: &str) -> Result<()> {
        self.paused.lock().push(stream_id.to_string());
        self.streams
            .lock()
            .retain(|stream| stream.id != stream_id);
        Ok(())
    }
}

/// Notification sink that de-duplicates like the real service
#[derive(Default)]
pub struct RecordingNotifier {
    published: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn published(&self) -> Vec<Notification> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn publish_if_first(&self, notification: Notification) {
        let mut published = self.published.lock();
        if !published.contains(&notification) {
            published.push(notification);
        }
    }
}

pub fn rule(id: &str, stream_id: &str, rule_type: RuleType, field: &str, value: &str) -> StreamRule {
    StreamRule {
        id: id.to_string(),
        stream_id: stream_id.to_string(),
        rule_type: rule_type.code(),
        field: field.to_string(),
        value: Some(value.to_string()),
        inverted: false,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
