//! Collaborator traits at the engine boundary
//!
//! The routing engine never talks to storage or operators directly. It
//! loads enabled streams through [`StreamPersistence`] and raises fault
//! notifications through [`NotificationService`]; both are supplied by
//! the surrounding system.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, Stream};

/// Access to persisted stream definitions
#[async_trait]
pub trait StreamPersistence: Send + Sync {
    /// Load all streams that are enabled for routing.
    ///
    /// Called once at router construction and once per rebuild tick.
    async fn load_all_enabled(&self) -> Result<Vec<Stream>>;

    /// Pause (disable) a stream.
    ///
    /// A paused stream disappears from the next rebuilt generation.
    async fn pause(&self, stream_id: &str) -> Result<()>;
}

/// An operator notification raised when a stream exceeds its fault budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// The paused stream's id
    pub stream_id: String,

    /// The paused stream's title
    pub stream_title: String,

    /// The failure count that tripped the threshold
    pub fault_count: u64,
}

/// Delivery of operator notifications
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Publish a notification unless an identical one is already pending
    async fn publish_if_first(&self, notification: Notification);
}
