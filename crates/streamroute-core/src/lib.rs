//! StreamRoute Core
//!
//! Domain types and boundary traits shared across StreamRoute components.
//!
//! This crate provides:
//! - The message model read by the routing engine
//! - Stream, stream rule, and output value objects
//! - Error types and result handling
//! - Collaborator traits for stream persistence and notifications

pub mod error;
pub mod message;
pub mod persistence;
pub mod stream;

pub use error::{Error, Result};
pub use message::{FieldValue, Message};
pub use persistence::{Notification, NotificationService, StreamPersistence};
pub use stream::{MatchingType, Output, RuleType, Stream, StreamRule};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::message::{FieldValue, Message};
    pub use crate::persistence::{Notification, NotificationService, StreamPersistence};
    pub use crate::stream::{MatchingType, Output, RuleType, Stream, StreamRule};
}
