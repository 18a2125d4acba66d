//! Error types for StreamRoute

/// Result type alias using StreamRoute's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for StreamRoute operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown stream rule type code
    #[error("invalid stream rule type: {0}")]
    InvalidRuleType(i32),

    /// Structurally invalid stream rule (e.g. missing value)
    #[error("invalid stream rule: {0}")]
    InvalidRule(String),

    /// Matcher evaluation errors
    #[error("matcher error: {0}")]
    Matcher(String),

    /// Stream persistence errors
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,
}

impl Error {
    /// Create a new invalid-rule error
    pub fn invalid_rule(msg: impl Into<String>) -> Self {
        Self::InvalidRule(msg.into())
    }

    /// Create a new matcher error
    pub fn matcher(msg: impl Into<String>) -> Self {
        Self::Matcher(msg.into())
    }

    /// Create a new persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}
