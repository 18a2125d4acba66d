//! Stream and stream rule definitions
//!
//! Streams are operator-defined routing destinations; each carries a set
//! of rules and a matching type. These are read-only value objects from
//! the management layer's domain — the engine never mutates them.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How a stream combines its rules into a routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingType {
    /// All rules must match
    #[default]
    And,
    /// Any rule matching suffices
    Or,
}

/// The type of a stream rule predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    /// Field's string value equals the rule value
    Exact,
    /// Field's string value contains a regex match
    Regex,
    /// Numeric field value is greater than the rule value
    Greater,
    /// Numeric field value is smaller than the rule value
    Smaller,
    /// Field exists on the message
    Presence,
    /// Field's string value contains the rule value
    Contains,
    /// Matches every message
    AlwaysMatch,
    /// Rule value equals the message's originating input id
    MatchInput,
}

impl RuleType {
    /// Resolve a persisted numeric type code.
    ///
    /// Unknown codes are a construction failure for the owning rule; the
    /// rule is skipped and the stream keeps its remaining rules.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            1 => Ok(Self::Exact),
            2 => Ok(Self::Regex),
            3 => Ok(Self::Greater),
            4 => Ok(Self::Smaller),
            5 => Ok(Self::Presence),
            6 => Ok(Self::Contains),
            7 => Ok(Self::AlwaysMatch),
            8 => Ok(Self::MatchInput),
            other => Err(Error::InvalidRuleType(other)),
        }
    }

    /// The persisted numeric code for this type
    pub fn code(&self) -> i32 {
        match self {
            Self::Exact => 1,
            Self::Regex => 2,
            Self::Greater => 3,
            Self::Smaller => 4,
            Self::Presence => 5,
            Self::Contains => 6,
            Self::AlwaysMatch => 7,
            Self::MatchInput => 8,
        }
    }
}

/// One atomic predicate belonging to a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRule {
    /// Rule identifier
    pub id: String,

    /// Identifier of the owning stream
    pub stream_id: String,

    /// Persisted rule type code (resolved via [`RuleType::from_code`])
    #[serde(rename = "type")]
    pub rule_type: i32,

    /// The message field this rule inspects
    pub field: String,

    /// Comparison value; `None` is only valid for always-match rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Whether the match result is negated
    #[serde(default)]
    pub inverted: bool,
}

/// A stream output destination.
///
/// Only its identity matters to the engine: outputs participate in the
/// generation fingerprint so that attaching or detaching an output forces
/// a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Output identifier
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,
}

/// A named routing destination for messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stream {
    /// Stream identifier
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// How rules combine into the routing decision
    #[serde(default)]
    pub matching_type: MatchingType,

    /// Whether the stream participates in routing
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether matching this stream removes the message from the default stream
    #[serde(default)]
    pub remove_matches_from_default_stream: bool,

    /// The stream's rules
    #[serde(default)]
    pub rules: Vec<StreamRule>,

    /// Attached outputs
    #[serde(default)]
    pub outputs: Vec<Output>,
}

impl Stream {
    /// Create a stream with the given id and matching type, no rules
    pub fn new(id: impl Into<String>, matching_type: MatchingType) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            matching_type,
            enabled: true,
            remove_matches_from_default_stream: false,
            rules: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Set the title, builder style
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Add a rule, builder style
    pub fn with_rule(mut self, rule: StreamRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add an output, builder style
    pub fn with_output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }
}

fn default_true() -> bool {
    true
}
