//! Engine-internal resolved rules
//!
//! A [`Rule`] binds a stream, one of its stream rules, and the resolved
//! matcher into an immediately-evaluable unit. Rules are constructed once
//! per engine generation and never mutated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use streamroute_core::{Error, MatchingType, Message, Result, RuleType, Stream, StreamRule};
use streamroute_telemetry::StreamMetrics;
use tracing::debug;

use crate::fault::FaultManager;
use crate::matcher::Matcher;

/// A resolved, immediately-evaluable stream rule
pub struct Rule {
    stream: Arc<Stream>,
    stream_rule: StreamRule,
    rule_type: RuleType,
    matcher: Matcher,
}

impl Rule {
    /// Resolve a stream rule into an evaluable unit.
    ///
    /// Fails on unknown rule type codes and structural invariant
    /// violations; the caller skips the offending rule and keeps the
    /// stream's remaining rules.
    pub fn resolve(stream: Arc<Stream>, stream_rule: StreamRule) -> Result<Self> {
        let rule_type = RuleType::from_code(stream_rule.rule_type)?;
        let matcher = Matcher::resolve(&stream_rule)?;

        Ok(Self {
            stream,
            stream_rule,
            rule_type,
            matcher,
        })
    }

    /// The owning stream
    pub fn stream(&self) -> &Arc<Stream> {
        &self.stream
    }

    /// The owning stream's id
    pub fn stream_id(&self) -> &str {
        &self.stream.id
    }

    /// The underlying stream rule's id
    pub fn rule_id(&self) -> &str {
        &self.stream_rule.id
    }

    /// The underlying stream rule
    pub fn stream_rule(&self) -> &StreamRule {
        &self.stream_rule
    }

    /// The resolved rule type
    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    /// The owning stream's matching type
    pub fn matching_type(&self) -> MatchingType {
        self.stream.matching_type
    }

    /// The message field this rule inspects
    pub fn field(&self) -> &str {
        &self.stream_rule.field
    }

    /// Whether this rule is only worth evaluating when its field exists.
    ///
    /// Presence, always-match, and match-input rules are field-independent
    /// (presence is about absence too); everything else is subject to the
    /// engines' field pruning.
    pub fn needs_field_presence(&self) -> bool {
        !matches!(
            self.rule_type,
            RuleType::Presence | RuleType::AlwaysMatch | RuleType::MatchInput
        )
    }

    /// Evaluate this rule against a message, timing the call.
    ///
    /// Evaluation errors count as non-match: the exception meter is
    /// marked and processing continues.
    pub fn evaluate(&self, message: &Message, metrics: &StreamMetrics) -> bool {
        let start = Instant::now();
        let raw = self.matcher.matches(message, &self.stream_rule);
        metrics.record_execution_time(self.stream_id(), self.rule_id(), start.elapsed());

        self.finish(raw, metrics)
    }

    /// Evaluate a regex rule under a hard deadline.
    ///
    /// The pattern runs on the blocking pool; if the deadline elapses the
    /// computation is detached, the owning stream is reported to the
    /// fault manager, and the rule counts as non-matching. Non-regex
    /// rules fall back to plain evaluation.
    pub async fn evaluate_with_deadline(
        &self,
        message: &Message,
        deadline: Duration,
        metrics: &StreamMetrics,
        faults: &FaultManager,
    ) -> bool {
        let Matcher::Regex(pattern) = &self.matcher else {
            return self.evaluate(message, metrics);
        };

        let start = Instant::now();
        let raw = match (pattern, message.field(self.field())) {
            (None, _) => Err(Error::matcher(format!(
                "rule {} has an invalid regex pattern",
                self.rule_id()
            ))),
            (Some(_), None) => Ok(false),
            (Some(regex), Some(value)) => {
                let regex = regex.clone();
                let haystack = value.as_text();
                let eval = tokio::task::spawn_blocking(move || regex.is_match(&haystack));

                match tokio::time::timeout(deadline, eval).await {
                    Ok(Ok(matched)) => Ok(matched),
                    Ok(Err(e)) => Err(Error::matcher(format!("regex evaluation failed: {e}"))),
                    Err(_elapsed) => {
                        metrics.record_execution_time(
                            self.stream_id(),
                            self.rule_id(),
                            start.elapsed(),
                        );
                        faults.register_failure(&self.stream).await;
                        return false;
                    }
                }
            }
        };
        metrics.record_execution_time(self.stream_id(), self.rule_id(), start.elapsed());

        self.finish(raw, metrics)
    }

    fn finish(&self, raw: Result<bool>, metrics: &StreamMetrics) -> bool {
        match raw {
            Ok(matched) => matched != self.stream_rule.inverted,
            Err(e) => {
                debug!(
                    stream = %self.stream_id(),
                    rule = %self.rule_id(),
                    error = %e,
                    "stream rule evaluation failed"
                );
                metrics.mark_exception(self.stream_id());
                false
            }
        }
    }
}
