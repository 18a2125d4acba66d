//! Engine generations
//!
//! A generation is one immutable, fully-indexed snapshot of all enabled
//! streams' rules. It is built once, answers `match_message` calls from
//! arbitrarily many concurrent readers, and is discarded when the router
//! swaps in a successor.
//!
//! Two construction strategies exist:
//! - [`IndexedEngine`] — the reference implementation: per-type rule
//!   buckets keyed by field name, a per-stream match tally, and field-set
//!   intersection so only rules on fields actually present in the message
//!   are evaluated.
//! - [`EarlyExitEngine`] — a flat rule list in the same type precedence
//!   with a per-message blacklist of streams whose outcome is already
//!   decided (an OR rule matching, or an AND rule failing).
//!
//! Both must produce identical match sets for the same inputs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use streamroute_core::{MatchingType, Message, RuleType, Stream};
use streamroute_telemetry::StreamMetrics;
use tracing::warn;

use crate::config::EngineVariant;
use crate::fault::FaultManager;
use crate::fingerprint::fingerprint;
use crate::rule::Rule;

/// One stream's resolved rules within a generation
struct StreamRules {
    stream: Arc<Stream>,
    rules: Vec<Arc<Rule>>,
}

/// State shared by both engine strategies
struct EngineBase {
    streams: Vec<Arc<Stream>>,
    per_stream: Vec<StreamRules>,
    fingerprint: String,
    metrics: StreamMetrics,
    faults: Arc<FaultManager>,
    timeout: Duration,
}

impl EngineBase {
    fn build(streams: Vec<Stream>, metrics: StreamMetrics, faults: Arc<FaultManager>) -> Self {
        let streams: Vec<Arc<Stream>> = streams
            .into_iter()
            .filter(|stream| stream.enabled)
            .map(Arc::new)
            .collect();
        let fingerprint = fingerprint(&streams);

        let per_stream = streams
            .iter()
            .map(|stream| {
                let rules = stream
                    .rules
                    .iter()
                    .filter_map(|stream_rule| {
                        match Rule::resolve(stream.clone(), stream_rule.clone()) {
                            Ok(rule) => Some(Arc::new(rule)),
                            Err(e) => {
                                warn!(
                                    stream = %stream.id,
                                    rule = %stream_rule.id,
                                    error = %e,
                                    "skipping invalid stream rule"
                                );
                                None
                            }
                        }
                    })
                    .collect();
                StreamRules {
                    stream: stream.clone(),
                    rules,
                }
            })
            .collect();

        let timeout = faults.processing_timeout();
        Self {
            streams,
            per_stream,
            fingerprint,
            metrics,
            faults,
            timeout,
        }
    }

    /// Per-stream decision over a match tally. A stream with zero rules
    /// never matches.
    fn decide(&self, tally: &HashMap<&str, usize>) -> Vec<Arc<Stream>> {
        let mut matched = Vec::new();
        for entry in &self.per_stream {
            if entry.rules.is_empty() {
                continue;
            }
            let count = tally.get(entry.stream.id.as_str()).copied().unwrap_or(0);
            let hit = match entry.stream.matching_type {
                MatchingType::And => count == entry.rules.len(),
                MatchingType::Or => count > 0,
            };
            if hit {
                self.metrics.mark_incoming(&entry.stream.id);
                matched.push(entry.stream.clone());
            }
        }
        matched
    }

    /// Diagnostic full evaluation: every rule of every stream, no
    /// deadline. A field-dependent rule on an absent field is a
    /// non-match without inversion, exactly as on the match path.
    fn test_match(&self, message: &Message) -> Vec<StreamTestMatch> {
        self.per_stream
            .iter()
            .map(|entry| {
                let matches = entry
                    .rules
                    .iter()
                    .map(|rule| {
                        let matched = if rule.needs_field_presence()
                            && !message.has_field(rule.field())
                        {
                            false
                        } else {
                            rule.evaluate(message, &self.metrics)
                        };
                        (rule.rule_id().to_string(), matched)
                    })
                    .collect();
                StreamTestMatch {
                    stream: entry.stream.clone(),
                    matches,
                }
            })
            .collect()
    }
}

/// Per-stream trace of a diagnostic [`Engine::test_match`] run
#[derive(Debug)]
pub struct StreamTestMatch {
    stream: Arc<Stream>,
    matches: HashMap<String, bool>,
}

impl StreamTestMatch {
    /// The traced stream
    pub fn stream(&self) -> &Arc<Stream> {
        &self.stream
    }

    /// Per-rule match results, keyed by rule id
    pub fn matches(&self) -> &HashMap<String, bool> {
        &self.matches
    }

    /// The stream-level decision under its matching type
    pub fn is_matched(&self) -> bool {
        match self.stream.matching_type {
            MatchingType::Or => self.matches.values().any(|matched| *matched),
            MatchingType::And => {
                !self.matches.is_empty() && self.matches.values().all(|matched| *matched)
            }
        }
    }
}

/// Rules of one type, indexed by the field they inspect
#[derive(Default)]
struct FieldIndex {
    by_field: HashMap<String, Vec<Arc<Rule>>>,
}

impl FieldIndex {
    fn insert(&mut self, rule: Arc<Rule>) {
        self.by_field
            .entry(rule.field().to_string())
            .or_default()
            .push(rule);
    }

    fn rules_for(&self, field: &str) -> Option<&[Arc<Rule>]> {
        self.by_field.get(field).map(Vec::as_slice)
    }
}

/// Bucket/tally engine generation — the reference strategy
pub struct IndexedEngine {
    base: EngineBase,
    always: Vec<Arc<Rule>>,
    presence: Vec<Arc<Rule>>,
    match_input: Vec<Arc<Rule>>,
    exact: FieldIndex,
    greater: FieldIndex,
    smaller: FieldIndex,
    contains: FieldIndex,
    regex: FieldIndex,
}

impl IndexedEngine {
    /// Build a generation from the enabled-stream list
    pub fn build(streams: Vec<Stream>, metrics: StreamMetrics, faults: Arc<FaultManager>) -> Self {
        let base = EngineBase::build(streams, metrics, faults);

        let mut always = Vec::new();
        let mut presence = Vec::new();
        let mut match_input = Vec::new();
        let mut exact = FieldIndex::default();
        let mut greater = FieldIndex::default();
        let mut smaller = FieldIndex::default();
        let mut contains = FieldIndex::default();
        let mut regex = FieldIndex::default();

        for entry in &base.per_stream {
            for rule in &entry.rules {
                match rule.rule_type() {
                    RuleType::AlwaysMatch => always.push(rule.clone()),
                    RuleType::Presence => presence.push(rule.clone()),
                    RuleType::MatchInput => match_input.push(rule.clone()),
                    RuleType::Exact => exact.insert(rule.clone()),
                    RuleType::Greater => greater.insert(rule.clone()),
                    RuleType::Smaller => smaller.insert(rule.clone()),
                    RuleType::Contains => contains.insert(rule.clone()),
                    RuleType::Regex => regex.insert(rule.clone()),
                }
            }
        }

        Self {
            base,
            always,
            presence,
            match_input,
            exact,
            greater,
            smaller,
            contains,
            regex,
        }
    }

    /// Match a message against all streams of this generation.
    ///
    /// Bucket evaluation order is fixed: field-independent checks first,
    /// then the scalar buckets intersected with the message's field set,
    /// regex (deadline-bounded) last — so the cheap, deterministic checks
    /// resolve most streams before any regex runs.
    pub async fn match_message(&self, message: &Message) -> Vec<Arc<Stream>> {
        let mut tally: HashMap<&str, usize> = HashMap::new();

        eval_list(&self.always, message, &self.base.metrics, &mut tally);
        eval_list(&self.presence, message, &self.base.metrics, &mut tally);
        self.eval_index(&self.exact, message, &mut tally);
        eval_list(&self.match_input, message, &self.base.metrics, &mut tally);
        self.eval_index(&self.greater, message, &mut tally);
        self.eval_index(&self.smaller, message, &mut tally);
        self.eval_index(&self.contains, message, &mut tally);

        // Regex bucket last, each invocation deadline-bounded. A timeout
        // counts as non-matching and processing continues.
        for field in message.field_names() {
            let Some(rules) = self.regex.rules_for(field) else {
                continue;
            };
            for rule in rules {
                let matched = rule
                    .evaluate_with_deadline(
                        message,
                        self.base.timeout,
                        &self.base.metrics,
                        &self.base.faults,
                    )
                    .await;
                if matched {
                    *tally.entry(rule.stream_id()).or_insert(0) += 1;
                }
            }
        }

        self.base.decide(&tally)
    }

    fn eval_index<'a>(
        &'a self,
        index: &'a FieldIndex,
        message: &Message,
        tally: &mut HashMap<&'a str, usize>,
    ) {
        // Intersection pruning: only rules on fields actually present in
        // the message are evaluated.
        for field in message.field_names() {
            let Some(rules) = index.rules_for(field) else {
                continue;
            };
            for rule in rules {
                if rule.evaluate(message, &self.base.metrics) {
                    *tally.entry(rule.stream_id()).or_insert(0) += 1;
                }
            }
        }
    }
}

fn eval_list<'a>(
    rules: &'a [Arc<Rule>],
    message: &Message,
    metrics: &StreamMetrics,
    tally: &mut HashMap<&'a str, usize>,
) {
    for rule in rules {
        if rule.evaluate(message, metrics) {
            *tally.entry(rule.stream_id()).or_insert(0) += 1;
        }
    }
}

/// Flat-list engine generation with early stream decisions
pub struct EarlyExitEngine {
    base: EngineBase,
    rules: Vec<Arc<Rule>>,
}

impl EarlyExitEngine {
    /// Build a generation from the enabled-stream list
    pub fn build(streams: Vec<Stream>, metrics: StreamMetrics, faults: Arc<FaultManager>) -> Self {
        let base = EngineBase::build(streams, metrics, faults);

        let mut rules: Vec<Arc<Rule>> = base
            .per_stream
            .iter()
            .flat_map(|entry| entry.rules.iter().cloned())
            .collect();
        rules.sort_by_key(|rule| precedence(rule.rule_type()));

        Self { base, rules }
    }

    /// Match a message against all streams of this generation.
    ///
    /// Behaviorally equivalent to [`IndexedEngine::match_message`]: a
    /// stream is skipped as soon as its outcome is decided — an OR rule
    /// matching satisfies it, an AND rule failing (or inspecting a field
    /// the message lacks) rules it out.
    pub async fn match_message(&self, message: &Message) -> Vec<Arc<Stream>> {
        let mut result: HashMap<&str, Arc<Stream>> = HashMap::new();
        let mut blacklist: HashSet<&str> = HashSet::new();

        for rule in &self.rules {
            let stream_id = rule.stream_id();
            if blacklist.contains(stream_id) {
                continue;
            }

            if rule.needs_field_presence() && !message.has_field(rule.field()) {
                if rule.matching_type() == MatchingType::And {
                    result.remove(stream_id);
                    blacklist.insert(stream_id);
                }
                continue;
            }

            let matched = if rule.rule_type() == RuleType::Regex {
                rule.evaluate_with_deadline(
                    message,
                    self.base.timeout,
                    &self.base.metrics,
                    &self.base.faults,
                )
                .await
            } else {
                rule.evaluate(message, &self.base.metrics)
            };

            if matched {
                result.insert(stream_id, rule.stream().clone());
                if rule.matching_type() == MatchingType::Or {
                    blacklist.insert(stream_id);
                }
            } else if rule.matching_type() == MatchingType::And {
                result.remove(stream_id);
                blacklist.insert(stream_id);
            }
        }

        let matched: Vec<Arc<Stream>> = result.into_values().collect();
        for stream in &matched {
            self.base.metrics.mark_incoming(&stream.id);
        }
        matched
    }
}

/// Evaluation precedence shared by both strategies: cheapest and most
/// deterministic checks first, regex last.
fn precedence(rule_type: RuleType) -> u8 {
    match rule_type {
        RuleType::AlwaysMatch => 0,
        RuleType::Presence => 1,
        RuleType::Exact => 2,
        RuleType::MatchInput => 3,
        RuleType::Greater => 4,
        RuleType::Smaller => 5,
        RuleType::Contains => 6,
        RuleType::Regex => 7,
    }
}

/// An engine generation built with either construction strategy
pub enum Engine {
    /// Bucket/tally reference strategy
    Indexed(IndexedEngine),
    /// Flat-list early-exit strategy
    EarlyExit(EarlyExitEngine),
}

impl Engine {
    /// Build a generation using the configured strategy
    pub fn build(
        variant: EngineVariant,
        streams: Vec<Stream>,
        metrics: StreamMetrics,
        faults: Arc<FaultManager>,
    ) -> Self {
        match variant {
            EngineVariant::Indexed => Self::Indexed(IndexedEngine::build(streams, metrics, faults)),
            EngineVariant::EarlyExit => {
                Self::EarlyExit(EarlyExitEngine::build(streams, metrics, faults))
            }
        }
    }

    /// Match a message, returning the streams it routes to
    pub async fn match_message(&self, message: &Message) -> Vec<Arc<Stream>> {
        match self {
            Self::Indexed(engine) => engine.match_message(message).await,
            Self::EarlyExit(engine) => engine.match_message(message).await,
        }
    }

    /// Diagnostic full evaluation for rule-authoring tooling.
    ///
    /// Evaluates every rule of every stream with no deadline; mirrors
    /// `match_message`'s per-stream boolean semantics (including the
    /// absent-field pruning) but not its execution strategy. Never use
    /// on the ingestion path.
    pub fn test_match(&self, message: &Message) -> Vec<StreamTestMatch> {
        self.base().test_match(message)
    }

    /// This generation's content fingerprint
    pub fn fingerprint(&self) -> &str {
        &self.base().fingerprint
    }

    /// The streams this generation was built from
    pub fn streams(&self) -> &[Arc<Stream>] {
        &self.base().streams
    }

    fn base(&self) -> &EngineBase {
        match self {
            Self::Indexed(engine) => &engine.base,
            Self::EarlyExit(engine) => &engine.base,
        }
    }
}
