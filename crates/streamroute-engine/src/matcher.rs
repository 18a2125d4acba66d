//! Stream rule matchers
//!
//! One pure predicate per rule type. A matcher returns the raw match
//! result; rule inversion is applied by the caller so that evaluation
//! errors bypass it (an erroring rule never matches, inverted or not).

use regex::Regex;
use streamroute_core::{Error, FieldValue, Message, Result, RuleType, StreamRule};

/// A resolved predicate for one stream rule
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Field's string value equals the rule value
    Exact,
    /// Field's string value contains the rule value (case-sensitive)
    Contains,
    /// Numeric field value is greater than the rule value
    Greater,
    /// Numeric field value is smaller than the rule value
    Smaller,
    /// Field exists on the message
    Presence,
    /// Matches every message
    AlwaysMatch,
    /// Rule value equals the message's originating input id
    MatchInput,
    /// Field's string value contains a regex match.
    ///
    /// `None` means the pattern failed to compile; the rule then yields
    /// an evaluation error (non-match plus exception metric) on every
    /// call rather than failing engine construction.
    Regex(Option<Regex>),
}

impl Matcher {
    /// Resolve the matcher for a stream rule.
    ///
    /// Fails on unknown type codes and on a missing value for any type
    /// other than always-match; the owning rule is then skipped.
    pub fn resolve(rule: &StreamRule) -> Result<Self> {
        let rule_type = RuleType::from_code(rule.rule_type)?;

        if rule.value.is_none() && rule_type != RuleType::AlwaysMatch {
            return Err(Error::invalid_rule(format!(
                "rule {} has no value but type {:?} requires one",
                rule.id, rule_type
            )));
        }

        Ok(match rule_type {
            RuleType::Exact => Self::Exact,
            RuleType::Contains => Self::Contains,
            RuleType::Greater => Self::Greater,
            RuleType::Smaller => Self::Smaller,
            RuleType::Presence => Self::Presence,
            RuleType::AlwaysMatch => Self::AlwaysMatch,
            RuleType::MatchInput => Self::MatchInput,
            RuleType::Regex => {
                let pattern = rule.value.as_deref().unwrap_or_default();
                Self::Regex(Regex::new(pattern).ok())
            }
        })
    }

    /// Evaluate the raw predicate against a message.
    ///
    /// A missing field is an ordinary non-match; `Err` is reserved for
    /// genuine evaluation failures (non-numeric comparison operands, an
    /// uncompilable regex pattern).
    pub fn matches(&self, message: &Message, rule: &StreamRule) -> Result<bool> {
        match self {
            Self::AlwaysMatch => Ok(true),

            Self::Presence => Ok(message.has_field(&rule.field)),

            Self::MatchInput => Ok(message.source_input_id() == rule.value.as_deref()),

            Self::Exact => Ok(match (message.field(&rule.field), rule.value.as_deref()) {
                (Some(value), Some(expected)) => value.as_text() == expected,
                _ => false,
            }),

            Self::Contains => Ok(match (message.field(&rule.field), rule.value.as_deref()) {
                (Some(value), Some(needle)) => value.as_text().contains(needle),
                _ => false,
            }),

            Self::Greater => compare(message, rule, |field, bound| field > bound),

            Self::Smaller => compare(message, rule, |field, bound| field < bound),

            Self::Regex(Some(regex)) => Ok(match message.field(&rule.field) {
                Some(value) => regex.is_match(&value.as_text()),
                None => false,
            }),

            Self::Regex(None) => Err(Error::matcher(format!(
                "rule {} has an invalid regex pattern",
                rule.id
            ))),
        }
    }
}

fn compare(message: &Message, rule: &StreamRule, cmp: fn(f64, f64) -> bool) -> Result<bool> {
    let Some(field) = message.field(&rule.field) else {
        return Ok(false);
    };
    let field = numeric(field, &rule.field)?;
    let bound = rule
        .value
        .as_deref()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or_else(|| Error::matcher(format!("rule {} has a non-numeric value", rule.id)))?;

    Ok(cmp(field, bound))
}

fn numeric(value: &FieldValue, field: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| Error::matcher(format!("field {field} is not numeric")))
}
