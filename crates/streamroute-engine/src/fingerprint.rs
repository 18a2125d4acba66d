//! Generation content fingerprint
//!
//! A deterministic digest over a stream list's identity-relevant content:
//! streams sorted by id, each stream's rules sorted by rule id, each
//! stream's outputs sorted by output id. Two generations built from the
//! same stream/rule/output sets produce the same fingerprint regardless
//! of input ordering, which lets the router skip no-op rebuild swaps.

use sha2::{Digest, Sha256};
use std::sync::Arc;

use streamroute_core::{MatchingType, Stream};

const UNIT_SEP: &[u8] = b"\x1f";
const RECORD_SEP: &[u8] = b"\x1e";

/// Compute the fingerprint of a stream list
pub fn fingerprint(streams: &[Arc<Stream>]) -> String {
    let mut sorted: Vec<&Arc<Stream>> = streams.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = Sha256::new();
    for stream in sorted {
        hash_stream(&mut hasher, stream);
    }

    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn hash_stream(hasher: &mut Sha256, stream: &Stream) {
    hasher.update(stream.id.as_bytes());
    hasher.update(UNIT_SEP);
    hasher.update(stream.title.as_bytes());
    hasher.update(UNIT_SEP);
    hasher.update(match stream.matching_type {
        MatchingType::And => b"and".as_slice(),
        MatchingType::Or => b"or".as_slice(),
    });
    hasher.update(UNIT_SEP);
    hasher.update([stream.enabled as u8, stream.remove_matches_from_default_stream as u8]);
    hasher.update(RECORD_SEP);

    let mut rules: Vec<_> = stream.rules.iter().collect();
    rules.sort_by(|a, b| a.id.cmp(&b.id));
    for rule in rules {
        hasher.update(rule.id.as_bytes());
        hasher.update(UNIT_SEP);
        hasher.update(rule.stream_id.as_bytes());
        hasher.update(UNIT_SEP);
        hasher.update(rule.rule_type.to_le_bytes());
        hasher.update(rule.field.as_bytes());
        hasher.update(UNIT_SEP);
        // Presence tag keeps a missing value distinct from any literal.
        match rule.value.as_deref() {
            Some(value) => {
                hasher.update([1u8]);
                hasher.update(value.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update(UNIT_SEP);
        hasher.update([rule.inverted as u8]);
        hasher.update(RECORD_SEP);
    }

    let mut outputs: Vec<_> = stream.outputs.iter().collect();
    outputs.sort_by(|a, b| a.id.cmp(&b.id));
    for output in outputs {
        hasher.update(output.id.as_bytes());
        hasher.update(UNIT_SEP);
        hasher.update(output.title.as_bytes());
        hasher.update(RECORD_SEP);
    }
}
