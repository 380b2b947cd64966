//! Change detection for fetched payloads
//!
//! A fingerprint is a short SHA-256 digest over the fields a user can actually
//! see for each tracked entity: its identifier, score(s), status description and
//! live clock. Server timestamps, ordering of entries and any other metadata do
//! not contribute, so two payloads that would render identically share a
//! fingerprint and a background refresh of them causes no visible update.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::fetch::Payload;

/// Number of digest bytes kept in a fingerprint
const FINGERPRINT_BYTES: usize = 16;

/// The visible fields of one tracked entity (a game, a match, a race)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisibleState {
    pub id: String,
    pub scores: Vec<String>,
    pub status: String,
    pub clock: String,
}

impl VisibleState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scores: Vec::new(),
            status: String::new(),
            clock: String::new(),
        }
    }

    pub fn with_score(mut self, score: impl ToString) -> Self {
        self.scores.push(score.to_string());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_clock(mut self, clock: impl Into<String>) -> Self {
        self.clock = clock.into();
        self
    }
}

/// Deterministic digest of a payload's visible content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of a payload
pub fn fingerprint<P: Payload>(payload: &P) -> Fingerprint {
    fingerprint_states(payload.visible_states())
}

/// Computes the fingerprint of a set of entity states, ignoring their order
pub fn fingerprint_states(mut states: Vec<VisibleState>) -> Fingerprint {
    states.sort();

    let mut hasher = Sha256::new();
    hasher.update((states.len() as u64).to_le_bytes());
    for state in &states {
        write_field(&mut hasher, &state.id);
        hasher.update((state.scores.len() as u64).to_le_bytes());
        for score in &state.scores {
            write_field(&mut hasher, score);
        }
        write_field(&mut hasher, &state.status);
        write_field(&mut hasher, &state.clock);
    }

    let digest = hasher.finalize();
    Fingerprint(hex::encode(&digest[..FINGERPRINT_BYTES]))
}

// Length-prefixed so that ("ab", "c") and ("a", "bc") never collide.
fn write_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}
