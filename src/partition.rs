//! Partition keys
//!
//! A partition is one independently cached, independently polled slice of data
//! (a date filter on a scoreboard, a single team, a single game). Every cache slot
//! and every polling decision is addressed by a `PartitionKey`.

use std::fmt;
use std::sync::Arc;

/// How likely the data behind a partition is to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionClass {
    /// Data that can change at any moment (today's games, upcoming fixtures)
    LiveSensitive,
    /// Data that is effectively settled (yesterday's results, standings)
    Static,
}

impl PartitionClass {
    /// Returns the kebab-case label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            PartitionClass::LiveSensitive => "live-sensitive",
            PartitionClass::Static => "static",
        }
    }
}

impl fmt::Display for PartitionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Opaque, immutable identifier of one cache slot
///
/// The selector names the entity or view (e.g. `nfl/today`, `nba/game/401584701`)
/// and the class decides freshness and whether the partition is polled. Cloning is
/// cheap: the selector is reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    selector: Arc<str>,
    class: PartitionClass,
}

impl PartitionKey {
    /// Creates a key from a selector and a class
    pub fn new(selector: impl AsRef<str>, class: PartitionClass) -> Self {
        Self {
            selector: Arc::from(selector.as_ref()),
            class,
        }
    }

    /// Shorthand for a live-sensitive key
    pub fn live(selector: impl AsRef<str>) -> Self {
        Self::new(selector, PartitionClass::LiveSensitive)
    }

    /// Shorthand for a static key
    pub fn fixed(selector: impl AsRef<str>) -> Self {
        Self::new(selector, PartitionClass::Static)
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn class(&self) -> PartitionClass {
        self.class
    }

    pub fn is_live_sensitive(&self) -> bool {
        self.class == PartitionClass::LiveSensitive
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.selector, self.class)
    }
}
