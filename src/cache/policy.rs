//! Freshness policy: how stale each partition class may become

use std::time::Duration;
use thiserror::Error;

use crate::partition::{PartitionClass, PartitionKey};

/// Errors raised when constructing a policy that breaks the TTL ordering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A TTL of zero would make every entry permanently stale
    #[error("TTL for {0} partitions must be greater than zero")]
    ZeroTtl(PartitionClass),

    /// Live data must expire strictly before static data
    #[error("live TTL ({live:?}) must be shorter than static TTL ({fixed:?})")]
    Inverted { live: Duration, fixed: Duration },
}

/// Maps a partition class to its time-to-live
///
/// Only decides how much staleness is tolerable, never whether to fetch.
/// Construction enforces `ttl(live-sensitive) < ttl(static)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    live_ttl: Duration,
    static_ttl: Duration,
}

impl FreshnessPolicy {
    pub const DEFAULT_LIVE_TTL: Duration = Duration::from_secs(30);
    pub const DEFAULT_STATIC_TTL: Duration = Duration::from_secs(300);

    /// Creates a policy, rejecting zero or inverted TTLs
    pub fn new(live_ttl: Duration, static_ttl: Duration) -> Result<Self, PolicyError> {
        if live_ttl.is_zero() {
            return Err(PolicyError::ZeroTtl(PartitionClass::LiveSensitive));
        }
        if static_ttl.is_zero() {
            return Err(PolicyError::ZeroTtl(PartitionClass::Static));
        }
        if live_ttl >= static_ttl {
            return Err(PolicyError::Inverted {
                live: live_ttl,
                fixed: static_ttl,
            });
        }
        Ok(Self {
            live_ttl,
            static_ttl,
        })
    }

    pub fn ttl_for(&self, key: &PartitionKey) -> Duration {
        self.ttl_for_class(key.class())
    }

    pub fn ttl_for_class(&self, class: PartitionClass) -> Duration {
        match class {
            PartitionClass::LiveSensitive => self.live_ttl,
            PartitionClass::Static => self.static_ttl,
        }
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            live_ttl: Self::DEFAULT_LIVE_TTL,
            static_ttl: Self::DEFAULT_STATIC_TTL,
        }
    }
}
