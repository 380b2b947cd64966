//! Cache module for partitioned payloads
//!
//! This module provides the in-memory partition store, the freshness policy that
//! decides how long each partition class stays valid, and the change detector that
//! fingerprints payloads so unchanged refreshes can be suppressed. Expired and
//! invalidated entries keep their payload, allowing the controller to fall back to
//! stale data when the upstream API is unavailable.

mod fingerprint;
mod policy;
mod store;

pub use fingerprint::{fingerprint, fingerprint_states, Fingerprint, VisibleState};
pub use policy::{FreshnessPolicy, PolicyError};
pub use store::{CacheEntry, CachePartitionStore};
