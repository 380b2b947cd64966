//! Fetch orchestration
//!
//! Decides, for one partition and one fetch mode, whether a request can be
//! served from cache, must go to the network, or can be skipped; and applies a
//! settled network result to the store. Both halves are synchronous. The
//! controller owns the actual task spawning, so every decision here can be
//! tested without a runtime.

use std::collections::HashMap;
use std::fmt;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{CachePartitionStore, FreshnessPolicy};
use crate::fetch::{FetchError, Payload};
use crate::partition::PartitionKey;

/// Whether the user is waiting on a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// User-visible; may raise the loading indicator and alerts
    Foreground,
    /// Background; only reaches the UI if it changes the active partition
    Silent,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::Foreground => f.write_str("foreground"),
            FetchMode::Silent => f.write_str("silent"),
        }
    }
}

/// Why a fetch was issued, recorded for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchReason {
    /// The host asked for it (activation, refresh, focus)
    Requested,
    /// A foreground cache hit on a live partition wants to check for updates
    CacheCheck,
    /// The polling timer ticked
    Poll,
    /// Warming a non-active partition
    Preload,
}

impl fmt::Display for FetchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchReason::Requested => "requested",
            FetchReason::CacheCheck => "cache-check",
            FetchReason::Poll => "poll",
            FetchReason::Preload => "preload",
        };
        f.write_str(label)
    }
}

/// An issued network fetch, carried to the task and back with its result
#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub key: PartitionKey,
    pub mode: FetchMode,
    pub reason: FetchReason,
    /// Whether this fetch raised the loading indicator
    pub shows_loading: bool,
}

/// What to do about a fetch request
#[derive(Debug)]
pub enum FetchPlan<P> {
    /// Serve the cached payload now; optionally run a background check as well
    Cached {
        payload: P,
        check: Option<FetchTicket>,
    },
    /// Go to the network
    Network(FetchTicket),
    /// A fetch for this partition is already in flight
    Skip,
}

/// Result of applying a settled fetch to the store
#[derive(Debug)]
pub enum Settlement<P> {
    /// The payload was stored; `surface` is set when it should become visible
    Applied {
        surface: Option<P>,
        changed: bool,
        terminal: bool,
    },
    /// A foreground fetch failed but a previous payload is available
    StaleFallback {
        payload: P,
        error: FetchError,
    },
    /// A foreground fetch failed with nothing to fall back to
    Failed { error: FetchError },
    /// A silent fetch failed; nothing visible changes
    Swallowed { error: FetchError },
}

/// Counters describing fetch activity over a controller's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub network_fetches: u64,
    pub cache_hits: u64,
    pub skipped: u64,
    pub applied: u64,
    pub suppressed_updates: u64,
    pub foreground_failures: u64,
    pub silent_failures: u64,
}

/// Plans fetches against the store and applies their results
#[derive(Debug)]
pub struct FetchOrchestrator<P> {
    store: CachePartitionStore<P>,
    in_flight: HashMap<PartitionKey, usize>,
    loading: usize,
    stats: FetchStats,
}

impl<P: Payload> FetchOrchestrator<P> {
    pub fn new(policy: FreshnessPolicy) -> Self {
        Self {
            store: CachePartitionStore::new(policy),
            in_flight: HashMap::new(),
            loading: 0,
            stats: FetchStats::default(),
        }
    }

    pub fn store(&self) -> &CachePartitionStore<P> {
        &self.store
    }

    pub fn stats(&self) -> FetchStats {
        self.stats
    }

    /// True while a fetch that raised the loading indicator is outstanding
    pub fn is_loading(&self) -> bool {
        self.loading > 0
    }

    pub fn in_flight(&self, key: &PartitionKey) -> usize {
        self.in_flight.get(key).copied().unwrap_or(0)
    }

    /// Forces the next foreground fetch of `key` to go to the network
    pub fn invalidate(&mut self, key: &PartitionKey) -> bool {
        self.store.clear(key)
    }

    /// Decides how to satisfy a fetch request and registers any network fetch
    pub fn plan(
        &mut self,
        key: &PartitionKey,
        mode: FetchMode,
        reason: FetchReason,
        now: Instant,
    ) -> FetchPlan<P> {
        match mode {
            FetchMode::Foreground if self.store.is_valid(key, now) => {
                let Some(entry) = self.store.get(key) else {
                    return FetchPlan::Skip;
                };
                let payload = entry.payload().clone();
                self.stats.cache_hits += 1;

                // A live game is checked even on a static partition.
                let wants_check =
                    payload.is_live() || (key.is_live_sensitive() && !payload.is_terminal());
                let check = if wants_check && self.in_flight(key) == 0 {
                    Some(self.register(key, FetchMode::Silent, FetchReason::CacheCheck, false))
                } else {
                    None
                };
                debug!(partition = %key, background_check = check.is_some(), "cache hit");
                FetchPlan::Cached { payload, check }
            }
            FetchMode::Foreground => {
                let shows_loading = self.store.get(key).is_none();
                FetchPlan::Network(self.register(key, mode, reason, shows_loading))
            }
            FetchMode::Silent => {
                if self.in_flight(key) > 0 {
                    self.stats.skipped += 1;
                    debug!(partition = %key, %reason, "silent fetch skipped, already in flight");
                    return FetchPlan::Skip;
                }
                FetchPlan::Network(self.register(key, mode, reason, false))
            }
        }
    }

    /// Applies a settled fetch
    ///
    /// `is_active` is evaluated by the caller at apply time, not issue time: a
    /// result for a partition the user has since left is still cached but never
    /// surfaced.
    pub fn settle(
        &mut self,
        ticket: &FetchTicket,
        result: Result<P, FetchError>,
        is_active: bool,
        now: Instant,
    ) -> Settlement<P> {
        self.unregister(ticket);

        match result {
            Ok(payload) => {
                let terminal = payload.is_terminal();
                let changed = self.store.put(ticket.key.clone(), payload.clone(), now);
                self.stats.applied += 1;

                let surface = match ticket.mode {
                    FetchMode::Foreground => is_active,
                    FetchMode::Silent => changed && is_active,
                };
                if !changed && ticket.mode == FetchMode::Silent {
                    self.stats.suppressed_updates += 1;
                }
                debug!(
                    partition = %ticket.key,
                    mode = %ticket.mode,
                    reason = %ticket.reason,
                    changed,
                    surface,
                    "fetch applied"
                );

                Settlement::Applied {
                    surface: surface.then_some(payload),
                    changed,
                    terminal,
                }
            }
            Err(error) => match ticket.mode {
                FetchMode::Foreground => {
                    self.stats.foreground_failures += 1;
                    warn!(
                        partition = %ticket.key,
                        reason = %ticket.reason,
                        error = %error,
                        "foreground fetch failed"
                    );
                    match self.store.get(&ticket.key) {
                        Some(entry) => Settlement::StaleFallback {
                            payload: entry.payload().clone(),
                            error,
                        },
                        None => Settlement::Failed { error },
                    }
                }
                FetchMode::Silent => {
                    self.stats.silent_failures += 1;
                    if ticket.reason == FetchReason::Preload {
                        warn!(
                            partition = %ticket.key,
                            error = %error,
                            "preload failed, not retrying"
                        );
                    } else {
                        debug!(
                            partition = %ticket.key,
                            reason = %ticket.reason,
                            error = %error,
                            "silent fetch failed"
                        );
                    }
                    Settlement::Swallowed { error }
                }
            },
        }
    }

    fn register(
        &mut self,
        key: &PartitionKey,
        mode: FetchMode,
        reason: FetchReason,
        shows_loading: bool,
    ) -> FetchTicket {
        *self.in_flight.entry(key.clone()).or_insert(0) += 1;
        if shows_loading {
            self.loading += 1;
        }
        self.stats.network_fetches += 1;
        debug!(partition = %key, %mode, %reason, shows_loading, "network fetch issued");

        FetchTicket {
            key: key.clone(),
            mode,
            reason,
            shows_loading,
        }
    }

    fn unregister(&mut self, ticket: &FetchTicket) {
        if let Some(count) = self.in_flight.get_mut(&ticket.key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.in_flight.remove(&ticket.key);
            }
        }
        if ticket.shows_loading {
            self.loading = self.loading.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Game, GameStatus, Scoreboard, TeamLine};
    use std::time::Duration;

    fn board(home: u32, away: u32, status: GameStatus) -> Scoreboard {
        Scoreboard::new(vec![Game::new(
            "401",
            TeamLine::new("KC", home),
            TeamLine::new("BUF", away),
            status,
        )])
    }

    fn orchestrator() -> FetchOrchestrator<Scoreboard> {
        FetchOrchestrator::new(FreshnessPolicy::default())
    }

    fn foreground(
        orch: &mut FetchOrchestrator<Scoreboard>,
        key: &PartitionKey,
        now: Instant,
    ) -> FetchTicket {
        expect_ticket(orch.plan(key, FetchMode::Foreground, FetchReason::Requested, now))
    }

    fn expect_ticket(plan: FetchPlan<Scoreboard>) -> FetchTicket {
        match plan {
            FetchPlan::Network(ticket) => ticket,
            other => panic!("expected network plan, got {:?}", other),
        }
    }

    #[test]
    fn test_first_foreground_fetch_goes_to_network_with_loading() {
        let mut orch = orchestrator();
        let key = PartitionKey::live("nfl/today");

        let ticket = foreground(&mut orch, &key, Instant::now());

        assert!(ticket.shows_loading);
        assert!(orch.is_loading());
        assert_eq!(orch.in_flight(&key), 1);
    }

    #[test]
    fn test_settle_clears_loading_on_success_and_failure() {
        let mut orch = orchestrator();
        let key = PartitionKey::live("nfl/today");
        let now = Instant::now();

        let ticket = foreground(&mut orch, &key, now);
        orch.settle(&ticket, Ok(board(0, 0, GameStatus::Scheduled)), true, now);
        assert!(!orch.is_loading());

        let other = PartitionKey::live("nfl/upcoming");
        let ticket = foreground(&mut orch, &other, now);
        assert!(orch.is_loading());
        orch.settle(&ticket, Err(FetchError::Unavailable("down".into())), true, now);
        assert!(!orch.is_loading());
        assert_eq!(orch.in_flight(&other), 0);
    }

    #[test]
    fn test_foreground_hit_on_live_partition_schedules_one_check() {
        let mut orch = orchestrator();
        let key = PartitionKey::live("nfl/today");
        let now = Instant::now();

        let ticket = foreground(&mut orch, &key, now);
        orch.settle(&ticket, Ok(board(3, 1, GameStatus::InProgress)), true, now);

        let later = now + Duration::from_secs(10);
        let first = orch.plan(&key, FetchMode::Foreground, FetchReason::Requested, later);
        let second = orch.plan(&key, FetchMode::Foreground, FetchReason::Requested, later);

        match (first, second) {
            (
                FetchPlan::Cached { check: Some(check), payload },
                FetchPlan::Cached { check: None, payload: again },
            ) => {
                assert_eq!(check.mode, FetchMode::Silent);
                assert_eq!(check.reason, FetchReason::CacheCheck);
                assert!(!check.shows_loading);
                assert_eq!(payload, again);
            }
            other => panic!("unexpected plans: {:?}", other),
        }
        assert_eq!(orch.stats().cache_hits, 2);
        assert!(!orch.is_loading());
    }

    #[test]
    fn test_foreground_hit_on_static_partition_has_no_check() {
        let mut orch = orchestrator();
        let key = PartitionKey::fixed("nfl/yesterday");
        let now = Instant::now();

        let ticket = foreground(&mut orch, &key, now);
        orch.settle(&ticket, Ok(board(3, 1, GameStatus::Final)), true, now);

        match orch.plan(&key, FetchMode::Foreground, FetchReason::Requested, now) {
            FetchPlan::Cached { check, .. } => assert!(check.is_none()),
            other => panic!("expected cache hit, got {:?}", other),
        }
    }

    #[test]
    fn test_foreground_hit_on_finished_live_partition_has_no_check() {
        let mut orch = orchestrator();
        let key = PartitionKey::live("nfl/today");
        let now = Instant::now();

        let ticket = foreground(&mut orch, &key, now);
        orch.settle(&ticket, Ok(board(20, 17, GameStatus::Final)), true, now);

        match orch.plan(&key, FetchMode::Foreground, FetchReason::Requested, now) {
            FetchPlan::Cached { check, .. } => assert!(check.is_none()),
            other => panic!("expected cache hit, got {:?}", other),
        }
    }

    #[test]
    fn test_foreground_hit_with_live_game_checks_static_partition() {
        let mut orch = orchestrator();
        let key = PartitionKey::fixed("nfl/yesterday");
        let now = Instant::now();

        let ticket = foreground(&mut orch, &key, now);
        orch.settle(&ticket, Ok(board(3, 1, GameStatus::InProgress)), true, now);

        match orch.plan(&key, FetchMode::Foreground, FetchReason::Requested, now) {
            FetchPlan::Cached { check: Some(check), .. } => {
                assert_eq!(check.reason, FetchReason::CacheCheck);
                assert!(!check.shows_loading);
            }
            other => panic!("expected cache hit with a check, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_entry_refetches_without_loading() {
        let mut orch = orchestrator();
        let key = PartitionKey::live("nfl/today");
        let now = Instant::now();

        let ticket = foreground(&mut orch, &key, now);
        orch.settle(&ticket, Ok(board(3, 1, GameStatus::InProgress)), true, now);

        let expired = now + Duration::from_secs(31);
        let ticket = foreground(&mut orch, &key, expired);
        assert!(!ticket.shows_loading, "stale payload stays on screen");
        assert!(!orch.is_loading());
    }

    #[test]
    fn test_silent_fetch_skipped_while_in_flight() {
        let mut orch = orchestrator();
        let key = PartitionKey::live("nfl/today");
        let now = Instant::now();

        let _ticket = expect_ticket(orch.plan(&key, FetchMode::Silent, FetchReason::Poll, now));
        assert!(matches!(
            orch.plan(&key, FetchMode::Silent, FetchReason::Poll, now),
            FetchPlan::Skip
        ));
        assert_eq!(orch.stats().skipped, 1);
        assert_eq!(orch.stats().network_fetches, 1);
    }

    #[test]
    fn test_silent_result_surfaces_only_when_changed_and_active() {
        let mut orch = orchestrator();
        let key = PartitionKey::live("nfl/today");
        let now = Instant::now();

        let ticket = expect_ticket(orch.plan(&key, FetchMode::Silent, FetchReason::Poll, now));
        match orch.settle(&ticket, Ok(board(3, 1, GameStatus::InProgress)), true, now) {
            Settlement::Applied { surface, changed, .. } => {
                assert!(changed);
                assert!(surface.is_some());
            }
            other => panic!("unexpected settlement: {:?}", other),
        }

        let ticket = expect_ticket(orch.plan(&key, FetchMode::Silent, FetchReason::Poll, now));
        match orch.settle(&ticket, Ok(board(3, 1, GameStatus::InProgress)), true, now) {
            Settlement::Applied { surface, changed, .. } => {
                assert!(!changed);
                assert!(surface.is_none());
            }
            other => panic!("unexpected settlement: {:?}", other),
        }
        assert_eq!(orch.stats().suppressed_updates, 1);

        let ticket = expect_ticket(orch.plan(&key, FetchMode::Silent, FetchReason::Poll, now));
        match orch.settle(&ticket, Ok(board(4, 1, GameStatus::InProgress)), false, now) {
            Settlement::Applied { surface, changed, .. } => {
                assert!(changed);
                assert!(surface.is_none(), "inactive partitions are cached only");
            }
            other => panic!("unexpected settlement: {:?}", other),
        }
        assert_eq!(
            orch.store().get(&key).unwrap().payload(),
            &board(4, 1, GameStatus::InProgress)
        );
    }

    #[test]
    fn test_foreground_result_surfaces_even_when_unchanged() {
        let mut orch = orchestrator();
        let key = PartitionKey::live("nfl/today");
        let now = Instant::now();

        let ticket = expect_ticket(orch.plan(&key, FetchMode::Silent, FetchReason::Preload, now));
        orch.settle(&ticket, Ok(board(3, 1, GameStatus::InProgress)), false, now);
        orch.invalidate(&key);

        let ticket = foreground(&mut orch, &key, now);
        match orch.settle(&ticket, Ok(board(3, 1, GameStatus::InProgress)), true, now) {
            Settlement::Applied { surface, changed, .. } => {
                assert!(!changed);
                assert!(surface.is_some());
            }
            other => panic!("unexpected settlement: {:?}", other),
        }
    }

    #[test]
    fn test_foreground_failure_falls_back_to_stale_payload() {
        let mut orch = orchestrator();
        let key = PartitionKey::fixed("nfl/yesterday");
        let now = Instant::now();

        let ticket = foreground(&mut orch, &key, now);
        orch.settle(&ticket, Ok(board(20, 17, GameStatus::Final)), true, now);
        orch.invalidate(&key);

        let ticket = foreground(&mut orch, &key, now);
        match orch.settle(&ticket, Err(FetchError::Unavailable("503".into())), true, now) {
            Settlement::StaleFallback { payload, .. } => {
                assert_eq!(payload, board(20, 17, GameStatus::Final));
            }
            other => panic!("expected stale fallback, got {:?}", other),
        }
        assert!(orch.store().get(&key).is_some(), "failure never clears the entry");
        assert_eq!(orch.stats().foreground_failures, 1);
    }

    #[test]
    fn test_foreground_failure_without_cache_fails() {
        let mut orch = orchestrator();
        let key = PartitionKey::live("nfl/today");
        let now = Instant::now();

        let ticket = foreground(&mut orch, &key, now);
        let timeout = FetchError::Timeout(Duration::from_secs(12));
        let settlement = orch.settle(&ticket, Err(timeout), true, now);

        assert!(matches!(settlement, Settlement::Failed { .. }));
        assert!(orch.store().is_empty());
    }

    #[test]
    fn test_silent_failure_is_swallowed() {
        let mut orch = orchestrator();
        let key = PartitionKey::live("nfl/upcoming");
        let now = Instant::now();

        let ticket = expect_ticket(orch.plan(&key, FetchMode::Silent, FetchReason::Preload, now));
        let down = FetchError::Unavailable("down".into());
        let settlement = orch.settle(&ticket, Err(down), false, now);

        assert!(matches!(settlement, Settlement::Swallowed { .. }));
        assert_eq!(orch.stats().silent_failures, 1);
        assert!(orch.store().is_empty());
    }
}
