//! Adaptive partitioned cache and polling controller
//!
//! One `Controller` is created per logical screen. It owns the partition store,
//! the polling session and the preload latch, and is driven by a single task:
//! the host calls the contract methods (`set_active_partition`, `set_visible`,
//! `refresh`) and pumps background results with `process_next` or
//! `drain_pending`. Fetches and timers run on spawned tasks that never touch
//! controller state; they report back through a channel, so every state change
//! is applied one event at a time.
//!
//! Must be used from within a Tokio runtime.

mod orchestrator;
mod preload;
mod scheduler;

pub use orchestrator::{
    FetchMode, FetchOrchestrator, FetchPlan, FetchReason, FetchStats, FetchTicket, Settlement,
};
pub use preload::{PreloadCoordinator, PreloadState};
pub use scheduler::{PollingScheduler, PollingSession, SchedulerState};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::{fingerprint, CachePartitionStore, Fingerprint, FreshnessPolicy};
use crate::fetch::{FetchError, Fetcher, Payload};
use crate::partition::PartitionKey;

/// Capacity of the event channel between background tasks and the controller
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Messages sent from background tasks to the controller
#[derive(Debug)]
pub enum ControllerEvent<P> {
    /// A network fetch settled
    Completed {
        ticket: FetchTicket,
        result: Result<P, FetchError>,
    },
    /// The polling timer fired
    Tick { generation: u64 },
    /// The preload delay elapsed
    PreloadDue,
}

/// Configuration for freshness, polling cadence, preloading and timeouts
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub policy: FreshnessPolicy,
    /// Interval between silent fetches of the active live partition
    pub poll_interval: Duration,
    /// Delay after the first successful foreground fetch; `None` disables preloading
    pub preload_delay: Option<Duration>,
    /// Upper bound on a single fetch
    pub fetch_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            policy: FreshnessPolicy::default(),
            poll_interval: Duration::from_secs(2),    // score screens
            preload_delay: Some(Duration::from_secs(1)),
            fetch_timeout: Duration::from_secs(12),
        }
    }
}

/// What a fetch request resolved to at the moment it was made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Served from cache, optionally with a background check issued
    CacheHit { background_check: bool },
    /// A network fetch was issued
    Issued,
    /// A fetch for the partition was already in flight
    Skipped,
}

/// A retryable error the host should show to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub partition: PartitionKey,
    pub message: String,
}

#[derive(Debug)]
struct VisibleValue<P> {
    key: PartitionKey,
    payload: P,
    fingerprint: Fingerprint,
}

/// Per-screen cache and polling controller
pub struct Controller<F: Fetcher> {
    fetcher: Arc<F>,
    config: ControllerConfig,
    partitions: Vec<PartitionKey>,
    orchestrator: FetchOrchestrator<F::Payload>,
    scheduler: PollingScheduler,
    preload: PreloadCoordinator,
    visible: Option<VisibleValue<F::Payload>>,
    revision: u64,
    error: Option<String>,
    alerts: VecDeque<Alert>,
    events_tx: mpsc::Sender<ControllerEvent<F::Payload>>,
    events_rx: mpsc::Receiver<ControllerEvent<F::Payload>>,
}

impl<F: Fetcher> Controller<F> {
    /// Creates a controller for a screen with the given partitions
    ///
    /// The session starts invisible and stopped; nothing is fetched until the
    /// host calls `set_visible(true)`, `set_active_partition` or `fetch`.
    pub fn new(
        config: ControllerConfig,
        fetcher: F,
        partitions: Vec<PartitionKey>,
        active: PartitionKey,
    ) -> Self {
        let mut partitions = partitions;
        if !partitions.contains(&active) {
            partitions.push(active.clone());
        }
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            fetcher: Arc::new(fetcher),
            orchestrator: FetchOrchestrator::new(config.policy),
            scheduler: PollingScheduler::new(active, config.poll_interval),
            preload: PreloadCoordinator::new(config.preload_delay),
            config,
            partitions,
            visible: None,
            revision: 0,
            error: None,
            alerts: VecDeque::new(),
            events_tx,
            events_rx,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn partitions(&self) -> &[PartitionKey] {
        &self.partitions
    }

    pub fn active_partition(&self) -> &PartitionKey {
        self.scheduler.active()
    }

    /// Last surfaced payload, if it belongs to `key`
    pub fn current_value(&self, key: &PartitionKey) -> Option<&F::Payload> {
        self.visible
            .as_ref()
            .filter(|value| value.key == *key)
            .map(|value| &value.payload)
    }

    /// Last surfaced payload for the active partition
    pub fn active_value(&self) -> Option<&F::Payload> {
        self.current_value(self.scheduler.active())
    }

    pub fn is_loading(&self) -> bool {
        self.orchestrator.is_loading()
    }

    /// UI-facing error for a first load of the active partition that failed
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn take_alert(&mut self) -> Option<Alert> {
        self.alerts.pop_front()
    }

    /// Number of visible-state transitions so far
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn stats(&self) -> FetchStats {
        self.orchestrator.stats()
    }

    pub fn store(&self) -> &CachePartitionStore<F::Payload> {
        self.orchestrator.store()
    }

    pub fn polling_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn active_timers(&self) -> usize {
        self.scheduler.active_timers()
    }

    pub fn preload_state(&self) -> PreloadState {
        self.preload.state()
    }

    pub fn is_visible(&self) -> bool {
        self.scheduler.session().visible
    }

    /// Fetches `key` in the given mode
    pub fn fetch(&mut self, key: &PartitionKey, mode: FetchMode) -> FetchOutcome {
        self.request(key, mode, FetchReason::Requested)
    }

    /// Forces a foreground network fetch regardless of cache validity
    pub fn refresh(&mut self, key: &PartitionKey) -> FetchOutcome {
        self.orchestrator.invalidate(key);
        info!(partition = %key, "refresh requested");
        self.request(key, FetchMode::Foreground, FetchReason::Requested)
    }

    /// Switches which partition is displayed and polled
    pub fn set_active_partition(&mut self, key: PartitionKey) -> FetchOutcome {
        if !self.partitions.contains(&key) {
            self.partitions.push(key.clone());
        }
        if self.scheduler.set_active(key.clone(), &self.events_tx) {
            self.error = None;
            info!(partition = %key, "active partition changed");
        }
        self.request(&key, FetchMode::Foreground, FetchReason::Requested)
    }

    /// Applies the host screen's visibility signal
    ///
    /// Regaining visibility fetches the active partition in the foreground,
    /// which is a cache hit whenever the entry is still valid.
    pub fn set_visible(&mut self, visible: bool) -> Option<FetchOutcome> {
        if !self.scheduler.set_visible(visible, &self.events_tx) {
            return None;
        }
        debug!(visible, partition = %self.scheduler.active(), "visibility changed");
        if !visible {
            return None;
        }
        let key = self.scheduler.active().clone();
        Some(self.request(&key, FetchMode::Foreground, FetchReason::Requested))
    }

    /// Waits for the next background event and applies it
    pub async fn process_next(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.handle(event);
                true
            }
            None => false,
        }
    }

    /// Applies every event that is already queued, without waiting
    pub fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle(event);
            applied += 1;
        }
        applied
    }

    /// Tears down the polling timer and preload task
    ///
    /// Fetches already in flight finish on their own; their results are dropped.
    pub fn detach(mut self) {
        self.scheduler.stop();
        self.preload.cancel();
        info!(partition = %self.scheduler.active(), "controller detached");
    }

    fn handle(&mut self, event: ControllerEvent<F::Payload>) {
        match event {
            ControllerEvent::Completed { ticket, result } => self.apply(ticket, result),
            ControllerEvent::Tick { generation } => {
                if self.scheduler.is_current(generation) {
                    let key = self.scheduler.active().clone();
                    self.request(&key, FetchMode::Silent, FetchReason::Poll);
                } else {
                    debug!(generation, "dropping tick from a cancelled timer");
                }
            }
            ControllerEvent::PreloadDue => {
                let targets = self
                    .preload
                    .fire(&self.partitions, self.scheduler.active());
                info!(count = targets.len(), "preloading inactive partitions");
                for key in targets {
                    self.request(&key, FetchMode::Silent, FetchReason::Preload);
                }
            }
        }
    }

    fn request(
        &mut self,
        key: &PartitionKey,
        mode: FetchMode,
        reason: FetchReason,
    ) -> FetchOutcome {
        let is_active = key == self.scheduler.active();
        match self.orchestrator.plan(key, mode, reason, Instant::now()) {
            FetchPlan::Cached { payload, check } => {
                let background_check = check.is_some();
                if let Some(ticket) = check {
                    self.spawn_fetch(ticket);
                }
                if is_active {
                    self.observe_active(payload.is_terminal());
                    self.surface(key, payload);
                }
                FetchOutcome::CacheHit { background_check }
            }
            FetchPlan::Network(ticket) => {
                // An expired entry stays on screen until the fetch settles.
                let stale = if is_active && ticket.mode == FetchMode::Foreground {
                    self.orchestrator
                        .store()
                        .get(key)
                        .map(|entry| entry.payload().clone())
                } else {
                    None
                };
                self.spawn_fetch(ticket);
                if let Some(payload) = stale {
                    self.surface(key, payload);
                }
                FetchOutcome::Issued
            }
            FetchPlan::Skip => FetchOutcome::Skipped,
        }
    }

    fn apply(&mut self, ticket: FetchTicket, result: Result<F::Payload, FetchError>) {
        // Checked at apply time: the user may have switched partitions since issue.
        let is_active = ticket.key == *self.scheduler.active();
        let foreground_success = ticket.mode == FetchMode::Foreground && result.is_ok();

        match self
            .orchestrator
            .settle(&ticket, result, is_active, Instant::now())
        {
            Settlement::Applied {
                surface, terminal, ..
            } => {
                if is_active {
                    self.observe_active(terminal);
                    if let Some(payload) = surface {
                        self.surface(&ticket.key, payload);
                    }
                }
                if foreground_success {
                    self.preload.arm(&self.events_tx);
                }
            }
            Settlement::StaleFallback { payload, .. } => {
                if is_active {
                    self.surface(&ticket.key, payload);
                }
            }
            Settlement::Failed { error } => {
                if is_active {
                    let message = error.to_string();
                    self.error = Some(message.clone());
                    self.alerts.push_back(Alert {
                        partition: ticket.key.clone(),
                        message,
                    });
                }
            }
            Settlement::Swallowed { .. } => {}
        }
    }

    /// Makes `payload` the visible value unless it is already what is shown
    fn surface(&mut self, key: &PartitionKey, payload: F::Payload) -> bool {
        let fingerprint = fingerprint(&payload);
        self.error = None;

        if let Some(current) = &self.visible {
            if current.key == *key && current.fingerprint == fingerprint {
                return false;
            }
        }

        self.visible = Some(VisibleValue {
            key: key.clone(),
            payload,
            fingerprint,
        });
        self.revision += 1;
        debug!(partition = %key, revision = self.revision, "visible value updated");
        true
    }

    fn observe_active(&mut self, terminal: bool) {
        if terminal {
            self.scheduler.halt_terminal();
        } else {
            self.scheduler.resume(&self.events_tx);
        }
    }

    fn spawn_fetch(&self, ticket: FetchTicket) {
        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.events_tx.clone();
        let timeout = self.config.fetch_timeout;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, fetcher.fetch(&ticket.key)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(timeout)),
            };
            let _ = tx.send(ControllerEvent::Completed { ticket, result }).await;
        });
    }
}
