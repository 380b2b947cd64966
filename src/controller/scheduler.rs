//! Polling scheduler for the active partition
//!
//! Owns the polling session (active partition, visibility) and at most one
//! repeating timer. The timer runs on its own task and only ever sends `Tick`
//! events; every tick carries the generation of the timer that produced it so a
//! tick queued just before a teardown is recognised and dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::ControllerEvent;
use crate::partition::PartitionKey;

/// Whether the session is currently polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// The host screen's binding to one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingSession {
    pub active: PartitionKey,
    pub visible: bool,
    /// Set when every tracked entity under the active partition is terminal
    pub halted: bool,
}

impl PollingSession {
    fn wants_polling(&self) -> bool {
        self.visible && self.active.is_live_sensitive() && !self.halted
    }
}

/// Start/stop state machine around a single repeating timer
#[derive(Debug)]
pub struct PollingScheduler {
    session: PollingSession,
    interval: Duration,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

impl PollingScheduler {
    /// Creates a stopped scheduler for a session that is not yet visible
    pub fn new(active: PartitionKey, interval: Duration) -> Self {
        Self {
            session: PollingSession {
                active,
                visible: false,
                halted: false,
            },
            interval,
            timer: None,
            generation: 0,
        }
    }

    pub fn session(&self) -> &PollingSession {
        &self.session
    }

    pub fn active(&self) -> &PartitionKey {
        &self.session.active
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        if self.timer.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Number of live timers; never more than one
    pub fn active_timers(&self) -> usize {
        usize::from(self.timer.is_some())
    }

    /// Whether a tick belongs to the timer that is currently running
    pub fn is_current(&self, generation: u64) -> bool {
        self.timer.is_some() && generation == self.generation
    }

    /// Switches the active partition; a running timer is replaced
    ///
    /// Returns false if `key` was already active.
    pub fn set_active<P: Send + 'static>(
        &mut self,
        key: PartitionKey,
        events: &mpsc::Sender<ControllerEvent<P>>,
    ) -> bool {
        if self.session.active == key {
            return false;
        }
        self.session.active = key;
        self.session.halted = false;
        self.reconcile(events, true);
        true
    }

    /// Applies the visibility signal; regaining focus lifts a terminal halt
    pub fn set_visible<P: Send + 'static>(
        &mut self,
        visible: bool,
        events: &mpsc::Sender<ControllerEvent<P>>,
    ) -> bool {
        if self.session.visible == visible {
            return false;
        }
        self.session.visible = visible;
        if visible {
            self.session.halted = false;
        }
        self.reconcile(events, false);
        true
    }

    /// Stops polling because every tracked entity is finished
    pub fn halt_terminal(&mut self) {
        if self.session.halted {
            return;
        }
        self.session.halted = true;
        if self.timer.is_some() {
            info!(partition = %self.session.active, "all games final, stopping updates");
        }
        self.stop();
    }

    /// Resumes polling after a halt if the active payload is live again
    pub fn resume<P: Send + 'static>(&mut self, events: &mpsc::Sender<ControllerEvent<P>>) {
        if self.session.halted {
            self.session.halted = false;
            self.reconcile(events, false);
        }
    }

    /// Cancels the timer; future ticks are never issued
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            debug!(
                partition = %self.session.active,
                generation = self.generation,
                "polling stopped"
            );
        }
    }

    fn reconcile<P: Send + 'static>(
        &mut self,
        events: &mpsc::Sender<ControllerEvent<P>>,
        restart: bool,
    ) {
        if !self.session.wants_polling() {
            self.stop();
            return;
        }
        if self.timer.is_some() && !restart {
            return;
        }
        self.stop();
        self.start(events);
    }

    fn start<P: Send + 'static>(&mut self, events: &mpsc::Sender<ControllerEvent<P>>) {
        self.generation += 1;
        let generation = self.generation;
        let period = self.interval;
        let tx = events.clone();

        self.timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                interval.tick().await;
                if tx.send(ControllerEvent::Tick { generation }).await.is_err() {
                    break;
                }
            }
        }));
        debug!(
            partition = %self.session.active,
            generation,
            interval_ms = period.as_millis() as u64,
            "polling started"
        );
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Scoreboard;

    fn channel() -> (
        mpsc::Sender<ControllerEvent<Scoreboard>>,
        mpsc::Receiver<ControllerEvent<Scoreboard>>,
    ) {
        mpsc::channel(16)
    }

    fn scheduler(key: PartitionKey) -> PollingScheduler {
        PollingScheduler::new(key, Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state_is_stopped() {
        let sched = scheduler(PartitionKey::live("nfl/today"));
        assert_eq!(sched.state(), SchedulerState::Stopped);
        assert_eq!(sched.active_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_live_partition_starts_polling() {
        let (tx, mut rx) = channel();
        let mut sched = scheduler(PartitionKey::live("nfl/today"));

        sched.set_visible(true, &tx);
        assert_eq!(sched.state(), SchedulerState::Running);

        match rx.recv().await {
            Some(ControllerEvent::Tick { generation }) => assert!(sched.is_current(generation)),
            other => panic!("expected tick, got {:?}", other.is_some()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_static_partition_never_polls() {
        let (tx, _rx) = channel();
        let mut sched = scheduler(PartitionKey::fixed("nfl/yesterday"));

        sched.set_visible(true, &tx);
        assert_eq!(sched.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_losing_visibility_stops_polling() {
        let (tx, _rx) = channel();
        let mut sched = scheduler(PartitionKey::live("nfl/today"));

        sched.set_visible(true, &tx);
        sched.set_visible(false, &tx);
        assert_eq!(sched.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_to_static_partition_stops_polling() {
        let (tx, _rx) = channel();
        let mut sched = scheduler(PartitionKey::live("nfl/today"));

        sched.set_visible(true, &tx);
        assert!(sched.set_active(PartitionKey::fixed("nfl/yesterday"), &tx));
        assert_eq!(sched.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_change_replaces_timer() {
        let (tx, mut rx) = channel();
        let mut sched = scheduler(PartitionKey::live("nfl/today"));

        sched.set_visible(true, &tx);
        sched.set_active(PartitionKey::live("nfl/upcoming"), &tx);
        sched.set_active(PartitionKey::live("nba/today"), &tx);
        assert_eq!(sched.active_timers(), 1);

        let mut current = 0;
        let mut stale = 0;
        for _ in 0..3 {
            if let Some(ControllerEvent::Tick { generation }) = rx.recv().await {
                if sched.is_current(generation) {
                    current += 1;
                } else {
                    stale += 1;
                }
            }
        }
        assert_eq!(current, 3, "only the newest timer keeps ticking");
        assert_eq!(stale, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_stops_until_focus_regained() {
        let (tx, _rx) = channel();
        let mut sched = scheduler(PartitionKey::live("nfl/today"));

        sched.set_visible(true, &tx);
        sched.halt_terminal();
        assert_eq!(sched.state(), SchedulerState::Stopped);
        assert!(sched.session().halted);

        sched.set_visible(false, &tx);
        sched.set_visible(true, &tx);
        assert_eq!(sched.state(), SchedulerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_after_halt() {
        let (tx, _rx) = channel();
        let mut sched = scheduler(PartitionKey::live("nfl/today"));

        sched.set_visible(true, &tx);
        sched.halt_terminal();
        sched.resume(&tx);
        assert_eq!(sched.state(), SchedulerState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_setting_same_key_is_a_no_op() {
        let (tx, _rx) = channel();
        let mut sched = scheduler(PartitionKey::live("nfl/today"));
        assert!(!sched.set_active(PartitionKey::live("nfl/today"), &tx));
        assert!(!sched.set_visible(false, &tx));
    }
}
