//! One-shot warming of non-active partitions

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::ControllerEvent;
use crate::partition::PartitionKey;

/// Latch guarding the single preload of a controller's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadState {
    /// Waiting for the first successful foreground fetch
    Idle,
    /// Delay timer running
    Armed,
    /// Preload issued (or disabled); never runs again
    Done,
}

#[derive(Debug)]
pub struct PreloadCoordinator {
    delay: Option<Duration>,
    state: PreloadState,
    timer: Option<JoinHandle<()>>,
}

impl PreloadCoordinator {
    /// A `None` delay disables preloading
    pub fn new(delay: Option<Duration>) -> Self {
        let state = if delay.is_some() {
            PreloadState::Idle
        } else {
            PreloadState::Done
        };
        Self {
            delay,
            state,
            timer: None,
        }
    }

    pub fn state(&self) -> PreloadState {
        self.state
    }

    /// Starts the delay timer after the first successful foreground fetch
    ///
    /// Returns true only for the call that armed the latch.
    pub fn arm<P: Send + 'static>(&mut self, events: &mpsc::Sender<ControllerEvent<P>>) -> bool {
        let (PreloadState::Idle, Some(delay)) = (self.state, self.delay) else {
            return false;
        };
        let tx = events.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ControllerEvent::PreloadDue).await;
        }));
        self.state = PreloadState::Armed;
        debug!(delay_ms = delay.as_millis() as u64, "preload armed");
        true
    }

    /// Closes the latch and returns the partitions to warm
    ///
    /// Empty unless the latch was armed, so a second call never re-issues.
    pub fn fire(
        &mut self,
        partitions: &[PartitionKey],
        active: &PartitionKey,
    ) -> Vec<PartitionKey> {
        if self.state != PreloadState::Armed {
            return Vec::new();
        }
        self.state = PreloadState::Done;
        self.timer = None;
        partitions
            .iter()
            .filter(|key| *key != active)
            .cloned()
            .collect()
    }

    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for PreloadCoordinator {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Scoreboard;

    fn partitions() -> Vec<PartitionKey> {
        vec![
            PartitionKey::fixed("nfl/yesterday"),
            PartitionKey::live("nfl/today"),
            PartitionKey::live("nfl/upcoming"),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_then_fire_returns_inactive_partitions() {
        let (tx, mut rx) = mpsc::channel::<ControllerEvent<Scoreboard>>(4);
        let mut preload = PreloadCoordinator::new(Some(Duration::from_secs(1)));

        assert!(preload.arm(&tx));
        assert_eq!(preload.state(), PreloadState::Armed);
        assert!(matches!(rx.recv().await, Some(ControllerEvent::PreloadDue)));

        let targets = preload.fire(&partitions(), &PartitionKey::live("nfl/today"));
        assert_eq!(
            targets,
            vec![
                PartitionKey::fixed("nfl/yesterday"),
                PartitionKey::live("nfl/upcoming"),
            ]
        );
        assert_eq!(preload.state(), PreloadState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latch_runs_at_most_once() {
        let (tx, _rx) = mpsc::channel::<ControllerEvent<Scoreboard>>(4);
        let mut preload = PreloadCoordinator::new(Some(Duration::from_secs(1)));
        let active = PartitionKey::live("nfl/today");

        assert!(preload.arm(&tx));
        assert!(!preload.arm(&tx));
        assert_eq!(preload.fire(&partitions(), &active).len(), 2);

        assert!(!preload.arm(&tx));
        assert!(preload.fire(&partitions(), &active).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_preload_never_arms() {
        let (tx, _rx) = mpsc::channel::<ControllerEvent<Scoreboard>>(4);
        let mut preload = PreloadCoordinator::new(None);

        assert!(!preload.arm(&tx));
        assert_eq!(preload.state(), PreloadState::Done);
    }

    #[test]
    fn test_fire_without_arm_is_empty() {
        let mut preload = PreloadCoordinator::new(Some(Duration::from_secs(1)));
        assert!(preload
            .fire(&partitions(), &PartitionKey::live("nfl/today"))
            .is_empty());
        assert_eq!(preload.state(), PreloadState::Idle);
    }
}
