//! Single-game partitions and the game detail payload
//!
//! A game detail partition tracks exactly one game. Its key uses the selector
//! `"{sport}/game/{id}"` and is always live-sensitive, so the detail screen polls
//! on its own interval and stops once that game is over.

use serde::{Deserialize, Serialize};

use super::{Game, GameStatus, Sport};
use crate::cache::VisibleState;
use crate::fetch::Payload;
use crate::partition::PartitionKey;

/// One game of a sport, addressed by its ESPN event id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GamePartition {
    pub sport: Sport,
    pub game_id: String,
}

impl GamePartition {
    pub fn new(sport: Sport, game_id: impl Into<String>) -> Self {
        Self {
            sport,
            game_id: game_id.into(),
        }
    }

    pub fn key(&self) -> PartitionKey {
        PartitionKey::live(format!("{}/game/{}", self.sport.slug(), self.game_id))
    }

    /// Resolves a key produced by `key()` back into a partition
    pub fn from_key(key: &PartitionKey) -> Option<Self> {
        if !key.is_live_sensitive() {
            return None;
        }
        let mut parts = key.selector().splitn(3, '/');
        let sport = Sport::from_str(parts.next()?)?;
        if parts.next()? != "game" {
            return None;
        }
        let game_id = parts.next().filter(|id| !id.is_empty() && !id.contains('/'))?;
        Some(Self::new(sport, game_id))
    }
}

/// Box score for a single game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDetail {
    pub game: Game,
    /// Points per period, in order, for the home side
    pub home_periods: Vec<u32>,
    pub away_periods: Vec<u32>,
    pub venue: Option<String>,
}

impl GameDetail {
    pub fn new(game: Game) -> Self {
        Self {
            game,
            home_periods: Vec::new(),
            away_periods: Vec::new(),
            venue: None,
        }
    }

    pub fn with_periods(mut self, home: Vec<u32>, away: Vec<u32>) -> Self {
        self.home_periods = home;
        self.away_periods = away;
        self
    }

    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    /// Number of period columns to show
    pub fn period_count(&self) -> usize {
        self.home_periods.len().max(self.away_periods.len())
    }
}

fn periods_state(id: String, periods: &[u32]) -> VisibleState {
    periods
        .iter()
        .fold(VisibleState::new(id), |state, points| state.with_score(points))
}

impl Payload for GameDetail {
    fn visible_states(&self) -> Vec<VisibleState> {
        let id = &self.game.id;
        vec![
            self.game.visible_state(),
            periods_state(format!("{}:home", id), &self.home_periods),
            periods_state(format!("{}:away", id), &self.away_periods),
        ]
    }

    fn is_live(&self) -> bool {
        self.game.status == GameStatus::InProgress
    }

    fn is_terminal(&self) -> bool {
        self.game.status.is_terminal()
    }
}
