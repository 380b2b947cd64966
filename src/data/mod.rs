//! Core data models for scoreboards
//!
//! This module contains the payload types the controller caches and surfaces,
//! the sports, date filters and game ids that define partitions, and the ESPN
//! clients that fetch them.

pub mod espn;
pub mod game;
pub mod sport;

pub use espn::{EspnGameClient, EspnScoreboardClient};
pub use game::{GameDetail, GamePartition};
pub use sport::{DateFilter, ScoreboardPartition, Sport};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::VisibleState;
use crate::fetch::Payload;

/// Lifecycle of a single game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Scheduled,
    InProgress,
    Final,
    Postponed,
    Canceled,
    Unknown,
}

impl GameStatus {
    /// Maps ESPN's `status.type.state` plus its status name to a status
    pub fn from_espn(state: &str, name: &str) -> Self {
        match (state, name) {
            (_, "STATUS_POSTPONED") => GameStatus::Postponed,
            (_, "STATUS_CANCELED") => GameStatus::Canceled,
            ("in", _) => GameStatus::InProgress,
            ("post", _) => GameStatus::Final,
            ("pre", _) => GameStatus::Scheduled,
            _ => GameStatus::Unknown,
        }
    }

    /// Whether the game can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GameStatus::Final | GameStatus::Postponed | GameStatus::Canceled
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            GameStatus::Scheduled => "Scheduled",
            GameStatus::InProgress => "In Progress",
            GameStatus::Final => "Final",
            GameStatus::Postponed => "Postponed",
            GameStatus::Canceled => "Canceled",
            GameStatus::Unknown => "Unknown",
        }
    }
}

/// One side of a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamLine {
    pub abbreviation: String,
    pub name: String,
    pub score: u32,
}

impl TeamLine {
    pub fn new(abbreviation: impl Into<String>, score: u32) -> Self {
        let abbreviation = abbreviation.into();
        Self {
            name: abbreviation.clone(),
            abbreviation,
            score,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// A single game on a scoreboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub home: TeamLine,
    pub away: TeamLine,
    pub status: GameStatus,
    /// Human-readable status ("2nd Quarter", "Final/OT", "Sun, 1:00 PM")
    pub detail: String,
    /// Live game clock, empty when not applicable
    pub clock: String,
    pub start: Option<DateTime<Utc>>,
}

impl Game {
    pub fn new(id: impl Into<String>, home: TeamLine, away: TeamLine, status: GameStatus) -> Self {
        Self {
            id: id.into(),
            home,
            away,
            status,
            detail: status.label().to_string(),
            clock: String::new(),
            start: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_clock(mut self, clock: impl Into<String>) -> Self {
        self.clock = clock.into();
        self
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub(crate) fn visible_state(&self) -> VisibleState {
        VisibleState::new(&self.id)
            .with_score(self.home.score)
            .with_score(self.away.score)
            .with_status(&self.detail)
            .with_clock(&self.clock)
    }
}

/// All games for one scoreboard partition
///
/// An empty scoreboard is a valid result meaning "no games", not a failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub games: Vec<Game>,
}

impl Scoreboard {
    pub fn new(games: Vec<Game>) -> Self {
        Self { games }
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Games ordered for display: live first, then scheduled by start, then finished
    pub fn ordered(&self) -> Vec<&Game> {
        let mut games: Vec<&Game> = self.games.iter().collect();
        games.sort_by(|a, b| {
            display_rank(a.status)
                .cmp(&display_rank(b.status))
                .then_with(|| match a.status {
                    GameStatus::Final => b.start.cmp(&a.start),
                    _ => a.start.cmp(&b.start),
                })
        });
        games
    }
}

fn display_rank(status: GameStatus) -> u8 {
    match status {
        GameStatus::InProgress => 0,
        GameStatus::Scheduled | GameStatus::Unknown => 1,
        _ => 2,
    }
}

impl Payload for Scoreboard {
    fn visible_states(&self) -> Vec<VisibleState> {
        self.games.iter().map(Game::visible_state).collect()
    }

    fn is_live(&self) -> bool {
        self.games
            .iter()
            .any(|game| game.status == GameStatus::InProgress)
    }

    // Empty boards are not terminal: games may still be added upstream.
    fn is_terminal(&self) -> bool {
        !self.games.is_empty() && self.games.iter().all(|game| game.status.is_terminal())
    }
}
