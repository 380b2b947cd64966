//! Application state management for Scoreline
//!
//! This module contains the main application state: which sport and date filter
//! are on screen, keyboard and focus handling, and the controllers that own
//! caching and live polling. The scoreboard and an opened game each have their
//! own controller, and only the one on screen is visible.

use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent};
use tracing::{info, warn};

use scoreline::cli::StartupConfig;
use scoreline::controller::{Alert, Controller, ControllerConfig, SchedulerState};
use scoreline::data::{
    DateFilter, Game, GameDetail, GamePartition, Scoreboard, ScoreboardPartition, Sport,
};
use scoreline::fetch::Fetcher;

/// Box score screen for one game
pub struct GameScreen<G: Fetcher<Payload = GameDetail>> {
    pub partition: GamePartition,
    controller: Controller<G>,
    seen_revision: u64,
}

impl<G: Fetcher<Payload = GameDetail>> GameScreen<G> {
    fn open(config: ControllerConfig, fetcher: G, partition: GamePartition) -> Self {
        let key = partition.key();
        Self {
            partition,
            controller: Controller::new(config, fetcher, vec![key.clone()], key),
            seen_revision: 0,
        }
    }

    pub fn detail(&self) -> Option<&GameDetail> {
        self.controller.active_value()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.controller.error()
    }

    pub fn is_polling(&self) -> bool {
        self.controller.polling_state() == SchedulerState::Running
    }
}

/// Main application struct managing state and data
pub struct App<F, G>
where
    F: Fetcher<Payload = Scoreboard>,
    G: Fetcher<Payload = GameDetail> + Clone,
{
    /// League on screen
    pub sport: Sport,
    /// Currently selected date filter
    pub filter: DateFilter,
    /// Index into the ordered games of the scoreboard
    pub selected: usize,
    /// Flag indicating the application should quit
    pub should_quit: bool,
    /// Latest fetch error worth showing in the status bar
    pub status_message: Option<String>,
    /// Wall-clock time the visible scores last changed
    pub last_update: Option<DateTime<Local>>,
    focused: bool,
    seen_revision: u64,
    controller: Controller<F>,
    game_fetcher: G,
    game_config: ControllerConfig,
    game: Option<GameScreen<G>>,
}

impl<F, G> App<F, G>
where
    F: Fetcher<Payload = Scoreboard>,
    G: Fetcher<Payload = GameDetail> + Clone,
{
    /// Creates a new App for the sport and filter in the startup configuration
    ///
    /// Nothing is fetched until `start` is called.
    pub fn new(config: &StartupConfig, fetcher: F, game_fetcher: G) -> Self {
        let partitions = ScoreboardPartition::all_for(config.sport)
            .iter()
            .map(ScoreboardPartition::key)
            .collect();
        let active = ScoreboardPartition::new(config.sport, config.filter).key();

        Self {
            sport: config.sport,
            filter: config.filter,
            selected: 0,
            should_quit: false,
            status_message: None,
            last_update: None,
            focused: true,
            seen_revision: 0,
            controller: Controller::new(config.controller.clone(), fetcher, partitions, active),
            game_fetcher,
            game_config: config.game_controller.clone(),
            game: None,
        }
    }

    /// Marks the screen visible, which triggers the first load
    pub fn start(&mut self) {
        info!(sport = %self.sport, filter = self.filter.label(), "scoreboard opened");
        self.controller.set_visible(self.focused);
    }

    pub fn partition(&self) -> ScoreboardPartition {
        ScoreboardPartition::new(self.sport, self.filter)
    }

    /// Scoreboard currently shown, if any has loaded for the selected filter
    pub fn scoreboard(&self) -> Option<&Scoreboard> {
        self.controller.active_value()
    }

    /// The opened game, if the detail screen is showing
    pub fn game_screen(&self) -> Option<&GameScreen<G>> {
        self.game.as_ref()
    }

    pub fn selected_game(&self) -> Option<&Game> {
        self.scoreboard()
            .and_then(|board| board.ordered().get(self.selected).copied())
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn error(&self) -> Option<&str> {
        self.controller.error()
    }

    /// Whether the screen on display is being polled for live updates
    pub fn is_polling(&self) -> bool {
        match &self.game {
            Some(screen) => screen.is_polling(),
            None => self.controller.polling_state() == SchedulerState::Running,
        }
    }

    /// Handles keyboard input
    pub fn handle_key(&mut self, key_event: KeyEvent) {
        if self.game.is_some() {
            match key_event.code {
                KeyCode::Char('q') => self.should_quit = true,
                KeyCode::Esc | KeyCode::Backspace => self.close_game(),
                KeyCode::Char('r') => self.refresh(),
                _ => {}
            }
            return;
        }

        match key_event.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('1') => self.select_filter(DateFilter::Yesterday),
            KeyCode::Char('2') => self.select_filter(DateFilter::Today),
            KeyCode::Char('3') => self.select_filter(DateFilter::Upcoming),
            KeyCode::Left | KeyCode::Char('h') => self.select_filter(self.filter.previous()),
            KeyCode::Right | KeyCode::Char('l') => self.select_filter(self.filter.next()),
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Enter => self.open_selected_game(),
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
    }

    /// Terminal focus gained or lost; polling only runs while focused
    pub fn handle_focus(&mut self, focused: bool) {
        self.focused = focused;
        match &mut self.game {
            Some(screen) => {
                screen.controller.set_visible(focused);
            }
            None => {
                self.controller.set_visible(focused);
            }
        }
    }

    pub fn select_filter(&mut self, filter: DateFilter) {
        if filter == self.filter {
            return;
        }
        self.filter = filter;
        self.selected = 0;
        self.status_message = None;
        self.controller.set_active_partition(self.partition().key());
    }

    fn select_next(&mut self) {
        let count = self.scoreboard().map_or(0, |board| board.games.len());
        if self.selected + 1 < count {
            self.selected += 1;
        }
    }

    /// Opens the box score of the selected game; the scoreboard stops polling
    pub fn open_selected_game(&mut self) {
        let Some(game_id) = self.selected_game().map(|game| game.id.clone()) else {
            return;
        };
        let partition = GamePartition::new(self.sport, game_id);
        info!(sport = %self.sport, game = %partition.game_id, "game opened");

        self.controller.set_visible(false);
        let mut screen = GameScreen::open(
            self.game_config.clone(),
            self.game_fetcher.clone(),
            partition,
        );
        screen.controller.set_visible(self.focused);
        self.status_message = None;
        self.game = Some(screen);
    }

    /// Returns to the scoreboard, tearing down the game's polling
    pub fn close_game(&mut self) {
        if let Some(screen) = self.game.take() {
            info!(game = %screen.partition.game_id, "game closed");
            screen.controller.detach();
        }
        self.status_message = None;
        self.controller.set_visible(self.focused);
    }

    /// Forces a network refresh of whatever is on screen
    pub fn refresh(&mut self) {
        self.status_message = None;
        if let Some(screen) = &mut self.game {
            let key = screen.partition.key();
            screen.controller.refresh(&key);
            return;
        }
        let key = self.partition().key();
        self.controller.refresh(&key);
    }

    /// Applies finished fetches and timer events without blocking
    ///
    /// Returns the number of events applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = self.controller.drain_pending();
        let mut alerts = Vec::new();

        let revision = self.controller.revision();
        let mut changed = revision != self.seen_revision;
        self.seen_revision = revision;
        while let Some(alert) = self.controller.take_alert() {
            alerts.push(alert);
        }

        if let Some(screen) = &mut self.game {
            applied += screen.controller.drain_pending();
            let revision = screen.controller.revision();
            changed |= revision != screen.seen_revision;
            screen.seen_revision = revision;
            while let Some(alert) = screen.controller.take_alert() {
                alerts.push(alert);
            }
        }

        if changed {
            self.last_update = Some(Local::now());
            self.status_message = None;
        }

        for Alert { partition, message } in alerts {
            warn!(partition = %partition, error = %message, "scores failed to load");
            self.status_message = Some(message);
        }
        applied
    }

    /// Stops background work before exit
    pub fn shutdown(self) {
        if let Some(screen) = self.game {
            screen.controller.detach();
        }
        self.controller.detach();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures::future::{BoxFuture, FutureExt};
    use scoreline::data::{Game, GameDetail, GameStatus, Scoreboard, TeamLine};
    use scoreline::fetch::{FetchError, Fetcher};
    use scoreline::partition::PartitionKey;

    /// Serves fixed scoreboards by selector, failing for unknown ones
    #[derive(Clone, Default)]
    pub struct StubFetcher {
        boards: Arc<Mutex<HashMap<String, Scoreboard>>>,
        calls: Arc<AtomicUsize>,
    }

    impl StubFetcher {
        pub fn with_board(self, selector: &str, board: Scoreboard) -> Self {
            self.insert(selector, board);
            self
        }

        pub fn insert(&self, selector: &str, board: Scoreboard) {
            self.boards
                .lock()
                .unwrap()
                .insert(selector.to_string(), board);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetcher for StubFetcher {
        type Payload = Scoreboard;

        fn fetch(&self, key: &PartitionKey) -> BoxFuture<'static, Result<Scoreboard, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .boards
                .lock()
                .unwrap()
                .get(key.selector())
                .cloned()
                .ok_or_else(|| FetchError::Unavailable(format!("no scores for {}", key)));
            async move { result }.boxed()
        }
    }

    /// Serves game details in order; the last one repeats
    #[derive(Clone, Default)]
    pub struct StubGameFetcher {
        details: Arc<Mutex<HashMap<String, VecDeque<GameDetail>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl StubGameFetcher {
        pub fn push(&self, selector: &str, detail: GameDetail) -> &Self {
            self.details
                .lock()
                .unwrap()
                .entry(selector.to_string())
                .or_default()
                .push_back(detail);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetcher for StubGameFetcher {
        type Payload = GameDetail;

        fn fetch(&self, key: &PartitionKey) -> BoxFuture<'static, Result<GameDetail, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut details = self.details.lock().unwrap();
            let result = match details.get_mut(key.selector()) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
            .ok_or_else(|| FetchError::Unavailable(format!("no summary for {}", key)));
            async move { result }.boxed()
        }
    }

    pub fn live_game(home: u32, away: u32) -> Game {
        Game::new(
            "401",
            TeamLine::new("KC", home),
            TeamLine::new("BUF", away),
            GameStatus::InProgress,
        )
        .with_detail("3rd Quarter")
        .with_clock("5:42")
    }

    pub fn final_game(home: u32, away: u32) -> Game {
        Game::new(
            "400",
            TeamLine::new("SF", home),
            TeamLine::new("DAL", away),
            GameStatus::Final,
        )
    }

    pub fn game_detail(game: Game) -> GameDetail {
        GameDetail::new(game)
            .with_periods(vec![0, 3, 0], vec![1, 0, 0])
            .with_venue("Arrowhead Stadium")
    }
}
