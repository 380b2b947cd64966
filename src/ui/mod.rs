//! UI rendering module for Scoreline
//!
//! This module contains all the rendering logic for the terminal user interface,
//! using the ratatui library for TUI components.

pub mod game_detail;
pub mod scoreboard;

use ratatui::Frame;

use crate::app::App;
use scoreline::data::{GameDetail, Scoreboard};
use scoreline::fetch::Fetcher;

/// Renders whichever screen is on display
pub fn render<F, G>(frame: &mut Frame, app: &App<F, G>)
where
    F: Fetcher<Payload = Scoreboard>,
    G: Fetcher<Payload = GameDetail> + Clone,
{
    match app.game_screen() {
        Some(screen) => game_detail::render(frame, app, screen),
        None => scoreboard::render(frame, app),
    }
}
