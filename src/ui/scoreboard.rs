//! Scoreboard screen rendering
//!
//! Renders the date filter tabs for the current sport, the ordered list of games
//! for the selected filter with the selected game marked, and a status bar
//! showing loading, errors and whether live updates are running.

use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use scoreline::data::{DateFilter, Game, GameDetail, GameStatus, Scoreboard};
use scoreline::fetch::Fetcher;

/// Color for a game's status column
pub(crate) fn status_color(status: GameStatus) -> Color {
    match status {
        GameStatus::InProgress => Color::Green,
        GameStatus::Scheduled => Color::Cyan,
        GameStatus::Final => Color::Gray,
        GameStatus::Postponed | GameStatus::Canceled => Color::Red,
        GameStatus::Unknown => Color::DarkGray,
    }
}

/// Renders the scoreboard screen
pub fn render<F, G>(frame: &mut Frame, app: &App<F, G>)
where
    F: Fetcher<Payload = Scoreboard>,
    G: Fetcher<Payload = GameDetail> + Clone,
{
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Filter tabs
            Constraint::Min(3),    // Games
            Constraint::Length(1), // Status
            Constraint::Length(1), // Help text
        ])
        .split(area);

    render_tabs(frame, app, chunks[0]);
    render_games(frame, app, chunks[1]);
    render_status(frame, app, app.is_loading(), chunks[2]);
    render_help(frame, chunks[3]);
}

fn render_tabs<F, G>(frame: &mut Frame, app: &App<F, G>, area: Rect)
where
    F: Fetcher<Payload = Scoreboard>,
    G: Fetcher<Payload = GameDetail> + Clone,
{
    let mut spans = Vec::new();
    for (index, filter) in DateFilter::ALL.iter().enumerate() {
        let label = format!(" {} {} ", index + 1, filter.label());
        let style = if *filter == app.filter {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", app.sport.display_name()))
        .title_style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_games<F, G>(frame: &mut Frame, app: &App<F, G>, area: Rect)
where
    F: Fetcher<Payload = Scoreboard>,
    G: Fetcher<Payload = GameDetail> + Clone,
{
    let lines: Vec<Line> = match app.scoreboard() {
        Some(board) if board.is_empty() => vec![Line::styled(
            app.filter.empty_message(),
            Style::default().fg(Color::DarkGray),
        )],
        Some(board) => board
            .ordered()
            .into_iter()
            .enumerate()
            .map(|(index, game)| game_line(game, index == app.selected))
            .collect(),
        None if app.is_loading() => vec![Line::styled(
            "Loading scores...",
            Style::default().fg(Color::Cyan),
        )],
        None => match app.error() {
            Some(error) => vec![
                Line::styled("Could not load scores", Style::default().fg(Color::Red)),
                Line::styled(error.to_string(), Style::default().fg(Color::DarkGray)),
                Line::raw("Press r to retry"),
            ],
            None => Vec::new(),
        },
    };

    frame.render_widget(Paragraph::new(lines), area);
}

/// One row per game: away, score, home, score, status
fn game_line(game: &Game, selected: bool) -> Line<'static> {
    let winner_style = Style::default().add_modifier(Modifier::BOLD);
    let plain = Style::default();
    let (away_style, home_style) = if game.status == GameStatus::Final {
        if game.away.score > game.home.score {
            (winner_style, plain)
        } else if game.home.score > game.away.score {
            (plain, winner_style)
        } else {
            (plain, plain)
        }
    } else {
        (plain, plain)
    };

    let status = match game.status {
        GameStatus::Scheduled => game
            .start
            .map(|start| start.with_timezone(&Local).format("%a %H:%M").to_string())
            .unwrap_or_else(|| game.detail.clone()),
        _ => game.detail.clone(),
    };

    let scores_known = !matches!(game.status, GameStatus::Scheduled | GameStatus::Unknown);
    let score = |value: u32| {
        if scores_known {
            format!("{:>3}", value)
        } else {
            "  -".to_string()
        }
    };

    let marker = if selected {
        Span::styled("\u{25B8} ", Style::default().fg(Color::Yellow)) // ▸
    } else {
        Span::raw("  ")
    };

    Line::from(vec![
        marker,
        Span::styled(format!("{:<5}", game.away.abbreviation), away_style),
        Span::styled(score(game.away.score), away_style),
        Span::raw("  @  "),
        Span::styled(format!("{:<5}", game.home.abbreviation), home_style),
        Span::styled(score(game.home.score), home_style),
        Span::raw("   "),
        Span::styled(status, Style::default().fg(status_color(game.status))),
    ])
}

/// Status bar shared with the game screen
pub(crate) fn render_status<F, G>(frame: &mut Frame, app: &App<F, G>, loading: bool, area: Rect)
where
    F: Fetcher<Payload = Scoreboard>,
    G: Fetcher<Payload = GameDetail> + Clone,
{
    let mut spans = Vec::new();

    if app.is_polling() {
        spans.push(Span::styled("\u{25CF} live", Style::default().fg(Color::Green))); // ●
    } else {
        spans.push(Span::styled("\u{25CB} paused", Style::default().fg(Color::DarkGray))); // ○
    }

    if loading {
        spans.push(Span::styled(" │ loading", Style::default().fg(Color::Cyan)));
    }

    if let Some(updated) = app.last_update {
        spans.push(Span::styled(
            format!(" │ updated {}", updated.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    if let Some(message) = &app.status_message {
        spans.push(Span::styled(
            format!(" │ {}", message),
            Style::default().fg(Color::Red),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let help_spans = vec![
        Span::styled("1-3", Style::default().fg(Color::Yellow)),
        Span::raw(" Filter  "),
        Span::styled("←/→", Style::default().fg(Color::Yellow)),
        Span::raw(" Cycle  "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Select  "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Game  "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" Refresh  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit"),
    ];

    let paragraph =
        Paragraph::new(Line::from(help_spans)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
