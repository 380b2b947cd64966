//! Game detail screen rendering
//!
//! Shows one game's score, status and venue with a per-period box score.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::scoreboard::{render_status, status_color};
use crate::app::{App, GameScreen};
use scoreline::data::{GameDetail, Scoreboard, TeamLine};
use scoreline::fetch::Fetcher;

/// Renders the detail screen of the open game
pub fn render<F, G>(frame: &mut Frame, app: &App<F, G>, screen: &GameScreen<G>)
where
    F: Fetcher<Payload = Scoreboard>,
    G: Fetcher<Payload = GameDetail> + Clone,
{
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Game
            Constraint::Length(1), // Status
            Constraint::Length(1), // Help text
        ])
        .split(frame.area());

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} game {} ", app.sport.display_name(), screen.partition.game_id))
        .title_style(Style::default().add_modifier(Modifier::BOLD));

    let lines = match screen.detail() {
        Some(detail) => detail_lines(detail),
        None if screen.is_loading() => vec![Line::styled(
            "Loading game...",
            Style::default().fg(Color::Cyan),
        )],
        None => match screen.error() {
            Some(error) => vec![
                Line::styled("Could not load game", Style::default().fg(Color::Red)),
                Line::styled(error.to_string(), Style::default().fg(Color::DarkGray)),
                Line::raw("Press r to retry"),
            ],
            None => Vec::new(),
        },
    };
    frame.render_widget(Paragraph::new(lines).block(block), chunks[0]);

    render_status(frame, app, screen.is_loading(), chunks[1]);
    render_help(frame, chunks[2]);
}

fn detail_lines(detail: &GameDetail) -> Vec<Line<'static>> {
    let game = &detail.game;
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mut status = vec![Span::styled(
        game.detail.clone(),
        Style::default().fg(status_color(game.status)),
    )];
    if !game.clock.is_empty() && !game.detail.contains(&game.clock) {
        status.push(Span::raw(format!("  {}", game.clock)));
    }

    let mut lines = vec![
        Line::from(vec![
            Span::styled(game.away.name.clone(), bold),
            Span::raw(format!(" {}  @  ", game.away.score)),
            Span::styled(game.home.name.clone(), bold),
            Span::raw(format!(" {}", game.home.score)),
        ]),
        Line::from(status),
    ];
    if let Some(venue) = &detail.venue {
        lines.push(Line::styled(venue.clone(), Style::default().fg(Color::DarkGray)));
    }
    lines.push(Line::raw(""));
    lines.extend(box_score_lines(detail));
    lines
}

/// Header row plus one row per side; empty before the first period
fn box_score_lines(detail: &GameDetail) -> Vec<Line<'static>> {
    let periods = detail.period_count();
    if periods == 0 {
        return Vec::new();
    }

    let mut header = format!("{:<6}", "");
    for period in 1..=periods {
        header.push_str(&format!("{:>4}", period));
    }
    header.push_str(&format!("{:>5}", "T"));

    let row = |team: &TeamLine, points: &[u32]| {
        let mut text = format!("{:<6}", team.abbreviation);
        for period in 0..periods {
            match points.get(period) {
                Some(value) => text.push_str(&format!("{:>4}", value)),
                None => text.push_str(&format!("{:>4}", "-")),
            }
        }
        text.push_str(&format!("{:>5}", team.score));
        Line::raw(text)
    };

    vec![
        Line::styled(header, Style::default().fg(Color::DarkGray)),
        row(&detail.game.away, &detail.away_periods),
        row(&detail.game.home, &detail.home_periods),
    ]
}

fn render_help(frame: &mut Frame, area: Rect) {
    let help_spans = vec![
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" Back  "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" Refresh  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit"),
    ];

    let paragraph =
        Paragraph::new(Line::from(help_spans)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}
