//! Command-line interface parsing for Scoreline
//!
//! This module handles parsing of CLI arguments using clap and turns them into a
//! validated `StartupConfig`: which sport and date filter to open, the freshness
//! and polling settings of the scoreboard and game detail controllers, and where
//! to write logs.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::cache::{FreshnessPolicy, PolicyError};
use crate::controller::ControllerConfig;
use crate::data::{DateFilter, Sport};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The specified sport is not recognized
    #[error("Invalid sport: '{0}'. Valid sports: nfl, nba, wnba, mlb, nhl, ncaaf, epl")]
    InvalidSport(String),

    /// The specified date filter is not recognized
    #[error("Invalid filter: '{0}'. Valid filters: yesterday, today, upcoming")]
    InvalidFilter(String),

    /// Polling interval must be positive
    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,

    /// TTL arguments violate the freshness policy
    #[error("Invalid cache TTLs: {0}")]
    Policy(#[from] PolicyError),
}

/// Scoreline - live sports scores in the terminal
#[derive(Parser, Debug)]
#[command(name = "scoreline")]
#[command(about = "Live sports scoreboards with adaptive refresh")]
#[command(version)]
pub struct Cli {
    /// League to show (nfl, nba, wnba, mlb, nhl, ncaaf, epl)
    #[arg(long, short, default_value = "nfl")]
    pub sport: String,

    /// Date filter to open (yesterday, today, upcoming)
    #[arg(long, short, default_value = "today")]
    pub filter: String,

    /// Milliseconds between live updates of the active scoreboard
    #[arg(long, value_name = "MS")]
    pub poll_ms: Option<u64>,

    /// Milliseconds between updates of an open game's box score
    #[arg(long, value_name = "MS", default_value_t = 4000)]
    pub game_poll_ms: u64,

    /// Seconds live scoreboards (today, upcoming) stay fresh
    #[arg(long, value_name = "SECS")]
    pub live_ttl: Option<u64>,

    /// Seconds static scoreboards (yesterday) stay fresh
    #[arg(long, value_name = "SECS")]
    pub static_ttl: Option<u64>,

    /// Seconds before a request to the scores API is abandoned
    #[arg(long, value_name = "SECS", default_value_t = 12)]
    pub timeout: u64,

    /// Do not warm the other date filters in the background
    #[arg(long)]
    pub no_preload: bool,

    /// Write logs to this file instead of the default temp location
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log level filter (overridden by SCORELINE_LOG)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub sport: Sport,
    pub filter: DateFilter,
    pub controller: ControllerConfig,
    /// Settings for the single-game detail screen; never preloads
    pub game_controller: ControllerConfig,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
}

/// Default interval between box score updates of an open game
pub const DEFAULT_GAME_POLL_INTERVAL: Duration = Duration::from_millis(4000);

fn game_controller_config(base: &ControllerConfig, poll_interval: Duration) -> ControllerConfig {
    ControllerConfig {
        poll_interval,
        preload_delay: None,
        ..base.clone()
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        let controller = ControllerConfig::default();
        Self {
            sport: Sport::Nfl,
            filter: DateFilter::Today,
            game_controller: game_controller_config(&controller, DEFAULT_GAME_POLL_INTERVAL),
            controller,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

/// Parses a sport string argument into a Sport enum.
pub fn parse_sport_arg(s: &str) -> Result<Sport, CliError> {
    Sport::from_str(s).ok_or_else(|| CliError::InvalidSport(s.to_string()))
}

/// Parses a date filter string argument into a DateFilter enum.
pub fn parse_filter_arg(s: &str) -> Result<DateFilter, CliError> {
    DateFilter::from_str(s).ok_or_else(|| CliError::InvalidFilter(s.to_string()))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if a sport, filter or TTL combination is invalid
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let defaults = ControllerConfig::default();

        let live_ttl = cli
            .live_ttl
            .map(Duration::from_secs)
            .unwrap_or(FreshnessPolicy::DEFAULT_LIVE_TTL);
        let static_ttl = cli
            .static_ttl
            .map(Duration::from_secs)
            .unwrap_or(FreshnessPolicy::DEFAULT_STATIC_TTL);
        let policy = FreshnessPolicy::new(live_ttl, static_ttl)?;

        let poll_interval = match cli.poll_ms {
            Some(0) => return Err(CliError::ZeroPollInterval),
            Some(ms) => Duration::from_millis(ms),
            None => defaults.poll_interval,
        };
        if cli.game_poll_ms == 0 {
            return Err(CliError::ZeroPollInterval);
        }

        let controller = ControllerConfig {
            policy,
            poll_interval,
            preload_delay: if cli.no_preload {
                None
            } else {
                defaults.preload_delay
            },
            fetch_timeout: Duration::from_secs(cli.timeout.max(1)),
        };

        Ok(StartupConfig {
            sport: parse_sport_arg(&cli.sport)?,
            filter: parse_filter_arg(&cli.filter)?,
            game_controller: game_controller_config(
                &controller,
                Duration::from_millis(cli.game_poll_ms),
            ),
            controller,
            log_file: cli.log_file.clone(),
            log_level: cli.log_level.clone(),
        })
    }
}
