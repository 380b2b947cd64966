//! ESPN site API clients
//!
//! This module fetches scoreboards and single-game summaries from ESPN's public
//! site API and parses them into our `Scoreboard` and `GameDetail` structures.
//! No API key is required.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{Game, GameDetail, GamePartition, GameStatus, Scoreboard, ScoreboardPartition, TeamLine};
use crate::fetch::{FetchError, Fetcher};
use crate::partition::PartitionKey;

/// Base URL for the ESPN site API
const ESPN_SITE_BASE_URL: &str = "https://site.api.espn.com/apis/site/v2/sports";

fn http_client() -> Client {
    Client::builder()
        .user_agent(concat!("scoreline/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// GETs `url` and returns the body of a 2xx response
async fn get_body(http: &Client, url: String) -> Result<String, FetchError> {
    let response = http.get(&url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            url,
        });
    }

    Ok(response.text().await?)
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    Ok(serde_json::from_str(body)?)
}

/// Client for fetching scoreboards from ESPN
#[derive(Debug, Clone)]
pub struct EspnScoreboardClient {
    http: Client,
    base_url: String,
}

impl Default for EspnScoreboardClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EspnScoreboardClient {
    /// Create a new client with default settings
    pub fn new() -> Self {
        Self::with_base_url(ESPN_SITE_BASE_URL)
    }

    /// Create a client against a different API root (for testing or proxies)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: http_client(),
            base_url: base_url.into(),
        }
    }

    /// Scoreboard URL for a partition, relative to `today`
    pub fn scoreboard_url(&self, partition: ScoreboardPartition, today: NaiveDate) -> String {
        format!(
            "{}/{}/scoreboard?dates={}",
            self.base_url.trim_end_matches('/'),
            partition.sport.espn_path(),
            partition.dates_param(today)
        )
    }

    /// Fetch the scoreboard for a partition
    ///
    /// # Returns
    /// * `Ok(Scoreboard)` - possibly empty when nothing is scheduled
    /// * `Err(FetchError)` - on network failure, non-2xx status or malformed JSON
    pub async fn fetch_scoreboard(
        &self,
        partition: ScoreboardPartition,
        today: NaiveDate,
    ) -> Result<Scoreboard, FetchError> {
        let body = get_body(&self.http, self.scoreboard_url(partition, today)).await?;
        let scoreboard = parse_scoreboard(&body)?;
        debug!(
            sport = partition.sport.slug(),
            filter = partition.filter.slug(),
            games = scoreboard.games.len(),
            "ESPN scoreboard fetched"
        );
        Ok(scoreboard)
    }
}

impl Fetcher for EspnScoreboardClient {
    type Payload = Scoreboard;

    fn fetch(&self, key: &PartitionKey) -> BoxFuture<'static, Result<Scoreboard, FetchError>> {
        let client = self.clone();
        let key = key.clone();
        async move {
            let partition = ScoreboardPartition::from_key(&key)
                .ok_or_else(|| FetchError::UnknownPartition(key.to_string()))?;
            client
                .fetch_scoreboard(partition, Local::now().date_naive())
                .await
        }
        .boxed()
    }
}

/// Client for fetching a single game's summary from ESPN
#[derive(Debug, Clone)]
pub struct EspnGameClient {
    http: Client,
    base_url: String,
}

impl Default for EspnGameClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EspnGameClient {
    pub fn new() -> Self {
        Self::with_base_url(ESPN_SITE_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: http_client(),
            base_url: base_url.into(),
        }
    }

    pub fn summary_url(&self, partition: &GamePartition) -> String {
        format!(
            "{}/{}/summary?event={}",
            self.base_url.trim_end_matches('/'),
            partition.sport.espn_path(),
            partition.game_id
        )
    }

    /// Fetch the box score for one game
    ///
    /// # Returns
    /// * `Ok(GameDetail)` - the game with its per-period scores
    /// * `Err(FetchError)` - on network failure, non-2xx status or a summary
    ///   without a home and away competitor
    pub async fn fetch_game_detail(
        &self,
        partition: &GamePartition,
    ) -> Result<GameDetail, FetchError> {
        let url = self.summary_url(partition);
        let body = get_body(&self.http, url.clone()).await?;
        let detail = parse_game_detail(&body)?
            .ok_or_else(|| FetchError::Unavailable(format!("no game in summary at {}", url)))?;
        debug!(
            sport = partition.sport.slug(),
            game = %partition.game_id,
            status = detail.game.status.label(),
            "ESPN game summary fetched"
        );
        Ok(detail)
    }
}

impl Fetcher for EspnGameClient {
    type Payload = GameDetail;

    fn fetch(&self, key: &PartitionKey) -> BoxFuture<'static, Result<GameDetail, FetchError>> {
        let client = self.clone();
        let key = key.clone();
        async move {
            let partition = GamePartition::from_key(&key)
                .ok_or_else(|| FetchError::UnknownPartition(key.to_string()))?;
            client.fetch_game_detail(&partition).await
        }
        .boxed()
    }
}

/// Parse an ESPN scoreboard response body
///
/// Events that lack a home or away competitor are skipped rather than failing
/// the whole board.
pub fn parse_scoreboard(body: &str) -> Result<Scoreboard, FetchError> {
    let response: EspnResponse = parse_json(body)?;
    let games = response.events.iter().filter_map(parse_event).collect();
    Ok(Scoreboard::new(games))
}

/// Parse an ESPN game summary response body
///
/// Returns `Ok(None)` when the header carries no home and away competitor.
pub fn parse_game_detail(body: &str) -> Result<Option<GameDetail>, FetchError> {
    let summary: EspnSummary = parse_json(body)?;
    let header = summary.header;
    let Some(competition) = header.competitions.first() else {
        return Ok(None);
    };
    let Some(game) = parse_competition(
        &header.id,
        competition.date.as_deref(),
        competition,
        competition.status.as_ref(),
    ) else {
        return Ok(None);
    };

    let periods = |side: &str| -> Vec<u32> {
        competition
            .competitors
            .iter()
            .find(|c| c.home_away == side)
            .map(|c| c.linescores.iter().map(EspnLinescore::points).collect())
            .unwrap_or_default()
    };
    let mut detail = GameDetail::new(game).with_periods(periods("home"), periods("away"));
    if let Some(venue) = summary
        .game_info
        .and_then(|info| info.venue)
        .map(|venue| venue.full_name)
        .filter(|name| !name.is_empty())
    {
        detail = detail.with_venue(venue);
    }
    Ok(Some(detail))
}

fn parse_event(event: &EspnEvent) -> Option<Game> {
    let competition = event.competitions.first()?;
    let status = event.status.as_ref().or(competition.status.as_ref());
    parse_competition(&event.id, event.date.as_deref(), competition, status)
}

fn parse_competition(
    id: &str,
    date: Option<&str>,
    competition: &EspnCompetition,
    status: Option<&EspnStatus>,
) -> Option<Game> {
    let home = competition.competitors.iter().find(|c| c.home_away == "home")?;
    let away = competition.competitors.iter().find(|c| c.home_away == "away")?;

    let (state, detail, clock) = match status {
        Some(s) => {
            let game_status = game_status(&s.status_type);
            let detail = if s.status_type.short_detail.is_empty() {
                s.status_type.description.clone()
            } else {
                s.status_type.short_detail.clone()
            };
            let clock = if game_status == GameStatus::InProgress {
                s.display_clock.clone()
            } else {
                String::new()
            };
            (game_status, detail, clock)
        }
        None => (GameStatus::Unknown, String::new(), String::new()),
    };

    let mut game = Game::new(id, team_line(home), team_line(away), state).with_clock(clock);
    if !detail.is_empty() {
        game = game.with_detail(detail);
    }
    if let Some(start) = date.and_then(parse_event_date) {
        game = game.with_start(start);
    }
    Some(game)
}

/// A completed flag wins over a stale `state`
fn game_status(status_type: &EspnStatusType) -> GameStatus {
    let status = GameStatus::from_espn(&status_type.state, &status_type.name);
    if status_type.completed && !status.is_terminal() {
        GameStatus::Final
    } else {
        status
    }
}

fn team_line(competitor: &EspnCompetitor) -> TeamLine {
    let score = competitor
        .score
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    TeamLine::new(competitor.team.abbreviation.clone(), score)
        .with_name(competitor.team.display_name.clone())
}

/// ESPN dates come as `2024-09-08T17:00Z`, without seconds
fn parse_event_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%MZ")
        .ok()
        .map(|naive| naive.and_utc())
}

// ESPN JSON deserialization structs

#[derive(Debug, Deserialize)]
struct EspnResponse {
    #[serde(default)]
    events: Vec<EspnEvent>,
}

#[derive(Debug, Deserialize)]
struct EspnEvent {
    id: String,
    date: Option<String>,
    #[serde(default)]
    competitions: Vec<EspnCompetition>,
    status: Option<EspnStatus>,
}

#[derive(Debug, Deserialize)]
struct EspnSummary {
    header: EspnHeader,
    #[serde(rename = "gameInfo")]
    game_info: Option<EspnGameInfo>,
}

#[derive(Debug, Deserialize)]
struct EspnHeader {
    id: String,
    #[serde(default)]
    competitions: Vec<EspnCompetition>,
}

#[derive(Debug, Deserialize)]
struct EspnGameInfo {
    venue: Option<EspnVenue>,
}

#[derive(Debug, Deserialize)]
struct EspnVenue {
    #[serde(rename = "fullName", default)]
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct EspnCompetition {
    date: Option<String>,
    #[serde(default)]
    competitors: Vec<EspnCompetitor>,
    status: Option<EspnStatus>,
}

#[derive(Debug, Deserialize)]
struct EspnCompetitor {
    #[serde(rename = "homeAway")]
    home_away: String,
    score: Option<String>,
    team: EspnTeam,
    #[serde(default)]
    linescores: Vec<EspnLinescore>,
}

#[derive(Debug, Deserialize)]
struct EspnLinescore {
    #[serde(rename = "displayValue", default)]
    display_value: String,
}

impl EspnLinescore {
    fn points(&self) -> u32 {
        self.display_value.parse().unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct EspnTeam {
    #[serde(default)]
    abbreviation: String,
    #[serde(rename = "displayName", default)]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct EspnStatus {
    #[serde(rename = "displayClock", default)]
    display_clock: String,
    #[serde(rename = "type")]
    status_type: EspnStatusType,
}

#[derive(Debug, Deserialize)]
struct EspnStatusType {
    #[serde(default)]
    state: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "shortDetail", default)]
    short_detail: String,
    #[serde(default)]
    completed: bool,
}
