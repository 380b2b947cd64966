//! Sports, date filters and scoreboard partitions
//!
//! A scoreboard partition is a sport plus a date filter. Its partition key uses
//! the selector `"{sport}/{filter}"`, which the ESPN client resolves back into
//! a query.

use std::fmt;

use chrono::{Duration, NaiveDate};

use crate::partition::{PartitionClass, PartitionKey};

/// Leagues with an ESPN scoreboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sport {
    Nfl,
    Nba,
    Wnba,
    Mlb,
    Nhl,
    CollegeFootball,
    PremierLeague,
}

impl Sport {
    pub const ALL: [Sport; 7] = [
        Sport::Nfl,
        Sport::Nba,
        Sport::Wnba,
        Sport::Mlb,
        Sport::Nhl,
        Sport::CollegeFootball,
        Sport::PremierLeague,
    ];

    /// Parses a sport from a CLI argument or selector segment (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nfl" => Some(Sport::Nfl),
            "nba" => Some(Sport::Nba),
            "wnba" => Some(Sport::Wnba),
            "mlb" => Some(Sport::Mlb),
            "nhl" => Some(Sport::Nhl),
            "ncaaf" | "cfb" => Some(Sport::CollegeFootball),
            "epl" | "premier-league" => Some(Sport::PremierLeague),
            _ => None,
        }
    }

    /// Short identifier used in selectors
    pub fn slug(&self) -> &'static str {
        match self {
            Sport::Nfl => "nfl",
            Sport::Nba => "nba",
            Sport::Wnba => "wnba",
            Sport::Mlb => "mlb",
            Sport::Nhl => "nhl",
            Sport::CollegeFootball => "ncaaf",
            Sport::PremierLeague => "epl",
        }
    }

    /// Path segment of the ESPN site API
    pub fn espn_path(&self) -> &'static str {
        match self {
            Sport::Nfl => "football/nfl",
            Sport::Nba => "basketball/nba",
            Sport::Wnba => "basketball/wnba",
            Sport::Mlb => "baseball/mlb",
            Sport::Nhl => "hockey/nhl",
            Sport::CollegeFootball => "football/college-football",
            Sport::PremierLeague => "soccer/eng.1",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Sport::Nfl => "NFL",
            Sport::Nba => "NBA",
            Sport::Wnba => "WNBA",
            Sport::Mlb => "MLB",
            Sport::Nhl => "NHL",
            Sport::CollegeFootball => "College Football",
            Sport::PremierLeague => "Premier League",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Date window of a scoreboard screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateFilter {
    Yesterday,
    Today,
    Upcoming,
}

impl DateFilter {
    pub const ALL: [DateFilter; 3] = [
        DateFilter::Yesterday,
        DateFilter::Today,
        DateFilter::Upcoming,
    ];

    /// Days after tomorrow covered by the upcoming window
    const UPCOMING_EXTRA_DAYS: i64 = 5;

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "yesterday" => Some(DateFilter::Yesterday),
            "today" => Some(DateFilter::Today),
            "upcoming" => Some(DateFilter::Upcoming),
            _ => None,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            DateFilter::Yesterday => "yesterday",
            DateFilter::Today => "today",
            DateFilter::Upcoming => "upcoming",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateFilter::Yesterday => "Yesterday",
            DateFilter::Today => "Today",
            DateFilter::Upcoming => "Upcoming",
        }
    }

    /// Yesterday's results are settled; today and upcoming can change at any time
    pub fn class(&self) -> PartitionClass {
        match self {
            DateFilter::Yesterday => PartitionClass::Static,
            DateFilter::Today | DateFilter::Upcoming => PartitionClass::LiveSensitive,
        }
    }

    /// Inclusive date range relative to `today`
    pub fn date_range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            DateFilter::Yesterday => {
                let yesterday = today - Duration::days(1);
                (yesterday, yesterday)
            }
            DateFilter::Today => (today, today),
            DateFilter::Upcoming => {
                let tomorrow = today + Duration::days(1);
                (tomorrow, tomorrow + Duration::days(Self::UPCOMING_EXTRA_DAYS))
            }
        }
    }

    /// Message shown when the partition has no games
    pub fn empty_message(&self) -> &'static str {
        match self {
            DateFilter::Yesterday => "No games scheduled for yesterday",
            DateFilter::Today => "No games scheduled for today",
            DateFilter::Upcoming => "No upcoming games scheduled",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            DateFilter::Yesterday => DateFilter::Today,
            DateFilter::Today => DateFilter::Upcoming,
            DateFilter::Upcoming => DateFilter::Yesterday,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            DateFilter::Yesterday => DateFilter::Upcoming,
            DateFilter::Today => DateFilter::Yesterday,
            DateFilter::Upcoming => DateFilter::Today,
        }
    }
}

/// A sport's scoreboard for one date filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScoreboardPartition {
    pub sport: Sport,
    pub filter: DateFilter,
}

impl ScoreboardPartition {
    pub fn new(sport: Sport, filter: DateFilter) -> Self {
        Self { sport, filter }
    }

    /// Every date filter of a sport, in display order
    pub fn all_for(sport: Sport) -> Vec<ScoreboardPartition> {
        DateFilter::ALL
            .iter()
            .map(|filter| ScoreboardPartition::new(sport, *filter))
            .collect()
    }

    pub fn key(&self) -> PartitionKey {
        PartitionKey::new(
            format!("{}/{}", self.sport.slug(), self.filter.slug()),
            self.filter.class(),
        )
    }

    /// Resolves a key produced by `key()` back into a partition
    pub fn from_key(key: &PartitionKey) -> Option<Self> {
        let (sport, filter) = key.selector().split_once('/')?;
        let partition = Self::new(Sport::from_str(sport)?, DateFilter::from_str(filter)?);
        (partition.filter.class() == key.class()).then_some(partition)
    }

    /// ESPN `dates` query value: `YYYYMMDD` or `YYYYMMDD-YYYYMMDD`
    pub fn dates_param(&self, today: NaiveDate) -> String {
        let (start, end) = self.filter.date_range(today);
        if start == end {
            start.format("%Y%m%d").to_string()
        } else {
            format!("{}-{}", start.format("%Y%m%d"), end.format("%Y%m%d"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sport_aliases() {
        assert_eq!(Sport::from_str("NFL"), Some(Sport::Nfl));
        assert_eq!(Sport::from_str("cfb"), Some(Sport::CollegeFootball));
        assert_eq!(Sport::from_str("epl"), Some(Sport::PremierLeague));
        assert_eq!(Sport::from_str("cricket"), None);
    }

    #[test]
    fn test_sport_slug_parses_back() {
        for sport in Sport::ALL {
            assert_eq!(Sport::from_str(sport.slug()), Some(sport));
        }
    }

    #[test]
    fn test_filter_classes() {
        assert_eq!(DateFilter::Yesterday.class(), PartitionClass::Static);
        assert_eq!(DateFilter::Today.class(), PartitionClass::LiveSensitive);
        assert_eq!(DateFilter::Upcoming.class(), PartitionClass::LiveSensitive);
    }

    #[test]
    fn test_date_ranges() {
        let today = day(2024, 3, 1);
        assert_eq!(
            DateFilter::Yesterday.date_range(today),
            (day(2024, 2, 29), day(2024, 2, 29))
        );
        assert_eq!(DateFilter::Today.date_range(today), (today, today));
        assert_eq!(
            DateFilter::Upcoming.date_range(today),
            (day(2024, 3, 2), day(2024, 3, 7))
        );
    }

    #[test]
    fn test_dates_param() {
        let today = day(2024, 12, 30);
        assert_eq!(
            ScoreboardPartition::new(Sport::Nfl, DateFilter::Today).dates_param(today),
            "20241230"
        );
        assert_eq!(
            ScoreboardPartition::new(Sport::Nfl, DateFilter::Upcoming).dates_param(today),
            "20241231-20250105"
        );
    }

    #[test]
    fn test_key_round_trip() {
        for sport in Sport::ALL {
            for partition in ScoreboardPartition::all_for(sport) {
                assert_eq!(ScoreboardPartition::from_key(&partition.key()), Some(partition));
            }
        }
    }

    #[test]
    fn test_from_key_rejects_foreign_selectors() {
        assert_eq!(ScoreboardPartition::from_key(&PartitionKey::live("nfl")), None);
        assert_eq!(ScoreboardPartition::from_key(&PartitionKey::live("nfl/tomorrow")), None);
        // Class must match the filter
        assert_eq!(ScoreboardPartition::from_key(&PartitionKey::live("nfl/yesterday")), None);
    }

    #[test]
    fn test_filter_cycle() {
        let mut filter = DateFilter::Today;
        for _ in 0..3 {
            filter = filter.next();
        }
        assert_eq!(filter, DateFilter::Today);
        assert_eq!(DateFilter::Yesterday.previous(), DateFilter::Upcoming);
    }
}
