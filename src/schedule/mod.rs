pub mod single_game;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

pub use single_game::{single_game_maps, single_game_opponents, SingleGameOpponentMap};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum VenueSide {
    Home,
    Away,
}

impl VenueSide {
    pub fn flipped(self) -> Self {
        match self {
            Self::Home => Self::Away,
            Self::Away => Self::Home,
        }
    }
}

impl Display for VenueSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::Away => write!(f, "away"),
        }
    }
}

/// A single scheduled game.
///
/// Every field is optional on the wire so that one incomplete record never
/// fails a whole schedule load; rules treat such records as non-matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Game {
    #[serde(default, alias = "homeTeam")]
    pub home_team: String,
    #[serde(default, alias = "awayTeam")]
    pub away_team: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, alias = "isConference")]
    pub is_conference: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcaster: Option<String>,
}

impl Game {
    pub fn conference(home: &str, away: &str, date: &str) -> Self {
        Self {
            home_team: home.to_string(),
            away_team: away.to_string(),
            date: date.to_string(),
            is_conference: true,
            venue: None,
            broadcaster: None,
        }
    }

    pub fn non_conference(home: &str, away: &str, date: &str) -> Self {
        Self {
            is_conference: false,
            ..Self::conference(home, away, date)
        }
    }

    pub fn with_venue(mut self, venue: &str) -> Self {
        self.venue = Some(venue.to_string());
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: &str) -> Self {
        self.broadcaster = Some(broadcaster.to_string());
        self
    }

    pub fn is_well_formed(&self) -> bool {
        let home = self.home_team.trim();
        let away = self.away_team.trim();
        !home.is_empty() && !away.is_empty() && home != away
    }

    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_game_date(&self.date)
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn side_for(&self, team: &str) -> Option<VenueSide> {
        if self.home_team == team {
            Some(VenueSide::Home)
        } else if self.away_team == team {
            Some(VenueSide::Away)
        } else {
            None
        }
    }

    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        match self.side_for(team)? {
            VenueSide::Home => Some(self.away_team.as_str()),
            VenueSide::Away => Some(self.home_team.as_str()),
        }
    }

    pub fn is_between(&self, team_a: &str, team_b: &str) -> bool {
        (self.home_team == team_a && self.away_team == team_b)
            || (self.home_team == team_b && self.away_team == team_a)
    }
}

/// Accepts ISO dates, RFC 3339 timestamps, naive timestamps and US-style dates.
pub fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.date_naive());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(ts.date());
    }
    NaiveDate::parse_from_str(trimmed, "%m/%d/%Y").ok()
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("schedule must be a JSON array of games or an object with a `games` array, got {0}")]
    NotASchedule(&'static str),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(default)]
    pub games: Vec<Game>,
}

impl Schedule {
    pub fn new(season: Option<&str>, games: Vec<Game>) -> Self {
        Self {
            season: season.map(str::to_string),
            games,
        }
    }

    /// Builds a schedule record by record. Entries that are not JSON objects
    /// are dropped; objects with missing fields are kept as malformed games.
    pub fn from_value(value: &Value) -> Result<Self, ScheduleError> {
        let (season, items) = match value {
            Value::Array(items) => (None, items),
            Value::Object(map) => match map.get("games") {
                Some(Value::Array(items)) => (
                    map.get("season").and_then(season_label),
                    items,
                ),
                _ => return Err(ScheduleError::NotASchedule("object without a games array")),
            },
            other => return Err(ScheduleError::NotASchedule(json_kind(other))),
        };

        let mut games = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            if !item.is_object() {
                debug!("skipping schedule record {idx}: not an object");
                continue;
            }
            match serde_json::from_value::<Game>(item.clone()) {
                Ok(game) => games.push(game),
                Err(error) => debug!("skipping schedule record {idx}: {error}"),
            }
        }
        Ok(Self { season, games })
    }

    /// Prior-season input is optional; anything that is not a schedule shape
    /// is treated as absent rather than as an error.
    pub fn previous_from_value(value: Option<&Value>) -> Option<Self> {
        let value = value?;
        match Self::from_value(value) {
            Ok(schedule) => Some(schedule),
            Err(error) => {
                debug!("ignoring previous season input: {error}");
                None
            }
        }
    }

    /// Well-formed conference games, in schedule order.
    pub fn conference_games(&self) -> impl Iterator<Item = &Game> {
        self.games
            .iter()
            .filter(|g| g.is_conference && g.is_well_formed())
    }

    pub fn conference_teams(&self) -> BTreeSet<&str> {
        let mut teams = BTreeSet::new();
        for game in self.conference_games() {
            teams.insert(game.home_team.as_str());
            teams.insert(game.away_team.as_str());
        }
        teams
    }

    /// Dated games for one team, sorted by date. Ties keep schedule order.
    /// Undated and malformed games are left out.
    pub fn team_games_by_date(&self, team: &str, conference_only: bool) -> Vec<(NaiveDate, &Game)> {
        let mut out: Vec<(NaiveDate, &Game)> = self
            .games
            .iter()
            .filter(|g| g.is_well_formed() && (g.is_conference || !conference_only))
            .filter(|g| g.involves(team))
            .filter_map(|g| g.parsed_date().map(|d| (d, g)))
            .collect();
        out.sort_by_key(|(date, _)| *date);
        out
    }

    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        sha256_hex(&canonical)
    }
}

fn season_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TeamProfile {
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub unavailable_dates: Vec<String>,
}

/// Team and venue facts owned by an external service, supplied in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TeamDirectory {
    #[serde(default)]
    pub teams: BTreeMap<String, TeamProfile>,
}

impl TeamDirectory {
    pub fn with_team(mut self, team: &str, profile: TeamProfile) -> Self {
        self.teams.insert(team.to_string(), profile);
        self
    }

    pub fn profile(&self, team: &str) -> Option<&TeamProfile> {
        self.teams.get(team)
    }

    pub fn unavailable_dates(&self, team: &str) -> BTreeSet<NaiveDate> {
        self.profile(team)
            .map(|p| {
                p.unavailable_dates
                    .iter()
                    .filter_map(|d| parse_game_date(d))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn venue_for(&self, game: &Game) -> Option<String> {
        game.venue.clone().or_else(|| {
            self.profile(&game.home_team)
                .map(|p| p.venue.clone())
                .filter(|v| !v.is_empty())
        })
    }
}
