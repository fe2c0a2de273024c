use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::schedule::{parse_game_date, sha256_hex};

pub const MIN_DAYS: &str = "min_days";
pub const MAX_RUN: &str = "max";
pub const GAMES: &str = "games";
pub const DAYS: &str = "days";
pub const WINDOW: &str = "window";
pub const MIN_HOME: &str = "min_home";
pub const MAX_DIFFERENCE: &str = "max_difference";
pub const TEAM: &str = "team";
pub const DATES: &str = "dates";
pub const HOME_TEAM: &str = "home_team";
pub const AWAY_TEAM: &str = "away_team";
pub const DATE: &str = "date";
pub const MIN_GAMES: &str = "min_games";
pub const BROADCASTER: &str = "broadcaster";
pub const TEAM_A: &str = "team_a";
pub const TEAM_B: &str = "team_b";
pub const WINDOW_START: &str = "window_start";
pub const WINDOW_END: &str = "window_end";
pub const LOOKBACK_SEASONS: &str = "lookback_seasons";
/// Share of windows or teams a distributional rule may miss and still hold.
pub const TOLERANCE: &str = "tolerance";

#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .to_ascii_lowercase()
        .replace(['-', ' '], "_")
        .replace('\'', "")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Football,
    Basketball,
    Baseball,
    Softball,
    Soccer,
    Volleyball,
}

impl Sport {
    pub const ALL: [Sport; 6] = [
        Sport::Football,
        Sport::Basketball,
        Sport::Baseball,
        Sport::Softball,
        Sport::Soccer,
        Sport::Volleyball,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Football => "football",
            Self::Basketball => "basketball",
            Self::Baseball => "baseball",
            Self::Softball => "softball",
            Self::Soccer => "soccer",
            Self::Volleyball => "volleyball",
        }
    }
}

impl Display for Sport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

impl FromStr for Sport {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "football" | "fb" => Ok(Self::Football),
            "basketball" | "bb" | "hoops" => Ok(Self::Basketball),
            "baseball" => Ok(Self::Baseball),
            "softball" => Ok(Self::Softball),
            "soccer" => Ok(Self::Soccer),
            "volleyball" | "vb" => Ok(Self::Volleyball),
            _ => Err(EnumParseError::new("sport", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Men,
    Women,
}

impl Display for Gender {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Men => write!(f, "men"),
            Self::Women => write!(f, "women"),
        }
    }
}

impl FromStr for Gender {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "men" | "mens" | "m" | "male" => Ok(Self::Men),
            "women" | "womens" | "w" | "female" => Ok(Self::Women),
            _ => Err(EnumParseError::new("gender", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Hardness {
    Hard,
    Soft,
    Preference,
}

impl Display for Hardness {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hard => write!(f, "hard"),
            Self::Soft => write!(f, "soft"),
            Self::Preference => write!(f, "preference"),
        }
    }
}

impl FromStr for Hardness {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "hard" => Ok(Self::Hard),
            "soft" => Ok(Self::Soft),
            "preference" | "pref" => Ok(Self::Preference),
            _ => Err(EnumParseError::new("hardness", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintCategory {
    Temporal,
    Venue,
    Balance,
    Travel,
    Broadcast,
    Competitive,
}

impl Display for ConstraintCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Temporal => "temporal",
            Self::Venue => "venue",
            Self::Balance => "balance",
            Self::Travel => "travel",
            Self::Broadcast => "broadcast",
            Self::Competitive => "competitive",
        };
        write!(f, "{label}")
    }
}

/// Violation level of a constraint, also used as conflict severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        write!(f, "{label}")
    }
}

impl FromStr for Severity {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(EnumParseError::new("severity", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    RestDays,
    MaxConsecutiveAway,
    MaxConsecutiveHome,
    VenueUnavailability,
    RequiredMatchup,
    HomeAwayBalance,
    AlternatingVenue,
    BroadcastMinimum,
    RivalryPlacement,
    GameCount,
    DayOfWeekProhibition,
    DistributionWindow,
}

impl ConstraintType {
    pub fn default_category(&self) -> ConstraintCategory {
        match self {
            Self::RestDays | Self::DayOfWeekProhibition => ConstraintCategory::Temporal,
            Self::MaxConsecutiveAway | Self::MaxConsecutiveHome => ConstraintCategory::Travel,
            Self::VenueUnavailability | Self::AlternatingVenue => ConstraintCategory::Venue,
            Self::HomeAwayBalance | Self::GameCount | Self::DistributionWindow => {
                ConstraintCategory::Balance
            }
            Self::BroadcastMinimum => ConstraintCategory::Broadcast,
            Self::RequiredMatchup | Self::RivalryPlacement => ConstraintCategory::Competitive,
        }
    }

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::RestDays => "rest_days",
            Self::MaxConsecutiveAway => "max_consecutive_away",
            Self::MaxConsecutiveHome => "max_consecutive_home",
            Self::VenueUnavailability => "venue_unavailability",
            Self::RequiredMatchup => "required_matchup",
            Self::HomeAwayBalance => "home_away_balance",
            Self::AlternatingVenue => "alternating_venue",
            Self::BroadcastMinimum => "broadcast_minimum",
            Self::RivalryPlacement => "rivalry_placement",
            Self::GameCount => "game_count",
            Self::DayOfWeekProhibition => "day_of_week_prohibition",
            Self::DistributionWindow => "distribution_window",
        }
    }
}

impl Display for ConstraintType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_slug())
    }
}

impl FromStr for ConstraintType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match normalize(s).as_str() {
            "rest_days" => Self::RestDays,
            "max_consecutive_away" => Self::MaxConsecutiveAway,
            "max_consecutive_home" => Self::MaxConsecutiveHome,
            "venue_unavailability" => Self::VenueUnavailability,
            "required_matchup" => Self::RequiredMatchup,
            "home_away_balance" => Self::HomeAwayBalance,
            "alternating_venue" => Self::AlternatingVenue,
            "broadcast_minimum" => Self::BroadcastMinimum,
            "rivalry_placement" => Self::RivalryPlacement,
            "game_count" => Self::GameCount,
            "day_of_week_prohibition" => Self::DayOfWeekProhibition,
            "distribution_window" => Self::DistributionWindow,
            _ => return Err(EnumParseError::new("constraint type", s)),
        };
        Ok(ty)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    Bool(bool),
    Text(String),
    List(Vec<ParameterValue>),
}

impl ParameterValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn texts(values: &[&str]) -> Self {
        Self::List(values.iter().map(|v| Self::Text(v.to_string())).collect())
    }
}

impl Display for ParameterValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::List(items) => {
                let joined = items
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{joined}]")
            }
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One declarative scheduling rule. Records are built by the registry and
/// treated as immutable; adjustments produce new records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constraint {
    pub id: String,
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    pub hardness: Hardness,
    pub category: ConstraintCategory,
    #[serde(deserialize_with = "deserialize_weight")]
    pub weight: f64,
    pub description: String,
    pub sport: Sport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation: Option<Severity>,
}

impl Constraint {
    pub fn new(id: &str, constraint_type: ConstraintType, sport: Sport) -> Self {
        Self {
            id: id.to_string(),
            constraint_type,
            hardness: Hardness::Soft,
            category: constraint_type.default_category(),
            weight: 50.0,
            description: String::new(),
            sport,
            gender: None,
            parameters: BTreeMap::new(),
            violation: None,
        }
    }

    pub fn with_hardness(mut self, hardness: Hardness) -> Self {
        self.hardness = hardness;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = clamp_weight(weight);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_gender(mut self, gender: Option<Gender>) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_parameter(mut self, key: &str, value: impl Into<ParameterValue>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn with_violation(mut self, severity: Severity) -> Self {
        self.violation = Some(severity);
        self
    }

    pub fn is_hard(&self) -> bool {
        self.hardness == Hardness::Hard
    }

    pub fn severity(&self) -> Severity {
        self.violation.unwrap_or(Severity::Medium)
    }

    pub fn same_scope(&self, other: &Constraint) -> bool {
        self.sport == other.sport && self.gender == other.gender
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.parameters.get(key).and_then(ParameterValue::as_number)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(ParameterValue::as_text)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Text items of a list parameter; a bare text value counts as one item.
    pub fn texts(&self, key: &str) -> Vec<&str> {
        match self.parameters.get(key) {
            Some(ParameterValue::Text(v)) => vec![v.as_str()],
            Some(ParameterValue::List(items)) => {
                items.iter().filter_map(ParameterValue::as_text).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Parsed dates of a date or date-list parameter; unparseable entries are skipped.
    pub fn dates(&self, key: &str) -> Vec<NaiveDate> {
        self.texts(key)
            .into_iter()
            .filter_map(parse_game_date)
            .collect()
    }
}

pub fn clamp_weight(weight: f64) -> f64 {
    if weight.is_nan() {
        return 0.0;
    }
    weight.clamp(0.0, 100.0)
}

/// `base` if unused, otherwise `base-2`, `base-3`, ... Records the id it returns.
pub fn unique_id(used: &mut BTreeSet<String>, base: &str) -> String {
    let mut id = base.to_string();
    let mut n = 2;
    while used.contains(&id) {
        id = format!("{base}-{n}");
        n += 1;
    }
    used.insert(id.clone());
    id
}

fn deserialize_weight<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(clamp_weight)
}

pub fn constraint_fingerprint(constraints: &[Constraint]) -> String {
    let canonical = serde_json::to_string(constraints).unwrap_or_default();
    sha256_hex(&canonical)
}
