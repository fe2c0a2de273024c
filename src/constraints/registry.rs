use std::collections::{BTreeMap, BTreeSet};

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constraints::schema::{
    unique_id, Constraint, ConstraintType, Gender, Hardness, ParameterValue, Severity, Sport, AWAY_TEAM,
    DATE, DATES, DAYS, GAMES, HOME_TEAM, LOOKBACK_SEASONS, MAX_DIFFERENCE, MAX_RUN, MIN_DAYS,
    MIN_GAMES, MIN_HOME, TEAM, TEAM_A, TEAM_B, TOLERANCE, WINDOW, WINDOW_END, WINDOW_START,
};
use crate::schedule::parse_game_date;

pub const SETTING_LOOKBACK_SEASONS: &str = "lookback_seasons";
pub const SETTING_MIN_REST_DAYS: &str = "min_rest_days";
pub const SETTING_MAX_CONSECUTIVE_AWAY: &str = "max_consecutive_away";
pub const SETTING_MAX_CONSECUTIVE_HOME: &str = "max_consecutive_home";
pub const SETTING_CONFERENCE_GAMES: &str = "conference_games";
pub const SETTING_BROADCAST_MINIMUM: &str = "broadcast_minimum";
pub const SETTING_DISTRIBUTION_WINDOW: &str = "distribution_window";
pub const SETTING_MIN_HOME_PER_WINDOW: &str = "min_home_per_window";
pub const SETTING_MAX_HOME_AWAY_DIFFERENCE: &str = "max_home_away_difference";
pub const SETTING_PROHIBITED_DAYS: &str = "prohibited_days";
pub const SETTING_RIVALRIES: &str = "rivalries";
pub const SETTING_REQUIRED_MATCHUPS: &str = "required_matchups";
pub const SETTING_VENUE_UNAVAILABILITY: &str = "venue_unavailability";
pub const SETTING_WINDOW_TOLERANCE: &str = "window_tolerance";

/// Numeric settings with the smallest value that still makes sense.
const NUMERIC_SETTINGS: [(&str, f64); 9] = [
    (SETTING_LOOKBACK_SEASONS, 1.0),
    (SETTING_MIN_REST_DAYS, 0.0),
    (SETTING_MAX_CONSECUTIVE_AWAY, 1.0),
    (SETTING_MAX_CONSECUTIVE_HOME, 1.0),
    (SETTING_CONFERENCE_GAMES, 1.0),
    (SETTING_BROADCAST_MINIMUM, 0.0),
    (SETTING_DISTRIBUTION_WINDOW, 2.0),
    (SETTING_MIN_HOME_PER_WINDOW, 0.0),
    (SETTING_MAX_HOME_AWAY_DIFFERENCE, 0.0),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegistryParameters {
    pub sport: Option<Sport>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl RegistryParameters {
    pub fn new(sport: Sport, gender: Option<Gender>) -> Self {
        Self {
            sport: Some(sport),
            gender,
            settings: BTreeMap::new(),
        }
    }

    pub fn with_setting(mut self, key: &str, value: Value) -> Self {
        self.settings.insert(key.to_string(), value);
        self
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.settings.get(key).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterIssue {
    pub key: String,
    pub message: String,
}

impl ParameterIssue {
    fn new(key: &str, message: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParameterReport {
    pub is_valid: bool,
    pub errors: Vec<ParameterIssue>,
    pub warnings: Vec<ParameterIssue>,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("constraint parameters rejected with {} error(s)", .0.errors.len())]
    InvalidParameters(ParameterReport),
}

/// Type mismatches are errors and block activation; out-of-range or unknown
/// values are warnings.
pub fn validate_parameters(params: &RegistryParameters) -> ParameterReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match params.sport {
        None => errors.push(ParameterIssue::new("sport", "sport is required")),
        Some(sport) => check_gender(sport, params.gender, &mut warnings),
    }

    for (key, value) in &params.settings {
        let key = key.as_str();
        if let Some((_, min)) = NUMERIC_SETTINGS.iter().find(|(name, _)| *name == key) {
            check_number(key, value, *min, &mut errors, &mut warnings);
            continue;
        }
        match key {
            SETTING_PROHIBITED_DAYS => check_weekdays(value, &mut errors, &mut warnings),
            SETTING_RIVALRIES => check_rivalries(value, &mut errors, &mut warnings),
            SETTING_REQUIRED_MATCHUPS => check_matchups(value, &mut errors, &mut warnings),
            SETTING_VENUE_UNAVAILABILITY => check_unavailability(value, &mut errors, &mut warnings),
            SETTING_WINDOW_TOLERANCE => check_share(key, value, &mut errors, &mut warnings),
            _ => warnings.push(ParameterIssue::new(key, "unknown setting is ignored")),
        }
    }

    if let (Some(window), Some(min_home)) = (
        params.number(SETTING_DISTRIBUTION_WINDOW),
        params.number(SETTING_MIN_HOME_PER_WINDOW),
    ) {
        if min_home > window {
            warnings.push(ParameterIssue::new(
                SETTING_MIN_HOME_PER_WINDOW,
                format!("{min_home} home games can never fit a window of {window}"),
            ));
        }
    }

    ParameterReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn check_gender(sport: Sport, gender: Option<Gender>, warnings: &mut Vec<ParameterIssue>) {
    let message = match (sport, gender) {
        (Sport::Football, Some(Gender::Women)) => "football has no women's program",
        (Sport::Baseball, Some(Gender::Women)) => "baseball is sponsored for men only",
        (Sport::Softball, Some(Gender::Men)) => "softball is sponsored for women only",
        (Sport::Soccer | Sport::Volleyball, Some(Gender::Men)) => {
            "conference sponsors this sport for women only"
        }
        (Sport::Basketball, None) => "gender not set; constraints apply to both programs",
        _ => return,
    };
    warnings.push(ParameterIssue::new("gender", message));
}

fn check_number(
    key: &str,
    value: &Value,
    min: f64,
    errors: &mut Vec<ParameterIssue>,
    warnings: &mut Vec<ParameterIssue>,
) {
    let Some(number) = value.as_f64() else {
        errors.push(ParameterIssue::new(key, format!("expected a number, got {value}")));
        return;
    };
    if number < min {
        warnings.push(ParameterIssue::new(
            key,
            format!("{number} is below the minimum of {min}"),
        ));
    }
    if number.fract() != 0.0 {
        warnings.push(ParameterIssue::new(
            key,
            format!("{number} is not a whole number and will be truncated"),
        ));
    }
}

fn check_share(
    key: &str,
    value: &Value,
    errors: &mut Vec<ParameterIssue>,
    warnings: &mut Vec<ParameterIssue>,
) {
    match value.as_f64() {
        None => errors.push(ParameterIssue::new(key, format!("expected a number, got {value}"))),
        Some(share) if !(0.0..=1.0).contains(&share) => warnings.push(ParameterIssue::new(
            key,
            format!("{share} is outside 0..=1 and will be clamped"),
        )),
        Some(_) => {}
    }
}

fn check_weekdays(value: &Value, errors: &mut Vec<ParameterIssue>, warnings: &mut Vec<ParameterIssue>) {
    let Some(items) = value.as_array() else {
        errors.push(ParameterIssue::new(SETTING_PROHIBITED_DAYS, "expected a list of weekdays"));
        return;
    };
    for item in items {
        match item.as_str() {
            Some(day) if day.trim().parse::<Weekday>().is_ok() => {}
            Some(day) => warnings.push(ParameterIssue::new(
                SETTING_PROHIBITED_DAYS,
                format!("unrecognized weekday '{day}' is ignored"),
            )),
            None => errors.push(ParameterIssue::new(
                SETTING_PROHIBITED_DAYS,
                format!("expected weekday text, got {item}"),
            )),
        }
    }
}

fn check_rivalries(value: &Value, errors: &mut Vec<ParameterIssue>, warnings: &mut Vec<ParameterIssue>) {
    let Some(items) = value.as_array() else {
        errors.push(ParameterIssue::new(SETTING_RIVALRIES, "expected a list of rivalries"));
        return;
    };
    for item in items {
        match parse_rivalry(item) {
            Some(rivalry) => {
                for bound in [&rivalry.window_start, &rivalry.window_end].into_iter().flatten() {
                    if parse_game_date(bound).is_none() {
                        warnings.push(ParameterIssue::new(
                            SETTING_RIVALRIES,
                            format!("unparseable window date '{bound}' is ignored"),
                        ));
                    }
                }
            }
            None => errors.push(ParameterIssue::new(
                SETTING_RIVALRIES,
                format!("expected [team_a, team_b] or {{team_a, team_b}}, got {item}"),
            )),
        }
    }
}

fn check_matchups(value: &Value, errors: &mut Vec<ParameterIssue>, warnings: &mut Vec<ParameterIssue>) {
    let Some(items) = value.as_array() else {
        errors.push(ParameterIssue::new(SETTING_REQUIRED_MATCHUPS, "expected a list of matchups"));
        return;
    };
    for item in items {
        match parse_matchup(item) {
            Some(matchup) => {
                if let Some(date) = &matchup.date {
                    if parse_game_date(date).is_none() {
                        warnings.push(ParameterIssue::new(
                            SETTING_REQUIRED_MATCHUPS,
                            format!("unparseable matchup date '{date}' is ignored"),
                        ));
                    }
                }
            }
            None => errors.push(ParameterIssue::new(
                SETTING_REQUIRED_MATCHUPS,
                format!("expected {{home_team, away_team, date?}}, got {item}"),
            )),
        }
    }
}

fn check_unavailability(
    value: &Value,
    errors: &mut Vec<ParameterIssue>,
    warnings: &mut Vec<ParameterIssue>,
) {
    let Some(teams) = value.as_object() else {
        errors.push(ParameterIssue::new(
            SETTING_VENUE_UNAVAILABILITY,
            "expected a map of team to unavailable dates",
        ));
        return;
    };
    for (team, dates) in teams {
        let Some(dates) = dates.as_array() else {
            errors.push(ParameterIssue::new(
                SETTING_VENUE_UNAVAILABILITY,
                format!("dates for {team} must be a list"),
            ));
            continue;
        };
        for date in dates {
            if date.as_str().and_then(parse_game_date).is_none() {
                warnings.push(ParameterIssue::new(
                    SETTING_VENUE_UNAVAILABILITY,
                    format!("unparseable date {date} for {team} is ignored"),
                ));
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Rivalry {
    team_a: String,
    team_b: String,
    window_start: Option<String>,
    window_end: Option<String>,
}

fn parse_rivalry(value: &Value) -> Option<Rivalry> {
    match value {
        Value::Array(pair) if pair.len() == 2 => Some(Rivalry {
            team_a: pair[0].as_str()?.to_string(),
            team_b: pair[1].as_str()?.to_string(),
            window_start: None,
            window_end: None,
        }),
        Value::Object(map) => Some(Rivalry {
            team_a: map.get(TEAM_A)?.as_str()?.to_string(),
            team_b: map.get(TEAM_B)?.as_str()?.to_string(),
            window_start: map.get(WINDOW_START).and_then(Value::as_str).map(str::to_string),
            window_end: map.get(WINDOW_END).and_then(Value::as_str).map(str::to_string),
        }),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct Matchup {
    home_team: String,
    away_team: String,
    date: Option<String>,
}

fn parse_matchup(value: &Value) -> Option<Matchup> {
    let map = value.as_object()?;
    Some(Matchup {
        home_team: map.get(HOME_TEAM)?.as_str()?.to_string(),
        away_team: map.get(AWAY_TEAM)?.as_str()?.to_string(),
        date: map.get(DATE).and_then(Value::as_str).map(str::to_string),
    })
}

/// Per-sport defaults, before settings are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SportProfile {
    pub min_rest_days: f64,
    pub max_consecutive_away: f64,
    pub max_consecutive_home: f64,
    pub conference_games: f64,
    pub broadcast_minimum: f64,
    pub distribution_window: Option<(f64, f64)>,
    /// Share of windows allowed to fall short.
    pub window_tolerance: f64,
    pub max_home_away_difference: f64,
    pub prohibited_days: Vec<String>,
    pub lookback_seasons: f64,
}

impl SportProfile {
    pub fn for_sport(sport: Sport, gender: Option<Gender>) -> Self {
        let base = Self {
            min_rest_days: 1.0,
            max_consecutive_away: 2.0,
            max_consecutive_home: 3.0,
            conference_games: 18.0,
            broadcast_minimum: 4.0,
            distribution_window: None,
            window_tolerance: 0.0,
            max_home_away_difference: 1.0,
            prohibited_days: Vec::new(),
            lookback_seasons: 1.0,
        };
        match sport {
            Sport::Football => Self {
                min_rest_days: 5.0,
                conference_games: 9.0,
                prohibited_days: vec!["sunday".to_string()],
                ..base
            },
            Sport::Basketball => Self {
                conference_games: if gender == Some(Gender::Women) { 18.0 } else { 20.0 },
                broadcast_minimum: 8.0,
                distribution_window: Some((4.0, 1.0)),
                ..base
            },
            Sport::Baseball => Self {
                min_rest_days: 0.0,
                max_consecutive_away: 6.0,
                max_consecutive_home: 6.0,
                conference_games: 30.0,
                broadcast_minimum: 3.0,
                max_home_away_difference: 3.0,
                ..base
            },
            Sport::Softball => Self {
                min_rest_days: 0.0,
                max_consecutive_away: 6.0,
                max_consecutive_home: 6.0,
                conference_games: 24.0,
                broadcast_minimum: 3.0,
                max_home_away_difference: 3.0,
                ..base
            },
            Sport::Soccer => Self {
                min_rest_days: 2.0,
                max_consecutive_home: 2.0,
                conference_games: 11.0,
                broadcast_minimum: 2.0,
                ..base
            },
            Sport::Volleyball => Self {
                min_rest_days: 0.0,
                max_consecutive_away: 4.0,
                max_consecutive_home: 4.0,
                distribution_window: Some((4.0, 1.0)),
                max_home_away_difference: 2.0,
                ..base
            },
        }
    }

    fn apply_settings(mut self, params: &RegistryParameters) -> Self {
        let whole = |key: &str| params.number(key).map(f64::trunc);
        if let Some(v) = whole(SETTING_MIN_REST_DAYS) {
            self.min_rest_days = v.max(0.0);
        }
        if let Some(v) = whole(SETTING_MAX_CONSECUTIVE_AWAY) {
            self.max_consecutive_away = v.max(1.0);
        }
        if let Some(v) = whole(SETTING_MAX_CONSECUTIVE_HOME) {
            self.max_consecutive_home = v.max(1.0);
        }
        if let Some(v) = whole(SETTING_CONFERENCE_GAMES) {
            self.conference_games = v.max(1.0);
        }
        if let Some(v) = whole(SETTING_BROADCAST_MINIMUM) {
            self.broadcast_minimum = v.max(0.0);
        }
        if let Some(v) = whole(SETTING_MAX_HOME_AWAY_DIFFERENCE) {
            self.max_home_away_difference = v.max(0.0);
        }
        if let Some(v) = whole(SETTING_LOOKBACK_SEASONS) {
            self.lookback_seasons = v;
        }
        if let Some(v) = params.number(SETTING_WINDOW_TOLERANCE) {
            self.window_tolerance = v.clamp(0.0, 1.0);
        }
        let window = whole(SETTING_DISTRIBUTION_WINDOW)
            .or(self.distribution_window.map(|(w, _)| w));
        let min_home = whole(SETTING_MIN_HOME_PER_WINDOW)
            .or(self.distribution_window.map(|(_, m)| m));
        if let (Some(window), Some(min_home)) = (window, min_home.or(Some(1.0))) {
            self.distribution_window = Some((window.max(2.0), min_home.clamp(0.0, window.max(2.0))));
        }
        if let Some(days) = params.settings.get(SETTING_PROHIBITED_DAYS).and_then(Value::as_array) {
            self.prohibited_days = days
                .iter()
                .filter_map(Value::as_str)
                .filter(|d| d.trim().parse::<Weekday>().is_ok())
                .map(|d| d.trim().to_ascii_lowercase())
                .collect();
        }
        self
    }
}

/// Builds the constraint set for one sport program. Deterministic: the same
/// parameters always produce the same records in the same order.
pub fn generate_constraints(params: &RegistryParameters) -> Result<Vec<Constraint>, RegistryError> {
    let report = validate_parameters(params);
    if !report.is_valid {
        return Err(RegistryError::InvalidParameters(report));
    }
    for issue in &report.warnings {
        warn!(key = %issue.key, "constraint parameter warning: {}", issue.message);
    }
    let Some(sport) = params.sport else {
        return Err(RegistryError::InvalidParameters(report));
    };

    let gender = params.gender;
    let profile = SportProfile::for_sport(sport, gender).apply_settings(params);
    let prefix = match gender {
        Some(g) => format!("{sport}-{g}"),
        None => sport.to_string(),
    };
    let make = |slug: &str, ty: ConstraintType| {
        Constraint::new(&format!("{prefix}-{slug}"), ty, sport).with_gender(gender)
    };

    let mut out = Vec::new();

    out.push(
        make("game-count", ConstraintType::GameCount)
            .with_hardness(Hardness::Hard)
            .with_weight(100.0)
            .with_violation(Severity::Critical)
            .with_parameter(GAMES, profile.conference_games)
            .with_description(format!(
                "Every team plays exactly {} conference games",
                profile.conference_games
            )),
    );

    if profile.lookback_seasons >= 1.0 {
        out.push(
            make("alternating-venue", ConstraintType::AlternatingVenue)
                .with_hardness(Hardness::Hard)
                .with_weight(90.0)
                .with_violation(Severity::Critical)
                .with_parameter(LOOKBACK_SEASONS, profile.lookback_seasons)
                .with_description(
                    "Single-game opponents alternate home and away between seasons",
                ),
        );
    } else {
        debug!(%sport, "lookback below one season, alternating venue rule not generated");
    }

    out.push(
        make("rest-days", ConstraintType::RestDays)
            .with_hardness(Hardness::Hard)
            .with_weight(85.0)
            .with_violation(Severity::Critical)
            .with_parameter(MIN_DAYS, profile.min_rest_days)
            .with_description(format!(
                "At least {} rest day(s) between a team's games",
                profile.min_rest_days
            )),
    );

    out.push(
        make("home-away-balance", ConstraintType::HomeAwayBalance)
            .with_hardness(Hardness::Hard)
            .with_weight(80.0)
            .with_violation(Severity::Critical)
            .with_parameter(MAX_DIFFERENCE, profile.max_home_away_difference)
            .with_description(format!(
                "Home and away counts differ by at most {}",
                profile.max_home_away_difference
            )),
    );

    out.push(
        make("max-consecutive-away", ConstraintType::MaxConsecutiveAway)
            .with_weight(60.0)
            .with_parameter(MAX_RUN, profile.max_consecutive_away)
            .with_description(format!(
                "No more than {} consecutive road games",
                profile.max_consecutive_away
            )),
    );

    out.push(
        make("max-consecutive-home", ConstraintType::MaxConsecutiveHome)
            .with_weight(40.0)
            .with_parameter(MAX_RUN, profile.max_consecutive_home)
            .with_description(format!(
                "No more than {} consecutive home games",
                profile.max_consecutive_home
            )),
    );

    if let Some((window, min_home)) = profile.distribution_window {
        let mut c = make("distribution-window", ConstraintType::DistributionWindow)
            .with_weight(50.0)
            .with_parameter(WINDOW, window)
            .with_parameter(MIN_HOME, min_home)
            .with_description(format!(
                "Every {window} consecutive games include at least {min_home} at home"
            ));
        if profile.window_tolerance > 0.0 {
            c = c.with_parameter(TOLERANCE, profile.window_tolerance);
        }
        out.push(c);
    }

    if !profile.prohibited_days.is_empty() {
        let days: Vec<&str> = profile.prohibited_days.iter().map(String::as_str).collect();
        out.push(
            make("prohibited-days", ConstraintType::DayOfWeekProhibition)
                .with_hardness(Hardness::Hard)
                .with_weight(95.0)
                .with_violation(Severity::Critical)
                .with_parameter(DAYS, ParameterValue::texts(&days))
                .with_description(format!("No conference games on {}", days.join(", "))),
        );
    }

    if profile.broadcast_minimum > 0.0 {
        out.push(
            make("broadcast-minimum", ConstraintType::BroadcastMinimum)
                .with_hardness(Hardness::Preference)
                .with_weight(30.0)
                .with_violation(Severity::Low)
                .with_parameter(MIN_GAMES, profile.broadcast_minimum)
                .with_description(format!(
                    "At least {} conference games carried by a broadcaster",
                    profile.broadcast_minimum
                )),
        );
    }

    if let Some(items) = params.settings.get(SETTING_RIVALRIES).and_then(Value::as_array) {
        for rivalry in items.iter().filter_map(parse_rivalry) {
            let mut c = make(
                &format!("rivalry-{}-{}", slugify(&rivalry.team_a), slugify(&rivalry.team_b)),
                ConstraintType::RivalryPlacement,
            )
            .with_hardness(Hardness::Preference)
            .with_weight(35.0)
            .with_violation(Severity::Low)
            .with_parameter(TEAM_A, rivalry.team_a.as_str())
            .with_parameter(TEAM_B, rivalry.team_b.as_str())
            .with_description(format!(
                "{} vs {} rivalry placed in its window",
                rivalry.team_a, rivalry.team_b
            ));
            if let Some(start) = &rivalry.window_start {
                c = c.with_parameter(WINDOW_START, start.as_str());
            }
            if let Some(end) = &rivalry.window_end {
                c = c.with_parameter(WINDOW_END, end.as_str());
            }
            out.push(c);
        }
    }

    if let Some(items) = params
        .settings
        .get(SETTING_REQUIRED_MATCHUPS)
        .and_then(Value::as_array)
    {
        for (idx, matchup) in items.iter().filter_map(parse_matchup).enumerate() {
            let mut c = make(
                &format!("matchup-{}", idx + 1),
                ConstraintType::RequiredMatchup,
            )
            .with_hardness(Hardness::Hard)
            .with_weight(90.0)
            .with_violation(Severity::Critical)
            .with_parameter(HOME_TEAM, matchup.home_team.as_str())
            .with_parameter(AWAY_TEAM, matchup.away_team.as_str())
            .with_description(format!(
                "{} hosts {}{}",
                matchup.home_team,
                matchup.away_team,
                matchup
                    .date
                    .as_deref()
                    .map(|d| format!(" on {d}"))
                    .unwrap_or_default()
            ));
            if let Some(date) = &matchup.date {
                c = c.with_parameter(DATE, date.as_str());
            }
            out.push(c);
        }
    }

    if let Some(teams) = params
        .settings
        .get(SETTING_VENUE_UNAVAILABILITY)
        .and_then(Value::as_object)
    {
        let ordered: BTreeMap<&String, &Value> = teams.iter().collect();
        for (team, dates) in ordered {
            let dates: Vec<&str> = dates
                .as_array()
                .map(|d| d.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            out.push(
                make(
                    &format!("venue-unavailable-{}", slugify(team)),
                    ConstraintType::VenueUnavailability,
                )
                .with_hardness(Hardness::Hard)
                .with_weight(100.0)
                .with_violation(Severity::Critical)
                .with_parameter(TEAM, team.as_str())
                .with_parameter(DATES, ParameterValue::texts(&dates))
                .with_description(format!("{team} cannot host on {} date(s)", dates.len())),
            );
        }
    }

    // Rivalries and blackouts derive ids from names, which can repeat.
    let mut used = BTreeSet::new();
    for c in &mut out {
        c.id = unique_id(&mut used, &c.id);
    }

    debug!(%sport, count = out.len(), "generated constraints");
    Ok(out)
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::constraints::registry::{
        generate_constraints, validate_parameters, RegistryError, RegistryParameters,
        SETTING_LOOKBACK_SEASONS, SETTING_MIN_REST_DAYS, SETTING_REQUIRED_MATCHUPS,
        SETTING_RIVALRIES, SETTING_VENUE_UNAVAILABILITY, SETTING_WINDOW_TOLERANCE,
    };
    use crate::constraints::schema::{
        ConstraintType, Gender, Hardness, Severity, Sport, DATES, GAMES, MIN_DAYS, TEAM, TOLERANCE,
    };

    #[test]
    fn football_profile_generates_core_rules() {
        let constraints = generate_constraints(&RegistryParameters::new(Sport::Football, None))
            .expect("valid parameters");
        let types: Vec<ConstraintType> = constraints.iter().map(|c| c.constraint_type).collect();
        assert!(types.contains(&ConstraintType::AlternatingVenue));
        assert!(types.contains(&ConstraintType::DayOfWeekProhibition));
        assert!(!types.contains(&ConstraintType::DistributionWindow));
        let count = constraints
            .iter()
            .find(|c| c.constraint_type == ConstraintType::GameCount)
            .expect("game count rule");
        assert_eq!(count.number(GAMES), Some(9.0));
        assert_eq!(count.hardness, Hardness::Hard);
        assert_eq!(count.violation, Some(Severity::Critical));
        assert_eq!(count.id, "football-game-count");
    }

    #[test]
    fn generation_is_deterministic() {
        let params = RegistryParameters::new(Sport::Basketball, Some(Gender::Women))
            .with_setting(SETTING_RIVALRIES, json!([["Kansas", "Kansas State"]]));
        let first = generate_constraints(&params).expect("valid");
        let second = generate_constraints(&params).expect("valid");
        assert_eq!(first, second);
        assert!(first.iter().all(|c| c.gender == Some(Gender::Women)));
        assert!(first.iter().any(|c| c.id == "basketball-women-rivalry-kansas-kansas-state"));
    }

    #[test]
    fn low_lookback_is_a_warning_and_skips_alternation() {
        let params = RegistryParameters::new(Sport::Football, None)
            .with_setting(SETTING_LOOKBACK_SEASONS, json!(0));
        let report = validate_parameters(&params);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
        let constraints = generate_constraints(&params).expect("warnings do not block");
        assert!(constraints
            .iter()
            .all(|c| c.constraint_type != ConstraintType::AlternatingVenue));
    }

    #[test]
    fn type_mismatch_is_an_error_and_blocks_activation() {
        let params = RegistryParameters::new(Sport::Football, None)
            .with_setting(SETTING_LOOKBACK_SEASONS, json!("two"))
            .with_setting("favorite_color", json!("crimson"));
        let report = validate_parameters(&params);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].key, SETTING_LOOKBACK_SEASONS);
        assert_eq!(report.warnings.len(), 1);
        match generate_constraints(&params) {
            Err(RegistryError::InvalidParameters(report)) => assert_eq!(report.errors.len(), 1),
            Ok(_) => panic!("mismatched parameters must not activate"),
        }
    }

    #[test]
    fn missing_sport_is_an_error() {
        let report = validate_parameters(&RegistryParameters::default());
        assert!(!report.is_valid);
    }

    #[test]
    fn settings_override_profile_defaults() {
        let params = RegistryParameters::new(Sport::Soccer, Some(Gender::Women))
            .with_setting(SETTING_MIN_REST_DAYS, json!(3))
            .with_setting(
                SETTING_REQUIRED_MATCHUPS,
                json!([{ "home_team": "BYU", "away_team": "Utah", "date": "2025-10-10" }]),
            )
            .with_setting(
                SETTING_VENUE_UNAVAILABILITY,
                json!({ "TCU": ["2025-10-10", "2025-10-17"] }),
            );
        let constraints = generate_constraints(&params).expect("valid");
        let rest = constraints
            .iter()
            .find(|c| c.constraint_type == ConstraintType::RestDays)
            .expect("rest rule");
        assert_eq!(rest.number(MIN_DAYS), Some(3.0));
        let blackout = constraints
            .iter()
            .find(|c| c.constraint_type == ConstraintType::VenueUnavailability)
            .expect("blackout rule");
        assert_eq!(blackout.text(TEAM), Some("TCU"));
        assert_eq!(blackout.dates(DATES).len(), 2);
        assert!(constraints
            .iter()
            .any(|c| c.constraint_type == ConstraintType::RequiredMatchup));
    }

    #[test]
    fn repeated_rivalries_and_slug_collisions_get_distinct_ids() {
        let params = RegistryParameters::new(Sport::Football, None)
            .with_setting(
                SETTING_RIVALRIES,
                json!([
                    { "team_a": "Kansas", "team_b": "Kansas State", "window_end": "2025-10-31" },
                    { "team_a": "Kansas", "team_b": "Kansas State", "window_start": "2025-11-01" }
                ]),
            )
            .with_setting(
                SETTING_VENUE_UNAVAILABILITY,
                json!({ "Texas A&M": ["2025-10-10"], "Texas A M": ["2025-10-17"] }),
            );
        let constraints = generate_constraints(&params).expect("valid");
        let ids: Vec<&str> = constraints.iter().map(|c| c.id.as_str()).collect();
        let unique: std::collections::BTreeSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.contains(&"football-rivalry-kansas-kansas-state"));
        assert!(ids.contains(&"football-rivalry-kansas-kansas-state-2"));
        assert!(ids.contains(&"football-venue-unavailable-texas-a-m-2"));
    }

    #[test]
    fn window_tolerance_reaches_the_distribution_rule() {
        let params = RegistryParameters::new(Sport::Basketball, None)
            .with_setting(SETTING_WINDOW_TOLERANCE, json!(0.25));
        assert!(validate_parameters(&params).warnings.is_empty());
        let constraints = generate_constraints(&params).expect("valid");
        let window = constraints
            .iter()
            .find(|c| c.constraint_type == ConstraintType::DistributionWindow)
            .expect("window rule");
        assert_eq!(window.number(TOLERANCE), Some(0.25));

        let report = validate_parameters(
            &RegistryParameters::new(Sport::Basketball, None)
                .with_setting(SETTING_WINDOW_TOLERANCE, json!("some")),
        );
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn malformed_structured_settings_are_errors() {
        let params = RegistryParameters::new(Sport::Football, None)
            .with_setting(SETTING_RIVALRIES, json!(["Kansas"]))
            .with_setting(SETTING_VENUE_UNAVAILABILITY, json!(["2025-10-10"]));
        let report = validate_parameters(&params);
        assert_eq!(report.errors.len(), 2);
    }
}
