pub mod evaluator;
pub mod observer;
pub mod rules;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constraints::{Gender, Sport};
use crate::schedule::{Schedule, TeamDirectory, VenueSide};

pub use evaluator::{evaluate_and_report, evaluate_constraint};
pub use observer::{report_violations, NoopObserver, TracingObserver, ViolationEvent, ViolationObserver};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationResult {
    pub satisfied: bool,
    pub score: f64,
    pub details: EvaluationDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EvaluationDetails {
    pub violation_count: usize,
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

impl EvaluationResult {
    pub fn pass() -> Self {
        Self::graded(Vec::new(), 1.0)
    }

    /// Satisfied exactly when there are no violations; score clamped to [0, 1].
    pub fn graded(violations: Vec<Violation>, score: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            satisfied: violations.is_empty(),
            score,
            details: EvaluationDetails {
                violation_count: violations.len(),
                violations,
                context: BTreeMap::new(),
            },
        }
    }

    /// Distributional rules over `total` units (windows, teams). Scores the
    /// share that comply and holds while the missed share is within
    /// `tolerance`; tolerated shortfalls stay listed.
    pub fn tolerated(violations: Vec<Violation>, total: usize, tolerance: f64) -> Self {
        if total == 0 {
            return Self::graded(violations, 1.0);
        }
        let missed = violations.len() as f64 / total as f64;
        let mut result = Self::graded(violations, 1.0 - missed);
        result.satisfied = missed <= tolerance;
        result
    }

    /// Pass/fail rules: 1.0 without violations, 0.0 with any.
    pub fn binary(violations: Vec<Violation>) -> Self {
        let score = if violations.is_empty() { 1.0 } else { 0.0 };
        Self::graded(violations, score)
    }

    pub fn with_context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.context.insert(key.to_string(), value.into());
        self
    }

    pub fn violation_count(&self) -> usize {
        self.details.violation_count
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    RepeatedVenue {
        team: String,
        opponent: String,
        previous_venue: VenueSide,
        current_venue: VenueSide,
        message: String,
    },
    InsufficientRest {
        team: String,
        first_date: String,
        second_date: String,
        rest_days: i64,
        required: i64,
    },
    ConsecutiveRun {
        team: String,
        side: VenueSide,
        run_length: usize,
        max_allowed: usize,
        start_date: String,
    },
    GameCountMismatch {
        team: String,
        expected: usize,
        actual: usize,
    },
    ProhibitedDay {
        home_team: String,
        away_team: String,
        date: String,
        weekday: String,
    },
    WindowShortfall {
        team: String,
        window_start: String,
        home_games: usize,
        required: usize,
    },
    HomeAwayImbalance {
        team: String,
        home: usize,
        away: usize,
        max_difference: usize,
    },
    VenueUnavailable {
        team: String,
        venue: Option<String>,
        date: String,
    },
    MissingMatchup {
        home_team: String,
        away_team: String,
        date: Option<String>,
    },
    BroadcastShortfall {
        broadcaster: Option<String>,
        actual: usize,
        required: usize,
    },
    RivalryMisplaced {
        team_a: String,
        team_b: String,
        date: Option<String>,
    },
}

impl Violation {
    /// Stable machine-readable code for telemetry.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RepeatedVenue { .. } => "repeated_venue",
            Self::InsufficientRest { .. } => "insufficient_rest",
            Self::ConsecutiveRun { .. } => "consecutive_run",
            Self::GameCountMismatch { .. } => "game_count_mismatch",
            Self::ProhibitedDay { .. } => "prohibited_day",
            Self::WindowShortfall { .. } => "window_shortfall",
            Self::HomeAwayImbalance { .. } => "home_away_imbalance",
            Self::VenueUnavailable { .. } => "venue_unavailable",
            Self::MissingMatchup { .. } => "missing_matchup",
            Self::BroadcastShortfall { .. } => "broadcast_shortfall",
            Self::RivalryMisplaced { .. } => "rivalry_misplaced",
        }
    }

    pub fn team(&self) -> Option<&str> {
        match self {
            Self::RepeatedVenue { team, .. }
            | Self::InsufficientRest { team, .. }
            | Self::ConsecutiveRun { team, .. }
            | Self::GameCountMismatch { team, .. }
            | Self::WindowShortfall { team, .. }
            | Self::HomeAwayImbalance { team, .. }
            | Self::VenueUnavailable { team, .. } => Some(team.as_str()),
            Self::ProhibitedDay { home_team, .. } | Self::MissingMatchup { home_team, .. } => {
                Some(home_team.as_str())
            }
            Self::RivalryMisplaced { team_a, .. } => Some(team_a.as_str()),
            Self::BroadcastShortfall { .. } => None,
        }
    }

    pub fn opponent(&self) -> Option<&str> {
        match self {
            Self::RepeatedVenue { opponent, .. } => Some(opponent.as_str()),
            Self::ProhibitedDay { away_team, .. } | Self::MissingMatchup { away_team, .. } => {
                Some(away_team.as_str())
            }
            Self::RivalryMisplaced { team_b, .. } => Some(team_b.as_str()),
            _ => None,
        }
    }

    /// Venue label attached to the violation, when the rule records one.
    pub fn venue(&self) -> Option<String> {
        match self {
            Self::RepeatedVenue { current_venue, .. } => Some(current_venue.to_string()),
            Self::ConsecutiveRun { side, .. } => Some(side.to_string()),
            Self::VenueUnavailable { venue, .. } => venue.clone(),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::RepeatedVenue { message, .. } => message.clone(),
            Self::InsufficientRest {
                team,
                first_date,
                second_date,
                rest_days,
                required,
            } => format!(
                "{team} has {rest_days} rest day(s) between {first_date} and {second_date}, needs {required}"
            ),
            Self::ConsecutiveRun {
                team,
                side,
                run_length,
                max_allowed,
                start_date,
            } => format!(
                "{team} plays {run_length} consecutive {side} games from {start_date} (max {max_allowed})"
            ),
            Self::GameCountMismatch {
                team,
                expected,
                actual,
            } => format!("{team} plays {actual} conference games, expected {expected}"),
            Self::ProhibitedDay {
                home_team,
                away_team,
                date,
                weekday,
            } => format!("{away_team} at {home_team} on {date} falls on a prohibited {weekday}"),
            Self::WindowShortfall {
                team,
                window_start,
                home_games,
                required,
            } => format!(
                "{team} has {home_games} home game(s) in the window starting {window_start}, needs {required}"
            ),
            Self::HomeAwayImbalance {
                team,
                home,
                away,
                max_difference,
            } => format!("{team} has {home} home vs {away} away (max difference {max_difference})"),
            Self::VenueUnavailable { team, venue, date } => match venue {
                Some(venue) => format!("{team} hosts at {venue} on unavailable date {date}"),
                None => format!("{team} hosts on unavailable date {date}"),
            },
            Self::MissingMatchup {
                home_team,
                away_team,
                date,
            } => match date {
                Some(date) => format!("required game {away_team} at {home_team} on {date} is missing"),
                None => format!("required game {away_team} at {home_team} is missing"),
            },
            Self::BroadcastShortfall {
                broadcaster,
                actual,
                required,
            } => format!(
                "{} carries {actual} game(s), needs {required}",
                broadcaster.as_deref().unwrap_or("broadcast partners")
            ),
            Self::RivalryMisplaced {
                team_a,
                team_b,
                date,
            } => match date {
                Some(date) => format!("{team_a} vs {team_b} on {date} falls outside its window"),
                None => format!("{team_a} vs {team_b} is not scheduled"),
            },
        }
    }
}

/// Inputs shared by every rule besides the schedule under evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub sport: Sport,
    pub gender: Option<Gender>,
    pub previous_season: Option<&'a Schedule>,
    pub directory: Option<&'a TeamDirectory>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(sport: Sport, gender: Option<Gender>) -> Self {
        Self {
            sport,
            gender,
            previous_season: None,
            directory: None,
        }
    }

    pub fn with_previous_season(mut self, previous: Option<&'a Schedule>) -> Self {
        self.previous_season = previous;
        self
    }

    pub fn with_directory(mut self, directory: Option<&'a TeamDirectory>) -> Self {
        self.directory = directory;
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluation::{EvaluationResult, Violation};
    use crate::schedule::VenueSide;

    #[test]
    fn graded_result_clamps_score_and_counts_violations() {
        let violation = Violation::GameCountMismatch {
            team: "Utah".to_string(),
            expected: 9,
            actual: 8,
        };
        let result = EvaluationResult::graded(vec![violation], -0.4);
        assert!(!result.satisfied);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.violation_count(), 1);

        let result = EvaluationResult::graded(Vec::new(), 1.7);
        assert!(result.satisfied);
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn tolerated_result_holds_within_its_share() {
        let shortfall = |team: &str| Violation::HomeAwayImbalance {
            team: team.to_string(),
            home: 3,
            away: 1,
            max_difference: 1,
        };
        let result = EvaluationResult::tolerated(vec![shortfall("Utah")], 4, 0.25);
        assert!(result.satisfied);
        assert_eq!(result.score, 0.75);
        assert_eq!(result.violation_count(), 1);

        let result = EvaluationResult::tolerated(vec![shortfall("Utah"), shortfall("TCU")], 4, 0.25);
        assert!(!result.satisfied);
        assert_eq!(result.score, 0.5);

        assert!(!EvaluationResult::tolerated(vec![shortfall("Utah")], 4, 0.0).satisfied);
    }

    #[test]
    fn violations_serialize_with_kind_tag() {
        let violation = Violation::RepeatedVenue {
            team: "Kansas".to_string(),
            opponent: "Texas Tech".to_string(),
            previous_venue: VenueSide::Away,
            current_venue: VenueSide::Away,
            message: "Kansas played away at Texas Tech in both seasons".to_string(),
        };
        let json = serde_json::to_value(&violation).expect("serialize");
        assert_eq!(json["kind"], "repeated_venue");
        assert_eq!(json["previous_venue"], "away");
        assert_eq!(violation.code(), "repeated_venue");
        assert_eq!(violation.team(), Some("Kansas"));
        assert_eq!(violation.opponent(), Some("Texas Tech"));
        assert_eq!(violation.venue().as_deref(), Some("away"));
    }
}
