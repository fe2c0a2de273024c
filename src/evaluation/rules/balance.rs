use std::collections::BTreeMap;

use crate::constraints::schema::{Constraint, GAMES, MAX_DIFFERENCE, MIN_HOME, TOLERANCE, WINDOW};
use crate::evaluation::{EvaluationResult, Violation};
use crate::schedule::{Schedule, VenueSide};

#[derive(Debug, Clone, Copy, Default)]
struct SideCounts {
    home: usize,
    away: usize,
}

/// Missing means no shortfall is tolerated.
fn tolerance(constraint: &Constraint) -> f64 {
    constraint.number(TOLERANCE).unwrap_or(0.0).clamp(0.0, 1.0)
}

fn side_counts(schedule: &Schedule) -> BTreeMap<&str, SideCounts> {
    let mut counts: BTreeMap<&str, SideCounts> = BTreeMap::new();
    for game in schedule.conference_games() {
        counts.entry(game.home_team.as_str()).or_default().home += 1;
        counts.entry(game.away_team.as_str()).or_default().away += 1;
    }
    counts
}

/// Every team plays exactly the expected number of conference games.
pub fn evaluate_game_count(constraint: &Constraint, schedule: &Schedule) -> EvaluationResult {
    let Some(expected) = constraint.number(GAMES).map(|g| g.max(0.0).trunc() as usize) else {
        return EvaluationResult::pass().with_context("reason", "incomplete_parameters");
    };

    let counts = side_counts(schedule);
    let violations: Vec<Violation> = counts
        .iter()
        .filter_map(|(team, c)| {
            let actual = c.home + c.away;
            (actual != expected).then(|| Violation::GameCountMismatch {
                team: team.to_string(),
                expected,
                actual,
            })
        })
        .collect();

    EvaluationResult::binary(violations).with_context("teams", counts.len())
}

/// Per team, home and away counts may differ by at most `max_difference`.
pub fn evaluate_home_away_balance(constraint: &Constraint, schedule: &Schedule) -> EvaluationResult {
    let max_difference = constraint
        .number(MAX_DIFFERENCE)
        .unwrap_or(1.0)
        .max(0.0)
        .trunc() as usize;

    let counts = side_counts(schedule);
    if counts.is_empty() {
        return EvaluationResult::pass().with_context("teams", 0);
    }
    let violations: Vec<Violation> = counts
        .iter()
        .filter(|(_, c)| c.home.abs_diff(c.away) > max_difference)
        .map(|(team, c)| Violation::HomeAwayImbalance {
            team: team.to_string(),
            home: c.home,
            away: c.away,
            max_difference,
        })
        .collect();

    EvaluationResult::tolerated(violations, counts.len(), tolerance(constraint))
        .with_context("teams", counts.len())
}

/// Sliding windows of `window` consecutive games must each hold at least
/// `min_home` home games. Score is the share of windows that comply.
pub fn evaluate_distribution_window(constraint: &Constraint, schedule: &Schedule) -> EvaluationResult {
    let window = constraint.number(WINDOW).unwrap_or(4.0).max(1.0).trunc() as usize;
    let required = constraint.number(MIN_HOME).unwrap_or(1.0).max(0.0).trunc() as usize;

    let mut windows = 0usize;
    let mut violations = Vec::new();
    for team in schedule.conference_teams() {
        let games = schedule.team_games_by_date(team, true);
        if games.len() < window {
            continue;
        }
        for slice in games.windows(window) {
            windows += 1;
            let home_games = slice
                .iter()
                .filter(|(_, g)| g.side_for(team) == Some(VenueSide::Home))
                .count();
            if home_games < required {
                violations.push(Violation::WindowShortfall {
                    team: team.to_string(),
                    window_start: slice[0].0.to_string(),
                    home_games,
                    required,
                });
            }
        }
    }

    if windows == 0 {
        return EvaluationResult::pass().with_context("windows", 0);
    }
    EvaluationResult::tolerated(violations, windows, tolerance(constraint))
        .with_context("windows", windows)
}
