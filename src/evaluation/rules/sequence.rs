use crate::constraints::schema::{Constraint, MAX_RUN, MIN_DAYS};
use crate::evaluation::{EvaluationResult, Violation};
use crate::schedule::{Schedule, VenueSide};

pub const AWAY_RUN_PENALTY: f64 = 0.5;
pub const HOME_RUN_PENALTY: f64 = 0.3;

/// Every gap between a team's dated games must leave `min_days` full days.
/// Non-conference games count toward rest.
pub fn evaluate_rest_days(constraint: &Constraint, schedule: &Schedule) -> EvaluationResult {
    let required = constraint.number(MIN_DAYS).unwrap_or(1.0).max(0.0).trunc() as i64;

    let mut intervals = 0usize;
    let mut violations = Vec::new();
    for team in schedule.conference_teams() {
        let games = schedule.team_games_by_date(team, false);
        for pair in games.windows(2) {
            let (first, second) = (pair[0].0, pair[1].0);
            intervals += 1;
            let rest_days = ((second - first).num_days() - 1).max(0);
            if rest_days < required {
                violations.push(Violation::InsufficientRest {
                    team: team.to_string(),
                    first_date: first.to_string(),
                    second_date: second.to_string(),
                    rest_days,
                    required,
                });
            }
        }
    }

    if intervals == 0 {
        return EvaluationResult::pass().with_context("intervals", 0);
    }
    let score = 1.0 - violations.len() as f64 / intervals as f64;
    EvaluationResult::graded(violations, score).with_context("intervals", intervals)
}

/// Longest allowed run of consecutive games on one side, in date order.
/// Each game beyond the limit costs a fixed share of the score.
pub fn evaluate_max_consecutive(
    constraint: &Constraint,
    schedule: &Schedule,
    side: VenueSide,
) -> EvaluationResult {
    let max_allowed = constraint.number(MAX_RUN).unwrap_or(2.0).max(1.0).trunc() as usize;
    let penalty = match side {
        VenueSide::Away => AWAY_RUN_PENALTY,
        VenueSide::Home => HOME_RUN_PENALTY,
    };

    let mut violations = Vec::new();
    let mut excess = 0usize;
    let mut longest = 0usize;
    for team in schedule.conference_teams() {
        let games = schedule.team_games_by_date(team, true);
        let mut run = 0usize;
        let mut run_start = None;
        // Trailing sentinel closes the final run.
        let sides = games
            .iter()
            .map(|(date, game)| (Some(*date), game.side_for(team)))
            .chain(std::iter::once((None, None)));
        for (date, game_side) in sides {
            if game_side == Some(side) {
                if run == 0 {
                    run_start = date;
                }
                run += 1;
                continue;
            }
            longest = longest.max(run);
            if run > max_allowed {
                excess += run - max_allowed;
                violations.push(Violation::ConsecutiveRun {
                    team: team.to_string(),
                    side,
                    run_length: run,
                    max_allowed,
                    start_date: run_start.map(|d| d.to_string()).unwrap_or_default(),
                });
            }
            run = 0;
            run_start = None;
        }
    }

    let score = 1.0 - excess as f64 * penalty;
    EvaluationResult::graded(violations, score)
        .with_context("longest_run", longest)
        .with_context("excess_games", excess)
}
