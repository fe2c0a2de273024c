use chrono::NaiveDate;

use crate::constraints::schema::{
    Constraint, AWAY_TEAM, BROADCASTER, DATE, HOME_TEAM, MIN_GAMES, TEAM_A, TEAM_B, WINDOW_END,
    WINDOW_START,
};
use crate::evaluation::{EvaluationResult, Violation};
use crate::schedule::{parse_game_date, Schedule};

/// Score for a rivalry that was played, but outside its window.
pub const RIVALRY_OUTSIDE_WINDOW_SCORE: f64 = 0.5;

/// The named home team hosts the named away team, on the given date if any.
pub fn evaluate_required_matchup(constraint: &Constraint, schedule: &Schedule) -> EvaluationResult {
    let (Some(home), Some(away)) = (constraint.text(HOME_TEAM), constraint.text(AWAY_TEAM)) else {
        return EvaluationResult::pass().with_context("reason", "incomplete_parameters");
    };
    let raw_date = constraint.text(DATE);
    let date = raw_date.and_then(parse_game_date);

    let found = schedule
        .games
        .iter()
        .filter(|g| g.is_well_formed() && g.home_team == home && g.away_team == away)
        .any(|g| date.is_none() || g.parsed_date() == date);

    let violations = if found {
        Vec::new()
    } else {
        vec![Violation::MissingMatchup {
            home_team: home.to_string(),
            away_team: away.to_string(),
            date: date.map(|d| d.to_string()),
        }]
    };
    EvaluationResult::binary(violations)
}

/// Conference games carried by a broadcaster, or by any broadcaster when
/// none is named. Partial credit below the minimum.
pub fn evaluate_broadcast_minimum(constraint: &Constraint, schedule: &Schedule) -> EvaluationResult {
    let required = constraint.number(MIN_GAMES).unwrap_or(0.0).max(0.0).trunc() as usize;
    let wanted = constraint.text(BROADCASTER);

    let actual = schedule
        .conference_games()
        .filter_map(|g| g.broadcaster.as_deref().map(str::trim))
        .filter(|b| !b.is_empty())
        .filter(|b| wanted.map_or(true, |w| b.eq_ignore_ascii_case(w)))
        .count();

    if required == 0 || actual >= required {
        return EvaluationResult::pass().with_context("broadcast_games", actual);
    }
    let violation = Violation::BroadcastShortfall {
        broadcaster: wanted.map(str::to_string),
        actual,
        required,
    };
    EvaluationResult::graded(vec![violation], actual as f64 / required as f64)
        .with_context("broadcast_games", actual)
}

/// A rivalry game belongs inside its window. Bounds are inclusive and an
/// absent bound leaves that side open; undated games sit outside any window.
pub fn evaluate_rivalry_placement(constraint: &Constraint, schedule: &Schedule) -> EvaluationResult {
    let (Some(team_a), Some(team_b)) = (constraint.text(TEAM_A), constraint.text(TEAM_B)) else {
        return EvaluationResult::pass().with_context("reason", "incomplete_parameters");
    };
    let start = constraint.text(WINDOW_START).and_then(parse_game_date);
    let end = constraint.text(WINDOW_END).and_then(parse_game_date);
    let in_window = |date: Option<NaiveDate>| match date {
        Some(d) => start.map_or(true, |s| d >= s) && end.map_or(true, |e| d <= e),
        None => start.is_none() && end.is_none(),
    };

    let games: Vec<_> = schedule
        .games
        .iter()
        .filter(|g| g.is_well_formed() && g.is_between(team_a, team_b))
        .collect();

    if games.iter().any(|g| in_window(g.parsed_date())) {
        return EvaluationResult::pass().with_context("games", games.len());
    }

    let Some(first) = games.first() else {
        let violation = Violation::RivalryMisplaced {
            team_a: team_a.to_string(),
            team_b: team_b.to_string(),
            date: None,
        };
        return EvaluationResult::graded(vec![violation], 0.0).with_context("games", 0);
    };
    let violation = Violation::RivalryMisplaced {
        team_a: team_a.to_string(),
        team_b: team_b.to_string(),
        date: Some(
            first
                .parsed_date()
                .map(|d| d.to_string())
                .unwrap_or_else(|| first.date.clone()),
        ),
    };
    EvaluationResult::graded(vec![violation], RIVALRY_OUTSIDE_WINDOW_SCORE)
        .with_context("games", games.len())
}

#[cfg(test)]
mod tests {
    use crate::constraints::schema::{
        Constraint, ConstraintType, Sport, AWAY_TEAM, BROADCASTER, DATE, HOME_TEAM, MIN_GAMES,
        TEAM_A, TEAM_B, WINDOW_END, WINDOW_START,
    };
    use crate::evaluation::rules::matchup::{
        evaluate_broadcast_minimum, evaluate_required_matchup, evaluate_rivalry_placement,
    };
    use crate::schedule::{Game, Schedule};

    fn sunflower_showdown(date: &str) -> Schedule {
        Schedule::new(
            None,
            vec![
                Game::conference("Kansas State", "Kansas", date).with_broadcaster("ESPN"),
                Game::conference("Utah", "BYU", "2025-11-15").with_broadcaster("fox"),
                Game::conference("TCU", "Baylor", "2025-11-08"),
            ],
        )
    }

    #[test]
    fn required_matchup_checks_host_and_date() {
        let schedule = sunflower_showdown("2025-11-29");
        let matchup = Constraint::new("m1", ConstraintType::RequiredMatchup, Sport::Football)
            .with_parameter(HOME_TEAM, "Kansas State")
            .with_parameter(AWAY_TEAM, "Kansas");
        assert!(evaluate_required_matchup(&matchup, &schedule).satisfied);

        let dated = matchup.clone().with_parameter(DATE, "2025-11-22");
        let result = evaluate_required_matchup(&dated, &schedule);
        assert!(!result.satisfied);
        assert_eq!(result.score, 0.0);

        let reversed = Constraint::new("m2", ConstraintType::RequiredMatchup, Sport::Football)
            .with_parameter(HOME_TEAM, "Kansas")
            .with_parameter(AWAY_TEAM, "Kansas State");
        assert!(!evaluate_required_matchup(&reversed, &schedule).satisfied);
    }

    #[test]
    fn broadcast_minimum_gives_partial_credit() {
        let schedule = sunflower_showdown("2025-11-29");
        let any = Constraint::new("bc", ConstraintType::BroadcastMinimum, Sport::Football)
            .with_parameter(MIN_GAMES, 4.0);
        let result = evaluate_broadcast_minimum(&any, &schedule);
        assert!(!result.satisfied);
        assert!((result.score - 0.5).abs() < 1e-12);

        let fox = any
            .clone()
            .with_parameter(MIN_GAMES, 1.0)
            .with_parameter(BROADCASTER, "FOX");
        assert!(evaluate_broadcast_minimum(&fox, &schedule).satisfied);

        let zero = any.with_parameter(MIN_GAMES, 0.0);
        assert_eq!(evaluate_broadcast_minimum(&zero, &Schedule::default()).score, 1.0);
    }

    #[test]
    fn rivalry_scores_inside_outside_and_missing() {
        let rivalry = Constraint::new("rv", ConstraintType::RivalryPlacement, Sport::Football)
            .with_parameter(TEAM_A, "Kansas")
            .with_parameter(TEAM_B, "Kansas State")
            .with_parameter(WINDOW_START, "2025-11-22")
            .with_parameter(WINDOW_END, "2025-11-30");

        assert_eq!(evaluate_rivalry_placement(&rivalry, &sunflower_showdown("2025-11-29")).score, 1.0);

        let early = evaluate_rivalry_placement(&rivalry, &sunflower_showdown("2025-10-04"));
        assert!(!early.satisfied);
        assert_eq!(early.score, 0.5);

        let undated = evaluate_rivalry_placement(&rivalry, &sunflower_showdown("TBD"));
        assert_eq!(undated.score, 0.5);

        let missing = evaluate_rivalry_placement(&rivalry, &Schedule::default());
        assert_eq!(missing.score, 0.0);
        assert_eq!(missing.violation_count(), 1);
    }
}
