use std::collections::BTreeSet;

use chrono::{Datelike, Weekday};

use crate::constraints::schema::{Constraint, DAYS};
use crate::evaluation::{EvaluationResult, Violation};
use crate::schedule::Schedule;

/// Weekdays named by a constraint. Unrecognized names are skipped.
pub fn prohibited_weekdays(constraint: &Constraint) -> BTreeSet<u32> {
    constraint
        .texts(DAYS)
        .into_iter()
        .filter_map(|d| d.trim().parse::<Weekday>().ok())
        .map(|d| d.num_days_from_monday())
        .collect()
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// No conference game may fall on a prohibited weekday.
pub fn evaluate_day_of_week_prohibition(constraint: &Constraint, schedule: &Schedule) -> EvaluationResult {
    let prohibited = prohibited_weekdays(constraint);
    if prohibited.is_empty() {
        return EvaluationResult::pass().with_context("prohibited_days", 0);
    }

    let violations: Vec<Violation> = schedule
        .conference_games()
        .filter_map(|g| g.parsed_date().map(|d| (d, g)))
        .filter(|(date, _)| prohibited.contains(&date.weekday().num_days_from_monday()))
        .map(|(date, game)| Violation::ProhibitedDay {
            home_team: game.home_team.clone(),
            away_team: game.away_team.clone(),
            date: date.to_string(),
            weekday: weekday_name(date.weekday()).to_string(),
        })
        .collect();

    EvaluationResult::binary(violations).with_context("prohibited_days", prohibited.len())
}

#[cfg(test)]
mod tests {
    use crate::constraints::schema::{Constraint, ConstraintType, ParameterValue, Sport, DAYS};
    use crate::evaluation::rules::calendar::{evaluate_day_of_week_prohibition, prohibited_weekdays};
    use crate::evaluation::Violation;
    use crate::schedule::{Game, Schedule};

    fn no_sundays(days: &[&str]) -> Constraint {
        Constraint::new("fb-days", ConstraintType::DayOfWeekProhibition, Sport::Football)
            .with_parameter(DAYS, ParameterValue::texts(days))
    }

    #[test]
    fn accepts_short_and_long_weekday_names() {
        assert_eq!(prohibited_weekdays(&no_sundays(&["sunday", "Sun", "funday"])).len(), 1);
        assert_eq!(prohibited_weekdays(&no_sundays(&["mon", "Friday"])).len(), 2);
    }

    #[test]
    fn flags_conference_games_on_prohibited_days() {
        let schedule = Schedule::new(
            None,
            vec![
                // 2025-10-05 is a Sunday, 2025-10-04 a Saturday.
                Game::conference("Kansas", "Baylor", "2025-10-05"),
                Game::conference("Utah", "TCU", "2025-10-04"),
                Game::non_conference("BYU", "Wyoming", "2025-10-05"),
            ],
        );
        let result = evaluate_day_of_week_prohibition(&no_sundays(&["sunday"]), &schedule);
        assert!(!result.satisfied);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.violation_count(), 1);
        match &result.details.violations[0] {
            Violation::ProhibitedDay { home_team, weekday, .. } => {
                assert_eq!(home_team, "Kansas");
                assert_eq!(weekday, "Sunday");
            }
            other => panic!("unexpected violation {other:?}"),
        }
    }

    #[test]
    fn no_listed_days_is_satisfied() {
        let schedule = Schedule::new(None, vec![Game::conference("Kansas", "Baylor", "2025-10-05")]);
        assert!(evaluate_day_of_week_prohibition(&no_sundays(&[]), &schedule).satisfied);
    }
}
