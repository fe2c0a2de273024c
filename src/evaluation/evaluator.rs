use crate::constraints::{Constraint, ConstraintType};
use crate::evaluation::observer::{report_violations, ViolationObserver};
use crate::evaluation::rules::balance::{
    evaluate_distribution_window, evaluate_game_count, evaluate_home_away_balance,
};
use crate::evaluation::rules::calendar::evaluate_day_of_week_prohibition;
use crate::evaluation::rules::matchup::{
    evaluate_broadcast_minimum, evaluate_required_matchup, evaluate_rivalry_placement,
};
use crate::evaluation::rules::sequence::{evaluate_max_consecutive, evaluate_rest_days};
use crate::evaluation::rules::venue::{evaluate_alternating_venue, evaluate_venue_unavailability};
use crate::evaluation::{EvaluationContext, EvaluationResult};
use crate::schedule::{Schedule, VenueSide};

pub fn evaluate_constraint(
    constraint: &Constraint,
    schedule: &Schedule,
    ctx: &EvaluationContext<'_>,
) -> EvaluationResult {
    let result = match constraint.constraint_type {
        ConstraintType::AlternatingVenue => evaluate_alternating_venue(schedule, ctx.previous_season),
        ConstraintType::RestDays => evaluate_rest_days(constraint, schedule),
        ConstraintType::MaxConsecutiveAway => {
            evaluate_max_consecutive(constraint, schedule, VenueSide::Away)
        }
        ConstraintType::MaxConsecutiveHome => {
            evaluate_max_consecutive(constraint, schedule, VenueSide::Home)
        }
        ConstraintType::GameCount => evaluate_game_count(constraint, schedule),
        ConstraintType::DayOfWeekProhibition => evaluate_day_of_week_prohibition(constraint, schedule),
        ConstraintType::DistributionWindow => evaluate_distribution_window(constraint, schedule),
        ConstraintType::HomeAwayBalance => evaluate_home_away_balance(constraint, schedule),
        ConstraintType::VenueUnavailability => {
            evaluate_venue_unavailability(constraint, schedule, ctx)
        }
        ConstraintType::RequiredMatchup => evaluate_required_matchup(constraint, schedule),
        ConstraintType::BroadcastMinimum => evaluate_broadcast_minimum(constraint, schedule),
        ConstraintType::RivalryPlacement => evaluate_rivalry_placement(constraint, schedule),
    };

    let result = result
        .with_context("constraint_type", constraint.constraint_type.as_slug())
        .with_context("sport", ctx.sport.as_slug());
    match ctx.gender {
        Some(gender) => result.with_context("gender", gender.to_string()),
        None => result,
    }
}

/// Evaluates and forwards each violation to the observer.
pub fn evaluate_and_report(
    constraint: &Constraint,
    schedule: &Schedule,
    ctx: &EvaluationContext<'_>,
    observer: &dyn ViolationObserver,
) -> EvaluationResult {
    let result = evaluate_constraint(constraint, schedule, ctx);
    report_violations(ctx, constraint, &result, observer);
    result
}

#[cfg(test)]
mod tests {
    use crate::constraints::schema::{GAMES, MAX_RUN};
    use crate::constraints::{Constraint, ConstraintType, Gender, Sport};
    use crate::evaluation::evaluator::{evaluate_and_report, evaluate_constraint};
    use crate::evaluation::{EvaluationContext, NoopObserver};
    use crate::schedule::{Game, Schedule};

    fn schedule() -> Schedule {
        Schedule::new(
            Some("2025"),
            vec![
                Game::conference("Baylor", "Kansas", "2025-01-04"),
                Game::conference("Utah", "Kansas", "2025-01-08"),
                Game::conference("Kansas", "Utah", "2025-01-11"),
            ],
        )
    }

    #[test]
    fn dispatches_by_constraint_type() {
        let ctx = EvaluationContext::new(Sport::Basketball, Some(Gender::Women));
        let away = Constraint::new("away", ConstraintType::MaxConsecutiveAway, Sport::Basketball)
            .with_parameter(MAX_RUN, 1.0);
        let home = Constraint::new("home", ConstraintType::MaxConsecutiveHome, Sport::Basketball)
            .with_parameter(MAX_RUN, 1.0);
        assert!(!evaluate_constraint(&away, &schedule(), &ctx).satisfied);
        assert!(evaluate_constraint(&home, &schedule(), &ctx).satisfied);

        let result = evaluate_constraint(&away, &schedule(), &ctx);
        assert_eq!(result.details.context["constraint_type"], "max_consecutive_away");
        assert_eq!(result.details.context["sport"], "basketball");
        assert_eq!(result.details.context["gender"], "women");
    }

    #[test]
    fn alternating_venue_reads_previous_season_from_context() {
        let previous = Schedule::new(Some("2024"), vec![Game::conference("Baylor", "Kansas", "2024-01-06")]);
        let current = Schedule::new(Some("2025"), vec![Game::conference("Baylor", "Kansas", "2025-01-04")]);
        let alt = Constraint::new("alt", ConstraintType::AlternatingVenue, Sport::Basketball);

        let without = EvaluationContext::new(Sport::Basketball, None);
        assert!(evaluate_constraint(&alt, &current, &without).satisfied);

        let with = without.with_previous_season(Some(&previous));
        let result = evaluate_and_report(&alt, &current, &with, &NoopObserver);
        assert_eq!(result.violation_count(), 1);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let ctx = EvaluationContext::new(Sport::Basketball, None);
        let count = Constraint::new("gc", ConstraintType::GameCount, Sport::Basketball)
            .with_parameter(GAMES, 2.0);
        assert_eq!(
            evaluate_constraint(&count, &schedule(), &ctx),
            evaluate_constraint(&count, &schedule(), &ctx)
        );
    }
}
