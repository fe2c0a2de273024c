use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::constraints::schema::{Constraint, DATES, TEAM};
use crate::evaluation::{EvaluationContext, EvaluationResult, Violation};
use crate::schedule::single_game::single_game_maps_for;
use crate::schedule::{Schedule, VenueSide};

/// Score lost per repeated single-game venue. Shared by every sport.
pub const REPEATED_VENUE_PENALTY: f64 = 0.2;

/// Single-game opponents must flip home/away between consecutive seasons.
///
/// Without a previous season the rule is satisfied by default. Each repeated
/// pair is counted once, reported from the side that travelled both times.
pub fn evaluate_alternating_venue(
    current: &Schedule,
    previous: Option<&Schedule>,
) -> EvaluationResult {
    let Some(previous) = previous else {
        return EvaluationResult::pass().with_context("reason", "no_previous_season");
    };

    let teams: Vec<&str> = current.conference_teams().into_iter().collect();
    let current_maps = single_game_maps_for(current, &teams);
    let previous_maps = single_game_maps_for(previous, &teams);

    let mut violations = Vec::new();
    let mut pairs_compared = 0usize;
    for team in &teams {
        let (Some(now), Some(before)) = (current_maps.get(*team), previous_maps.get(*team)) else {
            continue;
        };
        for (opponent, current_venue) in now {
            let Some(previous_venue) = before.get(opponent) else {
                continue;
            };
            if *current_venue == VenueSide::Away {
                pairs_compared += 1;
            }
            if previous_venue != current_venue || *current_venue != VenueSide::Away {
                continue;
            }
            violations.push(Violation::RepeatedVenue {
                team: team.to_string(),
                opponent: opponent.clone(),
                previous_venue: *previous_venue,
                current_venue: *current_venue,
                message: format!(
                    "{team} played at {opponent} in both seasons; venue should alternate"
                ),
            });
        }
    }

    let score = (1.0 - violations.len() as f64 * REPEATED_VENUE_PENALTY).max(0.0);
    EvaluationResult::graded(violations, score)
        .with_context("teams_checked", teams.len())
        .with_context("pairs_compared", pairs_compared)
}

/// The listed team hosts nothing on its blackout dates. Blackouts come from
/// the constraint and from the team directory, when one is supplied.
pub fn evaluate_venue_unavailability(
    constraint: &Constraint,
    schedule: &Schedule,
    ctx: &EvaluationContext<'_>,
) -> EvaluationResult {
    let Some(team) = constraint.text(TEAM) else {
        return EvaluationResult::pass().with_context("reason", "incomplete_parameters");
    };

    let mut blackout: BTreeSet<NaiveDate> = constraint.dates(DATES).into_iter().collect();
    if let Some(directory) = ctx.directory {
        blackout.extend(directory.unavailable_dates(team));
    }
    if blackout.is_empty() {
        return EvaluationResult::pass().with_context("blackout_dates", 0);
    }

    let violations: Vec<Violation> = schedule
        .games
        .iter()
        .filter(|g| g.is_well_formed() && g.home_team == team)
        .filter_map(|g| g.parsed_date().map(|d| (d, g)))
        .filter(|(date, _)| blackout.contains(date))
        .map(|(date, game)| Violation::VenueUnavailable {
            team: team.to_string(),
            venue: ctx
                .directory
                .and_then(|d| d.venue_for(game))
                .or_else(|| game.venue.clone()),
            date: date.to_string(),
        })
        .collect();

    EvaluationResult::binary(violations).with_context("blackout_dates", blackout.len())
}
