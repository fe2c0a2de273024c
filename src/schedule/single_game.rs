use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::schedule::{Schedule, VenueSide};

/// Opponent name to the side the team played on, for opponents met exactly
/// once in the season's conference slate.
pub type SingleGameOpponentMap = BTreeMap<String, VenueSide>;

pub fn single_game_opponents(schedule: &Schedule, team: &str) -> SingleGameOpponentMap {
    let mut single = SingleGameOpponentMap::new();
    let mut repeated: BTreeSet<&str> = BTreeSet::new();

    for game in schedule.conference_games() {
        let (Some(side), Some(opponent)) = (game.side_for(team), game.opponent_of(team)) else {
            continue;
        };
        if repeated.contains(opponent) {
            continue;
        }
        // A second meeting removes the opponent for good.
        if single.remove(opponent).is_some() {
            repeated.insert(opponent);
            continue;
        }
        single.insert(opponent.to_string(), side);
    }

    single
}

/// Single-game maps for every team in the schedule's conference games.
pub fn single_game_maps(schedule: &Schedule) -> BTreeMap<String, SingleGameOpponentMap> {
    let teams: Vec<&str> = schedule.conference_teams().into_iter().collect();
    single_game_maps_for(schedule, &teams)
}

pub fn single_game_maps_for(
    schedule: &Schedule,
    teams: &[&str],
) -> BTreeMap<String, SingleGameOpponentMap> {
    teams
        .par_iter()
        .map(|team| (team.to_string(), single_game_opponents(schedule, team)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
