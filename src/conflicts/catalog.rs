//! Fixed table of known constraint tensions. Confidences are constants so
//! that identical constraint sets always produce identical proposals.

use chrono::{Datelike, NaiveDate};

use crate::conflicts::{ActionChange, ConflictType, ResolutionAction, ResolutionType};
use crate::constraints::schema::{
    clamp_weight, DATE, DATES, GAMES, HOME_TEAM, MAX_DIFFERENCE, MAX_RUN, MIN_DAYS, MIN_GAMES,
    TEAM, TEAM_A, TEAM_B, WINDOW, WINDOW_END, WINDOW_START,
};
use crate::constraints::{Constraint, ConstraintType, ParameterValue, Severity};
use crate::evaluation::rules::calendar::{prohibited_weekdays, weekday_name};

pub const REDUCE_REST_CONFIDENCE: f64 = 0.85;
pub const REPRIORITIZE_CONFIDENCE: f64 = 0.75;
pub const RAISE_RUN_LIMIT_CONFIDENCE: f64 = 0.70;
pub const MOVE_MATCHUP_CONFIDENCE: f64 = 0.60;
pub const ALTERNATE_VENUE_CONFIDENCE: f64 = 0.50;
pub const MOVE_OFF_WEEKDAY_CONFIDENCE: f64 = 0.65;
pub const DROP_PROHIBITION_CONFIDENCE: f64 = 0.40;
pub const PRIORITIZE_ALTERNATION_CONFIDENCE: f64 = 0.80;
pub const RELAX_BALANCE_CONFIDENCE: f64 = 0.70;
pub const WIDEN_WINDOW_CONFIDENCE: f64 = 0.80;
pub const MOVE_RIVALRY_CONFIDENCE: f64 = 0.60;
pub const REMOVE_DUPLICATE_CONFIDENCE: f64 = 0.90;
pub const REMOVE_DUPLICATE_GAME_COUNT_CONFIDENCE: f64 = 0.70;

/// A resolution before the detector gives it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposedResolution {
    pub resolution_type: ResolutionType,
    pub description: String,
    pub confidence: f64,
    pub impact: String,
    pub actions: Vec<ResolutionAction>,
}

impl ProposedResolution {
    fn new(resolution_type: ResolutionType, confidence: f64, description: String, impact: &str) -> Self {
        Self {
            resolution_type,
            description,
            confidence,
            impact: impact.to_string(),
            actions: Vec::new(),
        }
    }

    fn action(mut self, target: &Constraint, change: ActionChange, description: String) -> Self {
        self.actions.push(ResolutionAction::new(&target.id, change, description));
        self
    }

    /// True when applying every action would leave both records as they are.
    fn is_noop(&self, a: &Constraint, b: &Constraint) -> bool {
        self.actions.iter().all(|action| {
            let target = if action.target_id == a.id { a } else { b };
            leaves_unchanged(&action.change, target)
        })
    }
}

fn leaves_unchanged(change: &ActionChange, target: &Constraint) -> bool {
    match change {
        ActionChange::SetParameter { key, value } => target.parameters.get(key) == Some(value),
        ActionChange::ClearParameter { key } => !target.parameters.contains_key(key),
        ActionChange::SetWeight { weight } => target.weight == clamp_weight(*weight),
        ActionChange::SetHardness { hardness } => target.hardness == *hardness,
        ActionChange::Remove | ActionChange::FollowUp { .. } => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tension {
    pub severity: Severity,
    pub conflict_type: ConflictType,
    pub auto_resolvable: bool,
    pub description: String,
    pub impact: String,
    pub resolutions: Vec<ProposedResolution>,
}

/// Looks a pair up in the table. Only constraints of the same sport and
/// gender can be in tension; argument order does not matter. Proposals that
/// would change neither record are dropped.
pub fn lookup(a: &Constraint, b: &Constraint) -> Option<Tension> {
    if !a.same_scope(b) || a.id == b.id {
        return None;
    }
    let mut tension = if a.constraint_type == b.constraint_type {
        duplicate_rule(a, b)
    } else {
        directed(a, b).or_else(|| directed(b, a))
    }?;
    tension.resolutions.retain(|r| !r.is_noop(a, b));
    Some(tension)
}

fn directed(a: &Constraint, b: &Constraint) -> Option<Tension> {
    use ConstraintType::*;
    match (a.constraint_type, b.constraint_type) {
        (RestDays, MaxConsecutiveAway | MaxConsecutiveHome) => rest_vs_run(a, b),
        (VenueUnavailability, RequiredMatchup) => blackout_vs_matchup(a, b),
        (DayOfWeekProhibition, RequiredMatchup) => weekday_vs_matchup(a, b),
        (HomeAwayBalance, AlternatingVenue) => Some(balance_vs_alternation(a, b)),
        (MaxConsecutiveAway, DistributionWindow) => Some(road_run_vs_window(a, b)),
        (RivalryPlacement, VenueUnavailability) => rivalry_vs_blackout(a, b),
        _ => None,
    }
}

fn whole(constraint: &Constraint, key: &str, default: f64) -> f64 {
    constraint.number(key).unwrap_or(default).trunc()
}

/// Weight that ranks `lower` just under `upper`, never raising it.
fn weight_below(lower: &Constraint, upper: &Constraint) -> f64 {
    lower.weight.min(upper.weight - 1.0).max(0.0)
}

/// No tension when no rest is required.
fn rest_vs_run(rest: &Constraint, run: &Constraint) -> Option<Tension> {
    let min_days = whole(rest, MIN_DAYS, 1.0);
    if min_days < 1.0 {
        return None;
    }
    let max_run = whole(run, MAX_RUN, 2.0);
    let reduced = min_days - 1.0;
    Some(Tension {
        severity: Severity::Medium,
        conflict_type: ConflictType::ParameterTension,
        auto_resolvable: true,
        description: format!(
            "{} requires {min_days} rest day(s) while {} caps runs at {max_run} games",
            rest.id, run.id
        ),
        impact: "Long rest gaps stretch the calendar and force longer home or road stretches".to_string(),
        resolutions: vec![
            ProposedResolution::new(
                ResolutionType::Modify,
                REDUCE_REST_CONFIDENCE,
                format!("Reduce min_days on {} from {min_days} to {reduced}", rest.id),
                "Shorter turnarounds between games",
            )
            .action(
                rest,
                ActionChange::SetParameter {
                    key: MIN_DAYS.to_string(),
                    value: ParameterValue::Number(reduced),
                },
                format!("set {MIN_DAYS} = {reduced}"),
            ),
            ProposedResolution::new(
                ResolutionType::Priority,
                REPRIORITIZE_CONFIDENCE,
                format!("Prioritize {} above {}", run.id, rest.id),
                "Rest violations become cheaper than long runs",
            )
            .action(
                rest,
                ActionChange::SetWeight {
                    weight: weight_below(rest, run),
                },
                format!("lower weight below {}", run.id),
            ),
            ProposedResolution::new(
                ResolutionType::Modify,
                RAISE_RUN_LIMIT_CONFIDENCE,
                format!("Raise the run limit on {} from {max_run} to {}", run.id, max_run + 1.0),
                "One more consecutive game allowed on the same side",
            )
            .action(
                run,
                ActionChange::SetParameter {
                    key: MAX_RUN.to_string(),
                    value: ParameterValue::Number(max_run + 1.0),
                },
                format!("set {MAX_RUN} = {}", max_run + 1.0),
            ),
        ],
    })
}

fn blackout_vs_matchup(blackout: &Constraint, matchup: &Constraint) -> Option<Tension> {
    let team = blackout.text(TEAM)?;
    if matchup.text(HOME_TEAM)? != team {
        return None;
    }
    let date = matchup.dates(DATE).into_iter().next()?;
    if !blackout.dates(DATES).contains(&date) {
        return None;
    }
    Some(Tension {
        severity: Severity::High,
        conflict_type: ConflictType::DateCollision,
        auto_resolvable: false,
        description: format!(
            "{} pins a {team} home game on {date}, which {} blocks",
            matchup.id, blackout.id
        ),
        impact: "The required game cannot be hosted as declared".to_string(),
        resolutions: vec![
            ProposedResolution::new(
                ResolutionType::Schedule,
                MOVE_MATCHUP_CONFIDENCE,
                format!("Move {} off {date}", matchup.id),
                "Needs a new date search",
            )
            .action(
                matchup,
                ActionChange::ClearParameter {
                    key: DATE.to_string(),
                },
                format!("unpin {date}"),
            ),
            ProposedResolution::new(
                ResolutionType::Alternative,
                ALTERNATE_VENUE_CONFIDENCE,
                format!("Host {} at an alternate venue on {date}", matchup.id),
                "Neutral-site or secondary venue booking",
            )
            .action(
                blackout,
                ActionChange::FollowUp {
                    note: format!("book an alternate venue for {team} on {date}"),
                },
                "venue search".to_string(),
            ),
        ],
    })
}

fn weekday_vs_matchup(prohibition: &Constraint, matchup: &Constraint) -> Option<Tension> {
    let date: NaiveDate = matchup.dates(DATE).into_iter().next()?;
    let weekday = date.weekday();
    if !prohibited_weekdays(prohibition).contains(&weekday.num_days_from_monday()) {
        return None;
    }
    let day = weekday_name(weekday);
    Some(Tension {
        severity: Severity::Critical,
        conflict_type: ConflictType::WeekdayCollision,
        auto_resolvable: false,
        description: format!(
            "{} is pinned to {date}, a {day}, which {} prohibits",
            matchup.id, prohibition.id
        ),
        impact: "Both hard rules cannot hold together".to_string(),
        resolutions: vec![
            ProposedResolution::new(
                ResolutionType::Schedule,
                MOVE_OFF_WEEKDAY_CONFIDENCE,
                format!("Move {} off {day}", matchup.id),
                "Needs a new date search",
            )
            .action(
                matchup,
                ActionChange::ClearParameter {
                    key: DATE.to_string(),
                },
                format!("unpin {date}"),
            ),
            ProposedResolution::new(
                ResolutionType::Remove,
                DROP_PROHIBITION_CONFIDENCE,
                format!("Drop {}", prohibition.id),
                "Games become allowed on every prohibited day",
            )
            .action(prohibition, ActionChange::Remove, "remove constraint".to_string()),
        ],
    })
}

fn balance_vs_alternation(balance: &Constraint, alternation: &Constraint) -> Tension {
    let max_difference = whole(balance, MAX_DIFFERENCE, 1.0);
    Tension {
        severity: Severity::Low,
        conflict_type: ConflictType::PriorityTension,
        auto_resolvable: true,
        description: format!(
            "{} fixes venues for single-game opponents, limiting how {} can balance home and away",
            alternation.id, balance.id
        ),
        impact: "Odd opponent counts can leave a team one game off balance".to_string(),
        resolutions: vec![
            ProposedResolution::new(
                ResolutionType::Priority,
                PRIORITIZE_ALTERNATION_CONFIDENCE,
                format!("Prioritize {} above {}", alternation.id, balance.id),
                "Balance gives way when alternation decides the venue",
            )
            .action(
                balance,
                ActionChange::SetWeight {
                    weight: weight_below(balance, alternation),
                },
                format!("lower weight below {}", alternation.id),
            ),
            ProposedResolution::new(
                ResolutionType::Modify,
                RELAX_BALANCE_CONFIDENCE,
                format!(
                    "Relax max_difference on {} from {max_difference} to {}",
                    balance.id,
                    max_difference + 1.0
                ),
                "One more game of home/away imbalance tolerated",
            )
            .action(
                balance,
                ActionChange::SetParameter {
                    key: MAX_DIFFERENCE.to_string(),
                    value: ParameterValue::Number(max_difference + 1.0),
                },
                format!("set {MAX_DIFFERENCE} = {}", max_difference + 1.0),
            ),
        ],
    }
}

fn road_run_vs_window(run: &Constraint, window: &Constraint) -> Tension {
    let size = whole(window, WINDOW, 4.0);
    Tension {
        severity: Severity::Low,
        conflict_type: ConflictType::ParameterTension,
        auto_resolvable: true,
        description: format!(
            "{} allows road runs that can empty a {size}-game window required by {}",
            run.id, window.id
        ),
        impact: "Road-heavy stretches fail the distribution check".to_string(),
        resolutions: vec![ProposedResolution::new(
            ResolutionType::Modify,
            WIDEN_WINDOW_CONFIDENCE,
            format!("Widen the window on {} from {size} to {}", window.id, size + 1.0),
            "Home games may be spread more thinly",
        )
        .action(
            window,
            ActionChange::SetParameter {
                key: WINDOW.to_string(),
                value: ParameterValue::Number(size + 1.0),
            },
            format!("set {WINDOW} = {}", size + 1.0),
        )],
    }
}

fn rivalry_vs_blackout(rivalry: &Constraint, blackout: &Constraint) -> Option<Tension> {
    let team = blackout.text(TEAM)?;
    if rivalry.text(TEAM_A) != Some(team) && rivalry.text(TEAM_B) != Some(team) {
        return None;
    }
    let start = rivalry.dates(WINDOW_START).into_iter().next();
    let end = rivalry.dates(WINDOW_END).into_iter().next();
    if start.is_none() && end.is_none() {
        return None;
    }
    let blocked = blackout.dates(DATES).into_iter().find(|d| {
        start.map_or(true, |s| *d >= s) && end.map_or(true, |e| *d <= e)
    })?;
    Some(Tension {
        severity: Severity::High,
        conflict_type: ConflictType::DateCollision,
        auto_resolvable: false,
        description: format!(
            "{team} is unavailable on {blocked}, inside the window of {}",
            rivalry.id
        ),
        impact: "The rivalry game may have to leave its traditional window".to_string(),
        resolutions: vec![ProposedResolution::new(
            ResolutionType::Schedule,
            MOVE_RIVALRY_CONFIDENCE,
            format!("Move the {} game to an open date in its window", rivalry.id),
            "Needs a new date search",
        )
        .action(
            rivalry,
            ActionChange::FollowUp {
                note: format!("avoid {blocked} when placing the rivalry game"),
            },
            "date search".to_string(),
        )],
    })
}

fn threshold_key(ty: ConstraintType) -> Option<&'static str> {
    match ty {
        ConstraintType::RestDays => Some(MIN_DAYS),
        ConstraintType::MaxConsecutiveAway | ConstraintType::MaxConsecutiveHome => Some(MAX_RUN),
        ConstraintType::GameCount => Some(GAMES),
        ConstraintType::BroadcastMinimum => Some(MIN_GAMES),
        _ => None,
    }
}

fn duplicate_rule(a: &Constraint, b: &Constraint) -> Option<Tension> {
    let key = threshold_key(a.constraint_type)?;
    let (va, vb) = (a.number(key)?, b.number(key)?);
    if va == vb {
        return None;
    }
    // Ties drop the later declaration.
    let (keep, drop) = if b.weight > a.weight { (b, a) } else { (a, b) };
    let game_count = a.constraint_type == ConstraintType::GameCount;
    let (severity, confidence) = if game_count {
        (Severity::Critical, REMOVE_DUPLICATE_GAME_COUNT_CONFIDENCE)
    } else {
        (Severity::Medium, REMOVE_DUPLICATE_CONFIDENCE)
    };
    Some(Tension {
        severity,
        conflict_type: ConflictType::DuplicateRule,
        auto_resolvable: !game_count,
        description: format!(
            "{} and {} both set {key} ({va} vs {vb})",
            a.id, b.id
        ),
        impact: "Only the stricter threshold can be met".to_string(),
        resolutions: vec![ProposedResolution::new(
            ResolutionType::Remove,
            confidence,
            format!("Remove {} and keep {}", drop.id, keep.id),
            "The lower-weight duplicate stops being scored",
        )
        .action(drop, ActionChange::Remove, "remove constraint".to_string())],
    })
}

#[cfg(test)]
mod tests {
    use crate::conflicts::catalog::lookup;
    use crate::conflicts::{ActionChange, ConflictType, ResolutionType};
    use crate::constraints::schema::{
        AWAY_TEAM, DATE, DATES, DAYS, GAMES, HOME_TEAM, MAX_DIFFERENCE, MAX_RUN, MIN_DAYS, TEAM,
        TEAM_A, TEAM_B, WINDOW_END, WINDOW_START,
    };
    use crate::constraints::{Constraint, ConstraintType, Gender, ParameterValue, Severity, Sport};

    fn rest() -> Constraint {
        Constraint::new("fb-rest", ConstraintType::RestDays, Sport::Football)
            .with_weight(85.0)
            .with_parameter(MIN_DAYS, 6.0)
    }

    fn road() -> Constraint {
        Constraint::new("fb-away", ConstraintType::MaxConsecutiveAway, Sport::Football)
            .with_weight(60.0)
            .with_parameter(MAX_RUN, 2.0)
    }

    fn matchup(date: &str) -> Constraint {
        Constraint::new("fb-matchup-1", ConstraintType::RequiredMatchup, Sport::Football)
            .with_parameter(HOME_TEAM, "Kansas")
            .with_parameter(AWAY_TEAM, "Kansas State")
            .with_parameter(DATE, date)
    }

    fn blackout() -> Constraint {
        Constraint::new("fb-blackout-kansas", ConstraintType::VenueUnavailability, Sport::Football)
            .with_parameter(TEAM, "Kansas")
            .with_parameter(DATES, ParameterValue::texts(&["2025-11-29"]))
    }

    #[test]
    fn rest_and_run_limit_is_order_independent() {
        let forward = lookup(&rest(), &road()).expect("tension");
        let backward = lookup(&road(), &rest()).expect("tension");
        assert_eq!(forward, backward);
        assert_eq!(forward.severity, Severity::Medium);
        assert!(forward.auto_resolvable);
        let confidences: Vec<f64> = forward.resolutions.iter().map(|r| r.confidence).collect();
        assert_eq!(confidences, vec![0.85, 0.75, 0.70]);
        assert_eq!(
            forward.resolutions[0].actions[0].change,
            ActionChange::SetParameter {
                key: MIN_DAYS.to_string(),
                value: ParameterValue::Number(5.0),
            }
        );
        assert_eq!(
            forward.resolutions[1].actions[0].change,
            ActionChange::SetWeight { weight: 59.0 }
        );
    }

    #[test]
    fn zero_rest_requirement_is_not_a_tension() {
        let no_rest = rest().with_parameter(MIN_DAYS, 0.0);
        assert!(lookup(&no_rest, &road()).is_none());
        let one_day = rest().with_parameter(MIN_DAYS, 1.0);
        let tension = lookup(&one_day, &road()).expect("tension");
        assert_eq!(
            tension.resolutions[0].actions[0].change,
            ActionChange::SetParameter {
                key: MIN_DAYS.to_string(),
                value: ParameterValue::Number(0.0),
            }
        );
    }

    #[test]
    fn priority_already_in_place_is_not_proposed() {
        let balance = Constraint::new("bal", ConstraintType::HomeAwayBalance, Sport::Soccer)
            .with_weight(80.0)
            .with_parameter(MAX_DIFFERENCE, 1.0);
        let alternation = Constraint::new("alt", ConstraintType::AlternatingVenue, Sport::Soccer)
            .with_weight(90.0);
        let tension = lookup(&balance, &alternation).expect("tension");
        assert_eq!(tension.resolutions.len(), 1);
        assert_eq!(tension.resolutions[0].resolution_type, ResolutionType::Modify);

        let heavier = balance.with_weight(95.0);
        let tension = lookup(&heavier, &alternation).expect("tension");
        assert_eq!(tension.resolutions[0].resolution_type, ResolutionType::Priority);
        assert_eq!(
            tension.resolutions[0].actions[0].change,
            ActionChange::SetWeight { weight: 89.0 }
        );
    }

    #[test]
    fn different_scope_never_conflicts() {
        let women = road().with_gender(Some(Gender::Women));
        assert!(lookup(&rest(), &women).is_none());
        let hoops = Constraint::new("bb-away", ConstraintType::MaxConsecutiveAway, Sport::Basketball);
        assert!(lookup(&rest(), &hoops).is_none());
    }

    #[test]
    fn blackout_and_matchup_need_intersecting_dates() {
        let hit = lookup(&blackout(), &matchup("2025-11-29")).expect("tension");
        assert_eq!(hit.severity, Severity::High);
        assert_eq!(hit.conflict_type, ConflictType::DateCollision);
        assert!(!hit.auto_resolvable);
        assert_eq!(hit.resolutions.len(), 2);
        assert!(lookup(&blackout(), &matchup("2025-11-22")).is_none());
    }

    #[test]
    fn prohibited_weekday_matchup_is_critical() {
        let sundays = Constraint::new("fb-days", ConstraintType::DayOfWeekProhibition, Sport::Football)
            .with_parameter(DAYS, ParameterValue::texts(&["sunday"]));
        // 2025-11-30 is a Sunday.
        let tension = lookup(&matchup("2025-11-30"), &sundays).expect("tension");
        assert_eq!(tension.severity, Severity::Critical);
        assert_eq!(tension.resolutions[1].actions[0].change, ActionChange::Remove);
        assert!(lookup(&matchup("2025-11-29"), &sundays).is_none());
    }

    #[test]
    fn rivalry_window_blocked_by_blackout() {
        let rivalry = Constraint::new("fb-rivalry", ConstraintType::RivalryPlacement, Sport::Football)
            .with_parameter(TEAM_A, "Kansas")
            .with_parameter(TEAM_B, "Kansas State")
            .with_parameter(WINDOW_START, "2025-11-22")
            .with_parameter(WINDOW_END, "2025-11-30");
        let tension = lookup(&blackout(), &rivalry).expect("tension");
        assert_eq!(tension.severity, Severity::High);
        assert!(!tension.auto_resolvable);
    }

    #[test]
    fn duplicates_drop_lower_weight() {
        let strict = rest();
        let loose = Constraint::new("fb-rest-2", ConstraintType::RestDays, Sport::Football)
            .with_weight(40.0)
            .with_parameter(MIN_DAYS, 4.0);
        let tension = lookup(&loose, &strict).expect("tension");
        assert_eq!(tension.conflict_type, ConflictType::DuplicateRule);
        assert_eq!(tension.resolutions[0].actions[0].target_id, "fb-rest-2");
        assert_eq!(tension.resolutions[0].confidence, 0.90);
        assert!(lookup(&strict, &strict.clone().with_weight(10.0)).is_none());

        let games = |id: &str, n: f64| {
            Constraint::new(id, ConstraintType::GameCount, Sport::Football).with_parameter(GAMES, n)
        };
        let tension = lookup(&games("a", 9.0), &games("b", 8.0)).expect("tension");
        assert_eq!(tension.severity, Severity::Critical);
        assert!(!tension.auto_resolvable);
        assert_eq!(tension.resolutions[0].confidence, 0.70);
    }
}
