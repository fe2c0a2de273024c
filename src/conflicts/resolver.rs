use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::conflicts::{ActionChange, Conflict, ConflictStatus, Resolution};
use crate::constraints::{Constraint, EnumParseError};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AutoResolveMode {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl AutoResolveMode {
    pub fn threshold(&self) -> f64 {
        match self {
            Self::Conservative => 0.9,
            Self::Balanced => 0.75,
            Self::Aggressive => 0.6,
        }
    }
}

impl Display for AutoResolveMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Balanced => write!(f, "balanced"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

impl FromStr for AutoResolveMode {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "balanced" => Ok(Self::Balanced),
            "aggressive" => Ok(Self::Aggressive),
            _ => Err(EnumParseError {
                kind: "auto-resolve mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Audit entry. Automatic and manual fixes produce the same shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionRecord {
    pub conflict_id: String,
    pub resolution: Resolution,
    pub notes: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ResolutionError {
    #[error("unknown conflict {0}")]
    UnknownConflict(String),
    #[error("conflict {conflict_id} has no resolution {resolution_id}")]
    UnknownResolution {
        conflict_id: String,
        resolution_id: String,
    },
    #[error("resolution for {conflict_id} targets {target_id}, which is no longer in the constraint set")]
    StaleTarget {
        conflict_id: String,
        target_id: String,
    },
    #[error("resolution for {conflict_id} targets {target_id}, which names more than one constraint")]
    AmbiguousTarget {
        conflict_id: String,
        target_id: String,
    },
    #[error("conflict {0} was dismissed")]
    Dismissed(String),
    #[error("conflict {conflict_id} cannot move from {from} to {to}")]
    InvalidTransition {
        conflict_id: String,
        from: ConflictStatus,
        to: ConflictStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Applied,
    /// Already resolved; nothing changed.
    AlreadyResolved,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AutoResolveSummary {
    pub applied: Vec<String>,
    pub pending: Vec<String>,
    pub failed: Vec<String>,
    /// Manual requests turned down before the automatic pass.
    #[serde(default)]
    pub rejected: Vec<Rejection>,
}

/// A hand-made decision on one conflict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum ManualRequest {
    Dismiss {
        conflict_id: String,
    },
    Pick {
        conflict_id: String,
        resolution_id: String,
    },
}

impl ManualRequest {
    /// Parses `CONFLICT_ID=RESOLUTION_ID`.
    pub fn pick(raw: &str) -> Option<Self> {
        let (conflict_id, resolution_id) = raw.split_once('=')?;
        let (conflict_id, resolution_id) = (conflict_id.trim(), resolution_id.trim());
        if conflict_id.is_empty() || resolution_id.is_empty() {
            return None;
        }
        Some(Self::Pick {
            conflict_id: conflict_id.to_string(),
            resolution_id: resolution_id.to_string(),
        })
    }

    pub fn dismiss(conflict_id: &str) -> Self {
        Self::Dismiss {
            conflict_id: conflict_id.trim().to_string(),
        }
    }
}

impl Display for ManualRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dismiss { conflict_id } => write!(f, "dismiss {conflict_id}"),
            Self::Pick {
                conflict_id,
                resolution_id,
            } => write!(f, "{conflict_id}={resolution_id}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    pub request: String,
    pub reason: String,
}

impl Rejection {
    pub fn new(request: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct TrackedConflict {
    conflict: Conflict,
    status: ConflictStatus,
}

/// Owns a working copy of the constraint set and walks detected conflicts
/// through `detected -> pending | auto_resolving -> resolved | dismissed`.
#[derive(Debug, Clone)]
pub struct ConflictResolver {
    constraints: Vec<Constraint>,
    order: Vec<String>,
    conflicts: BTreeMap<String, TrackedConflict>,
    audit: Vec<ResolutionRecord>,
}

impl ConflictResolver {
    /// A conflict whose id was already seen is dropped; the first one wins.
    pub fn new(constraints: Vec<Constraint>, conflicts: Vec<Conflict>) -> Self {
        let mut order = Vec::with_capacity(conflicts.len());
        let mut tracked = BTreeMap::new();
        for conflict in conflicts {
            if tracked.contains_key(&conflict.id) {
                warn!(conflict = %conflict.id, "duplicate conflict id ignored");
                continue;
            }
            order.push(conflict.id.clone());
            tracked.insert(
                conflict.id.clone(),
                TrackedConflict {
                    conflict,
                    status: ConflictStatus::Detected,
                },
            );
        }
        Self {
            constraints,
            order,
            conflicts: tracked,
            audit: Vec::new(),
        }
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn into_constraints(self) -> Vec<Constraint> {
        self.constraints
    }

    pub fn audit_trail(&self) -> &[ResolutionRecord] {
        &self.audit
    }

    pub fn status(&self, conflict_id: &str) -> Option<ConflictStatus> {
        self.conflicts.get(conflict_id).map(|t| t.status)
    }

    /// Conflicts that are neither resolved nor dismissed, in detection order.
    pub fn active_conflicts(&self) -> Vec<&Conflict> {
        self.ordered()
            .filter(|t| !t.status.is_terminal())
            .map(|t| &t.conflict)
            .collect()
    }

    fn ordered(&self) -> impl Iterator<Item = &TrackedConflict> {
        self.order.iter().filter_map(|id| self.conflicts.get(id))
    }

    /// Applies the best resolution of every auto-resolvable conflict whose
    /// confidence reaches the mode threshold. Everything else is left pending.
    pub fn auto_resolve(&mut self, mode: AutoResolveMode) -> AutoResolveSummary {
        let threshold = mode.threshold();
        let mut summary = AutoResolveSummary::default();

        for id in self.order.clone() {
            let Some(tracked) = self.conflicts.get(&id) else {
                continue;
            };
            if tracked.status.is_terminal() {
                continue;
            }
            let candidate = tracked
                .conflict
                .auto_resolvable
                .then(|| tracked.conflict.best_resolution().cloned())
                .flatten();
            let Some(resolution) = candidate else {
                self.set_status(&id, ConflictStatus::Pending);
                summary.pending.push(id);
                continue;
            };

            self.set_status(&id, ConflictStatus::AutoResolving);
            if resolution.confidence < threshold {
                debug!(
                    conflict = %id,
                    confidence = resolution.confidence,
                    threshold,
                    "best resolution below auto-resolve threshold"
                );
                self.set_status(&id, ConflictStatus::Pending);
                summary.pending.push(id);
                continue;
            }

            let notes = format!(
                "auto-resolved in {mode} mode (confidence {:.2} >= {threshold:.2})",
                resolution.confidence
            );
            match self.apply(&id, resolution, notes) {
                Ok(()) => summary.applied.push(id),
                Err(error) => {
                    warn!(conflict = %id, "auto-resolve failed: {error}");
                    self.set_status(&id, ConflictStatus::Pending);
                    summary.failed.push(id);
                }
            }
        }

        info!(
            %mode,
            applied = summary.applied.len(),
            pending = summary.pending.len(),
            failed = summary.failed.len(),
            "auto-resolve finished"
        );
        summary
    }

    pub fn resolve_manual(
        &mut self,
        conflict_id: &str,
        resolution_id: &str,
        notes: &str,
    ) -> Result<ResolutionOutcome, ResolutionError> {
        let tracked = self
            .conflicts
            .get(conflict_id)
            .ok_or_else(|| ResolutionError::UnknownConflict(conflict_id.to_string()))?;
        let status = tracked.status;
        match status {
            ConflictStatus::Resolved => return Ok(ResolutionOutcome::AlreadyResolved),
            ConflictStatus::Dismissed => {
                return Err(ResolutionError::Dismissed(conflict_id.to_string()))
            }
            _ => {}
        }
        let resolution = tracked
            .conflict
            .resolution(resolution_id)
            .cloned()
            .ok_or_else(|| ResolutionError::UnknownResolution {
                conflict_id: conflict_id.to_string(),
                resolution_id: resolution_id.to_string(),
            })?;

        if status == ConflictStatus::Detected {
            self.set_status(conflict_id, ConflictStatus::Pending);
        }
        self.apply(conflict_id, resolution, notes.to_string())?;
        Ok(ResolutionOutcome::Applied)
    }

    pub fn dismiss(&mut self, conflict_id: &str) -> Result<(), ResolutionError> {
        let tracked = self
            .conflicts
            .get(conflict_id)
            .ok_or_else(|| ResolutionError::UnknownConflict(conflict_id.to_string()))?;
        match tracked.status {
            ConflictStatus::Dismissed => Ok(()),
            ConflictStatus::Resolved => Err(ResolutionError::InvalidTransition {
                conflict_id: conflict_id.to_string(),
                from: ConflictStatus::Resolved,
                to: ConflictStatus::Dismissed,
            }),
            _ => {
                self.set_status(conflict_id, ConflictStatus::Dismissed);
                info!(conflict = %conflict_id, "conflict dismissed");
                Ok(())
            }
        }
    }

    /// Runs each request on its own. A rejected request is logged and
    /// returned; the conflict it named keeps its status and later requests
    /// still run.
    pub fn apply_requests(&mut self, requests: &[ManualRequest], notes: &str) -> Vec<Rejection> {
        let mut rejected = Vec::new();
        for request in requests {
            let outcome = match request {
                ManualRequest::Dismiss { conflict_id } => self.dismiss(conflict_id),
                ManualRequest::Pick {
                    conflict_id,
                    resolution_id,
                } => self.resolve_manual(conflict_id, resolution_id, notes).map(|_| ()),
            };
            if let Err(error) = outcome {
                warn!(request = %request, "manual request rejected: {error}");
                rejected.push(Rejection::new(request.to_string(), error.to_string()));
            }
        }
        rejected
    }

    fn set_status(&mut self, conflict_id: &str, status: ConflictStatus) {
        if let Some(tracked) = self.conflicts.get_mut(conflict_id) {
            tracked.status = status;
        }
    }

    /// Validates every target first, then rebuilds the constraint set with
    /// the edits applied. On error nothing changes.
    fn apply(
        &mut self,
        conflict_id: &str,
        resolution: Resolution,
        notes: String,
    ) -> Result<(), ResolutionError> {
        let mut known: BTreeMap<&str, usize> = BTreeMap::new();
        for c in &self.constraints {
            *known.entry(c.id.as_str()).or_default() += 1;
        }
        for action in &resolution.actions {
            match known.get(action.target_id.as_str()) {
                None => {
                    return Err(ResolutionError::StaleTarget {
                        conflict_id: conflict_id.to_string(),
                        target_id: action.target_id.clone(),
                    })
                }
                Some(count) if *count > 1 => {
                    return Err(ResolutionError::AmbiguousTarget {
                        conflict_id: conflict_id.to_string(),
                        target_id: action.target_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        self.constraints = self
            .constraints
            .iter()
            .filter_map(|c| rebuild(c, &resolution))
            .collect();
        self.set_status(conflict_id, ConflictStatus::Resolved);
        info!(
            conflict = %conflict_id,
            resolution = %resolution.id,
            kind = %resolution.resolution_type,
            "conflict resolved"
        );
        self.audit.push(ResolutionRecord {
            conflict_id: conflict_id.to_string(),
            resolution,
            notes,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}

/// New record for `constraint` after the resolution's edits; `None` drops it.
fn rebuild(constraint: &Constraint, resolution: &Resolution) -> Option<Constraint> {
    let mut next = constraint.clone();
    for action in resolution
        .actions
        .iter()
        .filter(|a| a.target_id == constraint.id)
    {
        next = match &action.change {
            ActionChange::Remove => return None,
            ActionChange::SetParameter { key, value } => next.with_parameter(key, value.clone()),
            ActionChange::ClearParameter { key } => {
                next.parameters.remove(key);
                next
            }
            ActionChange::SetWeight { weight } => next.with_weight(*weight),
            ActionChange::SetHardness { hardness } => next.with_hardness(*hardness),
            ActionChange::FollowUp { .. } => next,
        };
    }
    Some(next)
}

#[cfg(test)]
mod tests {
    use crate::conflicts::detector::detect_conflicts;
    use crate::conflicts::resolver::{
        AutoResolveMode, ConflictResolver, ManualRequest, ResolutionError, ResolutionOutcome,
    };
    use crate::conflicts::ConflictStatus;
    use crate::constraints::schema::{
        AWAY_TEAM, DATE, DATES, HOME_TEAM, MAX_RUN, MIN_DAYS, TEAM,
    };
    use crate::constraints::{
        generate_constraints, Constraint, ConstraintType, ParameterValue, RegistryParameters, Sport,
    };

    fn rest_and_road() -> Vec<Constraint> {
        vec![
            Constraint::new("rest", ConstraintType::RestDays, Sport::Football)
                .with_weight(85.0)
                .with_parameter(MIN_DAYS, 6.0),
            Constraint::new("away", ConstraintType::MaxConsecutiveAway, Sport::Football)
                .with_weight(60.0)
                .with_parameter(MAX_RUN, 2.0),
        ]
    }

    fn resolver(constraints: Vec<Constraint>) -> ConflictResolver {
        let conflicts = detect_conflicts(&constraints);
        ConflictResolver::new(constraints, conflicts)
    }

    #[test]
    fn mode_threshold_decides_whether_085_applies() {
        let mut conservative = resolver(rest_and_road());
        let summary = conservative.auto_resolve(AutoResolveMode::Conservative);
        assert!(summary.applied.is_empty());
        assert_eq!(summary.pending, vec!["conflict-rest-away"]);
        assert_eq!(conservative.status("conflict-rest-away"), Some(ConflictStatus::Pending));
        assert_eq!(conservative.active_conflicts().len(), 1);
        assert!(conservative.audit_trail().is_empty());

        for mode in [AutoResolveMode::Balanced, AutoResolveMode::Aggressive] {
            let mut r = resolver(rest_and_road());
            let summary = r.auto_resolve(mode);
            assert_eq!(summary.applied, vec!["conflict-rest-away"]);
            assert!(r.active_conflicts().is_empty());
            assert_eq!(r.constraints()[0].number(MIN_DAYS), Some(5.0));
            assert_eq!(r.audit_trail().len(), 1);
            assert_eq!(r.audit_trail()[0].resolution.id, "conflict-rest-away-r1");
        }
    }

    #[test]
    fn resolving_twice_is_a_no_op() {
        let mut r = resolver(rest_and_road());
        let outcome = r
            .resolve_manual("conflict-rest-away", "conflict-rest-away-r3", "ops call")
            .expect("manual resolution");
        assert_eq!(outcome, ResolutionOutcome::Applied);
        assert_eq!(r.constraints()[1].number(MAX_RUN), Some(3.0));

        let again = r
            .resolve_manual("conflict-rest-away", "conflict-rest-away-r1", "again")
            .expect("idempotent");
        assert_eq!(again, ResolutionOutcome::AlreadyResolved);
        assert_eq!(r.constraints()[0].number(MIN_DAYS), Some(6.0));
        assert_eq!(r.audit_trail().len(), 1);
        assert_eq!(r.audit_trail()[0].notes, "ops call");
    }

    #[test]
    fn stale_target_fails_without_partial_changes() {
        let constraints = vec![
            Constraint::new("blackout", ConstraintType::VenueUnavailability, Sport::Football)
                .with_parameter(TEAM, "Kansas")
                .with_parameter(DATES, ParameterValue::texts(&["2025-11-29"])),
            Constraint::new("matchup", ConstraintType::RequiredMatchup, Sport::Football)
                .with_parameter(HOME_TEAM, "Kansas")
                .with_parameter(AWAY_TEAM, "Kansas State")
                .with_parameter(DATE, "2025-11-29"),
        ];
        let conflicts = detect_conflicts(&constraints);
        assert_eq!(conflicts.len(), 1);
        assert!(!conflicts[0].auto_resolvable);

        let mut r = ConflictResolver::new(vec![constraints[0].clone()], conflicts);
        let err = r
            .resolve_manual("conflict-blackout-matchup", "conflict-blackout-matchup-r1", "")
            .expect_err("matchup is gone");
        assert!(matches!(err, ResolutionError::StaleTarget { ref target_id, .. } if target_id == "matchup"));
        assert_eq!(r.status("conflict-blackout-matchup"), Some(ConflictStatus::Pending));
        assert_eq!(r.constraints().len(), 1);
        assert!(r.audit_trail().is_empty());

        let summary = r.auto_resolve(AutoResolveMode::Aggressive);
        assert_eq!(summary.pending, vec!["conflict-blackout-matchup"]);
    }

    #[test]
    fn dismissed_conflicts_leave_the_active_set() {
        let mut r = resolver(rest_and_road());
        r.dismiss("conflict-rest-away").expect("dismiss");
        assert!(r.active_conflicts().is_empty());
        assert_eq!(
            r.resolve_manual("conflict-rest-away", "conflict-rest-away-r1", ""),
            Err(ResolutionError::Dismissed("conflict-rest-away".to_string()))
        );
        assert_eq!(
            r.dismiss("missing"),
            Err(ResolutionError::UnknownConflict("missing".to_string()))
        );
    }

    #[test]
    fn manual_unpin_rebuilds_the_matchup() {
        let constraints = vec![
            Constraint::new("blackout", ConstraintType::VenueUnavailability, Sport::Football)
                .with_parameter(TEAM, "Kansas")
                .with_parameter(DATES, ParameterValue::texts(&["2025-11-29"])),
            Constraint::new("matchup", ConstraintType::RequiredMatchup, Sport::Football)
                .with_parameter(HOME_TEAM, "Kansas")
                .with_parameter(AWAY_TEAM, "Kansas State")
                .with_parameter(DATE, "2025-11-29"),
        ];
        let original = constraints.clone();
        let mut r = resolver(constraints);
        r.resolve_manual("conflict-blackout-matchup", "conflict-blackout-matchup-r1", "moved")
            .expect("manual resolution");
        assert_eq!(r.constraints()[1].text(DATE), None);
        assert_eq!(original[1].text(DATE), Some("2025-11-29"));
        assert!(detect_conflicts(r.constraints()).is_empty());
    }

    #[test]
    fn every_applied_resolution_changes_the_constraint_set() {
        for sport in Sport::ALL {
            let constraints = generate_constraints(&RegistryParameters::new(sport, None))
                .expect("profile defaults are valid");
            for conflict in detect_conflicts(&constraints) {
                let id = conflict.id.clone();
                let mut r = ConflictResolver::new(constraints.clone(), vec![conflict]);
                let summary = r.auto_resolve(AutoResolveMode::Aggressive);
                if summary.applied.is_empty() {
                    continue;
                }
                assert_ne!(r.constraints(), constraints.as_slice(), "{id} changed nothing");
            }
        }
    }

    #[test]
    fn zero_rest_profile_has_nothing_to_relax() {
        let constraints = generate_constraints(&RegistryParameters::new(Sport::Baseball, None))
            .expect("baseball defaults are valid");
        let mut r = resolver(constraints);
        let summary = r.auto_resolve(AutoResolveMode::Balanced);
        assert!(summary.applied.iter().all(|id| !id.contains("rest-days")));
        assert!(r
            .audit_trail()
            .iter()
            .all(|record| !record.resolution.description.contains("from 0 to 0")));
    }

    #[test]
    fn repeated_conflict_ids_are_tracked_once() {
        let constraints = rest_and_road();
        let conflict = detect_conflicts(&constraints).remove(0);
        let mut r = ConflictResolver::new(constraints, vec![conflict.clone(), conflict]);
        assert_eq!(r.active_conflicts().len(), 1);
        r.dismiss("conflict-rest-away").expect("dismiss");
        assert!(r.active_conflicts().is_empty());
    }

    #[test]
    fn shared_target_id_is_rejected() {
        let mut constraints = rest_and_road();
        constraints.push(constraints[0].clone().with_parameter(MIN_DAYS, 3.0));
        let conflicts = detect_conflicts(&rest_and_road());
        let mut r = ConflictResolver::new(constraints, conflicts);
        let err = r
            .resolve_manual("conflict-rest-away", "conflict-rest-away-r1", "")
            .expect_err("two records named rest");
        assert!(matches!(err, ResolutionError::AmbiguousTarget { ref target_id, .. } if target_id == "rest"));
        assert_eq!(r.constraints().len(), 3);
        assert_eq!(r.status("conflict-rest-away"), Some(ConflictStatus::Pending));
    }

    #[test]
    fn rejected_requests_do_not_stop_the_others() {
        let mut constraints = rest_and_road();
        constraints.extend([
            Constraint::new("blackout", ConstraintType::VenueUnavailability, Sport::Football)
                .with_parameter(TEAM, "Kansas")
                .with_parameter(DATES, ParameterValue::texts(&["2025-11-29"])),
            Constraint::new("matchup", ConstraintType::RequiredMatchup, Sport::Football)
                .with_parameter(HOME_TEAM, "Kansas")
                .with_parameter(AWAY_TEAM, "Kansas State")
                .with_parameter(DATE, "2025-11-29"),
        ]);
        let conflicts = detect_conflicts(&constraints);
        let without_matchup: Vec<Constraint> =
            constraints.into_iter().filter(|c| c.id != "matchup").collect();
        let mut r = ConflictResolver::new(without_matchup, conflicts);

        let requests = vec![
            ManualRequest::dismiss("missing"),
            ManualRequest::pick("conflict-blackout-matchup=conflict-blackout-matchup-r1")
                .expect("well formed"),
            ManualRequest::pick("conflict-rest-away=conflict-rest-away-r3").expect("well formed"),
        ];
        let rejected = r.apply_requests(&requests, "ops call");
        assert_eq!(rejected.len(), 2);
        assert_eq!(rejected[0].request, "dismiss missing");
        assert!(rejected[1].reason.contains("matchup"));
        assert_eq!(r.status("conflict-blackout-matchup"), Some(ConflictStatus::Pending));
        assert_eq!(r.status("conflict-rest-away"), Some(ConflictStatus::Resolved));
        assert_eq!(r.audit_trail().len(), 1);
        assert!(ManualRequest::pick("no-separator").is_none());
    }
}
