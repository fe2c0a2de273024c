use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::conflicts::catalog::{lookup, Tension};
use crate::conflicts::{Conflict, Resolution};
use crate::constraints::{constraint_fingerprint, unique_id, Constraint};

#[derive(Debug, Clone, Default)]
pub struct DetectorOptions {
    /// When set, only pairs with at least one violated member are compared.
    pub violated_ids: Option<BTreeSet<String>>,
    pub max_comparisons: Option<usize>,
    pub timeout: Option<Duration>,
}

impl DetectorOptions {
    pub fn with_violated_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.violated_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_max_comparisons(mut self, max: usize) -> Self {
        self.max_comparisons = Some(max);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn wants_pair(&self, a: &Constraint, b: &Constraint) -> bool {
        match &self.violated_ids {
            Some(ids) => ids.contains(&a.id) || ids.contains(&b.id),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionOutcome {
    pub conflicts: Vec<Conflict>,
    pub comparisons: usize,
    /// Budget or timeout ran out; `conflicts` holds what was found so far.
    pub partial: bool,
    pub constraint_fingerprint: String,
}

pub fn detect_conflicts(constraints: &[Constraint]) -> Vec<Conflict> {
    detect_conflicts_with(constraints, &DetectorOptions::default()).conflicts
}

/// Pairwise scan in input order against the tension catalog.
pub fn detect_conflicts_with(constraints: &[Constraint], options: &DetectorOptions) -> DetectionOutcome {
    let started = Instant::now();
    let mut conflicts = Vec::new();
    let mut conflict_ids = BTreeSet::new();
    let mut comparisons = 0usize;
    let mut partial = false;

    'scan: for i in 0..constraints.len() {
        for j in (i + 1)..constraints.len() {
            let a = &constraints[i];
            let b = &constraints[j];
            if !a.same_scope(b) || !options.wants_pair(a, b) {
                continue;
            }
            if options.max_comparisons.is_some_and(|max| comparisons >= max) {
                warn!(comparisons, "conflict scan stopped at comparison budget");
                partial = true;
                break 'scan;
            }
            if options.timeout.is_some_and(|t| started.elapsed() >= t) {
                warn!(comparisons, "conflict scan timed out");
                partial = true;
                break 'scan;
            }
            comparisons += 1;

            if let Some(tension) = lookup(a, b) {
                let id = unique_id(&mut conflict_ids, &format!("conflict-{}-{}", a.id, b.id));
                conflicts.push(build_conflict(id, a, b, tension));
            }
        }
    }

    debug!(
        constraints = constraints.len(),
        comparisons,
        conflicts = conflicts.len(),
        partial,
        "conflict scan finished"
    );
    DetectionOutcome {
        conflicts,
        comparisons,
        partial,
        constraint_fingerprint: constraint_fingerprint(constraints),
    }
}

fn build_conflict(id: String, a: &Constraint, b: &Constraint, tension: Tension) -> Conflict {
    let resolutions: Vec<Resolution> = tension
        .resolutions
        .into_iter()
        .enumerate()
        .map(|(n, r)| Resolution {
            id: format!("{id}-r{}", n + 1),
            resolution_type: r.resolution_type,
            description: r.description,
            confidence: r.confidence,
            impact: r.impact,
            actions: r.actions,
        })
        .collect();
    Conflict {
        auto_resolvable: tension.auto_resolvable && !resolutions.is_empty(),
        id,
        severity: tension.severity,
        conflict_type: tension.conflict_type,
        constraints: vec![a.id.clone(), b.id.clone()],
        description: tension.description,
        impact: tension.impact,
        resolutions,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::conflicts::detector::{detect_conflicts, detect_conflicts_with, DetectorOptions};
    use crate::constraints::schema::{MAX_RUN, MIN_DAYS};
    use crate::constraints::{
        generate_constraints, Constraint, ConstraintType, RegistryParameters, Sport,
    };

    fn trio() -> Vec<Constraint> {
        vec![
            Constraint::new("rest", ConstraintType::RestDays, Sport::Basketball)
                .with_parameter(MIN_DAYS, 2.0),
            Constraint::new("away", ConstraintType::MaxConsecutiveAway, Sport::Basketball)
                .with_parameter(MAX_RUN, 2.0),
            Constraint::new("home", ConstraintType::MaxConsecutiveHome, Sport::Basketball)
                .with_parameter(MAX_RUN, 3.0),
        ]
    }

    #[test]
    fn ids_are_deterministic() {
        let conflicts = detect_conflicts(&trio());
        let ids: Vec<&str> = conflicts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["conflict-rest-away", "conflict-rest-home"]);
        assert_eq!(conflicts[0].resolutions[0].id, "conflict-rest-away-r1");
        assert!(conflicts[0].auto_resolvable);
        assert_eq!(conflicts, detect_conflicts(&trio()));
    }

    #[test]
    fn restriction_keeps_pairs_touching_a_violation() {
        let options = DetectorOptions::default().with_violated_ids(["home"]);
        let outcome = detect_conflicts_with(&trio(), &options);
        assert_eq!(outcome.comparisons, 2);
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].constraints, vec!["rest", "home"]);
    }

    #[test]
    fn budget_exhaustion_returns_partial_result() {
        let options = DetectorOptions::default().with_max_comparisons(1);
        let outcome = detect_conflicts_with(&trio(), &options);
        assert!(outcome.partial);
        assert_eq!(outcome.comparisons, 1);
        assert_eq!(outcome.conflicts.len(), 1);

        let zero = DetectorOptions::default().with_timeout(Duration::ZERO);
        let outcome = detect_conflicts_with(&trio(), &zero);
        assert!(outcome.partial);
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn joined_ids_that_collide_are_suffixed() {
        let constraints = vec![
            Constraint::new("rest-a", ConstraintType::RestDays, Sport::Basketball)
                .with_parameter(MIN_DAYS, 2.0),
            Constraint::new("away", ConstraintType::MaxConsecutiveAway, Sport::Basketball)
                .with_parameter(MAX_RUN, 2.0),
            Constraint::new("rest", ConstraintType::RestDays, Sport::Basketball)
                .with_parameter(MIN_DAYS, 2.0),
            Constraint::new("a-away", ConstraintType::MaxConsecutiveAway, Sport::Basketball)
                .with_parameter(MAX_RUN, 2.0),
        ];
        let conflicts = detect_conflicts(&constraints);
        let ids: Vec<&str> = conflicts.iter().map(|c| c.id.as_str()).collect();
        assert!(ids.contains(&"conflict-rest-a-away"));
        assert!(ids.contains(&"conflict-rest-a-away-2"));
        let unique: std::collections::BTreeSet<&str> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        let suffixed = conflicts
            .iter()
            .find(|c| c.id == "conflict-rest-a-away-2")
            .expect("suffixed conflict");
        assert_eq!(suffixed.resolutions[0].id, "conflict-rest-a-away-2-r1");
    }

    #[test]
    fn generated_football_set_has_known_tensions() {
        let constraints = generate_constraints(&RegistryParameters::new(Sport::Football, None))
            .expect("football defaults are valid");
        let outcome = detect_conflicts_with(&constraints, &DetectorOptions::default());
        assert!(!outcome.partial);
        assert!(outcome
            .conflicts
            .iter()
            .any(|c| c.id.ends_with("rest-days-football-max-consecutive-away")));
    }
}
