use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constraints::{constraint_fingerprint, Constraint, ConstraintType, Hardness, Severity};
use crate::evaluation::{
    evaluate_constraint, report_violations, EvaluationContext, EvaluationResult, NoopObserver,
    ViolationObserver,
};
use crate::schedule::Schedule;

pub const DEFAULT_PARTIAL_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringOptions {
    /// Satisfied constraints scoring below this land in `partially_met`.
    pub partial_threshold: f64,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            partial_threshold: DEFAULT_PARTIAL_THRESHOLD,
        }
    }
}

impl ScoringOptions {
    pub fn with_partial_threshold(mut self, threshold: f64) -> Self {
        self.partial_threshold = if threshold.is_nan() {
            DEFAULT_PARTIAL_THRESHOLD
        } else {
            threshold.clamp(0.0, 1.0)
        };
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredConstraint {
    pub constraint_id: String,
    pub constraint_type: ConstraintType,
    pub hardness: Hardness,
    pub severity: Severity,
    pub weight: f64,
    pub score: f64,
    pub result: EvaluationResult,
}

impl ScoredConstraint {
    fn new(constraint: &Constraint, result: EvaluationResult) -> Self {
        Self {
            constraint_id: constraint.id.clone(),
            constraint_type: constraint.constraint_type,
            hardness: constraint.hardness,
            severity: constraint.severity(),
            weight: constraint.weight,
            score: result.score,
            result,
        }
    }
}

/// Outcome of scoring one schedule against a constraint set.
///
/// `total_score` is the raw sum of `score * weight` and is not normalized;
/// divide by `weight_total` for a share. A report describes exactly the
/// inputs it was computed from; use `is_current` after any edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreReport {
    pub total_score: f64,
    pub weight_total: f64,
    pub violations: Vec<ScoredConstraint>,
    pub satisfied_constraints: Vec<ScoredConstraint>,
    pub partially_met: Vec<ScoredConstraint>,
    pub schedule_fingerprint: String,
    pub constraint_fingerprint: String,
}

impl ScoreReport {
    pub fn is_current(&self, schedule: &Schedule, constraints: &[Constraint]) -> bool {
        self.schedule_fingerprint == schedule.fingerprint()
            && self.constraint_fingerprint == constraint_fingerprint(constraints)
    }

    /// True when any hard constraint is violated.
    pub fn has_blocking_violations(&self) -> bool {
        self.violations.iter().any(|v| v.hardness == Hardness::Hard)
    }

    pub fn normalized_score(&self) -> Option<f64> {
        (self.weight_total > 0.0).then(|| self.total_score / self.weight_total)
    }

    pub fn violated_ids(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.constraint_id.as_str()).collect()
    }

    pub fn evaluated(&self) -> usize {
        self.violations.len() + self.satisfied_constraints.len() + self.partially_met.len()
    }
}

pub fn evaluate_all_constraints(
    constraints: &[Constraint],
    schedule: &Schedule,
    ctx: &EvaluationContext<'_>,
) -> ScoreReport {
    score_schedule(constraints, schedule, ctx, &ScoringOptions::default(), &NoopObserver)
}

/// Evaluates every constraint in parallel, then buckets and sums in input
/// order so totals do not depend on scheduling.
pub fn score_schedule(
    constraints: &[Constraint],
    schedule: &Schedule,
    ctx: &EvaluationContext<'_>,
    options: &ScoringOptions,
    observer: &dyn ViolationObserver,
) -> ScoreReport {
    let results: Vec<EvaluationResult> = constraints
        .par_iter()
        .map(|c| evaluate_constraint(c, schedule, ctx))
        .collect();

    let mut report = ScoreReport {
        total_score: 0.0,
        weight_total: 0.0,
        violations: Vec::new(),
        satisfied_constraints: Vec::new(),
        partially_met: Vec::new(),
        schedule_fingerprint: schedule.fingerprint(),
        constraint_fingerprint: constraint_fingerprint(constraints),
    };

    for (constraint, result) in constraints.iter().zip(results) {
        report.total_score += result.score * constraint.weight;
        report.weight_total += constraint.weight;
        report_violations(ctx, constraint, &result, observer);

        let satisfied = result.satisfied;
        let score = result.score;
        let scored = ScoredConstraint::new(constraint, result);
        if !satisfied {
            report.violations.push(scored);
        } else if score >= options.partial_threshold {
            report.satisfied_constraints.push(scored);
        } else {
            report.partially_met.push(scored);
        }
    }

    debug!(
        constraints = constraints.len(),
        violations = report.violations.len(),
        total_score = report.total_score,
        "scored schedule"
    );
    report
}
