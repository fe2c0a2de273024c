use serde::Serialize;
use tracing::warn;

use crate::constraints::{Constraint, Gender, Sport};
use crate::evaluation::{EvaluationContext, EvaluationResult, Violation};

/// One violation flattened for logs and telemetry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ViolationEvent {
    pub sport: Sport,
    pub gender: Option<Gender>,
    pub constraint_id: String,
    pub team: Option<String>,
    pub opponent: Option<String>,
    pub venue: Option<String>,
    pub violation: &'static str,
    pub message: String,
}

impl ViolationEvent {
    /// Scope comes from the evaluation context, the same source the
    /// evaluator tags results with.
    pub fn from_violation(
        ctx: &EvaluationContext<'_>,
        constraint: &Constraint,
        violation: &Violation,
    ) -> Self {
        Self {
            sport: ctx.sport,
            gender: ctx.gender,
            constraint_id: constraint.id.clone(),
            team: violation.team().map(str::to_string),
            opponent: violation.opponent().map(str::to_string),
            venue: violation.venue(),
            violation: violation.code(),
            message: violation.message(),
        }
    }
}

pub trait ViolationObserver: Send + Sync {
    fn on_violation(&self, event: &ViolationEvent);
}

pub struct NoopObserver;

impl ViolationObserver for NoopObserver {
    fn on_violation(&self, _event: &ViolationEvent) {}
}

/// Emits one structured `warn!` per violation.
pub struct TracingObserver;

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, event: &ViolationEvent) {
        warn!(
            sport = %event.sport,
            gender = event.gender.map(|g| g.to_string()).as_deref().unwrap_or("-"),
            constraint = %event.constraint_id,
            team = event.team.as_deref().unwrap_or("-"),
            opponent = event.opponent.as_deref().unwrap_or("-"),
            venue = event.venue.as_deref().unwrap_or("-"),
            violation = event.violation,
            "{}",
            event.message
        );
    }
}

/// Forwards every violation in a result to the observer. Returns how many
/// events were sent.
pub fn report_violations(
    ctx: &EvaluationContext<'_>,
    constraint: &Constraint,
    result: &EvaluationResult,
    observer: &dyn ViolationObserver,
) -> usize {
    for violation in &result.details.violations {
        observer.on_violation(&ViolationEvent::from_violation(ctx, constraint, violation));
    }
    result.details.violations.len()
}
