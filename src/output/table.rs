use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::conflicts::{AutoResolveSummary, Conflict, ResolutionRecord};
use crate::constraints::{Constraint, Hardness, ParameterReport, Severity};
use crate::scoring::ScoreReport;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn severity_cell(severity: Severity) -> Cell {
    let cell = Cell::new(severity.to_string().to_uppercase());
    match severity {
        Severity::Critical => cell.fg(Color::Red),
        Severity::High => cell.fg(Color::Magenta),
        Severity::Medium => cell.fg(Color::Yellow),
        Severity::Low => cell,
    }
}

pub fn render_constraints_table(constraints: &[Constraint]) -> String {
    let mut table = new_table(vec!["Id", "Type", "Hardness", "Weight", "Severity", "Description"]);
    for c in constraints {
        let hardness = Cell::new(c.hardness.to_string());
        let hardness = if c.hardness == Hardness::Hard {
            hardness.fg(Color::Cyan)
        } else {
            hardness
        };
        table.add_row(Row::from(vec![
            Cell::new(&c.id),
            Cell::new(c.constraint_type.to_string()),
            hardness,
            Cell::new(format!("{:.0}", c.weight)),
            severity_cell(c.severity()),
            Cell::new(&c.description),
        ]));
    }
    table.to_string()
}

pub fn render_validation_table(report: &ParameterReport) -> String {
    let mut table = new_table(vec!["Level", "Setting", "Message"]);
    for issue in &report.errors {
        table.add_row(Row::from(vec![
            Cell::new("ERROR").fg(Color::Red),
            Cell::new(&issue.key),
            Cell::new(&issue.message),
        ]));
    }
    for issue in &report.warnings {
        table.add_row(Row::from(vec![
            Cell::new("WARN").fg(Color::Yellow),
            Cell::new(&issue.key),
            Cell::new(&issue.message),
        ]));
    }
    let verdict = if report.is_valid { "valid" } else { "invalid" };
    format!("{table}\nParameters are {verdict}")
}

pub fn render_report_table(report: &ScoreReport) -> String {
    let mut table = new_table(vec!["Constraint", "Type", "Status", "Score", "Weight", "Violations"]);
    let rows = report
        .violations
        .iter()
        .map(|s| (s, Cell::new("VIOLATED").fg(Color::Red)))
        .chain(
            report
                .partially_met
                .iter()
                .map(|s| (s, Cell::new("PARTIAL").fg(Color::Yellow))),
        )
        .chain(
            report
                .satisfied_constraints
                .iter()
                .map(|s| (s, Cell::new("OK").fg(Color::Green))),
        );
    for (scored, status) in rows {
        table.add_row(Row::from(vec![
            Cell::new(&scored.constraint_id),
            Cell::new(scored.constraint_type.to_string()),
            status,
            Cell::new(format!("{:.3}", scored.score)),
            Cell::new(format!("{:.0}", scored.weight)),
            Cell::new(scored.result.violation_count()),
        ]));
    }

    let mut out = table.to_string();
    let normalized = report
        .normalized_score()
        .map(|s| format!("{:.1}%", s * 100.0))
        .unwrap_or_else(|| "-".to_string());
    out.push_str(&format!(
        "\nTotal score: {:.2} of {:.0} ({normalized})\nBlocking violations: {}",
        report.total_score,
        report.weight_total,
        if report.has_blocking_violations() { "yes" } else { "no" }
    ));
    out
}

pub fn render_violations_table(report: &ScoreReport) -> String {
    let mut table = new_table(vec!["Constraint", "Severity", "Kind", "Detail"]);
    for scored in &report.violations {
        for violation in &scored.result.details.violations {
            table.add_row(Row::from(vec![
                Cell::new(&scored.constraint_id),
                severity_cell(scored.severity),
                Cell::new(violation.code()),
                Cell::new(violation.message()),
            ]));
        }
    }
    table.to_string()
}

pub fn render_conflicts_table(conflicts: &[Conflict]) -> String {
    let mut table = new_table(vec![
        "Conflict",
        "Severity",
        "Constraints",
        "Auto",
        "Best Resolution",
        "Confidence",
    ]);
    for conflict in conflicts {
        let best = conflict.best_resolution();
        table.add_row(Row::from(vec![
            Cell::new(&conflict.id),
            severity_cell(conflict.severity),
            Cell::new(conflict.constraints.join(" x ")),
            Cell::new(if conflict.auto_resolvable { "yes" } else { "no" }),
            Cell::new(best.map(|r| r.description.as_str()).unwrap_or("-")),
            Cell::new(
                best.map(|r| format!("{:.2}", r.confidence))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]));
    }
    table.to_string()
}

pub fn render_resolution_table(summary: &AutoResolveSummary, audit: &[ResolutionRecord]) -> String {
    let mut table = new_table(vec!["Conflict", "Resolution", "Type", "Confidence", "Notes"]);
    for record in audit {
        table.add_row(Row::from(vec![
            Cell::new(&record.conflict_id),
            Cell::new(&record.resolution.description),
            Cell::new(record.resolution.resolution_type.to_string()),
            Cell::new(format!("{:.2}", record.resolution.confidence)),
            Cell::new(&record.notes),
        ]));
    }
    let mut out = format!(
        "{table}\nApplied: {}  Pending: {}  Failed: {}  Rejected: {}",
        summary.applied.len(),
        summary.pending.len(),
        summary.failed.len(),
        summary.rejected.len()
    );
    for rejection in &summary.rejected {
        out.push_str(&format!("\nRejected {}: {}", rejection.request, rejection.reason));
    }
    out
}
