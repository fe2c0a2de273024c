use anyhow::Result;

use crate::conflicts::{Conflict, ResolutionRecord};
use crate::constraints::{Constraint, ParameterReport};
use crate::scoring::{ScoreReport, ScoredConstraint};

pub fn constraints_to_csv(constraints: &[Constraint]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "id",
        "type",
        "hardness",
        "category",
        "weight",
        "severity",
        "parameters",
    ])?;
    for c in constraints {
        let parameters = c
            .parameters
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        writer.write_record([
            c.id.clone(),
            c.constraint_type.to_string(),
            c.hardness.to_string(),
            c.category.to_string(),
            format!("{:.0}", c.weight),
            c.severity().to_string(),
            parameters,
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn report_to_csv(report: &ScoreReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "bucket",
        "constraint_id",
        "type",
        "hardness",
        "severity",
        "weight",
        "score",
        "violations",
    ])?;
    let buckets: [(&str, &[ScoredConstraint]); 3] = [
        ("violated", report.violations.as_slice()),
        ("partial", report.partially_met.as_slice()),
        ("satisfied", report.satisfied_constraints.as_slice()),
    ];
    for (bucket, items) in buckets {
        for item in items {
            writer.write_record([
                bucket.to_string(),
                item.constraint_id.clone(),
                item.constraint_type.to_string(),
                item.hardness.to_string(),
                item.severity.to_string(),
                format!("{:.0}", item.weight),
                format!("{:.4}", item.score),
                item.result.violation_count().to_string(),
            ])?;
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn conflicts_to_csv(conflicts: &[Conflict]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "conflict_id",
        "severity",
        "type",
        "constraints",
        "auto_resolvable",
        "best_resolution",
        "confidence",
    ])?;
    for conflict in conflicts {
        let best = conflict.best_resolution();
        writer.write_record([
            conflict.id.clone(),
            conflict.severity.to_string(),
            conflict.conflict_type.to_string(),
            conflict.constraints.join(" x "),
            conflict.auto_resolvable.to_string(),
            best.map(|r| r.description.clone()).unwrap_or_default(),
            best.map(|r| format!("{:.2}", r.confidence)).unwrap_or_default(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn issues_to_csv(report: &ParameterReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["level", "key", "message"])?;
    for (level, issues) in [("error", &report.errors), ("warning", &report.warnings)] {
        for issue in issues {
            writer.write_record([level, issue.key.as_str(), issue.message.as_str()])?;
        }
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn audit_to_csv(records: &[ResolutionRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["timestamp", "conflict_id", "resolution_id", "type", "confidence", "notes"])?;
    for record in records {
        writer.write_record([
            record.timestamp.to_rfc3339(),
            record.conflict_id.clone(),
            record.resolution.id.clone(),
            record.resolution.resolution_type.to_string(),
            format!("{:.2}", record.resolution.confidence),
            record.notes.clone(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
