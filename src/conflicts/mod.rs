pub mod catalog;
pub mod detector;
pub mod resolver;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constraints::{EnumParseError, Hardness, ParameterValue, Severity};

pub use detector::{detect_conflicts, detect_conflicts_with, DetectionOutcome, DetectorOptions};
pub use resolver::{
    AutoResolveMode, AutoResolveSummary, ConflictResolver, ManualRequest, Rejection,
    ResolutionError, ResolutionOutcome, ResolutionRecord,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    /// Two thresholds pull in opposite directions.
    ParameterTension,
    /// A pinned date falls on a blocked date.
    DateCollision,
    /// A pinned date falls on a prohibited weekday.
    WeekdayCollision,
    /// Both rules can hold, but not at full strength at once.
    PriorityTension,
    /// The same rule declared twice with different thresholds.
    DuplicateRule,
}

impl Display for ConflictType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::ParameterTension => "parameter_tension",
            Self::DateCollision => "date_collision",
            Self::WeekdayCollision => "weekday_collision",
            Self::PriorityTension => "priority_tension",
            Self::DuplicateRule => "duplicate_rule",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionType {
    Modify,
    Remove,
    Priority,
    Schedule,
    Alternative,
}

impl Display for ResolutionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Modify => "modify",
            Self::Remove => "remove",
            Self::Priority => "priority",
            Self::Schedule => "schedule",
            Self::Alternative => "alternative",
        };
        write!(f, "{label}")
    }
}

/// Edit applied to one constraint record when a resolution is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ActionChange {
    SetParameter { key: String, value: ParameterValue },
    ClearParameter { key: String },
    SetWeight { weight: f64 },
    SetHardness { hardness: Hardness },
    Remove,
    /// Work outside the constraint set, e.g. moving a game. Recorded only.
    FollowUp { note: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionAction {
    pub target_id: String,
    pub change: ActionChange,
    pub description: String,
}

impl ResolutionAction {
    pub fn new(target_id: &str, change: ActionChange, description: impl Into<String>) -> Self {
        Self {
            target_id: target_id.to_string(),
            change,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    pub id: String,
    pub resolution_type: ResolutionType,
    pub description: String,
    pub confidence: f64,
    pub impact: String,
    pub actions: Vec<ResolutionAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    pub id: String,
    pub severity: Severity,
    pub conflict_type: ConflictType,
    pub constraints: Vec<String>,
    pub description: String,
    pub impact: String,
    pub resolutions: Vec<Resolution>,
    pub auto_resolvable: bool,
}

impl Conflict {
    /// Highest-confidence resolution; the earliest wins a tie.
    pub fn best_resolution(&self) -> Option<&Resolution> {
        self.resolutions.iter().fold(None, |best: Option<&Resolution>, r| match best {
            Some(b) if b.confidence >= r.confidence => Some(b),
            _ => Some(r),
        })
    }

    pub fn resolution(&self, resolution_id: &str) -> Option<&Resolution> {
        self.resolutions.iter().find(|r| r.id == resolution_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Detected,
    Pending,
    AutoResolving,
    Resolved,
    Dismissed,
}

impl ConflictStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Dismissed)
    }
}

impl Display for ConflictStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Detected => "detected",
            Self::Pending => "pending",
            Self::AutoResolving => "auto_resolving",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        };
        write!(f, "{label}")
    }
}

impl FromStr for ConflictStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "detected" => Ok(Self::Detected),
            "pending" => Ok(Self::Pending),
            "auto_resolving" => Ok(Self::AutoResolving),
            "resolved" => Ok(Self::Resolved),
            "dismissed" => Ok(Self::Dismissed),
            _ => Err(EnumParseError {
                kind: "conflict status",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::conflicts::{Conflict, ConflictType, Resolution, ResolutionType};
    use crate::constraints::Severity;

    fn resolution(id: &str, confidence: f64) -> Resolution {
        Resolution {
            id: id.to_string(),
            resolution_type: ResolutionType::Modify,
            description: String::new(),
            confidence,
            impact: String::new(),
            actions: Vec::new(),
        }
    }

    #[test]
    fn best_resolution_prefers_first_on_ties() {
        let conflict = Conflict {
            id: "c".to_string(),
            severity: Severity::Medium,
            conflict_type: ConflictType::ParameterTension,
            constraints: vec!["a".to_string(), "b".to_string()],
            description: String::new(),
            impact: String::new(),
            resolutions: vec![resolution("r1", 0.7), resolution("r2", 0.85), resolution("r3", 0.85)],
            auto_resolvable: true,
        };
        assert_eq!(conflict.best_resolution().map(|r| r.id.as_str()), Some("r2"));
        assert!(conflict.resolution("r3").is_some());
        assert!(conflict.resolution("r9").is_none());
    }
}
