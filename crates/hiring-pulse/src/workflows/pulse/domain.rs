use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hiring priority of a role. `P1` is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Priority(u8);

impl Priority {
    pub fn new(rank: u8) -> Result<Self, PriorityParseError> {
        if rank == 0 {
            return Err(PriorityParseError(rank.to_string()));
        }
        Ok(Self(rank))
    }

    pub const fn rank(self) -> u8 {
        self.0
    }

    pub fn label(self) -> String {
        format!("P{}", self.0)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl FromStr for Priority {
    type Err = PriorityParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix('P')
            .or_else(|| trimmed.strip_prefix('p'))
            .unwrap_or(trimmed);
        digits
            .parse::<u8>()
            .ok()
            .filter(|rank| *rank > 0)
            .map(Self)
            .ok_or_else(|| PriorityParseError(value.to_string()))
    }
}

impl TryFrom<String> for Priority {
    type Error = PriorityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        value.label()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("priority '{0}' must look like P1, P2, ...")]
pub struct PriorityParseError(String);

/// Pipeline health label for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Green,
    Yellow,
    Red,
}

impl Health {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

/// People the engine writes actions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stakeholder {
    /// Runs screens and moves candidates through the pipeline.
    Recruiter,
    /// Owns outbound sourcing volume.
    Sourcer,
}

impl Stakeholder {
    pub const fn ordered() -> [Self; 2] {
        [Self::Recruiter, Self::Sourcer]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Recruiter => "Recruiter",
            Self::Sourcer => "Sourcer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Screen,
    FollowUp,
    Sourcing,
    Review,
    Sync,
}

impl ActionCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Screen => "SCREEN",
            Self::FollowUp => "FOLLOW UP",
            Self::Sourcing => "SOURCING",
            Self::Review => "REVIEW",
            Self::Sync => "SYNC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

impl RecommendationPriority {
    /// Sort key, lower sorts first.
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Conversion rate for a stage pair as it arrived at the snapshot boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObservedRate {
    /// Historical rate handed in by the caller.
    Supplied { value: f64 },
    /// Rate computed from current stage counts.
    Derived { value: f64 },
    /// Supplied rate outside [0, 1], pulled back to the nearest bound.
    Clamped { supplied: f64, value: f64 },
    Unknown,
}

impl ObservedRate {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Supplied { value } | Self::Derived { value } | Self::Clamped { value, .. } => {
                Some(*value)
            }
            Self::Unknown => None,
        }
    }
}

/// How a transition's rate was treated when computing gap-to-hire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStatus {
    Observed,
    Derived,
    /// Zero or unknown rate replaced by the configured floor.
    Floored,
    Clamped,
    /// Zero or unknown close into the terminal stage; floored but not a bottleneck.
    Pending,
}

impl RateStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Observed => "observed",
            Self::Derived => "derived",
            Self::Floored => "floored",
            Self::Clamped => "clamped",
            Self::Pending => "pending",
        }
    }
}

pub fn transition_label(from: &str, to: &str) -> String {
    format!("{from}→{to}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingData,
    InvalidRate,
    DivisionGuard,
}

impl IssueKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingData => "missing data",
            Self::InvalidRate => "invalid rate",
            Self::DivisionGuard => "division guard",
        }
    }
}

/// Non-fatal input problem recorded while the rest of the analysis continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIssue {
    pub kind: IssueKind,
    pub entity: String,
    pub detail: String,
}

impl DataIssue {
    pub fn missing(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::MissingData,
            entity: entity.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid_rate(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::InvalidRate,
            entity: entity.into(),
            detail: detail.into(),
        }
    }

    pub fn division_guard(entity: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: IssueKind::DivisionGuard,
            entity: entity.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for DataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind.label(), self.entity, self.detail)
    }
}

/// Input shape problems that stop an analysis before any number is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("missing {entity} '{key}': {detail}")]
    MissingData {
        entity: &'static str,
        key: String,
        detail: String,
    },
    #[error("invalid conversion rate {value} for {role} {transition}")]
    InvalidRate {
        role: String,
        transition: String,
        value: f64,
    },
    #[error("inconsistent counts for sequence '{sequence}': {detail}")]
    InvalidCounts { sequence: String, detail: String },
    #[error("duplicate {entity} '{key}'")]
    Duplicate { entity: &'static str, key: String },
}

impl AnalysisError {
    pub(crate) fn missing(
        entity: &'static str,
        key: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::MissingData {
            entity,
            key: key.into(),
            detail: detail.into(),
        }
    }
}
