use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::goal::WeeklyGoal;
use super::recommend::Recommendation;
use super::snapshot::{SequenceStat, Snapshot};

/// Stored recommendation with its completion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: u64,
    pub date: NaiveDate,
    pub completed: bool,
    pub recommendation: Recommendation,
}

/// One snapshot per calendar date, with its per-sequence child rows.
pub trait SnapshotRepository: Send + Sync {
    /// Replaces any snapshot already stored for the same date.
    fn save(&self, snapshot: Snapshot) -> Result<(), RepositoryError>;
    fn fetch(&self, date: NaiveDate) -> Result<Option<Snapshot>, RepositoryError>;
    /// Latest snapshot dated within `start..=end`.
    fn latest_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Snapshot>, RepositoryError>;
    fn sequence_rows(&self, date: NaiveDate) -> Result<Vec<SequenceStat>, RepositoryError>;
}

/// Audit trail of what the engine told people and which goals it set.
pub trait AuditRepository: Send + Sync {
    /// Replaces the recommendations stored for `date` and returns them with their ids.
    fn record_recommendations(
        &self,
        date: NaiveDate,
        recommendations: &[Recommendation],
    ) -> Result<Vec<RecommendationRecord>, RepositoryError>;
    fn recommendations_for(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RecommendationRecord>, RepositoryError>;
    fn complete_recommendation(&self, id: u64) -> Result<RecommendationRecord, RepositoryError>;
    fn record_goal(&self, goal: WeeklyGoal) -> Result<(), RepositoryError>;
    fn goal_for(&self, week_start: NaiveDate) -> Result<Option<WeeklyGoal>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
