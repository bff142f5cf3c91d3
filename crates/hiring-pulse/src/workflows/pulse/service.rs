use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::config::AnalysisConfig;
use super::digest::{AnalysisRequest, DigestModel, PulseEngine};
use super::domain::AnalysisError;
use super::goal::WeeklyGoal;
use super::query::{route_query, QueryContext};
use super::repository::{
    AuditRepository, RecommendationRecord, RepositoryError, SnapshotRepository,
};
use super::snapshot::Snapshot;
use super::trend::PeriodWindows;

/// Chat question plus the data to answer it from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub analysis: AnalysisRequest,
}

/// Service composing the engine with snapshot storage and the audit trail.
pub struct PulseService<S, A> {
    engine: Arc<PulseEngine>,
    snapshots: Arc<S>,
    audit: Arc<A>,
}

impl<S, A> PulseService<S, A>
where
    S: SnapshotRepository + 'static,
    A: AuditRepository + 'static,
{
    pub fn new(snapshots: Arc<S>, audit: Arc<A>, config: AnalysisConfig) -> Self {
        Self {
            engine: Arc::new(PulseEngine::new(config)),
            snapshots,
            audit,
        }
    }

    pub fn engine(&self) -> &PulseEngine {
        &self.engine
    }

    /// Analyze, then store the snapshot, the recommendations and any goal.
    ///
    /// Without a last period in the request, the latest stored snapshot from the previous
    /// seven-day window is used for trends.
    pub fn digest(&self, request: &AnalysisRequest) -> Result<DigestModel, PulseServiceError> {
        let stored = self.previous_snapshot(request)?;
        let digest = self
            .engine
            .analyze_with_history(request, stored.as_ref())?;

        self.snapshots.save(digest.snapshot.clone())?;
        let records = self
            .audit
            .record_recommendations(digest.date, &digest.recommendations)?;
        if let Some(goal) = &digest.goal {
            self.audit.record_goal(goal.clone())?;
        }

        let trend_source = if request.sourcing.last_period.is_some() {
            "request"
        } else if stored.is_some() {
            "repository"
        } else {
            "none"
        };
        info!(
            date = %digest.date,
            stored_recommendations = records.len(),
            trend_source,
            "digest persisted"
        );
        Ok(digest)
    }

    /// Answer-context for a chat question. Nothing is persisted.
    pub fn query(&self, request: &QueryRequest) -> Result<QueryContext, PulseServiceError> {
        let stored = self.previous_snapshot(&request.analysis)?;
        let digest = self
            .engine
            .analyze_with_history(&request.analysis, stored.as_ref())?;
        Ok(route_query(&request.question, &digest))
    }

    pub fn recommendations_for(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RecommendationRecord>, PulseServiceError> {
        Ok(self.audit.recommendations_for(date)?)
    }

    pub fn complete_recommendation(
        &self,
        id: u64,
    ) -> Result<RecommendationRecord, PulseServiceError> {
        let record = self.audit.complete_recommendation(id)?;
        info!(id, rule = %record.recommendation.rule_id, "recommendation completed");
        Ok(record)
    }

    pub fn goal_for(&self, week_start: NaiveDate) -> Result<WeeklyGoal, PulseServiceError> {
        self.audit
            .goal_for(week_start)?
            .ok_or(PulseServiceError::Repository(RepositoryError::NotFound))
    }

    fn previous_snapshot(
        &self,
        request: &AnalysisRequest,
    ) -> Result<Option<Snapshot>, PulseServiceError> {
        if request.sourcing.last_period.is_some() {
            return Ok(None);
        }
        let window = PeriodWindows::trailing(request.date).last_period;
        Ok(self.snapshots.latest_between(window.start, window.end)?)
    }
}

/// Error raised by the pulse service.
#[derive(Debug, thiserror::Error)]
pub enum PulseServiceError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
