//! Hiring-pulse analytics: funnel math, sourcing allocation, momentum, rule-driven
//! recommendations and the weekly goal, assembled into one digest per date.
//!
//! The engine is pure and synchronous. Callers pass the reference time explicitly; storage
//! and HTTP live behind [`repository`] traits and [`router`].

pub mod allocation;
pub mod config;
pub mod digest;
pub mod domain;
pub mod funnel;
pub mod goal;
pub mod query;
pub mod recommend;
pub mod repository;
pub mod router;
pub mod service;
pub mod snapshot;
pub mod trend;

#[cfg(test)]
mod tests;

pub use allocation::{allocate, Allocation, AllocationRequest, SourcingAllocator};
pub use config::{
    AllocationPolicy, AnalysisConfig, FunnelPolicy, GoalPolicy, HealthPolicy, PolicyError,
    RecommendationPolicy,
};
pub use digest::{
    analyze, ActionItem, AnalysisRequest, DigestModel, Highlights, PipelineSummary, PulseEngine,
    SourcingOverview, StakeholderPlan,
};
pub use domain::{
    ActionCategory, AnalysisError, DataIssue, Health, IssueKind, ObservedRate, Priority,
    RateStatus, RecommendationPriority, Stakeholder,
};
pub use funnel::{gap_to_hire, FunnelAnalyzer, FunnelResult, StuckCandidate, TransitionReport};
pub use goal::{week_start_of, GoalGenerator, GoalInputs, GoalMetric, WeeklyGoal};
pub use query::{route_query, QueryContext, QueryTopic};
pub use recommend::{
    Recommendation, RecommendationEngine, RecommendationInput, RuleSet, StakeholderAction,
};
pub use repository::{AuditRepository, RecommendationRecord, RepositoryError, SnapshotRepository};
pub use router::pulse_router;
pub use service::{PulseService, PulseServiceError, QueryRequest};
pub use snapshot::{
    CandidateInput, ConversionRateInput, OutreachTotals, PipelineData, RoleInput, SequenceStat,
    SequenceStatInput, Snapshot, SnapshotBuilder, SourcingData, SourcingPeriod, StageCountInput,
};
pub use trend::{
    classify, classify_change, compare_snapshots, latest_in, DateRange, Momentum,
    PeriodWindows, SourcingTrends, TrendResult,
};
