use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::pulse::config::AnalysisConfig;
use crate::workflows::pulse::digest::AnalysisRequest;
use crate::workflows::pulse::domain::{Health, Priority};
use crate::workflows::pulse::funnel::{FunnelAnalyzer, FunnelResult};
use crate::workflows::pulse::goal::WeeklyGoal;
use crate::workflows::pulse::recommend::Recommendation;
use crate::workflows::pulse::repository::{
    AuditRepository, RecommendationRecord, RepositoryError, SnapshotRepository,
};
use crate::workflows::pulse::snapshot::{
    CandidateInput, ConversionRateInput, PipelineData, RoleInput, SequenceStat,
    SequenceStatInput, Snapshot, SnapshotBuilder, SourcingData, SourcingPeriod, StageCountInput,
};
use crate::workflows::pulse::PulseService;

pub(super) const STAGES: [&str; 6] = [
    "Recruiter Screen",
    "HM Screen",
    "Testing",
    "Onsite",
    "Offer",
    "Hired",
];

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Wednesday.
pub(super) fn as_of() -> NaiveDate {
    date(2025, 1, 15)
}

pub(super) fn now() -> DateTime<Utc> {
    at(2025, 1, 15, 12)
}

pub(super) fn week_start() -> NaiveDate {
    date(2025, 1, 13)
}

pub(super) fn priority(rank: u8) -> Priority {
    Priority::new(rank).expect("valid priority")
}

pub(super) fn config() -> AnalysisConfig {
    AnalysisConfig::default()
}

pub(super) fn role_input(
    id: &str,
    name: &str,
    rank: u8,
    sourcing_key: &str,
    counts: [u32; 6],
    rates: [f64; 5],
) -> RoleInput {
    RoleInput {
        id: id.to_string(),
        name: name.to_string(),
        priority: priority(rank),
        sourcing_key: Some(sourcing_key.to_string()),
        stages: STAGES
            .iter()
            .zip(counts)
            .map(|(stage, count)| StageCountInput {
                stage: stage.to_string(),
                count,
            })
            .collect(),
        conversion_rates: STAGES
            .windows(2)
            .zip(rates)
            .map(|(pair, rate)| ConversionRateInput {
                from: pair[0].to_string(),
                to: pair[1].to_string(),
                rate: Some(rate),
            })
            .collect(),
        stuck_overrides: BTreeMap::new(),
    }
}

/// Healthy: gap 17 with 30 at the top.
pub(super) fn ai_role() -> RoleInput {
    role_input(
        "ai-engineer",
        "Senior AI Engineer",
        1,
        "AI Engineer",
        [30, 12, 6, 3, 2, 0],
        [0.5, 0.5, 0.6, 0.5, 0.8],
    )
}

/// Bottlenecked at HM Screen→Testing (10%): gap 267.
pub(super) fn gtm_role() -> RoleInput {
    role_input(
        "gtm",
        "GTM Engineer",
        2,
        "GTM",
        [10, 3, 1, 1, 0, 0],
        [0.3, 0.1, 0.5, 0.5, 0.5],
    )
}

/// Bottlenecked at Onsite→Offer (12%): gap 334.
pub(super) fn full_stack_role() -> RoleInput {
    role_input(
        "full-stack",
        "Senior Full Stack Engineer",
        1,
        "Full Stack",
        [40, 10, 4, 2, 0, 0],
        [0.25, 0.4, 0.5, 0.12, 0.5],
    )
}

pub(super) fn candidate(
    id: &str,
    name: &str,
    role_id: &str,
    stage: &str,
    entered: DateTime<Utc>,
) -> CandidateInput {
    CandidateInput {
        id: id.to_string(),
        name: Some(name.to_string()),
        role_id: role_id.to_string(),
        stage: stage.to_string(),
        entered_stage_at: entered,
        last_activity_at: None,
    }
}

pub(super) fn candidates() -> Vec<CandidateInput> {
    vec![
        // 10 days in HM Screen, limit 7
        candidate("c-ada", "Ada", "ai-engineer", "HM Screen", at(2025, 1, 5, 12)),
        candidate("c-grace", "Grace", "full-stack", "Recruiter Screen", at(2025, 1, 13, 9)),
        // alias of Onsite, 7 days against a limit of 5
        candidate("c-linus", "Linus", "full-stack", "Onsite Loop", at(2025, 1, 8, 12)),
        // exactly at the Offer limit of 3 days
        candidate("c-barbara", "Barbara", "gtm", "Offer", at(2025, 1, 12, 12)),
    ]
}

pub(super) fn pipeline() -> PipelineData {
    PipelineData {
        roles: vec![ai_role(), gtm_role(), full_stack_role()],
        candidates: candidates(),
    }
}

pub(super) fn stat(
    sequence: &str,
    role: &str,
    sender: &str,
    day: NaiveDate,
    sent: u32,
    replied: u32,
) -> SequenceStatInput {
    SequenceStatInput {
        sequence: sequence.to_string(),
        role: role.to_string(),
        sender: sender.to_string(),
        date: day,
        sent,
        opened: sent / 2,
        clicked: sent / 10,
        replied,
        bounced: 0,
    }
}

/// 120 sent, 13 replied.
pub(super) fn this_period() -> Vec<SequenceStatInput> {
    vec![
        stat("Sr. AI Engineer - Drew", "AI Engineer", "Drew", as_of(), 60, 10),
        stat("Sr. Full Stack - Blessing", "Full Stack", "Blessing", as_of(), 50, 2),
        stat("GTM Outbound", "GTM", "Blessing", as_of(), 10, 1),
    ]
}

/// 100 sent, 16 replied.
pub(super) fn last_period() -> SourcingPeriod {
    let day = date(2025, 1, 8);
    SourcingPeriod {
        date: day,
        stats: vec![
            stat("Sr. AI Engineer - Drew", "AI Engineer", "Drew", day, 50, 10),
            stat("Sr. Full Stack - Blessing", "Full Stack", "Blessing", day, 40, 4),
            stat("GTM Outbound", "GTM", "Blessing", day, 10, 2),
        ],
    }
}

pub(super) fn request() -> AnalysisRequest {
    AnalysisRequest {
        date: as_of(),
        now: now(),
        week_start: Some(week_start()),
        pipeline: pipeline(),
        sourcing: SourcingData {
            this_period: this_period(),
            last_period: Some(last_period()),
        },
    }
}

pub(super) fn snapshot() -> Snapshot {
    let config = config();
    SnapshotBuilder::new(&config)
        .build(as_of(), &pipeline(), &this_period())
        .expect("fixture snapshot builds")
        .snapshot
}

pub(super) fn last_snapshot() -> Snapshot {
    let config = config();
    let period = last_period();
    SnapshotBuilder::new(&config)
        .sourcing_only(period.date, &period.stats)
        .expect("fixture comparison snapshot builds")
        .snapshot
}

pub(super) fn funnels(snapshot: &Snapshot) -> Vec<FunnelResult> {
    let config = config();
    FunnelAnalyzer::new(&config).analyze_snapshot(snapshot, now())
}

pub(super) fn funnel_of<'a>(funnels: &'a [FunnelResult], role_id: &str) -> &'a FunnelResult {
    funnels
        .iter()
        .find(|funnel| funnel.role_id == role_id)
        .expect("role analyzed")
}

/// Bare funnel result for allocation and goal tests.
pub(super) fn funnel(
    role_id: &str,
    role_name: &str,
    rank: u8,
    gap_to_hire: u32,
    top_of_funnel: u32,
    health: Health,
) -> FunnelResult {
    FunnelResult {
        role_id: role_id.to_string(),
        role_name: role_name.to_string(),
        priority: priority(rank),
        sourcing_key: role_name.to_string(),
        stages: Vec::new(),
        transitions: Vec::new(),
        top_of_funnel,
        total_candidates: top_of_funnel,
        gap_to_hire,
        screens_still_needed: gap_to_hire.saturating_sub(top_of_funnel),
        bottleneck: false,
        bottleneck_label: None,
        health,
        stuck: Vec::new(),
    }
}

pub(super) fn build_service() -> (
    PulseService<MemorySnapshots, MemoryAudit>,
    Arc<MemorySnapshots>,
    Arc<MemoryAudit>,
) {
    let snapshots = Arc::new(MemorySnapshots::default());
    let audit = Arc::new(MemoryAudit::default());
    let service = PulseService::new(snapshots.clone(), audit.clone(), config());
    (service, snapshots, audit)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default, Clone)]
pub(super) struct MemorySnapshots {
    pub(super) snapshots: Arc<Mutex<BTreeMap<NaiveDate, Snapshot>>>,
}

impl MemorySnapshots {
    pub(super) fn dates(&self) -> Vec<NaiveDate> {
        self.snapshots
            .lock()
            .expect("snapshot mutex poisoned")
            .keys()
            .copied()
            .collect()
    }
}

impl SnapshotRepository for MemorySnapshots {
    fn save(&self, snapshot: Snapshot) -> Result<(), RepositoryError> {
        let mut guard = self.snapshots.lock().expect("snapshot mutex poisoned");
        guard.insert(snapshot.date, snapshot);
        Ok(())
    }

    fn fetch(&self, date: NaiveDate) -> Result<Option<Snapshot>, RepositoryError> {
        let guard = self.snapshots.lock().expect("snapshot mutex poisoned");
        Ok(guard.get(&date).cloned())
    }

    fn latest_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Snapshot>, RepositoryError> {
        let guard = self.snapshots.lock().expect("snapshot mutex poisoned");
        Ok(guard
            .range(start..=end)
            .next_back()
            .map(|(_, snapshot)| snapshot.clone()))
    }

    fn sequence_rows(&self, date: NaiveDate) -> Result<Vec<SequenceStat>, RepositoryError> {
        let guard = self.snapshots.lock().expect("snapshot mutex poisoned");
        Ok(guard
            .get(&date)
            .map(|snapshot| snapshot.sequences.clone())
            .unwrap_or_default())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAudit {
    records: Arc<Mutex<HashMap<u64, RecommendationRecord>>>,
    goals: Arc<Mutex<BTreeMap<NaiveDate, WeeklyGoal>>>,
    next_id: Arc<Mutex<u64>>,
}

impl AuditRepository for MemoryAudit {
    fn record_recommendations(
        &self,
        date: NaiveDate,
        recommendations: &[Recommendation],
    ) -> Result<Vec<RecommendationRecord>, RepositoryError> {
        let mut records = self.records.lock().expect("audit mutex poisoned");
        let mut next_id = self.next_id.lock().expect("audit mutex poisoned");
        records.retain(|_, record| record.date != date);
        let stored: Vec<RecommendationRecord> = recommendations
            .iter()
            .map(|recommendation| {
                *next_id += 1;
                RecommendationRecord {
                    id: *next_id,
                    date,
                    completed: false,
                    recommendation: recommendation.clone(),
                }
            })
            .collect();
        for record in &stored {
            records.insert(record.id, record.clone());
        }
        Ok(stored)
    }

    fn recommendations_for(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RecommendationRecord>, RepositoryError> {
        let records = self.records.lock().expect("audit mutex poisoned");
        let mut found: Vec<RecommendationRecord> = records
            .values()
            .filter(|record| record.date == date)
            .cloned()
            .collect();
        found.sort_by_key(|record| record.id);
        Ok(found)
    }

    fn complete_recommendation(&self, id: u64) -> Result<RecommendationRecord, RepositoryError> {
        let mut records = self.records.lock().expect("audit mutex poisoned");
        let record = records.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.completed = true;
        Ok(record.clone())
    }

    fn record_goal(&self, goal: WeeklyGoal) -> Result<(), RepositoryError> {
        let mut goals = self.goals.lock().expect("audit mutex poisoned");
        goals.insert(goal.week_start, goal);
        Ok(())
    }

    fn goal_for(&self, week_start: NaiveDate) -> Result<Option<WeeklyGoal>, RepositoryError> {
        let goals = self.goals.lock().expect("audit mutex poisoned");
        Ok(goals.get(&week_start).cloned())
    }
}

pub(super) struct UnavailableSnapshots;

impl SnapshotRepository for UnavailableSnapshots {
    fn save(&self, _snapshot: Snapshot) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("snapshot store offline".to_string()))
    }

    fn fetch(&self, _date: NaiveDate) -> Result<Option<Snapshot>, RepositoryError> {
        Err(RepositoryError::Unavailable("snapshot store offline".to_string()))
    }

    fn latest_between(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Option<Snapshot>, RepositoryError> {
        Err(RepositoryError::Unavailable("snapshot store offline".to_string()))
    }

    fn sequence_rows(&self, _date: NaiveDate) -> Result<Vec<SequenceStat>, RepositoryError> {
        Err(RepositoryError::Unavailable("snapshot store offline".to_string()))
    }
}
