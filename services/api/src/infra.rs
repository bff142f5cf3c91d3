use chrono::NaiveDate;
use hiring_pulse::workflows::pulse::{
    AuditRepository, Recommendation, RecommendationRecord, RepositoryError, SequenceStat,
    Snapshot, SnapshotRepository, WeeklyGoal,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} mutex poisoned")))
}

/// Process-local snapshot store keyed by date. Contents are lost on restart.
#[derive(Default, Clone)]
pub(crate) struct InMemorySnapshotRepository {
    snapshots: Arc<Mutex<BTreeMap<NaiveDate, Snapshot>>>,
}

impl SnapshotRepository for InMemorySnapshotRepository {
    fn save(&self, snapshot: Snapshot) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.snapshots, "snapshot")?;
        guard.insert(snapshot.date, snapshot);
        Ok(())
    }

    fn fetch(&self, date: NaiveDate) -> Result<Option<Snapshot>, RepositoryError> {
        let guard = lock(&self.snapshots, "snapshot")?;
        Ok(guard.get(&date).cloned())
    }

    fn latest_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Snapshot>, RepositoryError> {
        if start > end {
            return Ok(None);
        }
        let guard = lock(&self.snapshots, "snapshot")?;
        Ok(guard
            .range(start..=end)
            .next_back()
            .map(|(_, snapshot)| snapshot.clone()))
    }

    fn sequence_rows(&self, date: NaiveDate) -> Result<Vec<SequenceStat>, RepositoryError> {
        let guard = lock(&self.snapshots, "snapshot")?;
        Ok(guard
            .get(&date)
            .map(|snapshot| snapshot.sequences.clone())
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct AuditLog {
    next_id: u64,
    records: HashMap<u64, RecommendationRecord>,
    goals: BTreeMap<NaiveDate, WeeklyGoal>,
}

/// Process-local audit trail for recommendations and weekly goals.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAuditRepository {
    log: Arc<Mutex<AuditLog>>,
}

impl AuditRepository for InMemoryAuditRepository {
    fn record_recommendations(
        &self,
        date: NaiveDate,
        recommendations: &[Recommendation],
    ) -> Result<Vec<RecommendationRecord>, RepositoryError> {
        let mut guard = lock(&self.log, "audit")?;
        let log = &mut *guard;
        log.records.retain(|_, record| record.date != date);

        let mut stored = Vec::with_capacity(recommendations.len());
        for recommendation in recommendations {
            log.next_id += 1;
            let record = RecommendationRecord {
                id: log.next_id,
                date,
                completed: false,
                recommendation: recommendation.clone(),
            };
            log.records.insert(record.id, record.clone());
            stored.push(record);
        }
        Ok(stored)
    }

    fn recommendations_for(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RecommendationRecord>, RepositoryError> {
        let guard = lock(&self.log, "audit")?;
        let mut found: Vec<RecommendationRecord> = guard
            .records
            .values()
            .filter(|record| record.date == date)
            .cloned()
            .collect();
        found.sort_by_key(|record| record.id);
        Ok(found)
    }

    fn complete_recommendation(&self, id: u64) -> Result<RecommendationRecord, RepositoryError> {
        let mut guard = lock(&self.log, "audit")?;
        let record = guard.records.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.completed = true;
        Ok(record.clone())
    }

    fn record_goal(&self, goal: WeeklyGoal) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.log, "audit")?;
        guard.goals.insert(goal.week_start, goal);
        Ok(())
    }

    fn goal_for(&self, week_start: NaiveDate) -> Result<Option<WeeklyGoal>, RepositoryError> {
        let guard = lock(&self.log, "audit")?;
        Ok(guard.goals.get(&week_start).cloned())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
