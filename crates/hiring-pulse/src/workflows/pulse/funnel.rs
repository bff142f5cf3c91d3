use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::AnalysisConfig;
use super::domain::{DataIssue, Health, ObservedRate, Priority, RateStatus};
use super::snapshot::{Candidate, Role, Snapshot, StageCount};

/// Candidates needed at the top of the funnel to produce one hire.
///
/// Zero, negative or non-finite rates are replaced by `floor` so a usable number always comes
/// back. The result is at least 1.
pub fn gap_to_hire(rates: &[f64], floor: f64) -> u32 {
    let product: f64 = rates.iter().map(|rate| effective_rate(*rate, floor)).product();
    if !(product > 0.0) {
        return u32::MAX;
    }
    // 1 / 0.5 must stay 2 even when the product carries rounding noise.
    let gap = (1.0 / product - 1e-9).ceil().max(1.0);
    gap as u32
}

fn effective_rate(rate: f64, floor: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate.min(1.0)
    } else {
        floor
    }
}

/// Whole days since the candidate entered the stage. Negative when `entered` is after `now`.
pub fn days_in_stage(now: DateTime<Utc>, entered: DateTime<Utc>) -> i64 {
    (now - entered).num_days()
}

/// Strict comparison: sitting exactly `threshold` days is still fine.
pub fn is_stuck(days: i64, threshold: u32) -> bool {
    days > i64::from(threshold)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionReport {
    pub from: String,
    pub to: String,
    pub label: String,
    pub observed: ObservedRate,
    pub effective: f64,
    pub status: RateStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StuckCandidate {
    pub candidate_id: String,
    pub name: String,
    pub stage: String,
    pub days_in_stage: i64,
    pub threshold: u32,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Per-role funnel math for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelResult {
    pub role_id: String,
    pub role_name: String,
    pub priority: Priority,
    pub sourcing_key: String,
    pub stages: Vec<StageCount>,
    pub transitions: Vec<TransitionReport>,
    pub top_of_funnel: u32,
    pub total_candidates: u32,
    pub gap_to_hire: u32,
    pub screens_still_needed: u32,
    pub bottleneck: bool,
    pub bottleneck_label: Option<String>,
    pub health: Health,
    pub stuck: Vec<StuckCandidate>,
}

impl FunnelResult {
    pub fn count_at(&self, stage: &str) -> u32 {
        self.stages
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    /// Division-guard notes for every transition the floor stood in for.
    pub fn issues(&self) -> Vec<DataIssue> {
        self.transitions
            .iter()
            .filter(|transition| {
                matches!(transition.status, RateStatus::Floored | RateStatus::Pending)
            })
            .map(|transition| {
                DataIssue::division_guard(
                    self.role_id.clone(),
                    format!(
                        "{} has no usable rate ({}), assumed {:.0}%",
                        transition.label,
                        transition.status.label(),
                        transition.effective * 100.0
                    ),
                )
            })
            .collect()
    }
}

/// Stateless analyzer applying the funnel and health policy to roles.
pub struct FunnelAnalyzer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> FunnelAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Every role in the snapshot, ordered by priority then name.
    pub fn analyze_snapshot(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<FunnelResult> {
        let mut results: Vec<FunnelResult> = snapshot
            .roles
            .iter()
            .map(|role| {
                let candidates: Vec<&Candidate> = snapshot.candidates_for(&role.id).collect();
                self.analyze(role, &candidates, now)
            })
            .collect();
        results.sort_by(|left, right| {
            left.priority
                .cmp(&right.priority)
                .then_with(|| left.role_name.cmp(&right.role_name))
                .then_with(|| left.role_id.cmp(&right.role_id))
        });
        results
    }

    pub fn analyze(
        &self,
        role: &Role,
        candidates: &[&Candidate],
        now: DateTime<Utc>,
    ) -> FunnelResult {
        let floor = self.config.funnel.conversion_floor;
        let transitions = self.transitions(role);
        let effective: Vec<f64> = transitions.iter().map(|entry| entry.effective).collect();
        let gap = gap_to_hire(&effective, floor);
        let top_of_funnel = role.top_of_funnel();
        let total_candidates = role.total_candidates();

        let weak_max = self.config.funnel.weak_conversion_max;
        let bottleneck = transitions.iter().any(|entry| match entry.status {
            RateStatus::Floored | RateStatus::Clamped => true,
            RateStatus::Observed | RateStatus::Derived => entry.effective <= weak_max,
            RateStatus::Pending => false,
        });
        let bottleneck_label = bottleneck
            .then(|| worst_transition(&transitions))
            .flatten();

        let health = self.health(&transitions, gap, top_of_funnel, total_candidates);
        let stuck = self.stuck_candidates(role, candidates, now);

        debug!(
            role = %role.id,
            gap,
            bottleneck,
            health = health.label(),
            stuck = stuck.len(),
            "funnel analyzed"
        );

        FunnelResult {
            role_id: role.id.clone(),
            role_name: role.name.clone(),
            priority: role.priority,
            sourcing_key: role.sourcing_key.clone(),
            stages: role.stages.clone(),
            transitions,
            top_of_funnel,
            total_candidates,
            gap_to_hire: gap,
            screens_still_needed: gap.saturating_sub(top_of_funnel),
            bottleneck,
            bottleneck_label,
            health,
            stuck,
        }
    }

    fn transitions(&self, role: &Role) -> Vec<TransitionReport> {
        let floor = self.config.funnel.conversion_floor;
        let count = role.transitions.len();
        role.transitions
            .iter()
            .enumerate()
            .map(|(index, transition)| {
                let terminal = count > 1 && index + 1 == count;
                let usable = transition.rate.value().filter(|value| *value > 0.0);
                let status = match (transition.rate, usable) {
                    (ObservedRate::Clamped { .. }, _) => RateStatus::Clamped,
                    (_, None) if terminal => RateStatus::Pending,
                    (_, None) => RateStatus::Floored,
                    (ObservedRate::Derived { .. }, Some(_)) => RateStatus::Derived,
                    (_, Some(_)) => RateStatus::Observed,
                };
                TransitionReport {
                    from: transition.from.clone(),
                    to: transition.to.clone(),
                    label: transition.label(),
                    observed: transition.rate,
                    effective: usable.unwrap_or(floor),
                    status,
                }
            })
            .collect()
    }

    fn health(
        &self,
        transitions: &[TransitionReport],
        gap: u32,
        top_of_funnel: u32,
        total_candidates: u32,
    ) -> Health {
        let policy = &self.config.health;
        let assessed: Vec<f64> = transitions
            .iter()
            .filter(|entry| entry.status != RateStatus::Pending)
            .map(|entry| entry.observed.value().unwrap_or(0.0))
            .collect();
        let gap = f64::from(gap);
        let top = f64::from(top_of_funnel);

        let red_rate = assessed.iter().any(|rate| *rate <= policy.red_conversion_max);
        if red_rate || gap > policy.critical_gap_multiple * top {
            return Health::Red;
        }
        let yellow_rate = assessed
            .iter()
            .any(|rate| *rate <= policy.yellow_conversion_max);
        if yellow_rate
            || gap > policy.moderate_gap_multiple * top
            || total_candidates < policy.min_active_candidates
        {
            return Health::Yellow;
        }
        Health::Green
    }

    fn stuck_candidates(
        &self,
        role: &Role,
        candidates: &[&Candidate],
        now: DateTime<Utc>,
    ) -> Vec<StuckCandidate> {
        let mut stuck: Vec<StuckCandidate> = candidates
            .iter()
            .filter_map(|candidate| {
                let threshold = role
                    .stuck_overrides
                    .get(&candidate.stage)
                    .copied()
                    .or_else(|| self.config.stuck_threshold(&candidate.stage))?;
                let days = days_in_stage(now, candidate.entered_stage_at);
                is_stuck(days, threshold).then(|| StuckCandidate {
                    candidate_id: candidate.id.clone(),
                    name: candidate.display_name().to_string(),
                    stage: candidate.stage.clone(),
                    days_in_stage: days,
                    threshold,
                    last_activity_at: candidate.last_activity_at,
                })
            })
            .collect();
        stuck.sort_by(|left, right| {
            right
                .days_in_stage
                .cmp(&left.days_in_stage)
                .then_with(|| left.candidate_id.cmp(&right.candidate_id))
        });
        stuck
    }
}

fn worst_transition(transitions: &[TransitionReport]) -> Option<String> {
    transitions
        .iter()
        .filter(|entry| entry.status != RateStatus::Pending)
        .min_by(|left, right| {
            let left = left.observed.value().unwrap_or(0.0);
            let right = right.observed.value().unwrap_or(0.0);
            left.total_cmp(&right)
        })
        .map(|entry| match entry.observed.value() {
            Some(value) => format!("{} ({:.0}%)", entry.label, value * 100.0),
            None => format!("{} (unknown)", entry.label),
        })
}
