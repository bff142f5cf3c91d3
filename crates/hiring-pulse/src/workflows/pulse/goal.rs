use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::allocation::Allocation;
use super::config::GoalPolicy;
use super::domain::Priority;
use super::funnel::FunnelResult;
use super::snapshot::Snapshot;
use super::trend::SourcingTrends;

/// Monday of the week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalMetric {
    RecruiterScreens,
}

impl GoalMetric {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RecruiterScreens => "recruiter screens",
        }
    }
}

/// Where the sourcing numbers behind a goal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    RoleTrend,
    RoleSnapshot,
    /// No role-level sourcing data: planned allocation and the overall reply rate.
    AllocationFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalInputs {
    pub gap_to_hire: u32,
    pub top_of_funnel: u32,
    pub screens_still_needed: u32,
    pub sent_volume: f64,
    pub reply_rate: f64,
    pub assumed_volume_lift: f64,
    pub stretch_factor: f64,
    pub projected_replies: f64,
    pub source: SignalSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyGoal {
    pub week_start: NaiveDate,
    pub role_id: String,
    pub role_name: String,
    pub priority: Priority,
    pub metric: GoalMetric,
    pub target: u32,
    pub rationale: String,
    pub inputs: GoalInputs,
}

/// Sourcing signals for the role the goal is written for.
pub struct GoalSignals<'a> {
    pub trends: Option<&'a SourcingTrends>,
    pub snapshot: &'a Snapshot,
    pub allocations: &'a [Allocation],
}

pub struct GoalGenerator<'a> {
    policy: &'a GoalPolicy,
}

impl<'a> GoalGenerator<'a> {
    pub fn new(policy: &'a GoalPolicy) -> Self {
        Self { policy }
    }

    /// Role with the largest gap to hire. Ties go to the higher priority, then the name.
    pub fn select_role<'f>(&self, funnels: &'f [FunnelResult]) -> Option<&'f FunnelResult> {
        funnels.iter().min_by(|left, right| {
            right
                .gap_to_hire
                .cmp(&left.gap_to_hire)
                .then_with(|| left.priority.cmp(&right.priority))
                .then_with(|| left.role_name.cmp(&right.role_name))
        })
    }

    pub fn generate(
        &self,
        week_start: NaiveDate,
        funnels: &[FunnelResult],
        signals: &GoalSignals<'_>,
    ) -> Option<WeeklyGoal> {
        let role = self.select_role(funnels)?;
        let (sent_volume, reply_rate, source) = resolve_signals(role, signals);

        let lift = self.policy.assumed_volume_lift;
        let stretch = self.policy.stretch_factor;
        let projected_replies = sent_volume * (1.0 + lift) * reply_rate;
        let stretched = (projected_replies * stretch).floor().max(0.0);
        let target = role.screens_still_needed.min(stretched.min(f64::from(u32::MAX)) as u32);

        let inputs = GoalInputs {
            gap_to_hire: role.gap_to_hire,
            top_of_funnel: role.top_of_funnel,
            screens_still_needed: role.screens_still_needed,
            sent_volume,
            reply_rate,
            assumed_volume_lift: lift,
            stretch_factor: stretch,
            projected_replies,
            source,
        };
        let rationale = rationale(role, &inputs, stretched, target);

        Some(WeeklyGoal {
            week_start,
            role_id: role.role_id.clone(),
            role_name: role.role_name.clone(),
            priority: role.priority,
            metric: GoalMetric::RecruiterScreens,
            target,
            rationale,
            inputs,
        })
    }
}

fn resolve_signals(role: &FunnelResult, signals: &GoalSignals<'_>) -> (f64, f64, SignalSource) {
    if let Some(trend) = signals
        .trends
        .and_then(|trends| trends.by_role.get(&role.sourcing_key))
        .filter(|trend| trend.sent.this_period > 0.0)
    {
        return (
            trend.sent.this_period,
            trend.reply_rate.this_period / 100.0,
            SignalSource::RoleTrend,
        );
    }
    if let Some(totals) = signals
        .snapshot
        .sourcing_for(&role.sourcing_key)
        .filter(|totals| totals.sent > 0)
    {
        return (
            totals.sent as f64,
            totals.reply_rate(),
            SignalSource::RoleSnapshot,
        );
    }
    let planned = signals
        .allocations
        .iter()
        .find(|allocation| allocation.role_id == role.role_id)
        .map(|allocation| f64::from(allocation.outreaches))
        .unwrap_or(0.0);
    (
        planned,
        signals.snapshot.totals.reply_rate(),
        SignalSource::AllocationFallback,
    )
}

fn rationale(role: &FunnelResult, inputs: &GoalInputs, stretched: f64, target: u32) -> String {
    let volume = match inputs.source {
        SignalSource::RoleTrend | SignalSource::RoleSnapshot => {
            format!("{:.0} outreaches sent this period", inputs.sent_volume)
        }
        SignalSource::AllocationFallback => format!(
            "{:.0} planned outreaches (no role-level sourcing data)",
            inputs.sent_volume
        ),
    };
    let cap = if target < stretched as u32 {
        format!(", capped at the {} screens still needed", inputs.screens_still_needed)
    } else {
        String::new()
    };
    format!(
        "{} has the largest gap to hire ({} candidates needed, {} in the first stage, {} more screens). \
         {} x {:.2} volume lift x {:.1}% reply rate projects {:.1} replies; \
         x{:.2} stretch gives {:.0}{}. Target: {} {}.",
        role.role_name,
        inputs.gap_to_hire,
        inputs.top_of_funnel,
        inputs.screens_still_needed,
        volume,
        1.0 + inputs.assumed_volume_lift,
        inputs.reply_rate * 100.0,
        inputs.projected_replies,
        inputs.stretch_factor,
        stretched,
        cap,
        target,
        GoalMetric::RecruiterScreens.label(),
    )
}
