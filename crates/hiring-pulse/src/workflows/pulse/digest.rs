use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::allocation::{Allocation, SourcingAllocator};
use super::config::AnalysisConfig;
use super::domain::{
    ActionCategory, AnalysisError, DataIssue, Health, RecommendationPriority, Stakeholder,
};
use super::funnel::{FunnelAnalyzer, FunnelResult};
use super::goal::{GoalGenerator, GoalSignals, WeeklyGoal};
use super::recommend::{Recommendation, RecommendationEngine, RecommendationInput};
use super::snapshot::{OutreachTotals, PipelineData, Snapshot, SnapshotBuilder, SourcingData};
use super::trend::{compare_snapshots, SourcingTrends};

/// Everything one analysis run needs, with the clock passed in explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub date: NaiveDate,
    pub now: DateTime<Utc>,
    /// Set to produce a weekly goal for the week starting on this date.
    #[serde(default)]
    pub week_start: Option<NaiveDate>,
    pub pipeline: PipelineData,
    #[serde(default)]
    pub sourcing: SourcingData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub roles: usize,
    pub active_candidates: u32,
    pub screens_still_needed: u32,
    pub stuck_candidates: usize,
    pub bottlenecked_roles: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcingOverview {
    pub totals: OutreachTotals,
    pub reply_rate_pct: f64,
    pub trends: Option<SourcingTrends>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlights {
    pub working: Vec<String>,
    pub needs_attention: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub number: usize,
    pub category: ActionCategory,
    pub priority: RecommendationPriority,
    pub action: String,
    pub insight: String,
    pub rule_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeholderPlan {
    pub stakeholder: Stakeholder,
    pub items: Vec<ActionItem>,
}

/// Full result of one run, ready for a formatter or a chat responder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestModel {
    pub date: NaiveDate,
    pub now: DateTime<Utc>,
    pub summary: PipelineSummary,
    pub roles: Vec<FunnelResult>,
    pub sourcing: SourcingOverview,
    pub allocations: Vec<Allocation>,
    pub highlights: Highlights,
    pub recommendations: Vec<Recommendation>,
    pub action_plans: Vec<StakeholderPlan>,
    pub goal: Option<WeeklyGoal>,
    pub issues: Vec<DataIssue>,
    pub snapshot: Snapshot,
}

impl DigestModel {
    pub fn role(&self, role_id: &str) -> Option<&FunnelResult> {
        self.roles.iter().find(|role| role.role_id == role_id)
    }

    pub fn plan_for(&self, stakeholder: Stakeholder) -> Option<&StakeholderPlan> {
        self.action_plans
            .iter()
            .find(|plan| plan.stakeholder == stakeholder)
    }
}

/// Engine facade holding the read-only policy and rule table.
pub struct PulseEngine {
    config: AnalysisConfig,
    recommendations: RecommendationEngine,
}

impl PulseEngine {
    pub fn new(config: AnalysisConfig) -> Self {
        let recommendations = RecommendationEngine::standard(&config.recommendations);
        Self::with_rules(config, recommendations)
    }

    pub fn with_rules(config: AnalysisConfig, recommendations: RecommendationEngine) -> Self {
        Self {
            config,
            recommendations,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the whole flow for one date.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<DigestModel, AnalysisError> {
        self.analyze_with_history(request, None)
    }

    /// Like [`PulseEngine::analyze`], comparing against `stored_previous` when the request
    /// carries no last period of its own.
    pub fn analyze_with_history(
        &self,
        request: &AnalysisRequest,
        stored_previous: Option<&Snapshot>,
    ) -> Result<DigestModel, AnalysisError> {
        let builder = SnapshotBuilder::new(&self.config);
        let built = builder.build(
            request.date,
            &request.pipeline,
            &request.sourcing.this_period,
        )?;
        let mut issues = built.issues;

        let supplied = match &request.sourcing.last_period {
            Some(period) => {
                let last = builder.sourcing_only(period.date, &period.stats)?;
                issues.extend(last.issues);
                Some(last.snapshot)
            }
            None => None,
        };
        let previous = supplied.as_ref().or(stored_previous);
        Ok(self.assemble(request, built.snapshot, previous, issues))
    }

    fn assemble(
        &self,
        request: &AnalysisRequest,
        snapshot: Snapshot,
        previous: Option<&Snapshot>,
        mut issues: Vec<DataIssue>,
    ) -> DigestModel {
        let roles = FunnelAnalyzer::new(&self.config).analyze_snapshot(&snapshot, request.now);
        issues.extend(roles.iter().flat_map(FunnelResult::issues));

        let trends = previous.map(|last| compare_snapshots(&snapshot, last));
        let allocations = SourcingAllocator::new(&self.config.allocation).plan(&roles);

        let recommendations = self.recommendations.recommend(&RecommendationInput {
            funnels: &roles,
            snapshot: &snapshot,
            trends: trends.as_ref(),
        });

        let goal = request.week_start.and_then(|week_start| {
            GoalGenerator::new(&self.config.goal).generate(
                week_start,
                &roles,
                &GoalSignals {
                    trends: trends.as_ref(),
                    snapshot: &snapshot,
                    allocations: &allocations,
                },
            )
        });

        for issue in &issues {
            warn!(
                kind = issue.kind.label(),
                entity = %issue.entity,
                detail = %issue.detail,
                "data issue"
            );
        }

        let summary = PipelineSummary {
            roles: roles.len(),
            active_candidates: roles
                .iter()
                .fold(0u32, |total, role| total.saturating_add(role.total_candidates)),
            screens_still_needed: roles.iter().fold(0u32, |total, role| {
                total.saturating_add(role.screens_still_needed)
            }),
            stuck_candidates: roles.iter().map(|role| role.stuck.len()).sum(),
            bottlenecked_roles: roles.iter().filter(|role| role.bottleneck).count(),
        };
        let highlights = highlights(&roles, trends.as_ref());
        let action_plans = action_plans(
            &recommendations,
            self.config.recommendations.actions_per_stakeholder,
        );

        info!(
            date = %request.date,
            roles = summary.roles,
            recommendations = recommendations.len(),
            issues = issues.len(),
            goal = goal.is_some(),
            "digest assembled"
        );

        DigestModel {
            date: request.date,
            now: request.now,
            summary,
            sourcing: SourcingOverview {
                totals: snapshot.totals,
                reply_rate_pct: snapshot.totals.reply_rate_pct(),
                trends,
            },
            roles,
            allocations,
            highlights,
            recommendations,
            action_plans,
            goal,
            issues,
            snapshot,
        }
    }
}

/// One-shot convenience over [`PulseEngine`].
pub fn analyze(
    request: &AnalysisRequest,
    config: &AnalysisConfig,
) -> Result<DigestModel, AnalysisError> {
    PulseEngine::new(config.clone()).analyze(request)
}

fn highlights(roles: &[FunnelResult], trends: Option<&SourcingTrends>) -> Highlights {
    let mut highlights = Highlights::default();

    if let Some(trends) = trends {
        for trend in [&trends.sent, &trends.reply_rate] {
            let line = match trend.percent_change {
                Some(change) => format!(
                    "{} {} ({:+.0}%)",
                    metric_label(&trend.metric),
                    trend.momentum.label(),
                    change
                ),
                None => format!("{} new this period", metric_label(&trend.metric)),
            };
            if trend.momentum.is_improving() {
                highlights.working.push(line);
            } else if trend.momentum.is_declining() {
                highlights.needs_attention.push(line);
            }
        }
    }

    for role in roles {
        match role.health {
            Health::Green => highlights
                .working
                .push(format!("{} pipeline is healthy", role.role_name)),
            Health::Red => highlights.needs_attention.push(match &role.bottleneck_label {
                Some(label) => format!("{} pipeline is red, bottleneck at {label}", role.role_name),
                None => format!("{} pipeline is red", role.role_name),
            }),
            Health::Yellow => {}
        }
        if !role.stuck.is_empty() {
            highlights.needs_attention.push(format!(
                "{} has {} stuck candidate(s)",
                role.role_name,
                role.stuck.len()
            ));
        }
    }
    highlights
}

fn metric_label(metric: &str) -> &str {
    match metric {
        "sent" => "Outreach volume",
        "reply_rate" => "Reply rate",
        "replied" => "Replies",
        other => other,
    }
}

fn action_plans(recommendations: &[Recommendation], limit: usize) -> Vec<StakeholderPlan> {
    Stakeholder::ordered()
        .into_iter()
        .map(|stakeholder| StakeholderPlan {
            stakeholder,
            items: recommendations
                .iter()
                .filter_map(|recommendation| {
                    recommendation
                        .action_for(stakeholder)
                        .map(|action| (recommendation, action))
                })
                .take(limit)
                .enumerate()
                .map(|(index, (recommendation, action))| ActionItem {
                    number: index + 1,
                    category: recommendation.category,
                    priority: recommendation.priority,
                    action: action.to_string(),
                    insight: recommendation.insight.clone(),
                    rule_id: recommendation.rule_id.clone(),
                })
                .collect(),
        })
        .collect()
}
