use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::predicate::{Field, Value};
use super::RecommendationInput;
use crate::workflows::pulse::funnel::{FunnelResult, StuckCandidate};
use crate::workflows::pulse::snapshot::{OutreachTotals, SequenceSummary};

/// Which entities a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Once per run.
    Global,
    /// Each analyzed role, priority order.
    Role,
    /// The longest-stuck candidates of each role, at most `per_role` of them.
    StuckCandidate { per_role: usize },
    /// Each role key seen in this period's sequence stats.
    SourcingRole,
    Sender,
    Sequence,
    /// The sequence with the best reply rate among those past `min_sent`.
    TopSequence { min_sent: u32 },
}

/// Placeholder values for one matched entity.
pub type TemplateVars = BTreeMap<String, String>;

pub(crate) enum Entity<'a> {
    Global,
    Role(&'a FunnelResult),
    StuckCandidate {
        role: &'a FunnelResult,
        candidate: &'a StuckCandidate,
    },
    SourcingRole {
        key: &'a str,
        totals: &'a OutreachTotals,
    },
    Sender {
        name: &'a str,
        totals: &'a OutreachTotals,
    },
    Sequence(&'a SequenceSummary),
}

impl Scope {
    pub(crate) fn entities<'a>(&self, input: &RecommendationInput<'a>) -> Vec<Entity<'a>> {
        let snapshot = input.snapshot;
        match *self {
            Scope::Global => vec![Entity::Global],
            Scope::Role => input.funnels.iter().map(Entity::Role).collect(),
            Scope::StuckCandidate { per_role } => input
                .funnels
                .iter()
                .flat_map(|role| {
                    role.stuck
                        .iter()
                        .take(per_role)
                        .map(move |candidate| Entity::StuckCandidate { role, candidate })
                })
                .collect(),
            Scope::SourcingRole => snapshot
                .by_role
                .iter()
                .map(|(key, totals)| Entity::SourcingRole {
                    key: key.as_str(),
                    totals,
                })
                .collect(),
            Scope::Sender => snapshot
                .by_sender
                .iter()
                .map(|(name, totals)| Entity::Sender {
                    name: name.as_str(),
                    totals,
                })
                .collect(),
            Scope::Sequence => snapshot.by_sequence.values().map(Entity::Sequence).collect(),
            Scope::TopSequence { min_sent } => snapshot
                .by_sequence
                .values()
                .filter(|summary| summary.totals.sent > u64::from(min_sent))
                // max_by keeps the last maximum; reversed name order makes that the first name
                .rev()
                .max_by(|left, right| {
                    left.totals
                        .reply_rate()
                        .total_cmp(&right.totals.reply_rate())
                })
                .map(Entity::Sequence)
                .into_iter()
                .collect(),
        }
    }
}

impl<'a> Entity<'a> {
    pub(crate) fn key(&self) -> Option<String> {
        match self {
            Entity::Global => None,
            Entity::Role(role) => Some(role.role_id.clone()),
            Entity::StuckCandidate { role, candidate } => {
                Some(format!("{}/{}", role.role_id, candidate.candidate_id))
            }
            Entity::SourcingRole { key, .. } => Some((*key).to_string()),
            Entity::Sender { name, .. } => Some((*name).to_string()),
            Entity::Sequence(summary) => Some(summary.sequence.clone()),
        }
    }

    fn role(&self) -> Option<&'a FunnelResult> {
        match self {
            Entity::Role(role) | Entity::StuckCandidate { role, .. } => Some(*role),
            _ => None,
        }
    }
}

impl<'a> RecommendationInput<'a> {
    pub(crate) fn resolve(&self, field: &Field, entity: &Entity<'a>) -> Option<Value> {
        let snapshot = self.snapshot;
        match field {
            Field::TotalSent => Some(Value::Number(snapshot.totals.sent as f64)),
            Field::TotalReplyRate => Some(Value::Number(snapshot.totals.reply_rate())),
            Field::SentMomentum => self
                .trends
                .map(|trends| Value::Text(trends.sent.momentum.label().to_string())),
            Field::ReplyRateMomentum => self
                .trends
                .map(|trends| Value::Text(trends.reply_rate.momentum.label().to_string())),
            Field::RoleHealth => entity
                .role()
                .map(|role| Value::Text(role.health.label().to_string())),
            Field::RolePriorityRank => entity
                .role()
                .map(|role| Value::Number(f64::from(role.priority.rank()))),
            Field::RoleTopOfFunnel => entity
                .role()
                .map(|role| Value::Number(f64::from(role.top_of_funnel))),
            Field::RoleGapToHire => entity
                .role()
                .map(|role| Value::Number(f64::from(role.gap_to_hire))),
            Field::RoleBottleneck => entity.role().map(|role| Value::Flag(role.bottleneck)),
            Field::RoleStageCount(stage) => entity
                .role()
                .map(|role| Value::Number(f64::from(role.count_at(stage)))),
            Field::RoleSourcingSent => entity
                .role()
                .map(|role| Value::Number(self.role_sourcing(role).sent as f64)),
            Field::RoleStuckCount => entity
                .role()
                .map(|role| Value::Number(role.stuck.len() as f64)),
            Field::CandidateDaysInStage => match entity {
                Entity::StuckCandidate { candidate, .. } => {
                    Some(Value::Number(candidate.days_in_stage as f64))
                }
                _ => None,
            },
            Field::SourcingRoleSent => match entity {
                Entity::SourcingRole { totals, .. } => Some(Value::Number(totals.sent as f64)),
                _ => None,
            },
            Field::SourcingRoleReplyRate => match entity {
                Entity::SourcingRole { totals, .. } => Some(Value::Number(totals.reply_rate())),
                _ => None,
            },
            Field::SenderName => match entity {
                Entity::Sender { name, .. } => Some(Value::Text((*name).to_string())),
                _ => None,
            },
            Field::SenderSent => match entity {
                Entity::Sender { totals, .. } => Some(Value::Number(totals.sent as f64)),
                _ => None,
            },
            Field::SequenceSent => match entity {
                Entity::Sequence(summary) => Some(Value::Number(summary.totals.sent as f64)),
                _ => None,
            },
            Field::SequenceReplyRate => match entity {
                Entity::Sequence(summary) => Some(Value::Number(summary.totals.reply_rate())),
                _ => None,
            },
        }
    }

    pub(crate) fn vars(&self, entity: &Entity<'a>) -> TemplateVars {
        let mut vars = TemplateVars::new();
        let totals = &self.snapshot.totals;
        vars.insert("total_sent".to_string(), totals.sent.to_string());
        vars.insert(
            "reply_rate".to_string(),
            format!("{:.1}%", totals.reply_rate_pct()),
        );
        if let Some(trends) = self.trends {
            vars.insert(
                "reply_rate_now".to_string(),
                format!("{:.1}%", trends.reply_rate.this_period),
            );
            vars.insert(
                "reply_rate_before".to_string(),
                format!("{:.1}%", trends.reply_rate.last_period),
            );
        }

        match entity {
            Entity::Global => {}
            Entity::Role(role) => self.role_vars(role, &mut vars),
            Entity::StuckCandidate { role, candidate } => {
                self.role_vars(role, &mut vars);
                vars.insert("candidate".to_string(), candidate.name.clone());
                vars.insert("stage".to_string(), candidate.stage.clone());
                vars.insert("days".to_string(), candidate.days_in_stage.to_string());
                vars.insert("threshold".to_string(), candidate.threshold.to_string());
            }
            Entity::SourcingRole { key, totals } => {
                vars.insert("role".to_string(), (*key).to_string());
                outreach_vars(totals, &mut vars);
            }
            Entity::Sender { name, totals } => {
                vars.insert("sender".to_string(), (*name).to_string());
                outreach_vars(totals, &mut vars);
            }
            Entity::Sequence(summary) => {
                vars.insert("sequence".to_string(), summary.sequence.clone());
                vars.insert("role".to_string(), summary.role.clone());
                vars.insert("sender".to_string(), summary.sender.clone());
                outreach_vars(&summary.totals, &mut vars);
            }
        }
        vars
    }

    fn role_sourcing(&self, role: &FunnelResult) -> OutreachTotals {
        self.snapshot
            .sourcing_for(&role.sourcing_key)
            .copied()
            .unwrap_or_default()
    }

    fn role_vars(&self, role: &FunnelResult, vars: &mut TemplateVars) {
        vars.insert("role".to_string(), role.role_name.clone());
        vars.insert("role_id".to_string(), role.role_id.clone());
        vars.insert("priority".to_string(), role.priority.label());
        vars.insert("health".to_string(), role.health.label().to_string());
        vars.insert("top_of_funnel".to_string(), role.top_of_funnel.to_string());
        vars.insert("gap".to_string(), role.gap_to_hire.to_string());
        vars.insert(
            "screens_needed".to_string(),
            role.screens_still_needed.to_string(),
        );
        vars.insert(
            "bottleneck".to_string(),
            role.bottleneck_label
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        );
        vars.insert(
            "sourcing_sent".to_string(),
            self.role_sourcing(role).sent.to_string(),
        );
        for stage in &role.stages {
            vars.insert(format!("count:{}", stage.stage), stage.count.to_string());
        }
    }
}

fn outreach_vars(totals: &OutreachTotals, vars: &mut TemplateVars) {
    vars.insert("sent".to_string(), totals.sent.to_string());
    vars.insert("replied".to_string(), totals.replied.to_string());
    vars.insert(
        "reply_rate".to_string(),
        format!("{:.1}%", totals.reply_rate_pct()),
    );
}
