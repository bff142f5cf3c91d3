mod predicate;
mod rules;
mod scope;

pub use predicate::{Comparison, Condition, Field, Operand, Predicate, Value};
pub use rules::{ActionTemplate, Rule, RuleSet, Template};
pub use scope::{Scope, TemplateVars};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::RecommendationPolicy;
use super::domain::{ActionCategory, RecommendationPriority, Stakeholder};
use super::funnel::FunnelResult;
use super::snapshot::Snapshot;
use super::trend::SourcingTrends;

/// Combined dataset the rules read.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInput<'a> {
    pub funnels: &'a [FunnelResult],
    pub snapshot: &'a Snapshot,
    pub trends: Option<&'a SourcingTrends>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeholderAction {
    pub stakeholder: Stakeholder,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rule_id: String,
    pub priority: RecommendationPriority,
    pub category: ActionCategory,
    pub insight: String,
    pub actions: Vec<StakeholderAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_key: Option<String>,
}

impl Recommendation {
    pub fn action_for(&self, stakeholder: Stakeholder) -> Option<&str> {
        self.actions
            .iter()
            .find(|entry| entry.stakeholder == stakeholder)
            .map(|entry| entry.action.as_str())
    }
}

/// Stateless evaluator running every rule over the combined dataset.
pub struct RecommendationEngine {
    rules: RuleSet,
}

impl RecommendationEngine {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn standard(policy: &RecommendationPolicy) -> Self {
        Self::new(RuleSet::standard(policy))
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Ordered by priority, then rule declaration order, then entity key. Global rules carry no
    /// key and sort ahead of keyed ones.
    pub fn recommend(&self, input: &RecommendationInput<'_>) -> Vec<Recommendation> {
        let mut fired: Vec<(u8, usize, Recommendation)> = Vec::new();

        for (index, rule) in self.rules.rules().iter().enumerate() {
            let before = fired.len();
            for entity in rule.scope.entities(input) {
                if !rule
                    .predicate
                    .evaluate(|field| input.resolve(field, &entity))
                {
                    continue;
                }
                let vars = input.vars(&entity);
                let recommendation = Recommendation {
                    rule_id: rule.id.clone(),
                    priority: rule.priority,
                    category: rule.category,
                    insight: rule.insight.render(&vars),
                    actions: rule
                        .actions
                        .iter()
                        .map(|action| StakeholderAction {
                            stakeholder: action.stakeholder,
                            action: action.template.render(&vars),
                        })
                        .collect(),
                    entity_key: entity.key(),
                };
                fired.push((rule.priority.rank(), index, recommendation));
            }
            debug!(rule = %rule.id, fired = fired.len() - before, "rule evaluated");
        }

        fired.sort_by(|(rank, index, left), (other_rank, other_index, right)| {
            (rank, index)
                .cmp(&(other_rank, other_index))
                .then_with(|| left.entity_key.cmp(&right.entity_key))
        });
        fired
            .into_iter()
            .map(|(_, _, recommendation)| recommendation)
            .collect()
    }
}
