use serde::{Deserialize, Serialize};

use super::predicate::{Field, Predicate};
use super::scope::{Scope, TemplateVars};
use crate::workflows::pulse::config::RecommendationPolicy;
use crate::workflows::pulse::domain::{ActionCategory, RecommendationPriority, Stakeholder};

/// Text with `{name}` placeholders filled from the matched entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template(String);

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unknown placeholders are left in place.
    pub fn render(&self, vars: &TemplateVars) -> String {
        let mut rendered = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();
        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    match vars.get(name) {
                        Some(value) => rendered.push_str(value),
                        None => {
                            rendered.push('{');
                            rendered.push_str(name);
                            rendered.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    rendered.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        rendered.push_str(rest);
        rendered
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTemplate {
    pub stakeholder: Stakeholder,
    pub template: Template,
}

/// Declarative rule record: where it looks, what must hold, what it says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub priority: RecommendationPriority,
    pub category: ActionCategory,
    pub scope: Scope,
    pub predicate: Predicate,
    pub insight: Template,
    pub actions: Vec<ActionTemplate>,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        priority: RecommendationPriority,
        category: ActionCategory,
        scope: Scope,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            category,
            scope,
            predicate: Predicate::always(),
            insight: Template::new(""),
            actions: Vec::new(),
        }
    }

    pub fn when(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn insight(mut self, text: impl Into<String>) -> Self {
        self.insight = Template::new(text);
        self
    }

    pub fn action(mut self, stakeholder: Stakeholder, text: impl Into<String>) -> Self {
        self.actions.push(ActionTemplate {
            stakeholder,
            template: Template::new(text),
        });
        self
    }
}

/// Ordered rule list. Declaration order breaks ties between equal priorities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Daily hiring-pulse rules with thresholds taken from the policy.
    pub fn standard(policy: &RecommendationPolicy) -> Self {
        use ActionCategory as Category;
        use RecommendationPriority::{High, Low, Medium};
        use Stakeholder::{Recruiter, Sourcer};

        let hm_stage = policy.hm_screen_stage.as_str();
        let onsite_stage = policy.onsite_stage.as_str();

        let mut rules = vec![
            Rule::new(
                "stuck-candidate",
                High,
                Category::FollowUp,
                Scope::StuckCandidate {
                    per_role: policy.stuck_alerts_per_role,
                },
            )
            .insight("{candidate} has been in {stage} for {days} days (limit {threshold})")
            .action(
                Recruiter,
                "Follow up on {candidate} for {role}: move forward or archive",
            ),
            Rule::new("hm-screen-backlog", High, Category::Screen, Scope::Role)
                .when(Predicate::all([
                    Field::RoleStageCount(hm_stage.to_string()).greater_than(0.0)
                ]))
                .insight(format!(
                    "{{count:{hm_stage}}} {{role}} candidate(s) waiting for {hm_stage}"
                ))
                .action(
                    Recruiter,
                    format!("Schedule {hm_stage}s for {{role}} candidates this week"),
                ),
            Rule::new("weekly-volume-short", High, Category::Sourcing, Scope::Global)
                .when(Predicate::all([
                    Field::TotalSent.greater_than(0.0),
                    Field::TotalSent.less_than(f64::from(policy.min_weekly_sent)),
                ]))
                .insight(format!(
                    "Only {{total_sent}} outreaches this period (target: {})",
                    policy.min_weekly_sent
                ))
                .action(
                    Sourcer,
                    format!(
                        "Increase daily outreach volume to hit the {}/week target",
                        policy.min_weekly_sent
                    ),
                ),
            Rule::new(
                "unhealthy-role-low-sourcing",
                High,
                Category::Sourcing,
                Scope::Role,
            )
            .when(Predicate::all([
                Field::TotalSent.greater_than(0.0),
                Field::RoleHealth.one_of(["red", "yellow"]),
                Field::RoleSourcingSent.less_than(f64::from(policy.unhealthy_role_min_sent)),
            ]))
            .insight(
                "{role} pipeline is {health} and sourcing volume is low ({sourcing_sent}/week)",
            )
            .action(
                Sourcer,
                "Prioritize {role} sourcing: {gap} candidates needed at the top of the funnel per hire",
            ),
            Rule::new("onsite-debrief", Medium, Category::Review, Scope::Role)
                .when(Predicate::all([
                    Field::RoleStageCount(onsite_stage.to_string()).greater_than(0.0)
                ]))
                .insight(format!(
                    "{{count:{onsite_stage}}} {{role}} candidate(s) at the {onsite_stage} stage"
                ))
                .action(
                    Recruiter,
                    format!("Schedule a debrief for {{role}} {onsite_stage} candidates"),
                ),
            Rule::new("thin-top-of-funnel", Medium, Category::Sourcing, Scope::Role)
                .when(Predicate::all([
                    Field::RolePriorityRank.equals(1.0),
                    Field::RoleTopOfFunnel.less_than(f64::from(policy.top_of_funnel_minimum)),
                ]))
                .insight("{role} has only {top_of_funnel} candidates at the top of the funnel")
                .action(Sourcer, "Increase sourcing volume for {role} this week"),
            Rule::new("red-pipeline", Medium, Category::Review, Scope::Role)
                .when(Predicate::all([Field::RoleHealth.equals("red")]))
                .insight("{role} pipeline is critical (red status, bottleneck: {bottleneck})")
                .action(
                    Recruiter,
                    "Review the {role} pipeline strategy and consider expanding criteria",
                ),
            Rule::new(
                "reply-rate-declining",
                Medium,
                Category::Review,
                Scope::Global,
            )
            .when(Predicate::all([
                Field::ReplyRateMomentum.one_of(["slipping", "falling"])
            ]))
            .insight("Reply rate dropped from {reply_rate_before} to {reply_rate_now}")
            .action(
                Recruiter,
                "Review recent outreach messaging and refresh the templates",
            )
            .action(Sourcer, "Test new subject lines this week"),
            Rule::new(
                "sourcing-role-volume-low",
                Medium,
                Category::Sourcing,
                Scope::SourcingRole,
            )
            .when(Predicate::all([
                Field::SourcingRoleSent.less_than(f64::from(policy.role_min_sent))
            ]))
            .insight("{role} only has {sent} outreaches this period")
            .action(Sourcer, "Allocate more outreach volume to {role}"),
        ];

        if let Some(sourcer) = &policy.sourcer {
            rules.push(
                Rule::new(
                    "sourcer-volume-low",
                    Medium,
                    Category::Sourcing,
                    Scope::Sender,
                )
                .when(Predicate::all([
                    Field::SenderName.equals(sourcer.as_str()),
                    Field::SenderSent.less_than(f64::from(policy.sourcer_min_sent)),
                ]))
                .insight(format!(
                    "{{sender}} has sent {{sent}} outreaches (target: ~{}/week)",
                    policy.sourcer_min_sent
                ))
                .action(Sourcer, "Increase the daily outreach cadence"),
            );
        }

        rules.extend([
            Rule::new(
                "underperforming-sequence",
                Medium,
                Category::Review,
                Scope::Sequence,
            )
            .when(Predicate::all([
                Field::SequenceSent.greater_than(f64::from(policy.sequence_min_sent)),
                Field::SequenceReplyRate.less_than(policy.sequence_reply_floor),
            ]))
            .insight("'{sequence}' has only a {reply_rate} reply rate on {sent} sends")
            .action(Sourcer, "Pause or rewrite the '{sequence}' sequence"),
            Rule::new(
                "role-reply-rate-low",
                Low,
                Category::Review,
                Scope::SourcingRole,
            )
            .when(Predicate::all([
                Field::SourcingRoleSent.greater_than(f64::from(policy.role_reply_min_sent)),
                Field::SourcingRoleReplyRate.less_than(policy.role_reply_floor),
            ]))
            .insight("{role} reply rate is only {reply_rate}")
            .action(
                Recruiter,
                "Review {role} targeting: are we reaching the right candidates?",
            ),
            Rule::new(
                "top-sequence",
                Low,
                Category::Sync,
                Scope::TopSequence {
                    min_sent: policy.top_sequence_min_sent,
                },
            )
            .when(Predicate::all([
                Field::SequenceReplyRate.greater_than(policy.top_sequence_reply_rate)
            ]))
            .insight("'{sequence}' has a {reply_rate} reply rate")
            .action(
                Sourcer,
                "Clone the messaging approach from '{sequence}' into weaker sequences",
            ),
        ]);

        Self { rules }
    }
}
