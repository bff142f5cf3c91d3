use serde::{Deserialize, Serialize};

use super::allocation::Allocation;
use super::digest::{DigestModel, SourcingOverview};
use super::funnel::{FunnelResult, StuckCandidate};
use super::goal::WeeklyGoal;
use super::recommend::Recommendation;

/// Words too common in job titles to identify a role on their own.
const GENERIC_TITLE_WORDS: &[&str] = &[
    "senior", "staff", "lead", "principal", "junior", "engineer", "engineering", "manager",
    "the", "and", "of", "for",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryTopic {
    Overview,
    Stuck,
    Sourcing,
    Allocation,
    Goal,
    Actions,
}

impl QueryTopic {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Overview,
            Self::Stuck,
            Self::Sourcing,
            Self::Allocation,
            Self::Goal,
            Self::Actions,
        ]
    }

    const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Overview => &[
                "overview", "summary", "status", "health", "pipeline", "bottleneck", "funnel",
                "gap",
            ],
            Self::Stuck => &["stuck", "stalled", "waiting", "idle", "follow up", "follow-up"],
            Self::Sourcing => &[
                "sourcing", "outreach", "reply", "replies", "sequence", "sent", "trend",
                "momentum",
            ],
            Self::Allocation => &["allocat", "budget", "split", "capacity", "distribut"],
            Self::Goal => &["goal", "target", "this week"],
            Self::Actions => &[
                "todo", "to do", "action", "should", "recommend", "priorit", "today", "focus",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StuckEntry {
    pub role_id: String,
    pub role_name: String,
    pub candidate: StuckCandidate,
}

/// Slice of a digest relevant to one chat question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    pub question: String,
    pub topics: Vec<QueryTopic>,
    /// Ids of roles the question names. Empty means the question is about every role.
    pub mentioned_roles: Vec<String>,
    pub roles: Vec<FunnelResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stuck: Vec<StuckEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sourcing: Option<SourcingOverview>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allocations: Vec<Allocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<WeeklyGoal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Recommendation>,
}

impl QueryContext {
    pub fn covers(&self, topic: QueryTopic) -> bool {
        self.topics.contains(&topic)
    }
}

/// Pick the parts of `digest` a question is about, by keyword and role-name matching.
pub fn route_query(question: &str, digest: &DigestModel) -> QueryContext {
    let lowered = question.to_lowercase();

    let mut topics: Vec<QueryTopic> = QueryTopic::ordered()
        .into_iter()
        .filter(|topic| {
            topic
                .keywords()
                .iter()
                .any(|keyword| lowered.contains(keyword))
        })
        .collect();
    if topics.is_empty() {
        topics.push(QueryTopic::Overview);
    }

    let mentioned: Vec<&FunnelResult> = digest
        .roles
        .iter()
        .filter(|role| mentions_role(&lowered, role))
        .collect();
    let mentioned_roles: Vec<String> = mentioned.iter().map(|role| role.role_id.clone()).collect();
    let in_scope = |role_id: &str| {
        mentioned_roles.is_empty() || mentioned_roles.iter().any(|id| id == role_id)
    };

    let roles: Vec<FunnelResult> = digest
        .roles
        .iter()
        .filter(|role| in_scope(&role.role_id))
        .cloned()
        .collect();

    let stuck = if topics.contains(&QueryTopic::Stuck) {
        roles
            .iter()
            .flat_map(|role| {
                role.stuck.iter().map(move |candidate| StuckEntry {
                    role_id: role.role_id.clone(),
                    role_name: role.role_name.clone(),
                    candidate: candidate.clone(),
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    let sourcing = topics
        .contains(&QueryTopic::Sourcing)
        .then(|| digest.sourcing.clone());

    let allocations = if topics.contains(&QueryTopic::Allocation) {
        digest
            .allocations
            .iter()
            .filter(|allocation| in_scope(&allocation.role_id))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    let goal = if topics.contains(&QueryTopic::Goal) {
        digest
            .goal
            .as_ref()
            .filter(|goal| in_scope(&goal.role_id))
            .cloned()
    } else {
        None
    };

    let recommendations = if topics.contains(&QueryTopic::Actions) {
        digest
            .recommendations
            .iter()
            .filter(|recommendation| {
                mentioned.is_empty()
                    || mentioned
                        .iter()
                        .any(|role| concerns_role(recommendation, role))
            })
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    QueryContext {
        question: question.to_string(),
        topics,
        mentioned_roles,
        roles,
        stuck,
        sourcing,
        allocations,
        goal,
        recommendations,
    }
}

fn mentions_role(question: &str, role: &FunnelResult) -> bool {
    let name = role.role_name.to_lowercase();
    if question.contains(&name)
        || contains_word(question, &role.role_id.to_lowercase())
        || contains_word(question, &role.sourcing_key.to_lowercase())
    {
        return true;
    }
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 2 && !GENERIC_TITLE_WORDS.contains(word))
        .any(|word| contains_word(question, word))
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack
        .match_indices(needle)
        .any(|(start, matched)| {
            let before = haystack[..start].chars().next_back();
            let after = haystack[start + matched.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
}

fn concerns_role(recommendation: &Recommendation, role: &FunnelResult) -> bool {
    match &recommendation.entity_key {
        Some(key) => {
            key == &role.role_id
                || key == &role.sourcing_key
                || key
                    .split_once('/')
                    .is_some_and(|(role_id, _)| role_id == role.role_id)
        }
        None => false,
    }
}
