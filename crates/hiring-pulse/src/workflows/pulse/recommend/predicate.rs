use serde::{Deserialize, Serialize};

const NUMBER_TOLERANCE: f64 = 1e-9;

/// Dataset paths a rule condition can read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    TotalSent,
    /// Fraction of this period's messages that got a reply.
    TotalReplyRate,
    SentMomentum,
    ReplyRateMomentum,
    RoleHealth,
    RolePriorityRank,
    RoleTopOfFunnel,
    RoleGapToHire,
    RoleBottleneck,
    RoleStageCount(String),
    /// This period's sends for the role's sourcing key, zero when none.
    RoleSourcingSent,
    RoleStuckCount,
    CandidateDaysInStage,
    SourcingRoleSent,
    SourcingRoleReplyRate,
    SenderName,
    SenderSent,
    SequenceSent,
    SequenceReplyRate,
}

impl Field {
    pub fn path(&self) -> String {
        match self {
            Self::TotalSent => "sourcing.total_sent".to_string(),
            Self::TotalReplyRate => "sourcing.reply_rate".to_string(),
            Self::SentMomentum => "trend.sent.momentum".to_string(),
            Self::ReplyRateMomentum => "trend.reply_rate.momentum".to_string(),
            Self::RoleHealth => "role.health".to_string(),
            Self::RolePriorityRank => "role.priority".to_string(),
            Self::RoleTopOfFunnel => "role.top_of_funnel".to_string(),
            Self::RoleGapToHire => "role.gap_to_hire".to_string(),
            Self::RoleBottleneck => "role.bottleneck".to_string(),
            Self::RoleStageCount(stage) => format!("role.stages[{stage}]"),
            Self::RoleSourcingSent => "role.sourcing.sent".to_string(),
            Self::RoleStuckCount => "role.stuck_count".to_string(),
            Self::CandidateDaysInStage => "candidate.days_in_stage".to_string(),
            Self::SourcingRoleSent => "sourcing_role.sent".to_string(),
            Self::SourcingRoleReplyRate => "sourcing_role.reply_rate".to_string(),
            Self::SenderName => "sender.name".to_string(),
            Self::SenderSent => "sender.sent".to_string(),
            Self::SequenceSent => "sequence.sent".to_string(),
            Self::SequenceReplyRate => "sequence.reply_rate".to_string(),
        }
    }

    pub fn less_than(self, operand: f64) -> Condition {
        Condition::new(self, Comparison::Lt, Operand::Number(operand))
    }

    pub fn at_most(self, operand: f64) -> Condition {
        Condition::new(self, Comparison::Le, Operand::Number(operand))
    }

    pub fn greater_than(self, operand: f64) -> Condition {
        Condition::new(self, Comparison::Gt, Operand::Number(operand))
    }

    pub fn at_least(self, operand: f64) -> Condition {
        Condition::new(self, Comparison::Ge, Operand::Number(operand))
    }

    pub fn equals(self, operand: impl Into<Operand>) -> Condition {
        Condition::new(self, Comparison::Eq, operand.into())
    }

    pub fn one_of<I, S>(self, options: I) -> Condition
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::new(
            self,
            Comparison::In,
            Operand::AnyOf(options.into_iter().map(Into::into).collect()),
        )
    }
}

/// Resolved field value for one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Flag(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    In,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Number(f64),
    Text(String),
    Flag(bool),
    AnyOf(Vec<String>),
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: Field,
    pub comparison: Comparison,
    pub operand: Operand,
}

impl Condition {
    pub fn new(field: Field, comparison: Comparison, operand: Operand) -> Self {
        Self {
            field,
            comparison,
            operand,
        }
    }

    /// A field that does not apply to the entity never satisfies a condition.
    pub fn holds(&self, value: Option<&Value>) -> bool {
        value.is_some_and(|value| compare(value, self.comparison, &self.operand))
    }
}

/// Conjunction of conditions. An empty predicate always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub conditions: Vec<Condition>,
}

impl Predicate {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self {
            conditions: conditions.into_iter().collect(),
        }
    }

    pub fn evaluate<F>(&self, mut resolve: F) -> bool
    where
        F: FnMut(&Field) -> Option<Value>,
    {
        self.conditions
            .iter()
            .all(|condition| condition.holds(resolve(&condition.field).as_ref()))
    }
}

fn compare(value: &Value, comparison: Comparison, operand: &Operand) -> bool {
    match (value, operand) {
        (Value::Number(left), Operand::Number(right)) => match comparison {
            Comparison::Lt => left < right,
            Comparison::Le => left <= right,
            Comparison::Gt => left > right,
            Comparison::Ge => left >= right,
            Comparison::Eq => (left - right).abs() < NUMBER_TOLERANCE,
            Comparison::Ne => (left - right).abs() >= NUMBER_TOLERANCE,
            Comparison::In => false,
        },
        (Value::Text(left), Operand::Text(right)) => match comparison {
            Comparison::Eq => left.eq_ignore_ascii_case(right),
            Comparison::Ne => !left.eq_ignore_ascii_case(right),
            _ => false,
        },
        (Value::Text(left), Operand::AnyOf(options)) => {
            let found = options
                .iter()
                .any(|option| option.eq_ignore_ascii_case(left));
            match comparison {
                Comparison::In => found,
                Comparison::Ne => !found,
                _ => false,
            }
        }
        (Value::Flag(left), Operand::Flag(right)) => match comparison {
            Comparison::Eq => left == right,
            Comparison::Ne => left != right,
            _ => false,
        },
        _ => false,
    }
}
