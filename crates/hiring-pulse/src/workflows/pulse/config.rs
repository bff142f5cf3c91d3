use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::workflows::sequences::SequenceDirectory;

/// Every knob the engine reads. Partial JSON files fall back to the defaults field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Canonical pipeline, top of funnel first, terminal stage last.
    pub pipeline_stages: Vec<String>,
    pub stage_aliases: BTreeMap<String, String>,
    /// Maximum whole days a candidate may sit in a stage.
    pub stuck_thresholds: BTreeMap<String, u32>,
    /// Role ids expected in every pipeline payload.
    pub active_roles: Vec<String>,
    pub funnel: FunnelPolicy,
    pub health: HealthPolicy,
    pub allocation: AllocationPolicy,
    pub recommendations: RecommendationPolicy,
    pub goal: GoalPolicy,
    pub sequences: SequenceDirectory,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let pipeline_stages = [
            "Recruiter Screen",
            "HM Screen",
            "Testing",
            "Onsite",
            "Offer",
            "Hired",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let stage_aliases = [
            ("New Lead", "Recruiter Screen"),
            ("Reached Out", "Recruiter Screen"),
            ("Replied", "Recruiter Screen"),
            ("Application Review", "Recruiter Screen"),
            ("Recruiter Screen", "Recruiter Screen"),
            ("Hiring Manager Screen", "HM Screen"),
            ("HM Screen", "HM Screen"),
            ("Technical Assessment", "Testing"),
            ("Take Home", "Testing"),
            ("Testing", "Testing"),
            ("Onsite", "Onsite"),
            ("Onsite Loop", "Onsite"),
            ("Final Interview", "Onsite"),
            ("Offer", "Offer"),
            ("Offer Extended", "Offer"),
            ("Hired", "Hired"),
            ("Accepted", "Hired"),
        ]
        .into_iter()
        .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
        .collect();

        let stuck_thresholds = [
            ("Recruiter Screen", 5),
            ("HM Screen", 7),
            ("Testing", 10),
            ("Onsite", 5),
            ("Offer", 3),
        ]
        .into_iter()
        .map(|(stage, days)| (stage.to_string(), days))
        .collect();

        Self {
            pipeline_stages,
            stage_aliases,
            stuck_thresholds,
            active_roles: Vec::new(),
            funnel: FunnelPolicy::default(),
            health: HealthPolicy::default(),
            allocation: AllocationPolicy::default(),
            recommendations: RecommendationPolicy::default(),
            goal: GoalPolicy::default(),
            sequences: SequenceDirectory::default(),
        }
    }
}

impl AnalysisConfig {
    /// Map a tracker stage name onto the canonical pipeline. Unmapped names pass through.
    pub fn normalize_stage(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if let Some(canonical) = self.stage_aliases.get(trimmed) {
            return canonical.clone();
        }
        self.stage_aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(trimmed))
            .map(|(_, canonical)| canonical.clone())
            .unwrap_or_else(|| trimmed.to_string())
    }

    pub fn stuck_threshold(&self, stage: &str) -> Option<u32> {
        self.stuck_thresholds.get(stage).copied()
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.pipeline_stages.len() < 2 {
            return Err(PolicyError::new(
                "pipeline_stages",
                "needs at least two stages",
            ));
        }
        let floor = self.funnel.conversion_floor;
        if !(floor > 0.0 && floor <= 1.0) {
            return Err(PolicyError::new(
                "funnel.conversion_floor",
                format!("{floor} must be in (0, 1]"),
            ));
        }
        if !(0.0..=1.0).contains(&self.funnel.weak_conversion_max) {
            return Err(PolicyError::new(
                "funnel.weak_conversion_max",
                "must be within [0, 1]",
            ));
        }
        if self.health.red_conversion_max > self.health.yellow_conversion_max {
            return Err(PolicyError::new(
                "health.red_conversion_max",
                "must not exceed yellow_conversion_max",
            ));
        }
        if self.health.moderate_gap_multiple > self.health.critical_gap_multiple {
            return Err(PolicyError::new(
                "health.moderate_gap_multiple",
                "must not exceed critical_gap_multiple",
            ));
        }
        if self.allocation.weekly_capacity == 0 {
            return Err(PolicyError::new(
                "allocation.weekly_capacity",
                "must be positive",
            ));
        }
        if !(self.allocation.gap_divisor > 0.0) {
            return Err(PolicyError::new(
                "allocation.gap_divisor",
                "must be positive",
            ));
        }
        if !(self.goal.stretch_factor > 0.0) {
            return Err(PolicyError::new("goal.stretch_factor", "must be positive"));
        }
        if self.goal.assumed_volume_lift < -1.0 {
            return Err(PolicyError::new(
                "goal.assumed_volume_lift",
                "cannot remove more than the whole volume",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelPolicy {
    /// Stand-in for a zero or unknown stage conversion when computing gap-to-hire.
    pub conversion_floor: f64,
    /// Known conversions at or below this mark the role as bottlenecked.
    pub weak_conversion_max: f64,
}

impl Default for FunnelPolicy {
    fn default() -> Self {
        Self {
            conversion_floor: 0.05,
            weak_conversion_max: 0.15,
        }
    }
}

/// Cutoffs for the red/yellow/green pipeline label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthPolicy {
    pub red_conversion_max: f64,
    pub yellow_conversion_max: f64,
    pub critical_gap_multiple: f64,
    pub moderate_gap_multiple: f64,
    pub min_active_candidates: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            red_conversion_max: 0.15,
            yellow_conversion_max: 0.25,
            critical_gap_multiple: 3.0,
            moderate_gap_multiple: 1.5,
            min_active_candidates: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationPolicy {
    pub weekly_capacity: u32,
    /// Number of priority tiers; P1 weighs `priority_levels`, the last tier weighs 1.
    pub priority_levels: u8,
    pub gap_divisor: f64,
    pub gap_factor_cap: f64,
    pub red_factor: f64,
    pub yellow_factor: f64,
    pub green_factor: f64,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            weekly_capacity: 120,
            priority_levels: 3,
            gap_divisor: 20.0,
            gap_factor_cap: 5.0,
            red_factor: 3.0,
            yellow_factor: 2.0,
            green_factor: 1.0,
        }
    }
}

/// Thresholds read by the standard rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationPolicy {
    pub stuck_alerts_per_role: usize,
    pub hm_screen_stage: String,
    pub onsite_stage: String,
    pub min_weekly_sent: u32,
    pub unhealthy_role_min_sent: u32,
    pub top_of_funnel_minimum: u32,
    pub role_min_sent: u32,
    /// Sender name the sourcer volume check applies to.
    pub sourcer: Option<String>,
    pub sourcer_min_sent: u32,
    pub sequence_min_sent: u32,
    pub sequence_reply_floor: f64,
    pub role_reply_min_sent: u32,
    pub role_reply_floor: f64,
    pub top_sequence_min_sent: u32,
    pub top_sequence_reply_rate: f64,
    pub actions_per_stakeholder: usize,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            stuck_alerts_per_role: 3,
            hm_screen_stage: "HM Screen".to_string(),
            onsite_stage: "Onsite".to_string(),
            min_weekly_sent: 100,
            unhealthy_role_min_sent: 50,
            top_of_funnel_minimum: 5,
            role_min_sent: 40,
            sourcer: None,
            sourcer_min_sent: 80,
            sequence_min_sent: 20,
            sequence_reply_floor: 0.05,
            role_reply_min_sent: 20,
            role_reply_floor: 0.08,
            top_sequence_min_sent: 10,
            top_sequence_reply_rate: 0.15,
            actions_per_stakeholder: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalPolicy {
    pub stretch_factor: f64,
    pub assumed_volume_lift: f64,
}

impl Default for GoalPolicy {
    fn default() -> Self {
        Self {
            stretch_factor: 1.2,
            assumed_volume_lift: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid analysis policy `{field}`: {reason}")]
pub struct PolicyError {
    pub field: &'static str,
    pub reason: String,
}

impl PolicyError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}
