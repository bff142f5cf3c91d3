use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::AnalysisConfig;
use super::domain::{transition_label, AnalysisError, DataIssue, ObservedRate, Priority};

/// Raw pipeline payload handed over by the data-acquisition side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineData {
    #[serde(default)]
    pub roles: Vec<RoleInput>,
    #[serde(default)]
    pub candidates: Vec<CandidateInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleInput {
    pub id: String,
    pub name: String,
    pub priority: Priority,
    /// Role label used by the sequence tool when it differs from `id`.
    #[serde(default)]
    pub sourcing_key: Option<String>,
    /// Omit to derive counts from the candidate list.
    #[serde(default)]
    pub stages: Vec<StageCountInput>,
    #[serde(default)]
    pub conversion_rates: Vec<ConversionRateInput>,
    #[serde(default)]
    pub stuck_overrides: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCountInput {
    pub stage: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRateInput {
    pub from: String,
    pub to: String,
    /// `null` marks the rate as explicitly unknown.
    #[serde(default)]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateInput {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role_id: String,
    pub stage: String,
    pub entered_stage_at: DateTime<Utc>,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStatInput {
    pub sequence: String,
    pub role: String,
    pub sender: String,
    pub date: NaiveDate,
    pub sent: u32,
    #[serde(default)]
    pub opened: u32,
    #[serde(default)]
    pub clicked: u32,
    #[serde(default)]
    pub replied: u32,
    #[serde(default)]
    pub bounced: u32,
}

/// Sequence stats for this period plus an optional earlier period to trend against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcingData {
    #[serde(default)]
    pub this_period: Vec<SequenceStatInput>,
    #[serde(default)]
    pub last_period: Option<SourcingPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcingPeriod {
    pub date: NaiveDate,
    pub stats: Vec<SequenceStatInput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    pub stage: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: String,
    pub to: String,
    pub rate: ObservedRate,
}

impl StageTransition {
    pub fn label(&self) -> String {
        transition_label(&self.from, &self.to)
    }
}

/// Validated role: canonical stage names, one transition per consecutive stage pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub priority: Priority,
    pub sourcing_key: String,
    pub stages: Vec<StageCount>,
    pub transitions: Vec<StageTransition>,
    pub stuck_overrides: BTreeMap<String, u32>,
}

impl Role {
    pub fn count_at(&self, stage: &str) -> u32 {
        self.stages
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    pub fn top_of_funnel(&self) -> u32 {
        self.stages.first().map(|entry| entry.count).unwrap_or(0)
    }

    pub fn total_candidates(&self) -> u32 {
        self.stages
            .iter()
            .fold(0u32, |total, entry| total.saturating_add(entry.count))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: Option<String>,
    pub role_id: String,
    pub stage: String,
    pub entered_stage_at: DateTime<Utc>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStat {
    pub sequence: String,
    pub role: String,
    pub sender: String,
    pub date: NaiveDate,
    pub sent: u32,
    pub opened: u32,
    pub clicked: u32,
    pub replied: u32,
    pub bounced: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachTotals {
    pub sent: u64,
    pub opened: u64,
    pub clicked: u64,
    pub replied: u64,
    pub bounced: u64,
}

impl OutreachTotals {
    pub fn record(&mut self, stat: &SequenceStat) {
        self.sent += u64::from(stat.sent);
        self.opened += u64::from(stat.opened);
        self.clicked += u64::from(stat.clicked);
        self.replied += u64::from(stat.replied);
        self.bounced += u64::from(stat.bounced);
    }

    /// Replies per message sent, 0 when nothing went out.
    pub fn reply_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.replied as f64 / self.sent as f64
        }
    }

    pub fn reply_rate_pct(&self) -> f64 {
        self.reply_rate() * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSummary {
    pub sequence: String,
    pub role: String,
    pub sender: String,
    pub totals: OutreachTotals,
}

/// All metrics for one calendar date. Aggregates are derived at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub roles: Vec<Role>,
    pub candidates: Vec<Candidate>,
    pub sequences: Vec<SequenceStat>,
    pub totals: OutreachTotals,
    pub by_role: BTreeMap<String, OutreachTotals>,
    pub by_sender: BTreeMap<String, OutreachTotals>,
    pub by_sequence: BTreeMap<String, SequenceSummary>,
}

impl Snapshot {
    pub fn role(&self, id: &str) -> Option<&Role> {
        self.roles.iter().find(|role| role.id == id)
    }

    pub fn candidates_for<'a>(&'a self, role_id: &'a str) -> impl Iterator<Item = &'a Candidate> {
        self.candidates
            .iter()
            .filter(move |candidate| candidate.role_id == role_id)
    }

    pub fn sourcing_for(&self, sourcing_key: &str) -> Option<&OutreachTotals> {
        self.by_role.get(sourcing_key)
    }
}

/// Snapshot plus the non-fatal issues found while validating its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotBuild {
    pub snapshot: Snapshot,
    pub issues: Vec<DataIssue>,
}

/// Validating factory: the only way engine code obtains a [`Snapshot`].
pub struct SnapshotBuilder<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        date: NaiveDate,
        pipeline: &PipelineData,
        stats: &[SequenceStatInput],
    ) -> Result<SnapshotBuild, AnalysisError> {
        let mut issues = Vec::new();

        let mut role_ids = BTreeSet::new();
        for role in &pipeline.roles {
            let id = role.id.trim();
            if id.is_empty() {
                return Err(AnalysisError::missing(
                    "role id",
                    role.name.clone(),
                    "role has an empty id",
                ));
            }
            if !role_ids.insert(id.to_string()) {
                return Err(AnalysisError::Duplicate {
                    entity: "role",
                    key: id.to_string(),
                });
            }
        }

        let candidates = self.candidates(&pipeline.candidates, &role_ids, &mut issues)?;

        let roles = pipeline
            .roles
            .iter()
            .map(|input| self.role(input, &candidates, &mut issues))
            .collect::<Result<Vec<_>, _>>()?;

        for expected in &self.config.active_roles {
            if !role_ids.contains(expected.as_str()) {
                issues.push(DataIssue::missing(
                    expected.clone(),
                    "active role absent from pipeline data",
                ));
            }
        }

        let sequences = {
            let sourcing_keys: BTreeSet<&str> =
                roles.iter().map(|role| role.sourcing_key.as_str()).collect();
            let known = (!sourcing_keys.is_empty()).then_some(&sourcing_keys);
            sequence_stats(stats, known, &mut issues)?
        };
        for tracked in self
            .config
            .sequences
            .absent_from(sequences.iter().map(|stat| stat.sequence.as_str()))
        {
            issues.push(DataIssue::missing(
                tracked,
                "tracked sequence has no stats for this period",
            ));
        }

        debug!(
            %date,
            roles = roles.len(),
            candidates = candidates.len(),
            sequences = sequences.len(),
            issues = issues.len(),
            "snapshot built"
        );

        Ok(SnapshotBuild {
            snapshot: aggregate(date, roles, candidates, sequences),
            issues,
        })
    }

    /// Snapshot carrying sequence stats only, used for comparison periods.
    pub fn sourcing_only(
        &self,
        date: NaiveDate,
        stats: &[SequenceStatInput],
    ) -> Result<SnapshotBuild, AnalysisError> {
        let mut issues = Vec::new();
        let sequences = sequence_stats(stats, None, &mut issues)?;
        Ok(SnapshotBuild {
            snapshot: aggregate(date, Vec::new(), Vec::new(), sequences),
            issues,
        })
    }

    fn candidates(
        &self,
        inputs: &[CandidateInput],
        role_ids: &BTreeSet<String>,
        issues: &mut Vec<DataIssue>,
    ) -> Result<Vec<Candidate>, AnalysisError> {
        let mut seen = BTreeSet::new();
        let mut candidates = Vec::with_capacity(inputs.len());
        for input in inputs {
            let id = input.id.trim();
            if id.is_empty() {
                return Err(AnalysisError::missing(
                    "candidate id",
                    input.role_id.clone(),
                    "candidate has an empty id",
                ));
            }
            if !seen.insert(id.to_string()) {
                return Err(AnalysisError::Duplicate {
                    entity: "candidate",
                    key: id.to_string(),
                });
            }
            let role_id = input.role_id.trim();
            if !role_ids.contains(role_id) {
                issues.push(DataIssue::missing(
                    role_id,
                    format!("candidate {id} references a role with no pipeline data"),
                ));
                continue;
            }
            candidates.push(Candidate {
                id: id.to_string(),
                name: input
                    .name
                    .as_ref()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty()),
                role_id: role_id.to_string(),
                stage: self.config.normalize_stage(&input.stage),
                entered_stage_at: input.entered_stage_at,
                last_activity_at: input.last_activity_at,
            });
        }
        Ok(candidates)
    }

    fn role(
        &self,
        input: &RoleInput,
        candidates: &[Candidate],
        issues: &mut Vec<DataIssue>,
    ) -> Result<Role, AnalysisError> {
        let id = input.id.trim().to_string();
        let stages = if input.stages.is_empty() {
            self.derived_stage_counts(&id, candidates)
        } else {
            self.normalized_stage_counts(&input.stages)
        };
        if stages.is_empty() {
            return Err(AnalysisError::missing(
                "stages",
                id,
                "role has no pipeline stages",
            ));
        }

        let mut supplied: BTreeMap<usize, ObservedRate> = BTreeMap::new();
        for entry in &input.conversion_rates {
            let from = self.config.normalize_stage(&entry.from);
            let to = self.config.normalize_stage(&entry.to);
            let label = transition_label(&from, &to);
            let index = stages
                .windows(2)
                .position(|pair| pair[0].stage == from && pair[1].stage == to)
                .ok_or_else(|| {
                    AnalysisError::missing(
                        "stage pair",
                        label.clone(),
                        format!("role {id} has no consecutive stages {label}"),
                    )
                })?;
            let rate = observed_rate(&id, &label, entry.rate, issues)?;
            if supplied.insert(index, rate).is_some() {
                return Err(AnalysisError::Duplicate {
                    entity: "conversion rate",
                    key: format!("{id} {label}"),
                });
            }
        }

        let transitions = stages
            .windows(2)
            .enumerate()
            .map(|(index, pair)| StageTransition {
                from: pair[0].stage.clone(),
                to: pair[1].stage.clone(),
                rate: supplied
                    .get(&index)
                    .copied()
                    .unwrap_or_else(|| derived_rate(pair[0].count, pair[1].count)),
            })
            .collect();

        let stuck_overrides = input
            .stuck_overrides
            .iter()
            .map(|(stage, days)| (self.config.normalize_stage(stage), *days))
            .collect();

        let name = input.name.trim();
        Ok(Role {
            name: if name.is_empty() {
                id.clone()
            } else {
                name.to_string()
            },
            priority: input.priority,
            sourcing_key: input
                .sourcing_key
                .as_ref()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .unwrap_or_else(|| id.clone()),
            stages,
            transitions,
            stuck_overrides,
            id,
        })
    }

    fn normalized_stage_counts(&self, inputs: &[StageCountInput]) -> Vec<StageCount> {
        let mut stages: Vec<StageCount> = Vec::with_capacity(inputs.len());
        for input in inputs {
            let stage = self.config.normalize_stage(&input.stage);
            match stages.iter_mut().find(|entry| entry.stage == stage) {
                Some(existing) => existing.count = existing.count.saturating_add(input.count),
                None => stages.push(StageCount {
                    stage,
                    count: input.count,
                }),
            }
        }
        stages
    }

    fn derived_stage_counts(&self, role_id: &str, candidates: &[Candidate]) -> Vec<StageCount> {
        self.config
            .pipeline_stages
            .iter()
            .map(|stage| StageCount {
                stage: stage.clone(),
                count: candidates
                    .iter()
                    .filter(|candidate| candidate.role_id == role_id && &candidate.stage == stage)
                    .count() as u32,
            })
            .collect()
    }
}

fn observed_rate(
    role_id: &str,
    label: &str,
    rate: Option<f64>,
    issues: &mut Vec<DataIssue>,
) -> Result<ObservedRate, AnalysisError> {
    let Some(value) = rate else {
        return Ok(ObservedRate::Unknown);
    };
    if !value.is_finite() {
        return Err(AnalysisError::InvalidRate {
            role: role_id.to_string(),
            transition: label.to_string(),
            value,
        });
    }
    if (0.0..=1.0).contains(&value) {
        return Ok(ObservedRate::Supplied { value });
    }
    let clamped = value.clamp(0.0, 1.0);
    issues.push(DataIssue::invalid_rate(
        role_id,
        format!("{label} rate {value} outside [0, 1], clamped to {clamped}"),
    ));
    Ok(ObservedRate::Clamped {
        supplied: value,
        value: clamped,
    })
}

fn derived_rate(from_count: u32, to_count: u32) -> ObservedRate {
    if from_count == 0 {
        return ObservedRate::Unknown;
    }
    ObservedRate::Derived {
        value: (f64::from(to_count) / f64::from(from_count)).min(1.0),
    }
}

fn sequence_stats(
    inputs: &[SequenceStatInput],
    known_roles: Option<&BTreeSet<&str>>,
    issues: &mut Vec<DataIssue>,
) -> Result<Vec<SequenceStat>, AnalysisError> {
    let mut seen = BTreeSet::new();
    let mut stats = Vec::with_capacity(inputs.len());
    for input in inputs {
        let sequence = input.sequence.trim();
        if sequence.is_empty() {
            return Err(AnalysisError::missing(
                "sequence",
                input.role.clone(),
                "sequence stat has an empty name",
            ));
        }
        if input.replied > input.sent {
            return Err(AnalysisError::InvalidCounts {
                sequence: sequence.to_string(),
                detail: format!("replied {} exceeds sent {}", input.replied, input.sent),
            });
        }
        if !seen.insert((sequence.to_string(), input.date)) {
            return Err(AnalysisError::Duplicate {
                entity: "sequence stat",
                key: format!("{sequence} {}", input.date),
            });
        }
        let role = input.role.trim();
        if let Some(known) = known_roles {
            if !known.contains(role) {
                issues.push(DataIssue::missing(
                    role,
                    format!("sequence {sequence} sources for a role with no pipeline data"),
                ));
            }
        }
        stats.push(SequenceStat {
            sequence: sequence.to_string(),
            role: role.to_string(),
            sender: input.sender.trim().to_string(),
            date: input.date,
            sent: input.sent,
            opened: input.opened,
            clicked: input.clicked,
            replied: input.replied,
            bounced: input.bounced,
        });
    }
    Ok(stats)
}

fn aggregate(
    date: NaiveDate,
    roles: Vec<Role>,
    candidates: Vec<Candidate>,
    sequences: Vec<SequenceStat>,
) -> Snapshot {
    let mut totals = OutreachTotals::default();
    let mut by_role: BTreeMap<String, OutreachTotals> = BTreeMap::new();
    let mut by_sender: BTreeMap<String, OutreachTotals> = BTreeMap::new();
    let mut by_sequence: BTreeMap<String, SequenceSummary> = BTreeMap::new();

    for stat in &sequences {
        totals.record(stat);
        by_role.entry(stat.role.clone()).or_default().record(stat);
        by_sender.entry(stat.sender.clone()).or_default().record(stat);
        by_sequence
            .entry(stat.sequence.clone())
            .or_insert_with(|| SequenceSummary {
                sequence: stat.sequence.clone(),
                role: stat.role.clone(),
                sender: stat.sender.clone(),
                totals: OutreachTotals::default(),
            })
            .totals
            .record(stat);
    }

    Snapshot {
        date,
        roles,
        candidates,
        sequences,
        totals,
        by_role,
        by_sender,
        by_sequence,
    }
}
