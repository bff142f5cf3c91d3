use super::common::*;
use crate::workflows::pulse::domain::{Health, IssueKind, RateStatus};
use crate::workflows::pulse::funnel::{days_in_stage, gap_to_hire, is_stuck, FunnelResult};
use crate::workflows::pulse::snapshot::{CandidateInput, PipelineData, RoleInput, SnapshotBuilder};

fn analyze_one(role: RoleInput, candidates: Vec<CandidateInput>) -> FunnelResult {
    let config = config();
    let pipeline = PipelineData {
        roles: vec![role],
        candidates,
    };
    let snapshot = SnapshotBuilder::new(&config)
        .build(as_of(), &pipeline, &[])
        .expect("builds")
        .snapshot;
    funnels(&snapshot).remove(0)
}

fn derived_role(counts: [u32; 6]) -> RoleInput {
    let mut role = ai_role();
    role.conversion_rates.clear();
    for (entry, count) in role.stages.iter_mut().zip(counts) {
        entry.count = count;
    }
    role
}

#[test]
fn gap_to_hire_is_ceiling_of_inverse_product() {
    assert_eq!(gap_to_hire(&[0.2, 0.5, 0.6, 0.5, 1.0], 0.05), 34);
    assert_eq!(gap_to_hire(&[0.2, 0.5, 0.6], 0.05), 17);
    assert_eq!(gap_to_hire(&[0.5], 0.05), 2);
    assert_eq!(gap_to_hire(&[], 0.05), 1);
}

#[test]
fn gap_to_hire_substitutes_the_floor_for_unusable_rates() {
    assert_eq!(gap_to_hire(&[0.0, 0.5], 0.05), 40);
    assert_eq!(gap_to_hire(&[f64::NAN, 0.5], 0.05), 40);
    assert_eq!(gap_to_hire(&[-0.3], 0.1), 10);
}

#[test]
fn stuck_check_is_strict_on_whole_days() {
    let entered = at(2025, 1, 10, 12);
    assert_eq!(days_in_stage(at(2025, 1, 15, 11), entered), 4);
    assert_eq!(days_in_stage(at(2025, 1, 15, 12), entered), 5);
    assert!(!is_stuck(5, 5));
    assert!(is_stuck(6, 5));
    assert!(!is_stuck(-2, 0));
}

#[test]
fn fixture_roles_are_ordered_by_priority_then_name() {
    let funnels = funnels(&snapshot());
    let order: Vec<&str> = funnels.iter().map(|f| f.role_id.as_str()).collect();
    assert_eq!(order, ["ai-engineer", "full-stack", "gtm"]);
}

#[test]
fn healthy_role_is_green_without_bottleneck() {
    let funnels = funnels(&snapshot());
    let ai = funnel_of(&funnels, "ai-engineer");

    assert_eq!(ai.gap_to_hire, 17);
    assert_eq!(ai.screens_still_needed, 0);
    assert_eq!(ai.top_of_funnel, 30);
    assert_eq!(ai.total_candidates, 53);
    assert!(!ai.bottleneck);
    assert!(ai.bottleneck_label.is_none());
    assert_eq!(ai.health, Health::Green);
    assert!(ai
        .transitions
        .iter()
        .all(|transition| transition.status == RateStatus::Observed));
}

#[test]
fn weak_transitions_flag_bottleneck_and_red_health() {
    let funnels = funnels(&snapshot());

    let gtm = funnel_of(&funnels, "gtm");
    assert_eq!(gtm.gap_to_hire, 267);
    assert_eq!(gtm.screens_still_needed, 257);
    assert!(gtm.bottleneck);
    assert_eq!(gtm.bottleneck_label.as_deref(), Some("HM Screen→Testing (10%)"));
    assert_eq!(gtm.health, Health::Red);

    let full_stack = funnel_of(&funnels, "full-stack");
    assert_eq!(full_stack.gap_to_hire, 334);
    assert_eq!(full_stack.bottleneck_label.as_deref(), Some("Onsite→Offer (12%)"));
    assert_eq!(full_stack.health, Health::Red);
}

#[test]
fn stuck_candidates_respect_stage_limits() {
    let funnels = funnels(&snapshot());

    let ai = funnel_of(&funnels, "ai-engineer");
    assert_eq!(ai.stuck.len(), 1);
    assert_eq!(ai.stuck[0].name, "Ada");
    assert_eq!(ai.stuck[0].days_in_stage, 10);
    assert_eq!(ai.stuck[0].threshold, 7);

    let full_stack = funnel_of(&funnels, "full-stack");
    let names: Vec<&str> = full_stack.stuck.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Linus"]);
    assert_eq!(full_stack.stuck[0].stage, "Onsite");

    // three days in Offer equals the limit
    assert!(funnel_of(&funnels, "gtm").stuck.is_empty());
}

#[test]
fn testing_limit_is_ten_days() {
    let candidates = vec![
        candidate("c-eleven", "Eleven", "ai-engineer", "Testing", at(2025, 1, 4, 12)),
        candidate("c-nine", "Nine", "ai-engineer", "Testing", at(2025, 1, 6, 12)),
    ];

    let result = analyze_one(ai_role(), candidates);
    let stuck: Vec<(&str, i64)> = result
        .stuck
        .iter()
        .map(|entry| (entry.candidate_id.as_str(), entry.days_in_stage))
        .collect();
    assert_eq!(stuck, [("c-eleven", 11)]);
}

#[test]
fn role_overrides_replace_stage_limits() {
    let mut role = ai_role();
    role.stuck_overrides.insert("Hiring Manager Screen".to_string(), 12);
    let candidates = vec![candidate(
        "c-ada",
        "Ada",
        "ai-engineer",
        "HM Screen",
        at(2025, 1, 5, 12),
    )];

    let result = analyze_one(role, candidates);
    assert!(result.stuck.is_empty());
}

#[test]
fn stuck_candidates_sort_longest_first() {
    let candidates = vec![
        candidate("b", "Bo", "ai-engineer", "Testing", at(2024, 12, 20, 12)),
        candidate("a", "Al", "ai-engineer", "Testing", at(2024, 12, 20, 12)),
        candidate("c", "Cy", "ai-engineer", "Testing", at(2024, 12, 1, 12)),
    ];

    let result = analyze_one(ai_role(), candidates);
    let ids: Vec<&str> = result.stuck.iter().map(|s| s.candidate_id.as_str()).collect();
    assert_eq!(ids, ["c", "a", "b"]);
}

#[test]
fn empty_terminal_stage_is_pending_not_a_bottleneck() {
    let result = analyze_one(derived_role([10, 5, 3, 2, 1, 0]), Vec::new());

    let terminal = result.transitions.last().expect("terminal transition");
    assert_eq!(terminal.status, RateStatus::Pending);
    assert_eq!(terminal.effective, 0.05);
    assert!(!result.bottleneck);
    assert!(result
        .issues()
        .iter()
        .any(|issue| {
            issue.kind == IssueKind::DivisionGuard && issue.detail.contains("Offer→Hired")
        }));
}

#[test]
fn empty_middle_stage_is_floored_and_flags_bottleneck() {
    let result = analyze_one(derived_role([10, 0, 0, 0, 0, 0]), Vec::new());

    assert_eq!(result.transitions[0].status, RateStatus::Floored);
    assert_eq!(result.transitions[1].status, RateStatus::Floored);
    assert!(result.bottleneck);
    assert_eq!(
        result.bottleneck_label.as_deref(),
        Some("Recruiter Screen→HM Screen (0%)")
    );
    assert_eq!(result.health, Health::Red);
}

#[test]
fn single_transition_funnel_has_no_pending_close() {
    let mut role = derived_role([10, 0, 0, 0, 0, 0]);
    role.stages.truncate(2);

    let result = analyze_one(role, Vec::new());
    assert_eq!(result.transitions.len(), 1);
    assert_eq!(result.transitions[0].status, RateStatus::Floored);
    assert!(result.bottleneck);
}

#[test]
fn low_volume_role_is_yellow() {
    let role = role_input(
        "tiny",
        "Tiny Role",
        2,
        "Tiny",
        [3, 1, 0, 0, 0, 0],
        [0.9, 0.9, 0.9, 0.9, 0.9],
    );

    let result = analyze_one(role, Vec::new());
    assert_eq!(result.gap_to_hire, 2);
    assert_eq!(result.health, Health::Yellow);
}

#[test]
fn moderate_conversion_is_yellow_without_bottleneck() {
    let role = role_input(
        "mid",
        "Mid Role",
        2,
        "Mid",
        [30, 6, 5, 4, 3, 2],
        [0.2, 0.9, 0.9, 0.9, 0.9],
    );

    let result = analyze_one(role, Vec::new());
    assert_eq!(result.gap_to_hire, 8);
    assert!(!result.bottleneck);
    assert_eq!(result.health, Health::Yellow);
}

#[test]
fn clamped_rates_are_reported_as_clamped() {
    let mut role = ai_role();
    role.conversion_rates[0].rate = Some(1.4);

    let result = analyze_one(role, Vec::new());
    assert_eq!(result.transitions[0].status, RateStatus::Clamped);
    assert_eq!(result.transitions[0].effective, 1.0);
}
