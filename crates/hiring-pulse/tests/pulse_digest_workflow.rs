use chrono::NaiveDate;
use hiring_pulse::workflows::pulse::{
    analyze, route_query, AnalysisConfig, AnalysisRequest, Health, Momentum, PulseEngine,
    QueryTopic, RateStatus, Stakeholder,
};
use serde_json::{json, Value};

const STAGES: [&str; 6] = [
    "Recruiter Screen",
    "HM Screen",
    "Testing",
    "Onsite",
    "Offer",
    "Hired",
];

fn role(
    id: &str,
    name: &str,
    priority: &str,
    key: &str,
    counts: [u32; 6],
    rates: [f64; 5],
) -> Value {
    let stages: Vec<Value> = STAGES
        .iter()
        .zip(counts)
        .map(|(stage, count)| json!({ "stage": stage, "count": count }))
        .collect();
    let conversion_rates: Vec<Value> = STAGES
        .windows(2)
        .zip(rates)
        .map(|(pair, rate)| json!({ "from": pair[0], "to": pair[1], "rate": rate }))
        .collect();
    json!({
        "id": id,
        "name": name,
        "priority": priority,
        "sourcing_key": key,
        "stages": stages,
        "conversion_rates": conversion_rates,
    })
}

/// Four rates describe a five-stage funnel that closes at Offer.
fn five_stage_role(id: &str, name: &str, counts: [u32; 5], rates: [Option<f64>; 4]) -> Value {
    let stages = &STAGES[..5];
    let conversion_rates: Vec<Value> = stages
        .windows(2)
        .zip(rates)
        .map(|(pair, rate)| json!({ "from": pair[0], "to": pair[1], "rate": rate }))
        .collect();
    json!({
        "id": id,
        "name": name,
        "priority": "P1",
        "stages": stages
            .iter()
            .zip(counts)
            .map(|(stage, count)| json!({ "stage": stage, "count": count }))
            .collect::<Vec<_>>(),
        "conversion_rates": conversion_rates,
    })
}

fn stat(sequence: &str, role: &str, sender: &str, date: &str, sent: u32, replied: u32) -> Value {
    json!({
        "sequence": sequence,
        "role": role,
        "sender": sender,
        "date": date,
        "sent": sent,
        "replied": replied,
    })
}

fn three_role_request() -> AnalysisRequest {
    let payload = json!({
        "date": "2025-01-15",
        "now": "2025-01-15T12:00:00Z",
        "week_start": "2025-01-13",
        "pipeline": {
            "roles": [
                role(
                    "ai-engineer", "Senior AI Engineer", "P1", "AI Engineer",
                    [30, 12, 6, 3, 2, 0], [0.5, 0.5, 0.6, 0.5, 0.8],
                ),
                role(
                    "gtm", "GTM Engineer", "P2", "GTM",
                    [10, 3, 1, 1, 0, 0], [0.3, 0.1, 0.5, 0.5, 0.5],
                ),
                role(
                    "full-stack", "Senior Full Stack Engineer", "P1", "Full Stack",
                    [40, 10, 4, 2, 0, 0], [0.25, 0.4, 0.5, 0.12, 0.5],
                ),
            ],
        },
        "sourcing": {
            "this_period": [
                stat("Sr. AI Engineer - Drew", "AI Engineer", "Drew", "2025-01-15", 60, 10),
                stat("Sr. Full Stack - Blessing", "Full Stack", "Blessing", "2025-01-15", 50, 2),
                stat("GTM Outbound", "GTM", "Blessing", "2025-01-15", 10, 1),
            ],
            "last_period": {
                "date": "2025-01-08",
                "stats": [
                    stat("Sr. AI Engineer - Drew", "AI Engineer", "Drew", "2025-01-08", 50, 10),
                    stat(
                        "Sr. Full Stack - Blessing",
                        "Full Stack",
                        "Blessing",
                        "2025-01-08",
                        40,
                        4,
                    ),
                    stat("GTM Outbound", "GTM", "Blessing", "2025-01-08", 10, 2),
                ],
            },
        },
    });
    serde_json::from_value(payload).expect("request payload is valid")
}

#[test]
fn weak_roles_are_flagged_and_healthy_ones_are_not() {
    let digest =
        analyze(&three_role_request(), &AnalysisConfig::default()).expect("digest builds");

    let gtm = digest.role("gtm").expect("gtm analyzed");
    assert!(gtm.bottleneck);
    assert_eq!(gtm.health, Health::Red);
    assert_eq!(gtm.gap_to_hire, 267);

    let full_stack = digest.role("full-stack").expect("full stack analyzed");
    assert!(full_stack.bottleneck);
    assert_eq!(full_stack.bottleneck_label.as_deref(), Some("Onsite→Offer (12%)"));

    let ai = digest.role("ai-engineer").expect("ai analyzed");
    assert!(!ai.bottleneck);
    assert_eq!(ai.gap_to_hire, 17);
    assert_eq!(ai.screens_still_needed, 0);
}

#[test]
fn reference_dataset_flags_gtm_and_full_stack_only() {
    let payload = json!({
        "date": "2025-01-15",
        "now": "2025-01-15T12:00:00Z",
        "pipeline": {
            "roles": [
                five_stage_role(
                    "gtm", "GTM Engineer",
                    [20, 4, 2, 0, 0], [Some(0.20), Some(0.50), Some(0.0), None],
                ),
                five_stage_role(
                    "full-stack", "Senior Full Stack",
                    [24, 10, 5, 1, 0], [Some(0.42), Some(0.50), Some(0.14), Some(0.0)],
                ),
                five_stage_role(
                    "ai-engineer", "Senior AI Engineer",
                    [16, 8, 3, 2, 0], [Some(0.50), Some(0.42), Some(0.60), Some(0.0)],
                ),
            ],
        },
    });
    let request: AnalysisRequest = serde_json::from_value(payload).expect("valid request");

    let digest = analyze(&request, &AnalysisConfig::default()).expect("digest builds");

    let mut flagged: Vec<(&str, bool)> = digest
        .roles
        .iter()
        .map(|role| (role.role_id.as_str(), role.bottleneck))
        .collect();
    flagged.sort();
    assert_eq!(
        flagged,
        [("ai-engineer", false), ("full-stack", true), ("gtm", true)]
    );
    let statuses = |role_id: &str| -> Vec<RateStatus> {
        digest
            .role(role_id)
            .expect("role analyzed")
            .transitions
            .iter()
            .map(|transition| transition.status)
            .collect()
    };
    assert_eq!(
        statuses("ai-engineer"),
        [
            RateStatus::Observed,
            RateStatus::Observed,
            RateStatus::Observed,
            RateStatus::Pending,
        ]
    );
    assert_eq!(statuses("gtm")[2], RateStatus::Floored);
    assert_eq!(statuses("gtm")[3], RateStatus::Pending);
    assert_eq!(digest.summary.bottlenecked_roles, 2);
}

#[test]
fn sourcing_budget_and_goal_follow_the_gaps() {
    let digest =
        analyze(&three_role_request(), &AnalysisConfig::default()).expect("digest builds");

    let spent: u32 = digest.allocations.iter().map(|allocation| allocation.outreaches).sum();
    assert_eq!(spent, 120);
    let largest = digest
        .allocations
        .iter()
        .max_by_key(|allocation| allocation.outreaches)
        .expect("allocations present");
    assert_eq!(largest.role_id, "full-stack");

    let trends = digest.sourcing.trends.as_ref().expect("comparison period supplied");
    assert_eq!(trends.sent.momentum, Momentum::StrongUp);
    assert_eq!(trends.reply_rate.momentum, Momentum::Falling);

    let goal = digest.goal.as_ref().expect("week start supplied");
    assert_eq!(goal.role_id, "full-stack");
    assert_eq!(
        goal.week_start,
        NaiveDate::from_ymd_opt(2025, 1, 13).expect("valid week start")
    );
    assert_eq!(goal.target, 2);
}

#[test]
fn every_stakeholder_gets_an_action_list() {
    let engine = PulseEngine::new(AnalysisConfig::default());
    let digest = engine.analyze(&three_role_request()).expect("digest builds");

    for stakeholder in Stakeholder::ordered() {
        let plan = digest.plan_for(stakeholder).expect("plan per stakeholder");
        assert!(!plan.items.is_empty(), "{} has actions", stakeholder.label());
        assert!(plan.items.len() <= engine.config().recommendations.actions_per_stakeholder);
        let numbers: Vec<usize> = plan.items.iter().map(|item| item.number).collect();
        assert_eq!(numbers, (1..=plan.items.len()).collect::<Vec<_>>());
    }

    let red_pipelines = digest
        .recommendations
        .iter()
        .filter(|recommendation| recommendation.rule_id == "red-pipeline")
        .count();
    assert_eq!(red_pipelines, 2);
}

#[test]
fn chat_questions_reuse_the_digest() {
    let digest =
        analyze(&three_role_request(), &AnalysisConfig::default()).expect("digest builds");

    let context = route_query("How should we split the sourcing budget for GTM?", &digest);
    assert!(context.covers(QueryTopic::Allocation));
    assert_eq!(context.mentioned_roles, ["gtm"]);
    assert_eq!(context.allocations.len(), 1);
}
