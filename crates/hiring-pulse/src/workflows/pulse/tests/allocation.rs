use super::common::*;
use crate::workflows::pulse::allocation::{allocate, AllocationRequest, SourcingAllocator};
use crate::workflows::pulse::config::AllocationPolicy;
use crate::workflows::pulse::domain::Health;

fn request(role: &str, rank: u8, weight: f64) -> AllocationRequest {
    AllocationRequest {
        role_id: role.to_lowercase(),
        role_name: role.to_string(),
        priority: priority(rank),
        weight,
    }
}

#[test]
fn fixture_plan_favors_bottlenecked_roles() {
    let policy = AllocationPolicy::default();
    let funnels = funnels(&snapshot());
    let plan = SourcingAllocator::new(&policy).plan(&funnels);

    let summary: Vec<(&str, u32)> = plan
        .iter()
        .map(|allocation| (allocation.role_id.as_str(), allocation.outreaches))
        .collect();
    assert_eq!(
        summary,
        [("ai-engineer", 4), ("full-stack", 70), ("gtm", 46)]
    );
    assert_eq!(plan.iter().map(|a| a.outreaches).sum::<u32>(), 120);

    let full_stack = &plan[1];
    assert_eq!(full_stack.weight, 45.0);
    assert_eq!(full_stack.reason, "Critical: Onsite→Offer (12%) bottleneck");
    assert_eq!(plan[0].reason, "Healthy, maintain flow");
}

#[test]
fn weight_factors_follow_policy() {
    let policy = AllocationPolicy::default();
    let allocator = SourcingAllocator::new(&policy);

    assert_eq!(allocator.priority_factor(priority(1)), 3.0);
    assert_eq!(allocator.priority_factor(priority(3)), 1.0);
    assert_eq!(allocator.priority_factor(priority(7)), 1.0);
    assert_eq!(allocator.gap_factor(30), 1.5);
    assert_eq!(allocator.gap_factor(10_000), 5.0);
    assert_eq!(allocator.health_factor(Health::Red), 3.0);
    assert_eq!(allocator.health_factor(Health::Green), 1.0);
}

#[test]
fn largest_remainder_sums_to_capacity() {
    let requests = [request("A", 1, 1.0), request("B", 1, 1.0), request("C", 1, 1.0)];
    assert_eq!(allocate(&requests, 100), vec![34, 33, 33]);
}

#[test]
fn remainder_ties_go_to_higher_priority_then_name() {
    let requests = [request("Zeta", 2, 1.0), request("Beta", 1, 1.0), request("Alpha", 1, 1.0)];
    assert_eq!(allocate(&requests, 4), vec![1, 1, 2]);
}

#[test]
fn zero_weights_split_evenly() {
    let requests = [request("A", 1, 0.0), request("B", 2, f64::NAN), request("C", 3, -4.0)];
    assert_eq!(allocate(&requests, 9), vec![3, 3, 3]);
}

#[test]
fn invalid_weights_count_as_zero_next_to_valid_ones() {
    let requests = [request("A", 1, 3.0), request("B", 1, f64::INFINITY), request("C", 1, 1.0)];
    assert_eq!(allocate(&requests, 8), vec![6, 0, 2]);
}

#[test]
fn empty_requests_allocate_nothing() {
    assert!(allocate(&[], 120).is_empty());
}

#[test]
fn plan_reason_reflects_health() {
    let policy = AllocationPolicy::default();
    let mut red = funnel("red", "Red Role", 1, 100, 10, Health::Red);
    red.bottleneck_label = None;
    let yellow = funnel("yellow", "Yellow Role", 2, 40, 30, Health::Yellow);

    let plan = SourcingAllocator::new(&policy).plan(&[yellow, red]);
    assert_eq!(plan[0].role_id, "red");
    assert_eq!(plan[0].reason, "Critical pipeline gap");
    assert_eq!(plan[1].reason, "Moderate gap, needs attention");
    assert!((plan[0].share + plan[1].share - 1.0).abs() < 1e-9);
}
