use hiring_pulse::workflows::pulse::{allocate, gap_to_hire, AllocationRequest, Priority};
use proptest::prelude::*;

fn requests(specs: &[(u8, f64)]) -> Vec<AllocationRequest> {
    specs
        .iter()
        .enumerate()
        .map(|(index, (rank, weight))| AllocationRequest {
            role_id: format!("role-{index}"),
            role_name: format!("Role {index}"),
            priority: Priority::new(*rank).expect("rank is positive"),
            weight: *weight,
        })
        .collect()
}

fn arb_specs() -> impl Strategy<Value = Vec<(u8, f64)>> {
    prop::collection::vec((1u8..=4, 0.0f64..50.0), 1..8)
}

proptest! {
    #[test]
    fn allocation_always_spends_the_whole_budget(
        specs in arb_specs(),
        capacity in 0u32..2_000,
    ) {
        let counts = allocate(&requests(&specs), capacity);

        prop_assert_eq!(counts.len(), specs.len());
        let spent: u64 = counts.iter().map(|count| u64::from(*count)).sum();
        prop_assert_eq!(spent, u64::from(capacity));
    }

    #[test]
    fn each_share_stays_within_one_of_its_quota(
        specs in arb_specs(),
        capacity in 1u32..2_000,
    ) {
        let counts = allocate(&requests(&specs), capacity);
        let total: f64 = specs.iter().map(|(_, weight)| *weight).sum();
        prop_assume!(total > 0.0);

        for ((_, weight), count) in specs.iter().zip(&counts) {
            let quota = weight / total * f64::from(capacity);
            prop_assert!((f64::from(*count) - quota).abs() <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn weightless_requests_split_evenly(
        ranks in prop::collection::vec(1u8..=4, 1..8),
        capacity in 0u32..500,
    ) {
        let specs: Vec<(u8, f64)> = ranks.iter().map(|rank| (*rank, 0.0)).collect();
        let counts = allocate(&requests(&specs), capacity);

        let max = counts.iter().copied().max().unwrap_or(0);
        let min = counts.iter().copied().min().unwrap_or(0);
        prop_assert!(max - min <= 1);
    }

    #[test]
    fn better_conversion_never_raises_the_gap(
        rates in prop::collection::vec(0.01f64..=1.0, 1..6),
        index in 0usize..6,
        lift in 0.0f64..1.0,
    ) {
        let index = index % rates.len();
        let mut improved = rates.clone();
        improved[index] = (improved[index] + lift).min(1.0);

        let before = gap_to_hire(&rates, 0.05);
        let after = gap_to_hire(&improved, 0.05);
        prop_assert!(before >= 1);
        prop_assert!(after <= before);
    }
}

#[test]
fn perfect_conversion_needs_one_candidate() {
    assert_eq!(gap_to_hire(&[1.0, 1.0, 1.0], 0.05), 1);
    assert_eq!(gap_to_hire(&[], 0.05), 1);
}

#[test]
fn unusable_rates_fall_back_to_the_floor() {
    assert_eq!(gap_to_hire(&[0.0], 0.05), 20);
    assert_eq!(gap_to_hire(&[f64::NAN, 0.5], 0.05), 40);
}
