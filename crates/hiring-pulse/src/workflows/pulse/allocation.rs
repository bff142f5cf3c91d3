use serde::{Deserialize, Serialize};

use super::config::AllocationPolicy;
use super::domain::{Health, Priority};
use super::funnel::FunnelResult;

/// One role's claim on the weekly outreach budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub role_id: String,
    pub role_name: String,
    pub priority: Priority,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub role_id: String,
    pub role_name: String,
    pub priority: Priority,
    pub weight: f64,
    /// Fraction of the budget before rounding.
    pub share: f64,
    pub outreaches: u32,
    pub reason: String,
}

/// Split `capacity` across the requests in proportion to their weights.
///
/// Largest-remainder rounding: the result always sums to `capacity`. Remainder ties go to the
/// higher priority, then the alphabetically first role name. Negative or non-finite weights count
/// as zero; when nothing carries weight the budget is split evenly. Output order follows input.
pub fn allocate(requests: &[AllocationRequest], capacity: u32) -> Vec<u32> {
    if requests.is_empty() {
        return Vec::new();
    }

    let mut weights: Vec<f64> = requests
        .iter()
        .map(|request| {
            if request.weight.is_finite() && request.weight > 0.0 {
                request.weight
            } else {
                0.0
            }
        })
        .collect();
    let mut total: f64 = weights.iter().sum();
    if !(total > 0.0 && total.is_finite()) {
        weights = vec![1.0; requests.len()];
        total = requests.len() as f64;
    }

    let quotas: Vec<f64> = weights
        .iter()
        .map(|weight| weight / total * f64::from(capacity))
        .collect();
    let mut counts: Vec<u32> = quotas.iter().map(|quota| quota.floor() as u32).collect();
    let assigned: u64 = counts.iter().map(|count| u64::from(*count)).sum();
    let remainder = u64::from(capacity).saturating_sub(assigned) as usize;

    let mut order: Vec<usize> = (0..requests.len()).collect();
    order.sort_by(|left, right| {
        let left_fraction = quotas[*left] - quotas[*left].floor();
        let right_fraction = quotas[*right] - quotas[*right].floor();
        right_fraction
            .total_cmp(&left_fraction)
            .then_with(|| requests[*left].priority.cmp(&requests[*right].priority))
            .then_with(|| requests[*left].role_name.cmp(&requests[*right].role_name))
    });

    for step in 0..remainder {
        counts[order[step % order.len()]] += 1;
    }
    counts
}

/// Turns funnel results into the weekly sourcing plan.
pub struct SourcingAllocator<'a> {
    policy: &'a AllocationPolicy,
}

impl<'a> SourcingAllocator<'a> {
    pub fn new(policy: &'a AllocationPolicy) -> Self {
        Self { policy }
    }

    /// P1 weighs `priority_levels`, each lower tier one less, never below 1.
    pub fn priority_factor(&self, priority: Priority) -> f64 {
        let levels = i32::from(self.policy.priority_levels);
        let factor = levels + 1 - i32::from(priority.rank());
        f64::from(factor.max(1))
    }

    pub fn gap_factor(&self, gap_to_hire: u32) -> f64 {
        (f64::from(gap_to_hire) / self.policy.gap_divisor).min(self.policy.gap_factor_cap)
    }

    pub fn health_factor(&self, health: Health) -> f64 {
        match health {
            Health::Red => self.policy.red_factor,
            Health::Yellow => self.policy.yellow_factor,
            Health::Green => self.policy.green_factor,
        }
    }

    pub fn weight(&self, funnel: &FunnelResult) -> f64 {
        self.priority_factor(funnel.priority)
            * self.gap_factor(funnel.gap_to_hire)
            * self.health_factor(funnel.health)
    }

    /// Allocations ordered by priority, then role name.
    pub fn plan(&self, funnels: &[FunnelResult]) -> Vec<Allocation> {
        let capacity = self.policy.weekly_capacity;
        let requests: Vec<AllocationRequest> = funnels
            .iter()
            .map(|funnel| AllocationRequest {
                role_id: funnel.role_id.clone(),
                role_name: funnel.role_name.clone(),
                priority: funnel.priority,
                weight: self.weight(funnel),
            })
            .collect();
        let counts = allocate(&requests, capacity);
        let total_weight: f64 = requests
            .iter()
            .map(|request| request.weight.max(0.0))
            .sum();

        let mut plan: Vec<Allocation> = requests
            .into_iter()
            .zip(counts)
            .zip(funnels)
            .map(|((request, outreaches), funnel)| Allocation {
                share: if total_weight > 0.0 {
                    request.weight / total_weight
                } else {
                    1.0 / funnels.len() as f64
                },
                reason: allocation_reason(funnel),
                role_id: request.role_id,
                role_name: request.role_name,
                priority: request.priority,
                weight: request.weight,
                outreaches,
            })
            .collect();
        plan.sort_by(|left, right| {
            left.priority
                .cmp(&right.priority)
                .then_with(|| left.role_name.cmp(&right.role_name))
        });
        plan
    }
}

fn allocation_reason(funnel: &FunnelResult) -> String {
    match (funnel.health, &funnel.bottleneck_label) {
        (Health::Red, Some(label)) => format!("Critical: {label} bottleneck"),
        (Health::Red, None) => "Critical pipeline gap".to_string(),
        (Health::Yellow, _) => "Moderate gap, needs attention".to_string(),
        (Health::Green, _) => "Healthy, maintain flow".to_string(),
    }
}
