use std::collections::HashMap;

use domain::guard_config::ChargeStrategy;
use domain::worker::WorkerId;

/// Turns a per-worker credit vector and a round target into a per-worker
/// quota vector under a chosen strategy (C4). Pure: same inputs produce the
/// same outputs. Never blocks, never calls into the batch tracker or
/// dispatch pipeline. Workers absent from `credits` are simply absent from
/// the returned plan (treated as zero by callers).
pub struct PlannerService;

impl PlannerService {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn plan(
        &self,
        strategy: ChargeStrategy,
        credits: &[(WorkerId, i64)],
        target: u32,
    ) -> HashMap<WorkerId, u32> {
        let target = u64::from(target);
        match strategy {
            ChargeStrategy::Greedy => greedy(credits, target),
            ChargeStrategy::RoundRobin => round_robin(credits, target),
            ChargeStrategy::Balanced => balanced(credits, target),
        }
    }
}

impl Default for PlannerService {
    fn default() -> Self {
        Self::new()
    }
}

fn nonneg(credit: i64) -> u64 {
    u64::try_from(credit.max(0)).unwrap_or(0)
}

/// Sort workers by descending credit, then take `min(credit, remaining)`
/// from each in that order.
fn greedy(credits: &[(WorkerId, i64)], target: u64) -> HashMap<WorkerId, u32> {
    let mut ordered: Vec<&(WorkerId, i64)> = credits.iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1));

    let mut plan = HashMap::new();
    let mut remaining = target;
    for (id, credit) in ordered {
        if remaining == 0 {
            break;
        }
        let take = nonneg(*credit).min(remaining);
        if take > 0 {
            plan.insert(id.clone(), u32::try_from(take).unwrap_or(u32::MAX));
        }
        remaining -= take;
    }
    plan
}

/// Circulate over workers with credit > 0, awarding one unit per visit
/// until `target` is reached or every worker is saturated.
fn round_robin(credits: &[(WorkerId, i64)], target: u64) -> HashMap<WorkerId, u32> {
    let mut pool: Vec<(WorkerId, u64)> = credits
        .iter()
        .map(|(id, c)| (id.clone(), nonneg(*c)))
        .filter(|(_, c)| *c > 0)
        .collect();

    let mut plan: HashMap<WorkerId, u32> = HashMap::new();
    let mut remaining = target;
    loop {
        if remaining == 0 || pool.is_empty() {
            break;
        }
        let mut awarded = false;
        for (id, credit) in &mut pool {
            if remaining == 0 {
                break;
            }
            if *credit == 0 {
                continue;
            }
            *plan.entry(id.clone()).or_insert(0) += 1;
            *credit -= 1;
            remaining -= 1;
            awarded = true;
        }
        if !awarded {
            break;
        }
    }
    plan
}

/// Proportional allocation: floor share `= floor(credit * target /
/// sum_credits)` per worker, leftover distributed one-by-one to the
/// workers with the largest fractional remainder, skipping any that would
/// exceed their credit.
fn balanced(credits: &[(WorkerId, i64)], target: u64) -> HashMap<WorkerId, u32> {
    let pool: Vec<(WorkerId, u64)> = credits.iter().map(|(id, c)| (id.clone(), nonneg(*c))).collect();
    let sum_credits: u64 = pool.iter().map(|(_, c)| *c).sum();
    if sum_credits == 0 || target == 0 {
        return HashMap::new();
    }
    let capped_target = target.min(sum_credits);

    let mut plan: HashMap<WorkerId, u32> = HashMap::new();
    let mut fractional: Vec<(usize, u64)> = Vec::with_capacity(pool.len());
    let mut allocated: u64 = 0;

    for (idx, (id, credit)) in pool.iter().enumerate() {
        let product = u128::from(*credit) * u128::from(capped_target);
        let share = u64::try_from(product / u128::from(sum_credits)).unwrap_or(0);
        let remainder = u64::try_from(product % u128::from(sum_credits)).unwrap_or(0);
        if share > 0 {
            plan.insert(id.clone(), u32::try_from(share).unwrap_or(u32::MAX));
        }
        allocated += share;
        fractional.push((idx, remainder));
    }

    fractional.sort_by(|a, b| b.1.cmp(&a.1));
    let mut leftover = capped_target.saturating_sub(allocated);

    for (idx, _) in fractional {
        if leftover == 0 {
            break;
        }
        let Some((id, credit)) = pool.get(idx) else {
            continue;
        };
        let current = u64::from(plan.get(id).copied().unwrap_or(0));
        if current < *credit {
            *plan.entry(id.clone()).or_insert(0) += 1;
            leftover -= 1;
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(name: &str) -> WorkerId {
        WorkerId::new(name)
    }

    #[test]
    fn greedy_prefers_highest_credit_first() {
        let planner = PlannerService::new();
        let credits = vec![(worker("a"), 5), (worker("b"), 20), (worker("c"), 3)];
        let plan = planner.plan(ChargeStrategy::Greedy, &credits, 15);
        assert_eq!(plan.get(&worker("b")), Some(&15));
        assert_eq!(plan.get(&worker("a")), None);
    }

    #[test]
    fn round_robin_spreads_evenly() {
        let planner = PlannerService::new();
        let credits = vec![(worker("a"), 10), (worker("b"), 10)];
        let plan = planner.plan(ChargeStrategy::RoundRobin, &credits, 7);
        let total: u32 = plan.values().sum();
        assert_eq!(total, 7);
        for (_, quota) in &plan {
            assert!(*quota <= 10);
        }
    }

    #[test]
    fn balanced_never_exceeds_credit() {
        let planner = PlannerService::new();
        let credits = vec![(worker("a"), 3), (worker("b"), 7)];
        let plan = planner.plan(ChargeStrategy::Balanced, &credits, 10);
        assert!(plan.get(&worker("a")).copied().unwrap_or(0) <= 3);
        assert!(plan.get(&worker("b")).copied().unwrap_or(0) <= 7);
        let total: u32 = plan.values().sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn never_exceeds_target_or_total_credits() {
        let planner = PlannerService::new();
        let credits = vec![(worker("a"), 2), (worker("b"), 2)];
        for strategy in [ChargeStrategy::Greedy, ChargeStrategy::RoundRobin, ChargeStrategy::Balanced] {
            let plan = planner.plan(strategy, &credits, 100);
            let total: u32 = plan.values().sum();
            assert!(total <= 4);
        }
    }
}
