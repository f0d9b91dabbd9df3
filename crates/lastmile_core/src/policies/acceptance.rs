//! Courier acceptance policies: how an offer becomes an accept or a reject.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::Rng;

/// Outcome of running the acceptance policy for one notification. The wait
/// models the courier's decision delay and is realized on the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceptanceDecision {
    pub wait_secs: u64,
    pub accepted: bool,
}

pub trait CourierAcceptancePolicy: Send + Sync {
    fn execute(&self, acceptance_rate: f64, rng: &mut StdRng) -> AcceptanceDecision;
}

#[derive(Resource)]
pub struct AcceptancePolicyResource(pub Box<dyn CourierAcceptancePolicy>);

/// Immediate Bernoulli decision with parameter `acceptance_rate`.
#[derive(Debug, Default)]
pub struct AbsoluteAcceptancePolicy;

impl CourierAcceptancePolicy for AbsoluteAcceptancePolicy {
    fn execute(&self, acceptance_rate: f64, rng: &mut StdRng) -> AcceptanceDecision {
        AcceptanceDecision {
            wait_secs: 0,
            accepted: rng.gen::<f64>() < acceptance_rate,
        }
    }
}

/// Bernoulli decision after a uniformly distributed decision delay.
#[derive(Debug)]
pub struct UniformAcceptancePolicy {
    pub min_wait_secs: u64,
    pub max_wait_secs: u64,
}

impl Default for UniformAcceptancePolicy {
    fn default() -> Self {
        Self {
            min_wait_secs: 2,
            max_wait_secs: 10,
        }
    }
}

impl CourierAcceptancePolicy for UniformAcceptancePolicy {
    fn execute(&self, acceptance_rate: f64, rng: &mut StdRng) -> AcceptanceDecision {
        let wait_secs = rng.gen_range(self.min_wait_secs..=self.max_wait_secs.max(self.min_wait_secs));
        AcceptanceDecision {
            wait_secs,
            accepted: rng.gen::<f64>() < acceptance_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn absolute_policy_is_immediate() {
        let mut rng = StdRng::seed_from_u64(1);
        let decision = AbsoluteAcceptancePolicy.execute(1.0, &mut rng);
        assert_eq!(decision.wait_secs, 0);
        assert!(decision.accepted);
    }

    #[test]
    fn absolute_policy_rejects_at_zero_rate() {
        let mut rng = StdRng::seed_from_u64(1);
        let decision = AbsoluteAcceptancePolicy.execute(0.0, &mut rng);
        assert!(!decision.accepted);
    }

    #[test]
    fn uniform_policy_waits_within_bounds() {
        let policy = UniformAcceptancePolicy {
            min_wait_secs: 3,
            max_wait_secs: 7,
        };
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let decision = policy.execute(0.5, &mut rng);
            assert!((3..=7).contains(&decision.wait_secs));
        }
    }
}
