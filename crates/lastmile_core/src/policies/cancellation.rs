//! Cancellation policies: the user-side wait before giving up on an order,
//! and the dispatcher-side rule for whether a cancellation may proceed.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::Rng;

use crate::ecs::OrderState;

pub trait UserCancellationPolicy: Send + Sync {
    /// Seconds the user waits after placement before cancelling an order
    /// that has not been picked up.
    fn wait_secs(&self, rng: &mut StdRng) -> u64;
}

#[derive(Resource)]
pub struct UserCancellationPolicyResource(pub Box<dyn UserCancellationPolicy>);

/// Uniformly distributed patience window.
#[derive(Debug)]
pub struct RandomWaitCancellationPolicy {
    pub min_wait_secs: u64,
    pub max_wait_secs: u64,
}

impl Default for RandomWaitCancellationPolicy {
    fn default() -> Self {
        Self {
            min_wait_secs: 600,
            max_wait_secs: 1800,
        }
    }
}

impl UserCancellationPolicy for RandomWaitCancellationPolicy {
    fn wait_secs(&self, rng: &mut StdRng) -> u64 {
        rng.gen_range(self.min_wait_secs..=self.max_wait_secs.max(self.min_wait_secs))
    }
}

pub trait DispatcherCancellationPolicy: Send + Sync {
    /// Whether a cancellation request for an order in this state may proceed.
    /// `in_store` is true once the courier has reported at the pick-up.
    fn should_cancel(&self, state: OrderState, in_store: bool) -> bool;
}

#[derive(Resource)]
pub struct DispatcherCancellationPolicyResource(pub Box<dyn DispatcherCancellationPolicy>);

/// Cancellations proceed while the order is waiting or merely scheduled;
/// once the courier is in the store the order is committed.
#[derive(Debug, Default)]
pub struct StaticCancellationPolicy;

impl DispatcherCancellationPolicy for StaticCancellationPolicy {
    fn should_cancel(&self, state: OrderState, in_store: bool) -> bool {
        !in_store && matches!(state, OrderState::Placed | OrderState::Scheduled)
    }
}
