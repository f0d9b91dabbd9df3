//! Simulation settings: one explicit value threaded through scenario build.
//!
//! All times are simulated seconds since midnight. Policy selectors are
//! closed enums resolved to boxed implementations in `scenario::build`.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::ONE_HOUR_SECS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcceptancePolicyKind {
    #[default]
    Uniform,
    Absolute,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementPolicyKind {
    #[default]
    Routed,
    DynamicRouted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementEvaluationPolicyKind {
    #[default]
    Neighbors,
    Still,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferingPolicyKind {
    #[default]
    Rolling,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchingPolicyKind {
    #[default]
    Greedy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatcherCancellationPolicyKind {
    #[default]
    Static,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCancellationPolicyKind {
    #[default]
    Random,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrepositioningPolicyKind {
    #[default]
    None,
    DemandBalance,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandManagementPolicyKind {
    #[default]
    None,
    Radius,
}

/// Which routing backend the scenario uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum RoutingClientKind {
    /// Straight-line routes, zero external dependencies.
    #[default]
    Haversine,
    /// OSRM HTTP endpoint (e.g. `"http://localhost:5000"`).
    #[cfg(feature = "osrm")]
    Osrm { endpoint: String },
}

/// Simulation end time in seconds. When present, the runner stops once the
/// next event would land at or past this instant.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationEnd(pub u64);

#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Simulation start, seconds since midnight.
    pub simulate_from: u64,
    /// Initial window whose finished orders are excluded from metrics.
    pub warm_up_time: u64,
    pub create_users_from: u64,
    pub create_users_until: u64,
    pub create_couriers_from: u64,
    pub create_couriers_until: u64,

    pub courier_wait_to_move: u64,
    pub courier_min_acceptance_rate: f64,
    pub courier_earnings_per_order: f64,
    pub courier_earnings_per_hour: f64,

    pub order_pick_up_service_time: u64,
    pub order_drop_off_service_time: u64,

    pub dispatcher_prospects_max_distance_km: f64,
    pub buffering_interval_secs: u64,
    pub prepositioning_interval_secs: u64,

    pub density_threshold: usize,
    pub limit_radius_km: f64,
    pub substitution_prob: f64,

    pub user_cancellation_min_wait_secs: u64,
    pub user_cancellation_max_wait_secs: u64,

    pub acceptance_policy: AcceptancePolicyKind,
    pub movement_policy: MovementPolicyKind,
    pub movement_evaluation_policy: MovementEvaluationPolicyKind,
    pub buffering_policy: BufferingPolicyKind,
    pub matching_policy: MatchingPolicyKind,
    pub dispatcher_cancellation_policy: DispatcherCancellationPolicyKind,
    pub user_cancellation_policy: UserCancellationPolicyKind,
    pub prepositioning_policy: PrepositioningPolicyKind,
    pub demand_management_policy: DemandManagementPolicyKind,
    pub routing_client: RoutingClientKind,

    pub seed: u64,
    /// Absolute end of the run, seconds since midnight. `None` runs until the
    /// event queue drains.
    pub simulate_until: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            simulate_from: 7 * ONE_HOUR_SECS,
            warm_up_time: 1800,
            create_users_from: 0,
            create_users_until: u64::MAX,
            create_couriers_from: 0,
            create_couriers_until: u64::MAX,
            courier_wait_to_move: 600,
            courier_min_acceptance_rate: 0.4,
            courier_earnings_per_order: 3.0,
            courier_earnings_per_hour: 8.0,
            order_pick_up_service_time: 120,
            order_drop_off_service_time: 120,
            dispatcher_prospects_max_distance_km: 3.0,
            buffering_interval_secs: 10,
            prepositioning_interval_secs: 600,
            density_threshold: 30,
            limit_radius_km: 2.5,
            substitution_prob: 0.3,
            user_cancellation_min_wait_secs: 600,
            user_cancellation_max_wait_secs: 1800,
            acceptance_policy: AcceptancePolicyKind::default(),
            movement_policy: MovementPolicyKind::default(),
            movement_evaluation_policy: MovementEvaluationPolicyKind::default(),
            buffering_policy: BufferingPolicyKind::default(),
            matching_policy: MatchingPolicyKind::default(),
            dispatcher_cancellation_policy: DispatcherCancellationPolicyKind::default(),
            user_cancellation_policy: UserCancellationPolicyKind::default(),
            prepositioning_policy: PrepositioningPolicyKind::default(),
            demand_management_policy: DemandManagementPolicyKind::default(),
            routing_client: RoutingClientKind::default(),
            seed: 0,
            simulate_until: None,
        }
    }
}

impl SimulationSettings {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_simulate_from(mut self, simulate_from: u64) -> Self {
        self.simulate_from = simulate_from;
        self
    }

    pub fn with_simulate_until(mut self, simulate_until: u64) -> Self {
        self.simulate_until = Some(simulate_until);
        self
    }

    pub fn with_warm_up_time(mut self, warm_up_time: u64) -> Self {
        self.warm_up_time = warm_up_time;
        self
    }

    pub fn with_acceptance_policy(mut self, kind: AcceptancePolicyKind) -> Self {
        self.acceptance_policy = kind;
        self
    }

    pub fn with_movement_policy(mut self, kind: MovementPolicyKind) -> Self {
        self.movement_policy = kind;
        self
    }

    pub fn with_movement_evaluation_policy(mut self, kind: MovementEvaluationPolicyKind) -> Self {
        self.movement_evaluation_policy = kind;
        self
    }

    pub fn with_matching_policy(mut self, kind: MatchingPolicyKind) -> Self {
        self.matching_policy = kind;
        self
    }

    pub fn with_prepositioning_policy(mut self, kind: PrepositioningPolicyKind) -> Self {
        self.prepositioning_policy = kind;
        self
    }

    pub fn with_demand_management_policy(mut self, kind: DemandManagementPolicyKind) -> Self {
        self.demand_management_policy = kind;
        self
    }

    pub fn with_buffering_interval(mut self, interval_secs: u64) -> Self {
        self.buffering_interval_secs = interval_secs;
        self
    }

    pub fn with_substitution_prob(mut self, substitution_prob: f64) -> Self {
        self.substitution_prob = substitution_prob;
        self
    }

    /// End of the warm-up window in absolute simulation seconds.
    pub fn warm_up_end(&self) -> u64 {
        self.simulate_from.saturating_add(self.warm_up_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warm_up_end_is_relative_to_start() {
        let settings = SimulationSettings::default()
            .with_simulate_from(3600)
            .with_warm_up_time(600);
        assert_eq!(settings.warm_up_end(), 4200);
    }

    #[test]
    fn settings_roundtrip_through_json() {
        let settings = SimulationSettings::default()
            .with_seed(7)
            .with_acceptance_policy(AcceptancePolicyKind::Absolute);
        let json = serde_json::to_string(&settings).expect("serialize");
        let back: SimulationSettings = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.seed, 7);
        assert_eq!(back.acceptance_policy, AcceptancePolicyKind::Absolute);
    }
}
