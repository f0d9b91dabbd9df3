//! Demand-management admission control.

use bevy_ecs::prelude::Resource;

use crate::spatial::{haversine_km, Location};

pub trait DispatcherDemandManagementPolicy: Send + Sync {
    /// Whether an order with this pick-up/drop-off pair is admitted.
    /// `current_radius_km` is the dispatcher's congestion signal.
    fn admit(&self, pick_up_at: Location, drop_off_at: Location, current_radius_km: f64) -> bool;
}

#[derive(Resource)]
pub struct DemandManagementPolicyResource(pub Box<dyn DispatcherDemandManagementPolicy>);

/// Admit everything (default).
#[derive(Debug, Default)]
pub struct NoDemandManagementPolicy;

impl DispatcherDemandManagementPolicy for NoDemandManagementPolicy {
    fn admit(&self, _pick_up_at: Location, _drop_off_at: Location, _current_radius_km: f64) -> bool {
        true
    }
}

/// Admit only orders whose pick-up to drop-off distance fits inside the
/// current congestion radius.
#[derive(Debug, Default)]
pub struct RadiusDemandManagementPolicy;

impl DispatcherDemandManagementPolicy for RadiusDemandManagementPolicy {
    fn admit(&self, pick_up_at: Location, drop_off_at: Location, current_radius_km: f64) -> bool {
        haversine_km(pick_up_at, drop_off_at) <= current_radius_km
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_policy_admits_everything() {
        let policy = NoDemandManagementPolicy;
        assert!(policy.admit(Location::new(0.0, 0.0), Location::new(0.0, 10.0), 0.0));
    }

    #[test]
    fn radius_policy_rejects_long_orders_under_congestion() {
        let policy = RadiusDemandManagementPolicy;
        let pick_up = Location::new(0.0, 0.0);
        let drop_off = Location::new(0.0, 0.1); // ~11 km
        assert!(!policy.admit(pick_up, drop_off, 2.5));
        assert!(policy.admit(pick_up, drop_off, f64::INFINITY));
    }
}
