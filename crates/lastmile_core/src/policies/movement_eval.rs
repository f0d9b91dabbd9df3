//! Idle movement evaluation: whether a waiting courier drifts to a new spot.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::Rng;

use crate::spatial::{neighbor_zones, zone_center, zone_for, Location};

pub trait CourierMovementEvaluationPolicy: Send + Sync {
    /// A destination to drift toward, or `None` to stay put.
    fn next_destination(&self, current: Location, rng: &mut StdRng) -> Option<Location>;
}

#[derive(Resource)]
pub struct MovementEvaluationPolicyResource(pub Box<dyn CourierMovementEvaluationPolicy>);

/// Never moves while idle.
#[derive(Debug, Default)]
pub struct StillMovementEvaluationPolicy;

impl CourierMovementEvaluationPolicy for StillMovementEvaluationPolicy {
    fn next_destination(&self, _current: Location, _rng: &mut StdRng) -> Option<Location> {
        None
    }
}

/// Drifts to the centre of a uniformly chosen neighbouring zone.
#[derive(Debug, Default)]
pub struct NeighborsMovementEvaluationPolicy;

impl CourierMovementEvaluationPolicy for NeighborsMovementEvaluationPolicy {
    fn next_destination(&self, current: Location, rng: &mut StdRng) -> Option<Location> {
        let zone = zone_for(current)?;
        let neighbors: Vec<_> = neighbor_zones(zone, 1)
            .into_iter()
            .filter(|candidate| *candidate != zone)
            .collect();
        if neighbors.is_empty() {
            return None;
        }
        let pick = neighbors[rng.gen_range(0..neighbors.len())];
        Some(zone_center(pick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::haversine_km;
    use rand::SeedableRng;

    #[test]
    fn still_policy_never_moves() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(StillMovementEvaluationPolicy
            .next_destination(Location::new(52.52, 13.4), &mut rng)
            .is_none());
    }

    #[test]
    fn neighbors_policy_picks_a_nearby_zone() {
        let mut rng = StdRng::seed_from_u64(0);
        let current = Location::new(52.52, 13.4);
        let destination = NeighborsMovementEvaluationPolicy
            .next_destination(current, &mut rng)
            .expect("neighbor zone");
        let distance = haversine_km(current, destination);
        assert!(distance > 0.0);
        assert!(distance < 3.0, "drift should stay local, got {distance} km");
    }
}
