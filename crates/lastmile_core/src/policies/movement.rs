//! Courier movement policies: how a courier travels to a destination.
//!
//! A policy resolves the polyline once (through the routing client) and the
//! movement system then asks for one leg duration at a time, so the hour of
//! day is sampled when each leg actually starts.

use bevy_ecs::prelude::Resource;

use crate::ecs::Vehicle;
use crate::routing::RoutingClient;
use crate::spatial::{haversine_km, Location};

/// Hourly velocity coefficients (index = hour of day). Values above 1 mean
/// faster-than-average travel (late night), below 1 slower (lunch, evening).
pub const SPEED_COEFFICIENTS: [f64; 24] = [
    1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.13, 1.04, 1.0, 0.91, 0.90, 0.93, 0.95, 1.02,
    1.0, 0.91, 0.87, 0.88, 0.99, 1.23, 1.23,
];

pub trait CourierMovementPolicy: Send + Sync {
    /// Resolve the polyline from origin to destination.
    fn plan(
        &self,
        routing: &dyn RoutingClient,
        origin: Location,
        destination: Location,
    ) -> Vec<Location>;

    /// Travel time in whole seconds for one polyline leg, sampled at the
    /// hour the leg starts.
    fn leg_duration_secs(
        &self,
        from: Location,
        to: Location,
        vehicle: &Vehicle,
        hour_of_day: u8,
    ) -> u64;
}

#[derive(Resource)]
pub struct MovementPolicyResource(pub Box<dyn CourierMovementPolicy>);

/// Moves along the routed polyline at the vehicle's average velocity.
#[derive(Debug, Default)]
pub struct RoutedMovementPolicy;

impl CourierMovementPolicy for RoutedMovementPolicy {
    fn plan(
        &self,
        routing: &dyn RoutingClient,
        origin: Location,
        destination: Location,
    ) -> Vec<Location> {
        routing.get_route(origin, destination).points
    }

    fn leg_duration_secs(
        &self,
        from: Location,
        to: Location,
        vehicle: &Vehicle,
        _hour_of_day: u8,
    ) -> u64 {
        leg_secs(from, to, vehicle.average_velocity)
    }
}

/// Moves along the routed polyline with the vehicle velocity scaled by the
/// time-of-day coefficient table.
#[derive(Debug, Default)]
pub struct DynamicRoutedMovementPolicy;

impl CourierMovementPolicy for DynamicRoutedMovementPolicy {
    fn plan(
        &self,
        routing: &dyn RoutingClient,
        origin: Location,
        destination: Location,
    ) -> Vec<Location> {
        routing.get_route(origin, destination).points
    }

    fn leg_duration_secs(
        &self,
        from: Location,
        to: Location,
        vehicle: &Vehicle,
        hour_of_day: u8,
    ) -> u64 {
        let coefficient = SPEED_COEFFICIENTS[(hour_of_day as usize) % 24];
        leg_secs(from, to, vehicle.average_velocity * coefficient)
    }
}

fn leg_secs(from: Location, to: Location, velocity: f64) -> u64 {
    if velocity <= 0.0 {
        return 0;
    }
    (haversine_km(from, to) / velocity) as u64
}
