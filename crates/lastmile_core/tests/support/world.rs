//! Shared test scaffolding: scenario worlds, hand-spawned couriers, and
//! stepping helpers.

use bevy_ecs::prelude::{Entity, Schedule, World};

use lastmile_core::clock::{Event, EventKind, EventSubject, Priority, SimulationClock};
use lastmile_core::datasource::{InMemoryDataSource, OrderRow};
use lastmile_core::dispatcher::Dispatcher;
use lastmile_core::ecs::{Courier, Position, Vehicle, VehicleKind};
use lastmile_core::runner::{initialize_simulation, run_next_event, simulation_schedule};
use lastmile_core::scenario::{
    build_scenario, AcceptancePolicyKind, MovementEvaluationPolicyKind, SimulationSettings,
};
use lastmile_core::spatial::{haversine_km, Location};

/// A vehicle covering just under one degree of equatorial longitude per
/// second, so a leg of `n` degrees takes `n` whole seconds.
pub fn unit_vehicle() -> Vehicle {
    let unit_km = haversine_km(Location::new(0.0, 0.0), Location::new(0.0, 1.0));
    Vehicle::with_velocity(VehicleKind::Motorcycle, unit_km * 0.999)
}

/// Deterministic baseline settings: immediate absolute acceptance, no idle
/// drift, 10s pick-up/drop-off service, and a patient user.
pub fn test_settings() -> SimulationSettings {
    let mut settings = SimulationSettings::default()
        .with_simulate_from(0)
        .with_warm_up_time(0)
        .with_simulate_until(200)
        .with_acceptance_policy(AcceptancePolicyKind::Absolute)
        .with_movement_evaluation_policy(MovementEvaluationPolicyKind::Still)
        .with_buffering_interval(10);
    settings.courier_wait_to_move = 3600;
    settings.dispatcher_prospects_max_distance_km = 1.0e6;
    settings.order_pick_up_service_time = 10;
    settings.order_drop_off_service_time = 10;
    settings.user_cancellation_min_wait_secs = 3000;
    settings.user_cancellation_max_wait_secs = 3000;
    settings
}

pub fn order_row(
    order_id: u64,
    placement_time: u64,
    pick_up: (f64, f64),
    drop_off: (f64, f64),
) -> OrderRow {
    OrderRow {
        order_id,
        pick_up_lat: pick_up.0,
        pick_up_lng: pick_up.1,
        drop_off_lat: drop_off.0,
        drop_off_lng: drop_off.1,
        pick_up_lat2: pick_up.0,
        pick_up_lng2: pick_up.1,
        placement_time,
        expected_drop_off_time: placement_time + 600,
        preparation_time: 0,
        ready_time: placement_time,
    }
}

/// Build a scenario world seeded with order rows and schedule the start
/// event. Couriers are spawned by hand with [`spawn_courier`].
pub fn build_world(settings: SimulationSettings, orders: Vec<OrderRow>) -> (World, Schedule) {
    let mut world = World::new();
    build_scenario(
        &mut world,
        settings,
        Box::new(InMemoryDataSource::from_rows(orders, Vec::new())),
    );
    initialize_simulation(&mut world);
    (world, simulation_schedule())
}

/// Spawn a courier the way the world tick does: registry entry, a single
/// urgent log-off at the shift end, and the first idle wake.
pub fn spawn_courier(
    world: &mut World,
    courier_id: u64,
    location: Location,
    vehicle: Vehicle,
    on_time: u64,
    off_time: u64,
    acceptance_rate: f64,
) -> Entity {
    let courier = Courier::new(courier_id, vehicle, on_time, off_time, acceptance_rate);
    let shift = courier.shift_secs();
    let token = courier.state_token;
    let entity = world.spawn((courier, Position(location))).id();
    world
        .resource_mut::<Dispatcher>()
        .courier_logged_on_event(courier_id, entity);

    let wait_to_move = world.resource::<SimulationSettings>().courier_wait_to_move;
    let mut clock = world.resource_mut::<SimulationClock>();
    clock.schedule_in(
        shift,
        Priority::Urgent,
        Event::new(EventKind::CourierLogOff, Some(EventSubject::Courier(entity))),
    );
    clock.schedule_in(
        wait_to_move,
        Priority::Normal,
        Event::with_token(EventKind::CourierWake, Some(EventSubject::Courier(entity)), token),
    );
    entity
}

/// Run until the queue drains or the configured end time stops the runner.
pub fn run_to_end(world: &mut World, schedule: &mut Schedule) {
    let mut guard = 0usize;
    while run_next_event(world, schedule) {
        guard += 1;
        assert!(guard < 1_000_000, "runaway event loop in test");
    }
}

/// Run events up to and including simulated second `until`.
pub fn run_until_time(world: &mut World, schedule: &mut Schedule, until: u64) {
    loop {
        let next = world.resource::<SimulationClock>().next_event_time();
        match next {
            Some(at) if at <= until => {
                if !run_next_event(world, schedule) {
                    break;
                }
            }
            _ => break,
        }
    }
}
