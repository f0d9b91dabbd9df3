//! Demand-management admission: substitution to the alternate pick-up, and
//! lost orders that never enter the dispatcher.

mod support;

use lastmile_core::datasource::OrderRow;
use lastmile_core::dispatcher::Dispatcher;
use lastmile_core::ecs::Order;
use lastmile_core::scenario::DemandManagementPolicyKind;
use lastmile_core::spatial::Location;
use lastmile_core::telemetry::SimTelemetry;

use support::world::{build_world, run_to_end, spawn_courier, test_settings, unit_vehicle};

// An order whose pick-up/drop-off span exceeds the congestion radius. The
// alternate pick-up sits where the courier waits.
fn constrained_order_row() -> OrderRow {
    OrderRow {
        order_id: 1,
        pick_up_lat: 0.0,
        pick_up_lng: 3.0,
        drop_off_lat: 0.0,
        drop_off_lng: 6.0,
        pick_up_lat2: 0.0,
        pick_up_lng2: 1.0,
        placement_time: 0,
        expected_drop_off_time: 600,
        preparation_time: 0,
        ready_time: 0,
    }
}

fn constrained_settings(substitution_prob: f64) -> lastmile_core::scenario::SimulationSettings {
    let mut settings = test_settings()
        .with_demand_management_policy(DemandManagementPolicyKind::Radius)
        .with_substitution_prob(substitution_prob);
    // Radius limiting kicks in immediately: every admission sees the
    // congestion radius, which the 3-degree span always exceeds.
    settings.density_threshold = 0;
    settings.limit_radius_km = 2.5;
    settings
}

#[test]
fn rejected_order_is_substituted_at_the_alternate_pick_up() {
    let (mut world, mut schedule) = build_world(constrained_settings(1.0), vec![constrained_order_row()]);
    spawn_courier(
        &mut world,
        10,
        Location::new(0.0, 0.0),
        unit_vehicle(),
        0,
        150,
        1.0,
    );

    run_to_end(&mut world, &mut schedule);

    let dispatcher = world.resource::<Dispatcher>();
    assert!(dispatcher.fulfilled_orders.contains_key(&1));
    let order_entity = dispatcher.order_entity(1).expect("order entity");
    let order = world.get::<Order>(order_entity).expect("order");
    assert_eq!(order.pick_up_at, Location::new(0.0, 1.0));

    let telemetry = world.resource::<SimTelemetry>();
    assert_eq!(telemetry.orders_placed, 1);
    assert!(telemetry.lost_orders.is_empty());
}

#[test]
fn rejected_order_without_substitution_is_lost() {
    let (mut world, mut schedule) = build_world(constrained_settings(0.0), vec![constrained_order_row()]);
    spawn_courier(
        &mut world,
        10,
        Location::new(0.0, 0.0),
        unit_vehicle(),
        0,
        150,
        1.0,
    );

    run_to_end(&mut world, &mut schedule);

    let dispatcher = world.resource::<Dispatcher>();
    assert!(dispatcher.order_entity(1).is_none());
    assert!(dispatcher.unassigned_orders.is_empty());
    assert!(dispatcher.fulfilled_orders.is_empty());
    assert!(dispatcher.canceled_orders.is_empty());

    let telemetry = world.resource::<SimTelemetry>();
    assert_eq!(telemetry.orders_placed, 0);
    assert_eq!(telemetry.lost_orders.len(), 1);
    assert_eq!(telemetry.lost_orders[0].order_id, 1);
}

// Without the radius policy the same order is admitted untouched.
#[test]
fn default_policy_admits_the_original_pick_up() {
    let mut settings = test_settings();
    settings.density_threshold = 0;
    settings.limit_radius_km = 2.5;
    let (mut world, mut schedule) = build_world(settings, vec![constrained_order_row()]);
    spawn_courier(
        &mut world,
        10,
        Location::new(0.0, 0.0),
        unit_vehicle(),
        0,
        150,
        1.0,
    );

    run_to_end(&mut world, &mut schedule);

    let dispatcher = world.resource::<Dispatcher>();
    let order_entity = dispatcher.order_entity(1).expect("order entity");
    let order = world.get::<Order>(order_entity).expect("order");
    assert_eq!(order.pick_up_at, Location::new(0.0, 3.0));
    assert!(dispatcher.fulfilled_orders.contains_key(&1));
}
