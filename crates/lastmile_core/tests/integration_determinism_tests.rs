//! Same seed and inputs must reproduce the run bit for bit.

mod support;

use lastmile_core::datasource::{CourierRow, InMemoryDataSource, OrderRow};
use lastmile_core::scenario::{
    AcceptancePolicyKind, MovementEvaluationPolicyKind, SimulationSettings,
};
use lastmile_core::world::run_simulation;

use support::world::order_row;

fn scenario_settings() -> SimulationSettings {
    let mut settings = SimulationSettings::default()
        .with_simulate_from(0)
        .with_simulate_until(1500)
        .with_warm_up_time(0)
        .with_seed(1234)
        .with_acceptance_policy(AcceptancePolicyKind::Uniform)
        .with_movement_evaluation_policy(MovementEvaluationPolicyKind::Neighbors)
        .with_buffering_interval(5);
    settings.courier_wait_to_move = 30;
    settings.dispatcher_prospects_max_distance_km = 10.0;
    settings.order_pick_up_service_time = 30;
    settings.order_drop_off_service_time = 30;
    settings.user_cancellation_min_wait_secs = 120;
    settings.user_cancellation_max_wait_secs = 300;
    settings
}

fn scenario_orders() -> Vec<OrderRow> {
    (0..10)
        .map(|i| {
            order_row(
                i + 1,
                i * 5,
                (52.50 + 0.002 * i as f64, 13.40),
                (52.50 + 0.002 * i as f64, 13.43),
            )
        })
        .collect()
}

fn scenario_couriers() -> Vec<CourierRow> {
    (0..3)
        .map(|i| CourierRow {
            courier_id: 100 + i,
            vehicle: "motorcycle".to_string(),
            on_lat: 52.50 + 0.003 * i as f64,
            on_lng: 13.41,
            on_time: 0,
            off_time: 1200,
        })
        .collect()
}

#[test]
fn same_seed_and_inputs_give_identical_reports() {
    let first = run_simulation(
        scenario_settings(),
        Box::new(InMemoryDataSource::from_rows(
            scenario_orders(),
            scenario_couriers(),
        )),
    );
    let second = run_simulation(
        scenario_settings(),
        Box::new(InMemoryDataSource::from_rows(
            scenario_orders(),
            scenario_couriers(),
        )),
    );

    assert_eq!(first, second);
    assert_eq!(first.orders_placed, 10);
}
