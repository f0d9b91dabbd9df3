//! Top-level run driver: end-of-run post-processing and the one-call
//! convenience runner.

use bevy_ecs::prelude::{Entity, Mut, World};
use serde::Serialize;
use tracing::info;

use crate::clock::SimulationClock;
use crate::datasource::InstanceDataSource;
use crate::dispatcher::Dispatcher;
use crate::ecs::{Courier, Order, OrderTiming, PendingNotification};
use crate::metrics::{courier_metrics, order_metrics, CourierMetricsRecord, OrderMetricsRecord};
use crate::runner::{initialize_simulation, run_until_empty, simulation_schedule};
use crate::scenario::build_scenario;
use crate::scenario::params::SimulationSettings;
use crate::systems::route_progress::{log_off_now, release_pending_offer};
use crate::telemetry::{LostOrderRecord, SimTelemetry};

/// Backstop for the runner loop; any realistic day-scale instance finishes
/// well below this.
const MAX_STEPS: usize = 50_000_000;

/// Final outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub final_sim_time: u64,
    pub orders_placed: u64,
    pub orders_fulfilled: u64,
    pub orders_canceled: u64,
    pub notifications_sent: u64,
    pub notifications_accepted: u64,
    pub notifications_rejected: u64,
    pub policy_violations: u64,
    pub courier_metrics: Vec<CourierMetricsRecord>,
    pub order_metrics: Vec<OrderMetricsRecord>,
    pub lost_orders: Vec<LostOrderRecord>,
}

/// Post-process the finished world: force-log-off still-idle couriers, drop
/// warm-up-window orders from the final registries, and compute metrics.
pub fn post_process(world: &mut World) -> SimulationReport {
    let settings = world.resource::<SimulationSettings>().clone();
    let now = world.resource::<SimulationClock>().now();
    info!(sim_time = now, "simulation finished, post processing");

    world.resource_scope(|world, mut dispatcher: Mut<Dispatcher>| {
        // Idle couriers log off where they stand; their shift ends now.
        let idle: Vec<Entity> = dispatcher.idle_couriers.values().copied().collect();
        for courier_entity in idle {
            if let Some(pending) = world
                .get::<PendingNotification>(courier_entity)
                .cloned()
            {
                let courier_id = world
                    .get::<Courier>(courier_entity)
                    .map(|courier| courier.courier_id);
                if let Some(courier_id) = courier_id {
                    world.resource_scope(|_, mut telemetry: Mut<SimTelemetry>| {
                        release_pending_offer(
                            &mut dispatcher,
                            &mut telemetry,
                            courier_id,
                            &pending,
                        );
                    });
                }
                world.entity_mut(courier_entity).remove::<PendingNotification>();
            }
            let Some(mut courier) = world.get_mut::<Courier>(courier_entity) else {
                continue;
            };
            courier.off_time = now;
            log_off_now(now, &mut dispatcher, &settings, &mut courier);
        }

        // Orders that finished inside the warm-up window stay in the trace
        // but leave the metric-facing registries.
        let warm_up_end = settings.warm_up_end();
        let canceled: Vec<(u64, Entity)> = dispatcher
            .canceled_orders
            .iter()
            .map(|(id, entity)| (*id, *entity))
            .collect();
        for (order_id, order_entity) in canceled {
            let finished_early = world
                .get::<OrderTiming>(order_entity)
                .and_then(|timing| timing.cancellation_time)
                .map(|t| t < warm_up_end)
                .unwrap_or(false);
            if finished_early {
                dispatcher.discard_from_metrics(order_id);
            }
        }
        let fulfilled: Vec<(u64, Entity)> = dispatcher
            .fulfilled_orders
            .iter()
            .map(|(id, entity)| (*id, *entity))
            .collect();
        for (order_id, order_entity) in fulfilled {
            let finished_early = world
                .get::<OrderTiming>(order_entity)
                .and_then(|timing| timing.drop_off_time)
                .map(|t| t < warm_up_end)
                .unwrap_or(false);
            if finished_early {
                dispatcher.discard_from_metrics(order_id);
            }
        }
    });

    let dispatcher = world.resource::<Dispatcher>();
    let telemetry = world.resource::<SimTelemetry>();

    let courier_records: Vec<CourierMetricsRecord> = dispatcher
        .all_couriers()
        .values()
        .filter_map(|courier_entity| world.get::<Courier>(*courier_entity))
        .map(|courier| courier_metrics(courier, settings.courier_earnings_per_order))
        .collect();

    let order_records: Vec<OrderMetricsRecord> = dispatcher
        .fulfilled_orders
        .values()
        .chain(dispatcher.canceled_orders.values())
        .filter_map(|order_entity| {
            let order = world.get::<Order>(*order_entity)?;
            let timing = world.get::<OrderTiming>(*order_entity)?;
            Some(order_metrics(order, timing))
        })
        .collect();

    SimulationReport {
        final_sim_time: now,
        orders_placed: telemetry.orders_placed,
        orders_fulfilled: telemetry.orders_fulfilled,
        orders_canceled: telemetry.orders_canceled,
        notifications_sent: telemetry.notifications_sent,
        notifications_accepted: telemetry.notifications_accepted,
        notifications_rejected: telemetry.notifications_rejected,
        policy_violations: telemetry.policy_violations,
        courier_metrics: courier_records,
        order_metrics: order_records,
        lost_orders: telemetry.lost_orders.clone(),
    }
}

/// Build, run to the end time, and post-process in one call.
pub fn run_simulation(
    settings: SimulationSettings,
    data_source: Box<dyn InstanceDataSource>,
) -> SimulationReport {
    let mut world = World::new();
    build_scenario(&mut world, settings, data_source);
    initialize_simulation(&mut world);
    let mut schedule = simulation_schedule();
    run_until_empty(&mut world, &mut schedule, MAX_STEPS);
    post_process(&mut world)
}
