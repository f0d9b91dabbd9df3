//! The per-second world driver: activate scheduled orders and courier
//! shifts, apply demand-management admission, and log progress.

use bevy_ecs::prelude::{Commands, Res, ResMut};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::clock::{CurrentEvent, Event, EventKind, EventSubject, Priority, SimulationClock};
use crate::datasource::{DataSourceResource, OrderRow};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Courier, Order, OrderState, OrderTiming, Position, User, Vehicle};
use crate::policies::cancellation::UserCancellationPolicyResource;
use crate::policies::demand::DemandManagementPolicyResource;
use crate::policies::prepositioning::PrepositioningEvaluationResource;
use crate::scenario::params::SimulationSettings;
use crate::spatial::Location;
use crate::systems::route_progress::{
    stochastic_rng, SALT_ACCEPTANCE_RATE, SALT_SUBSTITUTION, SALT_USER_CANCEL,
};
use crate::telemetry::{LostOrderRecord, SimTelemetry};

/// Bootstraps the periodic loops when the simulation starts.
pub fn simulation_started_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    prepositioning_evaluation: Res<PrepositioningEvaluationResource>,
) {
    if event.0.kind != EventKind::SimulationStarted {
        return;
    }
    clock.schedule_event_in(0, EventKind::WorldTick, None);
    clock.schedule_event_in(0, EventKind::BufferMatchRun, None);
    clock.schedule_event_in(
        prepositioning_evaluation.0.interval_secs(),
        EventKind::PrepositionRun,
        None,
    );
}

#[allow(clippy::too_many_arguments)]
pub fn world_tick_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    mut dispatcher: ResMut<Dispatcher>,
    mut telemetry: ResMut<SimTelemetry>,
    settings: Res<SimulationSettings>,
    data_source: Res<DataSourceResource>,
    demand_management: Res<DemandManagementPolicyResource>,
    user_cancellation: Res<UserCancellationPolicyResource>,
) {
    if event.0.kind != EventKind::WorldTick {
        return;
    }
    let now = clock.now();

    if (settings.create_users_from..=settings.create_users_until).contains(&now) {
        let rows = match data_source.0.orders_placed_at(now) {
            Ok(rows) => rows,
            Err(error) => {
                warn!(%error, "order query failed, no new users this tick");
                Vec::new()
            }
        };
        for row in rows {
            spawn_user_order(
                &mut commands,
                &mut clock,
                &mut dispatcher,
                &mut telemetry,
                &settings,
                &demand_management,
                &user_cancellation,
                row,
            );
        }
    }

    if (settings.create_couriers_from..=settings.create_couriers_until).contains(&now) {
        let rows = match data_source.0.couriers_on_at(now) {
            Ok(rows) => rows,
            Err(error) => {
                warn!(%error, "courier query failed, no new couriers this tick");
                Vec::new()
            }
        };
        for row in rows {
            let vehicle = Vehicle::from_label(&row.vehicle).unwrap_or_else(|| {
                warn!(courier_id = row.courier_id, label = %row.vehicle, "unknown vehicle label");
                Vehicle::motorcycle()
            });
            let mut rng = stochastic_rng(settings.seed, SALT_ACCEPTANCE_RATE, row.courier_id, 0);
            let acceptance_rate = rng.gen_range(settings.courier_min_acceptance_rate..=1.0);

            let courier = Courier::new(
                row.courier_id,
                vehicle,
                row.on_time,
                row.off_time,
                acceptance_rate,
            );
            let shift = courier.shift_secs();
            let wake_token = courier.state_token;
            let courier_entity = commands
                .spawn((courier, Position(Location::new(row.on_lat, row.on_lng))))
                .id();
            dispatcher.courier_logged_on_event(row.courier_id, courier_entity);
            debug!(courier_id = row.courier_id, "courier logged on");

            // One log-off event per courier, urgent so the shift boundary
            // beats same-second wakes.
            clock.schedule_in(
                shift,
                Priority::Urgent,
                Event::new(
                    EventKind::CourierLogOff,
                    Some(EventSubject::Courier(courier_entity)),
                ),
            );
            clock.schedule_in(
                settings.courier_wait_to_move,
                Priority::Normal,
                Event::with_token(
                    EventKind::CourierWake,
                    Some(EventSubject::Courier(courier_entity)),
                    wake_token,
                ),
            );
        }
    }

    info!(
        sim_time = now,
        summary = %dispatcher.registry_summary(),
        "world tick"
    );

    clock.schedule_event_in(1, EventKind::WorldTick, None);
}

/// Create the user for one order row and run admission: submit, substitute,
/// or record the order as lost.
#[allow(clippy::too_many_arguments)]
fn spawn_user_order(
    commands: &mut Commands,
    clock: &mut SimulationClock,
    dispatcher: &mut Dispatcher,
    telemetry: &mut SimTelemetry,
    settings: &SimulationSettings,
    demand_management: &DemandManagementPolicyResource,
    user_cancellation: &UserCancellationPolicyResource,
    row: OrderRow,
) {
    let pick_up_at = Location::new(row.pick_up_lat, row.pick_up_lng);
    let drop_off_at = Location::new(row.drop_off_lat, row.drop_off_lng);

    let admitted = demand_management
        .0
        .admit(pick_up_at, drop_off_at, dispatcher.current_radius_km());

    let pick_up_at = if admitted {
        pick_up_at
    } else {
        let mut rng = stochastic_rng(settings.seed, SALT_SUBSTITUTION, row.order_id, 0);
        if rng.gen::<f64>() < dispatcher.substitution_prob {
            debug!(order_id = row.order_id, "order resubmitted at alternate pick up");
            Location::new(row.pick_up_lat2, row.pick_up_lng2)
        } else {
            telemetry.lost_orders.push(LostOrderRecord {
                order_id: row.order_id,
                pick_up_at,
                drop_off_at,
                placement_time: row.placement_time,
            });
            debug!(order_id = row.order_id, "order lost to demand management");
            return;
        }
    };

    let user_entity = commands
        .spawn(User {
            user_id: row.order_id,
        })
        .id();
    let order_entity = commands
        .spawn((
            Order {
                order_id: row.order_id,
                pick_up_at,
                drop_off_at,
                placement_time: row.placement_time,
                preparation_time: row.preparation_time,
                ready_time: row.ready_time,
                expected_drop_off_time: row.expected_drop_off_time,
                pick_up_service_time: settings.order_pick_up_service_time,
                drop_off_service_time: settings.order_drop_off_service_time,
                state: OrderState::Placed,
                courier_id: None,
                user: user_entity,
            },
            OrderTiming::default(),
        ))
        .id();

    dispatcher.order_submitted_event(row.order_id, order_entity);
    telemetry.orders_placed += 1;
    debug!(order_id = row.order_id, "order submitted");

    let mut rng = stochastic_rng(settings.seed, SALT_USER_CANCEL, row.order_id, 0);
    let patience = user_cancellation.0.wait_secs(&mut rng);
    clock.schedule_event_in(
        patience,
        EventKind::UserCancel,
        Some(EventSubject::Order(order_entity)),
    );
}
