//! Shared courier state-machine steps: entering idle, starting a move,
//! walking the active route, and logging off.
//!
//! Several systems drive the same lifecycle (acceptance, movement arrival,
//! service completion, cancellation, log-off), so the transitions live here
//! as free functions over explicitly passed state.

use bevy_ecs::prelude::{Commands, Entity, Query};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::clock::{Event, EventKind, EventSubject, Priority, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{
    Courier, CourierCondition, Order, OrderState, OrderTiming, PendingNotification, Position,
};
use crate::policies::movement::CourierMovementPolicy;
use crate::route::{MovePurpose, MovementPlan, Stop, StopKind};
use crate::routing::RoutingClient;
use crate::scenario::params::SimulationSettings;
use crate::spatial::Location;
use crate::telemetry::SimTelemetry;

/// Seeded RNG for one stochastic decision, in the style of a per-decision
/// draw: the scenario seed, a per-concern salt, the acting entity's id, and
/// the current second all feed the stream, so reruns are bit-identical.
pub fn stochastic_rng(seed: u64, salt: u64, actor_id: u64, now: u64) -> StdRng {
    let mixed = seed
        .wrapping_add(salt)
        .wrapping_add(actor_id.wrapping_mul(0x9e37_79b9_7f4a_7c15))
        .wrapping_add(now.wrapping_mul(0xbf58_476d_1ce4_e5b9));
    StdRng::seed_from_u64(mixed)
}

pub const SALT_ACCEPTANCE: u64 = 0x0a11_07e5;
pub const SALT_ACCEPTANCE_RATE: u64 = 0x00c0_4a7e;
pub const SALT_SUBSTITUTION: u64 = 0x05b5_7170;
pub const SALT_USER_CANCEL: u64 = 0x00ca_9ce1;
pub const SALT_MOVEMENT_EVAL: u64 = 0x0040_e0a1;

/// Re-enter the idle state: the dispatcher is told once and the periodic
/// wait-to-move wake is scheduled under the current state token.
pub fn enter_idle(
    clock: &mut SimulationClock,
    dispatcher: &mut Dispatcher,
    settings: &SimulationSettings,
    entity: Entity,
    courier: &mut Courier,
) {
    courier.condition = CourierCondition::Idle;
    courier.active_stop = None;
    debug!(courier_id = courier.courier_id, "courier begins idling");
    dispatcher.courier_idle_event(courier.courier_id);
    clock.schedule_in(
        settings.courier_wait_to_move,
        Priority::Normal,
        Event::with_token(
            EventKind::CourierWake,
            Some(EventSubject::Courier(entity)),
            courier.state_token,
        ),
    );
}

/// Start moving toward a destination. The movement policy resolves the
/// polyline once; the first leg is scheduled and the rest follow step by
/// step in the movement system.
#[allow(clippy::too_many_arguments)]
pub fn enter_moving(
    commands: &mut Commands,
    clock: &mut SimulationClock,
    dispatcher: &mut Dispatcher,
    movement: &dyn CourierMovementPolicy,
    routing: &dyn RoutingClient,
    entity: Entity,
    courier: &mut Courier,
    position: &Position,
    destination: Location,
    purpose: MovePurpose,
) {
    let now = clock.now();
    courier.condition = CourierCondition::Moving;
    courier.begin_busy(now);
    dispatcher.courier_moving_event(courier.courier_id);

    let mut points = movement.plan(routing, position.0, destination);
    if points.is_empty() {
        points = vec![position.0, destination];
    }
    if points.last() != Some(&destination) {
        points.push(destination);
    }

    let first_leg = if points.len() >= 2 {
        movement.leg_duration_secs(points[0], points[1], &courier.vehicle, clock.hour_of_day())
    } else {
        0
    };
    commands
        .entity(entity)
        .insert(MovementPlan::new(points, purpose));
    clock.schedule_in(
        first_leg,
        Priority::Normal,
        Event::with_token(
            EventKind::CourierMoveStep,
            Some(EventSubject::Courier(entity)),
            courier.state_token,
        ),
    );
}

/// Progress the active route: move to the next unvisited stop, service it,
/// skip preposition stops after arrival, and wind down when nothing remains.
#[allow(clippy::too_many_arguments)]
pub fn advance_route(
    commands: &mut Commands,
    clock: &mut SimulationClock,
    dispatcher: &mut Dispatcher,
    settings: &SimulationSettings,
    movement: &dyn CourierMovementPolicy,
    routing: &dyn RoutingClient,
    entity: Entity,
    courier: &mut Courier,
    position: &Position,
    orders: &mut Query<(&mut Order, &mut OrderTiming)>,
) {
    loop {
        let next_stop = courier.active_route.as_ref().and_then(|route| {
            route
                .first_unvisited()
                .map(|ix| (ix, route.stops[ix].clone()))
        });

        let Some((ix, stop)) = next_stop else {
            finish_route(commands, clock, dispatcher, settings, entity, courier);
            return;
        };

        courier.active_stop = Some(stop.position);

        if position.0 != stop.location {
            enter_moving(
                commands,
                clock,
                dispatcher,
                movement,
                routing,
                entity,
                courier,
                position,
                stop.location,
                MovePurpose::RouteStop,
            );
            return;
        }

        if stop.kind == StopKind::Preposition {
            if let Some(route) = courier.active_route.as_mut() {
                route.stops[ix].visited = true;
            }
            continue;
        }

        begin_stop_service(clock, dispatcher, entity, courier, &stop, orders);
        return;
    }
}

/// Enter the pick-up or drop-off state at the current stop and schedule its
/// completion. Re-entry after an interruption recomputes the full wait; the
/// in-store report is idempotent.
fn begin_stop_service(
    clock: &mut SimulationClock,
    dispatcher: &mut Dispatcher,
    entity: Entity,
    courier: &mut Courier,
    stop: &Stop,
    orders: &mut Query<(&mut Order, &mut OrderTiming)>,
) {
    let now = clock.now();
    courier.begin_busy(now);

    let wait = match stop.kind {
        StopKind::PickUp => {
            courier.condition = CourierCondition::PickingUp;
            debug!(
                courier_id = courier.courier_id,
                orders = ?stop.orders,
                "courier begins pick up state"
            );
            dispatcher.courier_picking_up_event(courier.courier_id);
            dispatcher.orders_in_store_event(&stop.orders);

            let mut service_time = 0;
            let mut latest_ready = 0;
            for order_id in &stop.orders {
                let Some(order_entity) = dispatcher.order_entity(*order_id) else {
                    continue;
                };
                let Ok((mut order, mut timing)) = orders.get_mut(order_entity) else {
                    continue;
                };
                order.state = OrderState::PickingUp;
                if timing.in_store_time.is_none() {
                    timing.in_store_time = Some(now);
                }
                service_time = service_time.max(order.pick_up_service_time);
                latest_ready = latest_ready.max(order.ready_time);
            }
            service_time + latest_ready.saturating_sub(now)
        }
        StopKind::DropOff => {
            courier.condition = CourierCondition::DroppingOff;
            debug!(
                courier_id = courier.courier_id,
                orders = ?stop.orders,
                "courier begins drop off state"
            );
            dispatcher.courier_dropping_off_event(courier.courier_id);
            stop.orders
                .iter()
                .filter_map(|order_id| dispatcher.order_entity(*order_id))
                .filter_map(|order_entity| orders.get(order_entity).ok())
                .map(|(order, _)| order.drop_off_service_time)
                .max()
                .unwrap_or(0)
        }
        StopKind::Preposition => return,
    };

    clock.schedule_in(
        wait,
        Priority::Normal,
        Event::with_token(
            EventKind::ServiceFinished,
            Some(EventSubject::Courier(entity)),
            courier.state_token,
        ),
    );
}

/// Route exhausted: clear it and either log off (if deferred) or go idle.
fn finish_route(
    commands: &mut Commands,
    clock: &mut SimulationClock,
    dispatcher: &mut Dispatcher,
    settings: &SimulationSettings,
    entity: Entity,
    courier: &mut Courier,
) {
    courier.active_route = None;
    courier.active_stop = None;
    commands.entity(entity).remove::<MovementPlan>();
    debug!(courier_id = courier.courier_id, "courier finishes route execution");

    if courier.log_off_scheduled {
        log_off_now(clock.now(), dispatcher, settings, courier);
    } else {
        enter_idle(clock, dispatcher, settings, entity, courier);
    }
}

/// Log the courier off: earnings are computed exactly once, the state token
/// is bumped so pending wakes die, and the dispatcher is told.
pub fn log_off_now(
    now: u64,
    dispatcher: &mut Dispatcher,
    settings: &SimulationSettings,
    courier: &mut Courier,
) {
    courier.interrupt(now);
    courier.condition = CourierCondition::LoggedOff;
    courier.active_route = None;
    courier.active_stop = None;
    let earnings = courier.calculate_earnings(
        settings.courier_earnings_per_order,
        settings.courier_earnings_per_hour,
    );
    debug!(
        courier_id = courier.courier_id,
        earnings,
        fulfilled = courier.fulfilled_orders.len(),
        "courier logged off"
    );
    dispatcher.courier_log_off_event(courier.courier_id);
}

/// Release an offer that can no longer be answered (the courier logged off
/// or was interrupted out of its route): the courier leaves the notified
/// set and the orders return to the buffer.
pub fn release_pending_offer(
    dispatcher: &mut Dispatcher,
    telemetry: &mut SimTelemetry,
    courier_id: u64,
    pending: &PendingNotification,
) {
    dispatcher.notification_rejected_event(courier_id, &pending.notification.order_ids());
    telemetry.notifications_rejected += 1;
}
