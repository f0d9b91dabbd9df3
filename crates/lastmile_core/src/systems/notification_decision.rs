//! Resolution of a delivered offer: accept into the active route, or reject
//! and return to the interrupted state.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{
    Courier, CourierCondition, Order, OrderState, OrderTiming, PendingNotification, Position,
};
use crate::policies::movement::MovementPolicyResource;
use crate::route::{Instruction, Route};
use crate::routing::RoutingClientResource;
use crate::scenario::params::SimulationSettings;
use crate::systems::route_progress::{advance_route, enter_idle};
use crate::telemetry::SimTelemetry;

#[allow(clippy::too_many_arguments)]
pub fn notification_decision_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    mut dispatcher: ResMut<Dispatcher>,
    mut telemetry: ResMut<SimTelemetry>,
    settings: Res<SimulationSettings>,
    movement: Res<MovementPolicyResource>,
    routing: Res<RoutingClientResource>,
    mut couriers: Query<(&mut Courier, &Position, Option<&PendingNotification>)>,
    mut orders: Query<(&mut Order, &mut OrderTiming)>,
) {
    if event.0.kind != EventKind::NotificationDecision {
        return;
    }
    let Some(EventSubject::Courier(courier_entity)) = event.0.subject else {
        return;
    };
    let Ok((mut courier, position, pending)) = couriers.get_mut(courier_entity) else {
        return;
    };
    if event.0.token != courier.state_token {
        return;
    }
    let Some(pending) = pending.cloned() else {
        return;
    };
    commands
        .entity(courier_entity)
        .remove::<PendingNotification>();

    let now = clock.now();
    let courier_id = courier.courier_id;
    let offered_ids = pending.notification.order_ids();

    if !pending.accepted {
        debug!(courier_id, "courier rejected a notification");
        dispatcher.notification_rejected_event(courier_id, &offered_ids);
        telemetry.notifications_rejected += 1;
        courier.rejected_orders.extend(offered_ids);

        match courier.condition {
            CourierCondition::PickingUp => advance_route(
                &mut commands,
                &mut clock,
                &mut dispatcher,
                &settings,
                movement.0.as_ref(),
                routing.0.as_ref(),
                courier_entity,
                &mut courier,
                position,
                &mut orders,
            ),
            _ => enter_idle(
                &mut clock,
                &mut dispatcher,
                &settings,
                courier_entity,
                &mut courier,
            ),
        }
        return;
    }

    debug!(courier_id, "courier accepted a notification");
    telemetry.notifications_accepted += 1;
    courier.accepted_notifications += 1;

    let instruction_route = match pending.notification.instruction {
        Instruction::Route(mut route) => {
            // Orders cancelled while the offer was pending drop out here.
            for order_id in offered_ids.clone() {
                let still_live = dispatcher
                    .order_entity(order_id)
                    .and_then(|order_entity| orders.get(order_entity).ok())
                    .map(|(order, _)| order.state != OrderState::Canceled)
                    .unwrap_or(false);
                if !still_live {
                    route.remove_order(order_id);
                }
            }
            let accepted_ids = route.orders.clone();
            dispatcher.notification_accepted_event(courier_id, &accepted_ids);
            for order_id in &accepted_ids {
                let Some(order_entity) = dispatcher.order_entity(*order_id) else {
                    continue;
                };
                let Ok((mut order, mut timing)) = orders.get_mut(order_entity) else {
                    continue;
                };
                order.state = OrderState::Scheduled;
                order.courier_id = Some(courier_id);
                if timing.acceptance_time.is_none() {
                    timing.acceptance_time = Some(now);
                }
            }
            route
        }
        Instruction::Reposition(destination) => {
            dispatcher.notification_accepted_event(courier_id, &[]);
            Route::preposition(destination)
        }
    };

    if instruction_route.first_unvisited().is_some() {
        match courier.active_route.as_mut() {
            Some(active) => active.append(instruction_route),
            None => courier.active_route = Some(instruction_route),
        }
    } else if courier.active_route.is_none() {
        // Everything in the offer was cancelled while it waited.
        enter_idle(
            &mut clock,
            &mut dispatcher,
            &settings,
            courier_entity,
            &mut courier,
        );
        return;
    }

    advance_route(
        &mut commands,
        &mut clock,
        &mut dispatcher,
        &settings,
        movement.0.as_ref(),
        routing.0.as_ref(),
        courier_entity,
        &mut courier,
        position,
        &mut orders,
    );
}
