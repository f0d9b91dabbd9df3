//! The user's cancellation watcher firing: cancel the order if it is still
//! waiting, and unwind the assigned courier's route if one accepted it.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Courier, Order, OrderState, OrderTiming, PendingNotification};
use crate::policies::cancellation::DispatcherCancellationPolicyResource;
use crate::route::MovementPlan;
use crate::scenario::params::SimulationSettings;
use crate::systems::route_progress::{enter_idle, log_off_now, release_pending_offer};
use crate::telemetry::SimTelemetry;

#[allow(clippy::too_many_arguments)]
pub fn user_cancel_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    mut dispatcher: ResMut<Dispatcher>,
    mut telemetry: ResMut<SimTelemetry>,
    settings: Res<SimulationSettings>,
    cancellation: Res<DispatcherCancellationPolicyResource>,
    mut orders: Query<(&mut Order, &mut OrderTiming)>,
    mut couriers: Query<(&mut Courier, Option<&PendingNotification>)>,
) {
    if event.0.kind != EventKind::UserCancel {
        return;
    }
    let Some(EventSubject::Order(order_entity)) = event.0.subject else {
        return;
    };
    let Ok((mut order, mut timing)) = orders.get_mut(order_entity) else {
        return;
    };

    // The watcher only acts while the order is still waiting to be taken.
    if matches!(
        order.state,
        OrderState::PickedUp | OrderState::DroppedOff | OrderState::Canceled
    ) {
        return;
    }
    let in_store = timing.in_store_time.is_some();
    if !cancellation.0.should_cancel(order.state, in_store) {
        debug!(order_id = order.order_id, "cancellation refused by policy");
        return;
    }

    let now = clock.now();
    order.state = OrderState::Canceled;
    timing.cancellation_time = Some(now);
    dispatcher.cancel_order_event(order.order_id);
    telemetry.orders_canceled += 1;
    debug!(order_id = order.order_id, "order canceled by user");

    // A scheduled order was already accepted: edit the courier's route in
    // place; an emptied route interrupts the courier back to idle.
    let Some(courier_id) = order.courier_id else {
        return;
    };
    let order_id = order.order_id;
    let Some(courier_entity) = dispatcher.courier_entity(courier_id) else {
        return;
    };
    let Ok((mut courier, pending)) = couriers.get_mut(courier_entity) else {
        return;
    };
    let Some(route) = courier.active_route.as_mut() else {
        return;
    };

    route.remove_order(order_id);
    if route.first_unvisited().is_some() {
        return;
    }

    courier.interrupt(now);
    courier.active_route = None;
    courier.active_stop = None;
    commands.entity(courier_entity).remove::<MovementPlan>();
    if let Some(pending) = pending {
        release_pending_offer(&mut dispatcher, &mut telemetry, courier_id, pending);
        commands
            .entity(courier_entity)
            .remove::<PendingNotification>();
    }

    if courier.log_off_scheduled {
        log_off_now(now, &mut dispatcher, &settings, &mut courier);
    } else {
        enter_idle(
            &mut clock,
            &mut dispatcher,
            &settings,
            courier_entity,
            &mut courier,
        );
    }
}
