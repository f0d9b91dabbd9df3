//! Service completion: a pick-up or drop-off wait at the active stop ended.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Courier, Order, OrderState, OrderTiming, Position};
use crate::policies::movement::MovementPolicyResource;
use crate::route::StopKind;
use crate::routing::RoutingClientResource;
use crate::scenario::params::SimulationSettings;
use crate::systems::route_progress::advance_route;
use crate::telemetry::SimTelemetry;

#[allow(clippy::too_many_arguments)]
pub fn service_finished_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    mut dispatcher: ResMut<Dispatcher>,
    mut telemetry: ResMut<SimTelemetry>,
    settings: Res<SimulationSettings>,
    movement: Res<MovementPolicyResource>,
    routing: Res<RoutingClientResource>,
    mut couriers: Query<(&mut Courier, &Position)>,
    mut orders: Query<(&mut Order, &mut OrderTiming)>,
) {
    if event.0.kind != EventKind::ServiceFinished {
        return;
    }
    let Some(EventSubject::Courier(courier_entity)) = event.0.subject else {
        return;
    };
    let Ok((mut courier, position)) = couriers.get_mut(courier_entity) else {
        return;
    };
    if event.0.token != courier.state_token {
        return;
    }

    let Some(active_position) = courier.active_stop else {
        return;
    };
    let stop = courier.active_route.as_ref().and_then(|route| {
        route
            .stop_index_by_position(active_position)
            .map(|ix| (ix, route.stops[ix].clone()))
    });
    let Some((stop_ix, stop)) = stop else {
        return;
    };

    let now = clock.now();
    courier.accrue_utilization(now);

    match stop.kind {
        StopKind::PickUp => {
            for order_id in &stop.orders {
                let Some(order_entity) = dispatcher.order_entity(*order_id) else {
                    continue;
                };
                let Ok((mut order, mut timing)) = orders.get_mut(order_entity) else {
                    continue;
                };
                order.state = OrderState::PickedUp;
                if timing.pick_up_time.is_none() {
                    timing.pick_up_time = Some(now);
                }
            }
            dispatcher.orders_picked_up_event(&stop.orders);
        }
        StopKind::DropOff => {
            for order_id in &stop.orders {
                let Some(order_entity) = dispatcher.order_entity(*order_id) else {
                    continue;
                };
                let Ok((mut order, mut timing)) = orders.get_mut(order_entity) else {
                    continue;
                };
                order.state = OrderState::DroppedOff;
                if timing.drop_off_time.is_none() {
                    timing.drop_off_time = Some(now);
                }
                courier.fulfilled_orders.push(*order_id);
                telemetry.orders_fulfilled += 1;
            }
            dispatcher.orders_dropped_off_event(&stop.orders);
        }
        StopKind::Preposition => {}
    }

    if let Some(route) = courier.active_route.as_mut() {
        route.stops[stop_ix].visited = true;
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
