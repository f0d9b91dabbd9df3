//! The dispatcher's buffering/matching tick: gather buffered orders, run the
//! matching policy, and deliver the resulting notifications.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Courier, Order, Position};
use crate::policies::acceptance::AcceptancePolicyResource;
use crate::policies::buffering::BufferingPolicyResource;
use crate::policies::matching::{MatchingCourier, MatchingOrder, MatchingPolicyResource};
use crate::routing::RoutingClientResource;
use crate::scenario::params::SimulationSettings;
use crate::systems::notify::deliver_notification;
use crate::telemetry::SimTelemetry;

#[allow(clippy::too_many_arguments)]
pub fn buffer_matching_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    mut dispatcher: ResMut<Dispatcher>,
    mut telemetry: ResMut<SimTelemetry>,
    settings: Res<SimulationSettings>,
    buffering: Res<BufferingPolicyResource>,
    matching: Res<MatchingPolicyResource>,
    acceptance: Res<AcceptancePolicyResource>,
    routing: Res<RoutingClientResource>,
    mut couriers: Query<(&mut Courier, &Position)>,
    orders: Query<&Order>,
) {
    if event.0.kind != EventKind::BufferMatchRun {
        return;
    }

    dispatcher.check_registry_invariants();

    let buffered: Vec<MatchingOrder> = dispatcher
        .unassigned_orders
        .iter()
        .filter(|(order_id, _)| !dispatcher.offered_orders.contains(order_id))
        .filter_map(|(_, order_entity)| {
            orders
                .get(*order_entity)
                .ok()
                .map(|order| (*order_entity, order))
        })
        .map(|(order_entity, order)| MatchingOrder {
            entity: order_entity,
            order_id: order.order_id,
            pick_up_at: order.pick_up_at,
            drop_off_at: order.drop_off_at,
            pick_up_service_time: order.pick_up_service_time,
            drop_off_service_time: order.drop_off_service_time,
        })
        .collect();

    let registered: Vec<MatchingCourier> = dispatcher
        .all_couriers()
        .iter()
        .filter_map(|(courier_id, courier_entity)| {
            couriers
                .get(*courier_entity)
                .ok()
                .map(|(courier, position)| MatchingCourier {
                    entity: *courier_entity,
                    courier_id: *courier_id,
                    location: position.0,
                    vehicle: courier.vehicle,
                    condition: courier.condition,
                    has_active_route: courier.active_route.is_some(),
                    notified: dispatcher.notified_couriers.contains(courier_id),
                })
        })
        .collect();

    let (notifications, metric) = matching.0.execute(&buffered, &registered, routing.0.as_ref());
    if metric.matches > 0 {
        debug!(
            orders = metric.orders,
            matches = metric.matches,
            "matching tick produced notifications"
        );
    }
    telemetry.matching_metrics.push(metric);

    for notification in notifications {
        deliver_notification(
            &mut commands,
            &mut clock,
            &mut dispatcher,
            &mut telemetry,
            acceptance.0.as_ref(),
            &settings,
            &mut couriers,
            notification,
        );
    }

    let interval = buffering.0.interval_secs();
    clock.schedule_event_in(interval, EventKind::BufferMatchRun, None);
}
