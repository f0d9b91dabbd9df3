//! The prepositioning loop: relocate idle couriers toward unmatched demand.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Courier, Order, Position};
use crate::policies::acceptance::AcceptancePolicyResource;
use crate::policies::matching::MatchingCourier;
use crate::policies::prepositioning::{
    PrepositioningEvaluationResource, PrepositioningPolicyResource,
};
use crate::scenario::params::SimulationSettings;
use crate::spatial::Location;
use crate::systems::notify::deliver_notification;
use crate::telemetry::SimTelemetry;

#[allow(clippy::too_many_arguments)]
pub fn preposition_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    mut dispatcher: ResMut<Dispatcher>,
    mut telemetry: ResMut<SimTelemetry>,
    settings: Res<SimulationSettings>,
    prepositioning: Res<PrepositioningPolicyResource>,
    evaluation: Res<PrepositioningEvaluationResource>,
    acceptance: Res<AcceptancePolicyResource>,
    mut couriers: Query<(&mut Courier, &Position)>,
    orders: Query<&Order>,
) {
    if event.0.kind != EventKind::PrepositionRun {
        return;
    }

    let idle: Vec<MatchingCourier> = dispatcher
        .idle_couriers
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

    let demand: Vec<Location> = dispatcher
        .unassigned_orders
        .values()
        .filter_map(|order_entity| orders.get(*order_entity).ok())
        .map(|order| order.pick_up_at)
        .collect();

    let notifications = prepositioning.0.execute(&idle, &demand);
    if !notifications.is_empty() {
        debug!(count = notifications.len(), "prepositioning notifications");
    }
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

    let interval = evaluation.0.interval_secs();
    clock.schedule_event_in(interval, EventKind::PrepositionRun, None);
}
