//! Offer delivery: validation, interruption, and the acceptance-decision wait.

use bevy_ecs::prelude::{Commands, Query};
use tracing::{debug, warn};

use crate::clock::{Event, EventKind, EventSubject, Priority, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Courier, CourierCondition, PendingNotification, Position};
use crate::policies::acceptance::CourierAcceptancePolicy;
use crate::route::Notification;
use crate::scenario::params::SimulationSettings;
use crate::systems::route_progress::{stochastic_rng, SALT_ACCEPTANCE};
use crate::telemetry::SimTelemetry;

/// Deliver one notification to its courier.
///
/// A courier that is neither idle nor picking up, is already notified, or is
/// unknown marks a policy precondition violation: the offer is dropped and
/// logged, and the simulation continues.
///
/// Delivery interrupts the courier's running state so the acceptance
/// decision's own delay is not queued behind a long service wait; the
/// decision fires as a `NotificationDecision` event under the new token.
#[allow(clippy::too_many_arguments)]
pub fn deliver_notification(
    commands: &mut Commands,
    clock: &mut SimulationClock,
    dispatcher: &mut Dispatcher,
    telemetry: &mut SimTelemetry,
    acceptance: &dyn CourierAcceptancePolicy,
    settings: &SimulationSettings,
    couriers: &mut Query<(&mut Courier, &Position)>,
    notification: Notification,
) {
    let courier_entity = notification.courier;
    let Ok((mut courier, _position)) = couriers.get_mut(courier_entity) else {
        warn!("notification dropped: unknown courier entity");
        telemetry.policy_violations += 1;
        return;
    };

    let eligible = matches!(
        courier.condition,
        CourierCondition::Idle | CourierCondition::PickingUp
    ) && !dispatcher.notified_couriers.contains(&courier.courier_id);
    if !eligible {
        warn!(
            courier_id = courier.courier_id,
            condition = courier.condition.as_str(),
            "notification dropped: courier not eligible for an offer"
        );
        telemetry.policy_violations += 1;
        return;
    }

    dispatcher.notified_couriers.insert(courier.courier_id);
    for order_id in notification.order_ids() {
        dispatcher.offered_orders.insert(order_id);
    }
    telemetry.notifications_sent += 1;

    let now = clock.now();
    let token = courier.interrupt(now);
    let mut rng = stochastic_rng(settings.seed, SALT_ACCEPTANCE, courier.courier_id, now);
    let decision = acceptance.execute(courier.acceptance_rate, &mut rng);
    debug!(
        courier_id = courier.courier_id,
        wait = decision.wait_secs,
        "courier received a notification"
    );

    commands.entity(courier_entity).insert(PendingNotification {
        notification,
        accepted: decision.accepted,
    });
    clock.schedule_in(
        decision.wait_secs,
        Priority::Normal,
        Event::with_token(
            EventKind::NotificationDecision,
            Some(EventSubject::Courier(courier_entity)),
            token,
        ),
    );
}
