//! Shift-end handling: the single log-off event scheduled per courier.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Courier, CourierCondition, PendingNotification};
use crate::route::MovementPlan;
use crate::scenario::params::SimulationSettings;
use crate::systems::route_progress::{log_off_now, release_pending_offer};
use crate::telemetry::SimTelemetry;

pub fn log_off_system(
    mut commands: Commands,
    clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    mut dispatcher: ResMut<Dispatcher>,
    mut telemetry: ResMut<SimTelemetry>,
    settings: Res<SimulationSettings>,
    mut couriers: Query<(&mut Courier, Option<&PendingNotification>)>,
) {
    if event.0.kind != EventKind::CourierLogOff {
        return;
    }
    let Some(EventSubject::Courier(courier_entity)) = event.0.subject else {
        return;
    };
    let Ok((mut courier, pending)) = couriers.get_mut(courier_entity) else {
        return;
    };
    if courier.condition == CourierCondition::LoggedOff {
        return;
    }

    if courier.active_route.is_none() && courier.active_stop.is_none() {
        if let Some(pending) = pending {
            release_pending_offer(&mut dispatcher, &mut telemetry, courier.courier_id, pending);
            commands
                .entity(courier_entity)
                .remove::<PendingNotification>();
        }
        commands.entity(courier_entity).remove::<MovementPlan>();
        log_off_now(clock.now(), &mut dispatcher, &settings, &mut courier);
    } else {
        courier.log_off_scheduled = true;
        debug!(
            courier_id = courier.courier_id,
            "courier log off deferred until route completion"
        );
    }
}
