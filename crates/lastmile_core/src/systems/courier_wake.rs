//! Idle wake: every `COURIER_WAIT_TO_MOVE` seconds an idle courier asks its
//! movement-evaluation policy whether to drift somewhere new.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, Event, EventKind, EventSubject, Priority, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Courier, CourierCondition, Position};
use crate::policies::movement::MovementPolicyResource;
use crate::policies::movement_eval::MovementEvaluationPolicyResource;
use crate::route::MovePurpose;
use crate::routing::RoutingClientResource;
use crate::scenario::params::SimulationSettings;
use crate::systems::route_progress::{enter_moving, stochastic_rng, SALT_MOVEMENT_EVAL};

#[allow(clippy::too_many_arguments)]
pub fn courier_wake_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    mut dispatcher: ResMut<Dispatcher>,
    settings: Res<SimulationSettings>,
    movement: Res<MovementPolicyResource>,
    movement_eval: Res<MovementEvaluationPolicyResource>,
    routing: Res<RoutingClientResource>,
    mut couriers: Query<(&mut Courier, &Position)>,
) {
    if event.0.kind != EventKind::CourierWake {
        return;
    }
    let Some(EventSubject::Courier(courier_entity)) = event.0.subject else {
        return;
    };
    let Ok((mut courier, position)) = couriers.get_mut(courier_entity) else {
        return;
    };
    if event.0.token != courier.state_token || courier.condition != CourierCondition::Idle {
        return;
    }

    let now = clock.now();
    let mut rng = stochastic_rng(settings.seed, SALT_MOVEMENT_EVAL, courier.courier_id, now);
    match movement_eval.0.next_destination(position.0, &mut rng) {
        Some(destination) => {
            debug!(courier_id = courier.courier_id, "courier decided to move");
            enter_moving(
                &mut commands,
                &mut clock,
                &mut dispatcher,
                movement.0.as_ref(),
                routing.0.as_ref(),
                courier_entity,
                &mut courier,
                position,
                destination,
                MovePurpose::Relocate,
            );
        }
        None => {
            clock.schedule_in(
                settings.courier_wait_to_move,
                Priority::Normal,
                Event::with_token(
                    EventKind::CourierWake,
                    Some(EventSubject::Courier(courier_entity)),
                    courier.state_token,
                ),
            );
        }
    }
}
