//! Movement system: advances couriers leg by leg along a resolved polyline.
//!
//! Leg durations are sampled when each leg starts, so time-of-day velocity
//! coefficients apply to long moves as the clock crosses hour boundaries.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};

use crate::clock::{CurrentEvent, Event, EventKind, EventSubject, Priority, SimulationClock};
use crate::dispatcher::Dispatcher;
use crate::ecs::{Courier, Order, OrderTiming, Position};
use crate::policies::movement::MovementPolicyResource;
use crate::route::{MovePurpose, MovementPlan};
use crate::routing::RoutingClientResource;
use crate::scenario::params::SimulationSettings;
use crate::systems::route_progress::{advance_route, enter_idle};

#[allow(clippy::too_many_arguments)]
pub fn movement_system(
    mut commands: Commands,
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    mut dispatcher: ResMut<Dispatcher>,
    settings: Res<SimulationSettings>,
    movement: Res<MovementPolicyResource>,
    routing: Res<RoutingClientResource>,
    mut couriers: Query<(&mut Courier, &mut Position, Option<&mut MovementPlan>)>,
    mut orders: Query<(&mut Order, &mut OrderTiming)>,
) {
    if event.0.kind != EventKind::CourierMoveStep {
        return;
    }
    let Some(EventSubject::Courier(courier_entity)) = event.0.subject else {
        return;
    };
    let Ok((mut courier, mut position, plan)) = couriers.get_mut(courier_entity) else {
        return;
    };
    if event.0.token != courier.state_token {
        return;
    }
    let Some(mut plan) = plan else {
        return;
    };

    if plan.next < plan.points.len() {
        position.0 = plan.points[plan.next];
        plan.next += 1;
    }

    if !plan.is_finished() {
        let from = plan.points[plan.next - 1];
        let to = plan.points[plan.next];
        let leg = movement.0.leg_duration_secs(from, to, &courier.vehicle, clock.hour_of_day());
        clock.schedule_in(
            leg,
            Priority::Normal,
            Event::with_token(
                EventKind::CourierMoveStep,
                Some(EventSubject::Courier(courier_entity)),
                courier.state_token,
            ),
        );
        return;
    }

    // Arrived: the moving state ends here.
    let purpose = plan.purpose;
    commands.entity(courier_entity).remove::<MovementPlan>();
    courier.accrue_utilization(clock.now());

    match purpose {
        MovePurpose::Relocate => enter_idle(
            &mut clock,
            &mut dispatcher,
            &settings,
            courier_entity,
            &mut courier,
        ),
        MovePurpose::RouteStop => advance_route(
            &mut commands,
            &mut clock,
            &mut dispatcher,
            &settings,
            movement.0.as_ref(),
            routing.0.as_ref(),
            courier_entity,
            &mut courier,
            &position,
            &mut orders,
        ),
    }
}
