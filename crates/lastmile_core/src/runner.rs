//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each
//! step pops the next event from [`SimulationClock`], inserts it as
//! [`CurrentEvent`], then runs the schedule.

use bevy_ecs::prelude::Res;
use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::scenario::params::SimulationEnd;
use crate::systems::{
    buffer_matching::buffer_matching_system,
    courier_wake::courier_wake_system,
    log_off::log_off_system,
    movement::movement_system,
    notification_decision::notification_decision_system,
    preposition::preposition_system,
    service::service_finished_system,
    user_cancel::user_cancel_system,
    world_tick::{simulation_started_system, world_tick_system},
};

// Condition functions for each event kind
fn is_simulation_started(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::SimulationStarted)
        .unwrap_or(false)
}

fn is_world_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::WorldTick)
        .unwrap_or(false)
}

fn is_buffer_match_run(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::BufferMatchRun)
        .unwrap_or(false)
}

fn is_preposition_run(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::PrepositionRun)
        .unwrap_or(false)
}

fn is_notification_decision(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::NotificationDecision)
        .unwrap_or(false)
}

fn is_courier_wake(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::CourierWake)
        .unwrap_or(false)
}

fn is_courier_move_step(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::CourierMoveStep)
        .unwrap_or(false)
}

fn is_service_finished(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ServiceFinished)
        .unwrap_or(false)
}

fn is_courier_log_off(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::CourierLogOff)
        .unwrap_or(false)
}

fn is_user_cancel(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::UserCancel)
        .unwrap_or(false)
}

/// Runs one simulation step: pops the next event, inserts it as
/// [`CurrentEvent`], then runs the schedule. Returns `false` when the clock
/// is empty or when the next event is at or past [`SimulationEnd`].
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let stop_at = world.get_resource::<SimulationEnd>().map(|end| end.0);
    let next_at = world
        .get_resource::<SimulationClock>()
        .and_then(|clock| clock.next_event_time());
    if let (Some(end), Some(at)) = (stop_at, next_at) {
        if at >= end {
            return false;
        }
    }

    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(event) => event,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Runs simulation steps until the event queue is empty, the end time is
/// reached, or `max_steps` have executed. Returns the number of steps.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Builds the default simulation schedule: all event-reacting systems plus
/// [`apply_deferred`] so spawned entities are applied before the next step.
///
/// Systems are conditionally executed based on event type to reduce overhead.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        simulation_started_system.run_if(is_simulation_started),
        world_tick_system.run_if(is_world_tick),
        buffer_matching_system.run_if(is_buffer_match_run),
        preposition_system.run_if(is_preposition_run),
        notification_decision_system.run_if(is_notification_decision),
        courier_wake_system.run_if(is_courier_wake),
        movement_system.run_if(is_courier_move_step),
        service_finished_system.run_if(is_service_finished),
        log_off_system.run_if(is_courier_log_off),
        user_cancel_system.run_if(is_user_cancel),
        // Always apply deferred commands so spawned entities are available
        // to the next event.
        apply_deferred,
    ));
    schedule
}

/// Schedules the `SimulationStarted` event. Call after building the scenario
/// and before running events.
pub fn initialize_simulation(world: &mut World) {
    let mut clock = world.resource_mut::<SimulationClock>();
    clock.schedule_event_in(0, EventKind::SimulationStarted, None);
}
