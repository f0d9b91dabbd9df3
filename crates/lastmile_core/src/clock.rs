//! Simulation time: an integer-seconds timeline driven by a scheduled-event queue.
//!
//! All timestamps and `clock.now()` are in **simulated seconds**, counted from the
//! configured simulation start (seconds since midnight). The timeline advances by
//! popping the next scheduled event; same-second events are served urgent-first,
//! then in FIFO order by sequence number.
//!
//! Courier states that wait on the clock are guarded by a *state token*: timed
//! wakes carry the token current at schedule time, and interrupting a state bumps
//! the courier's token so stale wakes are discarded when they surface.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

/// One minute in simulated seconds.
pub const ONE_MIN_SECS: u64 = 60;
/// One hour in simulated seconds.
pub const ONE_HOUR_SECS: u64 = 60 * ONE_MIN_SECS;
/// One day in simulated seconds.
pub const ONE_DAY_SECS: u64 = 24 * ONE_HOUR_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SimulationStarted,
    WorldTick,
    BufferMatchRun,
    PrepositionRun,
    NotificationDecision,
    CourierWake,
    CourierMoveStep,
    ServiceFinished,
    CourierLogOff,
    UserCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubject {
    Courier(Entity),
    Order(Entity),
}

/// Scheduling priority. `Urgent` events are served before `Normal` events
/// scheduled for the same second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Urgent,
    Normal,
}

/// Simulation event. `token` is the state token the event was issued under;
/// handlers for courier-state wakes drop the event when the token is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
    pub token: u64,
}

impl Event {
    pub fn new(kind: EventKind, subject: Option<EventSubject>) -> Self {
        Self {
            kind,
            subject,
            token: 0,
        }
    }

    pub fn with_token(kind: EventKind, subject: Option<EventSubject>, token: u64) -> Self {
        Self {
            kind,
            subject,
            token,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scheduled {
    at: u64,
    priority: Priority,
    seq: u64,
    event: Event,
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earliest second first, Urgent before Normal, FIFO by sequence.
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event most recently popped by the runner, visible to systems.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

/// Simulation clock: integer seconds, advancing to the next scheduled event.
#[derive(Debug, Clone, Resource)]
pub struct SimulationClock {
    /// Current simulation time in seconds (updated when an event is popped).
    now: u64,
    /// Monotonic sequence counter giving FIFO order within a second.
    seq: u64,
    events: BinaryHeap<Scheduled>,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::with_start(0)
    }
}

impl SimulationClock {
    /// Clock starting at the given simulated second (seconds since midnight).
    pub fn with_start(start_secs: u64) -> Self {
        Self {
            now: start_secs,
            seq: 0,
            events: BinaryHeap::new(),
        }
    }

    /// Current simulation time in seconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Hour of the simulated day (0-23), for time-of-day effects.
    pub fn hour_of_day(&self) -> u8 {
        ((self.now / ONE_HOUR_SECS) % 24) as u8
    }

    /// Schedule an event at an absolute simulation second.
    pub fn schedule_at(&mut self, at: u64, priority: Priority, event: Event) {
        debug_assert!(at >= self.now, "event timestamp must be >= current time");
        let seq = self.seq;
        self.seq += 1;
        self.events.push(Scheduled {
            at,
            priority,
            seq,
            event,
        });
    }

    /// Schedule an event at `now + delay` seconds.
    pub fn schedule_in(&mut self, delay: u64, priority: Priority, event: Event) {
        self.schedule_at(self.now.saturating_add(delay), priority, event);
    }

    /// Schedule a `Normal`-priority event at `now + delay`.
    pub fn schedule_event_in(&mut self, delay: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_in(delay, Priority::Normal, Event::new(kind, subject));
    }

    /// Pop the next event (earliest second; urgent-first, then FIFO).
    /// Advances `now` to the event's timestamp.
    pub fn pop_next(&mut self) -> Option<Event> {
        let scheduled = self.events.pop()?;
        self.now = scheduled.at;
        Some(scheduled.event)
    }

    /// Timestamp of the next scheduled event without popping it.
    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|scheduled| scheduled.at)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(20, Priority::Normal, Event::new(EventKind::WorldTick, None));
        clock.schedule_at(5, Priority::Normal, Event::new(EventKind::WorldTick, None));
        clock.schedule_at(10, Priority::Normal, Event::new(EventKind::WorldTick, None));

        assert_eq!(clock.next_event_time(), Some(5));
        clock.pop_next().expect("first event");
        assert_eq!(clock.now(), 5);
        clock.pop_next().expect("second event");
        assert_eq!(clock.now(), 10);
        clock.pop_next().expect("third event");
        assert_eq!(clock.now(), 20);
        assert!(clock.pop_next().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn same_second_events_are_fifo() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(
            7,
            Priority::Normal,
            Event::new(EventKind::BufferMatchRun, None),
        );
        clock.schedule_at(7, Priority::Normal, Event::new(EventKind::WorldTick, None));

        let first = clock.pop_next().expect("first");
        let second = clock.pop_next().expect("second");
        assert_eq!(first.kind, EventKind::BufferMatchRun);
        assert_eq!(second.kind, EventKind::WorldTick);
    }

    #[test]
    fn urgent_events_preempt_normal_at_same_second() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(3, Priority::Normal, Event::new(EventKind::WorldTick, None));
        clock.schedule_at(
            3,
            Priority::Urgent,
            Event::new(EventKind::CourierLogOff, None),
        );

        let first = clock.pop_next().expect("first");
        assert_eq!(first.kind, EventKind::CourierLogOff);
        let second = clock.pop_next().expect("second");
        assert_eq!(second.kind, EventKind::WorldTick);
    }

    #[test]
    fn schedule_in_is_relative_to_now() {
        let mut clock = SimulationClock::with_start(25_200);
        clock.schedule_event_in(10, EventKind::WorldTick, None);
        let event = clock.pop_next().expect("event");
        assert_eq!(event.kind, EventKind::WorldTick);
        assert_eq!(clock.now(), 25_210);
    }

    #[test]
    fn hour_of_day_wraps() {
        let clock = SimulationClock::with_start(12 * ONE_HOUR_SECS + 59);
        assert_eq!(clock.hour_of_day(), 12);
        let clock = SimulationClock::with_start(26 * ONE_HOUR_SECS);
        assert_eq!(clock.hour_of_day(), 2);
    }
}
