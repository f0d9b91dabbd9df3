//! Route-plan domain objects: stops, routes, notifications, and movement plans.
//!
//! A [`Route`] is an ordered plan of [`Stop`]s assigned to one courier. Stops
//! carry order *ids* only; the order data itself lives on the order entity and
//! is resolved through the dispatcher registry, so there is a single owner.
//! Stop `position` tags are stable identifiers within a route: appending
//! continues the numbering and removal never renumbers, so a courier's
//! `active_stop` tag stays valid while the route is edited underneath it.

use bevy_ecs::prelude::{Component, Entity};

use crate::spatial::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopKind {
    PickUp,
    DropOff,
    Preposition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub location: Location,
    /// Stable tag within the owning route (not a vector index).
    pub position: usize,
    pub kind: StopKind,
    pub orders: Vec<u64>,
    pub visited: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub stops: Vec<Stop>,
    pub orders: Vec<u64>,
}

impl Route {
    /// The `[PickUp, DropOff]` plan for a single order.
    pub fn single_order(order_id: u64, pick_up_at: Location, drop_off_at: Location) -> Self {
        Self {
            stops: vec![
                Stop {
                    location: pick_up_at,
                    position: 0,
                    kind: StopKind::PickUp,
                    orders: vec![order_id],
                    visited: false,
                },
                Stop {
                    location: drop_off_at,
                    position: 1,
                    kind: StopKind::DropOff,
                    orders: vec![order_id],
                    visited: false,
                },
            ],
            orders: vec![order_id],
        }
    }

    /// A single relocation stop carrying no orders.
    pub fn preposition(destination: Location) -> Self {
        Self {
            stops: vec![Stop {
                location: destination,
                position: 0,
                kind: StopKind::Preposition,
                orders: Vec::new(),
                visited: false,
            }],
            orders: Vec::new(),
        }
    }

    fn next_position(&self) -> usize {
        self.stops
            .iter()
            .map(|stop| stop.position + 1)
            .max()
            .unwrap_or(0)
    }

    /// Append another route's stops, re-tagging them after the existing ones.
    pub fn append(&mut self, other: Route) {
        let offset = self.next_position();
        for mut stop in other.stops {
            stop.position += offset;
            self.stops.push(stop);
        }
        for order_id in other.orders {
            if !self.orders.contains(&order_id) {
                self.orders.push(order_id);
            }
        }
    }

    /// Index of the first unvisited stop, in plan order.
    pub fn first_unvisited(&self) -> Option<usize> {
        self.stops.iter().position(|stop| !stop.visited)
    }

    pub fn stop_index_by_position(&self, position: usize) -> Option<usize> {
        self.stops.iter().position(|stop| stop.position == position)
    }

    /// Remove an order from the plan: the id is dropped from every stop and
    /// unvisited stops left without orders are deleted. Position tags are
    /// preserved.
    pub fn remove_order(&mut self, order_id: u64) {
        for stop in &mut self.stops {
            stop.orders.retain(|id| *id != order_id);
        }
        self.stops.retain(|stop| {
            stop.visited || stop.kind == StopKind::Preposition || !stop.orders.is_empty()
        });
        self.orders.retain(|id| *id != order_id);
    }

    /// True when every pick-up order has a matching later drop-off stop.
    pub fn orders_are_paired(&self) -> bool {
        for (ix, stop) in self.stops.iter().enumerate() {
            if stop.kind != StopKind::PickUp {
                continue;
            }
            for order_id in &stop.orders {
                let later_drop_offs = self.stops[ix + 1..]
                    .iter()
                    .filter(|later| {
                        later.kind == StopKind::DropOff && later.orders.contains(order_id)
                    })
                    .count();
                if later_drop_offs != 1 {
                    return false;
                }
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    PickUpDropOff,
    Prepositioning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Route(Route),
    Reposition(Location),
}

/// An offer sent from the dispatcher to one courier. At most one notification
/// per courier is outstanding at any instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub courier: Entity,
    pub kind: NotificationKind,
    pub instruction: Instruction,
}

impl Notification {
    pub fn pick_up_drop_off(courier: Entity, route: Route) -> Self {
        Self {
            courier,
            kind: NotificationKind::PickUpDropOff,
            instruction: Instruction::Route(route),
        }
    }

    pub fn prepositioning(courier: Entity, destination: Location) -> Self {
        Self {
            courier,
            kind: NotificationKind::Prepositioning,
            instruction: Instruction::Reposition(destination),
        }
    }

    /// Order ids carried by the instruction (empty for prepositioning).
    pub fn order_ids(&self) -> Vec<u64> {
        match &self.instruction {
            Instruction::Route(route) => route.orders.clone(),
            Instruction::Reposition(_) => Vec::new(),
        }
    }
}

/// Why a courier is moving: toward a route stop, or drifting while idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovePurpose {
    RouteStop,
    Relocate,
}

/// Resolved polyline for an in-progress move, stored on the courier entity.
/// `next` indexes the point the courier is moving toward.
#[derive(Debug, Clone, Component)]
pub struct MovementPlan {
    pub points: Vec<Location>,
    pub next: usize,
    pub purpose: MovePurpose,
}

impl MovementPlan {
    pub fn new(points: Vec<Location>, purpose: MovePurpose) -> Self {
        Self {
            points,
            next: 1,
            purpose,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.next >= self.points.len()
    }
}
