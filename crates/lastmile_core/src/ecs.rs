//! Entity components and state enums for couriers, users, and orders.
//!
//! Components are attached to entities in the ECS world; systems query and
//! mutate them as events are delivered. The dispatcher's registries hold
//! non-owning `Entity` handles into this world.

use bevy_ecs::prelude::{Component, Entity};

use crate::route::{Notification, Route};
use crate::spatial::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleKind {
    Bicycle,
    Motorcycle,
    Car,
}

/// A courier's vehicle. `average_velocity` is in km per simulated second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vehicle {
    pub kind: VehicleKind,
    pub average_velocity: f64,
}

impl Vehicle {
    pub fn bicycle() -> Self {
        Self {
            kind: VehicleKind::Bicycle,
            average_velocity: 15.0 / 3600.0,
        }
    }

    pub fn motorcycle() -> Self {
        Self {
            kind: VehicleKind::Motorcycle,
            average_velocity: 23.0 / 3600.0,
        }
    }

    pub fn car() -> Self {
        Self {
            kind: VehicleKind::Car,
            average_velocity: 30.0 / 3600.0,
        }
    }

    /// Override the average velocity (scenario tuning and tests).
    pub fn with_velocity(kind: VehicleKind, average_velocity: f64) -> Self {
        Self {
            kind,
            average_velocity,
        }
    }

    /// Parse a data-source vehicle label.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "bicycle" => Some(Self::bicycle()),
            "motorcycle" => Some(Self::motorcycle()),
            "car" => Some(Self::car()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourierCondition {
    Idle,
    Moving,
    PickingUp,
    DroppingOff,
    LoggedOff,
}

impl CourierCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourierCondition::Idle => "idle",
            CourierCondition::Moving => "moving",
            CourierCondition::PickingUp => "picking_up",
            CourierCondition::DroppingOff => "dropping_off",
            CourierCondition::LoggedOff => "logged_off",
        }
    }
}

/// Precise coordinates of a courier.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Position(pub Location);

/// Courier state. Shift bounds are in simulated seconds since midnight.
#[derive(Debug, Clone, Component)]
pub struct Courier {
    pub courier_id: u64,
    pub vehicle: Vehicle,
    pub on_time: u64,
    pub off_time: u64,
    pub acceptance_rate: f64,
    pub condition: CourierCondition,
    pub active_route: Option<Route>,
    /// Position tag of the stop currently being approached or serviced.
    pub active_stop: Option<usize>,
    pub accepted_notifications: u32,
    pub fulfilled_orders: Vec<u64>,
    pub rejected_orders: Vec<u64>,
    /// Total simulated seconds spent in a non-idle condition.
    pub utilization_time: u64,
    /// Start of the current busy state, if one is running.
    state_started_at: Option<u64>,
    pub earnings: Option<f64>,
    pub guaranteed_compensation: Option<bool>,
    pub log_off_scheduled: bool,
    /// Generation counter for the currently running state. Timed wakes carry
    /// the token they were issued under; bumping it invalidates them.
    pub state_token: u64,
}

impl Courier {
    pub fn new(
        courier_id: u64,
        vehicle: Vehicle,
        on_time: u64,
        off_time: u64,
        acceptance_rate: f64,
    ) -> Self {
        Self {
            courier_id,
            vehicle,
            on_time,
            off_time,
            acceptance_rate,
            condition: CourierCondition::Idle,
            active_route: None,
            active_stop: None,
            accepted_notifications: 0,
            fulfilled_orders: Vec::new(),
            rejected_orders: Vec::new(),
            utilization_time: 0,
            state_started_at: None,
            earnings: None,
            guaranteed_compensation: None,
            log_off_scheduled: false,
            state_token: 0,
        }
    }

    pub fn shift_secs(&self) -> u64 {
        self.off_time.saturating_sub(self.on_time)
    }

    /// Mark the start of a busy (non-idle) state.
    pub fn begin_busy(&mut self, now: u64) {
        self.state_started_at = Some(now);
    }

    /// Close the current busy state and add its duration to utilization.
    pub fn accrue_utilization(&mut self, now: u64) {
        if let Some(started_at) = self.state_started_at.take() {
            self.utilization_time += now.saturating_sub(started_at);
        }
    }

    /// Interrupt the running state: partial busy time is accrued and the state
    /// token is bumped so pending wakes for the old state are discarded.
    pub fn interrupt(&mut self, now: u64) -> u64 {
        self.accrue_utilization(now);
        self.state_token += 1;
        self.state_token
    }

    /// Compute shift earnings exactly once. A guaranteed hourly floor applies
    /// only when the courier delivered at least one order.
    pub fn calculate_earnings(&mut self, per_order: f64, per_hour: f64) -> f64 {
        if let Some(earnings) = self.earnings {
            return earnings;
        }
        let delivery = self.fulfilled_orders.len() as f64 * per_order;
        let guaranteed = self.shift_secs() as f64 / 3600.0 * per_hour;
        let earnings = if guaranteed > delivery && delivery > 0.0 {
            self.guaranteed_compensation = Some(true);
            guaranteed
        } else {
            self.guaranteed_compensation = Some(false);
            delivery
        };
        self.utilization_time = self.utilization_time.min(self.shift_secs());
        self.earnings = Some(earnings);
        earnings
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Placed,
    Scheduled,
    PickingUp,
    PickedUp,
    DroppedOff,
    Canceled,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Placed => "placed",
            OrderState::Scheduled => "scheduled",
            OrderState::PickingUp => "picking_up",
            OrderState::PickedUp => "picked_up",
            OrderState::DroppedOff => "dropped_off",
            OrderState::Canceled => "canceled",
        }
    }
}

/// Order identity, spatial data, and service parameters.
#[derive(Debug, Clone, Component)]
pub struct Order {
    pub order_id: u64,
    pub pick_up_at: Location,
    pub drop_off_at: Location,
    pub placement_time: u64,
    pub preparation_time: u64,
    pub ready_time: u64,
    pub expected_drop_off_time: u64,
    pub pick_up_service_time: u64,
    pub drop_off_service_time: u64,
    pub state: OrderState,
    pub courier_id: Option<u64>,
    pub user: Entity,
}

/// Order lifecycle timestamps, set as the dispatcher observes each transition.
#[derive(Debug, Clone, Copy, Default, Component)]
pub struct OrderTiming {
    pub acceptance_time: Option<u64>,
    pub in_store_time: Option<u64>,
    pub pick_up_time: Option<u64>,
    pub drop_off_time: Option<u64>,
    pub cancellation_time: Option<u64>,
}

/// The user who placed an order. One user entity per order, mirroring the
/// one-shot submit-then-watch lifecycle.
#[derive(Debug, Clone, Copy, Component)]
pub struct User {
    pub user_id: u64,
}

/// An offer delivered to a courier, waiting for the acceptance decision.
#[derive(Debug, Clone, Component)]
pub struct PendingNotification {
    pub notification: Notification,
    /// Outcome drawn by the acceptance policy when the offer was delivered.
    pub accepted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earnings_use_guarantee_only_above_delivery() {
        // 2h shift, guarantee 8/h = 16; one order at 5 -> guarantee wins.
        let mut courier = Courier::new(1, Vehicle::motorcycle(), 0, 7200, 1.0);
        courier.fulfilled_orders.push(10);
        let earnings = courier.calculate_earnings(5.0, 8.0);
        assert_eq!(earnings, 16.0);
        assert_eq!(courier.guaranteed_compensation, Some(true));
    }

    #[test]
    fn earnings_zero_deliveries_skip_guarantee() {
        let mut courier = Courier::new(1, Vehicle::motorcycle(), 0, 7200, 1.0);
        let earnings = courier.calculate_earnings(5.0, 8.0);
        assert_eq!(earnings, 0.0);
        assert_eq!(courier.guaranteed_compensation, Some(false));
    }

    #[test]
    fn earnings_computed_exactly_once() {
        let mut courier = Courier::new(1, Vehicle::motorcycle(), 0, 7200, 1.0);
        courier.fulfilled_orders.push(10);
        let first = courier.calculate_earnings(5.0, 8.0);
        courier.fulfilled_orders.push(11);
        let second = courier.calculate_earnings(5.0, 8.0);
        assert_eq!(first, second);
    }

    #[test]
    fn earnings_delivery_beats_guarantee() {
        let mut courier = Courier::new(1, Vehicle::motorcycle(), 0, 3600, 1.0);
        courier.fulfilled_orders.extend([1, 2, 3]);
        let earnings = courier.calculate_earnings(5.0, 8.0);
        assert_eq!(earnings, 15.0);
        assert_eq!(courier.guaranteed_compensation, Some(false));
    }

    #[test]
    fn interrupt_accrues_partial_busy_time() {
        let mut courier = Courier::new(1, Vehicle::motorcycle(), 0, 3600, 1.0);
        courier.begin_busy(100);
        let token = courier.interrupt(130);
        assert_eq!(courier.utilization_time, 30);
        assert_eq!(token, 1);
        // A second interrupt without a running state accrues nothing.
        courier.interrupt(200);
        assert_eq!(courier.utilization_time, 30);
    }

    #[test]
    fn earnings_clamp_utilization_to_shift() {
        let mut courier = Courier::new(1, Vehicle::motorcycle(), 0, 100, 1.0);
        courier.begin_busy(0);
        courier.accrue_utilization(250);
        courier.calculate_earnings(5.0, 8.0);
        assert_eq!(courier.utilization_time, 100);
    }

    #[test]
    fn vehicle_labels_parse() {
        assert_eq!(
            Vehicle::from_label("Motorcycle").map(|v| v.kind),
            Some(VehicleKind::Motorcycle)
        );
        assert!(Vehicle::from_label("hovercraft").is_none());
    }
}
