//! The dispatcher: order and courier registries plus the congestion signal.
//!
//! All registry mutation happens through the synchronous event methods below,
//! called from systems on the single simulation thread. Every order id lives
//! in exactly one order registry and every courier id in exactly one courier
//! registry; [`Dispatcher::check_registry_invariants`] aborts the run with a
//! diagnostic dump if that ever stops being true.
//!
//! `notified_couriers` and `offered_orders` are auxiliary sets, not
//! registries: they enforce the at-most-one-outstanding-offer rules without
//! moving entries between registries.

use std::collections::{BTreeMap, BTreeSet};

use bevy_ecs::prelude::{Entity, Resource};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderRegistry {
    Unassigned,
    Scheduled,
    PickingUp,
    Canceled,
    Fulfilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CourierRegistry {
    Idle,
    Moving,
    Busy,
    LoggedOff,
}

#[derive(Debug, Default, Resource)]
pub struct Dispatcher {
    pub unassigned_orders: BTreeMap<u64, Entity>,
    pub scheduled_orders: BTreeMap<u64, Entity>,
    pub picking_up_orders: BTreeMap<u64, Entity>,
    pub canceled_orders: BTreeMap<u64, Entity>,
    pub fulfilled_orders: BTreeMap<u64, Entity>,

    pub idle_couriers: BTreeMap<u64, Entity>,
    pub moving_couriers: BTreeMap<u64, Entity>,
    pub busy_couriers: BTreeMap<u64, Entity>,
    pub logged_off_couriers: BTreeMap<u64, Entity>,

    /// Couriers with an outstanding notification.
    pub notified_couriers: BTreeSet<u64>,
    /// Orders currently offered to a courier.
    pub offered_orders: BTreeSet<u64>,

    orders: BTreeMap<u64, Entity>,
    couriers: BTreeMap<u64, Entity>,

    pub density_threshold: usize,
    pub limit_radius_km: f64,
    pub substitution_prob: f64,
}

impl Dispatcher {
    pub fn new(density_threshold: usize, limit_radius_km: f64, substitution_prob: f64) -> Self {
        Self {
            density_threshold,
            limit_radius_km,
            substitution_prob,
            ..Default::default()
        }
    }

    /// Congestion signal consumed by the demand-management policy: once the
    /// unassigned buffer reaches the density threshold, admissions are
    /// limited to the configured radius.
    pub fn current_radius_km(&self) -> f64 {
        if self.unassigned_orders.len() >= self.density_threshold {
            self.limit_radius_km
        } else {
            f64::INFINITY
        }
    }

    pub fn order_entity(&self, order_id: u64) -> Option<Entity> {
        self.orders.get(&order_id).copied()
    }

    pub fn courier_entity(&self, courier_id: u64) -> Option<Entity> {
        self.couriers.get(&courier_id).copied()
    }

    pub fn all_couriers(&self) -> &BTreeMap<u64, Entity> {
        &self.couriers
    }

    fn move_order(&mut self, order_id: u64, target: OrderRegistry) {
        let Some(entity) = self.orders.get(&order_id).copied() else {
            return;
        };
        self.unassigned_orders.remove(&order_id);
        self.scheduled_orders.remove(&order_id);
        self.picking_up_orders.remove(&order_id);
        self.canceled_orders.remove(&order_id);
        self.fulfilled_orders.remove(&order_id);
        match target {
            OrderRegistry::Unassigned => self.unassigned_orders.insert(order_id, entity),
            OrderRegistry::Scheduled => self.scheduled_orders.insert(order_id, entity),
            OrderRegistry::PickingUp => self.picking_up_orders.insert(order_id, entity),
            OrderRegistry::Canceled => self.canceled_orders.insert(order_id, entity),
            OrderRegistry::Fulfilled => self.fulfilled_orders.insert(order_id, entity),
        };
    }

    fn move_courier(&mut self, courier_id: u64, target: CourierRegistry) {
        let Some(entity) = self.couriers.get(&courier_id).copied() else {
            return;
        };
        self.idle_couriers.remove(&courier_id);
        self.moving_couriers.remove(&courier_id);
        self.busy_couriers.remove(&courier_id);
        self.logged_off_couriers.remove(&courier_id);
        match target {
            CourierRegistry::Idle => self.idle_couriers.insert(courier_id, entity),
            CourierRegistry::Moving => self.moving_couriers.insert(courier_id, entity),
            CourierRegistry::Busy => self.busy_couriers.insert(courier_id, entity),
            CourierRegistry::LoggedOff => self.logged_off_couriers.insert(courier_id, entity),
        };
    }

    // ---- order lifecycle -------------------------------------------------

    pub fn order_submitted_event(&mut self, order_id: u64, entity: Entity) {
        self.orders.insert(order_id, entity);
        self.move_order(order_id, OrderRegistry::Unassigned);
    }

    /// A courier accepted the offer covering these orders.
    pub fn notification_accepted_event(&mut self, courier_id: u64, order_ids: &[u64]) {
        self.notified_couriers.remove(&courier_id);
        for order_id in order_ids {
            self.offered_orders.remove(order_id);
            self.move_order(*order_id, OrderRegistry::Scheduled);
        }
    }

    /// A courier rejected the offer; its orders return to the buffer.
    pub fn notification_rejected_event(&mut self, courier_id: u64, order_ids: &[u64]) {
        self.notified_couriers.remove(&courier_id);
        for order_id in order_ids {
            self.offered_orders.remove(order_id);
        }
    }

    pub fn orders_in_store_event(&mut self, order_ids: &[u64]) {
        for order_id in order_ids {
            self.move_order(*order_id, OrderRegistry::PickingUp);
        }
    }

    /// Picked-up orders stay in the picking-up registry until drop-off.
    pub fn orders_picked_up_event(&mut self, _order_ids: &[u64]) {}

    pub fn orders_dropped_off_event(&mut self, order_ids: &[u64]) {
        for order_id in order_ids {
            self.move_order(*order_id, OrderRegistry::Fulfilled);
        }
    }

    pub fn cancel_order_event(&mut self, order_id: u64) {
        self.offered_orders.remove(&order_id);
        self.move_order(order_id, OrderRegistry::Canceled);
    }

    /// Drop a warm-up-window order from the final registries. The entity and
    /// its trace survive; only the metric-facing registry entry goes.
    pub fn discard_from_metrics(&mut self, order_id: u64) {
        self.canceled_orders.remove(&order_id);
        self.fulfilled_orders.remove(&order_id);
    }

    // ---- courier lifecycle ----------------------------------------------

    pub fn courier_logged_on_event(&mut self, courier_id: u64, entity: Entity) {
        self.couriers.insert(courier_id, entity);
        self.move_courier(courier_id, CourierRegistry::Idle);
    }

    pub fn courier_idle_event(&mut self, courier_id: u64) {
        self.move_courier(courier_id, CourierRegistry::Idle);
    }

    pub fn courier_moving_event(&mut self, courier_id: u64) {
        self.move_courier(courier_id, CourierRegistry::Moving);
    }

    pub fn courier_picking_up_event(&mut self, courier_id: u64) {
        self.move_courier(courier_id, CourierRegistry::Busy);
    }

    pub fn courier_dropping_off_event(&mut self, courier_id: u64) {
        self.move_courier(courier_id, CourierRegistry::Busy);
    }

    pub fn courier_log_off_event(&mut self, courier_id: u64) {
        self.notified_couriers.remove(&courier_id);
        self.move_courier(courier_id, CourierRegistry::LoggedOff);
    }

    // ---- diagnostics -----------------------------------------------------

    pub fn registry_summary(&self) -> String {
        format!(
            "unassigned={} scheduled={} picking_up={} fulfilled={} canceled={} | \
             idle={} moving={} busy={} logged_off={}",
            self.unassigned_orders.len(),
            self.scheduled_orders.len(),
            self.picking_up_orders.len(),
            self.fulfilled_orders.len(),
            self.canceled_orders.len(),
            self.idle_couriers.len(),
            self.moving_couriers.len(),
            self.busy_couriers.len(),
            self.logged_off_couriers.len(),
        )
    }

    /// Abort the simulation if an id appears in two registries at once.
    pub fn check_registry_invariants(&self) {
        let order_maps = [
            ("unassigned", &self.unassigned_orders),
            ("scheduled", &self.scheduled_orders),
            ("picking_up", &self.picking_up_orders),
            ("canceled", &self.canceled_orders),
            ("fulfilled", &self.fulfilled_orders),
        ];
        let mut seen: BTreeMap<u64, &str> = BTreeMap::new();
        for (name, map) in order_maps {
            for order_id in map.keys() {
                if let Some(previous) = seen.insert(*order_id, name) {
                    error!(
                        order_id,
                        first = previous,
                        second = name,
                        summary = %self.registry_summary(),
                        "order present in two registries"
                    );
                    panic!("order {order_id} present in registries {previous} and {name}");
                }
            }
        }

        let courier_maps = [
            ("idle", &self.idle_couriers),
            ("moving", &self.moving_couriers),
            ("busy", &self.busy_couriers),
            ("logged_off", &self.logged_off_couriers),
        ];
        let mut seen: BTreeMap<u64, &str> = BTreeMap::new();
        for (name, map) in courier_maps {
            for courier_id in map.keys() {
                if let Some(previous) = seen.insert(*courier_id, name) {
                    error!(
                        courier_id,
                        first = previous,
                        second = name,
                        summary = %self.registry_summary(),
                        "courier present in two registries"
                    );
                    panic!("courier {courier_id} present in registries {previous} and {name}");
                }
            }
        }
    }
}
