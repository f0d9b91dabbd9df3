//! Post-run metric records for couriers and orders.
//!
//! Records are computed once the run has been post-processed (warm-up window
//! dropped, idle couriers force-logged-off) and are what the exporters write.

use serde::Serialize;

use crate::ecs::{Courier, Order, OrderTiming};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourierMetricsRecord {
    pub courier_id: u64,
    pub on_time: u64,
    pub off_time: u64,
    pub fulfilled_orders: usize,
    pub earnings: Option<f64>,
    pub utilization_time: u64,
    pub accepted_notifications: u32,
    pub guaranteed_compensation: Option<bool>,
    pub courier_utilization: f64,
    pub courier_delivery_earnings: f64,
    pub courier_compensation: Option<f64>,
    pub courier_orders_delivered_per_hour: f64,
    pub courier_bundles_picked_per_hour: f64,
}

/// Shift metrics for one courier. A zero-length shift yields zero rates.
pub fn courier_metrics(courier: &Courier, earnings_per_order: f64) -> CourierMetricsRecord {
    let shift_secs = courier.shift_secs();
    let shift_hours = shift_secs as f64 / 3600.0;
    let delivery_earnings = courier.fulfilled_orders.len() as f64 * earnings_per_order;

    let (utilization, delivered_per_hour, bundles_per_hour) = if shift_secs > 0 {
        (
            courier.utilization_time as f64 / shift_secs as f64,
            courier.fulfilled_orders.len() as f64 / shift_hours,
            courier.accepted_notifications as f64 / shift_hours,
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    CourierMetricsRecord {
        courier_id: courier.courier_id,
        on_time: courier.on_time,
        off_time: courier.off_time,
        fulfilled_orders: courier.fulfilled_orders.len(),
        earnings: courier.earnings,
        utilization_time: courier.utilization_time,
        accepted_notifications: courier.accepted_notifications,
        guaranteed_compensation: courier.guaranteed_compensation,
        courier_utilization: utilization,
        courier_delivery_earnings: delivery_earnings,
        courier_compensation: courier.earnings,
        courier_orders_delivered_per_hour: delivered_per_hour,
        courier_bundles_picked_per_hour: bundles_per_hour,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderMetricsRecord {
    pub order_id: u64,
    pub placement_time: u64,
    pub preparation_time: u64,
    pub ready_time: u64,
    pub expected_drop_off_time: u64,
    pub acceptance_time: Option<u64>,
    pub in_store_time: Option<u64>,
    pub pick_up_time: Option<u64>,
    pub drop_off_time: Option<u64>,
    pub cancellation_time: Option<u64>,
    pub state: &'static str,
    /// Placement to drop-off.
    pub click_to_door: Option<u64>,
    /// Placement to pick-up.
    pub click_to_taken: Option<u64>,
    /// Ready to pick-up.
    pub ready_to_pick_up: Option<u64>,
}

pub fn order_metrics(order: &Order, timing: &OrderTiming) -> OrderMetricsRecord {
    OrderMetricsRecord {
        order_id: order.order_id,
        placement_time: order.placement_time,
        preparation_time: order.preparation_time,
        ready_time: order.ready_time,
        expected_drop_off_time: order.expected_drop_off_time,
        acceptance_time: timing.acceptance_time,
        in_store_time: timing.in_store_time,
        pick_up_time: timing.pick_up_time,
        drop_off_time: timing.drop_off_time,
        cancellation_time: timing.cancellation_time,
        state: order.state.as_str(),
        click_to_door: timing
            .drop_off_time
            .map(|t| t.saturating_sub(order.placement_time)),
        click_to_taken: timing
            .pick_up_time
            .map(|t| t.saturating_sub(order.placement_time)),
        ready_to_pick_up: timing
            .pick_up_time
            .map(|t| t.saturating_sub(order.ready_time)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{OrderState, Vehicle};
    use crate::spatial::Location;
    use bevy_ecs::prelude::Entity;

    #[test]
    fn courier_metrics_rates_scale_with_shift() {
        let mut courier = Courier::new(3, Vehicle::motorcycle(), 0, 7200, 1.0);
        courier.fulfilled_orders.extend([1, 2, 3, 4]);
        courier.accepted_notifications = 4;
        courier.utilization_time = 3600;
        courier.earnings = Some(12.0);

        let record = courier_metrics(&courier, 3.0);
        assert_eq!(record.fulfilled_orders, 4);
        assert_eq!(record.courier_utilization, 0.5);
        assert_eq!(record.courier_orders_delivered_per_hour, 2.0);
        assert_eq!(record.courier_bundles_picked_per_hour, 2.0);
        assert_eq!(record.courier_delivery_earnings, 12.0);
        assert_eq!(record.courier_compensation, Some(12.0));
    }

    #[test]
    fn courier_metrics_zero_shift_is_all_zero_rates() {
        let courier = Courier::new(3, Vehicle::motorcycle(), 100, 100, 1.0);
        let record = courier_metrics(&courier, 3.0);
        assert_eq!(record.courier_utilization, 0.0);
        assert_eq!(record.courier_orders_delivered_per_hour, 0.0);
    }

    #[test]
    fn order_metrics_derived_columns() {
        let order = Order {
            order_id: 9,
            pick_up_at: Location::new(0.0, 0.0),
            drop_off_at: Location::new(0.0, 1.0),
            placement_time: 100,
            preparation_time: 60,
            ready_time: 160,
            expected_drop_off_time: 900,
            pick_up_service_time: 10,
            drop_off_service_time: 10,
            state: OrderState::DroppedOff,
            courier_id: Some(1),
            user: Entity::from_raw(1),
        };
        let timing = OrderTiming {
            acceptance_time: Some(110),
            in_store_time: Some(150),
            pick_up_time: Some(170),
            drop_off_time: Some(400),
            cancellation_time: None,
        };
        let record = order_metrics(&order, &timing);
        assert_eq!(record.click_to_door, Some(300));
        assert_eq!(record.click_to_taken, Some(70));
        assert_eq!(record.ready_to_pick_up, Some(10));
        assert_eq!(record.state, "dropped_off");
    }
}
