//! Dispatcher matching policies: turning buffered orders into notifications.

use std::collections::BTreeSet;
use std::time::Instant;

use bevy_ecs::prelude::{Entity, Resource};

use crate::ecs::{CourierCondition, Vehicle};
use crate::route::{Notification, Route};
use crate::routing::{estimate_route_properties, RoutingClient};
use crate::spatial::{haversine_km, Location};

/// Snapshot of one buffered order, as seen by the matching policy.
#[derive(Debug, Clone)]
pub struct MatchingOrder {
    pub entity: Entity,
    pub order_id: u64,
    pub pick_up_at: Location,
    pub drop_off_at: Location,
    pub pick_up_service_time: u64,
    pub drop_off_service_time: u64,
}

/// Snapshot of one registered courier, as seen by the matching policy.
#[derive(Debug, Clone)]
pub struct MatchingCourier {
    pub entity: Entity,
    pub courier_id: u64,
    pub location: Location,
    pub vehicle: Vehicle,
    pub condition: CourierCondition,
    pub has_active_route: bool,
    pub notified: bool,
}

/// Bookkeeping for one matching run, kept in the telemetry trace.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingMetric {
    pub orders: usize,
    pub couriers: usize,
    pub prospects: usize,
    pub matches: usize,
    pub matching_time_secs: f64,
}

pub trait DispatcherMatchingPolicy: Send + Sync {
    fn execute(
        &self,
        orders: &[MatchingOrder],
        couriers: &[MatchingCourier],
        routing: &dyn RoutingClient,
    ) -> (Vec<Notification>, MatchingMetric);
}

#[derive(Resource)]
pub struct MatchingPolicyResource(pub Box<dyn DispatcherMatchingPolicy>);

/// Greedy matcher: for each order in enumeration order, offer it to the
/// nearest-in-time idle courier that has not been notified this run.
#[derive(Debug)]
pub struct GreedyMatchingPolicy {
    pub prospects_max_distance_km: f64,
}

impl GreedyMatchingPolicy {
    pub fn new(prospects_max_distance_km: f64) -> Self {
        Self {
            prospects_max_distance_km,
        }
    }

    /// Feasible (order, courier) index pairs within the prospect radius.
    fn prospects(
        &self,
        orders: &[MatchingOrder],
        couriers: &[MatchingCourier],
    ) -> Vec<(usize, usize)> {
        let mut prospects = Vec::new();
        for (order_ix, order) in orders.iter().enumerate() {
            for (courier_ix, courier) in couriers.iter().enumerate() {
                let distance_to_pick_up = haversine_km(courier.location, order.pick_up_at);
                if distance_to_pick_up <= self.prospects_max_distance_km {
                    prospects.push((order_ix, courier_ix));
                }
            }
        }
        prospects
    }

    /// Estimated seconds to fulfil the order from the courier's position,
    /// including both service times.
    fn estimations(
        orders: &[MatchingOrder],
        couriers: &[MatchingCourier],
        prospects: &[(usize, usize)],
        routing: &dyn RoutingClient,
    ) -> Vec<u64> {
        prospects
            .iter()
            .map(|&(order_ix, courier_ix)| {
                let order = &orders[order_ix];
                let courier = &couriers[courier_ix];
                let (_, time) = estimate_route_properties(
                    routing,
                    courier.location,
                    &[order.pick_up_at, order.drop_off_at],
                    &courier.vehicle,
                );
                time + order.pick_up_service_time + order.drop_off_service_time
            })
            .collect()
    }
}

impl DispatcherMatchingPolicy for GreedyMatchingPolicy {
    fn execute(
        &self,
        orders: &[MatchingOrder],
        couriers: &[MatchingCourier],
        routing: &dyn RoutingClient,
    ) -> (Vec<Notification>, MatchingMetric) {
        let started = Instant::now();

        let idle: Vec<MatchingCourier> = couriers
            .iter()
            .filter(|courier| {
                courier.condition == CourierCondition::Idle
                    && !courier.has_active_route
                    && !courier.notified
            })
            .cloned()
            .collect();

        let prospects = self.prospects(orders, &idle);
        let estimations = Self::estimations(orders, &idle, &prospects, routing);

        let mut notifications = Vec::new();
        let mut notified: BTreeSet<usize> = BTreeSet::new();
        for (order_ix, order) in orders.iter().enumerate() {
            let best = prospects
                .iter()
                .zip(&estimations)
                .filter(|((prospect_order, courier_ix), _)| {
                    *prospect_order == order_ix && !notified.contains(courier_ix)
                })
                .min_by_key(|(_, time)| **time)
                .map(|((_, courier_ix), _)| *courier_ix);

            if let Some(courier_ix) = best {
                notifications.push(Notification::pick_up_drop_off(
                    idle[courier_ix].entity,
                    Route::single_order(order.order_id, order.pick_up_at, order.drop_off_at),
                ));
                notified.insert(courier_ix);
            }
        }

        let metric = MatchingMetric {
            orders: orders.len(),
            couriers: couriers.len(),
            prospects: prospects.len(),
            matches: notifications.len(),
            matching_time_secs: started.elapsed().as_secs_f64(),
        };
        (notifications, metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::HaversineRoutingClient;

    fn order(entity_bits: u64, order_id: u64, pick_up_lng: f64) -> MatchingOrder {
        MatchingOrder {
            entity: Entity::from_raw(entity_bits as u32),
            order_id,
            pick_up_at: Location::new(0.0, pick_up_lng),
            drop_off_at: Location::new(0.0, pick_up_lng + 0.01),
            pick_up_service_time: 60,
            drop_off_service_time: 60,
        }
    }

    fn courier(entity_bits: u64, courier_id: u64, lng: f64) -> MatchingCourier {
        MatchingCourier {
            entity: Entity::from_raw(entity_bits as u32),
            courier_id,
            location: Location::new(0.0, lng),
            vehicle: Vehicle::motorcycle(),
            condition: CourierCondition::Idle,
            has_active_route: false,
            notified: false,
        }
    }

    #[test]
    fn greedy_picks_the_fastest_courier() {
        let policy = GreedyMatchingPolicy::new(50.0);
        let orders = vec![order(100, 1, 0.0)];
        let couriers = vec![courier(1, 10, 0.3), courier(2, 11, 0.05)];
        let (notifications, metric) =
            policy.execute(&orders, &couriers, &HaversineRoutingClient);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].courier, couriers[1].entity);
        assert_eq!(metric.matches, 1);
        assert_eq!(metric.prospects, 2);
    }

    #[test]
    fn greedy_never_offers_one_courier_twice_in_a_run() {
        let policy = GreedyMatchingPolicy::new(50.0);
        let orders = vec![order(100, 1, 0.0), order(101, 2, 0.01)];
        let couriers = vec![courier(1, 10, 0.0)];
        let (notifications, _) = policy.execute(&orders, &couriers, &HaversineRoutingClient);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].order_ids(), vec![1]);
    }

    #[test]
    fn greedy_skips_non_idle_and_notified_couriers() {
        let policy = GreedyMatchingPolicy::new(50.0);
        let orders = vec![order(100, 1, 0.0)];
        let mut busy = courier(1, 10, 0.0);
        busy.condition = CourierCondition::PickingUp;
        let mut offered = courier(2, 11, 0.0);
        offered.notified = true;
        let (notifications, metric) =
            policy.execute(&orders, &[busy, offered], &HaversineRoutingClient);
        assert!(notifications.is_empty());
        assert_eq!(metric.matches, 0);
    }

    #[test]
    fn greedy_respects_prospect_radius() {
        let policy = GreedyMatchingPolicy::new(1.0);
        let orders = vec![order(100, 1, 0.0)];
        // ~111 km away, outside the 1 km prospect radius.
        let couriers = vec![courier(1, 10, 1.0)];
        let (notifications, metric) = policy.execute(&orders, &couriers, &HaversineRoutingClient);
        assert!(notifications.is_empty());
        assert_eq!(metric.prospects, 0);
    }

    #[test]
    fn greedy_notification_carries_single_order_route() {
        let policy = GreedyMatchingPolicy::new(50.0);
        let orders = vec![order(100, 7, 0.0)];
        let couriers = vec![courier(1, 10, 0.0)];
        let (notifications, _) = policy.execute(&orders, &couriers, &HaversineRoutingClient);
        let crate::route::Instruction::Route(route) = &notifications[0].instruction else {
            panic!("expected a route instruction");
        };
        assert_eq!(route.stops.len(), 2);
        assert!(route.orders_are_paired());
    }
}
