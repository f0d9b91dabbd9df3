//! Run telemetry: counters, the matching trace, and admission-rejected orders.

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::policies::matching::MatchingMetric;
use crate::spatial::Location;

/// An order turned away by demand management without substitution. It never
/// enters a dispatcher registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LostOrderRecord {
    pub order_id: u64,
    pub pick_up_at: Location,
    pub drop_off_at: Location,
    pub placement_time: u64,
}

#[derive(Debug, Default, Resource)]
pub struct SimTelemetry {
    pub orders_placed: u64,
    pub orders_canceled: u64,
    pub orders_fulfilled: u64,
    pub notifications_sent: u64,
    pub notifications_accepted: u64,
    pub notifications_rejected: u64,
    /// Notifications dropped because a policy targeted an ineligible courier.
    pub policy_violations: u64,
    pub lost_orders: Vec<LostOrderRecord>,
    pub matching_metrics: Vec<MatchingMetric>,
}
