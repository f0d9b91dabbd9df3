//! Prepositioning: proactive relocation of idle couriers toward demand.

use std::collections::BTreeMap;

use bevy_ecs::prelude::Resource;
use h3o::CellIndex;

use crate::policies::matching::MatchingCourier;
use crate::route::Notification;
use crate::spatial::{haversine_km, zone_center, zone_for, Location};

pub trait DispatcherPrepositioningPolicy: Send + Sync {
    /// Relocation notifications for the given idle couriers.
    /// `recent_demand` holds the pick-up locations of currently unmatched
    /// orders.
    fn execute(
        &self,
        idle_couriers: &[MatchingCourier],
        recent_demand: &[Location],
    ) -> Vec<Notification>;
}

#[derive(Resource)]
pub struct PrepositioningPolicyResource(pub Box<dyn DispatcherPrepositioningPolicy>);

/// How often the prepositioning loop wakes.
pub trait PrepositioningEvaluationPolicy: Send + Sync {
    fn interval_secs(&self) -> u64;
}

#[derive(Resource)]
pub struct PrepositioningEvaluationResource(pub Box<dyn PrepositioningEvaluationPolicy>);

#[derive(Debug)]
pub struct FixedIntervalPrepositioningEvaluation {
    pub interval_secs: u64,
}

impl Default for FixedIntervalPrepositioningEvaluation {
    fn default() -> Self {
        Self { interval_secs: 600 }
    }
}

impl PrepositioningEvaluationPolicy for FixedIntervalPrepositioningEvaluation {
    fn interval_secs(&self) -> u64 {
        self.interval_secs.max(1)
    }
}

/// Never repositions (default).
#[derive(Debug, Default)]
pub struct NoPrepositioningPolicy;

impl DispatcherPrepositioningPolicy for NoPrepositioningPolicy {
    fn execute(
        &self,
        _idle_couriers: &[MatchingCourier],
        _recent_demand: &[Location],
    ) -> Vec<Notification> {
        Vec::new()
    }
}

/// Relocates surplus idle couriers toward zones where unmatched demand
/// exceeds idle supply. Each deficit zone pulls its nearest surplus courier,
/// up to `max_moves_per_cycle` per run.
#[derive(Debug)]
pub struct DemandBalancePrepositioningPolicy {
    pub max_moves_per_cycle: usize,
    pub max_relocation_km: f64,
}

impl Default for DemandBalancePrepositioningPolicy {
    fn default() -> Self {
        Self {
            max_moves_per_cycle: 5,
            max_relocation_km: 5.0,
        }
    }
}

fn zone_counts(locations: impl Iterator<Item = Location>) -> BTreeMap<CellIndex, usize> {
    let mut counts = BTreeMap::new();
    for location in locations {
        if let Some(zone) = zone_for(location) {
            *counts.entry(zone).or_insert(0) += 1;
        }
    }
    counts
}

impl DispatcherPrepositioningPolicy for DemandBalancePrepositioningPolicy {
    fn execute(
        &self,
        idle_couriers: &[MatchingCourier],
        recent_demand: &[Location],
    ) -> Vec<Notification> {
        let demand = zone_counts(recent_demand.iter().copied());
        let mut supply = zone_counts(idle_couriers.iter().map(|courier| courier.location));

        let mut deficits: Vec<(CellIndex, usize)> = demand
            .iter()
            .filter_map(|(zone, demanded)| {
                let supplied = supply.get(zone).copied().unwrap_or(0);
                (*demanded > supplied).then_some((*zone, demanded - supplied))
            })
            .collect();
        // Largest gap first so the worst-starved zone is served before the
        // per-cycle cap runs out.
        deficits.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut notifications = Vec::new();
        let mut assigned: Vec<bool> = vec![false; idle_couriers.len()];

        for (zone, mut gap) in deficits {
            let target = zone_center(zone);
            while gap > 0 && notifications.len() < self.max_moves_per_cycle {
                let candidate = idle_couriers
                    .iter()
                    .enumerate()
                    .filter(|(ix, courier)| {
                        if assigned[*ix] || courier.notified || courier.has_active_route {
                            return false;
                        }
                        // Only pull from zones that keep at least their own demand covered.
                        let Some(courier_zone) = zone_for(courier.location) else {
                            return false;
                        };
                        let zone_demand = demand.get(&courier_zone).copied().unwrap_or(0);
                        let zone_supply = supply.get(&courier_zone).copied().unwrap_or(0);
                        zone_supply > zone_demand
                    })
                    .map(|(ix, courier)| (ix, haversine_km(courier.location, target)))
                    .filter(|(_, distance)| *distance <= self.max_relocation_km)
                    .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

                let Some((courier_ix, _)) = candidate else {
                    break;
                };

                assigned[courier_ix] = true;
                if let Some(courier_zone) = zone_for(idle_couriers[courier_ix].location) {
                    if let Some(count) = supply.get_mut(&courier_zone) {
                        *count = count.saturating_sub(1);
                    }
                }
                notifications.push(Notification::prepositioning(
                    idle_couriers[courier_ix].entity,
                    target,
                ));
                gap -= 1;
            }
        }

        notifications
    }
}
