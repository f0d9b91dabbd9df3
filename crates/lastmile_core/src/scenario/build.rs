//! Scenario construction: resolve policy selectors and insert every resource
//! the systems expect.

use bevy_ecs::prelude::World;

use crate::clock::{SimulationClock, ONE_DAY_SECS};
use crate::datasource::{DataSourceResource, InstanceDataSource};
use crate::dispatcher::Dispatcher;
use crate::policies::{
    AbsoluteAcceptancePolicy, AcceptancePolicyResource, BufferingPolicyResource,
    DemandBalancePrepositioningPolicy, DemandManagementPolicyResource,
    DispatcherCancellationPolicyResource, DynamicRoutedMovementPolicy,
    FixedIntervalPrepositioningEvaluation, GreedyMatchingPolicy, MatchingPolicyResource,
    MovementEvaluationPolicyResource, MovementPolicyResource, NeighborsMovementEvaluationPolicy,
    NoDemandManagementPolicy, NoPrepositioningPolicy, PrepositioningEvaluationResource,
    PrepositioningPolicyResource, RadiusDemandManagementPolicy, RandomWaitCancellationPolicy,
    RollingBufferingPolicy, RoutedMovementPolicy, StaticCancellationPolicy,
    StillMovementEvaluationPolicy, UniformAcceptancePolicy, UserCancellationPolicyResource,
};
#[cfg(feature = "osrm")]
use crate::routing::CachedRoutingClient;
use crate::routing::{HaversineRoutingClient, RoutingClient, RoutingClientResource};
use crate::scenario::params::{
    AcceptancePolicyKind, DemandManagementPolicyKind, MovementEvaluationPolicyKind,
    MovementPolicyKind, PrepositioningPolicyKind, RoutingClientKind, SimulationEnd,
    SimulationSettings,
};
use crate::telemetry::SimTelemetry;

/// Route cache capacity for network-backed clients.
#[cfg(feature = "osrm")]
const ROUTE_CACHE_CAPACITY: usize = 20_000;

fn build_routing_client(kind: &RoutingClientKind) -> Box<dyn RoutingClient> {
    match kind {
        RoutingClientKind::Haversine => Box::new(HaversineRoutingClient),
        #[cfg(feature = "osrm")]
        RoutingClientKind::Osrm { endpoint } => Box::new(CachedRoutingClient::new(
            Box::new(crate::routing::osrm::OsrmRoutingClient::new(endpoint)),
            ROUTE_CACHE_CAPACITY,
        )),
    }
}

/// Builds the simulation world from one explicit settings value and a data
/// source. Inserts the clock, the dispatcher, telemetry, and every policy
/// resource; policies come from the closed selector enums in the settings.
pub fn build_scenario(
    world: &mut World,
    settings: SimulationSettings,
    data_source: Box<dyn InstanceDataSource>,
) {
    world.insert_resource(SimulationClock::with_start(settings.simulate_from));
    world.insert_resource(SimTelemetry::default());
    world.insert_resource(Dispatcher::new(
        settings.density_threshold,
        settings.limit_radius_km,
        settings.substitution_prob,
    ));

    let end = settings
        .simulate_until
        .unwrap_or(settings.simulate_from.saturating_add(ONE_DAY_SECS));
    world.insert_resource(SimulationEnd(end));

    world.insert_resource(DataSourceResource(data_source));
    world.insert_resource(RoutingClientResource(build_routing_client(
        &settings.routing_client,
    )));

    world.insert_resource(AcceptancePolicyResource(match settings.acceptance_policy {
        AcceptancePolicyKind::Uniform => Box::new(UniformAcceptancePolicy::default()),
        AcceptancePolicyKind::Absolute => Box::new(AbsoluteAcceptancePolicy),
    }));

    world.insert_resource(MovementPolicyResource(match settings.movement_policy {
        MovementPolicyKind::Routed => Box::new(RoutedMovementPolicy),
        MovementPolicyKind::DynamicRouted => Box::new(DynamicRoutedMovementPolicy),
    }));

    world.insert_resource(MovementEvaluationPolicyResource(
        match settings.movement_evaluation_policy {
            MovementEvaluationPolicyKind::Neighbors => {
                Box::new(NeighborsMovementEvaluationPolicy)
            }
            MovementEvaluationPolicyKind::Still => Box::new(StillMovementEvaluationPolicy),
        },
    ));

    world.insert_resource(BufferingPolicyResource(Box::new(RollingBufferingPolicy {
        interval_secs: settings.buffering_interval_secs,
    })));

    world.insert_resource(MatchingPolicyResource(Box::new(GreedyMatchingPolicy::new(
        settings.dispatcher_prospects_max_distance_km,
    ))));

    world.insert_resource(DispatcherCancellationPolicyResource(Box::new(
        StaticCancellationPolicy,
    )));

    world.insert_resource(UserCancellationPolicyResource(Box::new(
        RandomWaitCancellationPolicy {
            min_wait_secs: settings.user_cancellation_min_wait_secs,
            max_wait_secs: settings.user_cancellation_max_wait_secs,
        },
    )));

    world.insert_resource(PrepositioningPolicyResource(
        match settings.prepositioning_policy {
            PrepositioningPolicyKind::None => Box::new(NoPrepositioningPolicy),
            PrepositioningPolicyKind::DemandBalance => {
                Box::new(DemandBalancePrepositioningPolicy::default())
            }
        },
    ));

    world.insert_resource(PrepositioningEvaluationResource(Box::new(
        FixedIntervalPrepositioningEvaluation {
            interval_secs: settings.prepositioning_interval_secs,
        },
    )));

    world.insert_resource(DemandManagementPolicyResource(
        match settings.demand_management_policy {
            DemandManagementPolicyKind::None => Box::new(NoDemandManagementPolicy),
            DemandManagementPolicyKind::Radius => Box::new(RadiusDemandManagementPolicy),
        },
    ));

    world.insert_resource(settings);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::InMemoryDataSource;

    #[test]
    fn build_inserts_core_resources() {
        let mut world = World::new();
        build_scenario(
            &mut world,
            SimulationSettings::default(),
            Box::new(InMemoryDataSource::default()),
        );
        assert!(world.get_resource::<SimulationClock>().is_some());
        assert!(world.get_resource::<Dispatcher>().is_some());
        assert!(world.get_resource::<SimTelemetry>().is_some());
        assert!(world.get_resource::<SimulationEnd>().is_some());
        assert!(world.get_resource::<AcceptancePolicyResource>().is_some());
        assert!(world.get_resource::<MatchingPolicyResource>().is_some());
    }

    #[test]
    fn clock_starts_at_simulate_from() {
        let mut world = World::new();
        build_scenario(
            &mut world,
            SimulationSettings::default().with_simulate_from(3600),
            Box::new(InMemoryDataSource::default()),
        );
        assert_eq!(world.resource::<SimulationClock>().now(), 3600);
    }
}
