pub mod build;
pub mod params;

pub use build::build_scenario;
pub use params::{
    AcceptancePolicyKind, BufferingPolicyKind, DemandManagementPolicyKind,
    DispatcherCancellationPolicyKind, MatchingPolicyKind, MovementEvaluationPolicyKind,
    MovementPolicyKind, PrepositioningPolicyKind, RoutingClientKind, SimulationEnd,
    SimulationSettings, UserCancellationPolicyKind,
};
