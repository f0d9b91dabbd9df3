//! Pluggable strategies injected into the couriers and the dispatcher.
//!
//! Each family is a single-method trait boxed into an ECS resource at
//! scenario build. The set of implementations is closed and selected by
//! configuration (`scenario::params`). Policies that involve a cooperative
//! wait (acceptance with a decision delay) return the wait to the caller,
//! which realizes it on the scheduler.

pub mod acceptance;
pub mod buffering;
pub mod cancellation;
pub mod demand;
pub mod matching;
pub mod movement;
pub mod movement_eval;
pub mod prepositioning;

pub use acceptance::{
    AbsoluteAcceptancePolicy, AcceptanceDecision, AcceptancePolicyResource,
    CourierAcceptancePolicy, UniformAcceptancePolicy,
};
pub use buffering::{BufferingPolicyResource, DispatcherBufferingPolicy, RollingBufferingPolicy};
pub use cancellation::{
    DispatcherCancellationPolicy, DispatcherCancellationPolicyResource, RandomWaitCancellationPolicy,
    StaticCancellationPolicy, UserCancellationPolicy, UserCancellationPolicyResource,
};
pub use demand::{
    DemandManagementPolicyResource, DispatcherDemandManagementPolicy, NoDemandManagementPolicy,
    RadiusDemandManagementPolicy,
};
pub use matching::{
    DispatcherMatchingPolicy, GreedyMatchingPolicy, MatchingCourier, MatchingMetric, MatchingOrder,
    MatchingPolicyResource,
};
pub use movement::{
    CourierMovementPolicy, DynamicRoutedMovementPolicy, MovementPolicyResource,
    RoutedMovementPolicy, SPEED_COEFFICIENTS,
};
pub use movement_eval::{
    CourierMovementEvaluationPolicy, MovementEvaluationPolicyResource,
    NeighborsMovementEvaluationPolicy, StillMovementEvaluationPolicy,
};
pub use prepositioning::{
    DemandBalancePrepositioningPolicy, DispatcherPrepositioningPolicy, FixedIntervalPrepositioningEvaluation,
    NoPrepositioningPolicy, PrepositioningEvaluationPolicy, PrepositioningEvaluationResource,
    PrepositioningPolicyResource,
};
