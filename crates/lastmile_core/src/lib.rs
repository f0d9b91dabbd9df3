//! # Last-Mile Delivery Simulation Core
//!
//! A discrete-event simulator of an on-demand delivery platform: couriers
//! with shifts and acceptance behaviour, users placing orders, and a central
//! dispatcher that buffers, matches, notifies, cancels, and repositions.
//!
//! ## Overview
//!
//! - **Event Scheduling**: integer-seconds virtual clock with urgent/normal
//!   priorities and FIFO same-second ordering
//! - **ECS State**: couriers, users, and orders as entities; registries in a
//!   dispatcher resource
//! - **Policies**: pluggable acceptance, movement, buffering, matching,
//!   cancellation, prepositioning, and demand-management strategies
//! - **Deterministic**: seeded per-decision RNG makes reruns bit-identical
//! - **Outputs**: per-courier and per-order metrics with CSV/Parquet/JSON
//!   exporters
//!
//! ## Example
//!
//! ```rust,no_run
//! use lastmile_core::datasource::InMemoryDataSource;
//! use lastmile_core::scenario::SimulationSettings;
//! use lastmile_core::world::run_simulation;
//!
//! let settings = SimulationSettings::default().with_seed(42);
//! let report = run_simulation(settings, Box::new(InMemoryDataSource::default()));
//! println!("fulfilled: {}", report.orders_fulfilled);
//! ```

pub mod clock;
pub mod datasource;
pub mod dispatcher;
pub mod ecs;
pub mod metrics;
pub mod metrics_export;
pub mod policies;
pub mod route;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod spatial;
pub mod systems;
pub mod telemetry;
pub mod world;
