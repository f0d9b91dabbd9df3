//! Event-reacting systems, one per event kind, plus the shared lifecycle
//! helpers they drive.

pub mod buffer_matching;
pub mod courier_wake;
pub mod log_off;
pub mod movement;
pub mod notification_decision;
pub mod notify;
pub mod preposition;
pub mod route_progress;
pub mod service;
pub mod user_cancel;
pub mod world_tick;
