//! Sequencing, delivery tracking and routing services

pub mod aggregation;
pub mod cancellation;
pub mod delivery;
pub mod editor;
pub mod geo;
pub mod geolocation;
pub mod optimizer;
pub mod planner;
pub mod rate_limiter;
pub mod routing;
pub mod sequencer;
