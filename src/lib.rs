//! Delivery stop sequencing
//!
//! Groups delivery records into stops, orders the stops for travel (locally
//! or through an external routing provider) and tracks delivery progress.

pub mod cli;
pub mod commands;
pub mod config;
pub mod defaults;
pub mod error;
pub mod services;
pub mod store;
pub mod types;

pub use error::RouteError;
