//! Routing providers for optimized waypoint order
//!
//! Uses Google Directions in production, mock for tests and offline use.

mod circuit_breaker;
mod google;

pub use circuit_breaker::CircuitBreaker;
pub use google::{GoogleDirectionsClient, GoogleDirectionsConfig, GOOGLE_MAX_WAYPOINTS};

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::services::geo::haversine_distance;
use crate::types::Coordinates;

/// Routing provider trait for abstraction (Google, mock, etc.)
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Optimized visiting order for `waypoints` on a trip from `origin` to
    /// `destination`. Returns indices into `waypoints`.
    async fn optimize_waypoints(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        waypoints: &[Coordinates],
    ) -> Result<Vec<usize>>;

    /// Largest number of waypoints accepted in one call
    fn max_waypoints(&self) -> usize;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Check that `order` is a permutation of `0..len`
pub fn validate_waypoint_order(order: &[usize], len: usize) -> Result<()> {
    if order.len() != len {
        anyhow::bail!("provider returned {} indices for {} waypoints", order.len(), len);
    }
    let mut seen = vec![false; len];
    for &idx in order {
        if idx >= len || seen[idx] {
            anyhow::bail!("provider returned invalid waypoint order {:?}", order);
        }
        seen[idx] = true;
    }
    Ok(())
}

/// Mock routing provider for tests and offline use.
/// Orders waypoints greedily by Haversine distance from the origin.
pub struct MockRoutingProvider {
    max_waypoints: usize,
}

impl Default for MockRoutingProvider {
    fn default() -> Self {
        Self {
            max_waypoints: GOOGLE_MAX_WAYPOINTS,
        }
    }
}

impl MockRoutingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_waypoints(max_waypoints: usize) -> Self {
        Self { max_waypoints }
    }
}

#[async_trait]
impl RoutingProvider for MockRoutingProvider {
    async fn optimize_waypoints(
        &self,
        origin: Coordinates,
        _destination: Coordinates,
        waypoints: &[Coordinates],
    ) -> Result<Vec<usize>> {
        if waypoints.len() > self.max_waypoints {
            anyhow::bail!(
                "{} waypoints exceed the limit of {}",
                waypoints.len(),
                self.max_waypoints
            );
        }

        let mut remaining: Vec<usize> = (0..waypoints.len()).collect();
        let mut order = Vec::with_capacity(waypoints.len());
        let mut current = origin;

        while !remaining.is_empty() {
            let mut best_pos = 0;
            let mut best_distance = f64::INFINITY;
            for (pos, &idx) in remaining.iter().enumerate() {
                let distance = haversine_distance(&current, &waypoints[idx]);
                if distance < best_distance {
                    best_distance = distance;
                    best_pos = pos;
                }
            }
            let next = remaining.remove(best_pos);
            current = waypoints[next];
            order.push(next);
        }

        Ok(order)
    }

    fn max_waypoints(&self) -> usize {
        self.max_waypoints
    }

    fn name(&self) -> &str {
        "MockRouting"
    }
}

/// Create the routing provider from configuration.
///
/// Uses Google Directions when an API key is configured and the client can be
/// built; otherwise falls back to the mock provider.
pub fn create_routing_provider(config: &Config) -> Arc<dyn RoutingProvider> {
    if let Some(api_key) = &config.google_maps_api_key {
        let google = GoogleDirectionsConfig {
            base_url: config.directions_url.clone(),
            api_key: api_key.clone(),
            timeout_seconds: config.provider_timeout_secs,
        };
        match GoogleDirectionsClient::new(google) {
            Ok(client) => {
                info!("Using Google Directions routing provider");
                return Arc::new(client);
            }
            Err(e) => {
                warn!("Google Directions client unavailable: {}. Falling back to mock routing.", e);
            }
        }
    }

    info!("Using mock routing provider (no API key configured)");
    Arc::new(MockRoutingProvider::new())
}
