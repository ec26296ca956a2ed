//! Google Directions client
//!
//! Directions API documentation:
//! https://developers.google.com/maps/documentation/directions/get-directions#optimize

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{validate_waypoint_order, RoutingProvider};
use crate::defaults::{DEFAULT_DIRECTIONS_URL, DEFAULT_PROVIDER_TIMEOUT_SECS};
use crate::types::Coordinates;

/// Waypoint ceiling of a single Directions request
pub const GOOGLE_MAX_WAYPOINTS: usize = 25;

/// Google Directions client configuration
#[derive(Debug, Clone)]
pub struct GoogleDirectionsConfig {
    /// Directions JSON endpoint
    pub base_url: String,
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl GoogleDirectionsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_DIRECTIONS_URL.to_string(),
            api_key: api_key.into(),
            timeout_seconds: DEFAULT_PROVIDER_TIMEOUT_SECS,
        }
    }
}

/// Google Directions routing client
pub struct GoogleDirectionsClient {
    client: Client,
    config: GoogleDirectionsConfig,
}

impl GoogleDirectionsClient {
    pub fn new(config: GoogleDirectionsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// Query parameters of an optimized directions request
    fn build_query(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        waypoints: &[Coordinates],
    ) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("origin", origin.to_query_param()),
            ("destination", destination.to_query_param()),
        ];
        if !waypoints.is_empty() {
            let joined: Vec<String> = waypoints.iter().map(|w| w.to_query_param()).collect();
            query.push(("waypoints", format!("optimize:true|{}", joined.join("|"))));
        }
        query.push(("mode", "driving".to_string()));
        query.push(("key", self.config.api_key.clone()));
        query
    }
}

#[async_trait]
impl RoutingProvider for GoogleDirectionsClient {
    async fn optimize_waypoints(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        waypoints: &[Coordinates],
    ) -> Result<Vec<usize>> {
        if waypoints.len() > GOOGLE_MAX_WAYPOINTS {
            anyhow::bail!(
                "{} waypoints exceed the Directions limit of {}",
                waypoints.len(),
                GOOGLE_MAX_WAYPOINTS
            );
        }
        if waypoints.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting optimized order from Google for {} waypoints", waypoints.len());

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&self.build_query(origin, destination, waypoints))
            .send()
            .await
            .context("Failed to send directions request to Google")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Google Directions returned error {}: {}", status, body);
        }

        let body: DirectionsResponse = response
            .json()
            .await
            .context("Failed to parse Google Directions response")?;

        parse_waypoint_order(body, waypoints.len())
    }

    fn max_waypoints(&self) -> usize {
        GOOGLE_MAX_WAYPOINTS
    }

    fn name(&self) -> &str {
        "GoogleDirections"
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    #[serde(default)]
    waypoint_order: Vec<usize>,
}

fn parse_waypoint_order(body: DirectionsResponse, waypoint_count: usize) -> Result<Vec<usize>> {
    if body.status != "OK" {
        anyhow::bail!(
            "Google Directions status {}: {}",
            body.status,
            body.error_message.unwrap_or_default()
        );
    }

    let route = body
        .routes
        .into_iter()
        .next()
        .context("Google Directions returned no routes")?;

    validate_waypoint_order(&route.waypoint_order, waypoint_count)?;
    Ok(route.waypoint_order)
}
