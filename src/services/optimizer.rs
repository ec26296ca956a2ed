//! External waypoint optimization with batching and local fallback
//!
//! Stops that still have work are seeded into a nearest-neighbor order, cut
//! into provider-sized batches and sent to the routing provider one batch at a
//! time. Any batch the provider cannot answer is ordered locally instead, so a
//! pass always produces a complete order.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::defaults::{
    DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS, DEFAULT_CIRCUIT_BREAKER_THRESHOLD, DEFAULT_MAX_STOPS_PER_BATCH,
    DEFAULT_REQUEST_INTERVAL_MS,
};
use crate::error::RouteError;
use crate::services::rate_limiter::RateLimiter;
use crate::services::routing::{validate_waypoint_order, CircuitBreaker, RoutingProvider};
use crate::services::sequencer::RouteSequencer;
use crate::types::{Coordinates, Stop, StopKey};

/// Batching and pacing settings
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Stops per request, destination included
    pub max_stops_per_batch: usize,
    pub request_interval: Duration,
    pub breaker_threshold: u32,
    pub breaker_recovery: Duration,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_stops_per_batch: DEFAULT_MAX_STOPS_PER_BATCH,
            request_interval: Duration::from_millis(DEFAULT_REQUEST_INTERVAL_MS),
            breaker_threshold: DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
            breaker_recovery: Duration::from_secs(DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS),
        }
    }
}

impl From<&Config> for OptimizerConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_stops_per_batch: config.max_stops_per_batch,
            request_interval: Duration::from_millis(config.request_interval_ms),
            breaker_threshold: config.breaker_threshold,
            breaker_recovery: Duration::from_secs(config.breaker_recovery_secs),
        }
    }
}

/// Where the order of one batch came from
#[derive(Debug, Clone, PartialEq)]
pub enum BatchSource {
    Provider,
    Fallback { reason: String },
    /// Single stop, nothing to ask for
    Trivial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub index: usize,
    pub size: usize,
    pub source: BatchSource,
}

/// Result of a provider-backed pass
#[derive(Debug, Clone)]
pub struct ProviderPlan {
    /// Settled stops, sequenced batches, then anything left unprocessed
    pub stops: Vec<Stop>,
    pub batches: Vec<BatchReport>,
    pub cancelled: bool,
}

impl ProviderPlan {
    pub fn fallback_count(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| matches!(b.source, BatchSource::Fallback { .. }))
            .count()
    }
}

/// Batches stops through a `RoutingProvider`, falling back to local construction
pub struct ExternalOptimizer {
    provider: Arc<dyn RoutingProvider>,
    sequencer: RouteSequencer,
    config: OptimizerConfig,
    pacer: RateLimiter,
    breaker: CircuitBreaker,
}

impl ExternalOptimizer {
    pub fn new(provider: Arc<dyn RoutingProvider>, sequencer: RouteSequencer, config: OptimizerConfig) -> Self {
        let pacer = RateLimiter::new(config.request_interval);
        let breaker = CircuitBreaker::new(config.breaker_threshold, config.breaker_recovery);
        Self {
            provider,
            sequencer,
            config,
            pacer,
            breaker,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Stops per batch: the configured cap, bounded by the provider's waypoint
    /// ceiling plus the destination
    pub fn batch_size(&self) -> usize {
        self.config
            .max_stops_per_batch
            .min(self.provider.max_waypoints() + 1)
            .max(1)
    }

    pub async fn optimize_via_provider(
        &self,
        stops: &[Stop],
        start: Coordinates,
        fixed_end: Option<&StopKey>,
        cancel: &CancellationToken,
    ) -> ProviderPlan {
        self.optimize_with_write_back(stops, start, fixed_end, cancel, |_| {})
            .await
    }

    /// Like `optimize_via_provider`, handing `write_back` the full stop order
    /// after every completed batch.
    pub async fn optimize_with_write_back<F>(
        &self,
        stops: &[Stop],
        start: Coordinates,
        fixed_end: Option<&StopKey>,
        cancel: &CancellationToken,
        mut write_back: F,
    ) -> ProviderPlan
    where
        F: FnMut(&[Stop]),
    {
        let (settled, actionable): (Vec<Stop>, Vec<Stop>) =
            stops.iter().cloned().partition(|s| !s.has_remaining_work());

        let seeded = self.sequencer.construct(&actionable, start, fixed_end);
        let batch_size = self.batch_size();

        info!(
            "Optimizing {} stops via {} in batches of {}",
            seeded.len(),
            self.provider.name(),
            batch_size
        );

        let mut ordered = settled;
        let mut processed: HashSet<StopKey> = HashSet::new();
        let mut batches = Vec::new();
        let mut cancelled = false;
        let mut current = start;

        for (index, chunk) in seeded.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let (batch, source) = if chunk.len() == 1 {
                (chunk.to_vec(), BatchSource::Trivial)
            } else {
                match self.request_batch(chunk, current, cancel).await {
                    Ok(Some(batch)) => (batch, BatchSource::Provider),
                    Ok(None) => {
                        debug!("Batch {} discarded on cancellation", index);
                        cancelled = true;
                        break;
                    }
                    Err(e) => {
                        warn!("Batch {} falls back to local ordering: {}", index, e);
                        let reason = match e {
                            RouteError::ProviderUnavailable(reason) => reason,
                            other => other.to_string(),
                        };
                        (
                            self.sequencer.construct(chunk, current, fixed_end),
                            BatchSource::Fallback { reason },
                        )
                    }
                }
            };

            debug!("Batch {} ({} stops) ordered by {:?}", index, batch.len(), source);

            if let Some(last) = batch.last() {
                current = last.coordinates;
            }
            processed.extend(batch.iter().map(|s| s.key.clone()));
            ordered.extend(batch);
            batches.push(BatchReport {
                index,
                size: chunk.len(),
                source,
            });

            write_back(&with_unprocessed(&ordered, &actionable, &processed));
        }

        let stops = with_unprocessed(&ordered, &actionable, &processed);
        ProviderPlan {
            stops,
            batches,
            cancelled,
        }
    }

    /// One provider round trip. `Ok(None)` means cancelled mid-flight.
    async fn request_batch(
        &self,
        chunk: &[Stop],
        origin: Coordinates,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<Stop>>, RouteError> {
        let Some((destination, waypoints)) = chunk.split_last() else {
            return Ok(Some(Vec::new()));
        };

        if self.breaker.is_open() {
            return Err(RouteError::ProviderUnavailable(format!(
                "circuit breaker open after {} failures",
                self.breaker.failures()
            )));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            _ = self.pacer.wait() => {}
        }

        let points: Vec<Coordinates> = waypoints.iter().map(|s| s.coordinates).collect();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            result = self.provider.optimize_waypoints(origin, destination.coordinates, &points) => result,
        };

        let order = result.and_then(|order| {
            validate_waypoint_order(&order, points.len())?;
            Ok(order)
        });

        match order {
            Ok(order) => {
                self.breaker.record_success();
                let mut batch: Vec<Stop> = order.into_iter().map(|i| waypoints[i].clone()).collect();
                batch.push(destination.clone());
                Ok(Some(batch))
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(RouteError::ProviderUnavailable(format!("{:#}", e)))
            }
        }
    }
}

/// `ordered` followed by every actionable stop not yet processed, in its prior order
fn with_unprocessed(ordered: &[Stop], actionable: &[Stop], processed: &HashSet<StopKey>) -> Vec<Stop> {
    ordered
        .iter()
        .cloned()
        .chain(actionable.iter().filter(|s| !processed.contains(&s.key)).cloned())
        .collect()
}
