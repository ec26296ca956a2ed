//! Route planning entry point
//!
//! Resolves where a pass starts and ends, picks local or provider sequencing
//! and writes the resulting order back into the route.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::RouteError;
use crate::services::aggregation::group_stops;
use crate::services::cancellation::OptimizationRegistry;
use crate::services::delivery::Transition;
use crate::services::geo::{estimate, RouteMetrics};
use crate::services::geolocation::Geolocator;
use crate::services::optimizer::{BatchReport, ExternalOptimizer, OptimizerConfig};
use crate::services::routing::create_routing_provider;
use crate::services::sequencer::{RouteSequencer, SequencerConfig};
use crate::types::{Coordinates, Route, StartPreference, Stop, StopKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencingPolicy {
    /// Nearest neighbor + 2-opt, no network
    Local,
    /// External provider in batches, local fallback per batch
    Provider,
}

/// Summary of a completed planning pass
#[derive(Debug, Clone)]
pub struct PlanReport {
    /// Policy actually used
    pub policy: SequencingPolicy,
    pub start: Coordinates,
    pub stops_sequenced: usize,
    /// Empty for local passes
    pub batches: Vec<BatchReport>,
    pub metrics: RouteMetrics,
}

pub struct RoutePlanner {
    sequencer: RouteSequencer,
    optimizer: Option<ExternalOptimizer>,
    geolocator: Arc<dyn Geolocator>,
    registry: OptimizationRegistry,
}

impl RoutePlanner {
    pub fn new(sequencer: RouteSequencer, geolocator: Arc<dyn Geolocator>) -> Self {
        Self {
            sequencer,
            optimizer: None,
            geolocator,
            registry: OptimizationRegistry::new(),
        }
    }

    pub fn with_optimizer(mut self, optimizer: ExternalOptimizer) -> Self {
        self.optimizer = Some(optimizer);
        self
    }

    /// Planner with the configured sequencer and routing provider
    pub fn from_config(config: &Config, geolocator: Arc<dyn Geolocator>) -> Self {
        let sequencer = RouteSequencer::new(SequencerConfig::new(config.sequencer_max_iterations));
        let optimizer = ExternalOptimizer::new(
            create_routing_provider(config),
            sequencer.clone(),
            OptimizerConfig::from(config),
        );
        Self::new(sequencer, geolocator).with_optimizer(optimizer)
    }

    pub fn registry(&self) -> &OptimizationRegistry {
        &self.registry
    }

    /// Cancel a running pass over `route_id`
    pub fn cancel(&self, route_id: &uuid::Uuid) -> bool {
        self.registry.cancel(route_id)
    }

    /// Sequence the route's stops and write the order back.
    ///
    /// `position` is the driver's fix; when absent and the route starts at the
    /// current position, the geolocator is asked. Fails without touching the
    /// route when no start can be resolved. On cancellation the route keeps
    /// the last written-back batch order.
    pub async fn optimize(
        &self,
        route: &mut Route,
        policy: SequencingPolicy,
        position: Option<Coordinates>,
        cancel: &CancellationToken,
    ) -> Result<PlanReport, RouteError> {
        let guard = self.registry.register_with_parent(route.id, cancel)?;
        let token = guard.token();

        let stops = group_stops(route.records());
        let (start, head) = self.resolve_start(route, &stops, position).await?;

        let fixed_end = match (route.end.fixed_end(), &head) {
            (Some(end), Some(head)) if &head.key == end => {
                warn!("End stop {} is also the start stop, ignoring end preference", end);
                None
            }
            (end, _) => end.cloned(),
        };

        let rest: Vec<Stop> = match &head {
            Some(head) => stops.iter().filter(|s| s.key != head.key).cloned().collect(),
            None => stops,
        };
        let stops_sequenced = rest.iter().filter(|s| s.has_remaining_work()).count();

        let policy = match (policy, &self.optimizer) {
            (SequencingPolicy::Provider, None) => {
                warn!("No routing provider configured, sequencing locally");
                SequencingPolicy::Local
            }
            (policy, _) => policy,
        };

        let batches = match (policy, &self.optimizer) {
            (SequencingPolicy::Provider, Some(optimizer)) => {
                let plan = optimizer
                    .optimize_with_write_back(&rest, start, fixed_end.as_ref(), token, |snapshot| {
                        route.apply_stop_order(&with_head(snapshot, head.as_ref()))
                    })
                    .await;
                if plan.cancelled {
                    info!("Optimization of route {} cancelled after {} batches", route.id, plan.batches.len());
                    return Err(RouteError::OptimizationCancelled);
                }
                route.apply_stop_order(&with_head(&plan.stops, head.as_ref()));
                plan.batches
            }
            _ => {
                if token.is_cancelled() {
                    return Err(RouteError::OptimizationCancelled);
                }
                let ordered = self.sequencer.sequence(&rest, start, fixed_end.as_ref());
                route.apply_stop_order(&with_head(&ordered, head.as_ref()));
                Vec::new()
            }
        };

        route.optimized = true;
        let metrics = estimate(route.records(), Some(start));
        info!(
            "Route {} sequenced {:?}: {} stops, {}",
            route.id, policy, stops_sequenced, metrics
        );

        Ok(PlanReport {
            policy,
            start,
            stops_sequenced,
            batches,
            metrics,
        })
    }

    /// Re-sequence the remaining stops from a stop that was just completed.
    /// Returns whether the route changed.
    pub fn resequence_after(&self, route: &mut Route, transition: &Transition) -> bool {
        if !transition.completed_stop() {
            return false;
        }
        let stops = group_stops(route.records());
        let ordered = self
            .sequencer
            .sequence(&stops, transition.coordinates, route.end.fixed_end());
        route.apply_stop_order(&ordered);
        route.optimized = true;
        info!("Re-sequenced route {} from stop {}", route.id, transition.stop_key);
        true
    }

    /// Start coordinates, plus the stop to visit first when the route starts at one
    async fn resolve_start(
        &self,
        route: &Route,
        stops: &[Stop],
        position: Option<Coordinates>,
    ) -> Result<(Coordinates, Option<Stop>), RouteError> {
        match &route.start {
            StartPreference::Coordinates(c) => Ok((*c, None)),
            StartPreference::Stop(key) => {
                let stop = find_stop(stops, key)
                    .ok_or_else(|| RouteError::InvalidInput(format!("start stop {} not in route", key)))?;
                // A settled start stop only provides the location
                let head = stop.has_remaining_work().then(|| stop.clone());
                Ok((stop.coordinates, head))
            }
            StartPreference::CurrentPosition => match position {
                Some(c) => Ok((c, None)),
                None => {
                    let c = self.geolocator.current_position().await?;
                    info!("Start position from {} geolocator", self.geolocator.name());
                    Ok((c, None))
                }
            },
        }
    }
}

fn find_stop<'a>(stops: &'a [Stop], key: &StopKey) -> Option<&'a Stop> {
    stops.iter().find(|s| &s.key == key)
}

/// Insert `head` right after the leading settled stops
fn with_head(order: &[Stop], head: Option<&Stop>) -> Vec<Stop> {
    let mut stops = order.to_vec();
    if let Some(head) = head {
        let at = stops.iter().take_while(|s| !s.has_remaining_work()).count();
        stops.insert(at, head.clone());
    }
    stops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::delivery::mark_delivered;
    use crate::services::geolocation::FixedGeolocator;
    use crate::services::routing::MockRoutingProvider;
    use crate::services::sequencer::path_length;
    use crate::services::routing::RoutingProvider;
    use crate::types::{DeliveryRecord, DeliveryStatus, EndPreference};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Returns waypoints reversed and remembers (origin, destination) per call
    #[derive(Default)]
    struct ReversingProvider {
        calls: Mutex<Vec<(Coordinates, Coordinates)>>,
    }

    #[async_trait]
    impl RoutingProvider for ReversingProvider {
        async fn optimize_waypoints(
            &self,
            origin: Coordinates,
            destination: Coordinates,
            waypoints: &[Coordinates],
        ) -> anyhow::Result<Vec<usize>> {
            self.calls.lock().push((origin, destination));
            Ok((0..waypoints.len()).rev().collect())
        }

        fn max_waypoints(&self) -> usize {
            25
        }

        fn name(&self) -> &str {
            "Reversing"
        }
    }

    fn c(lat: f64, lng: f64) -> Coordinates {
        Coordinates { lat, lng }
    }

    /// A(0,1), B(0,2), C(1,1) in that order
    fn abc_route() -> Route {
        let records = [("A", 0.0, 1.0), ("B", 0.0, 2.0), ("C", 1.0, 1.0)]
            .iter()
            .map(|(n, lat, lng)| DeliveryRecord::new(Some(n.to_string()), *n, c(*lat, *lng)).unwrap())
            .collect();
        Route::new("abc", records).unwrap()
    }

    fn names(route: &Route) -> Vec<String> {
        route.records().iter().filter_map(|r| r.stop_name.clone()).collect()
    }

    fn local_planner(position: Option<Coordinates>) -> RoutePlanner {
        RoutePlanner::new(RouteSequencer::default(), Arc::new(FixedGeolocator::new(position)))
    }

    fn provider_planner(position: Option<Coordinates>) -> RoutePlanner {
        let optimizer = ExternalOptimizer::new(
            Arc::new(MockRoutingProvider::new()),
            RouteSequencer::default(),
            OptimizerConfig {
                request_interval: Duration::ZERO,
                ..OptimizerConfig::default()
            },
        );
        local_planner(position).with_optimizer(optimizer)
    }

    #[tokio::test]
    async fn local_pass_never_lengthens_the_route() {
        let mut route = abc_route();
        let naive = path_length(c(0.0, 0.0), &group_stops(route.records()));

        let report = local_planner(Some(c(0.0, 0.0)))
            .optimize(&mut route, SequencingPolicy::Local, None, &CancellationToken::new())
            .await
            .unwrap();

        let sequenced = path_length(c(0.0, 0.0), &group_stops(route.records()));
        assert!(sequenced <= naive);
        assert!(route.optimized);
        assert_eq!(report.policy, SequencingPolicy::Local);
        assert_eq!(report.stops_sequenced, 3);
        assert_eq!(names(&route)[0], "A");
    }

    #[tokio::test]
    async fn missing_geolocation_leaves_route_untouched() {
        let mut route = abc_route();
        let before = names(&route);

        let result = local_planner(None)
            .optimize(&mut route, SequencingPolicy::Local, None, &CancellationToken::new())
            .await;

        assert_eq!(result.err(), Some(RouteError::GeolocationUnavailable));
        assert_eq!(names(&route), before);
        assert!(!route.optimized);
    }

    #[tokio::test]
    async fn explicit_position_skips_geolocator() {
        let mut route = abc_route();
        let report = local_planner(None)
            .optimize(&mut route, SequencingPolicy::Local, Some(c(1.0, 1.1)), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.start, c(1.0, 1.1));
        assert_eq!(names(&route)[0], "C");
    }

    #[tokio::test]
    async fn start_stop_is_visited_first() {
        let mut route = abc_route();
        route.start = StartPreference::Stop(StopKey::named("B").unwrap());

        local_planner(None)
            .optimize(&mut route, SequencingPolicy::Local, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(names(&route), vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn unknown_start_stop_is_invalid() {
        let mut route = abc_route();
        route.start = StartPreference::Stop(StopKey::named("nowhere").unwrap());

        let result = local_planner(None)
            .optimize(&mut route, SequencingPolicy::Local, None, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(RouteError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn fixed_end_stop_is_last() {
        let mut route = abc_route();
        route.end = EndPreference::Stop(StopKey::named("a").unwrap());

        local_planner(Some(c(0.0, 0.0)))
            .optimize(&mut route, SequencingPolicy::Local, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(names(&route).last().map(String::as_str), Some("A"));
    }

    #[tokio::test]
    async fn provider_pass_reports_batches() {
        let mut route = abc_route();
        route.start = StartPreference::Coordinates(c(0.0, 0.0));

        let report = provider_planner(None)
            .optimize(&mut route, SequencingPolicy::Provider, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.policy, SequencingPolicy::Provider);
        assert_eq!(report.batches.len(), 1);
        assert_eq!(route.records().len(), 3);
        assert!(route.optimized);
    }

    #[tokio::test]
    async fn provider_pass_honors_start_stop_and_fixed_end() {
        let records = [
            ("A", 0.0, 1.0),
            ("B", 0.0, 2.0),
            ("C", 1.0, 1.0),
            ("D", 2.0, 2.0),
            ("E", 0.0, 3.0),
        ]
        .iter()
        .map(|(n, lat, lng)| DeliveryRecord::new(Some(n.to_string()), *n, c(*lat, *lng)).unwrap())
        .collect();
        let mut route = Route::new("start-end", records).unwrap();
        let a = route.records()[0].id;
        mark_delivered(&mut route, a, false).unwrap();
        route.start = StartPreference::Stop(StopKey::named("C").unwrap());
        route.end = EndPreference::Stop(StopKey::named("B").unwrap());

        let provider = Arc::new(ReversingProvider::default());
        let optimizer = ExternalOptimizer::new(
            provider.clone(),
            RouteSequencer::default(),
            OptimizerConfig {
                request_interval: Duration::ZERO,
                ..OptimizerConfig::default()
            },
        );
        let planner = local_planner(None).with_optimizer(optimizer);

        let report = planner
            .optimize(&mut route, SequencingPolicy::Provider, None, &CancellationToken::new())
            .await
            .unwrap();

        // Settled A, then start stop C, provider order E, D, then fixed end B
        assert_eq!(names(&route), vec!["A", "C", "E", "D", "B"]);
        assert_eq!(report.policy, SequencingPolicy::Provider);
        assert_eq!(report.start, c(1.0, 1.0));
        assert_eq!(*provider.calls.lock(), vec![(c(1.0, 1.0), c(0.0, 2.0))]);
        assert!(route.optimized);
    }

    #[tokio::test]
    async fn provider_policy_without_optimizer_runs_locally() {
        let mut route = abc_route();
        let report = local_planner(Some(c(0.0, 0.0)))
            .optimize(&mut route, SequencingPolicy::Provider, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.policy, SequencingPolicy::Local);
        assert!(report.batches.is_empty());
    }

    #[tokio::test]
    async fn cancelled_pass_keeps_route_unoptimized() {
        let mut route = abc_route();
        let before = names(&route);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = provider_planner(Some(c(0.0, 0.0)))
            .optimize(&mut route, SequencingPolicy::Provider, None, &cancel)
            .await;

        assert_eq!(result.err(), Some(RouteError::OptimizationCancelled));
        assert_eq!(names(&route), before);
        assert!(!route.optimized);
    }

    #[tokio::test]
    async fn overlapping_pass_is_rejected() {
        let mut route = abc_route();
        let planner = local_planner(Some(c(0.0, 0.0)));
        let _running = planner.registry().register(route.id).unwrap();

        let result = planner
            .optimize(&mut route, SequencingPolicy::Local, None, &CancellationToken::new())
            .await;

        assert_eq!(result.err(), Some(RouteError::OptimizationInProgress(route.id)));
    }

    #[test]
    fn completed_stop_triggers_resequence_from_its_location() {
        // Start order C, A, B; finishing C at (1,1) makes A then B the shortest continuation
        let mut route = abc_route();
        let stops = group_stops(route.records());
        route.apply_stop_order(&[stops[2].clone(), stops[1].clone(), stops[0].clone()]);
        assert_eq!(names(&route), vec!["C", "B", "A"]);

        let c_id = route.records()[0].id;
        let transition = mark_delivered(&mut route, c_id, true).unwrap();
        let planner = local_planner(None);
        assert!(!route.optimized);

        assert!(planner.resequence_after(&mut route, &transition));
        assert_eq!(names(&route), vec!["C", "A", "B"]);
        assert_eq!(route.records()[0].status, DeliveryStatus::Delivered);
        assert!(route.optimized);
    }

    #[test]
    fn resequence_skips_incomplete_stops() {
        let mut route = abc_route();
        let id = route.records()[0].id;
        let mut transition = mark_delivered(&mut route, id, false).unwrap();
        transition.before = transition.after;

        assert!(!local_planner(None).resequence_after(&mut route, &transition));
    }

    #[test]
    fn with_head_goes_after_settled_prefix() {
        let mut route = abc_route();
        let a = route.records()[0].id;
        mark_delivered(&mut route, a, false).unwrap();
        let stops = group_stops(route.records());

        let composed = with_head(&[stops[0].clone(), stops[2].clone()], Some(&stops[1]));
        let labels: Vec<&str> = composed.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }
}
