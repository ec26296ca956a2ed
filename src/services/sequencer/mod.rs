//! Local route sequencer
//!
//! Nearest-neighbor construction followed by bounded 2-opt refinement over
//! the stops that still have work. Settled stops keep their relative order
//! ahead of the sequenced block.

mod config;
pub mod two_opt;

pub use config::SequencerConfig;

use tracing::debug;

use crate::services::geo::planar_distance;
use crate::types::{Coordinates, Stop, StopKey};

/// Result of a sequencing pass with the numbers behind it
#[derive(Debug, Clone)]
pub struct SequenceOutcome {
    /// Settled stops first, then the sequenced stops
    pub stops: Vec<Stop>,
    /// Length of the sequenced block after construction alone
    pub construction_length: f64,
    /// Length of the sequenced block after 2-opt
    pub refined_length: f64,
    pub passes: usize,
}

/// Local TSP heuristic over stops
#[derive(Debug, Clone, Default)]
pub struct RouteSequencer {
    config: SequencerConfig,
}

impl RouteSequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Order stops for visiting from `start`, optionally ending at `fixed_end`.
    pub fn sequence(&self, stops: &[Stop], start: Coordinates, fixed_end: Option<&StopKey>) -> Vec<Stop> {
        self.sequence_detailed(stops, start, fixed_end).stops
    }

    pub fn sequence_detailed(
        &self,
        stops: &[Stop],
        start: Coordinates,
        fixed_end: Option<&StopKey>,
    ) -> SequenceOutcome {
        let (settled, actionable): (Vec<&Stop>, Vec<&Stop>) =
            stops.iter().partition(|s| !s.has_remaining_work());

        let points: Vec<Coordinates> = actionable.iter().map(|s| s.coordinates).collect();
        let end_idx = fixed_end.and_then(|key| actionable.iter().position(|s| &s.key == key));

        let constructed = nearest_neighbor(start, &points, end_idx);
        let construction_length = two_opt::order_length(start, &points, &constructed);

        let refined = two_opt::refine(
            start,
            &points,
            constructed,
            end_idx.is_some(),
            self.config.max_iterations,
        );
        let refined_length = two_opt::order_length(start, &points, &refined.order);

        debug!(
            "Sequenced {} stops ({} settled): construction {:.5}, 2-opt {:.5} after {} passes",
            actionable.len(),
            settled.len(),
            construction_length,
            refined_length,
            refined.passes
        );

        let ordered = settled
            .into_iter()
            .cloned()
            .chain(refined.order.iter().map(|&i| actionable[i].clone()))
            .collect();

        SequenceOutcome {
            stops: ordered,
            construction_length,
            refined_length,
            passes: refined.passes,
        }
    }

    /// Nearest-neighbor construction over every given stop, regardless of status.
    ///
    /// This is the batch fallback of the external optimizer.
    pub fn construct(&self, stops: &[Stop], start: Coordinates, fixed_end: Option<&StopKey>) -> Vec<Stop> {
        let points: Vec<Coordinates> = stops.iter().map(|s| s.coordinates).collect();
        let end_idx = fixed_end.and_then(|key| stops.iter().position(|s| &s.key == key));
        nearest_neighbor(start, &points, end_idx)
            .into_iter()
            .map(|i| stops[i].clone())
            .collect()
    }
}

/// Open-path length from `start` through the stops in order
pub fn path_length(start: Coordinates, stops: &[Stop]) -> f64 {
    let mut current = start;
    let mut total = 0.0;
    for stop in stops {
        total += planar_distance(&current, &stop.coordinates);
        current = stop.coordinates;
    }
    total
}

/// Nearest neighbor heuristic.
/// Returns point indices in visit order; `fixed_end` is excluded from
/// candidates and appended last. Ties go to the lower index.
fn nearest_neighbor(start: Coordinates, points: &[Coordinates], fixed_end: Option<usize>) -> Vec<usize> {
    let n = points.len();
    let mut visited = vec![false; n];
    let mut route = Vec::with_capacity(n);

    if let Some(end) = fixed_end {
        visited[end] = true;
    }

    let mut current = start;
    loop {
        let mut best_next = None;
        let mut best_distance = f64::INFINITY;

        for (j, point) in points.iter().enumerate() {
            if !visited[j] {
                let dist = planar_distance(&current, point);
                if dist < best_distance {
                    best_distance = dist;
                    best_next = Some(j);
                }
            }
        }

        match best_next {
            Some(next) => {
                visited[next] = true;
                route.push(next);
                current = points[next];
            }
            None => break,
        }
    }

    if let Some(end) = fixed_end {
        route.push(end);
    }

    route
}
