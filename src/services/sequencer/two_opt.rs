//! 2-opt refinement of an open path with a fixed start
//!
//! ```text
//! BEFORE:
//!    ... (a) --x--> [b] -> ... -> [c] --x--> (e) ...
//!
//! AFTER (path[i..=j] reversed):
//!    ... (a) -----> [c] -> ... -> [b] -----> (e) ...
//! ```
//!
//! On an open path the last node has no outgoing edge, so reversing a suffix
//! only swaps the edge into the segment.

use crate::services::geo::planar_distance;
use crate::types::Coordinates;

/// Moves must beat the current length by more than this
const IMPROVEMENT_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct TwoOptOutcome {
    /// Indices into the point list, start excluded
    pub order: Vec<usize>,
    pub passes: usize,
    pub improvements: usize,
}

/// Node at path position `pos` (0 is the start)
fn node(start: Coordinates, points: &[Coordinates], order: &[usize], pos: usize) -> Coordinates {
    if pos == 0 {
        start
    } else {
        points[order[pos - 1]]
    }
}

/// Open-path length from `start` through `order`
pub fn order_length(start: Coordinates, points: &[Coordinates], order: &[usize]) -> f64 {
    let mut current = start;
    let mut total = 0.0;
    for &idx in order {
        total += planar_distance(&current, &points[idx]);
        current = points[idx];
    }
    total
}

/// Improve `order` with first-improvement 2-opt.
///
/// With `pin_last` the final node never moves. Stops after a pass without
/// improvement or after `max_passes` passes.
pub fn refine(
    start: Coordinates,
    points: &[Coordinates],
    mut order: Vec<usize>,
    pin_last: bool,
    max_passes: usize,
) -> TwoOptOutcome {
    // Path positions: 0 = start, 1..=order.len() = stops
    let n = order.len() + 1;
    let last_movable = if pin_last { n.saturating_sub(2) } else { n - 1 };

    let mut passes = 0;
    let mut improvements = 0;

    if last_movable < 2 {
        return TwoOptOutcome {
            order,
            passes,
            improvements,
        };
    }

    loop {
        let mut improved = false;
        passes += 1;

        for i in 1..last_movable {
            for j in (i + 1)..=last_movable {
                let a = node(start, points, &order, i - 1);
                let b = node(start, points, &order, i);
                let c = node(start, points, &order, j);

                let mut before = planar_distance(&a, &b);
                let mut after = planar_distance(&a, &c);
                if j + 1 < n {
                    let e = node(start, points, &order, j + 1);
                    before += planar_distance(&c, &e);
                    after += planar_distance(&b, &e);
                }

                if after < before - IMPROVEMENT_EPSILON {
                    order[i - 1..j].reverse();
                    improved = true;
                    improvements += 1;
                }
            }
        }

        if !improved || passes >= max_passes {
            break;
        }
    }

    TwoOptOutcome {
        order,
        passes,
        improvements,
    }
}
