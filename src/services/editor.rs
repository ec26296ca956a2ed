//! Manual reordering of stops
//!
//! Edits work on the derived stop list and are written back through
//! `Route::apply_stop_order`, so a stop's records always stay together.

use thiserror::Error;
use tracing::debug;

use crate::services::aggregation::group_stops;
use crate::types::{Route, StopKey};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditRejection {
    #[error("index {index} out of range for {len} stops")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("stop {expected} is not at the given position (found {found})")]
    StopMismatch { expected: StopKey, found: StopKey },

    #[error("unknown stop {0}")]
    UnknownStop(StopKey),

    #[error("cannot swap a stop with itself")]
    SameStop,
}

#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum EditOutcome {
    Applied,
    /// Route left untouched
    Rejected(EditRejection),
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied)
    }
}

/// Move the stop at `from` to position `to`. `stop_key` must match the stop at `from`.
pub fn move_stop(route: &mut Route, stop_key: &StopKey, from: usize, to: usize) -> EditOutcome {
    let mut stops = group_stops(route.records());
    let len = stops.len();

    for index in [from, to] {
        if index >= len {
            return EditOutcome::Rejected(EditRejection::IndexOutOfRange { index, len });
        }
    }
    if &stops[from].key != stop_key {
        return EditOutcome::Rejected(EditRejection::StopMismatch {
            expected: stop_key.clone(),
            found: stops[from].key.clone(),
        });
    }

    let stop = stops.remove(from);
    stops.insert(to, stop);
    route.apply_stop_order(&stops);

    debug!("Moved stop {} from {} to {}", stop_key, from, to);
    EditOutcome::Applied
}

/// Exchange the positions of two stops
pub fn swap_stops(route: &mut Route, a: &StopKey, b: &StopKey) -> EditOutcome {
    if a == b {
        return EditOutcome::Rejected(EditRejection::SameStop);
    }

    let mut stops = group_stops(route.records());
    let position = |key: &StopKey| stops.iter().position(|s| &s.key == key);

    let Some(i) = position(a) else {
        return EditOutcome::Rejected(EditRejection::UnknownStop(a.clone()));
    };
    let Some(j) = position(b) else {
        return EditOutcome::Rejected(EditRejection::UnknownStop(b.clone()));
    };

    stops.swap(i, j);
    route.apply_stop_order(&stops);

    debug!("Swapped stops {} and {}", a, b);
    EditOutcome::Applied
}
