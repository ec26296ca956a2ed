//! Delivery state transitions
//!
//! Records move one way, Pending to Delivered or Failed. Bulk transitions
//! update every pending sibling at the same stop in one pass.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::RouteError;
use crate::services::aggregation::group_stops;
use crate::types::{Coordinates, DeliveryStatus, RecordId, Route, StopKey, StopStatus};

/// What a transition did to a record's stop
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub stop_key: StopKey,
    /// Records whose status actually changed
    pub updated: Vec<RecordId>,
    pub before: StopStatus,
    pub after: StopStatus,
    pub coordinates: Coordinates,
}

impl Transition {
    /// The stop had work before and has none now; time to re-sequence
    pub fn completed_stop(&self) -> bool {
        self.before.has_remaining_work() && !self.after.has_remaining_work()
    }

    pub fn is_noop(&self) -> bool {
        self.updated.is_empty()
    }
}

pub fn mark_delivered(route: &mut Route, record_id: RecordId, bulk: bool) -> Result<Transition, RouteError> {
    apply(route, record_id, bulk, DeliveryStatus::Delivered)
}

pub fn mark_failed(route: &mut Route, record_id: RecordId, bulk: bool) -> Result<Transition, RouteError> {
    apply(route, record_id, bulk, DeliveryStatus::Failed)
}

/// Put every record back to Pending. Returns how many records changed.
pub fn reset_progress(route: &mut Route) -> usize {
    let mut reset = 0;
    for record in route.records_mut().iter_mut().filter(|r| !r.is_pending()) {
        record.status = DeliveryStatus::Pending;
        reset += 1;
    }
    info!("Reset {} records on route {}", reset, route.id);
    reset
}

fn apply(
    route: &mut Route,
    record_id: RecordId,
    bulk: bool,
    target: DeliveryStatus,
) -> Result<Transition, RouteError> {
    let record = route.record(record_id).ok_or(RouteError::RecordNotFound(record_id))?;
    let stop_key = record.stop_key();
    let record_pending = record.is_pending();

    let stop = group_stops(route.records())
        .into_iter()
        .find(|s| s.key == stop_key)
        .ok_or(RouteError::RecordNotFound(record_id))?;
    let before = stop.status;
    let coordinates = stop.coordinates;

    let updated: Vec<RecordId> = if bulk {
        stop.members
            .iter()
            .copied()
            .filter(|id| route.record(*id).map_or(false, |r| r.is_pending()))
            .collect()
    } else if record_pending {
        vec![record_id]
    } else {
        Vec::new()
    };

    if updated.is_empty() {
        debug!("Record {} already settled, nothing to mark {}", record_id, target.as_str());
    } else {
        let ids: HashSet<RecordId> = updated.iter().copied().collect();
        route.set_status(&ids, target);
        debug!("Marked {} records {} at stop {}", updated.len(), target.as_str(), stop_key);
    }

    let after = group_stops(route.records())
        .into_iter()
        .find(|s| s.key == stop_key)
        .map_or(before, |s| s.status);

    Ok(Transition {
        stop_key,
        updated,
        before,
        after,
        coordinates,
    })
}
