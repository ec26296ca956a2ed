//! Stop aggregation: records sharing a stop key become one stop

use std::collections::HashMap;

use crate::types::{DeliveryRecord, Stop, StopKey, StopProgress, StopStatus};

/// Group records into stops, preserving first-appearance order.
///
/// Pure function of the record list; re-run it after every mutation.
pub fn group_stops(records: &[DeliveryRecord]) -> Vec<Stop> {
    let mut index_by_key: HashMap<StopKey, usize> = HashMap::new();
    let mut stops: Vec<Stop> = Vec::new();

    for record in records {
        let key = record.stop_key();
        let idx = match index_by_key.get(&key) {
            Some(&idx) => idx,
            None => {
                let label = record
                    .stop_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(record.address.as_str())
                    .to_string();
                stops.push(Stop {
                    key: key.clone(),
                    label,
                    address: record.address.clone(),
                    coordinates: record.coordinates,
                    members: Vec::new(),
                    progress: StopProgress::default(),
                    status: StopStatus::Pending,
                });
                index_by_key.insert(key, stops.len() - 1);
                stops.len() - 1
            }
        };

        let stop = &mut stops[idx];
        stop.members.push(record.id);
        stop.progress.record(record.status);
    }

    for stop in &mut stops {
        stop.status = stop.progress.status();
    }

    stops
}

/// Concatenate each stop's member records in order.
///
/// Members missing from `records` are skipped.
pub fn flatten_stops(stops: &[Stop], records: &[DeliveryRecord]) -> Vec<DeliveryRecord> {
    let by_id: HashMap<_, _> = records.iter().map(|r| (r.id, r)).collect();
    stops
        .iter()
        .flat_map(|stop| stop.members.iter())
        .filter_map(|id| by_id.get(id).map(|r| (*r).clone()))
        .collect()
}

/// First stop that still has pending records
pub fn next_stop(stops: &[Stop]) -> Option<&Stop> {
    stops.iter().find(|s| s.has_remaining_work())
}

/// Case-insensitive match on stop label or address
pub fn search_stops<'a>(stops: &'a [Stop], query: &str) -> Vec<&'a Stop> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return stops.iter().collect();
    }
    stops
        .iter()
        .filter(|s| {
            s.label.to_lowercase().contains(&needle) || s.address.to_lowercase().contains(&needle)
        })
        .collect()
}
