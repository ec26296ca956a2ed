//! Route types

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Coordinates, DeliveryRecord, DeliveryStatus, RecordId, Stop, StopKey};
use crate::error::RouteError;

/// Where the next sequencing pass starts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StartPreference {
    /// Ask the geolocation provider for a fix
    #[default]
    CurrentPosition,
    Coordinates(Coordinates),
    /// Visit this stop first and sequence the rest from it
    Stop(StopKey),
}

/// Where the next sequencing pass must end
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EndPreference {
    #[default]
    Any,
    Stop(StopKey),
}

impl EndPreference {
    pub fn fixed_end(&self) -> Option<&StopKey> {
        match self {
            EndPreference::Any => None,
            EndPreference::Stop(key) => Some(key),
        }
    }
}

/// A driver's route: records in visiting order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    records: Vec<DeliveryRecord>,
    /// True once any sequencing pass has been applied
    pub optimized: bool,
    #[serde(default)]
    pub start: StartPreference,
    #[serde(default)]
    pub end: EndPreference,
}

impl Route {
    /// Create a route. The record set is fixed from here on.
    pub fn new(name: impl Into<String>, records: Vec<DeliveryRecord>) -> Result<Self, RouteError> {
        let route = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            records,
            optimized: false,
            start: StartPreference::default(),
            end: EndPreference::default(),
        };
        route.validate()?;
        Ok(route)
    }

    /// Check the record set: non-empty, unique ids, valid coordinates.
    ///
    /// Routes loaded from storage go through this before reaching the core.
    pub fn validate(&self) -> Result<(), RouteError> {
        if self.records.is_empty() {
            return Err(RouteError::InvalidInput("route has no records".to_string()));
        }

        let mut seen = HashSet::with_capacity(self.records.len());
        for record in &self.records {
            record.coordinates.validate()?;
            if !seen.insert(record.id) {
                return Err(RouteError::InvalidInput(format!(
                    "duplicate record id {}",
                    record.id
                )));
            }
        }
        Ok(())
    }

    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    pub fn record(&self, id: RecordId) -> Option<&DeliveryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Set status on every listed record in one pass.
    pub(crate) fn set_status(&mut self, ids: &HashSet<RecordId>, status: DeliveryStatus) {
        for record in self.records.iter_mut().filter(|r| ids.contains(&r.id)) {
            record.status = status;
        }
    }

    pub(crate) fn records_mut(&mut self) -> &mut [DeliveryRecord] {
        &mut self.records
    }

    /// Rewrite record order from an ordered stop list.
    ///
    /// Each stop's members are concatenated in their existing relative order.
    /// Records not covered by any stop keep their relative order at the tail.
    pub fn apply_stop_order(&mut self, stops: &[Stop]) {
        let mut by_id: HashMap<RecordId, DeliveryRecord> =
            self.records.iter().map(|r| (r.id, r.clone())).collect();

        let mut reordered = Vec::with_capacity(self.records.len());
        for stop in stops {
            for id in &stop.members {
                if let Some(record) = by_id.remove(id) {
                    reordered.push(record);
                }
            }
        }

        if reordered.len() < self.records.len() {
            tracing::warn!(
                "Stop order covered {} of {} records, keeping the rest at the end",
                reordered.len(),
                self.records.len()
            );
            for record in &self.records {
                if let Some(record) = by_id.remove(&record.id) {
                    reordered.push(record);
                }
            }
        }

        self.records = reordered;
    }

    pub fn summary(&self) -> RouteSummary {
        let stops = crate::services::aggregation::group_stops(&self.records);
        let mut summary = RouteSummary {
            stops: stops.len(),
            stops_remaining: stops.iter().filter(|s| s.has_remaining_work()).count(),
            records: self.records.len(),
            ..Default::default()
        };
        for record in &self.records {
            match record.status {
                DeliveryStatus::Pending => summary.pending += 1,
                DeliveryStatus::Delivered => summary.delivered += 1,
                DeliveryStatus::Failed => summary.failed += 1,
            }
        }
        summary
    }
}

/// Progress overview for a route
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSummary {
    pub stops: usize,
    pub stops_remaining: usize,
    pub records: usize,
    pub pending: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl RouteSummary {
    /// Share of records no longer pending (0.0 - 1.0)
    pub fn completion(&self) -> f64 {
        if self.records == 0 {
            return 1.0;
        }
        (self.delivered + self.failed) as f64 / self.records as f64
    }
}
