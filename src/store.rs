//! JSON files in and out
//!
//! Routes are stored as one JSON document each. Manifests are JSON arrays of
//! record drafts, validated on import.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::types::{DeliveryRecord, RecordDraft, Route};

pub fn load_route(path: &Path) -> Result<Route> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read route {}", path.display()))?;
    let route: Route =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse route {}", path.display()))?;
    route
        .validate()
        .with_context(|| format!("Route {} is inconsistent", path.display()))?;
    debug!("Loaded route {} ({} records)", route.id, route.records().len());
    Ok(route)
}

/// Write the route next to its destination, then rename over it
pub fn save_route(path: &Path, route: &Route) -> Result<()> {
    let json = serde_json::to_string_pretty(route).context("Failed to serialize route")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    debug!("Saved route {} to {}", route.id, path.display());
    Ok(())
}

/// Read a manifest of record drafts. Any invalid row fails the whole import.
pub fn import_drafts(path: &Path) -> Result<Vec<DeliveryRecord>> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;
    let drafts: Vec<RecordDraft> =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse manifest {}", path.display()))?;

    let records = drafts
        .into_iter()
        .enumerate()
        .map(|(row, draft)| DeliveryRecord::try_from(draft).with_context(|| format!("Invalid manifest row {}", row + 1)))
        .collect::<Result<Vec<_>>>()?;

    info!("Imported {} records from {}", records.len(), path.display());
    Ok(records)
}
