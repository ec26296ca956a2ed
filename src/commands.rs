//! Command dispatch for the CLI

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::Command;
use crate::config::Config;
use crate::error::RouteError;
use crate::services::aggregation::{group_stops, next_stop, search_stops};
use crate::services::delivery::{mark_delivered, mark_failed, reset_progress};
use crate::services::editor::{move_stop, swap_stops, EditOutcome};
use crate::services::geo::estimate;
use crate::services::geolocation::FixedGeolocator;
use crate::services::planner::{RoutePlanner, SequencingPolicy};
use crate::store::{import_drafts, load_route, save_route};
use crate::types::{Coordinates, Route};

pub async fn run(command: Command, route_path: &Path, config: &Config) -> Result<()> {
    match command {
        Command::Import { manifest, name } => {
            let records = import_drafts(&manifest)?;
            let name = name.unwrap_or_else(|| {
                manifest
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "route".to_string())
            });
            let route = Route::new(name, records).context("Manifest does not form a valid route")?;
            save_route(route_path, &route)?;

            let summary = route.summary();
            println!("Imported {} records into {} stops ({})", summary.records, summary.stops, route.name);
        }

        Command::Stops { search } => {
            let route = load_route(route_path)?;
            let stops = group_stops(route.records());
            let next = next_stop(&stops).map(|s| s.key.clone());
            let shown = match &search {
                Some(query) => search_stops(&stops, query),
                None => stops.iter().collect(),
            };

            for stop in shown {
                let index = stops.iter().position(|s| s.key == stop.key).unwrap_or_default();
                let marker = if Some(&stop.key) == next.as_ref() { ">" } else { " " };
                println!(
                    "{} {:>3}. [{}] {} | {} ({} records) key={}",
                    marker,
                    index,
                    stop.status.as_str(),
                    stop.label,
                    stop.address,
                    stop.len(),
                    stop.key
                );
            }
        }

        Command::Estimate { lat, lng } => {
            let route = load_route(route_path)?;
            let anchor = position(lat, lng)?;
            let metrics = estimate(route.records(), anchor);
            let summary = route.summary();

            println!("{}", metrics);
            println!(
                "{} of {} stops left, {:.0}% of records done",
                summary.stops_remaining,
                summary.stops,
                summary.completion() * 100.0
            );
        }

        Command::Optimize { local, lat, lng } => {
            let mut route = load_route(route_path)?;
            let fix = position(lat, lng)?;
            let planner = RoutePlanner::from_config(config, Arc::new(FixedGeolocator::new(fix)));
            let policy = if local {
                SequencingPolicy::Local
            } else {
                SequencingPolicy::Provider
            };

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping after the current batch");
                    ctrl_c.cancel();
                }
            });

            match planner.optimize(&mut route, policy, fix, &cancel).await {
                Ok(report) => {
                    save_route(route_path, &route)?;
                    for batch in &report.batches {
                        info!("Batch {}: {} stops, {:?}", batch.index, batch.size, batch.source);
                    }
                    println!(
                        "Sequenced {} stops ({:?}, {} batches). {}",
                        report.stops_sequenced,
                        report.policy,
                        report.batches.len(),
                        report.metrics
                    );
                }
                Err(RouteError::OptimizationCancelled) => {
                    save_route(route_path, &route)?;
                    println!("Optimization cancelled; kept the order of completed batches");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Command::Deliver {
            record,
            bulk,
            failed,
            resequence,
        } => {
            let mut route = load_route(route_path)?;
            let transition = if failed {
                mark_failed(&mut route, record, bulk)?
            } else {
                mark_delivered(&mut route, record, bulk)?
            };

            if transition.is_noop() {
                println!("Record {} was already settled", record);
                return Ok(());
            }

            println!(
                "Updated {} records at {} ({} -> {})",
                transition.updated.len(),
                transition.stop_key,
                transition.before.as_str(),
                transition.after.as_str()
            );

            if transition.completed_stop() && resequence {
                let planner = RoutePlanner::from_config(config, Arc::new(FixedGeolocator::unavailable()));
                if planner.resequence_after(&mut route, &transition) {
                    println!("Remaining stops re-sequenced from {}", transition.stop_key);
                }
            }
            save_route(route_path, &route)?;
        }

        Command::Move { stop, from, to } => {
            let mut route = load_route(route_path)?;
            apply_edit(move_stop(&mut route, &stop, from, to))?;
            save_route(route_path, &route)?;
            println!("Moved {} to position {}", stop, to);
        }

        Command::Swap { a, b } => {
            let mut route = load_route(route_path)?;
            apply_edit(swap_stops(&mut route, &a, &b))?;
            save_route(route_path, &route)?;
            println!("Swapped {} and {}", a, b);
        }

        Command::Reset => {
            let mut route = load_route(route_path)?;
            let reset = reset_progress(&mut route);
            save_route(route_path, &route)?;
            println!("Reset {} records to pending", reset);
        }
    }

    Ok(())
}

fn position(lat: Option<f64>, lng: Option<f64>) -> Result<Option<Coordinates>> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Some(Coordinates::new(lat, lng)?)),
        _ => Ok(None),
    }
}

fn apply_edit(outcome: EditOutcome) -> Result<()> {
    match outcome {
        EditOutcome::Applied => Ok(()),
        EditOutcome::Rejected(reason) => anyhow::bail!("Edit rejected: {}", reason),
    }
}
