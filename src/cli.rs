//! CLI argument parsing for the delivery-sequencer binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::{RecordId, StopKey};

#[derive(Parser)]
#[command(name = "delivery-sequencer", about = "Stop sequencing and delivery tracking for a driver's route")]
pub struct Cli {
    /// Route file to read and update
    #[arg(long, short, global = true, default_value = "route.json")]
    pub route: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the route file from a JSON manifest of records
    Import {
        manifest: PathBuf,
        /// Route name (defaults to the manifest file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// List stops in visiting order
    Stops {
        /// Only stops whose label or address contains this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Remaining distance and time
    Estimate {
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
    },
    /// Sequence the remaining stops
    Optimize {
        /// Skip the routing provider
        #[arg(long)]
        local: bool,
        /// Current position (otherwise the route's start preference applies)
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
    },
    /// Mark a record delivered (or failed)
    Deliver {
        #[arg(long)]
        record: RecordId,
        /// Apply to every pending record at the same stop
        #[arg(long)]
        bulk: bool,
        #[arg(long)]
        failed: bool,
        /// Re-sequence from this stop when it is done
        #[arg(long)]
        resequence: bool,
    },
    /// Move a stop to another position
    Move {
        #[arg(long)]
        stop: StopKey,
        #[arg(long)]
        from: usize,
        #[arg(long)]
        to: usize,
    },
    /// Swap two stops
    Swap { a: StopKey, b: StopKey },
    /// Put every record back to pending
    Reset,
}
