/// Stops per provider request (destination + waypoints)
pub const DEFAULT_MAX_STOPS_PER_BATCH: usize = 23;

/// Minimum pause between two provider requests
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 450;

pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_TWO_OPT_MAX_ITERATIONS: usize = 2000;

/// Consecutive provider failures before the circuit opens
pub const DEFAULT_CIRCUIT_BREAKER_THRESHOLD: u32 = 3;

pub const DEFAULT_CIRCUIT_BREAKER_RECOVERY_SECS: u64 = 60;

pub const DEFAULT_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
