//! Start position lookup

use async_trait::async_trait;

use crate::error::RouteError;
use crate::types::Coordinates;

/// Source of the driver's current position
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, RouteError>;

    fn name(&self) -> &str;
}

/// Geolocator for callers that already hold a fix, or know they have none
#[derive(Debug, Clone, Default)]
pub struct FixedGeolocator {
    position: Option<Coordinates>,
}

impl FixedGeolocator {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }

    pub fn at(position: Coordinates) -> Self {
        Self::new(Some(position))
    }

    pub fn unavailable() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Coordinates, RouteError> {
        self.position.ok_or(RouteError::GeolocationUnavailable)
    }

    fn name(&self) -> &str {
        "Fixed"
    }
}
