//! Geographic point type

use serde::{Deserialize, Serialize};

use crate::error::RouteError;

/// WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Build a validated position.
    ///
    /// Rejects non-finite values and anything outside the WGS84 ranges.
    pub fn new(lat: f64, lng: f64) -> Result<Self, RouteError> {
        let coordinates = Self { lat, lng };
        coordinates.validate()?;
        Ok(coordinates)
    }

    pub fn validate(&self) -> Result<(), RouteError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(RouteError::InvalidInput(format!(
                "non-finite coordinates ({}, {})",
                self.lat, self.lng
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(RouteError::InvalidInput(format!(
                "latitude {} out of range",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(RouteError::InvalidInput(format!(
                "longitude {} out of range",
                self.lng
            )));
        }
        Ok(())
    }

    /// `"lat,lng"` as most directions APIs expect it
    pub fn to_query_param(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_position() {
        let c = Coordinates::new(-23.565737, -46.651336).unwrap();
        assert_eq!(c.lat, -23.565737);
        assert_eq!(c.lng, -46.651336);
    }

    #[test]
    fn rejects_non_finite() {
        assert!(matches!(
            Coordinates::new(f64::NAN, 0.0),
            Err(RouteError::InvalidInput(_))
        ));
        assert!(matches!(
            Coordinates::new(0.0, f64::INFINITY),
            Err(RouteError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(Coordinates::new(90.5, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.1).is_err());
    }

    #[test]
    fn query_param_is_lat_first() {
        let c = Coordinates { lat: 1.5, lng: -2.25 };
        assert_eq!(c.to_query_param(), "1.5,-2.25");
    }
}
