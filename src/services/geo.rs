//! Geographic calculations and remaining-route estimates

use std::fmt;

use serde::Serialize;

use crate::types::{Coordinates, DeliveryRecord};

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Road distance coefficient (straight line to road)
pub const ROAD_COEFFICIENT: f64 = 1.4;

/// Average urban delivery speed in km/h
pub const AVERAGE_SPEED_KMH: f64 = 20.0;

/// Handover time per pending parcel, in minutes
pub const SERVICE_MINUTES_PER_RECORD: f64 = 1.5;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Estimate road distance from straight-line distance
pub fn road_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    haversine_distance(from, to) * ROAD_COEFFICIENT
}

/// Straight-line distance in the lat/lng plane (degrees).
///
/// Cheap ranking metric for the sequencer; not a physical distance.
pub fn planar_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    (to.lat - from.lat).hypot(to.lng - from.lng)
}

/// Distance/time estimate for the pending part of a route
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMetrics {
    pub distance_km: f64,
    pub eta_minutes: f64,
    pub remaining_count: usize,
}

impl RouteMetrics {
    pub const fn finished() -> Self {
        Self {
            distance_km: 0.0,
            eta_minutes: 0.0,
            remaining_count: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_count == 0
    }

    /// `"2h 05m"`-style label, or `"Finished"` when nothing is pending
    pub fn eta_label(&self) -> String {
        if self.is_finished() {
            return "Finished".to_string();
        }
        let total = self.eta_minutes.floor() as u64;
        format!("{}h {:02}m", total / 60, total % 60)
    }
}

impl fmt::Display for RouteMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} km, {} ({} remaining)",
            self.distance_km,
            self.eta_label(),
            self.remaining_count
        )
    }
}

/// Estimate distance and time for the pending records, walked in list order.
///
/// Starts at `anchor` when given, else at the first pending record. For UI
/// display only; the sequencer never uses it.
pub fn estimate(records: &[DeliveryRecord], anchor: Option<Coordinates>) -> RouteMetrics {
    let mut pending = records.iter().filter(|r| r.is_pending()).peekable();

    let mut current = match (anchor, pending.peek()) {
        (_, None) => return RouteMetrics::finished(),
        (Some(anchor), Some(_)) => anchor,
        (None, Some(first)) => first.coordinates,
    };

    let mut straight_km = 0.0;
    let mut remaining_count = 0;
    for record in pending {
        straight_km += haversine_distance(&current, &record.coordinates);
        current = record.coordinates;
        remaining_count += 1;
    }

    let distance_km = straight_km * ROAD_COEFFICIENT;
    let eta_minutes = distance_km / AVERAGE_SPEED_KMH * 60.0
        + remaining_count as f64 * SERVICE_MINUTES_PER_RECORD;

    RouteMetrics {
        distance_km,
        eta_minutes,
        remaining_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeliveryStatus;

    fn record(lat: f64, lng: f64, status: DeliveryStatus) -> DeliveryRecord {
        let mut r = DeliveryRecord::new(None, "x", Coordinates { lat, lng }).unwrap();
        r.status = status;
        r
    }

    #[test]
    fn test_haversine_prague_brno() {
        let prague = Coordinates { lat: 50.0755, lng: 14.4378 };
        let brno = Coordinates { lat: 49.1951, lng: 16.6068 };

        let distance = haversine_distance(&prague, &brno);

        // Prague to Brno is approximately 185 km
        assert!((distance - 185.0).abs() < 5.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinates { lat: -23.55, lng: -46.63 };
        let distance = haversine_distance(&point, &point);
        assert!((distance - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_road_distance() {
        let a = Coordinates { lat: -23.565737, lng: -46.651336 };
        let b = Coordinates { lat: -23.587416, lng: -46.657634 };

        let distance = road_distance(&a, &b);
        let straight = haversine_distance(&a, &b);

        assert!((distance / straight - ROAD_COEFFICIENT).abs() < 0.01);
    }

    #[test]
    fn test_planar_distance() {
        let a = Coordinates { lat: 0.0, lng: 0.0 };
        let b = Coordinates { lat: 3.0, lng: 4.0 };
        assert!((planar_distance(&a, &b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn estimate_without_pending_is_finished() {
        let records = vec![
            record(0.0, 0.0, DeliveryStatus::Delivered),
            record(0.0, 1.0, DeliveryStatus::Failed),
        ];
        let metrics = estimate(&records, Some(Coordinates { lat: 5.0, lng: 5.0 }));
        assert_eq!(metrics, RouteMetrics::finished());
        assert_eq!(metrics.eta_label(), "Finished");
        assert_eq!(estimate(&[], None), RouteMetrics::finished());
    }

    #[test]
    fn estimate_walks_pending_in_list_order() {
        let records = vec![
            record(0.0, 0.0, DeliveryStatus::Pending),
            record(0.0, 5.0, DeliveryStatus::Delivered),
            record(0.0, 0.1, DeliveryStatus::Pending),
        ];
        let metrics = estimate(&records, None);

        let leg = haversine_distance(
            &Coordinates { lat: 0.0, lng: 0.0 },
            &Coordinates { lat: 0.0, lng: 0.1 },
        );
        assert_eq!(metrics.remaining_count, 2);
        assert!((metrics.distance_km - leg * ROAD_COEFFICIENT).abs() < 1e-9);

        let expected_minutes =
            metrics.distance_km / AVERAGE_SPEED_KMH * 60.0 + 2.0 * SERVICE_MINUTES_PER_RECORD;
        assert!((metrics.eta_minutes - expected_minutes).abs() < 1e-9);
    }

    #[test]
    fn estimate_starts_from_anchor() {
        let records = vec![record(0.0, 0.1, DeliveryStatus::Pending)];
        let without = estimate(&records, None);
        let with = estimate(&records, Some(Coordinates { lat: 0.0, lng: 0.0 }));

        assert_eq!(without.distance_km, 0.0);
        assert!(with.distance_km > 10.0, "~11 km leg expected, got {}", with.distance_km);
    }

    #[test]
    fn eta_label_formats_hours_and_minutes() {
        let metrics = RouteMetrics {
            distance_km: 10.0,
            eta_minutes: 125.7,
            remaining_count: 3,
        };
        assert_eq!(metrics.eta_label(), "2h 05m");
        assert_eq!(metrics.to_string(), "10.0 km, 2h 05m (3 remaining)");
    }
}
