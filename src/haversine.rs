//! Haversine distance provider (fallback when the routing service is unavailable).
//!
//! Uses great-circle distance to estimate travel distance and time.
//! Less accurate than road routing but always available.

use crate::error::ProviderError;
use crate::model::GeoPoint;
use crate::traits::{DistanceProvider, TravelCost};

/// Average driving speed assumption for time estimation.
pub const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine-based distance provider.
///
/// Estimates road distance as straight-line distance times a road
/// coefficient, and travel time from an assumed average speed.
#[derive(Debug, Clone)]
pub struct HaversineProvider {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
    /// Straight-line to road distance multiplier.
    pub road_coefficient: f64,
}

impl Default for HaversineProvider {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
            road_coefficient: 1.0,
        }
    }
}

impl HaversineProvider {
    pub fn new(speed_kmh: f64, road_coefficient: f64) -> Self {
        Self {
            speed_kmh,
            road_coefficient,
        }
    }

    /// Great-circle distance between two points in kilometers.
    pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
        let lat1_rad = from.lat.to_radians();
        let lat2_rad = to.lat.to_radians();
        let delta_lat = (to.lat - from.lat).to_radians();
        let delta_lng = (to.lng - from.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    /// Estimated travel cost between two points.
    pub fn estimate(&self, from: GeoPoint, to: GeoPoint) -> TravelCost {
        let km = Self::haversine_km(from, to) * self.road_coefficient;
        TravelCost::new(km, self.km_to_minutes(km))
    }

    fn km_to_minutes(&self, km: f64) -> f64 {
        km / self.speed_kmh * 60.0
    }
}

impl DistanceProvider for HaversineProvider {
    fn name(&self) -> &str {
        "haversine"
    }

    fn table(
        &self,
        sources: &[GeoPoint],
        destinations: &[GeoPoint],
    ) -> Result<Vec<Vec<Option<TravelCost>>>, ProviderError> {
        Ok(sources
            .iter()
            .map(|from| {
                destinations
                    .iter()
                    .map(|to| Some(self.estimate(*from, *to)))
                    .collect()
            })
            .collect())
    }
}
