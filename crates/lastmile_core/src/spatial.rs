//! Geographic primitives: coordinates, Haversine distance, and H3 zone bucketing.
//!
//! Couriers and orders carry precise `(lat, lng)` coordinates; H3 cells are used
//! only as coarse *zones* when a policy needs to bucket supply and demand
//! (prepositioning) or enumerate neighbouring areas (movement evaluation).

use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Serialize};

/// Zone resolution used for supply/demand bucketing (~460m hexagons).
pub const ZONE_RESOLUTION: Resolution = Resolution::Eight;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Haversine great-circle distance in kilometres.
pub fn haversine_km(a: Location, b: Location) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// The H3 zone containing a location, or `None` for out-of-range coordinates.
pub fn zone_for(location: Location) -> Option<CellIndex> {
    LatLng::new(location.lat, location.lng)
        .ok()
        .map(|point| point.to_cell(ZONE_RESOLUTION))
}

/// Centre coordinates of a zone.
pub fn zone_center(zone: CellIndex) -> Location {
    let point: LatLng = zone.into();
    Location::new(point.lat(), point.lng())
}

/// Zones within `k` grid distance of the given zone (including itself).
pub fn neighbor_zones(zone: CellIndex, k: u32) -> Vec<CellIndex> {
    zone.grid_disk::<Vec<_>>(k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_identical_points() {
        let p = Location::new(52.52, 13.4);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn haversine_one_degree_longitude_at_equator() {
        let a = Location::new(0.0, 0.0);
        let b = Location::new(0.0, 1.0);
        let d = haversine_km(a, b);
        // One degree of longitude at the equator is ~111.19 km.
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn zone_roundtrip_stays_close() {
        let p = Location::new(52.52, 13.4);
        let zone = zone_for(p).expect("valid coordinates");
        let center = zone_center(zone);
        assert!(haversine_km(p, center) < 1.0);
    }

    #[test]
    fn neighbor_zones_include_origin() {
        let zone = zone_for(Location::new(52.52, 13.4)).expect("valid coordinates");
        let neighbors = neighbor_zones(zone, 1);
        assert!(neighbors.contains(&zone));
        assert!(neighbors.len() > 1);
    }
}
