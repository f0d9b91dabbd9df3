//! Pluggable routing clients: trait abstraction over route geometry sources.
//!
//! Two implementations, selectable at scenario build:
//!
//! - **`HaversineRoutingClient`**: straight-line two-point routes, zero
//!   external dependencies. The default.
//! - **`OsrmRoutingClient`** (feature `osrm`): queries an OSRM HTTP endpoint
//!   for the street polyline.
//!
//! Every client falls back to the direct `[origin, destination]` polyline on
//! failure, so movement and matching never observe a routing error. The
//! client is stored as a boxed ECS resource, optionally wrapped in an LRU
//! cache.

use bevy_ecs::prelude::Resource;
use thiserror::Error;
use tracing::warn;

use crate::ecs::Vehicle;
use crate::spatial::{haversine_km, Location};

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing transport failure: {0}")]
    Transport(String),
    #[error("malformed routing response")]
    Malformed,
}

/// An ordered polyline from origin to destination (both endpoints included).
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePolyline {
    pub points: Vec<Location>,
}

impl RoutePolyline {
    pub fn direct(origin: Location, destination: Location) -> Self {
        Self {
            points: vec![origin, destination],
        }
    }
}

/// Trait for routing backends. Implementations must be `Send + Sync` so the
/// client can be stored as a shared ECS resource.
pub trait RoutingClient: Send + Sync {
    /// Compute the street polyline between two points.
    fn try_route(&self, origin: Location, destination: Location)
        -> Result<RoutePolyline, RoutingError>;

    /// Polyline with the direct two-point fallback applied on any failure.
    fn get_route(&self, origin: Location, destination: Location) -> RoutePolyline {
        match self.try_route(origin, destination) {
            Ok(polyline) if polyline.points.len() >= 2 => polyline,
            Ok(_) => RoutePolyline::direct(origin, destination),
            Err(error) => {
                warn!(%error, "routing failed, using direct fallback");
                RoutePolyline::direct(origin, destination)
            }
        }
    }
}

/// ECS resource wrapping a boxed routing client.
#[derive(Resource)]
pub struct RoutingClientResource(pub Box<dyn RoutingClient>);

/// Straight-line routing: the polyline is always `[origin, destination]`.
pub struct HaversineRoutingClient;

impl RoutingClient for HaversineRoutingClient {
    fn try_route(
        &self,
        origin: Location,
        destination: Location,
    ) -> Result<RoutePolyline, RoutingError> {
        Ok(RoutePolyline::direct(origin, destination))
    }
}

/// Estimate the distance (km) and travel time (whole seconds) to serve the
/// given stops from an origin. Each leg routes independently; per polyline
/// segment the travel time is `floor(haversine / average_velocity)`. A leg
/// that fails to route contributes zero.
pub fn estimate_route_properties(
    routing: &dyn RoutingClient,
    origin: Location,
    stops: &[Location],
    vehicle: &Vehicle,
) -> (f64, u64) {
    let mut total_distance = 0.0;
    let mut total_time = 0;
    let mut from = origin;
    for to in stops {
        let (distance, time) = estimate_travelling_properties(routing, from, *to, vehicle);
        total_distance += distance;
        total_time += time;
        from = *to;
    }
    (total_distance, total_time)
}

/// Distance and time for a single origin → destination leg.
pub fn estimate_travelling_properties(
    routing: &dyn RoutingClient,
    origin: Location,
    destination: Location,
    vehicle: &Vehicle,
) -> (f64, u64) {
    let polyline = routing.get_route(origin, destination);
    let mut distance = 0.0;
    let mut time = 0;
    for segment in polyline.points.windows(2) {
        let d = haversine_km(segment[0], segment[1]);
        distance += d;
        if vehicle.average_velocity > 0.0 {
            time += (d / vehicle.average_velocity) as u64;
        }
    }
    (distance, time)
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

type RouteKey = [u64; 4];

fn route_key(origin: Location, destination: Location) -> RouteKey {
    [
        origin.lat.to_bits(),
        origin.lng.to_bits(),
        destination.lat.to_bits(),
        destination.lng.to_bits(),
    ]
}

/// LRU-cached wrapper around any [`RoutingClient`]. Cache key is the exact
/// coordinate pair (directional).
pub struct CachedRoutingClient {
    inner: Box<dyn RoutingClient>,
    cache: Mutex<LruCache<RouteKey, RoutePolyline>>,
}

impl CachedRoutingClient {
    pub fn new(inner: Box<dyn RoutingClient>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("cache capacity must be > 0"),
            )),
        }
    }
}

impl RoutingClient for CachedRoutingClient {
    fn try_route(
        &self,
        origin: Location,
        destination: Location,
    ) -> Result<RoutePolyline, RoutingError> {
        let key = route_key(origin, destination);
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&key) {
                return Ok(cached.clone());
            }
        }
        let polyline = self.inner.try_route(origin, destination)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, polyline.clone());
        }
        Ok(polyline)
    }
}

// ---------------------------------------------------------------------------
// OSRM client (behind `osrm` feature)
// ---------------------------------------------------------------------------

#[cfg(feature = "osrm")]
pub mod osrm {
    use super::*;
    use reqwest::blocking::Client;
    use serde::Deserialize;
    use std::time::Duration;

    /// Routes via an OSRM HTTP endpoint, reading step maneuver locations.
    pub struct OsrmRoutingClient {
        client: Client,
        endpoint: String,
    }

    impl OsrmRoutingClient {
        pub fn new(endpoint: &str) -> Self {
            let client = Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("failed to build HTTP client");
            Self {
                client,
                endpoint: endpoint.trim_end_matches('/').to_string(),
            }
        }
    }

    #[derive(Deserialize)]
    struct OsrmResponse {
        #[serde(default)]
        routes: Vec<OsrmRoute>,
    }

    #[derive(Deserialize)]
    struct OsrmRoute {
        #[serde(default)]
        legs: Vec<OsrmLeg>,
    }

    #[derive(Deserialize)]
    struct OsrmLeg {
        #[serde(default)]
        steps: Vec<OsrmStep>,
    }

    #[derive(Deserialize)]
    struct OsrmStep {
        maneuver: OsrmManeuver,
    }

    #[derive(Deserialize)]
    struct OsrmManeuver {
        /// `[lng, lat]` per the OSRM wire format.
        location: Vec<f64>,
    }

    impl RoutingClient for OsrmRoutingClient {
        fn try_route(
            &self,
            origin: Location,
            destination: Location,
        ) -> Result<RoutePolyline, RoutingError> {
            let url = format!(
                "{}/route/v1/driving/{},{};{},{}?alternatives=false&steps=true",
                self.endpoint, origin.lng, origin.lat, destination.lng, destination.lat,
            );

            let response = self
                .client
                .get(&url)
                .send()
                .map_err(|e| RoutingError::Transport(e.to_string()))?;
            let status = response.status().as_u16();
            if status != 200 && status != 204 {
                return Err(RoutingError::Transport(format!("http status {status}")));
            }

            let body: OsrmResponse = response.json().map_err(|_| RoutingError::Malformed)?;
            let steps = body
                .routes
                .first()
                .and_then(|route| route.legs.first())
                .map(|leg| leg.steps.as_slice())
                .ok_or(RoutingError::Malformed)?;

            let mut points = Vec::with_capacity(steps.len());
            for step in steps {
                let &[lng, lat] = step.maneuver.location.as_slice() else {
                    return Err(RoutingError::Malformed);
                };
                points.push(Location::new(lat, lng));
            }
            Ok(RoutePolyline { points })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::VehicleKind;

    fn loc(lat: f64, lng: f64) -> Location {
        Location::new(lat, lng)
    }

    struct FailingClient;

    impl RoutingClient for FailingClient {
        fn try_route(
            &self,
            _origin: Location,
            _destination: Location,
        ) -> Result<RoutePolyline, RoutingError> {
            Err(RoutingError::Transport("unreachable".into()))
        }
    }

    #[test]
    fn failed_route_falls_back_to_direct_line() {
        let polyline = FailingClient.get_route(loc(0.0, 0.0), loc(0.0, 1.0));
        assert_eq!(polyline.points, vec![loc(0.0, 0.0), loc(0.0, 1.0)]);
    }

    #[test]
    fn estimate_sums_legs_with_floored_times() {
        let unit_km = haversine_km(loc(0.0, 0.0), loc(0.0, 1.0));
        let vehicle = Vehicle::with_velocity(VehicleKind::Motorcycle, unit_km);
        let (distance, time) = estimate_route_properties(
            &HaversineRoutingClient,
            loc(0.0, 0.0),
            &[loc(0.0, 3.0), loc(0.0, 6.0)],
            &vehicle,
        );
        assert!((distance - 6.0 * unit_km).abs() < 1e-6);
        assert_eq!(time, 6);
    }

    #[test]
    fn estimate_with_zero_velocity_contributes_no_time() {
        let vehicle = Vehicle::with_velocity(VehicleKind::Bicycle, 0.0);
        let (distance, time) = estimate_route_properties(
            &HaversineRoutingClient,
            loc(0.0, 0.0),
            &[loc(0.0, 1.0)],
            &vehicle,
        );
        assert!(distance > 0.0);
        assert_eq!(time, 0);
    }

    #[test]
    fn cached_client_serves_repeat_queries() {
        let cached = CachedRoutingClient::new(Box::new(HaversineRoutingClient), 16);
        let first = cached.get_route(loc(0.0, 0.0), loc(1.0, 1.0));
        let second = cached.get_route(loc(0.0, 0.0), loc(1.0, 1.0));
        assert_eq!(first, second);
    }
}
