//! Spherical and planar-degree geometry primitives (spec.md C1).
//!
//! Two distance domains are used deliberately throughout this crate:
//! haversine great-circle distance for anything reported to a caller
//! (route length, fuel estimates), and a flat degrees-times-60 planar
//! approximation inside the sampling/grid planners, where the extra
//! cost of spherical trig on every steer/extend call would dominate
//! runtime for negligible accuracy gain at the scale of a single leg.

use serde::{Deserialize, Serialize};

/// Mean earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Nautical miles per degree of arc, used for the planar approximation.
pub const NM_PER_DEGREE: f64 = 60.0;

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to `other`, in nautical miles.
    pub fn haversine_nm(&self, other: &Coordinate) -> f64 {
        haversine_nm(self.lat, self.lon, other.lat, other.lon)
    }

    /// Flat planar-degree distance to `other`, in nautical miles
    /// (`hypot(d_lat, d_lon) * 60`). Used inside planners only.
    pub fn planar_nm(&self, other: &Coordinate) -> f64 {
        planar_nm(self.lat, self.lon, other.lat, other.lon)
    }

    /// Initial bearing from `self` to `other`, degrees clockwise from north.
    pub fn bearing_deg(&self, other: &Coordinate) -> f64 {
        bearing_deg(self.lat, self.lon, other.lat, other.lon)
    }

    /// Point reached travelling `distance_nm` along `bearing_deg` from `self`.
    pub fn destination(&self, bearing_deg: f64, distance_nm: f64) -> Coordinate {
        destination(self.lat, self.lon, bearing_deg, distance_nm)
    }
}

/// Haversine great-circle distance in nautical miles.
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_NM * c
}

/// Flat planar-degree distance (`hypot(d_lat, d_lon) * 60`), in nautical miles.
pub fn planar_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    (lat2 - lat1).hypot(lon2 - lon1) * NM_PER_DEGREE
}

/// Initial bearing in degrees, clockwise from true north, in `[0, 360)`.
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_lambda = (lon2 - lon1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    let theta = y.atan2(x).to_degrees();
    (theta + 360.0) % 360.0
}

/// Forward geodesy: destination point given a start, bearing, and distance.
pub fn destination(lat: f64, lon: f64, bearing_deg: f64, distance_nm: f64) -> Coordinate {
    let delta = distance_nm / EARTH_RADIUS_NM;
    let theta = bearing_deg.to_radians();
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    let lon2 = ((lambda2.to_degrees() + 540.0) % 360.0) - 180.0;
    Coordinate::new(phi2.to_degrees(), lon2)
}

/// Point at fraction `t` (0..=1) along the great-circle segment `a`→`b`,
/// via simple linear interpolation of lat/lon. This is not a true
/// geodesic midpoint but matches the straight-line-in-degree-space model
/// the sampling planner operates in (spec.md §4.7's planar domain), and
/// keeps interpolated waypoints consistent with the planner's own notion
/// of "straight between two nodes".
pub fn lerp(a: &Coordinate, b: &Coordinate, t: f64) -> Coordinate {
    Coordinate::new(a.lat + (b.lat - a.lat) * t, a.lon + (b.lon - a.lon) * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_identical_points() {
        let p = Coordinate::new(10.0, 20.0);
        assert!(p.haversine_nm(&p) < 1e-9);
    }

    #[test]
    fn haversine_symmetric() {
        let a = Coordinate::new(1.0, 103.0);
        let b = Coordinate::new(22.0, 70.0);
        assert!((a.haversine_nm(&b) - b.haversine_nm(&a)).abs() < 1e-9);
    }

    #[test]
    fn haversine_known_distance_roughly_matches_planar() {
        // Over a short leg the two domains should roughly agree.
        let a = Coordinate::new(1.0, 103.0);
        let b = Coordinate::new(1.2, 103.2);
        let hav = a.haversine_nm(&b);
        let planar = a.planar_nm(&b);
        assert!((hav - planar).abs() / hav < 0.05);
    }

    #[test]
    fn bearing_north_is_zero() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        assert!(a.bearing_deg(&b) < 1.0);
    }

    #[test]
    fn destination_round_trips_distance() {
        let a = Coordinate::new(10.0, 50.0);
        let dest = a.destination(90.0, 100.0);
        let back = a.haversine_nm(&dest);
        assert!((back - 100.0).abs() < 1.0);
    }

    #[test]
    fn invalid_coordinates_rejected() {
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 200.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }
}
