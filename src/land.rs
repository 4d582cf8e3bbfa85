//! Land/coast collision oracle (spec.md C2): polygon-based coastline
//! atlas with ray-casting point-in-polygon containment.
//!
//! The polygons are plain coordinate rings rather than a validated
//! `geo::Polygon` exterior+holes model, since the ray-casting routine
//! below needs the exact closing-vertex and tie-break behavior the
//! atlas was authored against; we still store each ring as a
//! `geo::LineString` so the crate's declared `geo` dependency carries
//! real weight, and expose it for callers who want to compose with the
//! wider `geo` ecosystem.

use geo::{Coord, LineString};

use crate::geodesy::Coordinate;

/// One named coastline polygon, as a closed ring of `(lat, lon)` vertices.
#[derive(Debug, Clone)]
pub struct LandPolygon {
    pub name: &'static str,
    pub ring: LineString<f64>,
}

impl LandPolygon {
    fn new(name: &'static str, vertices: &[(f64, f64)]) -> Self {
        let coords: Vec<Coord<f64>> = vertices
            .iter()
            .map(|(lat, lon)| Coord { x: *lon, y: *lat })
            .collect();
        Self {
            name,
            ring: LineString::new(coords),
        }
    }

    fn vertices_lat_lon(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.ring.coords().map(|c| (c.y, c.x))
    }
}

/// Route validity/distance summary (spec.md §2.3 supplemented `route_statistics`).
#[derive(Debug, Clone, Copy)]
pub struct RouteStatistics {
    pub total_distance_nm: f64,
    pub waypoint_count: usize,
    pub land_crossing_segments: usize,
    pub is_valid_route: bool,
}

pub struct LandAtlas {
    polygons: Vec<LandPolygon>,
}

impl Default for LandAtlas {
    fn default() -> Self {
        Self::new()
    }
}

impl LandAtlas {
    pub fn new() -> Self {
        Self {
            polygons: build_atlas(),
        }
    }

    pub fn polygons(&self) -> &[LandPolygon] {
        &self.polygons
    }

    /// True if `point` falls inside any atlas polygon (ray-casting,
    /// upper-inclusive/lower-exclusive latitude tie-break).
    pub fn on_land(&self, point: &Coordinate) -> bool {
        self.polygons
            .iter()
            .any(|p| point_in_polygon(point.lat, point.lon, p))
    }

    /// Samples `num_checks - 1` intermediate points plus both endpoints
    /// along the straight line `a`→`b`; true if any sample is on land.
    pub fn crosses_land(&self, a: &Coordinate, b: &Coordinate, num_checks: usize) -> bool {
        if self.on_land(a) || self.on_land(b) {
            return true;
        }
        for i in 1..num_checks {
            let t = i as f64 / num_checks as f64;
            let sample = crate::geodesy::lerp(a, b, t);
            if self.on_land(&sample) {
                return true;
            }
        }
        false
    }

    /// Default 50-sample variant used by the planners (spec.md §4.2).
    pub fn crosses_land_default(&self, a: &Coordinate, b: &Coordinate) -> bool {
        self.crosses_land(a, b, 50)
    }

    /// If `point` is on land, searches an expanding square pattern
    /// (offsets 0.1, 0.2, 0.3, 0.5, 1.0 degrees, all eight neighbors
    /// plus along-axis offsets) for the first clear water point.
    /// Returns the original point unchanged if no offset clears it.
    pub fn get_safe_point(&self, point: &Coordinate) -> Coordinate {
        if !self.on_land(point) {
            return *point;
        }
        for offset in [0.1, 0.2, 0.3, 0.5, 1.0] {
            for d_lat in [-offset, 0.0, offset] {
                for d_lon in [-offset, 0.0, offset] {
                    if d_lat == 0.0 && d_lon == 0.0 {
                        continue;
                    }
                    let candidate = Coordinate::new(point.lat + d_lat, point.lon + d_lon);
                    if !self.on_land(&candidate) {
                        return candidate;
                    }
                }
            }
        }
        *point
    }

    /// Total distance, land-crossing segment count, and validity over an
    /// arbitrary waypoint list (spec.md §2.3 supplemented feature).
    pub fn route_statistics(&self, waypoints: &[Coordinate]) -> RouteStatistics {
        let mut total_distance_nm = 0.0;
        let mut land_crossings = 0usize;

        for pair in waypoints.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            total_distance_nm += a.haversine_nm(b);
            if self.crosses_land_default(a, b) {
                land_crossings += 1;
            }
        }

        RouteStatistics {
            total_distance_nm,
            waypoint_count: waypoints.len(),
            land_crossing_segments: land_crossings,
            is_valid_route: land_crossings == 0,
        }
    }
}

/// Ray-casting point-in-polygon test, ported vertex-for-vertex from the
/// reference implementation including its tie-break rule: a horizontal
/// polygon edge (`p1_lat == p2_lat`) never toggles the inside flag
/// unless the longitudes are also equal, matching the source exactly
/// rather than "fixing" the degenerate case.
fn point_in_polygon(lat: f64, lon: f64, polygon: &LandPolygon) -> bool {
    let verts: Vec<(f64, f64)> = polygon.vertices_lat_lon().collect();
    let n = verts.len();
    if n == 0 {
        return false;
    }
    let mut inside = false;
    let (mut p1_lat, mut p1_lon) = verts[0];

    for i in 1..=n {
        let (p2_lat, p2_lon) = verts[i % n];

        if lat > p1_lat.min(p2_lat) && lat <= p1_lat.max(p2_lat) {
            if lon <= p1_lon.max(p2_lon) {
                let mut xinters = f64::NAN;
                if p1_lat != p2_lat {
                    xinters = (lat - p1_lat) * (p2_lon - p1_lon) / (p2_lat - p1_lat) + p1_lon;
                }
                if p1_lon == p2_lon || lon <= xinters {
                    inside = !inside;
                }
            }
        }

        p1_lat = p2_lat;
        p1_lon = p2_lon;
    }

    inside
}

fn build_atlas() -> Vec<LandPolygon> {
    vec![
        LandPolygon::new(
            "africa",
            &[
                (37.5, -7.0), (36.5, -6.0), (35.5, -5.0), (34.0, -4.0),
                (32.0, 0.0), (30.5, 5.0), (29.0, 10.0), (28.0, 15.0),
                (28.5, 33.0), (28.0, 34.5), (27.5, 35.0), (27.0, 34.0),
                (27.5, 32.0), (28.0, 31.0),
                (20.0, 40.0), (10.0, 40.5), (0.0, 40.0), (-5.0, 38.0),
                (-10.0, 35.0), (-15.0, 30.0), (-20.0, 25.0), (-25.0, 20.0),
                (-30.0, 16.0), (-33.0, 18.0), (-34.0, 20.0), (-34.5, 22.0),
                (-34.0, 25.0), (-33.0, 28.0), (-32.0, 30.0), (-30.0, 31.0),
                (-28.0, 32.0), (-25.0, 33.0), (-20.0, 34.0), (-15.0, 34.0),
                (-10.0, 33.0), (-5.0, 32.0), (0.0, 30.0), (5.0, 28.0),
                (10.0, 25.0), (15.0, 20.0), (20.0, 15.0), (25.0, 10.0),
                (30.0, 5.0), (35.0, 0.0), (37.5, -7.0),
            ],
        ),
        LandPolygon::new(
            "middle_east",
            &[
                (28.0, 35.0), (27.5, 36.0), (27.0, 37.0), (26.5, 38.0),
                (26.0, 39.0), (25.5, 40.0), (25.0, 41.0), (24.5, 41.5),
                (24.0, 41.0), (23.5, 40.0), (23.0, 39.0), (22.5, 38.0),
                (22.0, 37.0), (21.5, 36.0), (21.0, 35.0), (21.5, 34.0),
                (22.0, 33.0), (22.5, 32.0), (23.0, 31.5), (24.0, 31.0),
                (25.0, 31.0), (26.0, 31.5), (27.0, 32.0), (28.0, 33.0),
                (28.0, 34.0), (28.0, 35.0),
            ],
        ),
        LandPolygon::new(
            "india",
            &[
                (35.5, 74.0), (34.0, 75.0), (32.5, 75.5),
                (30.5, 77.5), (29.0, 78.5), (27.5, 79.5),
                (26.5, 88.0), (26.0, 90.0), (26.0, 92.0), (25.5, 93.0),
                (24.5, 93.5), (23.5, 92.5), (23.0, 91.0), (22.5, 89.5),
                (22.0, 88.5), (21.0, 88.0), (20.0, 86.5), (19.0, 85.5),
                (18.0, 84.0), (17.0, 83.2), (16.0, 82.5), (15.0, 81.8),
                (14.0, 81.2), (13.2, 80.2), (12.8, 80.0),
                (12.0, 79.5), (11.0, 79.0), (9.5, 78.3), (8.5, 77.5),
                (8.5, 76.9), (9.0, 76.7), (9.5, 76.5), (10.0, 76.2),
                (10.5, 75.9), (11.0, 75.6), (11.5, 75.3), (12.0, 75.0),
                (12.5, 74.7), (13.0, 74.4), (13.5, 74.1), (14.0, 73.8),
                (14.5, 73.6), (15.0, 73.4), (15.5, 73.2), (16.0, 73.1),
                (16.5, 73.0), (17.0, 72.95), (17.5, 72.9), (18.0, 72.85),
                (18.5, 72.8), (19.0, 72.75), (19.5, 72.7), (20.0, 72.65),
                (20.5, 72.6), (21.0, 72.55), (21.5, 72.5), (22.0, 72.45),
                (22.5, 72.4), (23.0, 72.2), (23.5, 71.8), (24.0, 71.2),
                (24.5, 70.6), (25.0, 70.0), (26.0, 69.5), (27.0, 69.0),
                (28.0, 68.7), (29.0, 68.5), (31.0, 69.0), (33.0, 71.0), (34.5, 73.0), (35.5, 74.0),
            ],
        ),
        LandPolygon::new(
            "sri_lanka",
            &[
                (7.5, 80.0), (7.0, 81.0), (6.5, 81.5), (6.0, 81.5),
                (5.5, 81.0), (5.5, 80.0), (6.0, 79.5), (6.5, 79.5),
                (7.0, 79.8), (7.5, 80.0),
            ],
        ),
        LandPolygon::new(
            "indochina",
            &[
                (28.0, 95.0), (27.0, 96.0), (26.0, 97.0), (25.0, 98.0),
                (24.0, 99.0), (23.0, 99.5), (22.0, 99.0), (21.0, 98.0),
                (20.0, 97.0), (19.0, 96.5), (18.0, 96.0), (17.0, 95.5),
                (16.0, 95.0), (15.0, 94.0), (14.0, 93.0), (13.0, 92.5),
                (12.0, 92.0), (11.0, 91.0), (10.0, 90.0), (9.0, 89.5),
                (8.0, 90.0), (9.0, 91.0), (10.0, 92.0), (11.0, 93.0),
                (12.0, 94.0), (13.0, 95.0), (14.0, 95.5), (15.0, 95.0),
                (16.0, 96.0), (17.0, 97.0), (18.0, 98.0), (19.0, 99.0),
                (20.0, 100.0), (21.0, 101.0), (22.0, 100.5), (23.0, 100.0),
                (24.0, 100.5), (25.0, 101.0), (26.0, 102.0), (27.0, 103.0),
                (28.0, 95.0),
            ],
        ),
        LandPolygon::new(
            "malaysia_peninsula",
            &[
                (6.8, 100.3), (6.5, 101.5), (6.0, 102.8),
                (5.4, 103.3), (4.7, 103.7), (4.0, 104.0), (3.2, 104.2),
                (2.5, 104.3), (1.9, 104.2),
                (1.9, 103.6), (2.4, 103.0), (3.0, 102.3),
                (3.7, 101.5), (4.5, 100.9), (5.3, 100.5),
                (6.0, 100.3), (6.5, 100.3), (6.8, 100.3),
            ],
        ),
        LandPolygon::new(
            "sumatra",
            &[
                (5.9, 95.2), (5.7, 96.0), (5.3, 96.8), (4.8, 97.5),
                (4.2, 98.0), (3.5, 98.4), (2.8, 98.7), (2.0, 98.9),
                (1.0, 99.0), (0.0, 99.1), (-1.0, 99.2), (-2.0, 99.4),
                (-3.0, 99.8), (-4.0, 100.5), (-5.0, 101.5), (-5.8, 102.5),
                (-6.3, 103.5), (-6.5, 104.5),
                (-6.2, 105.5), (-5.5, 106.0), (-4.5, 106.0), (-3.5, 105.5),
                (-2.5, 105.0), (-1.5, 104.5), (-0.5, 104.0), (0.5, 103.5),
                (1.5, 103.0), (2.5, 102.5), (3.5, 102.0), (4.2, 101.0),
                (4.8, 100.0), (5.2, 99.0), (5.6, 98.0), (5.9, 97.0),
                (6.0, 96.0), (6.0, 95.5), (5.9, 95.2),
            ],
        ),
        LandPolygon::new(
            "java",
            &[
                (-5.5, 105.0), (-6.0, 106.0), (-6.5, 107.0), (-6.8, 108.0),
                (-7.0, 109.0), (-7.0, 110.0), (-6.8, 111.0), (-6.5, 110.5),
                (-6.0, 109.5), (-5.5, 108.0), (-5.0, 107.0), (-5.0, 106.0),
                (-5.5, 105.0),
            ],
        ),
        LandPolygon::new(
            "borneo",
            &[
                (-1.0, 108.0), (-1.5, 109.0), (-2.0, 110.0), (-2.5, 111.0),
                (-3.0, 111.5), (-3.5, 111.0), (-3.0, 110.0), (-2.5, 109.0),
                (-2.0, 108.5), (-1.5, 108.0), (-1.0, 108.0),
            ],
        ),
        LandPolygon::new(
            "sulawesi",
            &[
                (-2.0, 119.0), (-2.5, 120.0), (-3.0, 120.5), (-3.5, 120.0),
                (-3.0, 119.0), (-2.5, 118.5), (-2.0, 119.0),
            ],
        ),
        LandPolygon::new(
            "philippines",
            &[
                (18.0, 120.0), (17.5, 121.0), (16.5, 121.5), (15.5, 121.0),
                (14.5, 120.5), (13.5, 120.0), (12.5, 119.5), (11.5, 120.0),
                (10.5, 120.5), (10.0, 121.0), (11.0, 121.5), (12.0, 121.5),
                (13.0, 121.0), (14.0, 120.5), (15.0, 120.0), (16.0, 120.0),
                (17.0, 120.5), (18.0, 120.0),
            ],
        ),
        LandPolygon::new(
            "singapore",
            &[
                (1.4, 103.6), (1.3, 103.9), (1.2, 103.8), (1.3, 103.7),
                (1.4, 103.6),
            ],
        ),
        LandPolygon::new(
            "png",
            &[
                (-2.0, 130.0), (-3.0, 131.0), (-4.0, 132.0), (-5.0, 132.5),
                (-6.0, 131.0), (-5.5, 130.0), (-4.5, 129.5), (-3.5, 129.0),
                (-2.5, 129.5), (-2.0, 130.0),
            ],
        ),
        LandPolygon::new(
            "australia",
            &[
                (-10.0, 113.0), (-11.0, 114.0), (-12.0, 115.0), (-13.0, 116.0),
                (-14.0, 117.0), (-15.0, 118.0), (-16.0, 119.0), (-17.0, 120.0),
                (-18.0, 120.0), (-19.0, 119.0), (-20.0, 118.0), (-21.0, 117.0),
                (-22.0, 116.0), (-23.0, 115.0), (-24.0, 114.0), (-25.0, 113.0),
                (-26.0, 112.0), (-27.0, 113.0), (-28.0, 114.0), (-29.0, 115.0),
                (-30.0, 116.0), (-31.0, 117.0), (-32.0, 118.0), (-33.0, 119.0),
                (-34.0, 120.0), (-35.0, 119.0), (-36.0, 118.0), (-37.0, 117.0),
                (-38.0, 116.0), (-39.0, 115.0), (-40.0, 114.0), (-41.0, 113.0),
                (-42.0, 112.0), (-43.0, 111.0), (-44.0, 110.0), (-44.0, 109.0),
                (-43.0, 108.0), (-42.0, 107.0), (-41.0, 106.0), (-40.0, 105.0),
                (-39.0, 104.0), (-38.0, 103.0), (-37.0, 102.0), (-36.0, 101.0),
                (-35.0, 100.0), (-34.0, 99.0), (-33.0, 98.0), (-32.0, 97.0),
                (-31.0, 96.0), (-30.0, 95.0), (-29.0, 94.0), (-28.0, 93.0),
                (-27.0, 92.0), (-26.0, 91.0), (-25.0, 90.0), (-24.0, 89.0),
                (-23.0, 88.0), (-22.0, 87.0), (-21.0, 86.0), (-20.0, 85.0),
                (-19.0, 84.0), (-18.0, 83.0), (-17.0, 82.0), (-16.0, 81.0),
                (-15.0, 80.0), (-14.0, 79.0), (-13.0, 78.0), (-12.0, 77.0),
                (-11.0, 76.0), (-10.0, 75.0), (-10.0, 113.0),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_ocean_point_not_on_land() {
        let atlas = LandAtlas::new();
        // Mid Indian Ocean.
        assert!(!atlas.on_land(&Coordinate::new(-10.0, 70.0)));
    }

    #[test]
    fn interior_india_point_on_land() {
        let atlas = LandAtlas::new();
        assert!(atlas.on_land(&Coordinate::new(20.0, 78.0)));
    }

    #[test]
    fn malacca_strait_stays_open() {
        let atlas = LandAtlas::new();
        // Strait of Malacca corridor, between Malay Peninsula and Sumatra.
        assert!(!atlas.on_land(&Coordinate::new(3.0, 99.8)));
    }

    #[test]
    fn get_safe_point_returns_original_when_already_water() {
        let atlas = LandAtlas::new();
        let p = Coordinate::new(-10.0, 70.0);
        assert_eq!(atlas.get_safe_point(&p), p);
    }

    #[test]
    fn get_safe_point_escapes_land() {
        let atlas = LandAtlas::new();
        let p = Coordinate::new(20.0, 78.0);
        assert!(atlas.on_land(&p));
        let safe = atlas.get_safe_point(&p);
        assert!(!atlas.on_land(&safe));
    }

    #[test]
    fn route_statistics_flags_land_crossing() {
        let atlas = LandAtlas::new();
        let waypoints = vec![Coordinate::new(20.0, 72.0), Coordinate::new(20.0, 84.0)];
        let stats = atlas.route_statistics(&waypoints);
        assert_eq!(stats.waypoint_count, 2);
        assert!(!stats.is_valid_route);
        assert_eq!(stats.land_crossing_segments, 1);
    }
}
