//! Hazard/weather cost overlay (spec.md C4): named hazard zones with
//! seasonal activity windows and proximity-decayed severity, layered on
//! top of the land oracle and grid classification.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::geodesy::Coordinate;
use crate::grid::{CellType, OceanGrid};
use crate::land::LandAtlas;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardType {
    Land,
    ShallowWater,
    Monsoon,
    Cyclone,
    TrafficScheme,
    Ice,
    Piracy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HazardLevel {
    None = 0,
    Low = 1,
    Moderate = 2,
    High = 3,
    Critical = 4,
}

impl HazardLevel {
    fn from_value(v: i32) -> HazardLevel {
        match v {
            v if v >= 4 => HazardLevel::Critical,
            3 => HazardLevel::High,
            2 => HazardLevel::Moderate,
            1 => HazardLevel::Low,
            _ => HazardLevel::None,
        }
    }

    fn value(self) -> i32 {
        self as i32
    }
}

/// A named circular hazard, active in a subset of calendar months
/// (1-12), with severity that decays linearly from `severity` at the
/// center to `HazardLevel::None` at `radius_deg` (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct HazardZone {
    pub name: &'static str,
    pub hazard_type: HazardType,
    pub center: Coordinate,
    pub radius_deg: f64,
    pub severity: HazardLevel,
    pub active_months: Vec<u32>,
    pub cost_multiplier: f64,
}

impl HazardZone {
    /// Public so callers can inject dynamic zones (e.g. a cyclone warning)
    /// at runtime via [`HazardService::add_dynamic_zone`] (spec.md §4.4's
    /// "map of dynamic zones").
    pub fn new(
        name: &'static str,
        hazard_type: HazardType,
        center_lat: f64,
        center_lon: f64,
        radius_deg: f64,
        severity: HazardLevel,
        active_months: &[u32],
        cost_multiplier: f64,
    ) -> Self {
        Self {
            name,
            hazard_type,
            center: Coordinate::new(center_lat, center_lon),
            radius_deg,
            severity,
            active_months: if active_months.is_empty() {
                (1..=12).collect()
            } else {
                active_months.to_vec()
            },
            cost_multiplier,
        }
    }

    pub fn contains_point(&self, point: &Coordinate) -> bool {
        self.center.planar_distance_deg(point) <= self.radius_deg
    }

    pub fn is_active(&self, month: u32) -> bool {
        self.active_months.contains(&month)
    }

    /// Severity/cost for a point inside the zone, decaying with distance
    /// from the center. Ported unchanged from the reference's integer
    /// severity scaling: distances beyond `radius_deg` return `(None, 1.0)`.
    pub fn severity_for_point(&self, point: &Coordinate) -> (HazardLevel, f64) {
        let dist = self.center.planar_distance_deg(point);
        if dist > self.radius_deg {
            return (HazardLevel::None, 1.0);
        }

        let proximity_factor = (self.radius_deg - dist) / self.radius_deg;
        let severity_value = (self.severity.value() as f64 * proximity_factor) as i32;

        if severity_value >= self.severity.value() {
            (self.severity, self.cost_multiplier)
        } else if severity_value == 0 {
            (HazardLevel::None, 1.0)
        } else {
            (
                HazardLevel::from_value(severity_value),
                1.0 + (self.cost_multiplier - 1.0) * (proximity_factor * 0.5),
            )
        }
    }
}

impl Coordinate {
    fn planar_distance_deg(&self, other: &Coordinate) -> f64 {
        (self.lat - other.lat).hypot(self.lon - other.lon)
    }
}

#[derive(Debug, Clone)]
pub struct HazardHit {
    pub name: &'static str,
    pub hazard_type: HazardType,
    pub severity: HazardLevel,
    pub cost_multiplier: f64,
}

#[derive(Debug, Clone)]
pub struct PointHazardReport {
    pub is_hazardous: bool,
    pub cost_multiplier: f64,
    pub hazards: Vec<HazardHit>,
}

#[derive(Debug, Clone)]
pub struct RouteHazardReport {
    pub waypoint_count: usize,
    pub hazard_waypoints: usize,
    pub total_hazard_cost: f64,
    pub average_cost_multiplier: f64,
    pub max_severity: HazardLevel,
    pub critical_hazards: Vec<HazardHit>,
    pub risk_assessment: &'static str,
}

/// Static zones are fixed at startup; `dynamic` holds runtime-injected
/// zones (e.g. a cyclone warning) keyed by an id handed back from
/// `add_dynamic_zone`. Readers take a read lock over the whole map per
/// access, and writers replace the whole map rather than mutating in
/// place, so a reader never observes a half-applied add/remove
/// (spec.md §5's copy-on-write requirement for hazard mutation).
pub struct HazardService {
    zones: Vec<HazardZone>,
    dynamic: RwLock<HashMap<u64, HazardZone>>,
    next_dynamic_id: AtomicU64,
}

impl Default for HazardService {
    fn default() -> Self {
        Self::new()
    }
}

impl HazardService {
    pub fn new() -> Self {
        Self {
            zones: build_static_hazards(),
            dynamic: RwLock::new(HashMap::new()),
            next_dynamic_id: AtomicU64::new(1),
        }
    }

    pub fn zones(&self) -> &[HazardZone] {
        &self.zones
    }

    /// Injects a runtime hazard zone (spec.md §4.4) and returns its id for
    /// later removal. Takes effect for every `evaluate_point`/
    /// `evaluate_route` call made after this returns.
    pub fn add_dynamic_zone(&self, zone: HazardZone) -> u64 {
        let id = self.next_dynamic_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.dynamic.write().unwrap();
        let mut updated = guard.clone();
        updated.insert(id, zone);
        *guard = updated;
        id
    }

    /// Removes a previously injected dynamic zone. Returns `false` if
    /// `id` is unknown (already removed, or never injected).
    pub fn remove_dynamic_zone(&self, id: u64) -> bool {
        let mut guard = self.dynamic.write().unwrap();
        let mut updated = guard.clone();
        let existed = updated.remove(&id).is_some();
        *guard = updated;
        existed
    }

    /// Invokes `f` once per active zone — static then dynamic — active in
    /// `month`.
    fn for_each_active_zone<'a>(&'a self, month: u32, snapshot: &'a [HazardZone], mut f: impl FnMut(&'a HazardZone)) {
        for zone in &self.zones {
            if zone.is_active(month) {
                f(zone);
            }
        }
        for zone in snapshot {
            if zone.is_active(month) {
                f(zone);
            }
        }
    }

    fn dynamic_snapshot(&self) -> Vec<HazardZone> {
        self.dynamic.read().unwrap().values().cloned().collect()
    }

    /// Evaluates land, grid shallow-water classification, and all active
    /// zone hazards at a single point (spec.md `evaluate_waypoint_hazard`).
    pub fn evaluate_point(&self, point: &Coordinate, month: u32, atlas: &LandAtlas, grid: &OceanGrid) -> PointHazardReport {
        if atlas.on_land(point) {
            return PointHazardReport {
                is_hazardous: true,
                cost_multiplier: f64::INFINITY,
                hazards: vec![HazardHit {
                    name: "Land",
                    hazard_type: HazardType::Land,
                    severity: HazardLevel::Critical,
                    cost_multiplier: f64::INFINITY,
                }],
            };
        }

        let mut hazards = Vec::new();
        let mut max_cost = 1.0_f64;

        if let Some(cell) = grid.get_cell(point) {
            if cell.cell_type == CellType::Shallow {
                hazards.push(HazardHit {
                    name: "Shallow Water",
                    hazard_type: HazardType::ShallowWater,
                    severity: HazardLevel::Moderate,
                    cost_multiplier: cell.cost,
                });
                max_cost = max_cost.max(cell.cost);
            }
        }

        let dynamic_snapshot = self.dynamic_snapshot();
        self.for_each_active_zone(month, &dynamic_snapshot, |zone| {
            if zone.contains_point(point) {
                let (severity, cost) = zone.severity_for_point(point);
                if severity != HazardLevel::None {
                    hazards.push(HazardHit {
                        name: zone.name,
                        hazard_type: zone.hazard_type,
                        severity,
                        cost_multiplier: cost,
                    });
                    max_cost = max_cost.max(cost);
                }
            }
        });

        PointHazardReport {
            is_hazardous: !hazards.is_empty(),
            cost_multiplier: max_cost,
            hazards,
        }
    }

    /// Evaluates hazards across an entire waypoint list (spec.md
    /// `evaluate_route_hazards`).
    pub fn evaluate_route(&self, waypoints: &[Coordinate], month: u32, atlas: &LandAtlas, grid: &OceanGrid) -> RouteHazardReport {
        let mut total_cost = 0.0;
        let mut max_severity = HazardLevel::None;
        let mut hazard_waypoints = 0usize;
        let mut critical_hazards = Vec::new();

        for point in waypoints {
            let report = self.evaluate_point(point, month, atlas, grid);
            total_cost += if report.cost_multiplier.is_finite() { report.cost_multiplier } else { 10.0 };

            if report.is_hazardous {
                hazard_waypoints += 1;
                for hit in &report.hazards {
                    if hit.severity > max_severity {
                        max_severity = hit.severity;
                    }
                    if hit.severity >= HazardLevel::High {
                        critical_hazards.push(hit.clone());
                    }
                }
            }
        }

        let average_cost_multiplier = if waypoints.is_empty() {
            1.0
        } else {
            total_cost / waypoints.len() as f64
        };

        let risk_assessment = if max_severity >= HazardLevel::High {
            "HIGH"
        } else if max_severity == HazardLevel::Moderate {
            "MODERATE"
        } else {
            "LOW"
        };

        RouteHazardReport {
            waypoint_count: waypoints.len(),
            hazard_waypoints,
            total_hazard_cost: total_cost,
            average_cost_multiplier,
            max_severity,
            critical_hazards,
            risk_assessment,
        }
    }
}

fn build_static_hazards() -> Vec<HazardZone> {
    vec![
        HazardZone::new("Suez Canal Approach", HazardType::ShallowWater, 30.5, 32.3, 0.5, HazardLevel::Moderate, &[], 2.0),
        HazardZone::new("Red Sea Narrows", HazardType::ShallowWater, 19.0, 40.0, 1.0, HazardLevel::Moderate, &[], 1.8),
        HazardZone::new("Strait of Malacca", HazardType::ShallowWater, 2.0, 101.0, 1.5, HazardLevel::High, &[], 2.5),
        HazardZone::new("Singapore Strait", HazardType::ShallowWater, 1.3, 103.8, 0.8, HazardLevel::High, &[], 2.3),
        HazardZone::new("Sunda Strait", HazardType::ShallowWater, -6.5, 105.8, 1.0, HazardLevel::Moderate, &[], 2.0),
        HazardZone::new("English Channel", HazardType::ShallowWater, 50.0, -2.0, 1.5, HazardLevel::Moderate, &[], 1.8),
        HazardZone::new("Gulf of Mexico Shallows", HazardType::ShallowWater, 25.0, -90.0, 3.0, HazardLevel::Low, &[], 1.3),
        HazardZone::new("Arabian Sea Southwest Monsoon", HazardType::Monsoon, 12.0, 65.0, 12.0, HazardLevel::High, &[5, 6, 7, 8, 9], 3.5),
        HazardZone::new("Bay of Bengal Southwest Monsoon", HazardType::Monsoon, 15.0, 90.0, 10.0, HazardLevel::High, &[5, 6, 7, 8, 9], 3.3),
        HazardZone::new("Eastern Indian Ocean Southwest Monsoon", HazardType::Monsoon, 5.0, 105.0, 8.0, HazardLevel::Moderate, &[5, 6, 7, 8, 9], 2.8),
        HazardZone::new("Arabian Sea Monsoon Transition", HazardType::Monsoon, 12.0, 65.0, 10.0, HazardLevel::Moderate, &[10, 11, 3, 4], 2.0),
        HazardZone::new("Bay of Bengal Cyclone Zone", HazardType::Cyclone, 15.0, 88.0, 8.0, HazardLevel::Critical, &[5, 6, 9, 10, 11], 5.0),
        HazardZone::new("Arabian Sea Cyclone Zone", HazardType::Cyclone, 12.0, 62.0, 8.0, HazardLevel::Critical, &[5, 6, 9, 10, 11], 5.0),
        HazardZone::new("Northwest Pacific Typhoon Zone", HazardType::Cyclone, 20.0, 130.0, 15.0, HazardLevel::High, &[6, 7, 8, 9, 10, 11], 3.5),
        HazardZone::new("Suez Canal TSS", HazardType::TrafficScheme, 30.5, 32.3, 1.0, HazardLevel::Low, &[], 0.8),
        HazardZone::new("Singapore Strait TSS", HazardType::TrafficScheme, 1.3, 103.8, 1.2, HazardLevel::Low, &[], 0.85),
        HazardZone::new("Malacca Strait TSS", HazardType::TrafficScheme, 2.0, 101.0, 1.5, HazardLevel::Low, &[], 0.9),
        HazardZone::new("Arabian Sea Shipping Lanes", HazardType::TrafficScheme, 10.0, 60.0, 3.0, HazardLevel::Low, &[], 0.95),
        HazardZone::new("Gulf of Aden - Piracy Risk", HazardType::Piracy, 12.5, 48.0, 4.0, HazardLevel::Moderate, &[], 1.8),
        HazardZone::new("Malacca Strait - Piracy Risk", HazardType::Piracy, 2.0, 101.0, 2.0, HazardLevel::Low, &[], 1.3),
        HazardZone::new("Arctic Ice Zone", HazardType::Ice, 75.0, 0.0, 20.0, HazardLevel::High, &[1, 2, 3, 11, 12], 4.0),
        HazardZone::new("Southern Ocean Ice Zone", HazardType::Ice, -60.0, 0.0, 15.0, HazardLevel::Moderate, &[6, 7, 8, 9], 2.5),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_center_gets_full_severity() {
        let zone = HazardZone::new("test", HazardType::Cyclone, 15.0, 88.0, 8.0, HazardLevel::Critical, &[5], 5.0);
        let (sev, cost) = zone.severity_for_point(&Coordinate::new(15.0, 88.0));
        assert_eq!(sev, HazardLevel::Critical);
        assert_eq!(cost, 5.0);
    }

    #[test]
    fn zone_outside_radius_is_inert() {
        let zone = HazardZone::new("test", HazardType::Cyclone, 15.0, 88.0, 8.0, HazardLevel::Critical, &[5], 5.0);
        let (sev, cost) = zone.severity_for_point(&Coordinate::new(30.0, 88.0));
        assert_eq!(sev, HazardLevel::None);
        assert_eq!(cost, 1.0);
    }

    #[test]
    fn monsoon_zone_inactive_outside_season() {
        let zone = &build_static_hazards()[7];
        assert!(!zone.is_active(1));
        assert!(zone.is_active(6));
    }

    #[test]
    fn evaluate_point_flags_land() {
        let service = HazardService::new();
        let atlas = LandAtlas::new();
        let cfg = crate::config::PlanningConfig::default();
        let grid = OceanGrid::build(1, &cfg, &atlas);
        let report = service.evaluate_point(&Coordinate::new(20.0, 78.0), 6, &atlas, &grid);
        assert!(report.is_hazardous);
        assert!(report.cost_multiplier.is_infinite());
    }

    #[test]
    fn evaluate_route_averages_cost() {
        let service = HazardService::new();
        let atlas = LandAtlas::new();
        let cfg = crate::config::PlanningConfig::default();
        let grid = OceanGrid::build(1, &cfg, &atlas);
        let waypoints = vec![Coordinate::new(-10.0, 70.0), Coordinate::new(-10.0, 71.0)];
        let report = service.evaluate_route(&waypoints, 1, &atlas, &grid);
        assert_eq!(report.waypoint_count, 2);
        assert!(report.average_cost_multiplier >= 1.0);
    }

    #[test]
    fn dynamic_zone_is_visible_once_added_and_gone_once_removed() {
        let service = HazardService::new();
        let atlas = LandAtlas::new();
        let cfg = crate::config::PlanningConfig::default();
        let grid = OceanGrid::build(1, &cfg, &atlas);

        // Open water, no static zone nearby, month with no monsoon/cyclone activity.
        let point = Coordinate::new(-30.0, 50.0);
        let before = service.evaluate_point(&point, 1, &atlas, &grid);
        assert!(!before.is_hazardous);

        let id = service.add_dynamic_zone(HazardZone::new(
            "Injected Storm",
            HazardType::Cyclone,
            -30.0,
            50.0,
            5.0,
            HazardLevel::High,
            &[],
            3.0,
        ));
        let during = service.evaluate_point(&point, 1, &atlas, &grid);
        assert!(during.is_hazardous);
        assert!(during.hazards.iter().any(|h| h.name == "Injected Storm"));

        assert!(service.remove_dynamic_zone(id));
        let after = service.evaluate_point(&point, 1, &atlas, &grid);
        assert!(!after.is_hazardous);
        assert!(!service.remove_dynamic_zone(id));
    }
}
