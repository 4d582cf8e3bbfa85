//! Route Orchestrator (spec.md C10): port snapping, parameter
//! adaptation, the planner chain, interpolation, and voyage evaluation,
//! wired into the five public operations (spec.md §6).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use crate::config::PlanningConfig;
use crate::error::{CancellationToken, PlanError, Result};
use crate::geodesy::{self, Coordinate};
use crate::grid::OceanGrid;
use crate::hazard::{HazardService, HazardZone, PointHazardReport, RouteHazardReport};
use crate::land::LandAtlas;
use crate::planner::{BidirectionalSamplingPlanner, GridAStarPlanner, PlannedRoute};
use crate::voyage::{self, DefaultVesselCatalog, FuelVoyageModel, VesselCatalog, VoyageMetrics};
use crate::weather::WeatherChain;

/// Offshore pin for a named port, used when an endpoint lands exactly on
/// a coastal polygon at a known harbor (spec.md §2.3 supplemented
/// `OFFSHORE_PORTS` table).
struct PinnedPort {
    #[allow(dead_code)]
    name: &'static str,
    coastal: Coordinate,
    pinned: Coordinate,
}

fn offshore_ports() -> Vec<PinnedPort> {
    vec![
        PinnedPort {
            name: "Mumbai",
            coastal: Coordinate::new(19.076, 72.877),
            pinned: Coordinate::new(18.9, 72.8),
        },
        PinnedPort {
            name: "Chennai",
            coastal: Coordinate::new(13.194, 80.282),
            pinned: Coordinate::new(13.0, 80.3),
        },
        PinnedPort {
            name: "Kolkata",
            coastal: Coordinate::new(22.572, 88.364),
            pinned: Coordinate::new(20.8, 89.0),
        },
    ]
}

/// Identifies an earlier `plan_route` result for `replan_route`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(u64);

/// Which planner(s) to run; `Auto` is the normal chain (C7 then C8 on
/// failure). The other variants let a caller force a specific stage,
/// e.g. to exercise C8 directly (spec.md §8 scenario 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlgorithmHint {
    #[default]
    Auto,
    SamplingOnly,
    GridAStarOnly,
}

/// Request for `plan_route` (spec.md §6 operation 1).
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub start: Coordinate,
    pub goal: Coordinate,
    pub vessel_id: String,
    pub algorithm_hint: AlgorithmHint,
    pub operating_speed_knots: Option<f64>,
    pub weather_factor_override: Option<f64>,
    pub month: Option<u32>,
    pub cancellation: Option<CancellationToken>,
    seed: Option<u64>,
}

impl PlanRequest {
    pub fn new(start: Coordinate, goal: Coordinate, vessel_id: impl Into<String>) -> Self {
        Self {
            start,
            goal,
            vessel_id: vessel_id.into(),
            algorithm_hint: AlgorithmHint::Auto,
            operating_speed_knots: None,
            weather_factor_override: None,
            month: None,
            cancellation: None,
            seed: None,
        }
    }

    /// Attaches a cancellation token (spec.md §5); the planner chain
    /// polls it cooperatively and `plan_route` surfaces `PlanError::Cancelled`
    /// if it was tripped before a route was found.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_algorithm_hint(mut self, hint: AlgorithmHint) -> Self {
        self.algorithm_hint = hint;
        self
    }

    pub fn with_operating_speed(mut self, speed_knots: f64) -> Self {
        self.operating_speed_knots = Some(speed_knots);
        self
    }

    pub fn with_weather_factor_override(mut self, factor: f64) -> Self {
        self.weather_factor_override = Some(factor);
        self
    }
}

/// Diagnostic bundle returned alongside every planned route (spec.md §6).
#[derive(Debug, Clone)]
pub struct PlanDiagnostics {
    pub algorithm_selected: &'static str,
    pub iterations_budget: usize,
    pub efficiency_vs_straight_line: f64,
    pub straight_line_nm: f64,
    pub route_distance_nm: f64,
    pub risk_assessment: &'static str,
}

#[derive(Debug, Clone)]
pub struct PlanResult {
    pub route_id: RouteId,
    pub waypoints: Vec<Coordinate>,
    pub metrics: VoyageMetrics,
    pub diagnostics: PlanDiagnostics,
}

struct StoredRoute {
    start: Coordinate,
    goal: Coordinate,
    vessel_id: String,
    waypoints: Vec<Coordinate>,
    cost_nm: f64,
}

/// The four process-wide collaborators (spec.md §5's "singletons"),
/// held by reference from the orchestrator rather than as globals, plus
/// the per-request route registry `replan_route` looks up against.
pub struct RouteOrchestrator {
    config: PlanningConfig,
    atlas: LandAtlas,
    grid: OceanGrid,
    hazards: HazardService,
    weather: WeatherChain,
    vessels: Box<dyn VesselCatalog>,
    routes: Mutex<HashMap<u64, StoredRoute>>,
    next_route_id: AtomicU64,
}

impl Default for RouteOrchestrator {
    fn default() -> Self {
        let config = PlanningConfig::default();
        let atlas = LandAtlas::new();
        let grid = OceanGrid::build(1, &config, &atlas);
        Self {
            hazards: HazardService::new(),
            weather: WeatherChain::synthetic(config.weather_cache_ttl_s),
            vessels: Box::new(DefaultVesselCatalog::default()),
            grid,
            atlas,
            config,
            routes: Mutex::new(HashMap::new()),
            next_route_id: AtomicU64::new(1),
        }
    }
}

impl RouteOrchestrator {
    pub fn new(
        config: PlanningConfig,
        atlas: LandAtlas,
        hazards: HazardService,
        weather: WeatherChain,
        vessels: Box<dyn VesselCatalog>,
    ) -> Self {
        let grid = OceanGrid::build(1, &config, &atlas);
        Self {
            config,
            atlas,
            grid,
            hazards,
            weather,
            vessels,
            routes: Mutex::new(HashMap::new()),
            next_route_id: AtomicU64::new(1),
        }
    }

    fn pinned_port_for(&self, point: &Coordinate) -> Option<Coordinate> {
        offshore_ports()
            .into_iter()
            .find(|port| port.coastal.haversine_nm(point) < 15.0)
            .map(|port| port.pinned)
    }

    /// Bidirectional 0.05°-step longitude search: tries both increasing
    /// and decreasing longitude up to 20 steps each and keeps whichever
    /// clears land in fewer steps (spec.md §3's generalization of the
    /// original's hardcoded west/east-coast heuristic).
    fn longitude_search(&self, point: &Coordinate) -> Option<Coordinate> {
        let mut east = None;
        for step in 1..=20 {
            let candidate = Coordinate::new(point.lat, point.lon + 0.05 * step as f64);
            if !self.atlas.on_land(&candidate) {
                east = Some((step, candidate));
                break;
            }
        }
        let mut west = None;
        for step in 1..=20 {
            let candidate = Coordinate::new(point.lat, point.lon - 0.05 * step as f64);
            if !self.atlas.on_land(&candidate) {
                west = Some((step, candidate));
                break;
            }
        }
        match (east, west) {
            (Some((e_steps, e_point)), Some((w_steps, w_point))) => {
                Some(if e_steps <= w_steps { e_point } else { w_point })
            }
            (Some((_, p)), None) => Some(p),
            (None, Some((_, p))) => Some(p),
            (None, None) => None,
        }
    }

    /// Eight-direction expanding grid search at the spec's six radii
    /// (spec.md §4.10), used once the longitude search fails.
    fn expanding_grid_search(&self, point: &Coordinate) -> Option<Coordinate> {
        for radius in [0.1, 0.2, 0.3, 0.5, 0.7, 1.0] {
            for (d_lat, d_lon) in [
                (radius, 0.0),
                (-radius, 0.0),
                (0.0, radius),
                (0.0, -radius),
                (radius, radius),
                (radius, -radius),
                (-radius, radius),
                (-radius, -radius),
            ] {
                let candidate = Coordinate::new(point.lat + d_lat, point.lon + d_lon);
                if !self.atlas.on_land(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Port snapping (spec.md §4.10): pinned-port table, then the
    /// generalized longitude search, then the expanding grid search.
    /// Returns the point unchanged if it is already off land.
    fn snap_endpoint(&self, point: Coordinate) -> Option<Coordinate> {
        if !self.atlas.on_land(&point) {
            return Some(point);
        }
        if let Some(pinned) = self.pinned_port_for(&point) {
            if !self.atlas.on_land(&pinned) {
                return Some(pinned);
            }
        }
        if let Some(found) = self.longitude_search(&point) {
            return Some(found);
        }
        self.expanding_grid_search(&point)
    }

    fn next_route_id(&self) -> RouteId {
        RouteId(self.next_route_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Plans a collision-free route from `request.start` to
    /// `request.goal` for the named vessel (spec.md §6 operation 1).
    pub fn plan_route(&self, request: PlanRequest) -> Result<PlanResult> {
        if !request.start.is_valid() {
            return Err(PlanError::InvalidCoordinate { lat: request.start.lat, lon: request.start.lon });
        }
        if !request.goal.is_valid() {
            return Err(PlanError::InvalidCoordinate { lat: request.goal.lat, lon: request.goal.lon });
        }

        let start = self
            .snap_endpoint(request.start)
            .ok_or(PlanError::EndpointOnLandAfterSnap { lat: request.start.lat, lon: request.start.lon })?;
        let goal = self
            .snap_endpoint(request.goal)
            .ok_or(PlanError::EndpointOnLandAfterSnap { lat: request.goal.lat, lon: request.goal.lon })?;

        let vessel = self
            .vessels
            .get(&request.vessel_id)
            .ok_or_else(|| PlanError::UnknownVessel(request.vessel_id.clone()))?;

        if (start.lat - goal.lat).abs() < 1e-9 && (start.lon - goal.lon).abs() < 1e-9 {
            let route_id = self.next_route_id();
            let metrics = VoyageMetrics {
                distance_nm: 0.0,
                time_hours: 0.0,
                fuel_tons: 0.0,
                co2_tons: 0.0,
                tanks_needed: 0.0,
                sufficient_fuel: true,
            };
            self.routes.lock().unwrap().insert(
                route_id.0,
                StoredRoute { start, goal, vessel_id: request.vessel_id.clone(), waypoints: vec![start], cost_nm: 0.0 },
            );
            return Ok(PlanResult {
                route_id,
                waypoints: vec![start],
                metrics,
                diagnostics: PlanDiagnostics {
                    algorithm_selected: "degenerate_same_point",
                    iterations_budget: 0,
                    efficiency_vs_straight_line: 1.0,
                    straight_line_nm: 0.0,
                    route_distance_nm: 0.0,
                    risk_assessment: "LOW",
                },
            });
        }

        let seed = request.seed.unwrap_or_else(|| derive_seed(&start, &goal, &request.vessel_id));
        let straight_line_nm = start.haversine_nm(&goal);
        let row = self.config.adaptive_row(straight_line_nm);

        let mut algorithm_selected = "bidirectional_sampling";
        let mut planned: Option<PlannedRoute> = None;

        let token = request.cancellation.as_ref();

        if request.algorithm_hint != AlgorithmHint::GridAStarOnly {
            let mut sampler = BidirectionalSamplingPlanner::new(&self.config, &self.atlas, seed);
            planned = sampler.plan_cancellable(start, goal, token);
        }

        if token.map(|t| t.is_cancelled()).unwrap_or(false) {
            return Err(PlanError::Cancelled);
        }

        if request.algorithm_hint == AlgorithmHint::GridAStarOnly
            || planned.as_ref().map(|r| r.waypoints.len() < 2).unwrap_or(true)
        {
            algorithm_selected = "grid_astar";
            let astar = GridAStarPlanner::new(
                &self.atlas,
                self.config.astar_grid_resolution_deg,
                self.config.astar_bbox_padding_deg,
                self.config.astar_max_iterations,
            );
            planned = astar.plan_cancellable(start, goal, token);
        }

        if token.map(|t| t.is_cancelled()).unwrap_or(false) {
            return Err(PlanError::Cancelled);
        }

        let planned = planned.ok_or(PlanError::NoRouteFound)?;
        if planned.waypoints.len() < 2 {
            return Err(PlanError::NoRouteFound);
        }

        let interpolated = interpolate_route(&planned.waypoints, self.config.interpolation_points);
        let month = request.month.unwrap_or(1);

        let operating_speed = request.operating_speed_knots.unwrap_or(vessel.design_speed_knots);
        let model = FuelVoyageModel::new(&vessel);
        let mut legs = Vec::with_capacity(interpolated.len().saturating_sub(1));
        for pair in interpolated.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let distance_nm = a.haversine_nm(&b);
            let midpoint = geodesy::lerp(&a, &b, 0.5);

            let weather_factor = request.weather_factor_override.unwrap_or_else(|| {
                self.weather.sample(&midpoint, 0, Utc::now()).cost_multiplier()
            });
            let hazard_report = self.hazards.evaluate_point(&midpoint, month, &self.atlas, &self.grid);
            let combined_factor = if hazard_report.cost_multiplier.is_finite() {
                weather_factor * hazard_report.cost_multiplier
            } else {
                weather_factor
            };

            legs.push(model.segment_cost(distance_nm, operating_speed, combined_factor, 1.0)?);
        }
        let metrics = voyage::accumulate(&legs);

        let hazard_route_report = self.hazards.evaluate_route(&interpolated, month, &self.atlas, &self.grid);
        let route_distance_nm = metrics.distance_nm;
        let efficiency_vs_straight_line = if route_distance_nm > 0.0 {
            straight_line_nm / route_distance_nm
        } else {
            1.0
        };

        let route_id = self.next_route_id();
        self.routes.lock().unwrap().insert(
            route_id.0,
            StoredRoute {
                start,
                goal,
                vessel_id: request.vessel_id.clone(),
                waypoints: interpolated.clone(),
                cost_nm: route_distance_nm,
            },
        );

        Ok(PlanResult {
            route_id,
            waypoints: interpolated,
            metrics,
            diagnostics: PlanDiagnostics {
                algorithm_selected,
                iterations_budget: if algorithm_selected == "bidirectional_sampling" {
                    row.iterations
                } else {
                    self.config.astar_max_iterations
                },
                efficiency_vs_straight_line,
                straight_line_nm,
                route_distance_nm,
                risk_assessment: hazard_route_report.risk_assessment,
            },
        })
    }

    /// Incremental mid-voyage replan (spec.md §6 operation 2). Returns
    /// `Ok(None)` if no alternative is found, per spec.md §4.10's
    /// failure semantics ("caller must keep prior route").
    pub fn replan_route(&self, route_id: RouteId, changed_obstacles: &[Coordinate]) -> Result<Option<PlanResult>> {
        self.replan_route_cancellable(route_id, changed_obstacles, None)
    }

    /// Same as [`Self::replan_route`] but polls `token` cooperatively in
    /// the underlying LPA*/D*-lite search (spec.md §5).
    pub fn replan_route_cancellable(
        &self,
        route_id: RouteId,
        changed_obstacles: &[Coordinate],
        token: Option<&CancellationToken>,
    ) -> Result<Option<PlanResult>> {
        let stored = {
            let routes = self.routes.lock().unwrap();
            match routes.get(&route_id.0) {
                Some(r) => (r.start, r.goal, r.vessel_id.clone(), r.cost_nm),
                None => return Err(PlanError::ReplanInfeasible),
            }
        };
        let (start, goal, vessel_id, previous_cost_nm) = stored;

        let straight_line_nm = start.haversine_nm(&goal);
        let row = self.config.adaptive_row(straight_line_nm);
        let step_size_deg = row.step_nm / 60.0;

        let mut replanner = crate::planner::IncrementalReplanner::new(
            &self.atlas,
            self.config.ocean_bounds,
            step_size_deg,
            self.config.replan_max_iterations,
            self.config.replan_path_cap,
        );

        let initial = replanner.plan_cancellable(start, goal, token);
        if initial.is_none() {
            if token.map(|t| t.is_cancelled()).unwrap_or(false) {
                return Err(PlanError::Cancelled);
            }
            return Ok(None);
        }

        let updated = if changed_obstacles.is_empty() {
            initial
        } else {
            replanner.replan_cancellable(start, changed_obstacles, token)
        };

        let updated = match updated {
            Some(route) => route,
            None => {
                if token.map(|t| t.is_cancelled()).unwrap_or(false) {
                    return Err(PlanError::Cancelled);
                }
                return Ok(None);
            }
        };

        let interpolated = interpolate_route(&updated.waypoints, self.config.interpolation_points);
        let vessel = self
            .vessels
            .get(&vessel_id)
            .ok_or_else(|| PlanError::UnknownVessel(vessel_id.clone()))?;
        let model = FuelVoyageModel::new(&vessel);

        let mut legs = Vec::with_capacity(interpolated.len().saturating_sub(1));
        for pair in interpolated.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let distance_nm = a.haversine_nm(&b);
            let midpoint = geodesy::lerp(&a, &b, 0.5);
            let weather_factor = self.weather.sample(&midpoint, 0, Utc::now()).cost_multiplier();
            let hazard_report = self.hazards.evaluate_point(&midpoint, 1, &self.atlas, &self.grid);
            let combined_factor = if hazard_report.cost_multiplier.is_finite() {
                weather_factor * hazard_report.cost_multiplier
            } else {
                weather_factor
            };
            legs.push(model.segment_cost(distance_nm, vessel.design_speed_knots, combined_factor, 1.0)?);
        }
        let metrics = voyage::accumulate(&legs);
        let hazard_route_report = self.hazards.evaluate_route(&interpolated, 1, &self.atlas, &self.grid);

        if metrics.distance_nm > previous_cost_nm * 1.5 {
            log::warn!(
                "replan for route {:?} raised distance from {:.1} nm to {:.1} nm",
                route_id,
                previous_cost_nm,
                metrics.distance_nm
            );
        }

        self.routes.lock().unwrap().insert(
            route_id.0,
            StoredRoute {
                start,
                goal,
                vessel_id: vessel_id.clone(),
                waypoints: interpolated.clone(),
                cost_nm: metrics.distance_nm,
            },
        );

        Ok(Some(PlanResult {
            route_id,
            waypoints: interpolated,
            metrics,
            diagnostics: PlanDiagnostics {
                algorithm_selected: "incremental_replanner",
                iterations_budget: self.config.replan_max_iterations,
                efficiency_vs_straight_line: if metrics.distance_nm > 0.0 {
                    straight_line_nm / metrics.distance_nm
                } else {
                    1.0
                },
                straight_line_nm,
                route_distance_nm: metrics.distance_nm,
                risk_assessment: hazard_route_report.risk_assessment,
            },
        }))
    }

    /// Hazard report for a single point (spec.md §6 operation 3).
    pub fn evaluate_waypoint_hazard(&self, point: Coordinate, month: Option<u32>) -> PointHazardReport {
        self.hazards.evaluate_point(&point, month.unwrap_or(1), &self.atlas, &self.grid)
    }

    /// Injects a dynamic hazard zone (spec.md §4.4), e.g. a cyclone
    /// warning arriving mid-voyage. Visible to every hazard evaluation
    /// and to `replan_route`'s hazard reporting made after this call.
    pub fn add_hazard_zone(&self, zone: HazardZone) -> u64 {
        self.hazards.add_dynamic_zone(zone)
    }

    /// Removes a previously injected dynamic hazard zone.
    pub fn remove_hazard_zone(&self, id: u64) -> bool {
        self.hazards.remove_dynamic_zone(id)
    }

    /// Hazard report across a whole polyline (spec.md §6 operation 4).
    pub fn evaluate_route_hazards(&self, waypoints: &[Coordinate], month: Option<u32>) -> RouteHazardReport {
        self.hazards.evaluate_route(waypoints, month.unwrap_or(1), &self.atlas, &self.grid)
    }

    /// Standalone fuel estimate for a fixed distance/speed (spec.md §6
    /// operation 5), independent of any planned route.
    pub fn fuel_estimate(&self, vessel_id: &str, distance_nm: f64, avg_speed_kt: f64, weather_factor: f64) -> Result<VoyageMetrics> {
        let vessel = self.vessels.get(vessel_id).ok_or_else(|| PlanError::UnknownVessel(vessel_id.to_string()))?;
        let model = FuelVoyageModel::new(&vessel);
        model.segment_cost(distance_nm, avg_speed_kt, weather_factor, 1.0)
    }
}

/// Linear densification to roughly `target_points` output points,
/// keeping every original waypoint as an exact sample (spec.md §4.10).
fn interpolate_route(waypoints: &[Coordinate], target_points: usize) -> Vec<Coordinate> {
    if waypoints.len() < 2 || target_points <= waypoints.len() {
        return waypoints.to_vec();
    }

    let total_length_nm: f64 = waypoints.windows(2).map(|w| w[0].haversine_nm(&w[1])).sum();
    if total_length_nm <= 0.0 {
        return waypoints.to_vec();
    }

    let extra_points = target_points - waypoints.len();
    let mut result = Vec::with_capacity(target_points);
    for pair in waypoints.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        result.push(a);
        let segment_nm = a.haversine_nm(&b);
        let segment_extra = ((segment_nm / total_length_nm) * extra_points as f64).round() as usize;
        for k in 1..=segment_extra {
            let t = k as f64 / (segment_extra + 1) as f64;
            result.push(geodesy::lerp(&a, &b, t));
        }
    }
    result.push(*waypoints.last().unwrap());
    result
}

/// FNV-1a-style 64-bit mix over `(start, goal, vessel_id)` (spec.md §3's
/// resolved Open Question for deterministic seed derivation when the
/// caller does not supply one).
fn derive_seed(start: &Coordinate, goal: &Coordinate, vessel_id: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    let mut mix_bytes = |bytes: &[u8]| {
        for &b in bytes {
            hash ^= b as u64;
            hash = hash.wrapping_mul(PRIME);
        }
    };

    mix_bytes(&start.lat.to_bits().to_le_bytes());
    mix_bytes(&start.lon.to_bits().to_le_bytes());
    mix_bytes(&goal.lat.to_bits().to_le_bytes());
    mix_bytes(&goal.lon.to_bits().to_le_bytes());
    mix_bytes(vessel_id.as_bytes());
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_route_mumbai_to_chennai() {
        let orchestrator = RouteOrchestrator::default();
        let request = PlanRequest::new(Coordinate::new(19.076, 72.877), Coordinate::new(13.194, 80.282), "container_10000");
        let result = orchestrator.plan_route(request).expect("plan should succeed");

        assert!(result.waypoints.len() >= 10);
        assert!(result.metrics.distance_nm > 1000.0 && result.metrics.distance_nm < 3000.0);
        assert!(result.metrics.fuel_tons > 0.0);
    }

    #[test]
    fn plan_route_rejects_invalid_coordinate() {
        let orchestrator = RouteOrchestrator::default();
        let request = PlanRequest::new(Coordinate::new(200.0, 0.0), Coordinate::new(0.0, 0.0), "container_10000");
        assert!(matches!(orchestrator.plan_route(request), Err(PlanError::InvalidCoordinate { .. })));
    }

    #[test]
    fn plan_route_rejects_unknown_vessel() {
        let orchestrator = RouteOrchestrator::default();
        let request = PlanRequest::new(Coordinate::new(-10.0, 70.0), Coordinate::new(-8.0, 72.0), "not_a_vessel");
        assert!(matches!(orchestrator.plan_route(request), Err(PlanError::UnknownVessel(_))));
    }

    #[test]
    fn plan_route_same_start_and_goal_is_degenerate() {
        let orchestrator = RouteOrchestrator::default();
        let point = Coordinate::new(-10.0, 70.0);
        let request = PlanRequest::new(point, point, "container_10000");
        let result = orchestrator.plan_route(request).unwrap();
        assert_eq!(result.waypoints, vec![point]);
        assert_eq!(result.metrics.distance_nm, 0.0);
        assert_eq!(result.metrics.fuel_tons, 0.0);
    }

    #[test]
    fn plan_route_is_idempotent_for_identical_inputs() {
        let orchestrator = RouteOrchestrator::default();
        let start = Coordinate::new(-10.0, 70.0);
        let goal = Coordinate::new(-8.0, 72.0);
        let r1 = orchestrator.plan_route(PlanRequest::new(start, goal, "container_10000").with_seed(99)).unwrap();
        let r2 = orchestrator.plan_route(PlanRequest::new(start, goal, "container_10000").with_seed(99)).unwrap();
        assert_eq!(r1.waypoints.len(), r2.waypoints.len());
        assert!((r1.metrics.distance_nm - r2.metrics.distance_nm).abs() < 1e-6);
    }

    #[test]
    fn fuel_estimate_speed_sensitivity() {
        let orchestrator = RouteOrchestrator::default();
        let slow = orchestrator.fuel_estimate("container_10000", 5000.0, 10.0, 1.0).unwrap();
        let fast = orchestrator.fuel_estimate("container_10000", 5000.0, 19.0, 1.0).unwrap();
        let ratio = fast.fuel_tons / slow.fuel_tons;
        assert!(ratio >= 3.0 && ratio <= 8.0, "ratio was {ratio}");
    }

    #[test]
    fn evaluate_waypoint_hazard_flags_land() {
        let orchestrator = RouteOrchestrator::default();
        let report = orchestrator.evaluate_waypoint_hazard(Coordinate::new(20.0, 78.0), None);
        assert!(report.is_hazardous);
    }

    #[test]
    fn algorithm_hint_forces_grid_astar() {
        let orchestrator = RouteOrchestrator::default();
        let request = PlanRequest::new(Coordinate::new(-10.0, 70.0), Coordinate::new(-9.0, 71.0), "container_10000")
            .with_algorithm_hint(AlgorithmHint::GridAStarOnly);
        let result = orchestrator.plan_route(request).unwrap();
        assert_eq!(result.diagnostics.algorithm_selected, "grid_astar");
    }

    #[test]
    fn plan_route_honors_pre_cancelled_token() {
        let orchestrator = RouteOrchestrator::default();
        let token = crate::error::CancellationToken::new();
        token.cancel();
        let request = PlanRequest::new(Coordinate::new(-10.0, 70.0), Coordinate::new(-8.0, 72.0), "container_10000")
            .with_cancellation_token(token);
        assert!(matches!(orchestrator.plan_route(request), Err(PlanError::Cancelled)));
    }

    #[test]
    fn replan_route_rejects_unknown_route_id() {
        let orchestrator = RouteOrchestrator::default();
        let result = orchestrator.replan_route(RouteId(999_999), &[]);
        assert!(matches!(result, Err(PlanError::ReplanInfeasible)));
    }

    #[test]
    fn replan_route_with_cyclone_injection_avoids_critical_core() {
        use crate::hazard::{HazardLevel, HazardType, HazardZone};

        let orchestrator = RouteOrchestrator::default();
        let start = Coordinate::new(12.0, 85.0);
        let goal = Coordinate::new(18.0, 91.0);
        let planned = orchestrator.plan_route(PlanRequest::new(start, goal, "container_10000")).unwrap();

        let cyclone_center = Coordinate::new(15.0, 88.0);
        orchestrator.add_hazard_zone(HazardZone::new(
            "Injected Cyclone",
            HazardType::Cyclone,
            cyclone_center.lat,
            cyclone_center.lon,
            8.0,
            HazardLevel::Critical,
            &[],
            5.0,
        ));

        // Treat the cyclone's core as a newly obstructed region for the
        // incremental replanner, matching spec.md §8 scenario 3's
        // "cyclone injection" forcing a reroute.
        let obstacles: Vec<Coordinate> = (-2..=2)
            .flat_map(|dlat| (-2..=2).map(move |dlon| (dlat, dlon)))
            .map(|(dlat, dlon)| Coordinate::new(cyclone_center.lat + dlat as f64, cyclone_center.lon + dlon as f64))
            .collect();

        let replanned = orchestrator
            .replan_route(planned.route_id, &obstacles)
            .unwrap()
            .expect("replan should find an alternative route around the cyclone");

        let report = orchestrator.evaluate_route_hazards(&replanned.waypoints, None);
        assert!(report.max_severity <= HazardLevel::High);
        assert!(!replanned
            .waypoints
            .iter()
            .any(|w| (w.lat - cyclone_center.lat).abs() < 1e-6 && (w.lon - cyclone_center.lon).abs() < 1e-6));
    }

    #[test]
    fn replan_route_preserves_or_improves_cost_with_no_changes() {
        let orchestrator = RouteOrchestrator::default();
        let request = PlanRequest::new(Coordinate::new(-10.0, 70.0), Coordinate::new(-9.5, 70.5), "container_10000");
        let planned = orchestrator.plan_route(request).unwrap();

        let replanned = orchestrator.replan_route(planned.route_id, &[]).unwrap();
        assert!(replanned.is_some());
    }
}
