//! Crate-wide tunables, held as plain struct fields constructed via
//! `Default`, in the donor's style of holding parameters directly on
//! `IsochroneRouter`/`RoutingState` rather than through an external
//! config-file layer.

/// Ocean grid bounds (spec.md §4.3).
#[derive(Debug, Clone, Copy)]
pub struct OceanBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for OceanBounds {
    fn default() -> Self {
        Self {
            min_lat: -60.0,
            max_lat: 85.0,
            min_lon: -180.0,
            max_lon: 180.0,
        }
    }
}

/// One row of the distance-adaptive planner parameter table (spec.md §4.7).
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveRow {
    pub max_distance_nm: f64,
    pub iterations: usize,
    pub step_nm: f64,
    pub goal_bias: f64,
}

#[derive(Debug, Clone)]
pub struct PlanningConfig {
    pub ocean_bounds: OceanBounds,
    pub level1_resolution_deg: f64,
    pub level2_resolution_deg: f64,
    /// Rows are consulted in order; the first row whose `max_distance_nm`
    /// exceeds the straight-line distance wins. The last row (with
    /// `max_distance_nm = f64::INFINITY`) is the catch-all.
    pub adaptive_table: Vec<AdaptiveRow>,
    pub near_neighbor_radius_deg: f64,
    pub sampling_bbox_margin_deg: f64,
    pub astar_grid_resolution_deg: f64,
    pub astar_bbox_padding_deg: f64,
    pub astar_max_iterations: usize,
    pub replan_max_iterations: usize,
    pub replan_path_cap: usize,
    pub interpolation_points: usize,
    pub co2_per_fuel_ton: f64,
    pub weather_cache_ttl_s: i64,
    pub weather_provider_timeout_s: u64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            ocean_bounds: OceanBounds::default(),
            level1_resolution_deg: 1.0,
            level2_resolution_deg: 0.1,
            adaptive_table: vec![
                AdaptiveRow { max_distance_nm: 500.0, iterations: 400, step_nm: 10.0, goal_bias: 0.50 },
                AdaptiveRow { max_distance_nm: 1000.0, iterations: 300, step_nm: 20.0, goal_bias: 0.35 },
                AdaptiveRow { max_distance_nm: 2000.0, iterations: 200, step_nm: 25.0, goal_bias: 0.20 },
                AdaptiveRow { max_distance_nm: f64::INFINITY, iterations: 150, step_nm: 30.0, goal_bias: 0.20 },
            ],
            near_neighbor_radius_deg: 1.0,
            sampling_bbox_margin_deg: 3.0,
            astar_grid_resolution_deg: 0.5,
            astar_bbox_padding_deg: 2.0,
            astar_max_iterations: 10_000,
            replan_max_iterations: 2_000,
            replan_path_cap: 1_000,
            interpolation_points: 100,
            co2_per_fuel_ton: 3.17,
            weather_cache_ttl_s: 3600,
            weather_provider_timeout_s: 5,
        }
    }
}

impl PlanningConfig {
    /// Looks up the adaptive-parameter row for a straight-line distance (spec.md §4.7).
    pub fn adaptive_row(&self, straight_line_nm: f64) -> AdaptiveRow {
        for row in &self.adaptive_table {
            if straight_line_nm < row.max_distance_nm {
                return *row;
            }
        }
        *self.adaptive_table.last().expect("adaptive_table must not be empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_row_selects_by_distance() {
        let cfg = PlanningConfig::default();
        assert_eq!(cfg.adaptive_row(200.0).iterations, 400);
        assert_eq!(cfg.adaptive_row(800.0).iterations, 300);
        assert_eq!(cfg.adaptive_row(1500.0).iterations, 200);
        assert_eq!(cfg.adaptive_row(5000.0).iterations, 150);
    }
}
