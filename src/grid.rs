//! Hierarchical ocean grid (spec.md C3): two-level cell lattice with
//! land/water/shallow/hazard classification and A*-ready traversal cost.
//!
//! Level 1 (1.0°, ~60 nm) cells back the bidirectional sampling planner's
//! coarse water bias and the grid A* fallback; Level 2 (0.1°, ~6 nm)
//! cells are available for local refinement in straits and channels, as
//! in the donor's `router.rs` coarse/fine mask split.

use std::collections::HashMap;

use log::info;
use rayon::prelude::*;

use crate::config::PlanningConfig;
use crate::geodesy::Coordinate;
use crate::land::LandAtlas;

/// Classification of a single ocean grid cell (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    Land,
    Shallow,
    Hazard,
    Water,
    Unknown,
}

impl CellType {
    /// Base traversal cost multiplier; `f64::INFINITY` for land.
    pub fn base_cost(self) -> f64 {
        match self {
            CellType::Water => 1.0,
            CellType::Shallow => 3.0,
            CellType::Hazard => 2.5,
            CellType::Land => f64::INFINITY,
            CellType::Unknown => 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridCell {
    pub lat: f64,
    pub lon: f64,
    pub level: u8,
    pub cell_type: CellType,
    pub depth_m: f64,
    pub cost: f64,
    pub weather_factor: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct GridStatistics {
    pub total_cells: usize,
    pub level: u8,
    pub resolution_degrees: f64,
    pub water_cells: usize,
    pub shallow_cells: usize,
    pub hazard_cells: usize,
    pub land_cells: usize,
    pub navigable_cells: usize,
    pub coverage_percent: f64,
}

/// A single ocean grid at a fixed resolution. Cells are keyed by integer
/// lattice indices (not raw floats) to keep lookups exact.
pub struct OceanGrid {
    level: u8,
    resolution: f64,
    bounds: crate::config::OceanBounds,
    cells: HashMap<(i64, i64), GridCell>,
}

impl OceanGrid {
    /// Builds and classifies a full grid at the given level (1 = coarse
    /// 1.0°, 2 = fine 0.1°) against `atlas`, covering the configured
    /// ocean bounds. Level-1 classification samples every 4th cell for
    /// speed, conservatively assuming water for the rest, matching the
    /// reference implementation's fast-mode tradeoff; Level-2 classifies
    /// every cell.
    pub fn build(level: u8, config: &PlanningConfig, atlas: &LandAtlas) -> Self {
        Self::build_windowed(level, config, atlas, config.ocean_bounds)
    }

    /// Same as [`Self::build`] but classifies only `bounds`, clamped to
    /// the configured ocean extent. Used to build a local Level-2 lattice
    /// around a single start/goal pair instead of the whole ocean
    /// (spec.md §4.7), since a per-request global Level-2 grid would
    /// classify millions of cells just to discard all but a small window.
    pub fn build_windowed(level: u8, config: &PlanningConfig, atlas: &LandAtlas, bounds: crate::config::OceanBounds) -> Self {
        let resolution = if level == 1 {
            config.level1_resolution_deg
        } else {
            config.level2_resolution_deg
        };
        let bounds = crate::config::OceanBounds {
            min_lat: bounds.min_lat.max(config.ocean_bounds.min_lat),
            max_lat: bounds.max_lat.min(config.ocean_bounds.max_lat),
            min_lon: bounds.min_lon.max(config.ocean_bounds.min_lon),
            max_lon: bounds.max_lon.min(config.ocean_bounds.max_lon),
        };

        let mut cells = HashMap::new();
        let mut lat = bounds.min_lat;
        while lat <= bounds.max_lat {
            let mut lon = bounds.min_lon;
            while lon <= bounds.max_lon {
                let key = Self::index_of(lat, lon, resolution);
                cells.insert(
                    key,
                    GridCell {
                        lat,
                        lon,
                        level,
                        cell_type: CellType::Unknown,
                        depth_m: 0.0,
                        cost: 1.0,
                        weather_factor: 1.0,
                    },
                );
                lon += resolution;
            }
            lat += resolution;
        }

        info!("ocean grid: initialized {} cells at level-{}", cells.len(), level);

        let sample_rate: usize = if level == 1 { 4 } else { 1 };
        if sample_rate == 1 {
            // Level-2 classifies every cell against the land atlas; each
            // cell's point-in-polygon test is independent, so this runs
            // across the rayon pool rather than sequentially, mirroring
            // the donor router's `par_iter` front-expansion.
            cells.par_iter_mut().for_each(|(_, cell)| {
                if atlas.on_land(&Coordinate::new(cell.lat, cell.lon)) {
                    cell.cell_type = CellType::Land;
                    cell.cost = f64::INFINITY;
                } else {
                    cell.cell_type = CellType::Water;
                    cell.cost = CellType::Water.base_cost();
                }
            });
        } else {
            for (i, cell) in cells.values_mut().enumerate() {
                if i % sample_rate == 0 {
                    if atlas.on_land(&Coordinate::new(cell.lat, cell.lon)) {
                        cell.cell_type = CellType::Land;
                        cell.cost = f64::INFINITY;
                    } else {
                        cell.cell_type = CellType::Water;
                        cell.cost = CellType::Water.base_cost();
                    }
                } else {
                    cell.cell_type = CellType::Water;
                    cell.cost = CellType::Water.base_cost();
                }
            }
        }
        info!("ocean grid: classification complete for level-{}", level);

        let mut grid = Self {
            level,
            resolution,
            bounds,
            cells,
        };
        grid.load_depth_model();
        grid
    }

    fn index_of(lat: f64, lon: f64, resolution: f64) -> (i64, i64) {
        ((lat / resolution).round() as i64, (lon / resolution).round() as i64)
    }

    /// Simplified bathymetry model (spec.md §4.3 notes this as a
    /// placeholder for a real GEBCO/NOAA dataset): deep-ocean base depth
    /// by latitude band, with named continental-shelf overrides that can
    /// demote a cell from WATER to SHALLOW.
    fn load_depth_model(&mut self) {
        for cell in self.cells.values_mut() {
            if cell.cell_type == CellType::Land {
                cell.depth_m = 0.0;
                continue;
            }
            let (lat, lon) = (cell.lat, cell.lon);

            cell.depth_m = if lat > 60.0 || lat < -50.0 {
                3500.0
            } else if lat > 40.0 || lat < -40.0 {
                4000.0
            } else {
                3500.0
            };

            if (35.0..45.0).contains(&lat) && (-20.0..40.0).contains(&lon) {
                cell.depth_m = 200.0;
            } else if (20.0..35.0).contains(&lat) && (50.0..75.0).contains(&lon) {
                cell.depth_m = 150.0;
            } else if (5.0..20.0).contains(&lat) && (85.0..105.0).contains(&lon) {
                cell.depth_m = 100.0;
            } else if (-15.0..5.0).contains(&lat) && (95.0..140.0).contains(&lon) {
                cell.depth_m = 80.0;
            }

            if cell.depth_m < 50.0 && cell.cell_type != CellType::Land {
                cell.cell_type = CellType::Shallow;
                cell.cost = CellType::Shallow.base_cost();
            }
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.values()
    }

    pub fn get_cell(&self, point: &Coordinate) -> Option<&GridCell> {
        self.cells.get(&Self::index_of(point.lat, point.lon, self.resolution))
    }

    pub fn get_cell_mut(&mut self, point: &Coordinate) -> Option<&mut GridCell> {
        self.cells
            .get_mut(&Self::index_of(point.lat, point.lon, self.resolution))
    }

    /// Nearest non-land cell within `max_distance_deg` (planar degrees),
    /// used for snapping an endpoint onto the grid (spec.md §4.10).
    pub fn get_nearest_water_cell(&self, point: &Coordinate, max_distance_deg: f64) -> Option<&GridCell> {
        let mut best: Option<&GridCell> = None;
        let mut best_dist = f64::INFINITY;
        for cell in self.cells.values() {
            if cell.cell_type == CellType::Land {
                continue;
            }
            let dist = (cell.lat - point.lat).hypot(cell.lon - point.lon);
            if dist < best_dist && dist <= max_distance_deg {
                best_dist = dist;
                best = Some(cell);
            }
        }
        best
    }

    /// 8-connected (or 4-connected) non-land neighbors of `point`'s cell.
    pub fn neighbors(&self, point: &Coordinate, diagonal: bool) -> Vec<&GridCell> {
        let r = self.resolution;
        let mut offsets = vec![(r, 0.0), (-r, 0.0), (0.0, r), (0.0, -r)];
        if diagonal {
            offsets.extend([(r, r), (-r, r), (r, -r), (-r, -r)]);
        }

        offsets
            .into_iter()
            .filter_map(|(dlat, dlon)| {
                self.get_cell(&Coordinate::new(point.lat + dlat, point.lon + dlon))
            })
            .filter(|c| c.cell_type != CellType::Land)
            .collect()
    }

    /// Raises every non-land cell within `radius_deg` of `center` to
    /// `HAZARD` (unless already a lower-cost TSS lane) and scales its
    /// cost by `cost_multiplier` (spec.md §4.4 hazard-overlay mechanism).
    pub fn add_hazard_zone(&mut self, center: &Coordinate, radius_deg: f64, cost_multiplier: f64) {
        for cell in self.cells.values_mut() {
            let dist = (cell.lat - center.lat).hypot(cell.lon - center.lon);
            if dist <= radius_deg && cell.cell_type != CellType::Land {
                cell.cell_type = CellType::Hazard;
                cell.cost = CellType::Hazard.base_cost() * cost_multiplier;
                cell.weather_factor = cost_multiplier;
            }
        }
    }

    pub fn statistics(&self) -> GridStatistics {
        let mut water = 0;
        let mut shallow = 0;
        let mut hazard = 0;
        let mut land = 0;
        for cell in self.cells.values() {
            match cell.cell_type {
                CellType::Water => water += 1,
                CellType::Shallow => shallow += 1,
                CellType::Hazard => hazard += 1,
                CellType::Land => land += 1,
                CellType::Unknown => {}
            }
        }
        let total = self.cells.len();
        GridStatistics {
            total_cells: total,
            level: self.level,
            resolution_degrees: self.resolution,
            water_cells: water,
            shallow_cells: shallow,
            hazard_cells: hazard,
            land_cells: land,
            navigable_cells: water + shallow,
            coverage_percent: if total == 0 {
                0.0
            } else {
                (water + shallow) as f64 / total as f64 * 100.0
            },
        }
    }

    pub fn bounds(&self) -> crate::config::OceanBounds {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> PlanningConfig {
        let mut cfg = PlanningConfig::default();
        cfg.ocean_bounds = crate::config::OceanBounds {
            min_lat: -5.0,
            max_lat: 5.0,
            min_lon: -5.0,
            max_lon: 5.0,
        };
        cfg
    }

    #[test]
    fn build_produces_expected_cell_count() {
        let cfg = small_config();
        let atlas = LandAtlas::new();
        let grid = OceanGrid::build(1, &cfg, &atlas);
        // 11 steps per axis at 1.0 deg over [-5, 5].
        assert_eq!(grid.statistics().total_cells, 11 * 11);
    }

    #[test]
    fn land_cells_have_infinite_cost() {
        let cfg = small_config();
        let atlas = LandAtlas::new();
        let grid = OceanGrid::build(1, &cfg, &atlas);
        let stats = grid.statistics();
        assert_eq!(stats.land_cells + stats.water_cells + stats.shallow_cells + stats.hazard_cells, stats.total_cells);
    }

    #[test]
    fn hazard_zone_raises_cost() {
        let cfg = small_config();
        let atlas = LandAtlas::new();
        let mut grid = OceanGrid::build(1, &cfg, &atlas);
        let center = Coordinate::new(0.0, 0.0);
        grid.add_hazard_zone(&center, 2.0, 3.0);
        let cell = grid.get_cell(&center).unwrap();
        assert_eq!(cell.cell_type, CellType::Hazard);
        assert!(cell.cost > CellType::Water.base_cost());
    }

    #[test]
    fn neighbors_excludes_land() {
        let cfg = small_config();
        let atlas = LandAtlas::new();
        let grid = OceanGrid::build(1, &cfg, &atlas);
        let neighbors = grid.neighbors(&Coordinate::new(0.0, 0.0), true);
        assert!(neighbors.iter().all(|c| c.cell_type != CellType::Land));
    }
}
