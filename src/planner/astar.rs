//! Grid A* fallback planner (spec.md C8), grown from the reference
//! `MaritimeAStar`: builds a local water-only grid around the
//! start/goal bounding box and runs a standard A* search with a
//! consistent degree-distance heuristic.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::CancellationToken;
use crate::geodesy::Coordinate;
use crate::land::LandAtlas;
use crate::planner::PlannedRoute;

type CellKey = (i64, i64);

fn key_of(point: &Coordinate, resolution: f64) -> CellKey {
    (
        (point.lat / resolution).round() as i64,
        (point.lon / resolution).round() as i64,
    )
}

fn cell_coordinate(key: CellKey, resolution: f64) -> Coordinate {
    Coordinate::new(key.0 as f64 * resolution, key.1 as f64 * resolution)
}

fn degree_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    (a.lat - b.lat).hypot(a.lon - b.lon)
}

/// Wraps an `f64` priority for `BinaryHeap`, which needs a total order;
/// NaN never occurs here since all distances are finite by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Priority(f64);

impl Eq for Priority {}
impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.partial_cmp(&self.0).unwrap_or(Ordering::Equal)
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    priority: Priority,
    key: CellKey,
    g_score: f64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority
    }
}
impl Eq for OpenEntry {}
impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority)
    }
}

pub struct GridAStarPlanner<'a> {
    atlas: &'a LandAtlas,
    resolution: f64,
    bbox_padding_deg: f64,
    max_iterations: usize,
}

impl<'a> GridAStarPlanner<'a> {
    pub fn new(atlas: &'a LandAtlas, resolution: f64, bbox_padding_deg: f64, max_iterations: usize) -> Self {
        Self {
            atlas,
            resolution,
            bbox_padding_deg,
            max_iterations,
        }
    }

    fn build_water_grid(&self, start: &Coordinate, goal: &Coordinate) -> HashSet<CellKey> {
        let min_lat = start.lat.min(goal.lat) - self.bbox_padding_deg;
        let max_lat = start.lat.max(goal.lat) + self.bbox_padding_deg;
        let min_lon = start.lon.min(goal.lon) - self.bbox_padding_deg;
        let max_lon = start.lon.max(goal.lon) + self.bbox_padding_deg;

        let mut water = HashSet::new();
        let mut lat = min_lat;
        while lat <= max_lat {
            let mut lon = min_lon;
            while lon <= max_lon {
                let point = Coordinate::new(lat, lon);
                if !self.atlas.on_land(&point) {
                    water.insert(key_of(&point, self.resolution));
                }
                lon += self.resolution;
            }
            lat += self.resolution;
        }
        water
    }

    fn snap_to_grid(&self, point: &Coordinate, water: &HashSet<CellKey>) -> CellKey {
        let candidate = key_of(point, self.resolution);
        if water.contains(&candidate) {
            return candidate;
        }
        water
            .iter()
            .min_by(|a, b| {
                let da = degree_distance(point, &cell_coordinate(**a, self.resolution));
                let db = degree_distance(point, &cell_coordinate(**b, self.resolution));
                da.partial_cmp(&db).unwrap()
            })
            .copied()
            .unwrap_or(candidate)
    }

    fn neighbors(&self, key: CellKey, water: &HashSet<CellKey>) -> Vec<CellKey> {
        let mut out = Vec::with_capacity(8);
        for dlat in -1..=1 {
            for dlon in -1..=1 {
                if dlat == 0 && dlon == 0 {
                    continue;
                }
                let candidate = (key.0 + dlat, key.1 + dlon);
                if water.contains(&candidate) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    /// Runs A* from `start` to `goal`, snapping both to the nearest
    /// water cell in the local grid (spec.md §4.8). Returns `None` if
    /// no path is found within `max_iterations`.
    pub fn plan(&self, start: Coordinate, goal: Coordinate) -> Option<PlannedRoute> {
        self.plan_cancellable(start, goal, None)
    }

    /// Same as [`Self::plan`] but polls `token` at each loop head,
    /// returning `None` as soon as cancellation is observed (spec.md §5).
    pub fn plan_cancellable(
        &self,
        start: Coordinate,
        goal: Coordinate,
        token: Option<&CancellationToken>,
    ) -> Option<PlannedRoute> {
        let water = self.build_water_grid(&start, &goal);
        if water.is_empty() {
            return None;
        }

        let start_key = self.snap_to_grid(&start, &water);
        let goal_key = self.snap_to_grid(&goal, &water);

        let mut open = BinaryHeap::new();
        let mut g_scores: HashMap<CellKey, f64> = HashMap::new();
        let mut came_from: HashMap<CellKey, CellKey> = HashMap::new();
        let mut closed: HashSet<CellKey> = HashSet::new();

        g_scores.insert(start_key, 0.0);
        let start_coord = cell_coordinate(start_key, self.resolution);
        let goal_coord = cell_coordinate(goal_key, self.resolution);
        open.push(OpenEntry {
            priority: Priority(degree_distance(&start_coord, &goal_coord)),
            key: start_key,
            g_score: 0.0,
        });

        let mut iterations = 0usize;
        while let Some(current) = open.pop() {
            if token.map(|t| t.is_cancelled()).unwrap_or(false) {
                return None;
            }
            iterations += 1;
            if iterations % 1000 == 0 {
                log::debug!("grid A*: iteration {iterations}/{}, open set size {}", self.max_iterations, open.len());
            }
            if iterations > self.max_iterations {
                break;
            }
            if closed.contains(&current.key) {
                continue;
            }
            if current.key == goal_key {
                return Some(self.reconstruct(current.key, &came_from, current.g_score));
            }
            closed.insert(current.key);

            let current_coord = cell_coordinate(current.key, self.resolution);
            for neighbor in self.neighbors(current.key, &water) {
                if closed.contains(&neighbor) {
                    continue;
                }
                let neighbor_coord = cell_coordinate(neighbor, self.resolution);
                let tentative_g = current.g_score + degree_distance(&current_coord, &neighbor_coord);

                let better = g_scores.get(&neighbor).map(|&g| tentative_g < g).unwrap_or(true);
                if better {
                    g_scores.insert(neighbor, tentative_g);
                    came_from.insert(neighbor, current.key);
                    let h = degree_distance(&neighbor_coord, &goal_coord);
                    open.push(OpenEntry {
                        priority: Priority(tentative_g + h),
                        key: neighbor,
                        g_score: tentative_g,
                    });
                }
            }
        }

        None
    }

    fn reconstruct(&self, goal_key: CellKey, came_from: &HashMap<CellKey, CellKey>, cost: f64) -> PlannedRoute {
        let mut waypoints = vec![cell_coordinate(goal_key, self.resolution)];
        let mut current = goal_key;
        while let Some(&prev) = came_from.get(&current) {
            waypoints.push(cell_coordinate(prev, self.resolution));
            current = prev;
        }
        waypoints.reverse();
        PlannedRoute { waypoints, cost }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_finds_path_over_open_water() {
        let atlas = LandAtlas::new();
        let planner = GridAStarPlanner::new(&atlas, 0.5, 2.0, 10_000);
        let route = planner.plan(Coordinate::new(-10.0, 70.0), Coordinate::new(-8.0, 72.0));
        assert!(route.is_some());
        let route = route.unwrap();
        assert!(route.waypoints.len() >= 2);
        assert!(route.cost > 0.0);
    }

    #[test]
    fn plan_returns_none_when_grid_is_empty() {
        // Padding of zero over an entirely-land bounding box leaves no water cells.
        let atlas = LandAtlas::new();
        let planner = GridAStarPlanner::new(&atlas, 0.5, 0.0, 1000);
        let route = planner.plan(Coordinate::new(20.0, 78.0), Coordinate::new(20.5, 78.5));
        assert!(route.is_none());
    }
}
