//! Incremental replanner (spec.md C9), grown from the reference `DStar`:
//! an LPA*/D*-lite-style search that keeps a persistent `g`/`rhs` table
//! so a mid-voyage obstacle change (a hazard activating, a depth
//! sounding reclassifying a cell) only recomputes the part of the
//! search tree the change actually touches, instead of replanning from
//! scratch.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::config::OceanBounds;
use crate::error::CancellationToken;
use crate::geodesy::Coordinate;
use crate::land::LandAtlas;
use crate::planner::PlannedRoute;

type NodeKey = (i64, i64);

fn key_of(point: &Coordinate, step_size_deg: f64) -> NodeKey {
    (
        (point.lat / step_size_deg).round() as i64,
        (point.lon / step_size_deg).round() as i64,
    )
}

fn coordinate_of(key: NodeKey, step_size_deg: f64) -> Coordinate {
    Coordinate::new(key.0 as f64 * step_size_deg, key.1 as f64 * step_size_deg)
}

/// Degree-space distance scaled to nautical miles, matching the
/// reference's `_heuristic`/`_get_edge_cost` (60 nm per degree).
fn nm_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    (a.lat - b.lat).hypot(a.lon - b.lon) * 60.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Key(f64, f64);

impl Key {
    const INF: Key = Key(f64::INFINITY, f64::INFINITY);
}

impl Eq for Key {}
impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Key {
    /// Ascending lexicographic order on (k1, k2); ties broken by k2.
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.1.partial_cmp(&other.1).unwrap_or(Ordering::Equal))
    }
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    key: Key,
    node: NodeKey,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    // Reversed so `BinaryHeap` (a max-heap) pops the smallest key first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key.cmp(&self.key)
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeRecord {
    g: f64,
    rhs: f64,
}

impl Default for NodeRecord {
    fn default() -> Self {
        Self {
            g: f64::INFINITY,
            rhs: f64::INFINITY,
        }
    }
}

/// Incremental LPA*/D*-lite replanner (spec.md C9). Holds its own
/// persistent `g`/`rhs` table across calls to `replan` so that only the
/// nodes touched by a changed obstacle are reprocessed.
pub struct IncrementalReplanner<'a> {
    atlas: &'a LandAtlas,
    bounds: OceanBounds,
    step_size_deg: f64,
    max_iterations: usize,
    path_cap: usize,

    nodes: HashMap<NodeKey, NodeRecord>,
    open_keys: HashMap<NodeKey, Key>,
    open: BinaryHeap<HeapEntry>,
    blocked: HashSet<NodeKey>,

    start: NodeKey,
    goal: NodeKey,
}

impl<'a> IncrementalReplanner<'a> {
    pub fn new(
        atlas: &'a LandAtlas,
        bounds: OceanBounds,
        step_size_deg: f64,
        max_iterations: usize,
        path_cap: usize,
    ) -> Self {
        Self {
            atlas,
            bounds,
            step_size_deg,
            max_iterations,
            path_cap,
            nodes: HashMap::new(),
            open_keys: HashMap::new(),
            open: BinaryHeap::new(),
            blocked: HashSet::new(),
            start: (0, 0),
            goal: (0, 0),
        }
    }

    fn in_bounds(&self, point: &Coordinate) -> bool {
        point.lat >= self.bounds.min_lat
            && point.lat <= self.bounds.max_lat
            && point.lon >= self.bounds.min_lon
            && point.lon <= self.bounds.max_lon
    }

    fn traversable(&self, key: NodeKey) -> bool {
        if self.blocked.contains(&key) {
            return false;
        }
        let point = coordinate_of(key, self.step_size_deg);
        self.in_bounds(&point) && !self.atlas.on_land(&point)
    }

    fn neighbors(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(8);
        for dlat in -1..=1i64 {
            for dlon in -1..=1i64 {
                if dlat == 0 && dlon == 0 {
                    continue;
                }
                let candidate = (key.0 + dlat, key.1 + dlon);
                if self.traversable(candidate) {
                    out.push(candidate);
                }
            }
        }
        out
    }

    fn edge_cost(&self, a: NodeKey, b: NodeKey) -> f64 {
        if !self.traversable(b) {
            return f64::INFINITY;
        }
        nm_distance(&coordinate_of(a, self.step_size_deg), &coordinate_of(b, self.step_size_deg))
    }

    fn heuristic(&self, node: NodeKey) -> f64 {
        nm_distance(
            &coordinate_of(node, self.step_size_deg),
            &coordinate_of(self.start, self.step_size_deg),
        )
    }

    fn record(&mut self, key: NodeKey) -> NodeRecord {
        *self.nodes.entry(key).or_insert_with(NodeRecord::default)
    }

    fn calculate_key(&mut self, node: NodeKey) -> Key {
        let record = self.record(node);
        let min_g_rhs = record.g.min(record.rhs);
        if min_g_rhs.is_infinite() {
            return Key::INF;
        }
        Key(min_g_rhs + self.heuristic(node), min_g_rhs)
    }

    fn push_open(&mut self, node: NodeKey, key: Key) {
        self.open_keys.insert(node, key);
        self.open.push(HeapEntry { key, node });
    }

    fn remove_open(&mut self, node: NodeKey) {
        self.open_keys.remove(&node);
    }

    /// Recomputes `rhs` for `node` from its successors and re-inserts it
    /// into the open list if locally inconsistent (spec.md §4.9).
    fn update_node(&mut self, node: NodeKey) {
        if node != self.goal {
            let successors = self.neighbors(node);
            let mut best = f64::INFINITY;
            for successor in successors {
                let g = self.record(successor).g;
                let cost = self.edge_cost(node, successor);
                let candidate = g + cost;
                if candidate < best {
                    best = candidate;
                }
            }
            self.nodes.entry(node).or_insert_with(NodeRecord::default).rhs = best;
        }

        self.remove_open(node);
        let record = self.record(node);
        if (record.g - record.rhs).abs() > f64::EPSILON {
            let key = self.calculate_key(node);
            self.push_open(node, key);
        }
    }

    /// Core D*-lite loop: repeatedly settles the most locally
    /// inconsistent node until `start` is locally consistent and no
    /// remaining open node has a smaller key.
    fn compute_shortest_path(&mut self, token: Option<&CancellationToken>) -> bool {
        let mut iterations = 0usize;
        loop {
            if token.map(|t| t.is_cancelled()).unwrap_or(false) {
                return false;
            }
            iterations += 1;
            if iterations % 500 == 0 {
                log::debug!("incremental replanner: iteration {iterations}/{}, open set size {}", self.max_iterations, self.open.len());
            }
            if iterations > self.max_iterations {
                break;
            }

            let top = match self.open.pop() {
                Some(entry) => entry,
                None => break,
            };
            // Stale heap entry: this node was re-keyed or removed since
            // it was pushed. Lazy deletion, matching the reference's
            // remove-and-reheapify but idiomatic for a binary heap.
            if self.open_keys.get(&top.node) != Some(&top.key) {
                continue;
            }

            let start_key = self.calculate_key(self.start);
            let start_record = self.record(self.start);
            if top.key >= start_key && (start_record.rhs - start_record.g).abs() <= f64::EPSILON {
                self.push_open(top.node, top.key);
                break;
            }

            self.open_keys.remove(&top.node);
            let k_new = self.calculate_key(top.node);
            if top.key < k_new {
                self.push_open(top.node, k_new);
                continue;
            }

            let record = self.record(top.node);
            if record.g > record.rhs {
                self.nodes.entry(top.node).or_insert_with(NodeRecord::default).g = record.rhs;
                let predecessors = self.neighbors(top.node);
                for predecessor in predecessors {
                    self.update_node(predecessor);
                }
            } else {
                self.nodes.entry(top.node).or_insert_with(NodeRecord::default).g = f64::INFINITY;
                let mut affected = self.neighbors(top.node);
                affected.push(top.node);
                for node in affected {
                    self.update_node(node);
                }
            }
        }
        true
    }

    /// Walks the greedy-best-successor chain from `start` to `goal`,
    /// capped at `path_cap` waypoints (spec.md §4.9 cycle guard).
    fn extract_path(&mut self) -> Option<Vec<Coordinate>> {
        let mut path = vec![coordinate_of(self.start, self.step_size_deg)];
        let mut current = self.start;
        let mut steps = 0usize;

        while current != self.goal {
            steps += 1;
            if steps > self.path_cap {
                return None;
            }
            let successors = self.neighbors(current);
            if successors.is_empty() {
                return None;
            }
            let next = successors
                .into_iter()
                .min_by(|a, b| {
                    let cost_a = self.record(*a).g + self.edge_cost(current, *a);
                    let cost_b = self.record(*b).g + self.edge_cost(current, *b);
                    cost_a.partial_cmp(&cost_b).unwrap_or(Ordering::Equal)
                })
                .unwrap();
            if self.record(next).g.is_infinite() {
                return None;
            }
            path.push(coordinate_of(next, self.step_size_deg));
            current = next;
        }
        Some(path)
    }

    fn total_cost(&self, path: &[Coordinate]) -> f64 {
        path.windows(2).map(|w| nm_distance(&w[0], &w[1])).sum()
    }

    /// Initial solve from `start` to `goal`.
    pub fn plan(&mut self, start: Coordinate, goal: Coordinate) -> Option<PlannedRoute> {
        self.plan_cancellable(start, goal, None)
    }

    /// Same as [`Self::plan`] but polls `token` at each `compute_shortest_path`
    /// loop head, returning `None` as soon as cancellation is observed
    /// (spec.md §5). Shared state (`self.nodes`, `self.open`) has already
    /// been reset for the new start/goal by the time a cancellation check
    /// can fire, but nothing beyond that local state is touched.
    pub fn plan_cancellable(
        &mut self,
        start: Coordinate,
        goal: Coordinate,
        token: Option<&CancellationToken>,
    ) -> Option<PlannedRoute> {
        self.nodes.clear();
        self.open_keys.clear();
        self.open.clear();
        self.blocked.clear();

        self.start = key_of(&start, self.step_size_deg);
        self.goal = key_of(&goal, self.step_size_deg);

        self.nodes.insert(self.goal, NodeRecord { g: f64::INFINITY, rhs: 0.0 });
        let key = self.calculate_key(self.goal);
        self.push_open(self.goal, key);

        if !self.compute_shortest_path(token) {
            return None;
        }
        let waypoints = self.extract_path()?;
        let cost = self.total_cost(&waypoints);
        Some(PlannedRoute { waypoints, cost })
    }

    /// Incremental update entry point: marks `changed_obstacles` as
    /// newly blocked, re-examines only the affected nodes, and
    /// re-extracts the path from `current_position` without
    /// rediscovering the whole tree (spec.md §4.9).
    pub fn replan(&mut self, current_position: Coordinate, changed_obstacles: &[Coordinate]) -> Option<PlannedRoute> {
        self.replan_cancellable(current_position, changed_obstacles, None)
    }

    /// Same as [`Self::replan`] but polls `token` at each `compute_shortest_path`
    /// loop head (spec.md §5).
    pub fn replan_cancellable(
        &mut self,
        current_position: Coordinate,
        changed_obstacles: &[Coordinate],
        token: Option<&CancellationToken>,
    ) -> Option<PlannedRoute> {
        log::info!(
            "incremental replanner: triggered with {} changed cell(s) from ({:.2}, {:.2})",
            changed_obstacles.len(),
            current_position.lat,
            current_position.lon
        );

        self.start = key_of(&current_position, self.step_size_deg);

        for obstacle in changed_obstacles {
            let key = key_of(obstacle, self.step_size_deg);
            self.blocked.insert(key);
            let mut affected = self.neighbors_ignoring_blocked(key);
            affected.push(key);
            for node in affected {
                self.update_node(node);
            }
        }

        if !self.compute_shortest_path(token) {
            return None;
        }
        let waypoints = self.extract_path()?;
        let cost = self.total_cost(&waypoints);
        Some(PlannedRoute { waypoints, cost })
    }

    fn neighbors_ignoring_blocked(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(8);
        for dlat in -1..=1i64 {
            for dlon in -1..=1i64 {
                if dlat == 0 && dlon == 0 {
                    continue;
                }
                let candidate = (key.0 + dlat, key.1 + dlon);
                let point = coordinate_of(candidate, self.step_size_deg);
                if self.in_bounds(&point) && !self.atlas.on_land(&point) {
                    out.push(candidate);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlanningConfig;

    fn open_ocean_bounds() -> OceanBounds {
        PlanningConfig::default().ocean_bounds
    }

    #[test]
    fn plan_connects_open_water_endpoints() {
        let atlas = LandAtlas::new();
        let mut replanner = IncrementalReplanner::new(&atlas, open_ocean_bounds(), 0.5, 2_000, 1_000);
        let route = replanner.plan(Coordinate::new(-10.0, 70.0), Coordinate::new(-9.0, 71.0));
        assert!(route.is_some());
        let route = route.unwrap();
        assert_eq!(*route.waypoints.first().unwrap(), Coordinate::new(-10.0, 70.0));
        assert!(route.cost > 0.0);
    }

    #[test]
    fn replan_avoids_newly_blocked_cell_on_the_direct_line() {
        let atlas = LandAtlas::new();
        let mut replanner = IncrementalReplanner::new(&atlas, open_ocean_bounds(), 0.5, 2_000, 1_000);
        let start = Coordinate::new(-10.0, 70.0);
        let goal = Coordinate::new(-10.0, 72.0);
        let initial = replanner.plan(start, goal).expect("initial plan should succeed");

        let midpoint = Coordinate::new(-10.0, 71.0);
        let rerouted = replanner.replan(start, &[midpoint]).expect("replan should still find a route");

        assert!(!rerouted.waypoints.iter().any(|w| (w.lat - midpoint.lat).abs() < 1e-6 && (w.lon - midpoint.lon).abs() < 1e-6));
        assert!(rerouted.cost >= initial.cost);
    }
}
