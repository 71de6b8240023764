//! Cell-level A* routing over road cells.
//!
//! Search state (g, h, parent) lives in a map owned by each call, so any
//! number of searches may run over the same grid.

use crate::error::GridError;
use crate::grid::*;
use crate::location::*;
use fnv::{FnvHashMap, FnvHashSet};
use log::*;
use pathfinding::directed::bfs::bfs_reach;
use serde::{Deserialize, Serialize};

/// Distance used for both step cost and heuristic.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Sum of the first two world-space components, which ignores travel
    /// along the map's y axis. Vertical steps cost nothing, so routes are
    /// not guaranteed to be shortest.
    #[default]
    Legacy,
    Manhattan,
}

impl DistanceMetric {
    #[inline]
    pub fn distance(self, a: Location, b: Location) -> u32 {
        match self {
            DistanceMetric::Legacy => a.legacy_distance(b),
            DistanceMetric::Manhattan => a.manhattan_distance(b),
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct SearchNode {
    g: u32,
    h: u32,
    parent: Option<Location>,
}

impl SearchNode {
    #[inline]
    fn f(&self) -> u32 {
        self.g + self.h
    }
}

pub struct VehicleRouter<'a> {
    grid: &'a MapGrid,
    metric: DistanceMetric,
}

impl<'a> VehicleRouter<'a> {
    pub fn new(grid: &'a MapGrid) -> Self {
        VehicleRouter {
            grid,
            metric: DistanceMetric::default(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Find a route from `start` to `goal` through road cells.
    ///
    /// The open list is re-sorted by `g + h` before every expansion; ties
    /// keep insertion order. Returns an empty path when the goal cannot be
    /// reached. Only neighbours are required to be road cells, so the start
    /// itself may be any in-bounds cell.
    pub fn find_path(&self, start: Location, goal: Location) -> Result<Vec<Location>, GridError> {
        self.grid.get(start)?;
        self.grid.get(goal)?;

        let mut nodes: FnvHashMap<Location, SearchNode> = FnvHashMap::default();
        let mut open: Vec<Location> = vec![start];
        let mut closed: FnvHashSet<Location> = FnvHashSet::default();

        nodes.insert(
            start,
            SearchNode {
                g: 0,
                h: self.metric.distance(start, goal),
                parent: None,
            },
        );

        while !open.is_empty() {
            open.sort_by_key(|loc| nodes.get(loc).map(|n| n.f()).unwrap_or(u32::MAX));
            let current = open.remove(0);

            if current == goal {
                let path = Self::retrace(&nodes, start, goal);
                trace!(
                    "Route {} -> {}: {} cells, {} expanded",
                    start,
                    goal,
                    path.len(),
                    closed.len()
                );
                return Ok(path);
            }

            closed.insert(current);
            let current_g = nodes.get(&current).map(|n| n.g).unwrap_or(0);

            for neighbor in self.grid.neighbors(current)?.into_iter().flatten() {
                if !self.grid.is_road(neighbor) || closed.contains(&neighbor) {
                    continue;
                }

                let tentative = current_g + self.metric.distance(current, neighbor);
                let in_open = open.contains(&neighbor);
                let improves = nodes.get(&neighbor).map(|n| tentative < n.g).unwrap_or(true);

                if !in_open || improves {
                    nodes.insert(
                        neighbor,
                        SearchNode {
                            g: tentative,
                            h: self.metric.distance(neighbor, goal),
                            parent: Some(current),
                        },
                    );
                    if !in_open {
                        open.push(neighbor);
                    }
                }
            }
        }

        trace!("No route {} -> {} ({} expanded)", start, goal, closed.len());

        Ok(Vec::new())
    }

    fn retrace(nodes: &FnvHashMap<Location, SearchNode>, start: Location, goal: Location) -> Vec<Location> {
        let mut path = vec![goal];
        let mut current = goal;
        while current != start {
            match nodes.get(&current).and_then(|n| n.parent) {
                Some(parent) => {
                    path.push(parent);
                    current = parent;
                }
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Total metric cost of walking `path`.
    pub fn path_cost(&self, path: &[Location]) -> u32 {
        path.windows(2)
            .map(|pair| self.metric.distance(pair[0], pair[1]))
            .sum()
    }

    /// Every road cell connected to `start` through road cells.
    pub fn reachable(&self, start: Location) -> FnvHashSet<Location> {
        let grid = self.grid;
        bfs_reach(start, |loc| {
            grid.neighbors(*loc)
                .map(|n| n.into_iter().flatten().filter(|c| grid.is_road(*c)).collect::<Vec<_>>())
                .unwrap_or_default()
        })
        .collect()
    }
}
