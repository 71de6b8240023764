//! Converts a vehicle cell path into a walk-node route.

use crate::constants::*;
use crate::error::RouteError;
use crate::location::*;
use crate::walk::*;
use fnv::FnvHashSet;
use log::*;
use rand::seq::IndexedRandom;
use rand::Rng;

pub struct PedestrianRouteBuilder<'a> {
    walk: &'a mut WalkGraph,
    corner_hop_limit: usize,
    direction_threshold: f32,
}

impl<'a> PedestrianRouteBuilder<'a> {
    pub fn new(walk: &'a mut WalkGraph) -> Self {
        PedestrianRouteBuilder {
            walk,
            corner_hop_limit: CORNER_HOP_LIMIT,
            direction_threshold: STEP_DIRECTION_THRESHOLD,
        }
    }

    /// Build a node route following `cell_path`.
    ///
    /// Starts at a random sidewalk node of the first cell, then for each
    /// cell appends the sidewalk node nearest the current tail. Between
    /// cells, corner cells trace their sidewalk curve; other cells append
    /// the tail's connections that point along the direction of travel.
    /// Nodes chosen as cell entries are flagged `LAZY_CONNECTED`, corner
    /// entries `CORNER_START`.
    pub fn build<R: Rng + ?Sized>(
        &mut self,
        cell_path: &[Location],
        rng: &mut R,
    ) -> Result<Vec<WalkNodeId>, RouteError> {
        let Some(first) = cell_path.first() else {
            return Ok(Vec::new());
        };

        let mut sidewalks: Vec<WalkNodeId> = Vec::new();
        for id in self.cell_graph(*first)?.nodes() {
            if self.node(*id)?.is_sidewalk() {
                sidewalks.push(*id);
            }
        }
        let start = *sidewalks.choose(rng).ok_or(RouteError::NoSidewalk(*first))?;

        let mut route = vec![start];
        let mut visited: FnvHashSet<WalkNodeId> = FnvHashSet::default();
        visited.insert(start);

        for (index, loc) in cell_path.iter().enumerate() {
            let tail = route[route.len() - 1];
            let tail_position = self.node(tail)?.position();
            let cell = self.cell_graph(*loc)?;
            let is_corner = cell.is_corner();

            let entry = self
                .walk
                .nearest(cell, tail_position, true)
                .ok_or(RouteError::NoSidewalk(*loc))?;
            let corner_start = if is_corner {
                self.walk.nearest(cell, self.node(entry)?.position(), false)
            } else {
                None
            };

            self.walk.insert_flags(entry, WalkNodeFlags::LAZY_CONNECTED);
            route.push(entry);
            visited.insert(entry);

            let Some(next) = cell_path.get(index + 1) else {
                break;
            };
            let direction = (next.world_center() - loc.world_center()).normalize_or_zero();

            match corner_start {
                Some(corner_start) => {
                    self.trace_corner(corner_start, &mut route, &mut visited)?;
                }
                None => {
                    let tail = route[route.len() - 1];
                    let tail_node = self.node(tail)?;
                    let origin = tail_node.position();
                    let mut ahead = Vec::new();
                    for id in tail_node.connected() {
                        let step = (self.node(*id)?.position() - origin).normalize_or_zero();
                        if step.dot(direction) > self.direction_threshold {
                            ahead.push(*id);
                        }
                    }
                    for id in ahead {
                        route.push(id);
                        visited.insert(id);
                    }
                }
            }
        }

        trace!("Walk route over {} cells: {} nodes", cell_path.len(), route.len());

        Ok(route)
    }

    fn cell_graph(&self, loc: Location) -> Result<&CellWalkGraph, RouteError> {
        match self.walk.cell(loc) {
            Some(cell) if !cell.is_empty() => Ok(cell),
            _ => Err(RouteError::MissingWalkGraph(loc)),
        }
    }

    fn node(&self, id: WalkNodeId) -> Result<&WalkNode, RouteError> {
        self.walk.node(id).ok_or(RouteError::UnknownNode(id))
    }

    // Greedy walk through connections from the corner entry. Each hop appends
    // every unvisited connection of the current node and moves to the last
    // one appended.
    fn trace_corner(
        &mut self,
        corner_start: WalkNodeId,
        route: &mut Vec<WalkNodeId>,
        visited: &mut FnvHashSet<WalkNodeId>,
    ) -> Result<(), RouteError> {
        self.walk.insert_flags(corner_start, WalkNodeFlags::CORNER_START);
        route.push(corner_start);
        visited.insert(corner_start);

        let mut current = corner_start;
        for _ in 0..self.corner_hop_limit {
            let connected = self.node(current)?.connected().to_vec();
            let mut moved = false;
            for id in connected {
                if visited.insert(id) {
                    route.push(id);
                    current = id;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }

        Ok(())
    }
}

/// Build a walk route for `cell_path` over `walk`.
pub fn build_route<R: Rng + ?Sized>(
    walk: &mut WalkGraph,
    cell_path: &[Location],
    rng: &mut R,
) -> Result<Vec<WalkNodeId>, RouteError> {
    PedestrianRouteBuilder::new(walk).build(cell_path, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RoadClassifier;
    use crate::grid::*;
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn walk_for(rows: &[&str]) -> (MapGrid, WalkGraph) {
        let mut grid = MapGrid::from_ascii(rows).unwrap();
        grid.assign_neighbors();
        RoadClassifier::new()
            .with_roundabout_chance(0)
            .classify(&mut grid, &mut StdRng::seed_from_u64(0))
            .unwrap();
        let walk = WalkGraphBuilder::new(&grid).build();
        (grid, walk)
    }

    #[test]
    fn empty_cell_path_gives_empty_route() {
        let mut walk = WalkGraph::new();
        let route = build_route(&mut walk, &[], &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(route.is_empty());
    }

    #[test]
    fn missing_cell_graph_is_an_error() {
        let (_, mut walk) = walk_for(&["##"]);
        let path = [Location::new(0, 0), Location::new(1, 0), Location::new(2, 0)];
        assert_eq!(
            build_route(&mut walk, &path, &mut StdRng::seed_from_u64(2)).unwrap_err(),
            RouteError::MissingWalkGraph(Location::new(2, 0))
        );
    }

    #[test]
    fn cell_without_sidewalks_is_an_error() {
        let mut walk = WalkGraph::new();
        let cross = walk.add_node(WalkNodeKind::Crosswalk, Vec3::ZERO);
        walk.assign_cell(Location::new(0, 0), CellWalkGraph::new(vec![cross], false));
        assert_eq!(
            build_route(&mut walk, &[Location::new(0, 0)], &mut StdRng::seed_from_u64(3)).unwrap_err(),
            RouteError::NoSidewalk(Location::new(0, 0))
        );
    }

    #[test]
    fn foreign_node_id_is_an_error() {
        let mut walk = WalkGraph::new();
        let a = walk.add_node(WalkNodeKind::Sidewalk, Vec3::ZERO);
        let stray = WalkNodeId(99);
        walk.assign_cell(Location::new(0, 0), CellWalkGraph::new(vec![a, stray], false));
        assert_eq!(
            build_route(&mut walk, &[Location::new(0, 0)], &mut StdRng::seed_from_u64(3)).unwrap_err(),
            RouteError::UnknownNode(stray)
        );
    }

    #[test]
    fn route_ends_are_sidewalks() {
        let (_, mut walk) = walk_for(&["#####", "#...#", "#####"]);
        let path: Vec<Location> = (0..5).map(|x| Location::new(x, 0)).collect();
        for seed in 0..8 {
            let route = build_route(&mut walk, &path, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert!(walk[route[0]].is_sidewalk());
            assert!(walk[*route.last().unwrap()].is_sidewalk());
        }
    }

    #[test]
    fn straight_steps_follow_travel_direction() {
        // The tail has one connection ahead and one sideways.
        let mut walk = WalkGraph::new();
        let a = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(-0.4, 0.0, -0.4));
        let ahead = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(0.4, 0.0, -0.4));
        let side = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(-0.4, 0.0, 0.4));
        walk.connect(a, ahead);
        walk.connect(a, side);
        walk.assign_cell(Location::new(0, 0), CellWalkGraph::new(vec![a], false));
        let b = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(0.6, 0.0, -0.4));
        walk.assign_cell(Location::new(1, 0), CellWalkGraph::new(vec![b], false));

        let path = [Location::new(0, 0), Location::new(1, 0)];
        let route = build_route(&mut walk, &path, &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(route, vec![a, a, ahead, b]);
        assert!(walk[a].flags().contains(WalkNodeFlags::LAZY_CONNECTED));
        assert!(walk[b].flags().contains(WalkNodeFlags::LAZY_CONNECTED));
        assert!(!walk[side].flags().contains(WalkNodeFlags::LAZY_CONNECTED));
    }

    #[test]
    fn several_aligned_connections_are_all_appended() {
        let mut walk = WalkGraph::new();
        let a = walk.add_node(WalkNodeKind::Sidewalk, Vec3::ZERO);
        let near = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(0.0, 0.0, 0.3));
        let far = walk.add_node(WalkNodeKind::Crosswalk, Vec3::new(0.05, 0.0, 0.6));
        let back = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(0.0, 0.0, -0.3));
        for id in [near, far, back] {
            walk.connect(a, id);
        }
        walk.assign_cell(Location::new(0, 0), CellWalkGraph::new(vec![a], false));
        let b = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(0.0, 0.0, 1.0));
        walk.assign_cell(Location::new(0, 1), CellWalkGraph::new(vec![b], false));

        let path = [Location::new(0, 0), Location::new(0, 1)];
        let route = build_route(&mut walk, &path, &mut StdRng::seed_from_u64(6)).unwrap();
        assert_eq!(route, vec![a, a, near, far, b]);
    }

    #[test]
    fn corner_traces_its_curve() {
        // Only the entry is listed on the cell; the curve is reached through
        // its connections.
        let mut walk = WalkGraph::new();
        let entry = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(0.0, 0.0, 0.0));
        let mid = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(0.0, 0.0, -1.0));
        let exit = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(1.0, 0.0, -1.0));
        walk.connect_both(entry, mid);
        walk.connect_both(mid, exit);
        walk.assign_cell(Location::new(0, 0), CellWalkGraph::new(vec![entry], true));
        let next = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(2.0, 0.0, -1.0));
        walk.assign_cell(Location::new(1, 0), CellWalkGraph::new(vec![next], false));

        let path = [Location::new(0, 0), Location::new(1, 0)];
        let route = build_route(&mut walk, &path, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(route, vec![entry, entry, entry, mid, exit, next]);
        assert!(walk[entry].flags().contains(WalkNodeFlags::CORNER_START));
    }

    #[test]
    fn corner_walk_respects_hop_limit() {
        let mut walk = WalkGraph::new();
        let chain: Vec<WalkNodeId> = (0..40)
            .map(|i| walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(0.0, 0.0, -(i as f32))))
            .collect();
        for pair in chain.windows(2) {
            walk.connect(pair[0], pair[1]);
        }
        walk.assign_cell(Location::new(0, 0), CellWalkGraph::new(vec![chain[0]], true));
        let end = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(1.0, 0.0, 0.0));
        walk.assign_cell(Location::new(1, 0), CellWalkGraph::new(vec![end], false));

        let route = build_route(
            &mut walk,
            &[Location::new(0, 0), Location::new(1, 0)],
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();
        // start, entry, corner start, then one node per hop, then the next cell.
        assert_eq!(route.len(), 3 + CORNER_HOP_LIMIT + 1);
        assert_eq!(route[3 + CORNER_HOP_LIMIT - 1], chain[CORNER_HOP_LIMIT]);
    }
}
