//! Pedestrian walk-node graph.
//!
//! Every road cell owns a small local graph of sidewalk and crosswalk
//! nodes. Nodes live in one arena (`WalkGraph::nodes`) and are referenced
//! by `WalkNodeId`; a cell's local graph is the list of ids it owns plus
//! a corner flag. Connections are directed and usually stay inside a cell.

use crate::constants::*;
use crate::grid::*;
use crate::location::*;
use crate::signal::SignalId;
use bitflags::*;
use fnv::{FnvHashMap, FnvHashSet};
use glam::Vec3;
use log::*;
use serde::{Deserialize, Serialize};
use std::ops::Index;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd, Serialize, Deserialize)]
pub struct WalkNodeId(pub usize);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum WalkNodeKind {
    Sidewalk,
    Crosswalk,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct WalkNodeFlags: u8 {
        const NONE = 0;
        const PEDESTRIAN_SHOULD_WAIT = 1;
        const LAZY_CONNECTED = 2;
        const CORNER_START = 4;
    }
}

#[derive(Clone, Debug)]
pub struct WalkNode {
    kind: WalkNodeKind,
    position: Vec3,
    connected: Vec<WalkNodeId>,
    flags: WalkNodeFlags,
    signal: Option<SignalId>,
}

impl WalkNode {
    pub fn new(kind: WalkNodeKind, position: Vec3) -> Self {
        WalkNode {
            kind,
            position,
            connected: Vec::new(),
            flags: WalkNodeFlags::NONE,
            signal: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> WalkNodeKind {
        self.kind
    }

    #[inline]
    pub fn is_sidewalk(&self) -> bool {
        self.kind == WalkNodeKind::Sidewalk
    }

    #[inline]
    pub fn is_crosswalk(&self) -> bool {
        self.kind == WalkNodeKind::Crosswalk
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn connected(&self) -> &[WalkNodeId] {
        &self.connected
    }

    pub fn flags(&self) -> WalkNodeFlags {
        self.flags
    }

    #[inline]
    pub fn should_wait(&self) -> bool {
        self.flags.contains(WalkNodeFlags::PEDESTRIAN_SHOULD_WAIT)
    }

    /// The intersection signal governing this node, if any.
    pub fn signal(&self) -> Option<SignalId> {
        self.signal
    }
}

/// The nodes belonging to one road cell.
#[derive(Clone, Debug, Default)]
pub struct CellWalkGraph {
    nodes: Vec<WalkNodeId>,
    is_corner: bool,
    crossings: [Vec<WalkNodeId>; 4],
}

impl CellWalkGraph {
    pub fn new(nodes: Vec<WalkNodeId>, is_corner: bool) -> Self {
        CellWalkGraph {
            nodes,
            is_corner,
            crossings: Default::default(),
        }
    }

    pub fn nodes(&self) -> &[WalkNodeId] {
        &self.nodes
    }

    pub fn is_corner(&self) -> bool {
        self.is_corner
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Crosswalk nodes spanning the road arm on the given side.
    pub fn crossings(&self, side: Direction) -> &[WalkNodeId] {
        &self.crossings[side.index()]
    }

    pub fn has_crossings(&self) -> bool {
        self.crossings.iter().any(|c| !c.is_empty())
    }

    pub fn set_crossings(&mut self, side: Direction, nodes: Vec<WalkNodeId>) {
        self.crossings[side.index()] = nodes;
    }
}

#[derive(Clone, Debug, Default)]
pub struct WalkGraph {
    nodes: Vec<WalkNode>,
    cells: FnvHashMap<Location, CellWalkGraph>,
}

impl WalkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, kind: WalkNodeKind, position: Vec3) -> WalkNodeId {
        let id = WalkNodeId(self.nodes.len());
        self.nodes.push(WalkNode::new(kind, position));
        id
    }

    /// Add a one-way connection `from -> to`. Duplicate edges and edges
    /// touching unknown nodes are ignored.
    pub fn connect(&mut self, from: WalkNodeId, to: WalkNodeId) {
        if to.0 >= self.nodes.len() {
            return;
        }
        if let Some(node) = self.nodes.get_mut(from.0) {
            if !node.connected.contains(&to) {
                node.connected.push(to);
            }
        }
    }

    pub fn connect_both(&mut self, a: WalkNodeId, b: WalkNodeId) {
        self.connect(a, b);
        self.connect(b, a);
    }

    pub fn assign_cell(&mut self, loc: Location, graph: CellWalkGraph) {
        self.cells.insert(loc, graph);
    }

    pub fn cell(&self, loc: Location) -> Option<&CellWalkGraph> {
        self.cells.get(&loc)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&Location, &CellWalkGraph)> {
        self.cells.iter()
    }

    pub fn node(&self, id: WalkNodeId) -> Option<&WalkNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insert_flags(&mut self, id: WalkNodeId, flags: WalkNodeFlags) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.flags.insert(flags);
        }
    }

    pub fn set_should_wait(&mut self, id: WalkNodeId, wait: bool) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.flags.set(WalkNodeFlags::PEDESTRIAN_SHOULD_WAIT, wait);
        }
    }

    pub fn attach_signal(&mut self, id: WalkNodeId, signal: SignalId) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.signal = Some(signal);
        }
    }

    /// Node of `cell` nearest to `position`, optionally restricted to
    /// sidewalks. Ties keep the first node in cell order.
    pub fn nearest(&self, cell: &CellWalkGraph, position: Vec3, sidewalk_only: bool) -> Option<WalkNodeId> {
        let mut best: Option<(WalkNodeId, f32)> = None;
        for id in cell.nodes() {
            let Some(node) = self.node(*id) else {
                continue;
            };
            if sidewalk_only && !node.is_sidewalk() {
                continue;
            }
            let distance = node.position.distance(position);
            if best.map(|(_, d)| distance < d).unwrap_or(true) {
                best = Some((*id, distance));
            }
        }
        best.map(|(id, _)| id)
    }
}

impl Index<WalkNodeId> for WalkGraph {
    type Output = WalkNode;

    fn index(&self, id: WalkNodeId) -> &WalkNode {
        &self.nodes[id.0]
    }
}

// Corner slots in cell-local (x, z) units, bottom-left first, counter-clockwise.
const CORNER_SLOTS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

fn side_slots(side: Direction) -> (usize, usize) {
    match side {
        Direction::Bottom => (0, 1),
        Direction::Right => (1, 2),
        Direction::Top => (2, 3),
        Direction::Left => (3, 0),
    }
}

/// Lays out a walk graph for every road cell of a classified grid.
///
/// Each road cell gets four sidewalk nodes inset from its corners. Sides
/// that face grass or the map edge are joined by a kerb edge. On three-way
/// and four-way intersections (outside roundabouts) each road arm is
/// spanned by a pair of crosswalk nodes instead.
pub struct WalkGraphBuilder<'a> {
    grid: &'a MapGrid,
    roundabout_members: Option<&'a FnvHashSet<Location>>,
    inset: f32,
}

impl<'a> WalkGraphBuilder<'a> {
    pub fn new(grid: &'a MapGrid) -> Self {
        WalkGraphBuilder {
            grid,
            roundabout_members: None,
            inset: SIDEWALK_INSET,
        }
    }

    pub fn with_roundabout_members(mut self, members: &'a FnvHashSet<Location>) -> Self {
        self.roundabout_members = Some(members);
        self
    }

    fn is_signalled(&self, cell: &GridCell) -> bool {
        matches!(
            cell.cell_type,
            CellType::IntersectionThreeWay | CellType::IntersectionFourWay
        ) && !self
            .roundabout_members
            .map(|m| m.contains(&cell.location()))
            .unwrap_or(false)
    }

    pub fn build(&self) -> WalkGraph {
        let mut walk = WalkGraph::new();
        let mut crossing_cells = 0;

        for cell in self.grid.cells().filter(|c| c.is_road()) {
            let loc = cell.location();
            let center = loc.world_center();
            let corners: Vec<WalkNodeId> = CORNER_SLOTS
                .iter()
                .map(|(dx, dz)| {
                    walk.add_node(
                        WalkNodeKind::Sidewalk,
                        center + Vec3::new(dx * self.inset, 0.0, dz * self.inset),
                    )
                })
                .collect();

            let signalled = self.is_signalled(cell);
            let mut local = CellWalkGraph::new(corners.clone(), cell.cell_type == CellType::RoadCorner);

            for side in Direction::ALL {
                let (a, b) = side_slots(side);
                let (a, b) = (corners[a], corners[b]);
                let road_arm = cell.neighbor(side).map(|n| self.grid.is_road(n)).unwrap_or(false);

                if !road_arm {
                    walk.connect_both(a, b);
                } else if signalled {
                    let start = walk[a].position();
                    let end = walk[b].position();
                    let near = walk.add_node(WalkNodeKind::Crosswalk, start.lerp(end, 1.0 / 3.0));
                    let far = walk.add_node(WalkNodeKind::Crosswalk, start.lerp(end, 2.0 / 3.0));
                    walk.connect_both(a, near);
                    walk.connect_both(near, far);
                    walk.connect_both(far, b);
                    local.nodes.push(near);
                    local.nodes.push(far);
                    local.set_crossings(side, vec![near, far]);
                }
            }

            if local.has_crossings() {
                crossing_cells += 1;
            }
            walk.assign_cell(loc, local);
        }

        debug!(
            "Walk graph: {} nodes over {} cells, {} with crosswalks",
            walk.len(),
            walk.cells.len(),
            crossing_cells
        );

        walk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn prepared(rows: &[&str]) -> MapGrid {
        let mut grid = MapGrid::from_ascii(rows).unwrap();
        grid.assign_neighbors();
        crate::classify::RoadClassifier::new()
            .with_roundabout_chance(0)
            .classify(&mut grid, &mut StdRng::seed_from_u64(0))
            .unwrap();
        grid
    }

    #[test]
    fn flags_toggle_independently() {
        let mut walk = WalkGraph::new();
        let id = walk.add_node(WalkNodeKind::Crosswalk, Vec3::ZERO);
        walk.set_should_wait(id, true);
        walk.insert_flags(id, WalkNodeFlags::LAZY_CONNECTED);
        assert!(walk[id].should_wait());
        walk.set_should_wait(id, false);
        assert!(!walk[id].should_wait());
        assert!(walk[id].flags().contains(WalkNodeFlags::LAZY_CONNECTED));
    }

    #[test]
    fn connections_to_unknown_nodes_are_dropped() {
        let mut walk = WalkGraph::new();
        let a = walk.add_node(WalkNodeKind::Sidewalk, Vec3::ZERO);
        let b = walk.add_node(WalkNodeKind::Crosswalk, Vec3::X);
        walk.connect(a, WalkNodeId(7));
        walk.connect(WalkNodeId(7), a);
        walk.connect_both(a, b);
        walk.connect(a, b);
        assert_eq!(walk[a].connected(), &[b]);
        assert_eq!(walk[b].connected(), &[a]);
        assert_eq!(walk[b].kind(), WalkNodeKind::Crosswalk);
    }

    #[test]
    fn nearest_can_skip_crosswalks() {
        let mut walk = WalkGraph::new();
        let side = walk.add_node(WalkNodeKind::Sidewalk, Vec3::new(5.0, 0.0, 0.0));
        let cross = walk.add_node(WalkNodeKind::Crosswalk, Vec3::new(1.0, 0.0, 0.0));
        let cell = CellWalkGraph::new(vec![side, cross], false);
        assert_eq!(walk.nearest(&cell, Vec3::ZERO, false), Some(cross));
        assert_eq!(walk.nearest(&cell, Vec3::ZERO, true), Some(side));
        assert_eq!(walk.nearest(&CellWalkGraph::default(), Vec3::ZERO, true), None);
    }

    #[test]
    fn straight_road_has_kerbs_on_both_sides() {
        let grid = prepared(&["###"]);
        let walk = WalkGraphBuilder::new(&grid).build();
        let middle = walk.cell(Location::new(1, 0)).unwrap();
        assert_eq!(middle.nodes().len(), 4);
        assert!(!middle.has_crossings());
        // Bottom-left connects to bottom-right but not across the road arm.
        let bl = middle.nodes()[0];
        let br = middle.nodes()[1];
        let tl = middle.nodes()[3];
        assert!(walk[bl].connected().contains(&br));
        assert!(!walk[bl].connected().contains(&tl));
    }

    #[test]
    fn four_way_gets_crosswalks_on_every_arm() {
        let grid = prepared(&[".#.", "###", ".#."]);
        let walk = WalkGraphBuilder::new(&grid).build();
        let centre = walk.cell(Location::new(1, 1)).unwrap();
        for side in Direction::ALL {
            let crossing = centre.crossings(side);
            assert_eq!(crossing.len(), 2);
            assert!(crossing.iter().all(|id| walk[*id].is_crosswalk()));
        }
        assert_eq!(centre.nodes().len(), 12);
        assert!(walk.cell(Location::new(0, 0)).is_none());
    }

    #[test]
    fn corner_cells_are_flagged() {
        let grid = prepared(&["##", "#."]);
        let walk = WalkGraphBuilder::new(&grid).build();
        assert!(walk.cell(Location::new(0, 1)).unwrap().is_corner());
        assert!(!walk.cell(Location::new(1, 1)).unwrap().is_corner());
    }
}
