//! Road topology classification.
//!
//! Each road cell gets a subtype and orientation from how many of its four
//! neighbours are also road cells. Four-way cells sitting in the middle of
//! an all-road 3x3 block may be promoted to a roundabout, which rewrites the
//! eight surrounding cells in place. The rewrite only changes subtype and
//! orientation, so road status (and therefore the neighbour counts seen by
//! cells classified later in the same pass) is unaffected.

use crate::constants::*;
use crate::error::GridError;
use crate::grid::*;
use crate::location::*;
use fnv::FnvHashSet;
use itertools::Itertools;
use log::*;
use rand::Rng;

use Direction::*;

static DEAD_END_ROTATIONS: [(Direction, Orientation); 4] = [
    (Left, Orientation::Deg270),
    (Top, Orientation::Deg0),
    (Right, Orientation::Deg90),
    (Bottom, Orientation::Deg180),
];

static STRAIGHT_ROTATIONS: [([Direction; 2], Orientation); 2] = [
    ([Left, Right], Orientation::Deg90),
    ([Top, Bottom], Orientation::Deg0),
];

static CORNER_ROTATIONS: [([Direction; 2], Orientation); 4] = [
    ([Top, Right], Orientation::Deg0),
    ([Right, Bottom], Orientation::Deg90),
    ([Bottom, Left], Orientation::Deg180),
    ([Left, Top], Orientation::Deg270),
];

static THREE_WAY_ROTATIONS: [([Direction; 3], Orientation); 4] = [
    ([Bottom, Left, Top], Orientation::Deg0),
    ([Left, Top, Right], Orientation::Deg90),
    ([Top, Right, Bottom], Orientation::Deg180),
    ([Right, Bottom, Left], Orientation::Deg270),
];

/// Pieces written over a promoted 3x3 block, in `MapGrid::neighborhood`
/// order (x outer, y inner): bottom-left, left, top-left, bottom, centre,
/// top, bottom-right, right, top-right.
static ROUNDABOUT_PATTERN: [(CellType, Orientation); 9] = [
    (CellType::RoadCorner, Orientation::Deg0),
    (CellType::IntersectionRoundabout, Orientation::Deg0),
    (CellType::RoadCorner, Orientation::Deg90),
    (CellType::IntersectionRoundabout, Orientation::Deg270),
    (CellType::IntersectionFourWay, Orientation::Deg0),
    (CellType::IntersectionRoundabout, Orientation::Deg90),
    (CellType::RoadCorner, Orientation::Deg270),
    (CellType::IntersectionRoundabout, Orientation::Deg180),
    (CellType::RoadCorner, Orientation::Deg180),
];

/// Summary of one classification pass.
#[derive(Clone, Debug, Default)]
pub struct ClassificationReport {
    /// Centre cells of promoted roundabouts, in promotion order.
    pub roundabout_centers: Vec<Location>,
    /// Road cells with no road neighbour. They are typed as dead ends but
    /// keep whatever orientation they had before classification.
    pub isolated: Vec<Location>,
    pub dead_ends: usize,
    pub straights: usize,
    pub corners: usize,
    pub three_way: usize,
    pub four_way: usize,
}

/// Classifies road cells in place and remembers roundabout membership.
pub struct RoadClassifier {
    roundabout_chance_percent: u32,
    roundabout_members: FnvHashSet<Location>,
}

impl Default for RoadClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RoadClassifier {
    pub fn new() -> Self {
        RoadClassifier {
            roundabout_chance_percent: ROUNDABOUT_CHANCE_PERCENT,
            roundabout_members: FnvHashSet::default(),
        }
    }

    /// Override the roundabout promotion chance (0 disables, 100 always promotes).
    pub fn with_roundabout_chance(mut self, percent: u32) -> Self {
        self.roundabout_chance_percent = percent.min(100);
        self
    }

    /// Every coordinate that belongs to a promoted roundabout block.
    pub fn roundabout_members(&self) -> &FnvHashSet<Location> {
        &self.roundabout_members
    }

    pub fn into_roundabout_members(self) -> FnvHashSet<Location> {
        self.roundabout_members
    }

    /// Assign subtype and orientation to every road cell.
    pub fn classify<R: Rng + ?Sized>(
        &mut self,
        grid: &mut MapGrid,
        rng: &mut R,
    ) -> Result<ClassificationReport, GridError> {
        if !grid.neighbors_assigned() {
            return Err(GridError::NeighborsUnassigned);
        }

        let mut report = ClassificationReport::default();

        for loc in grid.road_cells() {
            let neighbors = grid.neighbors(loc)?;
            let is_road = |d: Direction| neighbors[d.index()].is_some_and(|n| grid.is_road(n));
            let road_count = Direction::ALL.iter().filter(|d| is_road(**d)).count();

            match road_count {
                0 | 1 => {
                    let rotation = DEAD_END_ROTATIONS
                        .iter()
                        .filter(|(d, _)| is_road(*d))
                        .map(|(_, o)| *o)
                        .last();
                    match rotation {
                        Some(o) => grid.set_piece(loc, CellType::RoadDeadEnd, o)?,
                        None => {
                            warn!("Road cell {} has no road neighbours", loc);
                            grid.set_cell_type(loc, CellType::RoadDeadEnd)?;
                            report.isolated.push(loc);
                        }
                    }
                    report.dead_ends += 1;
                }
                2 => {
                    let straight = STRAIGHT_ROTATIONS
                        .iter()
                        .find(|(pair, _)| pair.iter().all(|d| is_road(*d)));
                    if let Some((_, o)) = straight {
                        grid.set_piece(loc, CellType::RoadStraight, *o)?;
                        report.straights += 1;
                    } else if let Some((_, o)) = CORNER_ROTATIONS
                        .iter()
                        .find(|(pair, _)| pair.iter().all(|d| is_road(*d)))
                    {
                        grid.set_piece(loc, CellType::RoadCorner, *o)?;
                        report.corners += 1;
                    }
                }
                3 => {
                    if self.roundabout_members.contains(&loc) {
                        continue;
                    }
                    if let Some((_, o)) = THREE_WAY_ROTATIONS
                        .iter()
                        .find(|(dirs, _)| dirs.iter().all(|d| is_road(*d)))
                    {
                        grid.set_piece(loc, CellType::IntersectionThreeWay, *o)?;
                        report.three_way += 1;
                    }
                }
                _ => {
                    if self.try_promote_roundabout(grid, loc, rng)? {
                        report.roundabout_centers.push(loc);
                    } else {
                        grid.set_piece(loc, CellType::IntersectionFourWay, Orientation::Deg0)?;
                        report.four_way += 1;
                    }
                }
            }
        }

        debug!(
            "Classified road cells: dead_ends={}, straights={}, corners={}, three_way={}, four_way={}, roundabouts={}",
            report.dead_ends,
            report.straights,
            report.corners,
            report.three_way,
            report.four_way,
            report.roundabout_centers.len()
        );

        Ok(report)
    }

    fn try_promote_roundabout<R: Rng + ?Sized>(
        &mut self,
        grid: &mut MapGrid,
        center: Location,
        rng: &mut R,
    ) -> Result<bool, GridError> {
        let block = grid.neighborhood(center, 1);
        if block.len() != 9 || !block.iter().all(|loc| grid.is_road(*loc)) {
            return Ok(false);
        }
        if rng.random_range(0..100) >= self.roundabout_chance_percent {
            return Ok(false);
        }

        for (loc, (cell_type, orientation)) in block.iter().zip_eq(ROUNDABOUT_PATTERN.iter()) {
            grid.set_piece(*loc, *cell_type, *orientation)?;
            self.roundabout_members.insert(*loc);
        }
        trace!("Promoted four-way at {} to a roundabout", center);

        Ok(true)
    }

    /// Record each road cell's non-road neighbour slots, including slots
    /// that fall outside the map.
    pub fn map_adjacent_non_road(grid: &mut MapGrid) -> Result<(), GridError> {
        if !grid.neighbors_assigned() {
            return Err(GridError::NeighborsUnassigned);
        }

        for loc in grid.road_cells() {
            let neighbors = grid.neighbors(loc)?;
            let frontage: Vec<Frontage> = Direction::ALL
                .iter()
                .filter_map(|d| match neighbors[d.index()] {
                    Some(n) if grid.is_road(n) => None,
                    cell => Some(Frontage {
                        direction: *d,
                        cell,
                    }),
                })
                .collect();

            let cell = grid.get_mut(loc)?;
            cell.clear_frontage();
            for f in frontage {
                cell.push_frontage(f);
            }
        }

        Ok(())
    }
}
