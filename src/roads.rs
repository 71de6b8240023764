//! Road segmentation: groups classified cells into maximal straight runs.
//!
//! Two sweeps run over the grid, horizontal first. A run starts at an
//! unclaimed road cell whose forward neighbour (right for horizontal, top
//! for vertical) is also an unclaimed road cell, and extends forward until
//! the next cell is grass, off the map, or already claimed. Claims are
//! shared by both sweeps, so a cell belongs to at most one road.
//!
//! Roundabout members are stripped from finished roads afterwards without
//! splitting them, so a road crossing a roundabout keeps a gap.

use crate::error::{GenerationError, GridError};
use crate::grid::*;
use crate::location::*;
use crate::naming::RoadNamer;
use fnv::FnvHashSet;
use log::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn forward(self) -> Direction {
        match self {
            Axis::Horizontal => Direction::Right,
            Axis::Vertical => Direction::Top,
        }
    }
}

/// A named straight run of road cells.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Road {
    name: String,
    axis: Axis,
    cells: Vec<Location>,
}

impl Road {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn is_vertical(&self) -> bool {
        self.axis == Axis::Vertical
    }

    pub fn cells(&self) -> &[Location] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, loc: Location) -> bool {
        self.cells.contains(&loc)
    }
}

/// Segments a classified grid into named roads.
pub struct RoadNetworkBuilder<'a> {
    grid: &'a MapGrid,
    namer: RoadNamer,
}

impl<'a> RoadNetworkBuilder<'a> {
    pub fn new(grid: &'a MapGrid) -> Self {
        RoadNetworkBuilder {
            grid,
            namer: RoadNamer::default(),
        }
    }

    pub fn with_namer(mut self, namer: RoadNamer) -> Self {
        self.namer = namer;
        self
    }

    pub fn build<R: Rng + ?Sized>(
        &self,
        roundabout_members: &FnvHashSet<Location>,
        rng: &mut R,
    ) -> Result<Vec<Road>, GenerationError> {
        let mut claimed = GridArray::for_grid(self.grid, false);
        let mut roads = Vec::new();

        for axis in [Axis::Horizontal, Axis::Vertical] {
            self.sweep(axis, &mut claimed, &mut roads, rng)?;
        }

        let total = roads.len();
        let mut stripped = 0usize;
        for road in roads.iter_mut() {
            let before = road.cells.len();
            road.cells.retain(|loc| !roundabout_members.contains(loc));
            stripped += before - road.cells.len();
        }
        roads.retain(|road| {
            if road.is_empty() {
                warn!("Road '{}' lies entirely inside a roundabout, dropping it", road.name);
                false
            } else {
                true
            }
        });

        debug!(
            "Found {} roads ({} kept), stripped {} roundabout cells",
            total,
            roads.len(),
            stripped
        );

        Ok(roads)
    }

    fn sweep<R: Rng + ?Sized>(
        &self,
        axis: Axis,
        claimed: &mut GridArray<bool>,
        roads: &mut Vec<Road>,
        rng: &mut R,
    ) -> Result<(), GenerationError> {
        let width = self.grid.width() as i32;
        let height = self.grid.height() as i32;
        let (outer_len, inner_len) = match axis {
            Axis::Horizontal => (width, height),
            Axis::Vertical => (height, width),
        };

        for outer in 0..outer_len {
            for inner in 0..inner_len {
                let start = match axis {
                    Axis::Horizontal => Location::new(outer, inner),
                    Axis::Vertical => Location::new(inner, outer),
                };
                if !self.is_open(start, claimed) {
                    continue;
                }
                let Some(next) = self.forward(start, axis)? else {
                    continue;
                };
                if !self.is_open(next, claimed) {
                    continue;
                }

                let mut cells = vec![start];
                claimed.set(start, true)?;
                let mut cursor = start;
                while let Some(next) = self.forward(cursor, axis)? {
                    if !self.is_open(next, claimed) {
                        break;
                    }
                    cells.push(next);
                    claimed.set(next, true)?;
                    cursor = next;
                }

                let name = self.namer.name_for(cells.len(), rng)?;
                trace!("Road '{}' {:?} from {} ({} cells)", name, axis, start, cells.len());
                roads.push(Road { name, axis, cells });
            }
        }

        Ok(())
    }

    fn forward(&self, loc: Location, axis: Axis) -> Result<Option<Location>, GridError> {
        Ok(self.grid.get(loc)?.neighbor(axis.forward()))
    }

    fn is_open(&self, loc: Location, claimed: &GridArray<bool>) -> bool {
        self.grid.is_road(loc) && !claimed.get(loc).copied().unwrap_or(true)
    }
}
