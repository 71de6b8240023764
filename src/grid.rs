use crate::error::GridError;
use crate::location::*;
use serde::{Deserialize, Serialize};

/// Terrain/road subtype of a single cell.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum CellType {
    Grass,
    RoadStraight,
    RoadStraightCrossing,
    RoadCorner,
    RoadDeadEnd,
    IntersectionFourWay,
    IntersectionThreeWay,
    IntersectionRoundabout,
}

impl CellType {
    #[inline]
    pub fn is_road(self) -> bool {
        !matches!(self, CellType::Grass)
    }
}

/// Rotation of a cell's road piece about the vertical axis.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub fn degrees(self) -> u16 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }

    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Orientation::Deg0),
            90 => Some(Orientation::Deg90),
            180 => Some(Orientation::Deg180),
            270 => Some(Orientation::Deg270),
            _ => None,
        }
    }
}

/// A non-road neighbour of a road cell. `cell` is `None` when the
/// neighbour slot lies outside the map.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Frontage {
    pub direction: Direction,
    pub cell: Option<Location>,
}

#[derive(Clone, Debug)]
pub struct GridCell {
    location: Location,
    pub cell_type: CellType,
    pub orientation: Orientation,
    neighbors: [Option<Location>; 4],
    frontage: Vec<Frontage>,
}

impl GridCell {
    fn new(location: Location, cell_type: CellType) -> Self {
        GridCell {
            location,
            cell_type,
            orientation: Orientation::default(),
            neighbors: [None; 4],
            frontage: Vec::new(),
        }
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.location
    }

    #[inline]
    pub fn is_road(&self) -> bool {
        self.cell_type.is_road()
    }

    /// Neighbour references in left, top, right, bottom order.
    #[inline]
    pub fn neighbors(&self) -> [Option<Location>; 4] {
        self.neighbors
    }

    #[inline]
    pub fn neighbor(&self, direction: Direction) -> Option<Location> {
        self.neighbors[direction.index()]
    }

    /// Adjacent non-road slots recorded by the frontage pass.
    pub fn frontage(&self) -> &[Frontage] {
        &self.frontage
    }

    pub(crate) fn push_frontage(&mut self, frontage: Frontage) {
        self.frontage.push(frontage);
    }

    pub(crate) fn clear_frontage(&mut self) {
        self.frontage.clear();
    }
}

// Cells compare by coordinate only.
impl PartialEq for GridCell {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}

impl Eq for GridCell {}

/// A rectangular, fully populated map of cells.
#[derive(Clone, Debug)]
pub struct MapGrid {
    width: u32,
    height: u32,
    cells: Vec<GridCell>,
    neighbors_assigned: bool,
}

impl MapGrid {
    /// Create a grid with every cell set to `fill`.
    pub fn new(width: u32, height: u32, fill: CellType) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }

        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                cells.push(GridCell::new(Location::new(x, y), fill));
            }
        }

        Ok(MapGrid {
            width,
            height,
            cells,
            neighbors_assigned: false,
        })
    }

    /// Build a grid from rows of characters, top row first. `#` is road,
    /// anything else is grass. Intended for tests and fixtures.
    pub fn from_ascii(rows: &[&str]) -> Result<Self, GridError> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
        let mut grid = MapGrid::new(width, height, CellType::Grass)?;
        for (row_index, row) in rows.iter().enumerate() {
            let y = height as i32 - 1 - row_index as i32;
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    grid.set_cell_type(Location::new(x as i32, y), CellType::RoadStraight)?;
                }
            }
        }
        Ok(grid)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, loc: Location) -> bool {
        loc.x() >= 0 && loc.y() >= 0 && (loc.x() as u32) < self.width && (loc.y() as u32) < self.height
    }

    #[inline]
    fn index(&self, loc: Location) -> Option<usize> {
        if self.in_bounds(loc) {
            Some(loc.y() as usize * self.width as usize + loc.x() as usize)
        } else {
            None
        }
    }

    pub fn get(&self, loc: Location) -> Result<&GridCell, GridError> {
        self.index(loc)
            .map(|i| &self.cells[i])
            .ok_or(GridError::NotFound(loc))
    }

    pub fn get_mut(&mut self, loc: Location) -> Result<&mut GridCell, GridError> {
        match self.index(loc) {
            Some(i) => Ok(&mut self.cells[i]),
            None => Err(GridError::NotFound(loc)),
        }
    }

    pub fn set_cell_type(&mut self, loc: Location, cell_type: CellType) -> Result<(), GridError> {
        self.get_mut(loc)?.cell_type = cell_type;
        Ok(())
    }

    pub fn set_piece(
        &mut self,
        loc: Location,
        cell_type: CellType,
        orientation: Orientation,
    ) -> Result<(), GridError> {
        let cell = self.get_mut(loc)?;
        cell.cell_type = cell_type;
        cell.orientation = orientation;
        Ok(())
    }

    /// True if `loc` is inside the map and holds a road cell.
    #[inline]
    pub fn is_road(&self, loc: Location) -> bool {
        self.get(loc).map(|c| c.is_road()).unwrap_or(false)
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter()
    }

    /// All road cell coordinates, column by column (x outer, y inner).
    pub fn road_cells(&self) -> Vec<Location> {
        let mut roads = Vec::new();
        for x in 0..self.width as i32 {
            for y in 0..self.height as i32 {
                let loc = Location::new(x, y);
                if self.is_road(loc) {
                    roads.push(loc);
                }
            }
        }
        roads
    }

    pub fn count_of(&self, cell_type: CellType) -> usize {
        self.cells.iter().filter(|c| c.cell_type == cell_type).count()
    }

    pub fn neighbors_assigned(&self) -> bool {
        self.neighbors_assigned
    }

    /// Link every cell to its in-bounds cardinal neighbours.
    pub fn assign_neighbors(&mut self) {
        let width = self.width;
        let height = self.height;
        for cell in self.cells.iter_mut() {
            let loc = cell.location;
            for direction in Direction::ALL {
                let n = loc.step(direction);
                let inside =
                    n.x() >= 0 && n.y() >= 0 && (n.x() as u32) < width && (n.y() as u32) < height;
                cell.neighbors[direction.index()] = if inside { Some(n) } else { None };
            }
        }
        self.neighbors_assigned = true;
    }

    /// Neighbour references of the cell at `loc`, left, top, right, bottom.
    pub fn neighbors(&self, loc: Location) -> Result<[Option<Location>; 4], GridError> {
        Ok(self.get(loc)?.neighbors)
    }

    /// Square block of cells centred on `loc`, clipped to the map, ordered
    /// x outer then y inner.
    pub fn neighborhood(&self, loc: Location, radius: i32) -> Vec<Location> {
        let mut result = Vec::new();
        for x in loc.x() - radius..=loc.x() + radius {
            for y in loc.y() - radius..=loc.y() + radius {
                let n = Location::new(x, y);
                if self.in_bounds(n) {
                    result.push(n);
                }
            }
        }
        result
    }
}

/// A width x height array of per-cell scratch data.
#[derive(Clone, Debug)]
pub struct GridArray<T: Copy> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

impl<T: Copy> GridArray<T> {
    pub fn new(width: u32, height: u32, initial: T) -> Self {
        GridArray {
            width,
            height,
            data: vec![initial; width as usize * height as usize],
        }
    }

    pub fn for_grid(grid: &MapGrid, initial: T) -> Self {
        Self::new(grid.width(), grid.height(), initial)
    }

    #[inline]
    fn index(&self, loc: Location) -> Option<usize> {
        if loc.x() >= 0
            && loc.y() >= 0
            && (loc.x() as u32) < self.width
            && (loc.y() as u32) < self.height
        {
            Some(loc.y() as usize * self.width as usize + loc.x() as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn get(&self, loc: Location) -> Option<&T> {
        self.index(loc).map(|i| &self.data[i])
    }

    #[inline]
    pub fn set(&mut self, loc: Location, value: T) -> Result<(), GridError> {
        let i = self.index(loc).ok_or(GridError::NotFound(loc))?;
        self.data[i] = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Location, &T)> {
        let width = self.width as usize;
        self.data.iter().enumerate().map(move |(i, v)| {
            let x = (i % width) as i32;
            let y = (i / width) as i32;
            (Location::new(x, y), v)
        })
    }
}
