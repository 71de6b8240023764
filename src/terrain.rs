//! Zoned terrain generation.
//!
//! The map starts out entirely paved. It is then tiled with rectangular
//! grass zones separated by one-cell road lanes; some zones grow by one
//! cell, which closes off a lane segment and breaks up the regular block
//! pattern. The outer ring of the map is always grass.

use crate::constants::*;
use crate::error::GridError;
use crate::grid::*;
use crate::location::*;
use log::*;
use rand::Rng;

/// Generate raw terrain (grass vs. unclassified road) for a map.
///
/// Road cells come out as `RoadStraight` at 0 degrees; the classifier
/// assigns their real subtype afterwards. Neighbour references are not
/// assigned here.
pub fn generate_terrain<R: Rng + ?Sized>(
    width: u32,
    height: u32,
    zone_size: u32,
    rng: &mut R,
) -> Result<MapGrid, GridError> {
    let mut grid = MapGrid::new(width, height, CellType::RoadStraight)?;
    let stride = zone_size as usize + 1;
    let mut zones = 0usize;
    let mut expanded = 0usize;

    for x in (0..width).step_by(stride) {
        for y in (0..height).step_by(stride) {
            let (x_grow, y_grow) = if rng.random_range(0..100) < ZONE_EXPANSION_CHANCE_PERCENT {
                expanded += 1;
                if rng.random_range(0..100) < 50 {
                    (1, 0)
                } else {
                    (0, 1)
                }
            } else {
                (0, 0)
            };

            let zone_width = (zone_size + x_grow).min(width - x);
            let zone_height = (zone_size + y_grow).min(height - y);

            for dx in 0..zone_width {
                for dy in 0..zone_height {
                    let loc = Location::new((x + dx) as i32, (y + dy) as i32);
                    grid.set_cell_type(loc, CellType::Grass)?;
                }
            }
            zones += 1;
        }
    }

    for x in 0..width {
        for y in 0..height {
            if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                grid.set_cell_type(Location::new(x as i32, y as i32), CellType::Grass)?;
            }
        }
    }

    debug!(
        "Terrain {}x{}: {} zones ({} expanded), {} road cells",
        width,
        height,
        zones,
        expanded,
        grid.road_cells().len()
    );

    Ok(grid)
}
