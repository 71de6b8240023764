//! Error types for map generation, routing, and signal control.

use crate::location::Location;
use crate::signal::SignalId;
use crate::walk::WalkNodeId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("no cell at {0}")]
    NotFound(Location),
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("neighbour references have not been assigned")]
    NeighborsUnassigned,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("no short enough name found for a {cells}-cell road after {attempts} attempts")]
    Exhausted { attempts: usize, cells: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("cell {0} has no walk node graph")]
    MissingWalkGraph(Location),
    #[error("cell {0} has no sidewalk node")]
    NoSidewalk(Location),
    #[error("walk node {0:?} is not in the graph")]
    UnknownNode(WalkNodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("an intersection signal needs at least one phase group")]
    NoPhaseGroups,
    #[error("unknown signal {0:?}")]
    UnknownSignal(SignalId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("map has {found} road cells, at least 2 are required")]
    TooFewRoadCells { found: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("map has fewer than 2 road cells")]
    TooFewRoadCells,
    #[error("no vehicle route from {start} to {goal}")]
    NoVehicleRoute { start: Location, goal: Location },
    #[error("pedestrian route is empty")]
    EmptyRoute,
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Grid(#[from] GridError),
}
