pub mod agent;
pub mod classify;
pub mod config;
pub mod constants;
pub mod error;
pub mod generator;
pub mod grid;
pub mod location;
pub mod naming;
pub mod pipeline;
pub mod roads;
pub mod router;
pub mod signal;
pub mod simulation;
pub mod terrain;
pub mod walk;
pub mod walk_route;

pub use agent::{AgentId, AgentStatus, PedestrianAgent};
pub use classify::{ClassificationReport, RoadClassifier};
pub use config::{MapConfig, SignalTiming, SimulationConfig};
pub use error::*;
pub use generator::*;
pub use grid::{CellType, GridCell, MapGrid, Orientation};
pub use location::*;
pub use roads::{Road, RoadNetworkBuilder};
pub use router::{DistanceMetric, VehicleRouter};
pub use signal::{IntersectionSignal, LightState, PhaseGroup, SignalHead, SignalId, SignalRegistry};
pub use simulation::{Simulation, StepSummary};
pub use walk::{WalkGraph, WalkGraphBuilder, WalkNode, WalkNodeId, WalkNodeKind};
pub use walk_route::{build_route, PedestrianRouteBuilder};
