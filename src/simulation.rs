//! Simulation loop and pedestrian director.

use crate::agent::*;
use crate::config::{SignalTiming, SimulationConfig};
use crate::constants::*;
use crate::error::{SignalError, SpawnError};
use crate::generator::GeneratedMap;
use crate::grid::MapGrid;
use crate::location::*;
use crate::router::VehicleRouter;
use crate::signal::*;
use crate::walk::*;
use crate::walk_route::build_route;
use log::*;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::time::Duration;

/// Agent counts after one simulation step.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub moving: usize,
    pub waiting: usize,
    pub finished: usize,
}

pub struct Simulation {
    grid: MapGrid,
    walk: WalkGraph,
    signals: SignalRegistry,
    agents: BTreeMap<AgentId, PedestrianAgent>,
    road_cells: Vec<Location>,
    config: SimulationConfig,
    rng: StdRng,
    next_id: u64,
    elapsed: Duration,
}

impl Simulation {
    /// Lay out the walk graph for `map` and install a signal on every
    /// crossing intersection.
    pub fn new(map: GeneratedMap, config: SimulationConfig, timing: SignalTiming) -> Result<Self, SignalError> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut walk = map.walk_graph();
        let signals = SignalRegistry::for_walk_graph(&mut walk, timing, &mut rng)?;
        let (grid, _, _) = map.into_parts();

        let mut simulation = Self::from_parts(grid, walk, signals, config);
        simulation.rng = rng;
        Ok(simulation)
    }

    /// Assemble a simulation from a prepared grid, walk graph and signals.
    pub fn from_parts(grid: MapGrid, walk: WalkGraph, signals: SignalRegistry, config: SimulationConfig) -> Self {
        let road_cells = grid.road_cells();
        let rng = StdRng::seed_from_u64(config.seed);
        Simulation {
            grid,
            walk,
            signals,
            agents: BTreeMap::new(),
            road_cells,
            config,
            rng,
            next_id: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn grid(&self) -> &MapGrid {
        &self.grid
    }

    pub fn walk(&self) -> &WalkGraph {
        &self.walk
    }

    pub fn signals(&self) -> &SignalRegistry {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut SignalRegistry {
        &mut self.signals
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agent(&self, id: AgentId) -> Option<&PedestrianAgent> {
        self.agents.get(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = (AgentId, &PedestrianAgent)> {
        self.agents.iter().map(|(id, agent)| (*id, agent))
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Total simulated time.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Spawn a pedestrian between two random road cells.
    pub fn spawn_pedestrian(&mut self) -> Result<AgentId, SpawnError> {
        let result = self.pick_endpoints().and_then(|(start, goal)| self.spawn_between(start, goal));
        if let Err(err) = &result {
            warn!("Failed to spawn pedestrian: {}", err);
        }
        result
    }

    fn pick_endpoints(&mut self) -> Result<(Location, Location), SpawnError> {
        if self.road_cells.len() < MIN_ROAD_CELLS {
            return Err(SpawnError::TooFewRoadCells);
        }
        let start = *self.road_cells.choose(&mut self.rng).ok_or(SpawnError::TooFewRoadCells)?;
        let goal = *self.road_cells.choose(&mut self.rng).ok_or(SpawnError::TooFewRoadCells)?;
        Ok((start, goal))
    }

    /// Spawn a pedestrian that walks the vehicle route from `start` to `goal`.
    pub fn spawn_between(&mut self, start: Location, goal: Location) -> Result<AgentId, SpawnError> {
        let path = VehicleRouter::new(&self.grid)
            .with_metric(self.config.metric)
            .find_path(start, goal)?;
        if path.is_empty() {
            return Err(SpawnError::NoVehicleRoute { start, goal });
        }

        let route = build_route(&mut self.walk, &path, &mut self.rng)?;
        if route.is_empty() {
            return Err(SpawnError::EmptyRoute);
        }

        let id = AgentId(self.next_id);
        self.next_id += 1;

        let agent = PedestrianAgent::new(route, &self.walk, self.config.walk_speed, self.config.patrol);
        debug!(
            "Spawned pedestrian {:?}: {} cells, {} walk nodes",
            id,
            path.len(),
            agent.route().len()
        );
        self.agents.insert(id, agent);

        Ok(id)
    }

    /// Try to spawn `count` pedestrians. Returns how many were created.
    pub fn populate(&mut self, count: usize) -> usize {
        (0..count).filter(|_| self.spawn_pedestrian().is_ok()).count()
    }

    /// Tick every signal, then every agent. Finished agents are removed.
    pub fn step(&mut self, dt: Duration) -> StepSummary {
        self.signals.step_all(dt, &mut self.walk);

        let mut summary = StepSummary::default();
        let mut finished = Vec::new();

        for (id, agent) in self.agents.iter_mut() {
            match agent.step(dt, &self.walk, &mut self.signals) {
                AgentStatus::Continue => summary.moving += 1,
                AgentStatus::Waiting => summary.waiting += 1,
                AgentStatus::Done => finished.push(*id),
            }
        }

        summary.finished = finished.len();
        for id in finished {
            self.remove_pedestrian(id);
        }

        self.elapsed += dt;

        summary
    }

    /// Remove an agent, withdrawing its crossing request unless another
    /// agent is still waiting on the same signal.
    pub fn remove_pedestrian(&mut self, id: AgentId) -> Option<PedestrianAgent> {
        let agent = self.agents.remove(&id)?;

        if let Some(signal_id) = agent.pending_signal() {
            let shared = self.agents.values().any(|a| a.pending_signal() == Some(signal_id));
            if !shared {
                if let Ok(signal) = self.signals.get_mut(signal_id) {
                    signal.withdraw_request();
                    trace!("Withdrew crossing request on {:?}", signal_id);
                }
            }
        }

        Some(agent)
    }
}
