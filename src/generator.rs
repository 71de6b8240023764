use crate::classify::ClassificationReport;
use crate::config::MapConfig;
use crate::error::GenerationError;
use crate::grid::MapGrid;
use crate::location::*;
use crate::pipeline::*;
use crate::roads::Road;
use crate::walk::{WalkGraph, WalkGraphBuilder};
use fnv::FnvHashSet;

/// A fully generated, classified and segmented map.
pub struct GeneratedMap {
    config: MapConfig,
    grid: MapGrid,
    roads: Vec<Road>,
    roundabout_members: FnvHashSet<Location>,
    report: ClassificationReport,
}

impl GeneratedMap {
    pub fn new(
        config: MapConfig,
        grid: MapGrid,
        roads: Vec<Road>,
        roundabout_members: FnvHashSet<Location>,
        report: ClassificationReport,
    ) -> Self {
        GeneratedMap {
            config,
            grid,
            roads,
            roundabout_members,
            report,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn grid(&self) -> &MapGrid {
        &self.grid
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn roundabout_members(&self) -> &FnvHashSet<Location> {
        &self.roundabout_members
    }

    pub fn report(&self) -> &ClassificationReport {
        &self.report
    }

    /// The road containing `loc`, if any. Roundabout members belong to none.
    pub fn road_at(&self, loc: Location) -> Option<&Road> {
        self.roads.iter().find(|road| road.contains(loc))
    }

    /// Lay out sidewalks and crosswalks for this map.
    pub fn walk_graph(&self) -> WalkGraph {
        WalkGraphBuilder::new(&self.grid)
            .with_roundabout_members(&self.roundabout_members)
            .build()
    }

    pub fn into_parts(self) -> (MapGrid, Vec<Road>, FnvHashSet<Location>) {
        (self.grid, self.roads, self.roundabout_members)
    }
}

/// Result of a generation tick.
pub enum GenerationResult {
    /// Generation is still in progress. Call `tick_generation` again.
    Running(GenerationState),
    /// Generation completed successfully.
    Complete(GeneratedMap),
    /// Generation failed.
    Failed(GenerationError),
}

/// Builder for configuring a map generator.
///
/// Every setter overrides one field of the underlying `MapConfig`; the
/// config is validated when the pipeline starts.
pub struct MapGeneratorBuilder {
    config: MapConfig,
}

impl MapGeneratorBuilder {
    pub fn new() -> Self {
        MapGeneratorBuilder {
            config: MapConfig::default(),
        }
    }

    pub fn from_config(config: MapConfig) -> Self {
        MapGeneratorBuilder { config }
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn zone_size(mut self, zone_size: u32) -> Self {
        self.config.zone_size = zone_size;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn roundabout_chance(mut self, percent: u32) -> Self {
        self.config.roundabout_chance_percent = percent;
        self
    }

    pub fn road_name_attempts(mut self, attempts: usize) -> Self {
        self.config.road_name_max_attempts = attempts;
        self
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn build(self) -> GenerationState {
        GenerationState::new(self.config)
    }
}

impl Default for MapGeneratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Start a new incremental generation run.
pub fn start_generation(config: MapConfig) -> GenerationState {
    MapGeneratorBuilder::from_config(config).build()
}

/// Advance generation by one tick.
pub fn tick_generation(state: GenerationState, budget: &WorkBudget) -> GenerationResult {
    let state = tick_pipeline(state, budget);

    match state {
        GenerationState::Complete(map) => GenerationResult::Complete(map),
        GenerationState::Failed(err) => GenerationResult::Failed(err),
        state => GenerationResult::Running(state),
    }
}

/// Generate a map synchronously.
pub fn generate_map(config: &MapConfig) -> Result<GeneratedMap, GenerationError> {
    let mut state = start_generation(config.clone());
    let budget = WorkBudget::unlimited();

    loop {
        match tick_generation(state, &budget) {
            GenerationResult::Running(s) => state = s,
            GenerationResult::Complete(map) => return Ok(map),
            GenerationResult::Failed(err) => return Err(err),
        }
    }
}

/// Generate a map, stopping once `should_continue` returns false.
/// Returns `Ok(None)` if the budget ran out before the map was finished.
pub fn generate_map_with_budget<F>(
    config: &MapConfig,
    should_continue: F,
) -> Result<Option<GeneratedMap>, GenerationError>
where
    F: Fn() -> bool + 'static,
{
    let budget = WorkBudget::new(should_continue);
    let state = start_generation(config.clone());

    match tick_generation(state, &budget) {
        GenerationResult::Running(_) => Ok(None),
        GenerationResult::Complete(map) => Ok(Some(map)),
        GenerationResult::Failed(err) => Err(err),
    }
}
