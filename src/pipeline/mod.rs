use crate::classify::RoadClassifier;
use crate::config::MapConfig;
use crate::constants::*;
use crate::error::GenerationError;
use crate::generator::GeneratedMap;
use crate::grid::MapGrid;
use crate::naming::RoadNamer;
use crate::roads::RoadNetworkBuilder;
use crate::terrain::generate_terrain;
use log::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Work budget for incremental generation.
pub struct WorkBudget {
    /// Function that returns true if the generator should continue working.
    should_continue: Box<dyn Fn() -> bool>,
}

impl WorkBudget {
    pub fn new<F: Fn() -> bool + 'static>(should_continue: F) -> Self {
        WorkBudget {
            should_continue: Box::new(should_continue),
        }
    }

    /// Returns true if there is budget remaining to continue work.
    pub fn has_budget(&self) -> bool {
        (self.should_continue)()
    }

    /// Unlimited budget (run to completion).
    pub fn unlimited() -> Self {
        WorkBudget {
            should_continue: Box::new(|| true),
        }
    }
}

/// The overall generation pipeline state. Each phase runs to completion
/// once started; the budget is only checked between phases.
pub enum GenerationState {
    /// Lay out grass zones and road lanes, then link neighbours.
    Terrain { config: MapConfig, rng: StdRng },
    /// Assign road subtypes and record frontage.
    Classify {
        config: MapConfig,
        rng: StdRng,
        grid: MapGrid,
    },
    /// Group classified cells into named roads.
    Segment {
        config: MapConfig,
        rng: StdRng,
        grid: MapGrid,
        classifier: RoadClassifier,
        report: crate::classify::ClassificationReport,
    },
    /// Terminal states.
    Complete(GeneratedMap),
    Failed(GenerationError),
}

impl GenerationState {
    /// Validate `config` and set up the first phase.
    pub fn new(config: MapConfig) -> Self {
        if let Err(err) = config.validate() {
            return GenerationState::Failed(err.into());
        }
        let rng = StdRng::seed_from_u64(config.seed);
        GenerationState::Terrain { config, rng }
    }

    fn advance(self) -> GenerationState {
        match self {
            GenerationState::Terrain { config, mut rng } => {
                match generate_terrain(config.width, config.height, config.zone_size, &mut rng) {
                    Ok(mut grid) => {
                        grid.assign_neighbors();
                        GenerationState::Classify { config, rng, grid }
                    }
                    Err(err) => GenerationState::Failed(err.into()),
                }
            }
            GenerationState::Classify {
                config,
                mut rng,
                mut grid,
            } => {
                let mut classifier =
                    RoadClassifier::new().with_roundabout_chance(config.roundabout_chance_percent);
                let report = match classifier.classify(&mut grid, &mut rng) {
                    Ok(report) => report,
                    Err(err) => return GenerationState::Failed(err.into()),
                };
                if let Err(err) = RoadClassifier::map_adjacent_non_road(&mut grid) {
                    return GenerationState::Failed(err.into());
                }

                let found = grid.road_cells().len();
                if found < MIN_ROAD_CELLS {
                    warn!("Generated map has only {} road cells", found);
                    return GenerationState::Failed(GenerationError::TooFewRoadCells { found });
                }

                GenerationState::Segment {
                    config,
                    rng,
                    grid,
                    classifier,
                    report,
                }
            }
            GenerationState::Segment {
                config,
                mut rng,
                grid,
                classifier,
                report,
            } => {
                let namer = RoadNamer::new().with_max_attempts(config.road_name_max_attempts);
                let roads = match RoadNetworkBuilder::new(&grid)
                    .with_namer(namer)
                    .build(classifier.roundabout_members(), &mut rng)
                {
                    Ok(roads) => roads,
                    Err(err) => return GenerationState::Failed(err),
                };

                info!(
                    "Generated {}x{} map (seed {}): {} roads, {} roundabouts",
                    grid.width(),
                    grid.height(),
                    config.seed,
                    roads.len(),
                    report.roundabout_centers.len()
                );

                GenerationState::Complete(GeneratedMap::new(
                    config,
                    grid,
                    roads,
                    classifier.into_roundabout_members(),
                    report,
                ))
            }
            // Terminal states
            s @ GenerationState::Complete(_) | s @ GenerationState::Failed(_) => s,
        }
    }
}

/// Run phases until the pipeline finishes or the budget runs out.
pub fn tick_pipeline(state: GenerationState, budget: &WorkBudget) -> GenerationState {
    let mut state = state;
    loop {
        state = state.advance();
        if is_complete(&state) || !budget.has_budget() {
            return state;
        }
    }
}

/// Check if the pipeline has reached a terminal state.
pub fn is_complete(state: &GenerationState) -> bool {
    matches!(state, GenerationState::Complete(_) | GenerationState::Failed(_))
}

/// Extract the completed map, if any.
pub fn get_map(state: GenerationState) -> Option<GeneratedMap> {
    match state {
        GenerationState::Complete(map) => Some(map),
        _ => None,
    }
}
