use std::time::Duration;

/// Percent chance that an all-road 3x3 block around a four-way cell becomes a roundabout.
pub const ROUNDABOUT_CHANCE_PERCENT: u32 = 25;

/// Percent chance that a terrain zone grows by one cell along a random axis.
pub const ZONE_EXPANSION_CHANCE_PERCENT: u32 = 60;

/// A map needs at least this many road cells to be usable by agents.
pub const MIN_ROAD_CELLS: usize = 2;

/// Probability that a generated road name carries a prefix word.
pub const ROAD_NAME_PREFIX_CHANCE: f64 = 0.3;

/// Roads with at most this many cells get a short name.
pub const SHORT_ROAD_MAX_CELLS: usize = 5;

/// Maximum name length (in characters) for short roads.
pub const SHORT_ROAD_NAME_MAX_CHARS: usize = 10;

/// Retry cap for short-road name regeneration.
pub const ROAD_NAME_MAX_ATTEMPTS: usize = 1000;

/// Maximum hops taken when tracing a corner's sidewalk curve.
pub const CORNER_HOP_LIMIT: usize = 20;

/// Minimum cosine similarity between a step and the travel direction.
pub const STEP_DIRECTION_THRESHOLD: f32 = 0.9;

// Signal timings
pub const SIGNAL_GREEN_TIME: Duration = Duration::from_secs(10);
pub const SIGNAL_AMBER_TIME: Duration = Duration::from_secs(2);
pub const SIGNAL_CLEARANCE_TIME: Duration = Duration::from_secs(5);
pub const CROSSING_THRESHOLD_MIN: Duration = Duration::from_secs(5);
pub const CROSSING_THRESHOLD_MAX: Duration = Duration::from_secs(20);

// Pedestrian walker
pub const DEFAULT_WALK_SPEED: f32 = 0.3;
pub const ARRIVAL_RADIUS: f32 = 0.1;
pub const CROSSING_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const SHOULD_WAIT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const TURNAROUND_PAUSE: Duration = Duration::from_secs(1);

/// Distance of sidewalk nodes from the cell centre along each axis.
pub const SIDEWALK_INSET: f32 = 0.4;
