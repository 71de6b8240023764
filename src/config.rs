use crate::constants::*;
use crate::error::ConfigError;
use crate::router::DistanceMetric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Map generation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
    /// Side length of the grass zones between road lanes.
    pub zone_size: u32,
    pub seed: u64,
    pub roundabout_chance_percent: u32,
    pub road_name_max_attempts: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            width: 50,
            height: 50,
            zone_size: 4,
            seed: 0,
            roundabout_chance_percent: ROUNDABOUT_CHANCE_PERCENT,
            road_name_max_attempts: ROAD_NAME_MAX_ATTEMPTS,
        }
    }
}

impl MapConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "map dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.zone_size == 0 {
            return Err(ConfigError::Invalid("zone_size must be at least 1".to_string()));
        }
        if self.roundabout_chance_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "roundabout_chance_percent must be at most 100, got {}",
                self.roundabout_chance_percent
            )));
        }
        if self.road_name_max_attempts == 0 {
            return Err(ConfigError::Invalid("road_name_max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Intersection signal durations.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SignalTiming {
    pub green: Duration,
    pub amber: Duration,
    /// All-red window after a pedestrian override.
    pub clearance: Duration,
    pub crossing_threshold_min: Duration,
    pub crossing_threshold_max: Duration,
}

impl Default for SignalTiming {
    fn default() -> Self {
        SignalTiming {
            green: SIGNAL_GREEN_TIME,
            amber: SIGNAL_AMBER_TIME,
            clearance: SIGNAL_CLEARANCE_TIME,
            crossing_threshold_min: CROSSING_THRESHOLD_MIN,
            crossing_threshold_max: CROSSING_THRESHOLD_MAX,
        }
    }
}

impl SignalTiming {
    /// Uniform draw in `[min, max)`. An empty range yields `min`.
    pub fn draw_crossing_threshold<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.crossing_threshold_max <= self.crossing_threshold_min {
            return self.crossing_threshold_min;
        }
        let span = (self.crossing_threshold_max - self.crossing_threshold_min).as_nanos() as u64;
        self.crossing_threshold_min + Duration::from_nanos(rng.random_range(0..span))
    }
}

/// Pedestrian simulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// World units per second.
    pub walk_speed: f32,
    /// Walk the route back and forth instead of finishing at the end.
    pub patrol: bool,
    pub seed: u64,
    pub metric: DistanceMetric,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            walk_speed: DEFAULT_WALK_SPEED,
            patrol: true,
            seed: 0,
            metric: DistanceMetric::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        if !(config.walk_speed > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "walk_speed must be positive, got {}",
                config.walk_speed
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config = MapConfig::from_json(r#"{ "width": 20, "seed": 9 }"#).unwrap();
        assert_eq!(config.width, 20);
        assert_eq!(config.height, 50);
        assert_eq!(config.seed, 9);
        assert_eq!(config.roundabout_chance_percent, ROUNDABOUT_CHANCE_PERCENT);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            MapConfig::from_json(r#"{ "width": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MapConfig::from_json(r#"{ "roundabout_chance_percent": 101 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(MapConfig::from_json("{ width"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn simulation_config_reads_metric() {
        let config = SimulationConfig::from_json(r#"{ "metric": "Manhattan", "patrol": false }"#).unwrap();
        assert_eq!(config.metric, DistanceMetric::Manhattan);
        assert!(!config.patrol);
        assert_eq!(config.walk_speed, DEFAULT_WALK_SPEED);
        assert!(SimulationConfig::from_json(r#"{ "walk_speed": 0.0 }"#).is_err());
    }

    #[test]
    fn degenerate_threshold_range_pins_minimum() {
        let timing = SignalTiming {
            crossing_threshold_min: Duration::from_secs(5),
            crossing_threshold_max: Duration::from_secs(5),
            ..SignalTiming::default()
        };
        let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(1);
        assert_eq!(timing.draw_crossing_threshold(&mut rng), Duration::from_secs(5));
    }
}
