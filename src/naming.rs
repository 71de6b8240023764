//! Cosmetic road names: `[Prefix ]Landmark Suffix`.

use crate::constants::*;
use crate::error::NamingError;
use rand::seq::IndexedRandom;
use rand::Rng;

static PREFIXES: &[&str] = &[
    "Old", "New", "Upper", "Lower", "North", "South", "East", "West", "Great", "Little", "High",
    "Long", "Broad", "Quiet", "Golden", "Silver", "Royal", "Sunny", "Misty", "Amber", "Crimson",
    "Hidden", "Central", "Outer", "Inner", "Ancient", "Windy", "Frosty", "Ivory", "Jade",
];

static LANDMARKS: &[&str] = &[
    "Oak", "Elm", "Ash", "Mill", "Bay", "Park", "Hill", "Lake", "Pond", "Farm", "Barn", "Dock",
    "Pier", "Cove", "Dale", "Glen", "Bank", "Cape", "Key", "Pine", "Fern", "Moor", "Heath",
    "Market", "Harbour", "Meadow", "Orchard", "Bridge", "Chapel", "Quarry", "Summit", "Valley",
    "Willow", "Granary", "Lighthouse", "Riverside",
];

static SUFFIXES: &[&str] = &[
    "St", "Rd", "Way", "Row", "End", "Lane", "Walk", "Rise", "Close", "Court", "Drive", "Place",
    "Grove", "Green", "Street", "Road", "Avenue", "Terrace", "Crescent", "Parade", "Boulevard",
    "Gardens", "Mews", "Yard", "Loop", "Run", "Pass",
];

/// Draws road names from fixed vocabularies.
#[derive(Clone, Debug)]
pub struct RoadNamer {
    prefix_chance: f64,
    max_attempts: usize,
}

impl Default for RoadNamer {
    fn default() -> Self {
        RoadNamer {
            prefix_chance: ROAD_NAME_PREFIX_CHANCE,
            max_attempts: ROAD_NAME_MAX_ATTEMPTS,
        }
    }
}

impl RoadNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_prefix_chance(mut self, chance: f64) -> Self {
        self.prefix_chance = chance.clamp(0.0, 1.0);
        self
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let mut name = String::new();
        if rng.random_bool(self.prefix_chance) {
            if let Some(prefix) = PREFIXES.choose(rng) {
                name.push_str(prefix);
                name.push(' ');
            }
        }
        if let Some(landmark) = LANDMARKS.choose(rng) {
            name.push_str(landmark);
        }
        name.push(' ');
        if let Some(suffix) = SUFFIXES.choose(rng) {
            name.push_str(suffix);
        }
        name
    }

    /// Name a road of `cells` cells. Short roads are re-rolled until the
    /// name fits `SHORT_ROAD_NAME_MAX_CHARS`, giving up after the attempt cap.
    pub fn name_for<R: Rng + ?Sized>(&self, cells: usize, rng: &mut R) -> Result<String, NamingError> {
        let mut name = self.generate(rng);
        if cells > SHORT_ROAD_MAX_CELLS {
            return Ok(name);
        }

        let mut attempts = 1;
        while name.chars().count() > SHORT_ROAD_NAME_MAX_CHARS {
            if attempts >= self.max_attempts {
                return Err(NamingError::Exhausted {
                    attempts,
                    cells,
                });
            }
            name = self.generate(rng);
            attempts += 1;
        }

        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn short_roads_get_short_names() {
        let namer = RoadNamer::new();
        let mut rng = StdRng::seed_from_u64(3);
        for cells in 1..=SHORT_ROAD_MAX_CELLS {
            let name = namer.name_for(cells, &mut rng).unwrap();
            assert!(name.chars().count() <= SHORT_ROAD_NAME_MAX_CHARS, "{}", name);
        }
    }

    #[test]
    fn long_roads_keep_first_name() {
        let namer = RoadNamer::new();
        let a = namer.name_for(12, &mut StdRng::seed_from_u64(8)).unwrap();
        let b = namer.generate(&mut StdRng::seed_from_u64(8));
        assert_eq!(a, b);
    }

    #[test]
    fn names_have_landmark_and_suffix() {
        let namer = RoadNamer::new().with_prefix_chance(0.0);
        let mut rng = StdRng::seed_from_u64(21);
        let name = namer.generate(&mut rng);
        let words: Vec<_> = name.split(' ').collect();
        assert_eq!(words.len(), 2);
        assert!(LANDMARKS.contains(&words[0]));
        assert!(SUFFIXES.contains(&words[1]));
    }

    #[test]
    fn retry_cap_is_enforced() {
        // With a forced prefix most names run past ten characters.
        let namer = RoadNamer::new().with_prefix_chance(1.0).with_max_attempts(1);
        let mut rng = StdRng::seed_from_u64(5);
        let mut saw_error = false;
        for _ in 0..200 {
            if let Err(NamingError::Exhausted { attempts, cells }) = namer.name_for(3, &mut rng) {
                assert_eq!(attempts, 1);
                assert_eq!(cells, 3);
                saw_error = true;
                break;
            }
        }
        assert!(saw_error);
    }
}
