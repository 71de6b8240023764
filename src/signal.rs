//! Intersection traffic signals.
//!
//! An `IntersectionSignal` cycles its phase groups green -> amber -> red in
//! a fixed order. A pedestrian request that has been pending long enough
//! forces every group red and holds the intersection in an all-red
//! clearance window before normal cycling resumes from the same group.
//!
//! Signal state is mirrored onto the crosswalk nodes each group governs:
//! green and amber make pedestrians wait, red lets them cross.

use crate::config::SignalTiming;
use crate::error::SignalError;
use crate::location::*;
use crate::walk::*;
use log::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SignalId(pub usize);

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum LightState {
    #[default]
    Red,
    Amber,
    Green,
}

/// Side of the intersection a group of lights faces.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum Approach {
    North,
    South,
    East,
    West,
}

impl Approach {
    pub const ALL: [Approach; 4] = [Approach::North, Approach::South, Approach::East, Approach::West];

    /// The cell side whose road arm this approach controls.
    pub fn side(self) -> Direction {
        match self {
            Approach::North => Direction::Top,
            Approach::South => Direction::Bottom,
            Approach::East => Direction::Right,
            Approach::West => Direction::Left,
        }
    }
}

/// One physical light and the crosswalk nodes it controls.
#[derive(Clone, Debug, Default)]
pub struct SignalHead {
    pub crosswalk: Vec<WalkNodeId>,
}

impl SignalHead {
    pub fn new(crosswalk: Vec<WalkNodeId>) -> Self {
        SignalHead { crosswalk }
    }
}

/// Lights that always show the same colour.
#[derive(Clone, Debug, Default)]
pub struct PhaseGroup {
    heads: Vec<SignalHead>,
    state: LightState,
}

impl PhaseGroup {
    pub fn new(heads: Vec<SignalHead>) -> Self {
        PhaseGroup {
            heads,
            state: LightState::Red,
        }
    }

    pub fn state(&self) -> LightState {
        self.state
    }

    fn crosswalk_nodes(&self) -> impl Iterator<Item = WalkNodeId> + '_ {
        self.heads.iter().flat_map(|h| h.crosswalk.iter().copied())
    }

    pub fn set_state(&mut self, state: LightState, walk: &mut WalkGraph) {
        self.state = state;
        let wait = state != LightState::Red;
        for id in self.crosswalk_nodes() {
            walk.set_should_wait(id, wait);
        }
    }
}

/// What a single `step` changed.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SignalTransition {
    None,
    /// The active group turned amber.
    Amber,
    /// The active group turned red and this group turned green.
    Advanced(usize),
    /// A pending crossing request forced every group red.
    PedestrianOverride,
}

pub struct IntersectionSignal {
    groups: Vec<PhaseGroup>,
    active_index: usize,
    timing: SignalTiming,
    phase_timer: Duration,
    request_timer: Duration,
    clearance_timer: Duration,
    request_pending: bool,
    crossing_threshold: Duration,
    rng: StdRng,
}

impl IntersectionSignal {
    /// Build a signal from per-approach groups. Empty approaches are
    /// skipped; the rest keep north, south, east, west order.
    ///
    /// Every group starts red, then the first group turns green.
    pub fn new(
        north: Vec<PhaseGroup>,
        south: Vec<PhaseGroup>,
        east: Vec<PhaseGroup>,
        west: Vec<PhaseGroup>,
        timing: SignalTiming,
        rng: StdRng,
        walk: &mut WalkGraph,
    ) -> Result<Self, SignalError> {
        let groups: Vec<PhaseGroup> = [north, south, east, west].into_iter().flatten().collect();
        Self::from_groups(groups, timing, rng, walk)
    }

    /// Build a signal from an already ordered list of groups.
    pub fn from_groups(
        groups: Vec<PhaseGroup>,
        timing: SignalTiming,
        mut rng: StdRng,
        walk: &mut WalkGraph,
    ) -> Result<Self, SignalError> {
        if groups.is_empty() {
            return Err(SignalError::NoPhaseGroups);
        }

        let crossing_threshold = timing.draw_crossing_threshold(&mut rng);
        let mut signal = IntersectionSignal {
            groups,
            active_index: 0,
            timing,
            phase_timer: Duration::ZERO,
            request_timer: Duration::ZERO,
            clearance_timer: Duration::ZERO,
            request_pending: false,
            crossing_threshold,
            rng,
        };

        signal.set_all_red(walk);
        signal.groups[0].set_state(LightState::Green, walk);

        Ok(signal)
    }

    fn set_all_red(&mut self, walk: &mut WalkGraph) {
        for group in self.groups.iter_mut() {
            group.set_state(LightState::Red, walk);
        }
    }

    /// Advance the signal by `dt` of simulated time.
    pub fn step(&mut self, dt: Duration, walk: &mut WalkGraph) -> SignalTransition {
        self.phase_timer += dt;
        self.request_timer += dt;
        self.clearance_timer += dt;

        if self.request_pending && self.is_active() && self.request_timer >= self.crossing_threshold {
            self.set_all_red(walk);
            self.request_pending = false;
            self.clearance_timer = Duration::ZERO;
            self.crossing_threshold = self.timing.draw_crossing_threshold(&mut self.rng);
            debug!(
                "Pedestrian override: all red, next threshold {:?}",
                self.crossing_threshold
            );
            return SignalTransition::PedestrianOverride;
        }

        if self.clearance_timer < self.timing.clearance {
            return SignalTransition::None;
        }

        if self.phase_timer >= self.timing.green + self.timing.amber {
            self.groups[self.active_index].set_state(LightState::Red, walk);
            self.active_index = (self.active_index + 1) % self.groups.len();
            self.groups[self.active_index].set_state(LightState::Green, walk);
            self.phase_timer = Duration::ZERO;
            trace!("Signal advanced to group {}", self.active_index);
            return SignalTransition::Advanced(self.active_index);
        }

        if self.phase_timer >= self.timing.green && self.groups[self.active_index].state() != LightState::Amber {
            self.groups[self.active_index].set_state(LightState::Amber, walk);
            return SignalTransition::Amber;
        }

        SignalTransition::None
    }

    /// Ask for a pedestrian phase. Ignored unless a group is green.
    /// Repeated calls while pending restart the pending timer.
    pub fn request_to_cross(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.request_pending = true;
        self.request_timer = Duration::ZERO;
        true
    }

    /// Drop a pending request raised by an agent that went away.
    pub(crate) fn withdraw_request(&mut self) {
        self.request_pending = false;
    }

    /// True while some group shows green.
    pub fn is_active(&self) -> bool {
        self.groups[self.active_index].state() == LightState::Green
    }

    pub fn request_pending(&self) -> bool {
        self.request_pending
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn groups(&self) -> &[PhaseGroup] {
        &self.groups
    }

    pub fn crossing_threshold(&self) -> Duration {
        self.crossing_threshold
    }

    pub fn clearance_remaining(&self) -> Duration {
        self.timing.clearance.saturating_sub(self.clearance_timer)
    }

    fn crosswalk_nodes(&self) -> impl Iterator<Item = WalkNodeId> + '_ {
        self.groups.iter().flat_map(|g| g.crosswalk_nodes())
    }
}

/// Owns every signal in a map and routes crosswalk nodes to them.
#[derive(Default)]
pub struct SignalRegistry {
    signals: Vec<IntersectionSignal>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `signal` and tag its crosswalk nodes with the new id.
    pub fn register(&mut self, signal: IntersectionSignal, walk: &mut WalkGraph) -> SignalId {
        let id = SignalId(self.signals.len());
        let nodes: Vec<WalkNodeId> = signal.crosswalk_nodes().collect();
        for node in nodes {
            walk.attach_signal(node, id);
        }
        self.signals.push(signal);
        id
    }

    pub fn get(&self, id: SignalId) -> Result<&IntersectionSignal, SignalError> {
        self.signals.get(id.0).ok_or(SignalError::UnknownSignal(id))
    }

    pub fn get_mut(&mut self, id: SignalId) -> Result<&mut IntersectionSignal, SignalError> {
        self.signals.get_mut(id.0).ok_or(SignalError::UnknownSignal(id))
    }

    pub fn step_all(&mut self, dt: Duration, walk: &mut WalkGraph) {
        for signal in self.signals.iter_mut() {
            signal.step(dt, walk);
        }
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignalId, &IntersectionSignal)> {
        self.signals.iter().enumerate().map(|(i, s)| (SignalId(i), s))
    }
}

impl SignalRegistry {
    /// Install one signal per walk cell that has crosswalks, with a phase
    /// group per road arm. Cells are visited in coordinate order so a
    /// seeded `rng` always hands out the same thresholds.
    pub fn for_walk_graph<R: Rng + ?Sized>(
        walk: &mut WalkGraph,
        timing: SignalTiming,
        rng: &mut R,
    ) -> Result<Self, SignalError> {
        let mut intersections: Vec<(Location, [Vec<WalkNodeId>; 4])> = walk
            .cells()
            .filter(|(_, cell)| cell.has_crossings())
            .map(|(loc, cell)| {
                let arms = Approach::ALL.map(|a| cell.crossings(a.side()).to_vec());
                (*loc, arms)
            })
            .collect();
        intersections.sort_by_key(|(loc, _)| *loc);

        let mut registry = SignalRegistry::new();
        for (loc, arms) in intersections {
            let [north, south, east, west] =
                arms.map(|nodes| group_for(nodes).into_iter().collect::<Vec<_>>());
            let signal = IntersectionSignal::new(
                north,
                south,
                east,
                west,
                timing,
                StdRng::seed_from_u64(rng.random()),
                walk,
            )?;
            let id = registry.register(signal, walk);
            trace!("Signal {:?} at {}", id, loc);
        }

        debug!("Installed {} intersection signals", registry.len());

        Ok(registry)
    }
}

fn group_for(nodes: Vec<WalkNodeId>) -> Option<PhaseGroup> {
    if nodes.is_empty() {
        None
    } else {
        Some(PhaseGroup::new(vec![SignalHead::new(nodes)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MapGrid;
    use glam::Vec3;

    const TICK: Duration = Duration::from_millis(100);

    fn forced(threshold: Duration) -> SignalTiming {
        SignalTiming {
            crossing_threshold_min: threshold,
            crossing_threshold_max: threshold,
            ..SignalTiming::default()
        }
    }

    fn two_groups(walk: &mut WalkGraph) -> (Vec<PhaseGroup>, Vec<PhaseGroup>, WalkNodeId, WalkNodeId) {
        let a = walk.add_node(WalkNodeKind::Crosswalk, Vec3::ZERO);
        let b = walk.add_node(WalkNodeKind::Crosswalk, Vec3::X);
        (
            vec![PhaseGroup::new(vec![SignalHead::new(vec![a])])],
            vec![PhaseGroup::new(vec![SignalHead::new(vec![b])])],
            a,
            b,
        )
    }

    fn run(signal: &mut IntersectionSignal, walk: &mut WalkGraph, total: Duration) -> Vec<SignalTransition> {
        let mut out = Vec::new();
        let mut elapsed = Duration::ZERO;
        while elapsed < total {
            let t = signal.step(TICK, walk);
            if t != SignalTransition::None {
                out.push(t);
            }
            elapsed += TICK;
        }
        out
    }

    fn green_count(signal: &IntersectionSignal) -> usize {
        signal.groups().iter().filter(|g| g.state() == LightState::Green).count()
    }

    #[test]
    fn no_groups_is_rejected() {
        let mut walk = WalkGraph::new();
        let result = IntersectionSignal::new(
            vec![],
            vec![],
            vec![],
            vec![],
            SignalTiming::default(),
            StdRng::seed_from_u64(0),
            &mut walk,
        );
        assert!(matches!(result, Err(SignalError::NoPhaseGroups)));
    }

    #[test]
    fn empty_approaches_are_compacted() {
        let mut walk = WalkGraph::new();
        let (north, west, a, b) = two_groups(&mut walk);
        let signal = IntersectionSignal::new(
            north,
            vec![],
            vec![],
            west,
            SignalTiming::default(),
            StdRng::seed_from_u64(0),
            &mut walk,
        )
        .unwrap();
        assert_eq!(signal.groups().len(), 2);
        assert_eq!(signal.active_index(), 0);
        assert!(signal.is_active());
        // Green group holds pedestrians, red group releases them.
        assert!(walk[a].should_wait());
        assert!(!walk[b].should_wait());
    }

    #[test]
    fn amber_precedes_advance() {
        let mut walk = WalkGraph::new();
        let (north, south, a, _) = two_groups(&mut walk);
        let mut signal = IntersectionSignal::new(
            north,
            south,
            vec![],
            vec![],
            SignalTiming::default(),
            StdRng::seed_from_u64(1),
            &mut walk,
        )
        .unwrap();

        let transitions = run(&mut signal, &mut walk, Duration::from_secs(11));
        assert_eq!(transitions, vec![SignalTransition::Amber]);
        assert_eq!(signal.groups()[0].state(), LightState::Amber);
        assert!(walk[a].should_wait());
        assert!(!signal.is_active());

        let transitions = run(&mut signal, &mut walk, Duration::from_secs(1));
        assert_eq!(transitions, vec![SignalTransition::Advanced(1)]);
        assert!(!walk[a].should_wait());
    }

    #[test]
    fn never_two_greens() {
        let mut walk = WalkGraph::new();
        let groups: Vec<PhaseGroup> = (0..3)
            .map(|i| {
                let n = walk.add_node(WalkNodeKind::Crosswalk, Vec3::splat(i as f32));
                PhaseGroup::new(vec![SignalHead::new(vec![n])])
            })
            .collect();
        let mut signal =
            IntersectionSignal::from_groups(groups, SignalTiming::default(), StdRng::seed_from_u64(2), &mut walk)
                .unwrap();
        for i in 0..1000 {
            if i % 37 == 0 {
                signal.request_to_cross();
            }
            signal.step(TICK, &mut walk);
            assert!(green_count(&signal) <= 1);
        }
    }

    #[test]
    fn single_group_cycles_onto_itself() {
        let mut walk = WalkGraph::new();
        let (north, _, _, _) = two_groups(&mut walk);
        let mut signal = IntersectionSignal::new(
            north,
            vec![],
            vec![],
            vec![],
            SignalTiming::default(),
            StdRng::seed_from_u64(3),
            &mut walk,
        )
        .unwrap();
        let transitions = run(&mut signal, &mut walk, Duration::from_secs(12));
        assert_eq!(
            transitions,
            vec![SignalTransition::Amber, SignalTransition::Advanced(0)]
        );
        assert!(signal.is_active());
    }

    #[test]
    fn request_ignored_while_inactive() {
        let mut walk = WalkGraph::new();
        let (north, south, _, _) = two_groups(&mut walk);
        let mut signal = IntersectionSignal::new(
            north,
            south,
            vec![],
            vec![],
            forced(Duration::from_secs(5)),
            StdRng::seed_from_u64(4),
            &mut walk,
        )
        .unwrap();
        run(&mut signal, &mut walk, Duration::from_millis(10_500));
        assert!(!signal.is_active());
        assert!(!signal.request_to_cross());
        assert!(!signal.request_pending());
    }

    #[test]
    fn repeated_requests_rearm_the_timer() {
        let mut walk = WalkGraph::new();
        let (north, south, _, _) = two_groups(&mut walk);
        let mut signal = IntersectionSignal::new(
            north,
            south,
            vec![],
            vec![],
            forced(Duration::from_secs(5)),
            StdRng::seed_from_u64(5),
            &mut walk,
        )
        .unwrap();
        assert!(signal.request_to_cross());
        run(&mut signal, &mut walk, Duration::from_secs(4));
        assert!(signal.request_to_cross());
        let transitions = run(&mut signal, &mut walk, Duration::from_secs(4));
        assert!(transitions.is_empty());
        assert!(signal.request_pending());
        let transitions = run(&mut signal, &mut walk, Duration::from_secs(1));
        assert_eq!(transitions, vec![SignalTransition::PedestrianOverride]);
    }

    #[test]
    fn threshold_is_drawn_from_range() {
        let timing = SignalTiming::default();
        let mut rng = StdRng::seed_from_u64(6);
        for _ in 0..100 {
            let t = timing.draw_crossing_threshold(&mut rng);
            assert!(t >= timing.crossing_threshold_min && t < timing.crossing_threshold_max);
        }
    }

    #[test]
    fn registry_tags_crosswalk_nodes() {
        let mut walk = WalkGraph::new();
        let (north, south, a, b) = two_groups(&mut walk);
        let signal = IntersectionSignal::new(
            north,
            south,
            vec![],
            vec![],
            SignalTiming::default(),
            StdRng::seed_from_u64(7),
            &mut walk,
        )
        .unwrap();
        let mut registry = SignalRegistry::new();
        let id = registry.register(signal, &mut walk);
        assert_eq!(walk[a].signal(), Some(id));
        assert_eq!(walk[b].signal(), Some(id));
        assert!(registry.get(id).is_ok());
        assert_eq!(
            registry.get(SignalId(9)).err(),
            Some(SignalError::UnknownSignal(SignalId(9)))
        );
    }

    #[test]
    fn walk_graph_intersections_get_signals() {
        let mut grid = MapGrid::from_ascii(&[".#...", "####.", ".#..."]).unwrap();
        grid.assign_neighbors();
        crate::classify::RoadClassifier::new()
            .with_roundabout_chance(0)
            .classify(&mut grid, &mut StdRng::seed_from_u64(8))
            .unwrap();
        let mut walk = WalkGraphBuilder::new(&grid).build();
        let registry =
            SignalRegistry::for_walk_graph(&mut walk, SignalTiming::default(), &mut StdRng::seed_from_u64(9))
                .unwrap();

        // Only the four-way at (1, 1) is signalled.
        assert_eq!(registry.len(), 1);
        let (id, signal) = registry.iter().next().unwrap();
        assert_eq!(signal.groups().len(), 4);
        let cell = walk.cell(Location::new(1, 1)).unwrap();
        for side in Direction::ALL {
            for node in cell.crossings(side) {
                assert_eq!(walk[*node].signal(), Some(id));
            }
        }
        // North group is green, so its crosswalk holds pedestrians.
        assert!(walk[cell.crossings(Direction::Top)[0]].should_wait());
        assert!(!walk[cell.crossings(Direction::Bottom)[0]].should_wait());
    }
}
