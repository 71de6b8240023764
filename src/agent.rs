//! Tick-driven pedestrian walker.
//!
//! An agent follows a walk-node route one tick at a time. Before stepping
//! onto a crosswalk governed by a signal that still has a green group it
//! asks the signal for a pedestrian phase and waits; it also holds at its
//! current node while the next node is flagged to make pedestrians wait.

use crate::constants::*;
use crate::signal::*;
use crate::walk::*;
use glam::Vec3;
use std::time::Duration;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct AgentId(pub u64);

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AgentStatus {
    Continue,
    Waiting,
    Done,
}

#[derive(Clone, Debug)]
pub struct PedestrianAgent {
    route: Vec<WalkNodeId>,
    index: usize,
    position: Vec3,
    heading: f32,
    speed: f32,
    patrol: bool,
    forward: bool,
    pause: Duration,
    pending_signal: Option<SignalId>,
}

impl PedestrianAgent {
    /// Place an agent on the first node of `route`.
    pub fn new(route: Vec<WalkNodeId>, walk: &WalkGraph, speed: f32, patrol: bool) -> Self {
        let position = route
            .first()
            .and_then(|id| walk.node(*id))
            .map(|n| n.position())
            .unwrap_or(Vec3::ZERO);
        let mut agent = PedestrianAgent {
            route,
            index: 0,
            position,
            heading: 0.0,
            speed,
            patrol,
            forward: true,
            pause: Duration::ZERO,
            pending_signal: None,
        };
        agent.face_next(walk);
        agent
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Yaw in degrees, clockwise from +z.
    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn route(&self) -> &[WalkNodeId] {
        &self.route
    }

    pub fn route_index(&self) -> usize {
        self.index
    }

    pub fn is_walking_forward(&self) -> bool {
        self.forward
    }

    /// The signal this agent is currently waiting on to cross.
    pub fn pending_signal(&self) -> Option<SignalId> {
        self.pending_signal
    }

    fn face_next(&mut self, walk: &WalkGraph) {
        let (Some(current), Some(next)) = (self.route.get(self.index), self.route.get(self.index + 1)) else {
            return;
        };
        let (Some(current), Some(next)) = (walk.node(*current), walk.node(*next)) else {
            return;
        };
        let direction = (next.position() - current.position()).normalize_or_zero();
        if direction != Vec3::ZERO {
            self.heading = direction.x.atan2(direction.z).to_degrees();
        }
    }

    fn wait(&mut self, duration: Duration) -> AgentStatus {
        self.pause = duration;
        AgentStatus::Waiting
    }

    pub fn step(&mut self, dt: Duration, walk: &WalkGraph, signals: &mut SignalRegistry) -> AgentStatus {
        if self.route.is_empty() {
            return AgentStatus::Done;
        }

        if !self.pause.is_zero() {
            self.pause = self.pause.saturating_sub(dt);
            if !self.pause.is_zero() {
                return AgentStatus::Waiting;
            }
        }

        if self.index + 1 >= self.route.len() {
            if !self.patrol {
                return AgentStatus::Done;
            }
            self.route.reverse();
            self.index = 0;
            self.forward = !self.forward;
            self.face_next(walk);
            return self.wait(TURNAROUND_PAUSE);
        }

        let Some(next) = walk.node(self.route[self.index + 1]) else {
            return AgentStatus::Done;
        };

        if let (true, Some(id)) = (next.is_crosswalk(), next.signal()) {
            if let Ok(signal) = signals.get_mut(id) {
                if signal.is_active() {
                    if !signal.request_pending() {
                        signal.request_to_cross();
                    }
                    self.pending_signal = Some(id);
                    return self.wait(CROSSING_POLL_INTERVAL);
                }
            }
        }

        // The request stays ours until it is granted or we walk past its crosswalk.
        if let Some(id) = self.pending_signal {
            let still_waiting =
                next.signal() == Some(id) && signals.get(id).map(|s| s.request_pending()).unwrap_or(false);
            if !still_waiting {
                self.pending_signal = None;
            }
        }

        let at_current = walk
            .node(self.route[self.index])
            .map(|n| n.position().distance(self.position) < ARRIVAL_RADIUS)
            .unwrap_or(false);
        if next.should_wait() && at_current {
            return self.wait(SHOULD_WAIT_POLL_INTERVAL);
        }

        let target = next.position();
        self.position = move_towards(self.position, target, self.speed * dt.as_secs_f32());
        if self.position.distance(target) < ARRIVAL_RADIUS {
            self.index += 1;
            self.face_next(walk);
        }

        AgentStatus::Continue
    }
}

fn move_towards(from: Vec3, to: Vec3, max_step: f32) -> Vec3 {
    let delta = to - from;
    let distance = delta.length();
    if distance <= max_step || distance == 0.0 {
        to
    } else {
        from + delta / distance * max_step
    }
}
