//! Fitness shaping
//!
//! Turns what happens in the simulation into the scalar a genome is ranked
//! by: a small reward for every tick the ball stays in play, a large one for
//! each destroyed brick, and a one-off penalty when the ball is lost.

use serde::{Deserialize, Serialize};

use crate::sim::GameEvent;

/// Reward and penalty constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessRules {
    /// Added every simulation tick
    pub alive_tick: f64,
    /// Added for every destroyed brick
    pub brick_destroyed: f64,
    /// Added each time the ball touches the paddle
    pub paddle_hit: f64,
    /// Added once when the episode ends with the ball out of bounds
    pub ball_lost: f64,
}

impl Default for FitnessRules {
    fn default() -> Self {
        Self {
            alive_tick: 0.001,
            brick_destroyed: 15.0,
            paddle_hit: 0.0,
            ball_lost: -10.0,
        }
    }
}

/// Running fitness of one episode
#[derive(Debug, Clone)]
pub struct FitnessTracker {
    rules: FitnessRules,
    fitness: f64,
    ticks: u64,
    bricks: u32,
    paddle_hits: u32,
    penalized: bool,
}

impl FitnessTracker {
    pub fn new(rules: FitnessRules) -> Self {
        Self {
            rules,
            fitness: 0.0,
            ticks: 0,
            bricks: 0,
            paddle_hits: 0,
            penalized: false,
        }
    }

    pub fn rules(&self) -> &FitnessRules {
        &self.rules
    }

    /// One tick survived
    pub fn on_tick(&mut self) {
        self.ticks += 1;
        self.fitness += self.rules.alive_tick;
    }

    pub fn on_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::BrickDestroyed { .. } => {
                self.bricks += 1;
                self.fitness += self.rules.brick_destroyed;
            }
            GameEvent::PaddleHit { .. } => {
                self.paddle_hits += 1;
                self.fitness += self.rules.paddle_hit;
            }
            _ => {}
        }
    }

    /// The episode ended with the ball out of bounds; only counted once
    pub fn on_ball_lost(&mut self) {
        if !self.penalized {
            self.penalized = true;
            self.fitness += self.rules.ball_lost;
        }
    }

    #[inline]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[inline]
    pub fn bricks(&self) -> u32 {
        self.bricks
    }

    #[inline]
    pub fn paddle_hits(&self) -> u32 {
        self.paddle_hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_brick_adds_fixed_reward() {
        let mut tracker = FitnessTracker::new(FitnessRules::default());
        tracker.on_event(&GameEvent::BrickDestroyed { brick_id: 1 });
        tracker.on_event(&GameEvent::BrickDestroyed { brick_id: 2 });
        assert_eq!(tracker.fitness(), 30.0);
        assert_eq!(tracker.bricks(), 2);
    }

    #[test]
    fn test_brick_hit_without_destruction_is_free() {
        let mut tracker = FitnessTracker::new(FitnessRules::default());
        tracker.on_event(&GameEvent::BrickHit { brick_id: 1, armor_left: 1 });
        assert_eq!(tracker.fitness(), 0.0);
    }

    #[test]
    fn test_penalty_applied_once() {
        let mut tracker = FitnessTracker::new(FitnessRules::default());
        tracker.on_ball_lost();
        tracker.on_ball_lost();
        assert_eq!(tracker.fitness(), -10.0);
    }

    #[test]
    fn test_ticks_accumulate() {
        let mut tracker = FitnessTracker::new(FitnessRules::default());
        for _ in 0..1000 {
            tracker.on_tick();
        }
        assert!((tracker.fitness() - 1.0).abs() < 1e-9);
        assert_eq!(tracker.ticks(), 1000);
    }

    #[test]
    fn test_custom_paddle_reward() {
        let rules = FitnessRules { paddle_hit: 2.0, ..Default::default() };
        let mut tracker = FitnessTracker::new(rules);
        tracker.on_event(&GameEvent::PaddleHit { ball_id: 1, offset: 3.0 });
        assert_eq!(tracker.fitness(), 2.0);
        assert_eq!(tracker.paddle_hits(), 1);
    }

    fn event_strategy() -> impl Strategy<Value = u8> {
        0u8..5
    }

    proptest! {
        #[test]
        fn prop_fitness_never_below_penalty(
            events in prop::collection::vec(event_strategy(), 0..300)
        ) {
            let mut tracker = FitnessTracker::new(FitnessRules::default());
            for e in events {
                match e {
                    0 => tracker.on_tick(),
                    1 => tracker.on_event(&GameEvent::BrickDestroyed { brick_id: 1 }),
                    2 => tracker.on_event(&GameEvent::PaddleHit { ball_id: 1, offset: 0.0 }),
                    3 => tracker.on_event(&GameEvent::WallHit { ball_id: 1 }),
                    _ => tracker.on_ball_lost(),
                }
                prop_assert!(tracker.fitness() >= -10.0);
            }
        }
    }
}
