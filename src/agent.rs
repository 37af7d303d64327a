//! Paddle controllers
//!
//! A controller turns the current game state (and, for humans, the keys held
//! down this frame) into the input for the next simulation tick.

use symbios_neat::CppnEvaluator;

use crate::consts::{PADDLE_AI_SPEED, PADDLE_HUMAN_SPEED};
use crate::neat::{GenomeKey, NeatGenome};
use crate::sim::{GameState, TickInput};

/// Network inputs: ball x, ball y, |paddle x - ball x|, |paddle y - ball y|
pub const NUM_FEATURES: usize = 4;
/// Network outputs: move left, stay, move right
pub const NUM_ACTIONS: usize = 3;

/// Keyboard state sampled once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualInput {
    pub left: bool,
    pub right: bool,
    pub spawn_ball: bool,
    pub reset_level: bool,
}

pub trait PaddleController {
    fn command(&mut self, state: &GameState, manual: &ManualInput) -> TickInput;

    /// Short label shown in the HUD
    fn label(&self) -> &str;
}

/// Arrow keys move the paddle, space serves a ball, R rebuilds the level
#[derive(Debug, Clone)]
pub struct HumanController {
    speed: f32,
}

impl Default for HumanController {
    fn default() -> Self {
        Self {
            speed: PADDLE_HUMAN_SPEED,
        }
    }
}

impl PaddleController for HumanController {
    fn command(&mut self, _state: &GameState, manual: &ManualInput) -> TickInput {
        let direction = manual.right as i32 - manual.left as i32;
        TickInput {
            paddle_velocity: direction as f32 * self.speed,
            spawn_ball: manual.spawn_ball,
            reset_level: manual.reset_level,
        }
    }

    fn label(&self) -> &str {
        "HUMAN"
    }
}

/// Feature vector of the oldest ball in play; zeros when there is none
pub fn features(state: &GameState) -> [f32; NUM_FEATURES] {
    let Some(ball) = state.primary_ball() else {
        return [0.0; NUM_FEATURES];
    };
    let paddle = state.paddle.pos;
    [
        ball.pos.x,
        ball.pos.y,
        (paddle.x - ball.pos.x).abs(),
        (paddle.y - ball.pos.y).abs(),
    ]
}

/// Index of the strongest output minus one, limited to -1, 0 or 1.
/// Ties go to the lowest index; no outputs means stay.
pub fn action_from_outputs(outputs: &[f32]) -> f32 {
    let best = outputs
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        });
    match best {
        Some((index, _)) => (index as f32 - 1.0).clamp(-1.0, 1.0),
        None => 0.0,
    }
}

/// Paddle driven by an evolved network
#[derive(Debug, Clone)]
pub struct NetworkController {
    genome: NeatGenome,
    speed: f32,
    label: String,
}

impl NetworkController {
    pub fn new(genome: NeatGenome, label: impl Into<String>) -> Self {
        Self {
            genome,
            speed: PADDLE_AI_SPEED,
            label: label.into(),
        }
    }

    pub fn from_genome(genome: &NeatGenome, key: GenomeKey) -> Self {
        Self::new(genome.clone(), format!("GENOME {key}"))
    }
}

impl PaddleController for NetworkController {
    fn command(&mut self, state: &GameState, _manual: &ManualInput) -> TickInput {
        let network = CppnEvaluator::new(&self.genome);
        let outputs = network.evaluate(&features(state));
        TickInput {
            paddle_velocity: action_from_outputs(&outputs) * self.speed,
            ..Default::default()
        }
    }

    fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use symbios_neat::{Activation, NeatConfig};

    #[test]
    fn test_features_follow_primary_ball() {
        let mut state = GameState::new(1);
        state.balls[0].pos = Vec2::new(300.0, 400.0);
        state.paddle.pos.x = 450.0;
        assert_eq!(features(&state), [300.0, 400.0, 150.0, 300.0]);

        state.balls.clear();
        assert_eq!(features(&state), [0.0; NUM_FEATURES]);
    }

    #[test]
    fn test_argmax_maps_to_direction() {
        assert_eq!(action_from_outputs(&[0.9, 0.1, 0.2]), -1.0);
        assert_eq!(action_from_outputs(&[0.1, 0.9, 0.2]), 0.0);
        assert_eq!(action_from_outputs(&[0.1, 0.1, 0.2]), 1.0);
        assert_eq!(action_from_outputs(&[0.5, 0.5, 0.5]), -1.0);
        assert_eq!(action_from_outputs(&[]), 0.0);
    }

    #[test]
    fn test_human_keys() {
        let state = GameState::new(1);
        let mut human = HumanController::default();
        let left = ManualInput {
            left: true,
            ..Default::default()
        };
        assert_eq!(human.command(&state, &left).paddle_velocity, -PADDLE_HUMAN_SPEED);
        let both = ManualInput {
            left: true,
            right: true,
            spawn_ball: true,
            ..Default::default()
        };
        let input = human.command(&state, &both);
        assert_eq!(input.paddle_velocity, 0.0);
        assert!(input.spawn_ball);
    }

    #[test]
    fn test_network_steers_towards_strongest_output() {
        let config = NeatConfig {
            use_bias: false,
            output_activation: Activation::Tanh,
            ..NeatConfig::minimal(NUM_FEATURES, NUM_ACTIONS)
        };
        let mut genome = NeatGenome::minimal(config);
        let mut rng = Pcg32::seed_from_u64(1);
        // ball x feeds the "right" output only
        let conn = genome
            .add_connection(genome.input_ids[0], genome.output_ids[2], &mut rng)
            .unwrap();
        genome.connections[conn].weight = 1.0;

        let mut controller = NetworkController::from_genome(&genome, 5);
        let state = GameState::new(1);
        let manual = ManualInput {
            reset_level: true,
            ..Default::default()
        };
        let input = controller.command(&state, &manual);
        assert_eq!(input.paddle_velocity, PADDLE_AI_SPEED);
        assert!(!input.reset_level);
        assert_eq!(controller.label(), "GENOME 5");
    }
}
