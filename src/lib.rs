//! NEAT Breakout - a Breakout clone played by a human or an evolved network
//!
//! Core modules:
//! - `sim`: Deterministic simulation (paddle, ball, bricks, collisions)
//! - `fitness`: Maps simulation events onto a genome's fitness
//! - `agent`: Paddle controllers (keyboard or neural network)
//! - `episode`: One game session from spawn to game over
//! - `neat`: NEAT config, generational loop, reporters and checkpoints
//! - `training`: Sequential genome evaluation, checkpoints and replays
//! - `settings`: Persisted application preferences
//! - `ui`: Window, framebuffer drawing, launcher menu and dialogs

pub mod agent;
pub mod episode;
pub mod fitness;
pub mod neat;
pub mod settings;
pub mod sim;
pub mod training;
pub mod ui;

pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (200 Hz)
    pub const SIM_DT: f32 = 1.0 / 200.0;
    /// Maximum simulation steps per rendered frame
    pub const MAX_SUBSTEPS: u32 = 64;

    /// Arena dimensions (y axis points up)
    pub const ARENA_WIDTH: f32 = 1000.0;
    pub const ARENA_HEIGHT: f32 = 800.0;
    /// Distance of the wall centerlines from the arena border
    pub const WALL_INSET: f32 = 50.0;
    pub const WALL_RADIUS: f32 = 10.0;

    /// Paddle defaults
    pub const PADDLE_Y: f32 = 100.0;
    pub const PADDLE_HALF_WIDTH: f32 = 50.0;
    pub const PADDLE_RADIUS: f32 = 15.0;
    /// Paddle speed when driven by a network
    pub const PADDLE_AI_SPEED: f32 = 2000.0;
    /// Paddle speed when driven by the arrow keys
    pub const PADDLE_HUMAN_SPEED: f32 = 1500.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 5.0;
    /// Ball speed is renormalized to this every tick
    pub const BALL_SPEED: f32 = 2000.0;
    /// Spawn offset above the paddle center
    pub const BALL_SPAWN_OFFSET: f32 = 40.0;

    /// Brick grid
    pub const BRICK_COLUMNS: u32 = 41;
    pub const BRICK_ROWS: u32 = 10;
    pub const BRICK_WIDTH: f32 = 20.0;
    pub const BRICK_HEIGHT: f32 = 10.0;
    pub const BRICK_ORIGIN_X: f32 = 100.0;
    /// Lowest brick row sits this far below the top of the arena
    pub const BRICK_TOP_GAP: f32 = 200.0;
}

/// Rotate a vector counter-clockwise by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

/// Closest point to `p` on the segment `a`-`b`
#[inline]
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}
