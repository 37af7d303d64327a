//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (insertion order of balls and bricks)
//! - No rendering or platform dependencies

pub mod collision;
pub mod geometry;
pub mod state;
pub mod tick;

pub use collision::{
    CollisionResult, ball_capsule_collision, ball_rect_collision, paddle_normal, reflect_velocity,
};
pub use geometry::{Capsule, Rect};
pub use state::{Ball, Brick, EndReason, GameEvent, GamePhase, GameState, Paddle};
pub use tick::{TickInput, tick};
