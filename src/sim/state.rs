//! Game state and core simulation types

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::geometry::{Capsule, Rect};
use crate::consts::*;

/// Why a game session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// The last ball touched the bottom sensor
    BallLost,
    /// Every brick was destroyed
    Cleared,
    /// The player (or the window) asked to stop
    Quit,
    /// The episode ran out of ticks
    TickLimit,
}

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Playing,
    Over(EndReason),
}

/// Things that happened during a tick, drained by whoever scores the game
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    BallSpawned { ball_id: u32 },
    WallHit { ball_id: u32 },
    /// Ball touched the paddle; `offset` is contact x minus paddle x
    PaddleHit { ball_id: u32, offset: f32 },
    /// Brick was hit but still has armor left
    BrickHit { brick_id: u32, armor_left: u32 },
    BrickDestroyed { brick_id: u32 },
    BallLost { ball_id: u32 },
    LevelReset,
}

/// A ball entity
#[derive(Debug, Clone)]
pub struct Ball {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    /// Fixed speed the velocity is renormalized to
    pub speed: f32,
}

impl Ball {
    pub fn new(id: u32, pos: Vec2, direction: Vec2) -> Self {
        Self {
            id,
            pos,
            vel: direction.normalize_or_zero() * BALL_SPEED,
            radius: BALL_RADIUS,
            speed: BALL_SPEED,
        }
    }

    /// Keep the ball at its fixed speed
    #[inline]
    pub fn renormalize(&mut self) {
        self.vel = self.vel.normalize_or_zero() * self.speed;
    }
}

/// The player's paddle
#[derive(Debug, Clone)]
pub struct Paddle {
    pub pos: Vec2,
    /// Horizontal velocity (units/s)
    pub vel: f32,
    /// Shape relative to `pos`
    pub shape: Capsule,
}

impl Default for Paddle {
    fn default() -> Self {
        Self {
            pos: Vec2::new(ARENA_WIDTH / 2.0, PADDLE_Y),
            vel: 0.0,
            shape: Capsule::new(
                Vec2::new(-PADDLE_HALF_WIDTH, 0.0),
                Vec2::new(PADDLE_HALF_WIDTH, 0.0),
                PADDLE_RADIUS,
            ),
        }
    }
}

impl Paddle {
    /// Paddle shape in world space
    #[inline]
    pub fn capsule(&self) -> Capsule {
        self.shape.translated(self.pos)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.shape.width()
    }

    /// Leftmost x the paddle center may reach without overlapping a wall
    pub fn min_x(&self) -> f32 {
        WALL_INSET + WALL_RADIUS + self.shape.width() / 2.0 + self.shape.radius
    }

    /// Rightmost x the paddle center may reach without overlapping a wall
    pub fn max_x(&self) -> f32 {
        ARENA_WIDTH - self.min_x()
    }

    /// Move horizontally with the current velocity, stopping at the walls
    pub fn advance(&mut self, dt: f32) {
        let (min_x, max_x) = (self.min_x(), self.max_x());
        let x = self.pos.x + self.vel * dt;
        if x <= min_x || x >= max_x {
            self.vel = 0.0;
        }
        self.pos.x = x.clamp(min_x, max_x);
    }
}

/// A breakable brick
#[derive(Debug, Clone)]
pub struct Brick {
    pub id: u32,
    pub rect: Rect,
    /// Hits left before the brick is removed
    pub armor: u32,
}

/// Entire simulation state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Seed the RNG was created from
    pub seed: u64,
    pub rng: Pcg32,
    pub phase: GamePhase,
    pub time_ticks: u64,
    pub paddle: Paddle,
    pub balls: Vec<Ball>,
    pub bricks: Vec<Brick>,
    /// Left, top and right walls
    pub walls: Vec<Capsule>,
    /// Sensor that removes any ball touching it
    pub bottom: Capsule,
    /// Bricks destroyed this session
    pub bricks_destroyed: u32,
    /// Armor newly built bricks start with
    pub brick_armor: u32,
    next_id: u32,
    events: Vec<GameEvent>,
}

impl GameState {
    /// Create a fresh level: walls, paddle, brick grid and one ball
    pub fn new(seed: u64) -> Self {
        let mut state = Self::empty(seed);
        state.setup_level();
        state.events.clear();
        state
    }

    /// Walls and paddle only, no ball and no bricks
    pub fn empty(seed: u64) -> Self {
        let left = WALL_INSET;
        let right = ARENA_WIDTH - WALL_INSET;
        let bottom = WALL_INSET;
        let top = ARENA_HEIGHT - WALL_INSET;

        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            phase: GamePhase::Playing,
            time_ticks: 0,
            paddle: Paddle::default(),
            balls: Vec::new(),
            bricks: Vec::new(),
            walls: vec![
                Capsule::new(Vec2::new(left, bottom), Vec2::new(left, top), WALL_RADIUS),
                Capsule::new(Vec2::new(left, top), Vec2::new(right, top), WALL_RADIUS),
                Capsule::new(Vec2::new(right, top), Vec2::new(right, bottom), WALL_RADIUS),
            ],
            bottom: Capsule::new(Vec2::new(left, bottom), Vec2::new(right, bottom), WALL_RADIUS),
            bricks_destroyed: 0,
            brick_armor: 1,
            next_id: 1,
            events: Vec::new(),
        }
    }

    /// Generate a new unique entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Remove balls and bricks, rebuild the grid and serve a new ball
    pub fn setup_level(&mut self) {
        self.balls.clear();
        self.bricks.clear();
        self.build_bricks();
        self.spawn_ball();
        self.phase = GamePhase::Playing;
        self.events.push(GameEvent::LevelReset);
    }

    fn build_bricks(&mut self) {
        let size = Vec2::new(BRICK_WIDTH, BRICK_HEIGHT);
        let base_y = ARENA_HEIGHT - BRICK_TOP_GAP;
        for col in 0..BRICK_COLUMNS {
            let x = BRICK_ORIGIN_X + col as f32 * BRICK_WIDTH;
            for row in 0..BRICK_ROWS {
                let y = base_y + row as f32 * BRICK_HEIGHT;
                let id = self.next_entity_id();
                self.bricks.push(Brick {
                    id,
                    rect: Rect::new(Vec2::new(x, y), size),
                    armor: self.brick_armor.max(1),
                });
            }
        }
    }

    /// Serve a ball just above the paddle, heading up and randomly left or right
    pub fn spawn_ball(&mut self) -> u32 {
        let id = self.next_entity_id();
        let pos = self.paddle.pos + Vec2::new(0.0, BALL_SPAWN_OFFSET);
        let dx = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        self.balls.push(Ball::new(id, pos, Vec2::new(dx, 10.0)));
        self.events.push(GameEvent::BallSpawned { ball_id: id });
        id
    }

    /// Record an event for this tick
    #[inline]
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every event recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Split borrow used by the tick: mutable balls/bricks/events next to the static scenery
    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut Vec<Ball>, &mut Vec<Brick>, &Paddle, &[Capsule], &Capsule, &mut Vec<GameEvent>) {
        (
            &mut self.balls,
            &mut self.bricks,
            &self.paddle,
            &self.walls,
            &self.bottom,
            &mut self.events,
        )
    }

    /// The ball a controller should watch (oldest one still in play)
    pub fn primary_ball(&self) -> Option<&Ball> {
        self.balls.first()
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::Over(_))
    }

    /// Stop the session; the first reason given wins
    pub fn end(&mut self, reason: EndReason) {
        if !self.is_over() {
            self.phase = GamePhase::Over(reason);
        }
    }
}
