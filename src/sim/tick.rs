//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use super::collision::{
    CollisionResult, ball_capsule_collision, ball_rect_collision, paddle_normal, resolve_bounce,
};
use super::geometry::Capsule;
use super::state::{Ball, Brick, EndReason, GameEvent, GamePhase, GameState, Paddle};

/// Upper bound on per-tick ball substeps
const MAX_BALL_SUBSTEPS: u32 = 32;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Horizontal paddle velocity for this tick
    pub paddle_velocity: f32,
    /// Serve an extra ball
    pub spawn_ball: bool,
    /// Rebuild the level (works after game over too)
    pub reset_level: bool,
}

/// What happened to a ball during its substeps
enum BallFate {
    InPlay,
    Lost,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.reset_level {
        state.setup_level();
    }

    if state.phase != GamePhase::Playing {
        return;
    }

    if input.spawn_ball {
        state.spawn_ball();
    }

    state.time_ticks += 1;

    state.paddle.vel = input.paddle_velocity;
    state.paddle.advance(dt);

    let (balls, bricks, paddle, walls, bottom, events) = state.parts_mut();

    let mut lost = Vec::new();
    for ball in balls.iter_mut() {
        if let BallFate::Lost = step_ball(ball, paddle, walls, bottom, bricks, events, dt) {
            lost.push(ball.id);
        }
        ball.renormalize();
    }

    let before = bricks.len();
    bricks.retain(|b| b.armor > 0);
    let destroyed = (before - bricks.len()) as u32;
    balls.retain(|b| !lost.contains(&b.id));

    state.bricks_destroyed += destroyed;

    if state.balls.is_empty() {
        state.end(EndReason::BallLost);
    } else if state.bricks.is_empty() {
        state.end(EndReason::Cleared);
    }
}

/// Move one ball through the tick in substeps no longer than its radius
fn step_ball(
    ball: &mut Ball,
    paddle: &Paddle,
    walls: &[Capsule],
    bottom: &Capsule,
    bricks: &mut [Brick],
    events: &mut Vec<GameEvent>,
    dt: f32,
) -> BallFate {
    let travel = ball.vel.length() * dt;
    let substeps = ((travel / ball.radius).ceil() as u32).clamp(1, MAX_BALL_SUBSTEPS);
    let sub_dt = dt / substeps as f32;
    let paddle_shape = paddle.capsule();

    for _ in 0..substeps {
        ball.pos += ball.vel * sub_dt;

        if ball_capsule_collision(ball.pos, ball.radius, bottom).hit {
            events.push(GameEvent::BallLost { ball_id: ball.id });
            return BallFate::Lost;
        }

        for wall in walls {
            let contact = ball_capsule_collision(ball.pos, ball.radius, wall);
            if contact.hit {
                resolve_bounce(&mut ball.pos, &mut ball.vel, &contact, contact.normal);
                events.push(GameEvent::WallHit { ball_id: ball.id });
            }
        }

        let contact = ball_capsule_collision(ball.pos, ball.radius, &paddle_shape);
        if contact.hit {
            let normal = paddle_normal(paddle.pos.x, paddle.width(), contact.point.x);
            resolve_bounce(&mut ball.pos, &mut ball.vel, &contact, normal);
            events.push(GameEvent::PaddleHit {
                ball_id: ball.id,
                offset: contact.point.x - paddle.pos.x,
            });
        }

        // Every touched brick takes a hit; the deepest contact decides the bounce
        let mut deepest: Option<CollisionResult> = None;
        for brick in bricks.iter_mut().filter(|b| b.armor > 0) {
            let contact = ball_rect_collision(ball.pos, ball.radius, &brick.rect);
            if !contact.hit {
                continue;
            }
            brick.armor -= 1;
            if brick.armor == 0 {
                events.push(GameEvent::BrickDestroyed { brick_id: brick.id });
            } else {
                events.push(GameEvent::BrickHit {
                    brick_id: brick.id,
                    armor_left: brick.armor,
                });
            }
            if deepest
                .as_ref()
                .is_none_or(|d| contact.penetration > d.penetration)
            {
                deepest = Some(contact);
            }
        }
        if let Some(contact) = deepest {
            resolve_bounce(&mut ball.pos, &mut ball.vel, &contact, contact.normal);
        }
    }

    BallFate::InPlay
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use glam::Vec2;
    use proptest::prelude::*;

    /// Full level whose only ball is replaced by one at `pos` moving along `dir`
    fn with_ball(pos: Vec2, dir: Vec2) -> GameState {
        let mut state = GameState::new(12345);
        state.balls.clear();
        let id = state.next_entity_id();
        state.balls.push(Ball::new(id, pos, dir));
        state.drain_events();
        state
    }

    #[test]
    fn test_ball_speed_is_renormalized() {
        let mut state = GameState::new(1);
        state.balls[0].vel *= 0.25;
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!((state.balls[0].vel.length() - BALL_SPEED).abs() < 0.5);
    }

    #[test]
    fn test_brick_destroyed_on_contact() {
        let mut state = with_ball(Vec2::new(500.0, 585.0), Vec2::Y);
        let bricks_before = state.bricks.len();

        tick(&mut state, &TickInput::default(), SIM_DT);

        let events = state.drain_events();
        let destroyed: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::BrickDestroyed { .. }))
            .collect();
        assert_eq!(destroyed.len(), 1);
        assert_eq!(state.bricks.len(), bricks_before - 1);
        assert_eq!(state.bricks_destroyed, 1);
        assert!(state.balls[0].vel.y < 0.0);
        assert!(!state.bricks.iter().any(|b| b.rect.center == Vec2::new(500.0, 600.0)));
    }

    #[test]
    fn test_armored_brick_survives_first_hit() {
        let mut state = with_ball(Vec2::new(500.0, 585.0), Vec2::Y);
        for brick in state.bricks.iter_mut() {
            brick.armor = 2;
        }
        tick(&mut state, &TickInput::default(), SIM_DT);
        let events = state.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::BrickHit { armor_left: 1, .. })));
        assert_eq!(state.bricks.len(), (BRICK_COLUMNS * BRICK_ROWS) as usize);
    }

    #[test]
    fn test_paddle_hit_left_of_center_sends_ball_left() {
        let mut state = with_ball(Vec2::new(470.0, 125.0), Vec2::NEG_Y);
        tick(&mut state, &TickInput::default(), SIM_DT);

        let events = state.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::PaddleHit { offset, .. } if *offset < 0.0)));
        let ball = &state.balls[0];
        assert!(ball.vel.y > 0.0);
        assert!(ball.vel.x < 0.0);
    }

    #[test]
    fn test_paddle_hit_right_of_center_sends_ball_right() {
        let mut state = with_ball(Vec2::new(530.0, 125.0), Vec2::NEG_Y);
        tick(&mut state, &TickInput::default(), SIM_DT);
        let ball = &state.balls[0];
        assert!(ball.vel.y > 0.0);
        assert!(ball.vel.x > 0.0);
    }

    #[test]
    fn test_ball_lost_ends_game() {
        let mut state = with_ball(Vec2::new(700.0, 80.0), Vec2::NEG_Y);
        state.paddle.pos.x = 200.0;

        for _ in 0..10 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            if state.is_over() {
                break;
            }
        }

        assert_eq!(state.phase, GamePhase::Over(EndReason::BallLost));
        assert!(state.balls.is_empty());
        assert!(state
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::BallLost { .. })));
    }

    #[test]
    fn test_game_over_freezes_state() {
        let mut state = GameState::new(5);
        state.end(EndReason::Quit);
        let ticks = state.time_ticks;
        let input = TickInput {
            paddle_velocity: 1000.0,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.time_ticks, ticks);
        assert_eq!(state.paddle.pos.x, ARENA_WIDTH / 2.0);
    }

    #[test]
    fn test_reset_level_revives_game() {
        let mut state = GameState::new(5);
        state.bricks.truncate(3);
        state.end(EndReason::BallLost);

        let input = TickInput {
            reset_level: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);

        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.balls.len(), 1);
        assert_eq!(state.bricks.len(), (BRICK_COLUMNS * BRICK_ROWS) as usize);
    }

    #[test]
    fn test_spawn_ball_adds_ball() {
        let mut state = GameState::new(5);
        let input = TickInput {
            spawn_ball: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.balls.len(), 2);
    }

    #[test]
    fn test_all_bricks_gone_clears_level() {
        let mut state = GameState::new(5);
        state.bricks.clear();
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.phase, GamePhase::Over(EndReason::Cleared));
    }

    #[test]
    fn test_paddle_stops_at_wall() {
        let mut state = GameState::new(5);
        let input = TickInput {
            paddle_velocity: -PADDLE_AI_SPEED,
            ..Default::default()
        };
        for _ in 0..200 {
            tick(&mut state, &input, SIM_DT);
        }
        assert_eq!(state.paddle.pos.x, state.paddle.min_x());
    }

    #[test]
    fn test_determinism() {
        let mut state1 = GameState::new(99999);
        let mut state2 = GameState::new(99999);

        let inputs = [
            TickInput { paddle_velocity: 2000.0, ..Default::default() },
            TickInput { spawn_ball: true, ..Default::default() },
            TickInput { paddle_velocity: -2000.0, ..Default::default() },
            TickInput::default(),
        ];

        for _ in 0..100 {
            for input in &inputs {
                tick(&mut state1, input, SIM_DT);
                tick(&mut state2, input, SIM_DT);
            }
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.balls.len(), state2.balls.len());
        assert_eq!(state1.bricks.len(), state2.bricks.len());
        for (a, b) in state1.balls.iter().zip(&state2.balls) {
            assert_eq!(a.pos, b.pos);
            assert_eq!(a.vel, b.vel);
        }
    }

    proptest! {
        #[test]
        fn prop_free_balls_keep_fixed_speed(
            seed in any::<u64>(),
            moves in prop::collection::vec(-1i8..=1, 1..400),
        ) {
            let mut state = GameState::new(seed);
            for m in moves {
                let input = TickInput {
                    paddle_velocity: m as f32 * PADDLE_AI_SPEED,
                    ..Default::default()
                };
                tick(&mut state, &input, SIM_DT);
                for ball in &state.balls {
                    prop_assert!((ball.vel.length() - BALL_SPEED).abs() < 0.5);
                }
                let paddle = &state.paddle;
                prop_assert!(paddle.pos.x >= paddle.min_x() && paddle.pos.x <= paddle.max_x());
                if state.is_over() {
                    break;
                }
            }
        }
    }
}
