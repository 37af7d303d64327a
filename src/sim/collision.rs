//! Collision detection and response
//!
//! The ball is the only moving collider that matters: it is tested against
//! capsules (walls, bottom sensor, paddle) and boxes (bricks). The paddle
//! does not reflect along its true surface normal; the bounce direction is
//! shaped by where on the paddle the ball lands.

use glam::Vec2;

use super::geometry::{Capsule, Rect};
use crate::rotate;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the surface of the obstacle
    pub point: Vec2,
    /// Surface normal at the contact (pointing toward the ball center)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check collision between a ball and a capsule
pub fn ball_capsule_collision(
    ball_pos: Vec2,
    ball_radius: f32,
    capsule: &Capsule,
) -> CollisionResult {
    let closest = capsule.closest_point(ball_pos);
    let offset = ball_pos - closest;
    let dist = offset.length();
    let reach = ball_radius + capsule.radius;

    if dist >= reach {
        return CollisionResult::miss();
    }

    // Ball center sits on the centerline: push along the segment's left-hand perpendicular
    let normal = if dist > 1e-6 {
        offset / dist
    } else {
        let along = (capsule.b - capsule.a).normalize_or_zero();
        if along == Vec2::ZERO {
            Vec2::Y
        } else {
            along.perp()
        }
    };

    CollisionResult {
        hit: true,
        point: closest + normal * capsule.radius,
        normal,
        penetration: reach - dist,
    }
}

/// Check collision between a ball and an axis-aligned box
pub fn ball_rect_collision(ball_pos: Vec2, ball_radius: f32, rect: &Rect) -> CollisionResult {
    let closest = rect.closest_point(ball_pos);
    let offset = ball_pos - closest;
    let dist_sq = offset.length_squared();

    if dist_sq > 1e-12 {
        let dist = dist_sq.sqrt();
        if dist >= ball_radius {
            return CollisionResult::miss();
        }
        return CollisionResult {
            hit: true,
            point: closest,
            normal: offset / dist,
            penetration: ball_radius - dist,
        };
    }

    // Center inside the box (tunneling case): leave through the nearest face
    let (min, max) = (rect.min(), rect.max());
    let faces = [
        (ball_pos.x - min.x, Vec2::NEG_X),
        (max.x - ball_pos.x, Vec2::X),
        (ball_pos.y - min.y, Vec2::NEG_Y),
        (max.y - ball_pos.y, Vec2::Y),
    ];
    let (depth, normal) = faces
        .into_iter()
        .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or((0.0, Vec2::Y));

    CollisionResult {
        hit: true,
        point: ball_pos + normal * depth,
        normal,
        penetration: depth + ball_radius,
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Bounce normal for a ball touching the paddle at `contact_x`
///
/// Straight up, rotated by `(paddle_x - contact_x) / paddle_width / 2`
/// radians: landing left of center tilts it left, right of center tilts it
/// right.
#[inline]
pub fn paddle_normal(paddle_x: f32, paddle_width: f32, contact_x: f32) -> Vec2 {
    if paddle_width <= 0.0 {
        return Vec2::Y;
    }
    let delta = paddle_x - contact_x;
    rotate(Vec2::Y, delta / paddle_width / 2.0)
}

/// Move the ball out of the obstacle and reflect it if it is moving inward
pub fn resolve_bounce(pos: &mut Vec2, vel: &mut Vec2, contact: &CollisionResult, normal: Vec2) {
    *pos += contact.normal * contact.penetration;
    if vel.dot(normal) < 0.0 {
        *vel = reflect_velocity(*vel, normal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn horizontal(y: f32) -> Capsule {
        Capsule::new(Vec2::new(0.0, y), Vec2::new(100.0, y), 10.0)
    }

    #[test]
    fn test_ball_capsule_hit_from_above() {
        let result = ball_capsule_collision(Vec2::new(50.0, 12.0), 5.0, &horizontal(0.0));
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::Y);
        assert!((result.penetration - 3.0).abs() < 1e-5);
        assert!((result.point.y - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_ball_capsule_miss() {
        let result = ball_capsule_collision(Vec2::new(50.0, 15.0), 5.0, &horizontal(0.0));
        assert!(!result.hit);
    }

    #[test]
    fn test_ball_capsule_end_cap() {
        // Beyond the right end, diagonal contact with the rounded cap
        let result = ball_capsule_collision(Vec2::new(108.0, 8.0), 5.0, &horizontal(0.0));
        assert!(result.hit);
        assert!(result.normal.x > 0.0 && result.normal.y > 0.0);
    }

    #[test]
    fn test_ball_rect_hit_from_below() {
        let rect = Rect::new(Vec2::new(500.0, 600.0), Vec2::new(20.0, 10.0));
        let result = ball_rect_collision(Vec2::new(500.0, 592.0), 5.0, &rect);
        assert!(result.hit);
        assert_eq!(result.normal, Vec2::NEG_Y);
        assert!((result.penetration - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_ball_rect_center_inside() {
        let rect = Rect::new(Vec2::new(500.0, 600.0), Vec2::new(20.0, 10.0));
        let result = ball_rect_collision(Vec2::new(500.0, 596.0), 5.0, &rect);
        assert!(result.hit);
        // Nearest face is the bottom one
        assert_eq!(result.normal, Vec2::NEG_Y);
        assert!((result.penetration - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_reflect_velocity() {
        let reflected = reflect_velocity(Vec2::new(100.0, 0.0), Vec2::new(-1.0, 0.0));
        assert!((reflected.x + 100.0).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }

    #[test]
    fn test_paddle_normal_tilts_toward_contact_side() {
        let center = paddle_normal(500.0, 100.0, 500.0);
        assert!((center - Vec2::Y).length() < 1e-6);

        let left = paddle_normal(500.0, 100.0, 460.0);
        assert!(left.x < 0.0 && left.y > 0.0);

        let right = paddle_normal(500.0, 100.0, 540.0);
        assert!(right.x > 0.0 && right.y > 0.0);

        // 40 units off center on a 100 wide paddle is 0.2 radians
        assert!((left.x + 0.2f32.sin()).abs() < 1e-5);
    }

    #[test]
    fn test_resolve_bounce_only_reflects_inbound() {
        let contact = CollisionResult {
            hit: true,
            point: Vec2::ZERO,
            normal: Vec2::Y,
            penetration: 1.0,
        };
        let mut pos = Vec2::ZERO;
        let mut vel = Vec2::new(0.0, 10.0);
        resolve_bounce(&mut pos, &mut vel, &contact, Vec2::Y);
        assert_eq!(pos, Vec2::Y);
        assert_eq!(vel, Vec2::new(0.0, 10.0));

        let mut vel = Vec2::new(3.0, -10.0);
        resolve_bounce(&mut pos, &mut vel, &contact, Vec2::Y);
        assert_eq!(vel, Vec2::new(3.0, 10.0));
    }
}
