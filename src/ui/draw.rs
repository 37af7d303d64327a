//! Software drawing into an RGBA framebuffer
//!
//! Screen coordinates are pixels with the origin at the top-left. The game
//! world is y-up, so [`to_screen`] flips it when drawing the arena.

use std::path::Path;

use glam::Vec2;

use crate::consts::ARENA_HEIGHT;
use crate::sim::{Capsule, GameState};

pub type Rgba = [u8; 4];

pub const BACKGROUND: Rgba = [12, 12, 20, 255];
pub const WALL: Rgba = [150, 150, 170, 255];
pub const PADDLE: Rgba = [90, 200, 255, 255];
pub const BALL: Rgba = [255, 255, 255, 255];
pub const TEXT: Rgba = [230, 230, 240, 255];
pub const DIM_TEXT: Rgba = [160, 160, 180, 255];
pub const HIGHLIGHT: Rgba = [255, 220, 90, 255];
pub const ERROR: Rgba = [255, 100, 100, 255];

/// Glyph cell: 5x7 pixels plus one column of spacing
const GLYPH_WIDTH: i32 = 6;
const GLYPH_HEIGHT: i32 = 7;

/// World position to pixel position
#[inline]
pub fn to_screen(p: Vec2) -> Vec2 {
    Vec2::new(p.x, ARENA_HEIGHT - p.y)
}

/// Borrowed framebuffer with its dimensions
pub struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        debug_assert_eq!(frame.len(), (width * height * 4) as usize);
        Self { frame, width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: Rgba) {
        for px in self.frame.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<Rgba> {
        let idx = self.index(x, y)?;
        let mut out = [0; 4];
        out.copy_from_slice(&self.frame[idx..idx + 4]);
        Some(out)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(((y as u32 * self.width + x as u32) * 4) as usize)
    }

    /// Alpha-blend one pixel; out-of-bounds writes are dropped
    pub fn blend(&mut self, x: i32, y: i32, color: Rgba) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let a = color[3] as u16;
        let ia = 255 - a;
        for c in 0..3 {
            let dst = self.frame[idx + c] as u16;
            self.frame[idx + c] = ((color[c] as u16 * a + dst * ia) / 255) as u8;
        }
        self.frame[idx + 3] = 255;
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.width as i32);
        let y1 = (y + h).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(px, py, color);
            }
        }
    }

    pub fn stroke_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        if w <= 0 || h <= 0 {
            return;
        }
        for px in x..x + w {
            self.blend(px, y, color);
            self.blend(px, y + h - 1, color);
        }
        for py in y + 1..y + h - 1 {
            self.blend(x, py, color);
            self.blend(x + w - 1, py, color);
        }
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        self.fill_capsule(center, center, radius, color);
    }

    /// Every pixel within `radius` of the segment `a`-`b` (screen space)
    pub fn fill_capsule(&mut self, a: Vec2, b: Vec2, radius: f32, color: Rgba) {
        let min = a.min(b) - Vec2::splat(radius);
        let max = a.max(b) + Vec2::splat(radius);
        let r2 = radius * radius;
        for py in min.y.floor() as i32..=max.y.ceil() as i32 {
            for px in min.x.floor() as i32..=max.x.ceil() as i32 {
                let p = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
                let closest = crate::closest_point_on_segment(p, a, b);
                if p.distance_squared(closest) <= r2 {
                    self.blend(px, py, color);
                }
            }
        }
    }

    /// Draw `text` with its top-left corner at (x, y); returns the pen x after it
    pub fn text(&mut self, text: &str, x: i32, y: i32, scale: i32, color: Rgba) -> i32 {
        let mut pen = x;
        for ch in text.chars() {
            if let Some(rows) = glyph(ch) {
                for (ry, row) in rows.iter().enumerate() {
                    for rx in 0..5 {
                        if (row >> (4 - rx)) & 1 == 1 {
                            let (px, py) = (pen + rx * scale, y + ry as i32 * scale);
                            self.fill_rect(px, py, scale, scale, color);
                        }
                    }
                }
            }
            pen += GLYPH_WIDTH * scale;
        }
        pen
    }

    pub fn text_centered(&mut self, text: &str, center_x: i32, y: i32, scale: i32, color: Rgba) {
        let x = center_x - text_width(text, scale) / 2;
        self.text(text, x, y, scale, color);
    }

    /// Framed button; `hot` when the mouse hovers it
    pub fn button(&mut self, rect: ScreenRect, label: &str, hot: bool) {
        let fill = if hot { [70, 70, 110, 230] } else { [40, 40, 60, 200] };
        self.fill_rect(rect.x, rect.y, rect.w, rect.h, fill);
        self.stroke_rect(rect.x, rect.y, rect.w, rect.h, [200, 200, 220, 160]);
        let scale = 3;
        self.text_centered(
            label,
            rect.x + rect.w / 2,
            rect.y + (rect.h - GLYPH_HEIGHT * scale) / 2,
            scale,
            if hot { HIGHLIGHT } else { TEXT },
        );
    }

    pub fn save_png(&self, path: &Path) -> image::ImageResult<()> {
        image::save_buffer(path, self.frame, self.width, self.height, image::ColorType::Rgba8)
    }
}

pub fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * GLYPH_WIDTH * scale - scale
}

pub fn text_height(scale: i32) -> i32 {
    GLYPH_HEIGHT * scale
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl ScreenRect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x as f32
            && y >= self.y as f32
            && x < (self.x + self.w) as f32
            && y < (self.y + self.h) as f32
    }
}

fn draw_capsule(canvas: &mut Canvas<'_>, capsule: &Capsule, color: Rgba) {
    canvas.fill_capsule(to_screen(capsule.a), to_screen(capsule.b), capsule.radius, color);
}

/// Brick colour by row, so the grid reads as bands
fn brick_color(center_y: f32) -> Rgba {
    const BANDS: [Rgba; 5] = [
        [230, 80, 80, 255],
        [240, 160, 60, 255],
        [230, 220, 80, 255],
        [90, 210, 110, 255],
        [100, 140, 240, 255],
    ];
    let row = (center_y / 10.0) as usize;
    BANDS[row % BANDS.len()]
}

/// Arena, bricks, paddle and balls
pub fn draw_game(canvas: &mut Canvas<'_>, state: &GameState) {
    canvas.clear(BACKGROUND);
    for wall in &state.walls {
        draw_capsule(canvas, wall, WALL);
    }
    draw_capsule(canvas, &state.bottom, [120, 30, 30, 255]);

    for brick in &state.bricks {
        let top_left = to_screen(Vec2::new(brick.rect.min().x, brick.rect.max().y));
        let size = brick.rect.size();
        let color = brick_color(brick.rect.center.y);
        canvas.fill_rect(
            top_left.x as i32,
            top_left.y as i32,
            size.x as i32 - 1,
            size.y as i32 - 1,
            color,
        );
    }

    draw_capsule(canvas, &state.paddle.capsule(), PADDLE);
    for ball in &state.balls {
        canvas.fill_circle(to_screen(ball.pos), ball.radius, BALL);
    }
}

/// Lines of text in the top-left corner over a translucent panel
pub fn draw_hud(canvas: &mut Canvas<'_>, lines: &[String]) {
    let scale = 2;
    let line_height = text_height(scale) + 6;
    let width = lines.iter().map(|l| text_width(l, scale)).max().unwrap_or(0) + 16;
    let height = lines.len() as i32 * line_height + 10;
    canvas.fill_rect(60, 8, width, height, [0, 0, 0, 150]);
    for (i, line) in lines.iter().enumerate() {
        canvas.text(line, 68, 14 + i as i32 * line_height, scale, TEXT);
    }
}

fn glyph(ch: char) -> Option<[u8; 7]> {
    Some(match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b11110, 0b10001, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110],
        'H' => [0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001, 0b10001],
        'I' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b11111],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b10010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0b00000, 0b00100, 0b00000, 0b00000, 0b00100, 0b00000, 0b00000],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00100, 0b01000],
        '+' => [0b00000, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '_' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b11111],
        '=' => [0b00000, 0b00000, 0b11111, 0b00000, 0b11111, 0b00000, 0b00000],
        '/' => [0b00001, 0b00010, 0b00010, 0b00100, 0b01000, 0b01000, 0b10000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '<' => [0b00010, 0b00100, 0b01000, 0b10000, 0b01000, 0b00100, 0b00010],
        '>' => [0b01000, 0b00100, 0b00010, 0b00001, 0b00010, 0b00100, 0b01000],
        '[' => [0b01110, 0b01000, 0b01000, 0b01000, 0b01000, 0b01000, 0b01110],
        ']' => [0b01110, 0b00010, 0b00010, 0b00010, 0b00010, 0b00010, 0b01110],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '?' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100],
        '\'' => [0b00100, 0b00100, 0b01000, 0b00000, 0b00000, 0b00000, 0b00000],
        ' ' => [0; 7],
        _ => return None,
    })
}
