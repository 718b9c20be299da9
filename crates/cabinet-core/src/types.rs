//! Core types used throughout the Cabinet games

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, the workhorse of arcade collision checks.
///
/// Stored as center plus half-extents so bounce reflection and overlap
/// tests stay symmetric around the center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub center: Vec2,
    pub half: Vec2,
}

impl Rect {
    /// Create a rectangle from its center and half-extents.
    pub fn new(center: Vec2, half: Vec2) -> Self {
        Self { center, half }
    }

    /// Create a rectangle from its top-left corner and full size.
    pub fn from_corner(corner: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            center: corner + half,
            half,
        }
    }

    /// Left edge x coordinate.
    pub fn left(&self) -> f32 {
        self.center.x - self.half.x
    }

    /// Right edge x coordinate.
    pub fn right(&self) -> f32 {
        self.center.x + self.half.x
    }

    /// Top edge y coordinate (y grows downward, screen convention).
    pub fn top(&self) -> f32 {
        self.center.y - self.half.y
    }

    /// Bottom edge y coordinate.
    pub fn bottom(&self) -> f32 {
        self.center.y + self.half.y
    }

    /// Whether a point lies inside (or on the edge of) the rectangle.
    pub fn contains(&self, p: Vec2) -> bool {
        (p.x - self.center.x).abs() <= self.half.x && (p.y - self.center.y).abs() <= self.half.y
    }

    /// Whether two rectangles overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        (self.center.x - other.center.x).abs() <= self.half.x + other.half.x
            && (self.center.y - other.center.y).abs() <= self.half.y + other.half.y
    }

    /// Clamp a point to lie within the rectangle.
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x.clamp(self.left(), self.right()),
            p.y.clamp(self.top(), self.bottom()),
        )
    }
}

/// RGBA color with floating point components (0.0 to 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    /// Create a color from RGB values (alpha = 1.0)
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA values
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from a hex value (0xRRGGBB)
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    /// Linear interpolation between two colors
    pub fn lerp(a: &Color, b: &Color, t: f32) -> Color {
        Color {
            r: a.r + (b.r - a.r) * t,
            g: a.g + (b.g - a.g) * t,
            b: a.b + (b.b - a.b) * t,
            a: a.a + (b.a - a.a) * t,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
