//! Minimal colour and geometry values used by steps and surfaces.
//!
//! Points, sizes and offsets use [`glam::Vec2`]; 2D transforms use
//! [`glam::Affine2`] and layer transforms use [`glam::Mat4`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An RGBA colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const CLEAR: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    /// Create an opaque colour.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a colour with explicit alpha.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Component-wise linear interpolation.
    pub fn lerp(&self, other: &Color, t: f32) -> Color {
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Vec2::ZERO,
        size: Vec2::ZERO,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    /// The centre point of the rectangle.
    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    /// A copy of this rectangle with a different size and the same origin.
    pub fn with_size(&self, size: Vec2) -> Rect {
        Rect {
            origin: self.origin,
            size,
        }
    }

    pub fn lerp(&self, other: &Rect, t: f32) -> Rect {
        Rect {
            origin: self.origin.lerp(other.origin, t),
            size: self.size.lerp(other.size, t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_center() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.center(), Vec2::new(60.0, 45.0));
    }

    #[test]
    fn test_rect_with_size_keeps_origin() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0).with_size(Vec2::new(5.0, 6.0));
        assert_eq!(rect, Rect::new(10.0, 20.0, 5.0, 6.0));
    }

    #[test]
    fn test_color_lerp() {
        let mid = Color::BLACK.lerp(&Color::WHITE, 0.5);
        assert_eq!(mid, Color::rgb(0.5, 0.5, 0.5));
    }
}
