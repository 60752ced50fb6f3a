//! Timing curves for animations.
//!
//! A curve maps linear progress (0.0 to 1.0) onto eased progress. The
//! engine hands the curve to the host untouched; [`Curve::sample`] exists so
//! hosts without a native curve implementation (and the headless host) can
//! evaluate it themselves.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// The easing curve of a context.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    /// Constant speed.
    Linear,
    /// Starts slow, accelerates.
    EaseIn,
    /// Starts fast, decelerates.
    EaseOut,
    /// Slow start and end.
    #[default]
    EaseInOut,
    /// A cubic Bézier through `(0, 0)`, the two control points and `(1, 1)`.
    Custom(Vec2, Vec2),
}

impl Curve {
    /// All named curves, with a neutral custom curve as placeholder.
    pub const ALL: [Curve; 5] = [
        Curve::Linear,
        Curve::EaseIn,
        Curve::EaseOut,
        Curve::EaseInOut,
        Curve::Custom(Vec2::ZERO, Vec2::ONE),
    ];

    /// The stable name of this curve.
    pub fn name(&self) -> &'static str {
        match self {
            Curve::Linear => "linear",
            Curve::EaseIn => "easeIn",
            Curve::EaseOut => "easeOut",
            Curve::EaseInOut => "easeInOut",
            Curve::Custom(..) => "custom",
        }
    }

    /// Map linear progress `t` onto this curve.
    ///
    /// `t` is clamped to `0.0..=1.0`; the endpoints always map to themselves.
    ///
    /// # Example
    ///
    /// ```
    /// use kinetic_core::Curve;
    ///
    /// assert_eq!(Curve::Linear.sample(0.5), 0.5);
    /// assert!(Curve::EaseIn.sample(0.5) < 0.5);
    /// assert!(Curve::EaseOut.sample(0.5) > 0.5);
    /// ```
    #[inline]
    pub fn sample(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);

        match *self {
            Curve::Linear => t,
            Curve::EaseIn => ease_in_quad(t),
            Curve::EaseOut => ease_out_quad(t),
            Curve::EaseInOut => ease_in_out_quad(t),
            Curve::Custom(p1, p2) => cubic_bezier(p1, p2, t),
        }
    }

    /// Interpolate between two scalars along this curve.
    #[inline]
    pub fn lerp(&self, start: f32, end: f32, t: f32) -> f32 {
        start + (end - start) * self.sample(t)
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Quadratic Easing
// =============================================================================

#[inline]
fn ease_in_quad(t: f32) -> f32 {
    t * t
}

#[inline]
fn ease_out_quad(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}

#[inline]
fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

// =============================================================================
// Cubic Bézier
// =============================================================================

const NEWTON_ITERATIONS: usize = 8;
const NEWTON_EPSILON: f32 = 1e-6;
const BISECTION_ITERATIONS: usize = 32;

#[inline]
fn bezier_component(a1: f32, a2: f32, s: f32) -> f32 {
    // B(s) = 3(1-s)^2 s a1 + 3(1-s) s^2 a2 + s^3
    let inv = 1.0 - s;
    3.0 * inv * inv * s * a1 + 3.0 * inv * s * s * a2 + s * s * s
}

#[inline]
fn bezier_slope(a1: f32, a2: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * a1 + 6.0 * inv * s * (a2 - a1) + 3.0 * s * s * (1.0 - a2)
}

fn cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 || x >= 1.0 {
        return x;
    }

    // Solve B_x(s) = x for s, then evaluate B_y(s).
    let mut s = x;
    for _ in 0..NEWTON_ITERATIONS {
        let err = bezier_component(p1.x, p2.x, s) - x;
        if err.abs() < NEWTON_EPSILON {
            return bezier_component(p1.y, p2.y, s);
        }
        let slope = bezier_slope(p1.x, p2.x, s);
        if slope.abs() < NEWTON_EPSILON {
            break;
        }
        s -= err / slope;
    }

    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    s = x;
    for _ in 0..BISECTION_ITERATIONS {
        let value = bezier_component(p1.x, p2.x, s);
        if (value - x).abs() < NEWTON_EPSILON {
            break;
        }
        if value < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) * 0.5;
    }
    bezier_component(p1.y, p2.y, s)
}
