//! Qualitative parameters of directional presets.

use std::f32::consts::PI;
use std::fmt;

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Distance, in points, that directional presets travel.
pub const TRAVEL: f32 = 200.0;

/// The axis a direction moves along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        match self {
            Axis::Horizontal => "horizontal",
            Axis::Vertical => "vertical",
        }
    }
}

/// Direction of a fade, slide, squeeze or flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::None,
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Direction::None => "none",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// The axis this direction moves along, or `None` for [`Direction::None`].
    pub fn axis(&self) -> Option<Axis> {
        match self {
            Direction::None => None,
            Direction::Up | Direction::Down => Some(Axis::Vertical),
            Direction::Left | Direction::Right => Some(Axis::Horizontal),
        }
    }

    /// Offset travelled by fade and slide presets.
    pub fn translation(&self) -> Vec2 {
        match self {
            Direction::None => Vec2::ZERO,
            Direction::Up => Vec2::new(0.0, -TRAVEL),
            Direction::Down => Vec2::new(0.0, TRAVEL),
            Direction::Left => Vec2::new(-TRAVEL, 0.0),
            Direction::Right => Vec2::new(TRAVEL, 0.0),
        }
    }

    /// Stretch applied by the directional squeeze preset.
    pub fn scale(&self) -> Vec2 {
        match self.axis() {
            None => Vec2::ONE,
            Some(Axis::Vertical) => Vec2::new(1.0, 2.0),
            Some(Axis::Horizontal) => Vec2::new(2.0, 1.0),
        }
    }

    /// Half-turn used by the flip preset.
    ///
    /// Up and down rotate about the x axis, left and right about the y axis.
    pub fn flip_rotation(&self) -> Mat4 {
        match self {
            Direction::None => Mat4::IDENTITY,
            Direction::Up => Mat4::from_axis_angle(Vec3::X, -PI),
            Direction::Down => Mat4::from_axis_angle(Vec3::X, PI),
            Direction::Left => Mat4::from_axis_angle(Vec3::Y, -PI),
            Direction::Right => Mat4::from_axis_angle(Vec3::Y, PI),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
