//! Animatable surface properties and the breadcrumb log.
//!
//! Every mutation the engine performs on a surface is expressed as a
//! [`PropertyChange`]. Changes that must be undone or re-applied when a
//! context finishes are recorded as [`Breadcrumb`]s in a [`BreadcrumbLog`]
//! and replayed by the engine during unwind.

use std::fmt;

use glam::{Affine2, Mat4, Vec2};
use serde::{Deserialize, Serialize};

use crate::geometry::{Color, Rect};
use crate::surface::SurfaceId;

/// A property of a surface that steps can read or mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    /// 2D affine transform of the surface.
    Transform,
    /// 3D transform of the backing layer.
    Transform3D,
    Alpha,
    Frame,
    Bounds,
    Center,
    AnchorPoint,
    CornerRadius,
    BackgroundColor,
    BorderColor,
    BorderWidth,
    ShadowColor,
    ShadowOffset,
    ShadowOpacity,
    ShadowRadius,
}

impl Property {
    pub fn name(&self) -> &'static str {
        match self {
            Property::Transform => "transform",
            Property::Transform3D => "transform3D",
            Property::Alpha => "alpha",
            Property::Frame => "frame",
            Property::Bounds => "bounds",
            Property::Center => "center",
            Property::AnchorPoint => "anchorPoint",
            Property::CornerRadius => "cornerRadius",
            Property::BackgroundColor => "backgroundColor",
            Property::BorderColor => "borderColor",
            Property::BorderWidth => "borderWidth",
            Property::ShadowColor => "shadowColor",
            Property::ShadowOffset => "shadowOffset",
            Property::ShadowOpacity => "shadowOpacity",
            Property::ShadowRadius => "shadowRadius",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The value of a surface property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Scalar(f32),
    Vector(Vec2),
    Rect(Rect),
    Color(Color),
    Affine(Affine2),
    Matrix(Mat4),
}

impl PropertyValue {
    pub fn as_scalar(&self) -> Option<f32> {
        match *self {
            PropertyValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<Vec2> {
        match *self {
            PropertyValue::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_rect(&self) -> Option<Rect> {
        match *self {
            PropertyValue::Rect(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match *self {
            PropertyValue::Color(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_affine(&self) -> Option<Affine2> {
        match *self {
            PropertyValue::Affine(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<Mat4> {
        match *self {
            PropertyValue::Matrix(v) => Some(v),
            _ => None,
        }
    }
}

/// Values that can be linearly interpolated.
pub trait Interpolate: Clone {
    /// Linearly interpolate between `self` and `other` by factor `t`.
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolate for PropertyValue {
    /// Interpolates matching variants component-wise.
    ///
    /// Mismatched variants snap to `other` once `t` reaches 1.0.
    fn lerp(&self, other: &Self, t: f32) -> Self {
        use PropertyValue::*;

        match (self, other) {
            (Scalar(a), Scalar(b)) => Scalar(Interpolate::lerp(a, b, t)),
            (Vector(a), Vector(b)) => Vector(a.lerp(*b, t)),
            (Rect(a), Rect(b)) => Rect(a.lerp(b, t)),
            (Color(a), Color(b)) => Color(a.lerp(b, t)),
            (Affine(a), Affine(b)) => Affine(Affine2::from_mat3(
                glam::Mat3::from(*a) * (1.0 - t) + glam::Mat3::from(*b) * t,
            )),
            (Matrix(a), Matrix(b)) => Matrix(*a * (1.0 - t) + *b * t),
            _ if t >= 1.0 => *other,
            _ => *self,
        }
    }
}

/// One property assignment requested by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub property: Property,
    pub value: PropertyValue,
}

impl PropertyChange {
    pub fn new(property: Property, value: PropertyValue) -> Self {
        Self { property, value }
    }
}

/// What replaying a breadcrumb does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadcrumbAction {
    /// Re-apply the end value so it outlives the animation.
    Persist,
    /// Restore the value captured before the animation.
    Revert,
    /// Remove the value; the surface had none before the animation.
    Clear,
}

/// A recorded property edit replayed when a context finishes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub surface: SurfaceId,
    pub property: Property,
    pub value: PropertyValue,
    pub action: BreadcrumbAction,
}

/// The breadcrumbs of one context, at most one per property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreadcrumbLog {
    entries: Vec<Breadcrumb>,
}

impl BreadcrumbLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation of `property` from `original` to `end`.
    ///
    /// With `remove_on_completion` the log keeps a revert entry holding the
    /// first original seen for the property, or a clear entry when the
    /// surface had no value; otherwise a persist entry holding the latest
    /// end value.
    pub fn record(
        &mut self,
        surface: SurfaceId,
        property: Property,
        original: Option<PropertyValue>,
        end: PropertyValue,
        remove_on_completion: bool,
    ) {
        let (action, value) = match (remove_on_completion, original) {
            (true, Some(original)) => (BreadcrumbAction::Revert, original),
            (true, None) => (BreadcrumbAction::Clear, end),
            (false, _) => (BreadcrumbAction::Persist, end),
        };

        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|b| b.surface == surface && b.property == property)
        {
            debug_assert_eq!(
                entry.action == BreadcrumbAction::Persist,
                action == BreadcrumbAction::Persist,
                "mixed breadcrumb actions for one property"
            );
            if action == BreadcrumbAction::Persist {
                entry.value = value;
            }
            return;
        }

        self.entries.push(Breadcrumb {
            surface,
            property,
            value,
            action,
        });
    }

    pub fn entries(&self) -> &[Breadcrumb] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every entry in recording order.
    pub fn drain(&mut self) -> impl Iterator<Item = Breadcrumb> + '_ {
        self.entries.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> SurfaceId {
        SurfaceId::from_raw(1)
    }

    #[test]
    fn test_persist_keeps_latest_end_value() {
        let mut log = BreadcrumbLog::new();
        log.record(surface(), Property::Alpha, Some(PropertyValue::Scalar(1.0)), PropertyValue::Scalar(0.5), false);
        log.record(surface(), Property::Alpha, Some(PropertyValue::Scalar(0.5)), PropertyValue::Scalar(0.2), false);

        assert_eq!(log.len(), 1);
        let entry = log.entries()[0];
        assert_eq!(entry.action, BreadcrumbAction::Persist);
        assert_eq!(entry.value, PropertyValue::Scalar(0.2));
    }

    #[test]
    fn test_revert_keeps_first_original() {
        let mut log = BreadcrumbLog::new();
        log.record(surface(), Property::Alpha, Some(PropertyValue::Scalar(1.0)), PropertyValue::Scalar(0.5), true);
        log.record(surface(), Property::Alpha, Some(PropertyValue::Scalar(0.5)), PropertyValue::Scalar(0.2), true);

        assert_eq!(log.len(), 1);
        let entry = log.entries()[0];
        assert_eq!(entry.action, BreadcrumbAction::Revert);
        assert_eq!(entry.value, PropertyValue::Scalar(1.0));
    }

    #[test]
    fn test_missing_original_clears() {
        let mut log = BreadcrumbLog::new();
        let white = PropertyValue::Color(Color::WHITE);
        log.record(surface(), Property::BorderColor, None, white, true);
        log.record(surface(), Property::BorderColor, Some(white), PropertyValue::Color(Color::BLACK), true);

        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].action, BreadcrumbAction::Clear);

        // Without removal the end value persists as usual.
        let mut log = BreadcrumbLog::new();
        log.record(surface(), Property::BorderColor, None, white, false);
        assert_eq!(log.entries()[0].action, BreadcrumbAction::Persist);
        assert_eq!(log.entries()[0].value, white);
    }

    #[test]
    fn test_distinct_properties_get_distinct_entries() {
        let mut log = BreadcrumbLog::new();
        log.record(surface(), Property::Alpha, Some(PropertyValue::Scalar(1.0)), PropertyValue::Scalar(0.0), false);
        log.record(
            surface(),
            Property::BorderWidth,
            Some(PropertyValue::Scalar(0.0)),
            PropertyValue::Scalar(2.0),
            false,
        );
        assert_eq!(log.len(), 2);
        assert_eq!(log.drain().count(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_breadcrumbs_serialize() {
        let mut log = BreadcrumbLog::new();
        log.record(surface(), Property::Alpha, Some(PropertyValue::Scalar(1.0)), PropertyValue::Scalar(0.3), true);

        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"revert\""));
        assert!(json.contains("\"alpha\""));

        let back: BreadcrumbLog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, log);
    }

    #[test]
    fn test_lerp_scalar_and_mismatch() {
        let a = PropertyValue::Scalar(1.0);
        let b = PropertyValue::Scalar(0.0);
        assert_eq!(a.lerp(&b, 0.25), PropertyValue::Scalar(0.75));

        let c = PropertyValue::Color(Color::WHITE);
        assert_eq!(a.lerp(&c, 0.5), a);
        assert_eq!(a.lerp(&c, 1.0), c);
    }

    #[test]
    fn test_lerp_affine_translation() {
        let a = PropertyValue::Affine(Affine2::IDENTITY);
        let b = PropertyValue::Affine(Affine2::from_translation(Vec2::new(0.0, 200.0)));
        let mid = a.lerp(&b, 0.5).as_affine().unwrap();
        assert!((mid.translation.y - 100.0).abs() < 1e-4);
    }
}
