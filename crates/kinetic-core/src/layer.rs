//! Layer-level animation descriptions.
//!
//! Layer animations run on the surface's backing layer and never change
//! model values. Keyframe presets are transient; basic animations that must
//! outlive the group are persisted by the engine through breadcrumbs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::property::{Interpolate, Property, PropertyValue};
use crate::surface::Timing;

/// Normalised key times shared by every keyframe preset.
pub const KEY_TIMES: [f32; 6] = [0.0, 0.2, 0.4, 0.6, 0.8, 1.0];

/// The layer property an animation drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPath {
    PositionX,
    Scale,
    ScaleX,
    ScaleY,
    Rotation,
    Transform,
    Opacity,
    AnchorPoint,
    BorderColor,
    BorderWidth,
    ShadowColor,
    ShadowOffset,
    ShadowOpacity,
    ShadowRadius,
}

impl KeyPath {
    pub fn name(&self) -> &'static str {
        match self {
            KeyPath::PositionX => "position.x",
            KeyPath::Scale => "transform.scale",
            KeyPath::ScaleX => "transform.scale.x",
            KeyPath::ScaleY => "transform.scale.y",
            KeyPath::Rotation => "transform.rotation",
            KeyPath::Transform => "transform",
            KeyPath::Opacity => "opacity",
            KeyPath::AnchorPoint => "anchorPoint",
            KeyPath::BorderColor => "borderColor",
            KeyPath::BorderWidth => "borderWidth",
            KeyPath::ShadowColor => "shadowColor",
            KeyPath::ShadowOffset => "shadowOffset",
            KeyPath::ShadowOpacity => "shadowOpacity",
            KeyPath::ShadowRadius => "shadowRadius",
        }
    }

    /// The surface property this key path maps onto, if it is a whole one.
    pub fn property(&self) -> Option<Property> {
        match self {
            KeyPath::Transform => Some(Property::Transform3D),
            KeyPath::Opacity => Some(Property::Alpha),
            KeyPath::AnchorPoint => Some(Property::AnchorPoint),
            KeyPath::BorderColor => Some(Property::BorderColor),
            KeyPath::BorderWidth => Some(Property::BorderWidth),
            KeyPath::ShadowColor => Some(Property::ShadowColor),
            KeyPath::ShadowOffset => Some(Property::ShadowOffset),
            KeyPath::ShadowOpacity => Some(Property::ShadowOpacity),
            KeyPath::ShadowRadius => Some(Property::ShadowRadius),
            KeyPath::PositionX
            | KeyPath::Scale
            | KeyPath::ScaleX
            | KeyPath::ScaleY
            | KeyPath::Rotation => None,
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One animation inside a [`LayerAnimationGroup`].
#[derive(Debug, Clone, PartialEq)]
pub enum LayerAnimation {
    /// Animate from `from` (or the presented value) to `to`.
    Basic {
        key_path: KeyPath,
        from: Option<PropertyValue>,
        to: PropertyValue,
        autoreverses: bool,
    },
    /// Piecewise-linear curve through `values` at `key_times`.
    Keyframe {
        key_path: KeyPath,
        values: Vec<f32>,
        key_times: Vec<f32>,
        /// Offsets the current value instead of replacing it.
        additive: bool,
    },
}

impl LayerAnimation {
    pub fn basic(key_path: KeyPath, to: PropertyValue) -> Self {
        LayerAnimation::Basic {
            key_path,
            from: None,
            to,
            autoreverses: false,
        }
    }

    /// A keyframe curve at [`KEY_TIMES`].
    ///
    /// Sequences shorter than the key times hold their last value.
    pub fn keyframe(key_path: KeyPath, values: &[f32], additive: bool) -> Self {
        let mut values = values.to_vec();
        let rest = values.last().copied().unwrap_or(0.0);
        values.resize(KEY_TIMES.len().max(values.len()), rest);

        LayerAnimation::Keyframe {
            key_path,
            values,
            key_times: KEY_TIMES.to_vec(),
            additive,
        }
    }

    pub fn key_path(&self) -> KeyPath {
        match self {
            LayerAnimation::Basic { key_path, .. } | LayerAnimation::Keyframe { key_path, .. } => {
                *key_path
            }
        }
    }

    pub fn is_additive(&self) -> bool {
        matches!(self, LayerAnimation::Keyframe { additive: true, .. })
    }

    /// Keyframe value at normalised progress `t`.
    pub fn sample_keyframes(&self, t: f32) -> Option<f32> {
        let LayerAnimation::Keyframe {
            values, key_times, ..
        } = self
        else {
            return None;
        };

        let t = t.clamp(0.0, 1.0);
        let last = values.len().min(key_times.len()).checked_sub(1)?;
        for i in 0..last {
            let (t0, t1) = (key_times[i], key_times[i + 1]);
            if t <= t1 {
                let span = t1 - t0;
                let local = if span > 0.0 { (t - t0) / span } else { 1.0 };
                return Some(Interpolate::lerp(&values[i], &values[i + 1], local));
            }
        }
        Some(values[last])
    }

    /// Basic animation value at normalised progress `t`, given the value
    /// presented when the animation started.
    pub fn sample_basic(&self, presented: PropertyValue, t: f32) -> Option<PropertyValue> {
        let LayerAnimation::Basic {
            from,
            to,
            autoreverses,
            ..
        } = self
        else {
            return None;
        };

        let start = from.unwrap_or(presented);
        let t = t.clamp(0.0, 1.0);
        let t = if *autoreverses { 1.0 - (2.0 * t - 1.0).abs() } else { t };
        Some(start.lerp(to, t))
    }
}

/// Layer animations started together with one timing.
///
/// The group holds its final frame until it is removed (fill forwards).
#[derive(Debug, Clone, PartialEq)]
pub struct LayerAnimationGroup {
    pub animations: Vec<LayerAnimation>,
    pub timing: Timing,
    pub fill_forwards: bool,
}

impl LayerAnimationGroup {
    pub fn new(timing: Timing) -> Self {
        Self {
            animations: Vec::new(),
            timing,
            fill_forwards: true,
        }
    }

    pub fn push(&mut self, animation: LayerAnimation) {
        self.animations.push(animation);
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    /// Find the first animation driving `key_path`.
    pub fn animation(&self, key_path: KeyPath) -> Option<&LayerAnimation> {
        self.animations.iter().find(|a| a.key_path() == key_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyframe_padding() {
        let shake = LayerAnimation::keyframe(KeyPath::PositionX, &[0.0, 30.0, -30.0, 30.0, 0.0], true);
        let LayerAnimation::Keyframe {
            values, key_times, ..
        } = &shake
        else {
            panic!("expected keyframe animation");
        };
        assert_eq!(values.len(), key_times.len());
        assert_eq!(values.last(), Some(&0.0));
        assert!(shake.is_additive());
    }

    #[test]
    fn test_sample_keyframes() {
        let shake = LayerAnimation::keyframe(KeyPath::PositionX, &[0.0, 30.0, -30.0, 30.0, 0.0], true);
        assert_eq!(shake.sample_keyframes(0.0), Some(0.0));
        assert_eq!(shake.sample_keyframes(0.2), Some(30.0));
        assert!((shake.sample_keyframes(0.1).unwrap() - 15.0).abs() < 1e-4);
        assert_eq!(shake.sample_keyframes(1.0), Some(0.0));
    }

    #[test]
    fn test_sample_basic_autoreverse() {
        let flash = LayerAnimation::Basic {
            key_path: KeyPath::Opacity,
            from: Some(PropertyValue::Scalar(1.0)),
            to: PropertyValue::Scalar(0.0),
            autoreverses: true,
        };
        let presented = PropertyValue::Scalar(1.0);
        assert_eq!(flash.sample_basic(presented, 0.5), Some(PropertyValue::Scalar(0.0)));
        assert_eq!(flash.sample_basic(presented, 1.0), Some(PropertyValue::Scalar(1.0)));
        assert_eq!(flash.sample_keyframes(0.5), None);
    }

    #[test]
    fn test_key_path_properties() {
        assert_eq!(KeyPath::Transform.property(), Some(Property::Transform3D));
        assert_eq!(KeyPath::Rotation.property(), None);
        assert_eq!(KeyPath::ScaleX.to_string(), "transform.scale.x");
    }
}
