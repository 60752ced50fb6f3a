//! Animation steps.
//!
//! A [`Step`] describes one effect. Each step belongs to exactly one
//! [`StepClass`], which decides how the engine executes it:
//!
//! - property transitions mutate the surface model and ask the host to
//!   animate from the presented state,
//! - layer animations are attached to the backing layer as one group,
//! - custom steps run a sequence of stages of their own.

use std::f32::consts::PI;
use std::fmt;
use std::time::Duration;

use glam::{Affine2, Mat4, Vec2};

use crate::direction::Direction;
use crate::geometry::{Color, Rect};
use crate::layer::{KeyPath, LayerAnimation};
use crate::options::Options;
use crate::property::{Property, PropertyChange, PropertyValue};
use crate::surface::{PropertyTransition, Timing};

/// Distance travelled by [`Step::Fall`].
pub const FALL_DISTANCE: f32 = 400.0;
/// Rotation, in degrees, applied by [`Step::Fall`].
pub const FALL_ROTATION: f32 = 45.0;
/// Scale factor of the zoom presets.
pub const ZOOM_SCALE: f32 = 2.0;
/// Scale [`Step::Boing`] compresses to.
pub const BOING_SCALE: f32 = 0.6;
/// Height of the [`Step::Bounce`] hop.
pub const BOUNCE_HEIGHT: f32 = 50.0;

const SHAKE: [f32; 5] = [0.0, 30.0, -30.0, 30.0, 0.0];
const POP: [f32; 5] = [0.0, 0.2, -0.2, 0.2, 0.0];
const WOBBLE: [f32; 5] = [0.0, 0.3, -0.3, 0.3, 0.0];
const MORPH_X: [f32; 5] = [1.0, 1.3, 0.7, 1.3, 1.0];
const MORPH_Y: [f32; 5] = [1.0, 0.7, 1.3, 0.7, 1.0];
const SQUEEZE_X: [f32; 5] = [1.0, 1.5, 0.5, 1.5, 1.0];
const SQUEEZE_Y: [f32; 5] = [1.0, 0.5, 1.0, 0.5, 1.0];

/// How a step is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepClass {
    PropertyTransition,
    LayerAnimation,
    Custom,
}

/// One declared effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Translate(Vec2),
    Scale(Vec2),
    /// Rotation in degrees.
    Rotate(f32),
    Alpha(f32),
    Frame(Rect),
    Bounds(Rect),
    Center(Vec2),
    Size(Vec2),
    CornerRadius(f32),
    BackgroundColor(Color),
    BorderColor(Color),
    BorderWidth(f32),
    ShadowColor(Color),
    ShadowOffset(Vec2),
    ShadowOpacity(f32),
    ShadowRadius(f32),
    Transform(Affine2),
    Transform3D(Mat4),
    AnchorPoint(Vec2),

    FadeIn(Direction),
    FadeOut(Direction),
    Slide(Direction),
    Squeeze(Direction),
    Flip(Direction),

    ZoomIn,
    ZoomOut,
    Fall,
    Shake,
    Pop,
    Morph,
    Flash,
    Wobble,
    Swing,
    Boing,
    Bounce,

    /// Wait before the next context.
    Delay(Duration),
    /// Animate both transforms back to identity.
    Identity(Duration),
    /// Everything before this context runs without animation.
    Now,
}

impl Step {
    /// The execution class of this step.
    pub fn class(&self) -> StepClass {
        use Step::*;

        match self {
            Translate(_) | Scale(_) | Rotate(_) | Alpha(_) | Frame(_) | Bounds(_) | Center(_)
            | Size(_) | CornerRadius(_) | BackgroundColor(_) | Transform(_) | FadeIn(_)
            | FadeOut(_) | Slide(_) | ZoomIn | ZoomOut | Fall => StepClass::PropertyTransition,
            Squeeze(direction) if *direction != Direction::None => StepClass::PropertyTransition,
            AnchorPoint(_) | BorderColor(_) | BorderWidth(_) | ShadowColor(_) | ShadowOffset(_)
            | ShadowOpacity(_) | ShadowRadius(_) | Transform3D(_) | Squeeze(_) | Flip(_)
            | Shake | Pop | Morph | Flash | Wobble | Swing => StepClass::LayerAnimation,
            Boing | Bounce | Delay(_) | Identity(_) | Now => StepClass::Custom,
        }
    }

    /// The stable name of this step.
    pub fn name(&self) -> &'static str {
        use Step::*;

        match self {
            Translate(_) => "translate",
            Scale(_) => "scale",
            Rotate(_) => "rotate",
            Alpha(_) => "alpha",
            Frame(_) => "frame",
            Bounds(_) => "bounds",
            Center(_) => "center",
            Size(_) => "size",
            CornerRadius(_) => "cornerRadius",
            BackgroundColor(_) => "backgroundColor",
            BorderColor(_) => "borderColor",
            BorderWidth(_) => "borderWidth",
            ShadowColor(_) => "shadowColor",
            ShadowOffset(_) => "shadowOffset",
            ShadowOpacity(_) => "shadowOpacity",
            ShadowRadius(_) => "shadowRadius",
            Transform(_) => "transform",
            Transform3D(_) => "transform3D",
            AnchorPoint(_) => "anchorPoint",
            FadeIn(_) => "fadeIn",
            FadeOut(_) => "fadeOut",
            Slide(_) => "slide",
            Squeeze(_) => "squeeze",
            Flip(_) => "flip",
            ZoomIn => "zoomIn",
            ZoomOut => "zoomOut",
            Fall => "fall",
            Shake => "shake",
            Pop => "pop",
            Morph => "morph",
            Flash => "flash",
            Wobble => "wobble",
            Swing => "swing",
            Boing => "boing",
            Bounce => "bounce",
            Delay(_) => "delay",
            Identity(_) => "identity",
            Now => "now",
        }
    }

    /// One step of every kind, with neutral parameters.
    pub fn catalog() -> Vec<Step> {
        use Step::*;

        vec![
            Translate(Vec2::ZERO),
            Scale(Vec2::ONE),
            Rotate(0.0),
            AnchorPoint(Vec2::splat(0.5)),
            BackgroundColor(Color::CLEAR),
            CornerRadius(0.0),
            Alpha(1.0),
            Frame(Rect::ZERO),
            Bounds(Rect::ZERO),
            Center(Vec2::ZERO),
            Size(Vec2::ZERO),
            BorderColor(Color::CLEAR),
            BorderWidth(0.0),
            ShadowColor(Color::CLEAR),
            ShadowOffset(Vec2::ZERO),
            ShadowOpacity(0.0),
            ShadowRadius(0.0),
            Transform(Affine2::IDENTITY),
            Transform3D(Mat4::IDENTITY),
            FadeIn(Direction::None),
            FadeOut(Direction::None),
            Slide(Direction::None),
            Squeeze(Direction::None),
            ZoomIn,
            ZoomOut,
            Fall,
            Shake,
            Pop,
            Flip(Direction::None),
            Morph,
            Flash,
            Wobble,
            Swing,
            Boing,
            Bounce,
            Delay(Duration::ZERO),
            Identity(Duration::ZERO),
            Now,
        ]
    }

    /// The named presets a host can offer without parameters.
    pub fn presets() -> Vec<Step> {
        Self::catalog()
            .into_iter()
            .filter(|step| step.is_preset())
            .collect()
    }

    /// Whether this step is a directional or stateless preset.
    pub fn is_preset(&self) -> bool {
        use Step::*;

        matches!(
            self,
            FadeIn(_)
                | FadeOut(_)
                | Slide(_)
                | Squeeze(_)
                | Flip(_)
                | ZoomIn
                | ZoomOut
                | Fall
                | Shake
                | Pop
                | Morph
                | Flash
                | Wobble
                | Swing
                | Boing
                | Bounce
        )
    }

    /// Whether this step doubles the context's repeat count.
    pub(crate) fn doubles_repeat(&self) -> bool {
        matches!(self, Step::Flash)
    }

    /// Apply the state a property transition starts from.
    pub(crate) fn apply_start(&self, plan: &mut PropertyPlan) {
        match *self {
            Step::FadeIn(direction) => {
                plan.alpha = Some(0.0);
                plan.translation = Some(direction.translation());
            }
            Step::FadeOut(_) | Step::ZoomOut => plan.alpha = Some(1.0),
            Step::ZoomIn => {
                plan.alpha = Some(0.0);
                plan.scale = Some(Vec2::splat(ZOOM_SCALE));
            }
            _ => {}
        }
    }

    /// Accumulate the state a property transition ends in.
    ///
    /// `frame` is the surface frame before this context's direct edits.
    pub(crate) fn apply_end(&self, plan: &mut PropertyPlan, frame: Option<Rect>) {
        match *self {
            Step::Translate(offset) => plan.translation = Some(offset),
            Step::Scale(scale) => plan.scale = Some(scale),
            Step::Rotate(degrees) => plan.rotation = Some(degrees),
            Step::Alpha(alpha) => plan.alpha = Some(alpha),
            Step::Transform(transform) => plan.transform = Some(transform),
            Step::Frame(rect) => plan.edit(Property::Frame, PropertyValue::Rect(rect)),
            Step::Bounds(rect) => plan.edit(Property::Bounds, PropertyValue::Rect(rect)),
            Step::Center(center) => plan.edit(Property::Center, PropertyValue::Vector(center)),
            Step::Size(size) => {
                let frame = plan.frame().or(frame).unwrap_or(Rect::ZERO);
                plan.edit(Property::Frame, PropertyValue::Rect(frame.with_size(size)));
            }
            Step::CornerRadius(radius) => {
                plan.edit(Property::CornerRadius, PropertyValue::Scalar(radius))
            }
            Step::BackgroundColor(color) => {
                plan.edit(Property::BackgroundColor, PropertyValue::Color(color))
            }
            Step::FadeIn(direction) => {
                plan.alpha = Some(1.0);
                plan.translation = Some(-direction.translation());
            }
            Step::FadeOut(direction) => {
                plan.alpha = Some(0.0);
                plan.translation = Some(direction.translation());
            }
            Step::Slide(direction) => plan.translation = Some(direction.translation()),
            Step::Squeeze(direction) if direction != Direction::None => {
                plan.scale = Some(direction.scale());
                plan.translation = Some(direction.translation());
            }
            Step::ZoomIn => {
                plan.alpha = Some(1.0);
                plan.scale = Some(Vec2::splat(1.0 / ZOOM_SCALE));
            }
            Step::ZoomOut => {
                plan.alpha = Some(0.0);
                plan.scale = Some(Vec2::splat(ZOOM_SCALE));
            }
            Step::Fall => {
                plan.translation = Some(Vec2::new(0.0, FALL_DISTANCE));
                plan.rotation = Some(FALL_ROTATION);
            }
            _ => {}
        }
    }

    /// The layer animations this step contributes.
    ///
    /// `width` is the surface width used for the flip perspective.
    pub(crate) fn layer_animations(&self, width: f32) -> Vec<LayerAnimation> {
        match *self {
            Step::AnchorPoint(point) => vec![LayerAnimation::basic(
                KeyPath::AnchorPoint,
                PropertyValue::Vector(point),
            )],
            Step::BorderColor(color) => vec![LayerAnimation::basic(
                KeyPath::BorderColor,
                PropertyValue::Color(color),
            )],
            Step::BorderWidth(width) => vec![LayerAnimation::basic(
                KeyPath::BorderWidth,
                PropertyValue::Scalar(width),
            )],
            Step::ShadowColor(color) => vec![LayerAnimation::basic(
                KeyPath::ShadowColor,
                PropertyValue::Color(color),
            )],
            Step::ShadowOffset(offset) => vec![LayerAnimation::basic(
                KeyPath::ShadowOffset,
                PropertyValue::Vector(offset),
            )],
            Step::ShadowOpacity(opacity) => vec![LayerAnimation::basic(
                KeyPath::ShadowOpacity,
                PropertyValue::Scalar(opacity),
            )],
            Step::ShadowRadius(radius) => vec![LayerAnimation::basic(
                KeyPath::ShadowRadius,
                PropertyValue::Scalar(radius),
            )],
            Step::Transform3D(matrix) => vec![LayerAnimation::basic(
                KeyPath::Transform,
                PropertyValue::Matrix(matrix),
            )],
            Step::Squeeze(Direction::None) => vec![
                LayerAnimation::keyframe(KeyPath::ScaleX, &SQUEEZE_X, false),
                LayerAnimation::keyframe(KeyPath::ScaleY, &SQUEEZE_Y, false),
            ],
            Step::Flip(direction) => vec![LayerAnimation::Basic {
                key_path: KeyPath::Transform,
                from: Some(PropertyValue::Matrix(Mat4::IDENTITY)),
                to: PropertyValue::Matrix(direction.flip_rotation() * perspective(width)),
                autoreverses: false,
            }],
            Step::Shake => vec![LayerAnimation::keyframe(KeyPath::PositionX, &SHAKE, true)],
            Step::Pop => vec![LayerAnimation::keyframe(KeyPath::Scale, &POP, true)],
            Step::Morph => vec![
                LayerAnimation::keyframe(KeyPath::ScaleX, &MORPH_X, false),
                LayerAnimation::keyframe(KeyPath::ScaleY, &MORPH_Y, false),
            ],
            Step::Flash => vec![LayerAnimation::Basic {
                key_path: KeyPath::Opacity,
                from: Some(PropertyValue::Scalar(1.0)),
                to: PropertyValue::Scalar(0.0),
                autoreverses: true,
            }],
            Step::Wobble => vec![
                LayerAnimation::keyframe(KeyPath::Rotation, &WOBBLE, true),
                LayerAnimation::keyframe(KeyPath::PositionX, &SHAKE, true),
            ],
            Step::Swing => vec![LayerAnimation::keyframe(KeyPath::Rotation, &WOBBLE, true)],
            _ => Vec::new(),
        }
    }

    /// The custom effect this step runs, if any.
    ///
    /// With `no_animate` every stage collapses into an immediate edit.
    pub(crate) fn effect(&self, options: &Options) -> Option<Vec<CustomStage>> {
        let stages = match *self {
            Step::Boing => {
                let mut compress = Timing::settled(options.duration / 8, options.curve);
                compress.delay = options.delay;
                vec![
                    CustomStage::transition(compress, vec![scale_transform(BOING_SCALE)]),
                    CustomStage::transition(
                        spring(options, portion(options.duration, 7, 8)),
                        vec![identity_transform()],
                    ),
                ]
            }
            Step::Bounce => {
                let mut hop = Timing::settled(options.duration / 4, options.curve);
                hop.delay = options.delay;
                vec![
                    CustomStage::transition(
                        hop,
                        vec![PropertyChange::new(
                            Property::Transform,
                            PropertyValue::Affine(Affine2::from_translation(Vec2::new(
                                0.0,
                                -BOUNCE_HEIGHT,
                            ))),
                        )],
                    ),
                    CustomStage::transition(
                        spring(options, portion(options.duration, 3, 4)),
                        vec![identity_transform()],
                    ),
                ]
            }
            Step::Delay(wait) => vec![CustomStage::Wait(wait)],
            Step::Identity(duration) => vec![CustomStage::transition(
                Timing::settled(duration, options.curve),
                vec![
                    identity_transform(),
                    PropertyChange::new(Property::Transform3D, PropertyValue::Matrix(Mat4::IDENTITY)),
                ],
            )],
            _ => return None,
        };

        if !options.no_animate {
            return Some(stages);
        }

        let immediate: Vec<PropertyChange> = stages
            .into_iter()
            .flat_map(|stage| match stage {
                CustomStage::Transition(transition) => transition.changes,
                CustomStage::Immediate(changes) => changes,
                CustomStage::Wait(_) => Vec::new(),
            })
            .collect();
        Some(vec![CustomStage::Immediate(immediate)])
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One stage of a custom effect. Stages of an effect run one after another.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomStage {
    /// Set model values and ask the host to animate them.
    Transition(PropertyTransition),
    /// Complete after a delay.
    Wait(Duration),
    /// Set model values and complete at once.
    Immediate(Vec<PropertyChange>),
}

impl CustomStage {
    fn transition(timing: Timing, changes: Vec<PropertyChange>) -> Self {
        CustomStage::Transition(PropertyTransition { timing, changes })
    }
}

/// Accumulated property-transition state of one context.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PropertyPlan {
    pub translation: Option<Vec2>,
    pub scale: Option<Vec2>,
    /// Degrees.
    pub rotation: Option<f32>,
    pub alpha: Option<f32>,
    /// Replaces the base the deltas compose onto.
    pub transform: Option<Affine2>,
    pub edits: Vec<PropertyChange>,
}

impl PropertyPlan {
    /// Record a direct edit; a later edit of the same property wins.
    fn edit(&mut self, property: Property, value: PropertyValue) {
        match self.edits.iter_mut().find(|e| e.property == property) {
            Some(existing) => existing.value = value,
            None => self.edits.push(PropertyChange::new(property, value)),
        }
    }

    fn frame(&self) -> Option<Rect> {
        self.edits
            .iter()
            .find(|e| e.property == Property::Frame)
            .and_then(|e| e.value.as_rect())
    }

    /// Whether any transform delta or replacement was requested.
    pub fn touches_transform(&self) -> bool {
        self.translation.is_some()
            || self.scale.is_some()
            || self.rotation.is_some()
            || self.transform.is_some()
    }

    /// Compose `base · T(translation) · S(scale) · R(rotation)`.
    pub fn compose(&self, base: Affine2) -> Affine2 {
        let mut transform = self.transform.unwrap_or(base);
        if let Some(translation) = self.translation {
            transform = transform * Affine2::from_translation(translation);
        }
        if let Some(scale) = self.scale {
            transform = transform * Affine2::from_scale(scale);
        }
        if let Some(degrees) = self.rotation {
            transform = transform * Affine2::from_angle(degrees * PI / 180.0);
        }
        transform
    }
}

/// Perspective with `m34 = -1 / (2 · width)`.
fn perspective(width: f32) -> Mat4 {
    let mut matrix = Mat4::IDENTITY;
    if width > 0.0 {
        matrix.z_axis.w = -1.0 / (2.0 * width);
    }
    matrix
}

/// `numerator / denominator` of `duration`, saturating at [`Duration::MAX`].
fn portion(duration: Duration, numerator: u32, denominator: u32) -> Duration {
    match duration.checked_mul(numerator) {
        Some(scaled) => scaled / denominator,
        None => (duration / denominator).saturating_mul(numerator),
    }
}

fn spring(options: &Options, duration: Duration) -> Timing {
    Timing {
        duration,
        delay: Duration::ZERO,
        curve: options.curve,
        damping: options.damping,
        velocity: options.velocity,
        repeat_count: 1.0,
        autoreverse: false,
    }
}

fn scale_transform(scale: f32) -> PropertyChange {
    PropertyChange::new(
        Property::Transform,
        PropertyValue::Affine(Affine2::from_scale(Vec2::splat(scale))),
    )
}

fn identity_transform() -> PropertyChange {
    PropertyChange::new(Property::Transform, PropertyValue::Affine(Affine2::IDENTITY))
}
