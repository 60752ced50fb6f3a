//! A host with no display, driven by a virtual clock.
//!
//! [`HeadlessSurface`] keeps its properties in memory and logs every request
//! the engine makes of it. Completion tokens are parked on a shared
//! [`HeadlessClock`] and finished when virtual time reaches the request's
//! end, so chains can be stepped deterministically in tests and tools:
//!
//! ```
//! use std::time::Duration;
//! use kinetic::prelude::*;
//! use kinetic::headless::{HeadlessClock, HeadlessSurface};
//!
//! let engine = Engine::new();
//! let clock = HeadlessClock::new();
//! let view = HeadlessSurface::new(&clock);
//!
//! view.alpha(0.3)
//!     .options([AnimationOption::Duration(Duration::from_millis(200))])
//!     .run(&engine)
//!     .unwrap();
//!
//! let elapsed = clock.settle(&engine).unwrap();
//! assert_eq!(elapsed, Duration::from_millis(200));
//! assert_eq!(view.scalar(Property::Alpha), Some(0.3));
//! ```

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Duration;

use kinetic_core::{
    Affine2, Color, CompletionToken, Engine, LayerAnimation, LayerAnimationGroup, Mat4, Property,
    PropertyTransition, PropertyValue, Rect, Surface, SurfaceId, Vec2,
};
use parking_lot::Mutex;

/// Upper bound on clock jumps taken by [`HeadlessClock::settle`].
pub const MAX_SETTLE_STEPS: usize = 10_000;

/// A parked completion (min-heap by due time, then arrival).
struct ClockEntry {
    due: Duration,
    seq: u64,
    token: CompletionToken,
}

impl PartialEq for ClockEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for ClockEntry {}

impl PartialOrd for ClockEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ClockEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct ClockState {
    now: Duration,
    seq: u64,
    queue: BinaryHeap<ClockEntry>,
    /// Tokens of animations that repeat forever.
    parked: Vec<CompletionToken>,
}

/// Virtual time shared by headless surfaces.
#[derive(Default)]
pub struct HeadlessClock {
    state: Mutex<ClockState>,
}

impl HeadlessClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Virtual time elapsed since the clock was created.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Completions waiting on the clock, including ones that never come due.
    pub fn pending_count(&self) -> usize {
        let state = self.state.lock();
        state.queue.len() + state.parked.len()
    }

    /// When the next parked completion comes due.
    pub fn next_due(&self) -> Option<Duration> {
        self.state.lock().queue.peek().map(|entry| entry.due)
    }

    /// Finish `token` once `after` has elapsed, or never for `None`.
    pub fn finish_after(&self, after: Option<Duration>, token: CompletionToken) {
        let mut state = self.state.lock();
        match after {
            Some(after) => {
                let due = state.now.saturating_add(after);
                state.seq += 1;
                let seq = state.seq;
                state.queue.push(ClockEntry { due, seq, token });
            }
            None => state.parked.push(token),
        }
    }

    /// Move time forward by `by`, finishing every completion that comes due.
    ///
    /// Returns the number of completions finished.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        self.advance_to(target)
    }

    fn advance_to(&self, target: Duration) -> usize {
        let due = {
            let mut state = self.state.lock();
            state.now = state.now.max(target);
            let mut due = Vec::new();
            while state.queue.peek().is_some_and(|entry| entry.due <= state.now) {
                if let Some(entry) = state.queue.pop() {
                    due.push(entry.token);
                }
            }
            due
        };

        let finished = due.len();
        due.into_iter().for_each(CompletionToken::finish);
        finished
    }

    /// Drive `engine` in fixed steps of `step` until it is idle.
    ///
    /// Returns `false` if the engine is still busy after `limit` steps.
    pub fn drive(&self, engine: &Engine, step: Duration, limit: usize) -> bool {
        engine.drain_events();
        for _ in 0..limit {
            if engine.is_idle() {
                return true;
            }
            self.advance(step);
            engine.drain_events();
        }
        engine.is_idle()
    }

    /// Drive `engine` until it is idle, jumping straight to each due time.
    ///
    /// Returns the virtual time that passed, or `None` if the engine is
    /// waiting on something the clock will never finish.
    pub fn settle(&self, engine: &Engine) -> Option<Duration> {
        let start = self.now();
        engine.drain_events();
        for _ in 0..MAX_SETTLE_STEPS {
            if engine.is_idle() {
                return Some(self.now() - start);
            }
            let next = self.next_due()?;
            self.advance_to(next);
            engine.drain_events();
        }
        tracing::warn!(target: "kinetic::headless", "clock did not settle");
        None
    }
}

impl std::fmt::Debug for HeadlessClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HeadlessClock")
            .field("now", &state.now)
            .field("queued", &state.queue.len())
            .field("parked", &state.parked.len())
            .finish()
    }
}

/// One request the engine made of a headless surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Properties {
        at: Duration,
        transition: PropertyTransition,
    },
    Layer {
        at: Duration,
        group: LayerAnimationGroup,
    },
    Schedule {
        at: Duration,
        delay: Duration,
    },
}

impl Request {
    /// Virtual time the request was made.
    pub fn at(&self) -> Duration {
        match self {
            Request::Properties { at, .. }
            | Request::Layer { at, .. }
            | Request::Schedule { at, .. } => *at,
        }
    }
}

struct ActiveLayer {
    started: Duration,
    group: LayerAnimationGroup,
}

struct SurfaceState {
    model: HashMap<Property, PropertyValue>,
    requests: Vec<Request>,
    layers: Vec<ActiveLayer>,
}

/// An in-memory surface for tests, previews and servers.
pub struct HeadlessSurface {
    id: SurfaceId,
    clock: Arc<HeadlessClock>,
    state: Mutex<SurfaceState>,
    interaction: AtomicBool,
}

impl HeadlessSurface {
    /// A 100x100 surface at the origin, fully opaque with identity transforms.
    pub fn new(clock: &Arc<HeadlessClock>) -> Arc<Self> {
        Self::with_frame(clock, Rect::new(0.0, 0.0, 100.0, 100.0))
    }

    pub fn with_frame(clock: &Arc<HeadlessClock>, frame: Rect) -> Arc<Self> {
        let model = HashMap::from([
            (Property::Transform, PropertyValue::Affine(Affine2::IDENTITY)),
            (Property::Transform3D, PropertyValue::Matrix(Mat4::IDENTITY)),
            (Property::Alpha, PropertyValue::Scalar(1.0)),
            (Property::Frame, PropertyValue::Rect(frame)),
            (
                Property::Bounds,
                PropertyValue::Rect(Rect::new(0.0, 0.0, frame.width(), frame.height())),
            ),
            (Property::AnchorPoint, PropertyValue::Vector(Vec2::splat(0.5))),
            (Property::CornerRadius, PropertyValue::Scalar(0.0)),
            (Property::BackgroundColor, PropertyValue::Color(Color::CLEAR)),
            (Property::BorderColor, PropertyValue::Color(Color::BLACK)),
            (Property::BorderWidth, PropertyValue::Scalar(0.0)),
            (Property::ShadowColor, PropertyValue::Color(Color::BLACK)),
            (Property::ShadowOpacity, PropertyValue::Scalar(0.0)),
            (Property::ShadowRadius, PropertyValue::Scalar(3.0)),
            (Property::ShadowOffset, PropertyValue::Vector(Vec2::new(0.0, -3.0))),
        ]);

        Arc::new(Self {
            id: SurfaceId::next(),
            clock: Arc::clone(clock),
            state: Mutex::new(SurfaceState {
                model,
                requests: Vec::new(),
                layers: Vec::new(),
            }),
            interaction: AtomicBool::new(true),
        })
    }

    /// Model value of `property` as a scalar.
    pub fn scalar(&self, property: Property) -> Option<f32> {
        self.property(property).and_then(|value| value.as_scalar())
    }

    /// The 2D transform model value.
    pub fn affine(&self) -> Affine2 {
        self.property(Property::Transform)
            .and_then(|value| value.as_affine())
            .unwrap_or(Affine2::IDENTITY)
    }

    /// The 3D transform model value.
    pub fn matrix(&self) -> Mat4 {
        self.property(Property::Transform3D)
            .and_then(|value| value.as_matrix())
            .unwrap_or(Mat4::IDENTITY)
    }

    pub fn is_interaction_enabled(&self) -> bool {
        self.interaction.load(AtomicOrdering::SeqCst)
    }

    /// Every request made so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.lock().requests.clear();
    }

    /// Value on screen at the clock's current time: the model value with
    /// running layer animations applied.
    pub fn presented(&self, property: Property) -> Option<PropertyValue> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.layers.retain(|layer| {
            layer.group.fill_forwards
                || layer
                    .group
                    .timing
                    .total()
                    .is_none_or(|total| now < layer.started.saturating_add(total))
        });

        let mut value = state.model.get(&property).copied()?;
        for layer in &state.layers {
            let progress = layer_progress(layer, now);
            for animation in &layer.group.animations {
                if animation.key_path().property() != Some(property) {
                    continue;
                }
                value = match animation {
                    LayerAnimation::Basic { .. } => {
                        animation.sample_basic(value, progress).unwrap_or(value)
                    }
                    LayerAnimation::Keyframe { additive, .. } => {
                        match (animation.sample_keyframes(progress), value) {
                            (Some(offset), PropertyValue::Scalar(base)) if *additive => {
                                PropertyValue::Scalar(base + offset)
                            }
                            (Some(sample), _) => PropertyValue::Scalar(sample),
                            (None, _) => value,
                        }
                    }
                };
            }
        }
        Some(value)
    }

    fn log(&self, request: Request) {
        self.state.lock().requests.push(request);
    }
}

/// Normalised progress through the current cycle of a layer group.
fn layer_progress(layer: &ActiveLayer, now: Duration) -> f32 {
    let timing = &layer.group.timing;
    let start = layer.started.saturating_add(timing.delay);
    if now < start || timing.duration.is_zero() {
        return if now < start { 0.0 } else { 1.0 };
    }
    if let Some(total) = timing.total()
        && now >= layer.started.saturating_add(total)
    {
        return 1.0;
    }
    let elapsed = (now - start).as_secs_f32() / timing.duration.as_secs_f32();
    let t = elapsed.fract();
    timing.curve.sample(t)
}

impl Surface for HeadlessSurface {
    fn surface_id(&self) -> SurfaceId {
        self.id
    }

    fn property(&self, property: Property) -> Option<PropertyValue> {
        let state = self.state.lock();
        match property {
            Property::Center => state
                .model
                .get(&Property::Frame)
                .and_then(|frame| frame.as_rect())
                .map(|frame| PropertyValue::Vector(frame.center())),
            _ => state.model.get(&property).copied(),
        }
    }

    fn set_property(&self, property: Property, value: PropertyValue) {
        let mut state = self.state.lock();
        match (property, value) {
            (Property::Center, PropertyValue::Vector(center)) => {
                if let Some(PropertyValue::Rect(frame)) = state.model.get_mut(&Property::Frame) {
                    frame.origin = center - frame.size * 0.5;
                }
            }
            _ => {
                state.model.insert(property, value);
            }
        }
    }

    fn clear_property(&self, property: Property) {
        let mut state = self.state.lock();
        match property {
            // Derived from the frame, which stays.
            Property::Center => {}
            _ => {
                state.model.remove(&property);
            }
        }
    }

    fn set_interaction_enabled(&self, enabled: bool) {
        self.interaction.store(enabled, AtomicOrdering::SeqCst);
    }

    fn animate_properties(&self, transition: PropertyTransition, token: CompletionToken) {
        let total = transition.timing.total();
        self.log(Request::Properties {
            at: self.clock.now(),
            transition,
        });
        self.clock.finish_after(total, token);
    }

    fn animate_layer(&self, group: LayerAnimationGroup, token: CompletionToken) {
        let now = self.clock.now();
        let total = group.timing.total();
        {
            let mut state = self.state.lock();
            state.requests.push(Request::Layer {
                at: now,
                group: group.clone(),
            });
            // A new group replaces the previous one, like re-adding under one key.
            state.layers.clear();
            state.layers.push(ActiveLayer {
                started: now,
                group,
            });
        }
        self.clock.finish_after(total, token);
    }

    fn schedule(&self, delay: Duration, token: CompletionToken) {
        self.log(Request::Schedule {
            at: self.clock.now(),
            delay,
        });
        self.clock.finish_after(Some(delay), token);
    }
}

impl std::fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("HeadlessSurface")
            .field("id", &self.id)
            .field("properties", &state.model.len())
            .field("requests", &state.requests.len())
            .field("interaction", &self.is_interaction_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetic_core::{Animating, AnimationOption, Curve, KeyPath};

    #[test]
    fn test_clock_orders_by_due_time() {
        let engine = Engine::new();
        let clock = HeadlessClock::new();
        let view = HeadlessSurface::new(&clock);

        view.delay(Duration::from_millis(300)).run(&engine).unwrap();
        view.delay(Duration::from_millis(100)).run(&engine).unwrap();
        assert_eq!(clock.next_due(), Some(Duration::from_millis(100)));
        assert_eq!(clock.pending_count(), 2);

        assert_eq!(clock.advance(Duration::from_millis(150)), 1);
        assert_eq!(clock.now(), Duration::from_millis(150));
        assert_eq!(clock.pending_count(), 1);
    }

    #[test]
    fn test_infinite_animation_never_settles() {
        let engine = Engine::new();
        let clock = HeadlessClock::new();
        let view = HeadlessSurface::new(&clock);

        view.shake()
            .options([AnimationOption::RepeatCount(f32::INFINITY)])
            .run(&engine)
            .unwrap();
        assert_eq!(clock.settle(&engine), None);
        assert_eq!(clock.pending_count(), 1);
        assert_eq!(engine.active_count(), 1);
    }

    #[test]
    fn test_drive_in_frames() {
        let engine = Engine::new();
        let clock = HeadlessClock::new();
        let view = HeadlessSurface::new(&clock);

        view.alpha(0.0)
            .options([AnimationOption::Duration(Duration::from_millis(100))])
            .run(&engine)
            .unwrap();
        assert!(!clock.drive(&engine, Duration::from_millis(16), 3));
        assert!(clock.drive(&engine, Duration::from_millis(16), 10));
        assert_eq!(view.scalar(Property::Alpha), Some(0.0));
    }

    #[test]
    fn test_center_follows_frame() {
        let clock = HeadlessClock::new();
        let view = HeadlessSurface::with_frame(&clock, Rect::new(10.0, 10.0, 20.0, 40.0));
        assert_eq!(
            view.property(Property::Center),
            Some(PropertyValue::Vector(Vec2::new(20.0, 30.0)))
        );

        view.set_property(Property::Center, PropertyValue::Vector(Vec2::ZERO));
        let frame = view.property(Property::Frame).and_then(|v| v.as_rect()).unwrap();
        assert_eq!(frame.origin, Vec2::new(-10.0, -20.0));
    }

    #[test]
    fn test_presented_samples_layer_animation() {
        let engine = Engine::new();
        let clock = HeadlessClock::new();
        let view = HeadlessSurface::new(&clock);

        view.flash()
            .options([AnimationOption::Curve(Curve::Linear)])
            .run(&engine)
            .unwrap();
        let Some(Request::Layer { group, .. }) = view.requests().pop() else {
            panic!("expected a layer request");
        };
        assert!(group.animation(KeyPath::Opacity).is_some());

        clock.advance(Duration::from_millis(350));
        let alpha = view.presented(Property::Alpha).and_then(|v| v.as_scalar()).unwrap();
        assert!(alpha.abs() < 1e-3, "alpha mid-flash was {alpha}");
        assert_eq!(view.scalar(Property::Alpha), Some(1.0));

        assert_eq!(clock.settle(&engine), Some(Duration::from_millis(1050)));
        let alpha = view.presented(Property::Alpha).and_then(|v| v.as_scalar()).unwrap();
        assert!((alpha - 1.0).abs() < 1e-3);
    }
}
