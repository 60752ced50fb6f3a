//! Chains of contexts and the fluent builder that declares them.
//!
//! A [`Chain`] owns its contexts in order and runs them one at a time,
//! tracking progress with a cursor. Chains are declared with a
//! [`ChainBuilder`], usually through the [`Animating`] methods on a surface,
//! and started by an explicit terminal call:
//!
//! - [`ChainBuilder::run`] hands the chain to the engine, which keeps it
//!   alive until it finishes.
//! - [`ChainBuilder::prepare`] returns a [`ChainHandle`] that the caller
//!   keeps and starts with [`ChainHandle::commit`].
//!
//! Dropping a builder runs nothing.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use glam::{Affine2, Mat4, Vec2};
use slotmap::new_key_type;

use crate::context::{Completion, Context, ContextState, PhaseSink};
use crate::direction::Direction;
use crate::engine::{ChainHandle, Engine};
use crate::error::Result;
use crate::geometry::{Color, Rect};
use crate::options::{AnimationOption, Options};
use crate::property::Breadcrumb;
use crate::step::Step;
use crate::surface::{Phase, Surface, SurfaceId};

/// Duration `bounce()` seeds before caller options.
const BOUNCE_DURATION: Duration = Duration::from_millis(1500);

new_key_type! {
    /// Identifies a chain registered with an [`Engine`].
    pub struct ChainId;
}

/// Lifecycle of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Declared but not started.
    Built,
    Running,
    Completed,
    Failed,
}

impl ChainState {
    pub fn name(&self) -> &'static str {
        match self {
            ChainState::Built => "built",
            ChainState::Running => "running",
            ChainState::Completed => "completed",
            ChainState::Failed => "failed",
        }
    }

    /// Whether the chain has stopped for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChainState::Completed | ChainState::Failed)
    }
}

impl fmt::Display for ChainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered sequence of contexts animating one surface.
pub struct Chain {
    surface: Weak<dyn Surface>,
    surface_id: SurfaceId,
    contexts: Vec<Context>,
    cursor: usize,
    state: ChainState,
}

impl Chain {
    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// The animated surface, if it is still alive.
    pub fn surface(&self) -> Option<Arc<dyn Surface>> {
        self.surface.upgrade()
    }

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Index of the context currently executing.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ChainState) {
        self.state = state;
    }

    pub(crate) fn current(&self) -> Option<&Context> {
        self.contexts.get(self.cursor)
    }

    /// Mark every context up to and including the last one containing
    /// [`Step::Now`] as not animated.
    pub(crate) fn preprocess(&mut self) {
        let Some(barrier) = self.contexts.iter().rposition(Context::contains_now) else {
            return;
        };
        for context in &mut self.contexts[..=barrier] {
            context.mark_no_animate();
        }
        tracing::debug!(target: "kinetic_core::chain", barrier, "contexts before now marked no-animate");
    }

    pub(crate) fn begin_current(&mut self, surface: &dyn Surface, sink: &PhaseSink<'_>) {
        if let Some(context) = self.contexts.get_mut(self.cursor) {
            context.begin(surface, sink);
        }
    }

    /// Route a completion to the current context.
    ///
    /// Returns `true` when the current context has finished all its phases.
    pub(crate) fn phase_done(
        &mut self,
        context: usize,
        phase: Phase,
        surface: &dyn Surface,
        sink: &PhaseSink<'_>,
    ) -> bool {
        if self.state != ChainState::Running || context != self.cursor {
            tracing::trace!(target: "kinetic_core::chain", context, cursor = self.cursor, "ignoring stale completion");
            return false;
        }
        self.contexts
            .get_mut(context)
            .is_some_and(|current| current.phase_done(phase, surface, sink))
    }

    pub(crate) fn finish_current(&mut self) -> (Vec<Breadcrumb>, Option<Completion>) {
        match self.contexts.get_mut(self.cursor) {
            Some(context) => context.finish(),
            None => (Vec::new(), None),
        }
    }

    /// Move to the next context. Returns `false` past the tail.
    pub(crate) fn advance(&mut self) -> bool {
        if self.cursor + 1 < self.contexts.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Whether the last context asked for its effect to be removed.
    pub(crate) fn removes_on_completion(&self) -> bool {
        self.contexts
            .last()
            .is_some_and(|context| context.options().remove_on_completion)
    }

    /// Fail every context that has not finished, returning their completions.
    pub(crate) fn fail_remaining(&mut self) -> (Vec<Completion>, Vec<Breadcrumb>) {
        self.state = ChainState::Failed;
        let mut completions = Vec::new();
        let mut unreplayed = Vec::new();
        for context in self.contexts.iter_mut().filter(|context| {
            matches!(context.state(), ContextState::Pending | ContextState::Running)
        }) {
            let (breadcrumbs, completion) = context.fail();
            unreplayed.extend(breadcrumbs);
            completions.extend(completion);
        }
        (completions, unreplayed)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("surface", &self.surface_id)
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("contexts", &self.contexts)
            .finish()
    }
}

/// Declares a chain one context at a time.
///
/// # Example
///
/// ```ignore
/// use kinetic_core::{Animating, AnimationOption, Direction, Engine};
///
/// let engine = Engine::new();
/// surface
///     .scale(1.2, 1.2)
///     .flip(Direction::Left)
///     .boing()
///     .on_complete(|result| assert!(result.is_ok()))
///     .run(&engine)?;
/// ```
pub struct ChainBuilder {
    surface: Weak<dyn Surface>,
    surface_id: SurfaceId,
    contexts: Vec<Context>,
}

impl ChainBuilder {
    /// Start an empty chain on `surface`.
    pub fn for_surface<S: Surface + 'static>(surface: &Arc<S>) -> Self {
        let weak: Weak<dyn Surface> = Arc::downgrade(surface) as Weak<dyn Surface>;
        Self {
            surface: weak,
            surface_id: surface.surface_id(),
            contexts: Vec::new(),
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    /// Number of contexts declared so far.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Add option knobs to the most recently appended context.
    pub fn options(mut self, knobs: impl IntoIterator<Item = AnimationOption>) -> Self {
        match self.contexts.last_mut() {
            Some(context) => context.push_knobs(knobs),
            None => {
                tracing::debug!(target: "kinetic_core::chain", "options ignored, chain has no contexts")
            }
        }
        self
    }

    /// Set the completion callback of the most recently appended context.
    ///
    /// The callback receives `Ok(())` after the context's breadcrumbs have
    /// been replayed, or the error that stopped the chain.
    pub fn on_complete<F>(mut self, completion: F) -> Self
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        match self.contexts.last_mut() {
            Some(context) => context.set_completion(Box::new(completion)),
            None => {
                tracing::debug!(target: "kinetic_core::chain", "completion ignored, chain has no contexts")
            }
        }
        self
    }

    /// Hand the chain to `engine` and start it. The engine keeps the chain
    /// alive until it finishes.
    pub fn run(self, engine: &Engine) -> Result<ChainId> {
        engine.run_chain(self.into_chain(engine.defaults()))
    }

    /// Register the chain with `engine` without starting it.
    pub fn prepare(self, engine: &Engine) -> Result<ChainHandle> {
        engine.prepare_chain(self.into_chain(engine.defaults()))
    }

    fn push(mut self, steps: Vec<Step>) -> Self {
        if self.surface.strong_count() == 0 {
            tracing::warn!(
                target: "kinetic_core::chain",
                surface = %self.surface_id,
                "appending to a chain whose surface has been released"
            );
        }
        self.contexts.push(Context::new(steps));
        self
    }

    fn into_chain(self, defaults: &Options) -> Chain {
        let mut contexts = self.contexts;
        for context in &mut contexts {
            context.resolve(defaults);
        }
        Chain {
            surface: self.surface,
            surface_id: self.surface_id,
            contexts,
            cursor: 0,
            state: ChainState::Built,
        }
    }
}

impl fmt::Debug for ChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("surface", &self.surface_id)
            .field("contexts", &self.contexts)
            .finish()
    }
}

/// Fluent entry points. Every call appends exactly one context.
pub trait Animating: Sized {
    /// Append a context running `steps` together.
    fn animate(self, steps: impl IntoIterator<Item = Step>) -> ChainBuilder;

    fn translate(self, x: f32, y: f32) -> ChainBuilder {
        self.animate([Step::Translate(Vec2::new(x, y))])
    }

    fn scale(self, x: f32, y: f32) -> ChainBuilder {
        self.animate([Step::Scale(Vec2::new(x, y))])
    }

    /// Rotate by `degrees`.
    fn rotate(self, degrees: f32) -> ChainBuilder {
        self.animate([Step::Rotate(degrees)])
    }

    fn alpha(self, alpha: f32) -> ChainBuilder {
        self.animate([Step::Alpha(alpha)])
    }

    fn frame(self, frame: Rect) -> ChainBuilder {
        self.animate([Step::Frame(frame)])
    }

    fn bounds(self, bounds: Rect) -> ChainBuilder {
        self.animate([Step::Bounds(bounds)])
    }

    fn center(self, center: Vec2) -> ChainBuilder {
        self.animate([Step::Center(center)])
    }

    fn size(self, size: Vec2) -> ChainBuilder {
        self.animate([Step::Size(size)])
    }

    fn corner_radius(self, radius: f32) -> ChainBuilder {
        self.animate([Step::CornerRadius(radius)])
    }

    fn background_color(self, color: Color) -> ChainBuilder {
        self.animate([Step::BackgroundColor(color)])
    }

    fn border_color(self, color: Color) -> ChainBuilder {
        self.animate([Step::BorderColor(color)])
    }

    fn border_width(self, width: f32) -> ChainBuilder {
        self.animate([Step::BorderWidth(width)])
    }

    fn shadow_color(self, color: Color) -> ChainBuilder {
        self.animate([Step::ShadowColor(color)])
    }

    fn shadow_offset(self, offset: Vec2) -> ChainBuilder {
        self.animate([Step::ShadowOffset(offset)])
    }

    fn shadow_opacity(self, opacity: f32) -> ChainBuilder {
        self.animate([Step::ShadowOpacity(opacity)])
    }

    fn shadow_radius(self, radius: f32) -> ChainBuilder {
        self.animate([Step::ShadowRadius(radius)])
    }

    fn transform(self, transform: Affine2) -> ChainBuilder {
        self.animate([Step::Transform(transform)])
    }

    fn transform_3d(self, transform: Mat4) -> ChainBuilder {
        self.animate([Step::Transform3D(transform)])
    }

    fn anchor_point(self, point: Vec2) -> ChainBuilder {
        self.animate([Step::AnchorPoint(point)])
    }

    fn fade_in(self, direction: Direction) -> ChainBuilder {
        self.animate([Step::FadeIn(direction)])
    }

    fn fade_out(self, direction: Direction) -> ChainBuilder {
        self.animate([Step::FadeOut(direction)])
    }

    fn slide(self, direction: Direction) -> ChainBuilder {
        self.animate([Step::Slide(direction)])
    }

    fn squeeze(self, direction: Direction) -> ChainBuilder {
        self.animate([Step::Squeeze(direction)])
    }

    fn flip(self, direction: Direction) -> ChainBuilder {
        self.animate([Step::Flip(direction)])
    }

    fn zoom_in(self) -> ChainBuilder {
        self.animate([Step::ZoomIn])
    }

    fn zoom_out(self) -> ChainBuilder {
        self.animate([Step::ZoomOut])
    }

    fn fall(self) -> ChainBuilder {
        self.animate([Step::Fall])
    }

    fn shake(self) -> ChainBuilder {
        self.animate([Step::Shake])
    }

    fn pop(self) -> ChainBuilder {
        self.animate([Step::Pop])
    }

    fn morph(self) -> ChainBuilder {
        self.animate([Step::Morph])
    }

    fn flash(self) -> ChainBuilder {
        self.animate([Step::Flash])
    }

    fn wobble(self) -> ChainBuilder {
        self.animate([Step::Wobble])
    }

    fn swing(self) -> ChainBuilder {
        self.animate([Step::Swing])
    }

    /// Compress and spring back. Seeds a loose, fast spring that later
    /// options override.
    fn boing(self) -> ChainBuilder {
        self.animate([Step::Boing])
            .options([AnimationOption::Damping(0.2), AnimationOption::Velocity(5.0)])
    }

    /// Hop and spring back. Seeds a 1.5 s duration that later options
    /// override.
    fn bounce(self) -> ChainBuilder {
        self.animate([Step::Bounce])
            .options([AnimationOption::Duration(BOUNCE_DURATION)])
    }

    fn delay(self, wait: Duration) -> ChainBuilder {
        self.animate([Step::Delay(wait)])
    }

    /// Animate both transforms back to identity over `duration`.
    fn identity(self, duration: Duration) -> ChainBuilder {
        self.animate([Step::Identity(duration)])
    }

    /// Everything declared before this call applies without animation.
    fn now(self) -> ChainBuilder {
        self.animate([Step::Now])
    }
}

impl Animating for ChainBuilder {
    fn animate(self, steps: impl IntoIterator<Item = Step>) -> ChainBuilder {
        self.push(steps.into_iter().collect())
    }
}

impl<S: Surface + 'static> Animating for &Arc<S> {
    fn animate(self, steps: impl IntoIterator<Item = Step>) -> ChainBuilder {
        ChainBuilder::for_surface(self).animate(steps)
    }
}
