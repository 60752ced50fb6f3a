//! One link of a chain.
//!
//! A [`Context`] runs a batch of steps under one set of options. Execution
//! enters up to three phases (property transitions, one layer animation
//! group, and custom effects) and counts one pending completion per
//! entered property or layer phase and per custom effect. The context is
//! finished when the count reaches zero.

use std::fmt;

use crossbeam_channel::Sender;
use glam::{Affine2, Mat4};

use crate::chain::ChainId;
use crate::error::Result;
use crate::layer::{LayerAnimation, LayerAnimationGroup};
use crate::options::{AnimationOption, Options};
use crate::property::{Breadcrumb, BreadcrumbLog, Property, PropertyChange, PropertyValue};
use crate::step::{CustomStage, PropertyPlan, Step, StepClass};
use crate::surface::{
    CompletionToken, Phase, PhaseKey, PhaseMessage, PropertyTransition, Surface, Timing,
};

/// Callback invoked once when a context finishes or its chain fails.
pub type Completion = Box<dyn FnOnce(Result<()>) + Send>;

/// Execution state of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Pending,
    Running,
    Finished,
    Failed,
}

impl ContextState {
    pub fn name(&self) -> &'static str {
        match self {
            ContextState::Pending => "pending",
            ContextState::Running => "running",
            ContextState::Finished => "finished",
            ContextState::Failed => "failed",
        }
    }
}

/// Issues completion tokens for one context.
pub(crate) struct PhaseSink<'a> {
    pub chain: ChainId,
    pub context: usize,
    pub sender: &'a Sender<PhaseMessage>,
}

impl PhaseSink<'_> {
    fn token(&self, phase: Phase) -> CompletionToken {
        CompletionToken::new(
            PhaseKey {
                chain: self.chain,
                context: self.context,
                phase,
            },
            self.sender.clone(),
        )
    }
}

struct Effect {
    stages: Vec<CustomStage>,
    cursor: usize,
}

/// A batch of steps executed together.
pub struct Context {
    steps: Vec<Step>,
    knobs: Vec<AnimationOption>,
    options: Options,
    completion: Option<Completion>,
    state: ContextState,
    pending: usize,
    breadcrumbs: BreadcrumbLog,
    effects: Vec<Effect>,
}

impl Context {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            knobs: Vec::new(),
            options: Options::default(),
            completion: None,
            state: ContextState::Pending,
            pending: 0,
            breadcrumbs: BreadcrumbLog::new(),
            effects: Vec::new(),
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The option knobs in the order they were supplied.
    pub fn knobs(&self) -> &[AnimationOption] {
        &self.knobs
    }

    /// Resolved options. Valid once the chain has been handed to an engine.
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn breadcrumbs(&self) -> &BreadcrumbLog {
        &self.breadcrumbs
    }

    /// Number of phases and effects still running.
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn has_class(&self, class: StepClass) -> bool {
        self.steps.iter().any(|step| step.class() == class)
    }

    pub(crate) fn contains_now(&self) -> bool {
        self.steps.contains(&Step::Now)
    }

    pub(crate) fn push_knobs(&mut self, knobs: impl IntoIterator<Item = AnimationOption>) {
        self.knobs.extend(knobs);
    }

    pub(crate) fn set_completion(&mut self, completion: Completion) {
        self.completion = Some(completion);
    }

    pub(crate) fn resolve(&mut self, defaults: &Options) {
        self.options = Options::resolve(defaults, &self.knobs);
    }

    pub(crate) fn mark_no_animate(&mut self) {
        self.knobs.push(AnimationOption::NoAnimate(true));
        self.options.no_animate = true;
    }

    /// Enter every phase this context has steps for.
    pub(crate) fn begin(&mut self, surface: &dyn Surface, sink: &PhaseSink<'_>) {
        debug_assert_eq!(self.state, ContextState::Pending, "context started twice");
        self.state = ContextState::Running;
        self.pending = 0;

        if self.has_class(StepClass::PropertyTransition) {
            self.pending += 1;
            self.run_property_phase(surface, sink);
        }
        if self.has_class(StepClass::LayerAnimation) {
            self.pending += 1;
            self.run_layer_phase(surface, sink);
        }
        if self.has_class(StepClass::Custom) {
            self.run_custom_phase(surface, sink);
        }

        if self.pending == 0 {
            self.pending = 1;
            sink.token(Phase::Empty).finish();
        }
    }

    fn steps_of(&self, class: StepClass) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(move |step| step.class() == class)
    }

    fn run_property_phase(&mut self, surface: &dyn Surface, sink: &PhaseSink<'_>) {
        let surface_id = surface.surface_id();
        let remove = self.options.remove_on_completion;

        let original_alpha = surface.property(Property::Alpha);
        let original_transform = surface
            .property(Property::Transform)
            .and_then(|v| v.as_affine())
            .unwrap_or(Affine2::IDENTITY);
        let frame = surface.property(Property::Frame).and_then(|v| v.as_rect());

        let mut start = PropertyPlan::default();
        let mut end = PropertyPlan::default();
        for step in self.steps_of(StepClass::PropertyTransition) {
            step.apply_start(&mut start);
        }
        for step in self.steps_of(StepClass::PropertyTransition) {
            step.apply_end(&mut end, frame);
        }

        let mut base = original_transform;
        if let Some(alpha) = start.alpha {
            surface.set_property(Property::Alpha, PropertyValue::Scalar(alpha));
        }
        if start.touches_transform() {
            base = start.compose(base);
            surface.set_property(Property::Transform, PropertyValue::Affine(base));
        }

        let mut changes = end.edits.clone();
        for change in &changes {
            let original = surface.property(change.property);
            self.breadcrumbs
                .record(surface_id, change.property, original, change.value, remove);
        }

        if let Some(alpha) = end.alpha.or(start.alpha) {
            let value = PropertyValue::Scalar(alpha);
            self.breadcrumbs
                .record(surface_id, Property::Alpha, original_alpha, value, remove);
            changes.push(PropertyChange::new(Property::Alpha, value));
        }

        if start.touches_transform() || end.touches_transform() {
            let value = PropertyValue::Affine(end.compose(base));
            self.breadcrumbs.record(
                surface_id,
                Property::Transform,
                Some(PropertyValue::Affine(original_transform)),
                value,
                remove,
            );
            changes.push(PropertyChange::new(Property::Transform, value));
        }

        for change in &changes {
            surface.set_property(change.property, change.value);
        }

        let token = sink.token(Phase::Property);
        if self.options.no_animate {
            token.finish();
        } else {
            surface.animate_properties(
                PropertyTransition {
                    timing: Timing::from_options(&self.options),
                    changes,
                },
                token,
            );
        }
    }

    fn run_layer_phase(&mut self, surface: &dyn Surface, sink: &PhaseSink<'_>) {
        let surface_id = surface.surface_id();
        let remove = self.options.remove_on_completion;
        let width = surface
            .property(Property::Frame)
            .and_then(|v| v.as_rect())
            .map_or(0.0, |frame| frame.width());

        let doublings = self
            .steps_of(StepClass::LayerAnimation)
            .filter(|step| step.doubles_repeat())
            .count();
        for _ in 0..doublings {
            self.options.repeat_count *= 2.0;
        }

        let mut group = LayerAnimationGroup::new(Timing::from_options(&self.options));
        for step in self.steps.iter().filter(|s| s.class() == StepClass::LayerAnimation) {
            for animation in step.layer_animations(width) {
                if let LayerAnimation::Basic { key_path, to, .. } = &animation
                    && !step.is_preset()
                    && let Some(property) = key_path.property()
                {
                    let original = surface.property(property);
                    self.breadcrumbs
                        .record(surface_id, property, original, *to, remove);
                }
                group.push(animation);
            }
        }

        let token = sink.token(Phase::Layer);
        if self.options.no_animate {
            token.finish();
        } else {
            surface.animate_layer(group, token);
        }
    }

    fn run_custom_phase(&mut self, surface: &dyn Surface, sink: &PhaseSink<'_>) {
        let surface_id = surface.surface_id();
        let remove = self.options.remove_on_completion;

        for step in self.steps.iter().filter(|s| s.class() == StepClass::Custom) {
            if let Step::Identity(_) = step {
                for (property, identity) in [
                    (Property::Transform, PropertyValue::Affine(Affine2::IDENTITY)),
                    (Property::Transform3D, PropertyValue::Matrix(Mat4::IDENTITY)),
                ] {
                    let original = surface.property(property);
                    self.breadcrumbs
                        .record(surface_id, property, original, identity, remove);
                }
            }

            if let Some(stages) = step.effect(&self.options)
                && !stages.is_empty()
            {
                self.effects.push(Effect { stages, cursor: 0 });
            }
        }

        self.pending += self.effects.len();
        for effect in 0..self.effects.len() {
            self.start_stage(effect, surface, sink);
        }
    }

    fn start_stage(&mut self, effect: usize, surface: &dyn Surface, sink: &PhaseSink<'_>) {
        let Some(entry) = self.effects.get(effect) else {
            return;
        };
        let stage = entry.cursor;
        let Some(current) = entry.stages.get(stage).cloned() else {
            return;
        };

        let token = sink.token(Phase::Effect { effect, stage });
        match current {
            CustomStage::Transition(transition) => {
                for change in &transition.changes {
                    surface.set_property(change.property, change.value);
                }
                surface.animate_properties(transition, token);
            }
            CustomStage::Wait(delay) => surface.schedule(delay, token),
            CustomStage::Immediate(changes) => {
                for change in &changes {
                    surface.set_property(change.property, change.value);
                }
                token.finish();
            }
        }
    }

    /// Account for one completed phase. Returns `true` once the context
    /// has nothing left running.
    pub(crate) fn phase_done(
        &mut self,
        phase: Phase,
        surface: &dyn Surface,
        sink: &PhaseSink<'_>,
    ) -> bool {
        if self.state != ContextState::Running {
            return false;
        }

        if let Phase::Effect { effect, stage } = phase {
            let Some(entry) = self.effects.get_mut(effect) else {
                return false;
            };
            if entry.cursor != stage {
                tracing::trace!(target: "kinetic_core::chain", effect, stage, "stale stage completion");
                return false;
            }
            entry.cursor += 1;
            if entry.cursor < entry.stages.len() {
                self.start_stage(effect, surface, sink);
                return false;
            }
        }

        debug_assert!(self.pending > 0, "more completions than pending phases");
        self.pending = self.pending.saturating_sub(1);
        self.pending == 0
    }

    /// Mark the context finished, handing back its breadcrumbs and completion.
    pub(crate) fn finish(&mut self) -> (Vec<Breadcrumb>, Option<Completion>) {
        self.state = ContextState::Finished;
        self.effects.clear();
        let breadcrumbs = self.breadcrumbs.drain().collect();
        (breadcrumbs, self.completion.take())
    }

    /// Mark the context failed, handing back its unreplayed breadcrumbs
    /// and its completion.
    pub(crate) fn fail(&mut self) -> (Vec<Breadcrumb>, Option<Completion>) {
        self.state = ContextState::Failed;
        self.effects.clear();
        self.pending = 0;
        let breadcrumbs = self.breadcrumbs.drain().collect();
        (breadcrumbs, self.completion.take())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("steps", &self.steps)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("breadcrumbs", &self.breadcrumbs.len())
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}
