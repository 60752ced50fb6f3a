//! Per-context animation options.
//!
//! Options apply uniformly to every step of one context. They are supplied
//! as a list of [`AnimationOption`] knobs and resolved into [`Options`] by
//! overwriting named fields in order, so later values win.

use std::fmt;
use std::time::Duration;

use crate::curve::Curve;

/// A single named option knob.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationOption {
    /// Wait before the animation starts.
    Delay(Duration),
    /// Length of one animation cycle.
    Duration(Duration),
    /// Easing curve.
    Curve(Curve),
    /// Spring damping ratio handed to the host.
    Damping(f32),
    /// Initial spring velocity handed to the host.
    Velocity(f32),
    /// Number of cycles; `f32::INFINITY` repeats forever.
    RepeatCount(f32),
    /// Play each cycle forwards then backwards.
    Autoreverse(bool),
    /// Remove the animation's effect when the context completes.
    RemoveOnCompletion(bool),
    /// Apply the end state immediately instead of animating.
    NoAnimate(bool),
}

impl AnimationOption {
    /// The stable name of this option.
    pub fn name(&self) -> &'static str {
        match self {
            AnimationOption::Delay(_) => "delay",
            AnimationOption::Duration(_) => "duration",
            AnimationOption::Curve(_) => "curve",
            AnimationOption::Damping(_) => "damping",
            AnimationOption::Velocity(_) => "velocity",
            AnimationOption::RepeatCount(_) => "repeatCount",
            AnimationOption::Autoreverse(_) => "autoreverse",
            AnimationOption::RemoveOnCompletion(_) => "removeOnCompletion",
            AnimationOption::NoAnimate(_) => "noAnimate",
        }
    }
}

impl fmt::Display for AnimationOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved options of one context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    pub delay: Duration,
    pub duration: Duration,
    pub curve: Curve,
    pub damping: f32,
    pub velocity: f32,
    pub repeat_count: f32,
    pub autoreverse: bool,
    pub remove_on_completion: bool,
    pub no_animate: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            duration: Duration::from_millis(700),
            curve: Curve::EaseInOut,
            damping: 0.7,
            velocity: 0.7,
            repeat_count: 1.0,
            autoreverse: false,
            remove_on_completion: false,
            no_animate: false,
        }
    }
}

impl Options {
    /// Resolve a list of knobs on top of `defaults`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use kinetic_core::{AnimationOption, Options};
    ///
    /// let options = Options::resolve(
    ///     &Options::default(),
    ///     &[
    ///         AnimationOption::Duration(Duration::from_secs(1)),
    ///         AnimationOption::Duration(Duration::from_secs(2)),
    ///     ],
    /// );
    /// assert_eq!(options.duration, Duration::from_secs(2));
    /// ```
    pub fn resolve(defaults: &Options, knobs: &[AnimationOption]) -> Options {
        let mut options = *defaults;
        for knob in knobs {
            options.apply(*knob);
        }
        options
    }

    /// Overwrite the field named by `knob`.
    pub fn apply(&mut self, knob: AnimationOption) {
        match knob {
            AnimationOption::Delay(delay) => self.delay = delay,
            AnimationOption::Duration(duration) => self.duration = duration,
            AnimationOption::Curve(curve) => self.curve = curve,
            AnimationOption::Damping(damping) => self.damping = damping,
            AnimationOption::Velocity(velocity) => self.velocity = velocity,
            AnimationOption::RepeatCount(count) => self.repeat_count = count,
            AnimationOption::Autoreverse(autoreverse) => self.autoreverse = autoreverse,
            AnimationOption::RemoveOnCompletion(remove) => self.remove_on_completion = remove,
            AnimationOption::NoAnimate(no_animate) => self.no_animate = no_animate,
        }
    }

    /// Whether the animation never finishes on its own.
    pub fn repeats_forever(&self) -> bool {
        self.repeat_count.is_infinite()
    }
}
