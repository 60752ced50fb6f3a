//! The host capability a chain animates.
//!
//! A [`Surface`] is anything view-like the host toolkit can mutate and
//! animate. The engine never renders; it asks the surface to run property
//! transitions, layer animation groups and delayed callbacks, handing each
//! request a [`CompletionToken`]. Hosts call [`CompletionToken::finish`]
//! when the request completes. Tokens only post a message to the engine's
//! queue, so calling `finish` from inside a host callback never re-enters
//! the engine.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::chain::ChainId;
use crate::curve::Curve;
use crate::layer::LayerAnimationGroup;
use crate::options::Options;
use crate::property::{Property, PropertyChange, PropertyValue};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique identifier for a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a host-provided identifier.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Timing parameters of one host animation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub duration: Duration,
    pub delay: Duration,
    pub curve: Curve,
    pub damping: f32,
    pub velocity: f32,
    pub repeat_count: f32,
    pub autoreverse: bool,
}

impl Timing {
    /// Timing taken from a context's resolved options.
    pub fn from_options(options: &Options) -> Self {
        Self {
            duration: options.duration,
            delay: options.delay,
            curve: options.curve,
            damping: options.damping,
            velocity: options.velocity,
            repeat_count: options.repeat_count,
            autoreverse: options.autoreverse,
        }
    }

    /// A critically damped spring with no initial velocity.
    pub fn settled(duration: Duration, curve: Curve) -> Self {
        Self {
            duration,
            delay: Duration::ZERO,
            curve,
            damping: 1.0,
            velocity: 0.0,
            repeat_count: 1.0,
            autoreverse: false,
        }
    }

    /// Time from the request until the host should report completion.
    ///
    /// Returns `None` for animations that repeat forever.
    pub fn total(&self) -> Option<Duration> {
        if self.repeat_count.is_infinite() {
            return None;
        }
        let cycles = self.repeat_count.max(1.0) * if self.autoreverse { 2.0 } else { 1.0 };
        let active = if cycles.fract() == 0.0 {
            self.duration.saturating_mul(cycles as u32)
        } else {
            Duration::try_from_secs_f64(self.duration.as_secs_f64() * f64::from(cycles))
                .unwrap_or(Duration::MAX)
        };
        Some(self.delay.saturating_add(active))
    }
}

/// A batch of property edits the host animates together.
///
/// The surface's model already holds the end values when the request
/// arrives; `changes` tells the host what moved.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTransition {
    pub timing: Timing,
    pub changes: Vec<PropertyChange>,
}

/// The host toolkit's view of an animatable element.
///
/// Implementations use interior mutability: every method takes `&self`
/// so the engine can hold the surface behind an `Arc`.
pub trait Surface: Send + Sync {
    fn surface_id(&self) -> SurfaceId;

    /// Current model value of `property`, if the surface supports it.
    fn property(&self, property: Property) -> Option<PropertyValue>;

    /// Set the model value of `property` without animation.
    fn set_property(&self, property: Property, value: PropertyValue);

    /// Drop the model value of `property`, returning it to the host's
    /// unset state.
    fn clear_property(&self, property: Property);

    fn set_interaction_enabled(&self, enabled: bool);

    /// Animate from the presented state to the current model values.
    fn animate_properties(&self, transition: PropertyTransition, token: CompletionToken);

    /// Attach a layer animation group. The group never changes model values.
    fn animate_layer(&self, group: LayerAnimationGroup, token: CompletionToken);

    /// Finish `token` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, token: CompletionToken);
}

/// Which part of a context a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Phase {
    /// A context with nothing to run.
    Empty,
    Property,
    Layer,
    Effect { effect: usize, stage: usize },
}

/// Routing key carried by a completion token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PhaseKey {
    pub chain: ChainId,
    pub context: usize,
    pub phase: Phase,
}

/// A message posted to the engine's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PhaseMessage {
    pub key: PhaseKey,
    /// `false` when the token was dropped without being finished.
    pub finished: bool,
}

/// Reports completion of one host request back to the engine.
///
/// Dropping a token without calling [`finish`](Self::finish) reports the
/// request as abandoned, which still advances the chain.
pub struct CompletionToken {
    key: PhaseKey,
    sender: Sender<PhaseMessage>,
    fired: bool,
}

impl CompletionToken {
    pub(crate) fn new(key: PhaseKey, sender: Sender<PhaseMessage>) -> Self {
        Self {
            key,
            sender,
            fired: false,
        }
    }

    /// Report that the request ran to completion.
    pub fn finish(mut self) {
        self.post(true);
    }

    fn post(&mut self, finished: bool) {
        if self.fired {
            return;
        }
        self.fired = true;
        if self
            .sender
            .send(PhaseMessage {
                key: self.key,
                finished,
            })
            .is_err()
        {
            tracing::debug!(target: "kinetic_core::surface", "engine gone, completion dropped");
        }
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        if !self.fired {
            tracing::debug!(
                target: "kinetic_core::surface",
                context = self.key.context,
                "completion token dropped without finishing"
            );
            self.post(false);
        }
    }
}

impl fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionToken")
            .field("context", &self.key.context)
            .field("phase", &self.key.phase)
            .field("fired", &self.fired)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn key() -> PhaseKey {
        PhaseKey {
            chain: ChainId::from(KeyData::from_ffi(1)),
            context: 0,
            phase: Phase::Property,
        }
    }

    #[test]
    fn test_surface_id_display() {
        assert_eq!(SurfaceId::from_raw(42).to_string(), "#42");
        assert_ne!(SurfaceId::next(), SurfaceId::next());
    }

    #[test]
    fn test_finish_posts_once() {
        let (tx, rx) = crossbeam_channel::unbounded();
        CompletionToken::new(key(), tx).finish();

        let message = rx.try_recv().unwrap();
        assert!(message.finished);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_posts_abandoned() {
        let (tx, rx) = crossbeam_channel::unbounded();
        drop(CompletionToken::new(key(), tx));

        let message = rx.try_recv().unwrap();
        assert!(!message.finished);
        assert_eq!(message.key, key());
    }

    #[test]
    fn test_timing_total() {
        let mut timing = Timing::settled(Duration::from_millis(200), Curve::Linear);
        timing.delay = Duration::from_millis(100);
        assert_eq!(timing.total(), Some(Duration::from_millis(300)));

        timing.repeat_count = 2.0;
        timing.autoreverse = true;
        assert_eq!(timing.total(), Some(Duration::from_millis(900)));

        timing.repeat_count = f32::INFINITY;
        assert_eq!(timing.total(), None);
    }

    #[test]
    fn test_timing_total_saturates() {
        let mut timing = Timing::settled(Duration::MAX, Curve::Linear);
        timing.delay = Duration::from_secs(1);
        assert_eq!(timing.total(), Some(Duration::MAX));

        timing.repeat_count = 2.5;
        assert_eq!(timing.total(), Some(Duration::MAX));
    }
}
