//! The chain registry and event pump.
//!
//! An [`Engine`] owns every started chain in a slot map keyed by
//! [`ChainId`]. Hosts report completions through
//! [`CompletionToken`](crate::CompletionToken)s, which only post to the
//! engine's queue; a single thread then calls [`Engine::process_events`] to
//! route each completion to its chain, unwind finished contexts and begin
//! the next one.
//!
//! # Example
//!
//! ```ignore
//! use kinetic_core::{Animating, Engine};
//!
//! let engine = Engine::new();
//! let id = surface.alpha(0.3).run(&engine)?;
//! // ... host completes its animations ...
//! engine.drain_events();
//! assert!(engine.chain_state(id).is_none());
//! ```
//!
//! Surfaces are called while the engine holds the chain's lock, so a
//! [`Surface`] implementation must not call back into the engine.
//! Completion callbacks and [`ChainEvent`] slots run with no lock held.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use glam::{Affine2, Mat4};
use parking_lot::Mutex;
use slotmap::SlotMap;

use crate::chain::{Chain, ChainId, ChainState};
use crate::config::{AdmissionPolicy, EngineConfig};
use crate::context::{ContextState, PhaseSink};
use crate::error::{AnimationError, ConfigResult, Result};
use crate::logging::{PerfSpan, span_names};
use crate::options::Options;
use crate::property::{Breadcrumb, BreadcrumbAction, Property, PropertyValue};
use crate::signal::Signal;
use crate::surface::{PhaseMessage, Surface, SurfaceId};

/// Who keeps a registered chain alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retention {
    /// Started with `run`, or handed over by a dropped handle.
    Registry,
    /// Held by a [`ChainHandle`].
    Caller,
}

struct ChainSlot {
    chain: Arc<Mutex<Chain>>,
    retention: Retention,
}

/// Lifecycle notifications published by an [`Engine`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChainEvent {
    /// A chain was admitted and its first context is about to begin.
    Started {
        chain: ChainId,
        surface: SurfaceId,
        contexts: usize,
    },
    ContextStarted {
        chain: ChainId,
        index: usize,
        no_animate: bool,
    },
    /// A context finished and its breadcrumbs were replayed.
    ContextFinished {
        chain: ChainId,
        index: usize,
        breadcrumbs: Vec<Breadcrumb>,
    },
    /// The chain completed or failed and was deregistered.
    Finished {
        chain: ChainId,
        surface: SurfaceId,
        outcome: Result<()>,
        /// Breadcrumbs of contexts cut short by a failure. They were not
        /// replayed, so the surface keeps whatever the host last applied.
        unreplayed: Vec<Breadcrumb>,
    },
}

impl ChainEvent {
    pub fn chain(&self) -> ChainId {
        match self {
            ChainEvent::Started { chain, .. }
            | ChainEvent::ContextStarted { chain, .. }
            | ChainEvent::ContextFinished { chain, .. }
            | ChainEvent::Finished { chain, .. } => *chain,
        }
    }
}

/// A point-in-time view of one context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    pub steps: Vec<&'static str>,
    pub state: ContextState,
    pub no_animate: bool,
    pub pending: usize,
}

/// A point-in-time view of one registered chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSnapshot {
    pub id: ChainId,
    pub surface: SurfaceId,
    pub state: ChainState,
    pub cursor: usize,
    pub retained_by_registry: bool,
    pub contexts: Vec<ContextSnapshot>,
}

struct EngineShared {
    config: EngineConfig,
    defaults: Options,
    chains: Mutex<SlotMap<ChainId, ChainSlot>>,
    busy: Mutex<HashMap<SurfaceId, ChainId>>,
    sender: Sender<PhaseMessage>,
    receiver: Receiver<PhaseMessage>,
    events: Signal<ChainEvent>,
}

/// Registry and scheduler for animation chains.
///
/// Cloning an engine yields another handle to the same registry.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<EngineShared>,
}

static_assertions::assert_impl_all!(Engine: Send, Sync);
static_assertions::assert_impl_all!(ChainHandle: Send, Sync);

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::from_validated(EngineConfig::default())
    }

    /// Create an engine after validating `config`.
    pub fn with_config(config: EngineConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: EngineConfig) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let defaults = config.defaults.to_options();
        crate::kinetic_debug!(
            admission = ?config.admission,
            max_events_per_pump = config.max_events_per_pump,
            "engine created"
        );
        Self {
            shared: Arc::new(EngineShared {
                config,
                defaults,
                chains: Mutex::new(SlotMap::with_key()),
                busy: Mutex::new(HashMap::new()),
                sender,
                receiver,
                events: Signal::new(),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Option values contexts start from before their own knobs apply.
    pub fn defaults(&self) -> &Options {
        &self.shared.defaults
    }

    /// Lifecycle notifications for every chain.
    pub fn events(&self) -> &Signal<ChainEvent> {
        &self.shared.events
    }

    /// Number of chains kept alive by the registry rather than a handle.
    pub fn registry_len(&self) -> usize {
        self.shared
            .chains
            .lock()
            .values()
            .filter(|slot| slot.retention == Retention::Registry)
            .count()
    }

    /// Number of registered chains currently running.
    pub fn active_count(&self) -> usize {
        self.slots()
            .into_iter()
            .filter(|(_, chain, _)| chain.lock().state() == ChainState::Running)
            .count()
    }

    /// Completions posted but not yet processed.
    pub fn pending_messages(&self) -> usize {
        self.shared.receiver.len()
    }

    /// Whether nothing is running and nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.shared.receiver.is_empty() && self.active_count() == 0
    }

    /// State of a registered chain. Finished chains are deregistered.
    pub fn chain_state(&self, id: ChainId) -> Option<ChainState> {
        self.chain(id).map(|chain| chain.lock().state())
    }

    /// Describe every registered chain.
    pub fn snapshot(&self) -> Vec<ChainSnapshot> {
        self.slots()
            .into_iter()
            .map(|(id, chain, retention)| {
                let chain = chain.lock();
                ChainSnapshot {
                    id,
                    surface: chain.surface_id(),
                    state: chain.state(),
                    cursor: chain.cursor(),
                    retained_by_registry: retention == Retention::Registry,
                    contexts: chain
                        .contexts()
                        .iter()
                        .map(|context| ContextSnapshot {
                            steps: context.steps().iter().map(|step| step.name()).collect(),
                            state: context.state(),
                            no_animate: context.options().no_animate,
                            pending: context.pending(),
                        })
                        .collect(),
                }
            })
            .collect()
    }

    /// Handle up to `max_events_per_pump` queued completions.
    ///
    /// Returns the number handled.
    #[tracing::instrument(skip(self), target = "kinetic_core::engine", level = "trace")]
    pub fn process_events(&self) -> usize {
        let _perf = PerfSpan::new(span_names::PUMP);
        let budget = self.shared.config.max_events_per_pump;

        let mut handled = 0;
        while handled < budget {
            let Ok(message) = self.shared.receiver.try_recv() else {
                break;
            };
            self.dispatch(message);
            handled += 1;
        }

        if handled > 0 {
            tracing::trace!(target: "kinetic_core::engine", handled, "processed completions");
        }
        handled
    }

    /// Pump until the queue is empty.
    ///
    /// A surface that completes requests synchronously and an animation
    /// that repeats forever keep this from returning.
    pub fn drain_events(&self) -> usize {
        let mut total = 0;
        loop {
            let handled = self.process_events();
            if handled == 0 {
                return total;
            }
            total += handled;
        }
    }

    pub(crate) fn run_chain(&self, chain: Chain) -> Result<ChainId> {
        let (id, chain) = self.register(chain, Retention::Registry)?;
        self.start(id, &chain)?;
        Ok(id)
    }

    pub(crate) fn prepare_chain(&self, chain: Chain) -> Result<ChainHandle> {
        let (id, chain) = self.register(chain, Retention::Caller)?;
        Ok(ChainHandle {
            id,
            chain,
            engine: self.clone(),
        })
    }

    fn register(&self, chain: Chain, retention: Retention) -> Result<(ChainId, Arc<Mutex<Chain>>)> {
        if chain.is_empty() {
            return Err(AnimationError::EmptyChain);
        }
        let surface = chain.surface_id();
        let contexts = chain.len();
        let chain = Arc::new(Mutex::new(chain));
        let id = self.shared.chains.lock().insert(ChainSlot {
            chain: Arc::clone(&chain),
            retention,
        });
        tracing::debug!(
            target: "kinetic_core::engine",
            chain = ?id,
            %surface,
            contexts,
            ?retention,
            "chain registered"
        );
        Ok((id, chain))
    }

    fn chain(&self, id: ChainId) -> Option<Arc<Mutex<Chain>>> {
        self.shared
            .chains
            .lock()
            .get(id)
            .map(|slot| Arc::clone(&slot.chain))
    }

    fn slots(&self) -> Vec<(ChainId, Arc<Mutex<Chain>>, Retention)> {
        self.shared
            .chains
            .lock()
            .iter()
            .map(|(id, slot)| (id, Arc::clone(&slot.chain), slot.retention))
            .collect()
    }

    #[tracing::instrument(skip(self, chain), target = "kinetic_core::engine", level = "debug")]
    fn start(&self, id: ChainId, chain: &Arc<Mutex<Chain>>) -> Result<()> {
        let (surface, surface_id, contexts) = {
            let mut guard = chain.lock();
            if guard.state() != ChainState::Built {
                tracing::debug!(target: "kinetic_core::engine", state = %guard.state(), "commit ignored");
                return Err(AnimationError::AlreadyCommitted);
            }
            guard.set_state(ChainState::Running);
            (guard.surface(), guard.surface_id(), guard.len())
        };

        let Some(surface) = surface else {
            self.fail(id, chain, AnimationError::TargetGone);
            return Err(AnimationError::TargetGone);
        };

        if self.shared.config.admission == AdmissionPolicy::OnePerSurface {
            let mut busy = self.shared.busy.lock();
            match busy.get(&surface_id) {
                Some(active) if *active != id => {
                    drop(busy);
                    let error = AnimationError::SurfaceBusy(surface_id);
                    self.fail(id, chain, error.clone());
                    return Err(error);
                }
                _ => {
                    busy.insert(surface_id, id);
                }
            }
        }

        chain.lock().preprocess();
        surface.set_interaction_enabled(false);
        self.shared.events.emit(ChainEvent::Started {
            chain: id,
            surface: surface_id,
            contexts,
        });
        self.begin_current(id, chain, surface.as_ref());
        Ok(())
    }

    fn begin_current(&self, id: ChainId, chain: &Arc<Mutex<Chain>>, surface: &dyn Surface) {
        let (index, no_animate) = {
            let guard = chain.lock();
            let no_animate = guard
                .current()
                .is_some_and(|context| context.options().no_animate);
            (guard.cursor(), no_animate)
        };

        crate::kinetic_trace!(chain = ?id, index, no_animate, "context starting");
        self.shared.events.emit(ChainEvent::ContextStarted {
            chain: id,
            index,
            no_animate,
        });

        let sink = PhaseSink {
            chain: id,
            context: index,
            sender: &self.shared.sender,
        };
        chain.lock().begin_current(surface, &sink);
    }

    fn dispatch(&self, message: PhaseMessage) {
        let key = message.key;
        let Some(chain) = self.chain(key.chain) else {
            tracing::trace!(target: "kinetic_core::engine", chain = ?key.chain, "completion for a finished chain");
            return;
        };

        let surface = {
            let guard = chain.lock();
            if guard.state() != ChainState::Running {
                return;
            }
            guard.surface()
        };
        let Some(surface) = surface else {
            self.fail(key.chain, &chain, AnimationError::TargetGone);
            return;
        };

        if !message.finished {
            tracing::warn!(
                target: "kinetic_core::engine",
                chain = ?key.chain,
                context = key.context,
                phase = ?key.phase,
                "host request abandoned, advancing"
            );
        }

        let sink = PhaseSink {
            chain: key.chain,
            context: key.context,
            sender: &self.shared.sender,
        };
        let context_done =
            chain
                .lock()
                .phase_done(key.context, key.phase, surface.as_ref(), &sink);
        if context_done {
            self.unwind(key.chain, &chain, surface.as_ref());
        }
    }

    /// Replay the current context's breadcrumbs, run its completion and
    /// move on.
    fn unwind(&self, id: ChainId, chain: &Arc<Mutex<Chain>>, surface: &dyn Surface) {
        let _perf = PerfSpan::new(span_names::UNWIND);
        let (index, breadcrumbs, completion) = {
            let mut guard = chain.lock();
            let index = guard.cursor();
            let (breadcrumbs, completion) = guard.finish_current();
            (index, breadcrumbs, completion)
        };

        for breadcrumb in &breadcrumbs {
            match breadcrumb.action {
                BreadcrumbAction::Clear => surface.clear_property(breadcrumb.property),
                BreadcrumbAction::Persist | BreadcrumbAction::Revert => {
                    surface.set_property(breadcrumb.property, breadcrumb.value)
                }
            }
        }
        tracing::debug!(
            target: "kinetic_core::engine",
            chain = ?id,
            index,
            breadcrumbs = breadcrumbs.len(),
            "context finished"
        );
        self.shared.events.emit(ChainEvent::ContextFinished {
            chain: id,
            index,
            breadcrumbs,
        });

        if let Some(completion) = completion {
            completion(Ok(()));
        }

        let advanced = chain.lock().advance();
        if advanced {
            self.begin_current(id, chain, surface);
        } else {
            self.complete(id, chain, surface);
        }
    }

    fn complete(&self, id: ChainId, chain: &Arc<Mutex<Chain>>, surface: &dyn Surface) {
        let (surface_id, reset) = {
            let mut guard = chain.lock();
            guard.set_state(ChainState::Completed);
            (guard.surface_id(), guard.removes_on_completion())
        };

        if reset {
            surface.set_property(Property::Transform, PropertyValue::Affine(Affine2::IDENTITY));
            surface.set_property(Property::Transform3D, PropertyValue::Matrix(Mat4::IDENTITY));
        }
        surface.set_interaction_enabled(true);
        self.release(id, surface_id);

        crate::kinetic_debug!(chain = ?id, surface = %surface_id, "chain completed");
        self.shared.events.emit(ChainEvent::Finished {
            chain: id,
            surface: surface_id,
            outcome: Ok(()),
            unreplayed: Vec::new(),
        });
    }

    fn fail(&self, id: ChainId, chain: &Arc<Mutex<Chain>>, error: AnimationError) {
        let (surface_id, (completions, unreplayed)) = {
            let mut guard = chain.lock();
            (guard.surface_id(), guard.fail_remaining())
        };
        self.release(id, surface_id);

        crate::kinetic_warn!(chain = ?id, surface = %surface_id, %error, "chain failed");
        if !unreplayed.is_empty() {
            tracing::debug!(
                target: "kinetic_core::engine",
                chain = ?id,
                unreplayed = unreplayed.len(),
                "breadcrumbs dropped with the failed chain"
            );
        }
        for completion in completions {
            completion(Err(error.clone()));
        }
        self.shared.events.emit(ChainEvent::Finished {
            chain: id,
            surface: surface_id,
            outcome: Err(error),
            unreplayed,
        });
    }

    fn release(&self, id: ChainId, surface: SurfaceId) {
        self.shared.chains.lock().remove(id);
        let mut busy = self.shared.busy.lock();
        if busy.get(&surface) == Some(&id) {
            busy.remove(&surface);
        }
    }

    fn hand_over(&self, id: ChainId) {
        if let Some(slot) = self.shared.chains.lock().get_mut(id) {
            slot.retention = Retention::Registry;
        }
    }

    fn discard(&self, id: ChainId) {
        self.shared.chains.lock().remove(id);
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.shared.config)
            .field("chains", &self.shared.chains.lock().len())
            .field("pending_messages", &self.shared.receiver.len())
            .finish()
    }
}

/// A prepared chain started explicitly with [`commit`](Self::commit).
///
/// Dropping the handle before committing discards the chain. Dropping it
/// while the chain runs hands the chain to the registry so it still
/// unwinds.
pub struct ChainHandle {
    id: ChainId,
    chain: Arc<Mutex<Chain>>,
    engine: Engine,
}

impl ChainHandle {
    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn state(&self) -> ChainState {
        self.chain.lock().state()
    }

    /// Number of contexts in the chain.
    pub fn len(&self) -> usize {
        self.chain.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.lock().is_empty()
    }

    /// Start the chain from its first context.
    ///
    /// Returns [`AnimationError::AlreadyCommitted`] once the chain has
    /// started, without re-triggering anything.
    pub fn commit(&self) -> Result<()> {
        self.engine.start(self.id, &self.chain)
    }
}

impl Drop for ChainHandle {
    fn drop(&mut self) {
        match self.state() {
            ChainState::Built => {
                tracing::debug!(target: "kinetic_core::engine", chain = ?self.id, "uncommitted chain discarded");
                self.engine.discard(self.id);
            }
            ChainState::Running => self.engine.hand_over(self.id),
            ChainState::Completed | ChainState::Failed => {}
        }
    }
}

impl fmt::Debug for ChainHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
