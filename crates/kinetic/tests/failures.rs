//! Integration tests for chains that cannot finish normally.

use std::sync::Arc;
use std::time::Duration;

use kinetic::headless::{HeadlessClock, HeadlessSurface};
use kinetic::prelude::*;
use parking_lot::Mutex;

fn setup() -> (Engine, Arc<HeadlessClock>, Arc<HeadlessSurface>) {
    let clock = HeadlessClock::new();
    let surface = HeadlessSurface::new(&clock);
    (Engine::new(), clock, surface)
}

type Outcomes = Arc<Mutex<Vec<(usize, Result<()>)>>>;

fn recorder(outcomes: &Outcomes, index: usize) -> impl FnOnce(Result<()>) + Send + 'static {
    let outcomes = Arc::clone(outcomes);
    move |result: Result<()>| outcomes.lock().push((index, result))
}

#[test]
fn test_target_released_mid_chain() {
    let (engine, clock, view) = setup();
    let outcomes: Outcomes = Arc::default();
    let finished = Arc::new(Mutex::new(None));

    let sink = Arc::clone(&finished);
    engine.events().connect(move |event| {
        if let ChainEvent::Finished { outcome, .. } = event {
            *sink.lock() = Some(outcome.clone());
        }
    });

    view.alpha(0.5)
        .on_complete(recorder(&outcomes, 0))
        .shake()
        .on_complete(recorder(&outcomes, 1))
        .run(&engine)
        .unwrap();
    drop(view);

    assert_eq!(clock.settle(&engine), Some(Duration::from_millis(700)));

    assert_eq!(
        *outcomes.lock(),
        [
            (0, Err(AnimationError::TargetGone)),
            (1, Err(AnimationError::TargetGone)),
        ]
    );
    assert_eq!(*finished.lock(), Some(Err(AnimationError::TargetGone)));
    assert_eq!(engine.registry_len(), 0);
    assert!(engine.is_idle());
}

#[test]
fn test_target_released_before_run() {
    let (engine, _clock, view) = setup();
    let outcomes: Outcomes = Arc::default();

    let builder = view.alpha(0.5).on_complete(recorder(&outcomes, 0));
    drop(view);

    assert_eq!(builder.run(&engine), Err(AnimationError::TargetGone));
    assert_eq!(*outcomes.lock(), [(0, Err(AnimationError::TargetGone))]);
    assert_eq!(engine.registry_len(), 0);
}

#[test]
fn test_empty_chain() {
    let (engine, _clock, view) = setup();
    let builder = kinetic::ChainBuilder::for_surface(&view);
    assert!(builder.is_empty());
    assert_eq!(builder.run(&engine).unwrap_err(), AnimationError::EmptyChain);

    let builder = kinetic::ChainBuilder::for_surface(&view);
    assert_eq!(builder.prepare(&engine).unwrap_err(), AnimationError::EmptyChain);
}

#[test]
fn test_one_per_surface() {
    let config = EngineConfig::default().with_admission(AdmissionPolicy::OnePerSurface);
    let engine = Engine::with_config(config).unwrap();
    let clock = HeadlessClock::new();
    let view = HeadlessSurface::new(&clock);
    let other = HeadlessSurface::new(&clock);
    let outcomes: Outcomes = Arc::default();

    view.alpha(0.5).run(&engine).unwrap();
    other.alpha(0.5).run(&engine).unwrap();

    let rejected = view
        .slide(Direction::Right)
        .on_complete(recorder(&outcomes, 0))
        .run(&engine);
    let busy = AnimationError::SurfaceBusy(view.surface_id());
    assert_eq!(rejected, Err(busy.clone()));
    assert_eq!(*outcomes.lock(), [(0, Err(busy))]);

    clock.settle(&engine).unwrap();
    view.slide(Direction::Right).run(&engine).unwrap();
    clock.settle(&engine).unwrap();
    assert_eq!(
        view.affine(),
        Affine2::from_translation(Vec2::new(200.0, 0.0))
    );
}

#[test]
fn test_concurrent_chains_by_default() {
    let (engine, clock, view) = setup();
    view.alpha(0.5).run(&engine).unwrap();
    view.corner_radius(8.0).run(&engine).unwrap();
    assert_eq!(engine.active_count(), 2);

    clock.settle(&engine).unwrap();
    assert_eq!(view.scalar(Property::Alpha), Some(0.5));
    assert_eq!(view.scalar(Property::CornerRadius), Some(8.0));
}

/// A host that never completes anything: it drops every token.
struct TornDown(SurfaceId);

impl Surface for TornDown {
    fn surface_id(&self) -> SurfaceId {
        self.0
    }
    fn property(&self, _property: Property) -> Option<PropertyValue> {
        None
    }
    fn set_property(&self, _property: Property, _value: PropertyValue) {}
    fn clear_property(&self, _property: Property) {}
    fn set_interaction_enabled(&self, _enabled: bool) {}
    fn animate_properties(&self, _transition: PropertyTransition, _token: CompletionToken) {}
    fn animate_layer(&self, _group: LayerAnimationGroup, _token: CompletionToken) {}
    fn schedule(&self, _delay: Duration, _token: CompletionToken) {}
}

#[test]
fn test_abandoned_requests_do_not_leak() {
    let engine = Engine::new();
    let view = Arc::new(TornDown(SurfaceId::next()));
    let outcomes: Outcomes = Arc::default();

    view.alpha(0.2)
        .on_complete(recorder(&outcomes, 0))
        .boing()
        .on_complete(recorder(&outcomes, 1))
        .run(&engine)
        .unwrap();

    engine.drain_events();
    assert!(engine.is_idle());
    assert_eq!(*outcomes.lock(), [(0, Ok(())), (1, Ok(()))]);
}
