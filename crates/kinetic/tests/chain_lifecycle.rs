//! Integration tests for chain execution order, commit and the registry.
//!
//! Chains run against a headless surface whose completions are driven by a
//! virtual clock.

use std::sync::Arc;
use std::time::Duration;

use kinetic::headless::{HeadlessClock, HeadlessSurface, Request};
use kinetic::prelude::*;
use parking_lot::Mutex;

fn setup() -> (Engine, Arc<HeadlessClock>, Arc<HeadlessSurface>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let clock = HeadlessClock::new();
    let surface = HeadlessSurface::new(&clock);
    (Engine::new(), clock, surface)
}

/// Collects named markers from completions and event slots.
fn journal() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn test_contexts_run_in_order() {
    let (engine, clock, view) = setup();
    let log = journal();

    let events = Arc::clone(&log);
    engine.events().connect(move |event| {
        let entry = match event {
            ChainEvent::Started { contexts, .. } => format!("started {contexts}"),
            ChainEvent::ContextStarted { index, .. } => format!("begin {index}"),
            ChainEvent::ContextFinished { index, .. } => format!("unwind {index}"),
            ChainEvent::Finished { outcome, .. } => format!("finished {}", outcome.is_ok()),
        };
        events.lock().push(entry);
    });

    let (first, second, third) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));
    view.translate(10.0, 0.0)
        .on_complete(move |_| first.lock().push("done 0".into()))
        .shake()
        .on_complete(move |_| second.lock().push("done 1".into()))
        .delay(Duration::from_millis(50))
        .on_complete(move |_| third.lock().push("done 2".into()))
        .run(&engine)
        .unwrap();

    clock.settle(&engine).unwrap();

    assert_eq!(
        *log.lock(),
        [
            "started 3",
            "begin 0",
            "unwind 0",
            "done 0",
            "begin 1",
            "unwind 1",
            "done 1",
            "begin 2",
            "unwind 2",
            "done 2",
            "finished true",
        ]
    );
}

#[test]
fn test_next_context_sees_replayed_breadcrumbs() {
    let (engine, clock, view) = setup();
    let observed = Arc::new(Mutex::new(None));

    let probe = Arc::clone(&view);
    let seen = Arc::clone(&observed);
    view.alpha(0.3)
        .options([AnimationOption::RemoveOnCompletion(true)])
        .on_complete(move |result| {
            assert!(result.is_ok());
            *seen.lock() = probe.scalar(Property::Alpha);
        })
        .alpha(0.6)
        .run(&engine)
        .unwrap();

    clock.settle(&engine).unwrap();

    // The revert ran before the completion and before the second context.
    assert_eq!(*observed.lock(), Some(1.0));
    assert_eq!(view.scalar(Property::Alpha), Some(0.6));
}

#[test]
fn test_requests_are_sequential() {
    let (engine, clock, view) = setup();
    view.alpha(0.5).alpha(0.1).run(&engine).unwrap();

    engine.drain_events();
    assert_eq!(view.requests().len(), 1);

    clock.settle(&engine).unwrap();
    let starts: Vec<Duration> = view.requests().iter().map(Request::at).collect();
    assert_eq!(starts, [Duration::ZERO, Duration::from_millis(700)]);
}

#[test]
fn test_interaction_disabled_while_running() {
    let (engine, clock, view) = setup();
    view.pop().run(&engine).unwrap();
    assert!(!view.is_interaction_enabled());

    clock.settle(&engine).unwrap();
    assert!(view.is_interaction_enabled());
}

#[test]
fn test_commit_is_idempotent() {
    let (engine, clock, view) = setup();
    let handle = view.alpha(0.4).prepare(&engine).unwrap();
    assert_eq!(handle.state(), ChainState::Built);
    assert!(view.requests().is_empty());

    handle.commit().unwrap();
    assert_eq!(handle.commit(), Err(AnimationError::AlreadyCommitted));
    assert_eq!(view.requests().len(), 1);

    clock.settle(&engine).unwrap();
    assert_eq!(handle.state(), ChainState::Completed);
    assert_eq!(handle.commit(), Err(AnimationError::AlreadyCommitted));
    assert_eq!(view.requests().len(), 1);
}

#[test]
fn test_dropped_builder_runs_nothing() {
    let (engine, _clock, view) = setup();
    drop(view.alpha(0.2).shake());

    assert!(engine.is_idle());
    assert!(view.requests().is_empty());
    assert_eq!(view.scalar(Property::Alpha), Some(1.0));
}

#[test]
fn test_registry_releases_finished_chain() {
    let (engine, clock, view) = setup();
    let before = engine.registry_len();

    let id = view.fade_in(Direction::Up).run(&engine).unwrap();
    assert_eq!(engine.registry_len(), before + 1);
    assert_eq!(engine.chain_state(id), Some(ChainState::Running));

    clock.settle(&engine).unwrap();
    assert_eq!(engine.registry_len(), before);
    assert_eq!(engine.chain_state(id), None);
}

#[test]
fn test_dropped_handle_still_unwinds() {
    let (engine, clock, view) = setup();
    let handle = view.alpha(0.25).prepare(&engine).unwrap();
    handle.commit().unwrap();
    assert_eq!(engine.registry_len(), 0);

    drop(handle);
    assert_eq!(engine.registry_len(), 1);

    clock.settle(&engine).unwrap();
    assert_eq!(view.scalar(Property::Alpha), Some(0.25));
    assert_eq!(engine.registry_len(), 0);
}

#[test]
fn test_now_applies_earlier_contexts_immediately() {
    let (engine, clock, view) = setup();
    let id = view
        .alpha(0.5)
        .translate(10.0, 0.0)
        .now()
        .scale(2.0, 2.0)
        .run(&engine)
        .unwrap();

    engine.drain_events();
    assert_eq!(clock.now(), Duration::ZERO);
    assert_eq!(view.scalar(Property::Alpha), Some(0.5));

    let snapshot = engine.snapshot();
    let chain = snapshot.iter().find(|chain| chain.id == id).unwrap();
    assert_eq!(chain.cursor, 3);
    let flags: Vec<bool> = chain.contexts.iter().map(|c| c.no_animate).collect();
    assert_eq!(flags, [true, true, true, false]);

    // Only the context after `now` reached the host.
    let requests = view.requests();
    assert_eq!(requests.len(), 1);
    let Request::Properties { transition, .. } = &requests[0] else {
        panic!("expected a property transition");
    };
    let expected = Affine2::from_translation(Vec2::new(10.0, 0.0))
        * Affine2::from_scale(Vec2::splat(2.0));
    assert_eq!(
        transition.changes.last().map(|c| c.value),
        Some(PropertyValue::Affine(expected))
    );

    assert_eq!(clock.settle(&engine), Some(Duration::from_millis(700)));
}

#[test]
fn test_now_inside_a_context() {
    let (engine, clock, view) = setup();
    let id = view
        .animate([Step::Alpha(0.5), Step::Shake, Step::Now])
        .scale(2.0, 2.0)
        .run(&engine)
        .unwrap();

    engine.drain_events();
    assert_eq!(clock.now(), Duration::ZERO);
    assert_eq!(view.scalar(Property::Alpha), Some(0.5));

    let snapshot = engine.snapshot();
    let chain = snapshot.iter().find(|chain| chain.id == id).unwrap();
    assert_eq!(chain.cursor, 1);
    let flags: Vec<bool> = chain.contexts.iter().map(|c| c.no_animate).collect();
    assert_eq!(flags, [true, false]);

    // Neither the alpha edit nor the shake reached the host.
    let requests = view.requests();
    assert_eq!(requests.len(), 1);
    assert!(matches!(requests[0], Request::Properties { .. }));

    assert_eq!(clock.settle(&engine), Some(Duration::from_millis(700)));
    assert_eq!(view.affine(), Affine2::from_scale(Vec2::splat(2.0)));
}

#[test]
fn test_event_connections() {
    let (engine, clock, view) = setup();
    let seen = Arc::new(Mutex::new(0usize));

    {
        let counter = Arc::clone(&seen);
        let _guard = engine.events().connect_scoped(move |_| *counter.lock() += 1);
        view.alpha(0.5).run(&engine).unwrap();
        clock.settle(&engine).unwrap();
    }
    // Started, ContextStarted, ContextFinished, Finished.
    assert_eq!(*seen.lock(), 4);
    assert_eq!(engine.events().connection_count(), 0);

    let counter = Arc::clone(&seen);
    engine.events().connect(move |_| *counter.lock() += 1);
    engine.events().set_blocked(true);
    view.alpha(0.2).run(&engine).unwrap();
    clock.settle(&engine).unwrap();
    assert_eq!(*seen.lock(), 4);

    engine.events().set_blocked(false);
    engine.events().disconnect_all();
    view.alpha(0.8).run(&engine).unwrap();
    clock.settle(&engine).unwrap();
    assert_eq!(*seen.lock(), 4);
}

#[test]
fn test_config_defaults_apply() {
    let config = EngineConfig::from_toml_str(
        r#"
        [defaults]
        duration_secs = 0.1
        curve = "linear"
        "#,
    )
    .unwrap();
    let engine = Engine::with_config(config).unwrap();
    let clock = HeadlessClock::new();
    let view = HeadlessSurface::new(&clock);

    view.alpha(0.0).run(&engine).unwrap();
    let Some(Request::Properties { transition, .. }) = view.requests().pop() else {
        panic!("expected a property transition");
    };
    assert_eq!(transition.timing.duration, Duration::from_millis(100));
    assert_eq!(transition.timing.curve, Curve::Linear);
    assert_eq!(clock.settle(&engine), Some(Duration::from_millis(100)));
}

#[test]
fn test_chain_tree_debug_lists_running_chain() {
    let (engine, _clock, view) = setup();
    view.alpha(0.5).wobble().run(&engine).unwrap();

    let output = kinetic::ChainTreeDebug::new(&engine).to_string();
    assert!(output.contains("Chains (1 registered)"));
    assert!(output.contains("[wobble]"));
}
