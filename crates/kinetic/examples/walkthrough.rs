//! Kinetic Walkthrough Example
//!
//! Runs a few chains against a headless surface and prints the engine's
//! chain tree and lifecycle events as they happen.
//!
//! Run with: RUST_LOG=kinetic_core=trace cargo run -p kinetic --example walkthrough

use std::time::Duration;

use kinetic::headless::{HeadlessClock, HeadlessSurface};
use kinetic::logging::{ChainTreeDebug, TreeFormatOptions, targets};
use kinetic::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{}=info,{}=debug", targets::CORE, targets::ENGINE))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let engine = Engine::new();
    let clock = HeadlessClock::new();
    let card = HeadlessSurface::new(&clock);
    let badge = HeadlessSurface::new(&clock);

    engine.events().connect(|event| match event {
        ChainEvent::Started { chain, contexts, .. } => {
            println!("started {chain:?} with {contexts} contexts");
        }
        ChainEvent::ContextFinished {
            index, breadcrumbs, ..
        } => {
            println!("  context {index} finished, {} breadcrumbs", breadcrumbs.len());
        }
        ChainEvent::Finished { chain, outcome, .. } => {
            println!("finished {chain:?}: {outcome:?}");
        }
        ChainEvent::ContextStarted { .. } => {}
    });

    card.scale(1.2, 1.2)
        .flip(Direction::Left)
        .boing()
        .on_complete(|result| println!("  boing done: {result:?}"))
        .run(&engine)?;

    badge
        .fade_out(Direction::Down)
        .options([
            AnimationOption::Duration(Duration::from_millis(200)),
            AnimationOption::RemoveOnCompletion(true),
        ])
        .flash()
        .run(&engine)?;

    println!(
        "{}",
        ChainTreeDebug::with_options(&engine, TreeFormatOptions::detailed())
    );

    match clock.settle(&engine) {
        Some(elapsed) => println!("settled after {elapsed:?} of virtual time"),
        None => println!("engine still busy"),
    }
    println!("{}", ChainTreeDebug::new(&engine));
    Ok(())
}
