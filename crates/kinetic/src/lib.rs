//! Kinetic - chainable view animations.
//!
//! This is the umbrella crate that re-exports the engine from
//! `kinetic-core` and adds a headless host.
//!
//! # Example
//!
//! ```
//! use kinetic::prelude::*;
//! use kinetic::headless::{HeadlessClock, HeadlessSurface};
//!
//! let engine = Engine::new();
//! let clock = HeadlessClock::new();
//! let view = HeadlessSurface::new(&clock);
//!
//! view.scale(1.2, 1.2)
//!     .flip(Direction::Left)
//!     .boing()
//!     .run(&engine)
//!     .unwrap();
//!
//! clock.settle(&engine).unwrap();
//! assert!(view.is_interaction_enabled());
//! ```

pub use kinetic_core::*;

#[cfg(feature = "headless")]
pub mod headless;
pub mod prelude;

#[cfg(feature = "headless")]
static_assertions::assert_impl_all!(headless::HeadlessSurface: Surface, Send, Sync);
#[cfg(feature = "headless")]
static_assertions::assert_impl_all!(headless::HeadlessClock: Send, Sync);
