//! Core systems for Kinetic.
//!
//! This crate provides the animation composition engine behind Kinetic:
//!
//! - **Steps**: property edits, layer animations and named presets
//! - **Options**: timing knobs resolved per context
//! - **Chains**: ordered contexts declared with a fluent builder
//! - **Engine**: registry, event pump and lifecycle events
//! - **Breadcrumbs**: property edits reverted or persisted on completion
//! - **Signal/Slot System**: observer notifications
//!
//! The engine never renders. Hosts implement [`Surface`] to animate their
//! own views and report back through [`CompletionToken`]s.
//!
//! # Chain Example
//!
//! ```ignore
//! use std::time::Duration;
//! use kinetic_core::{Animating, AnimationOption, Direction, Engine};
//!
//! let engine = Engine::new();
//! surface
//!     .fade_out(Direction::Down)
//!     .options([
//!         AnimationOption::Duration(Duration::from_millis(200)),
//!         AnimationOption::RemoveOnCompletion(true),
//!     ])
//!     .on_complete(|result| println!("faded: {result:?}"))
//!     .run(&engine)?;
//!
//! // On the host's main loop:
//! engine.process_events();
//! ```
//!
//! # Signal/Slot Example
//!
//! ```
//! use kinetic_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

pub mod chain;
pub mod config;
pub mod context;
pub mod curve;
pub mod direction;
pub mod engine;
mod error;
pub mod geometry;
pub mod layer;
pub mod logging;
pub mod options;
pub mod property;
pub mod signal;
pub mod step;
pub mod surface;

pub use chain::{Animating, Chain, ChainBuilder, ChainId, ChainState};
pub use config::{AdmissionPolicy, EngineConfig, OptionDefaults};
pub use context::{Completion, Context, ContextState};
pub use curve::Curve;
pub use direction::{Axis, Direction};
pub use engine::{ChainEvent, ChainHandle, ChainSnapshot, ContextSnapshot, Engine};
pub use error::{AnimationError, ConfigError, ConfigResult, Result};
pub use geometry::{Color, Rect};
pub use layer::{KeyPath, LayerAnimation, LayerAnimationGroup};
pub use logging::{ChainTreeDebug, PerfSpan, TreeFormatOptions, TreeStyle};
pub use options::{AnimationOption, Options};
pub use property::{
    Breadcrumb, BreadcrumbAction, BreadcrumbLog, Interpolate, Property, PropertyChange,
    PropertyValue,
};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use step::{CustomStage, Step, StepClass};
pub use surface::{CompletionToken, PropertyTransition, Surface, SurfaceId, Timing};

// Re-export glam types that appear in the public API
pub use glam::{Affine2, Mat4, Vec2, Vec3};
