//! Prelude module for Kinetic.
//!
//! This module re-exports the most commonly used types:
//!
//! ```ignore
//! use kinetic::prelude::*;
//! ```
//!
//! This provides access to:
//! - The fluent chain API (`Animating`, `ChainBuilder`, `ChainHandle`)
//! - Steps and options (`Step`, `AnimationOption`, `Curve`, `Direction`)
//! - The engine and its events (`Engine`, `EngineConfig`, `ChainEvent`)
//! - The host capability (`Surface`, `CompletionToken`, `Property`)

// ============================================================================
// Chains
// ============================================================================

pub use crate::{Animating, ChainBuilder, ChainHandle, ChainId, ChainState};

// ============================================================================
// Steps and Options
// ============================================================================

pub use crate::{AnimationOption, Curve, Direction, Options, Step, StepClass};

// ============================================================================
// Engine
// ============================================================================

pub use crate::{AdmissionPolicy, ChainEvent, Engine, EngineConfig};
pub use crate::{AnimationError, Result};

// ============================================================================
// Host Capability
// ============================================================================

pub use crate::{
    CompletionToken, LayerAnimationGroup, Property, PropertyTransition, PropertyValue, Surface,
    SurfaceId,
};

// ============================================================================
// Geometry
// ============================================================================

pub use crate::{Affine2, Color, Mat4, Rect, Vec2};
