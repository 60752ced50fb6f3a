//! Logging and debugging facilities for Kinetic.
//!
//! This module provides:
//! - Target names for filtering the engine's `tracing` output
//! - A tree view of the chains an [`Engine`] currently holds
//! - Performance spans for profiling the event pump
//!
//! # Tracing Integration
//!
//! Kinetic uses the `tracing` crate for instrumentation. Install a
//! subscriber in the host application to see it:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("kinetic_core::engine=debug")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! ```ignore
//! use kinetic_core::logging::ChainTreeDebug;
//!
//! println!("{}", ChainTreeDebug::new(&engine));
//! ```

use std::fmt;

use crate::engine::{ChainSnapshot, Engine};

/// Span names used throughout Kinetic for tracing.
pub mod span_names {
    /// Event pump span.
    pub const PUMP: &str = "kinetic::pump";
    /// Context unwind span.
    pub const UNWIND: &str = "kinetic::unwind";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core target, used by the `kinetic_*!` macros.
    pub const CORE: &str = "kinetic_core";
    /// Registry and event pump.
    pub const ENGINE: &str = "kinetic_core::engine";
    /// Chain building and context execution.
    pub const CHAIN: &str = "kinetic_core::chain";
    /// Completion tokens.
    pub const SURFACE: &str = "kinetic_core::surface";
    /// Signal/slot system.
    pub const SIGNAL: &str = "kinetic_core::signal";
    /// Configuration loading.
    pub const CONFIG: &str = "kinetic_core::config";
    /// Performance spans.
    pub const PERF: &str = "kinetic::perf";
}

/// Style options for chain tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Compact single-line representation.
    Compact,
}

/// Configuration for chain tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Whether to show chain ids.
    pub show_ids: bool,
    /// Whether to show the steps of each context.
    pub show_steps: bool,
    /// Whether to show pending counts and no-animate flags.
    pub show_details: bool,
    /// Maximum number of contexts listed per chain (None for all).
    pub max_contexts: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_steps: true,
            show_details: false,
            max_contexts: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Options for detailed debugging output.
    pub fn detailed() -> Self {
        Self {
            show_details: true,
            ..Default::default()
        }
    }

    /// Options for minimal output.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_steps: false,
            show_details: false,
            ..Default::default()
        }
    }
}

/// Renders the chains registered with an engine as a tree.
///
/// Each chain is a root; its contexts are children, marked with `>` at the
/// cursor.
#[derive(Debug, Clone)]
pub struct ChainTreeDebug {
    chains: Vec<ChainSnapshot>,
    options: TreeFormatOptions,
}

impl ChainTreeDebug {
    /// Capture `engine` with default options.
    pub fn new(engine: &Engine) -> Self {
        Self::with_options(engine, TreeFormatOptions::default())
    }

    pub fn with_options(engine: &Engine, options: TreeFormatOptions) -> Self {
        Self {
            chains: engine.snapshot(),
            options,
        }
    }

    /// Number of chains captured.
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    fn format_chain(&self, chain: &ChainSnapshot, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.build_prefix(0, false), chain.surface)?;
        if self.options.show_ids {
            write!(f, " [{:?}]", chain.id)?;
        }
        write!(f, " ({}", chain.state)?;
        if chain.retained_by_registry {
            f.write_str(", registry")?;
        }
        writeln!(f, ")")?;

        let shown = self
            .options
            .max_contexts
            .map_or(chain.contexts.len(), |max| max.min(chain.contexts.len()));
        let hidden = chain.contexts.len() - shown;

        for (index, context) in chain.contexts.iter().take(shown).enumerate() {
            let is_last = hidden == 0 && index + 1 == shown;
            let marker = if index == chain.cursor && !chain.state.is_terminal() {
                '>'
            } else {
                ' '
            };
            write!(
                f,
                "{}{}{} {}",
                self.build_prefix(1, is_last),
                marker,
                index,
                context.state.name()
            )?;
            if self.options.show_steps {
                write!(f, " [{}]", context.steps.join(", "))?;
            }
            if self.options.show_details {
                write!(f, " pending={}", context.pending)?;
                if context.no_animate {
                    f.write_str(" no_animate")?;
                }
            }
            writeln!(f)?;
        }

        if hidden > 0 {
            writeln!(f, "{}({} more)", self.build_prefix(1, true), hidden)?;
        }
        Ok(())
    }

    /// Build the prefix string for a tree node.
    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }
}

impl fmt::Display for ChainTreeDebug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chains ({} registered):", self.chains.len())?;
        if self.chains.is_empty() {
            return writeln!(f, "  (empty)");
        }
        for chain in &self.chains {
            self.format_chain(chain, f)?;
        }
        Ok(())
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "kinetic::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns.
///
/// These wrap the `tracing` macros with the core target.
#[macro_export]
macro_rules! kinetic_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "kinetic_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! kinetic_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "kinetic_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! kinetic_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "kinetic_core", $($arg)*)
    };
}
