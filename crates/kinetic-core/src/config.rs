//! Engine configuration.
//!
//! An [`EngineConfig`] carries the option defaults every context resolves
//! against, the admission policy for chains sharing a surface, and the
//! event budget of one [`Engine::process_events`](crate::Engine::process_events)
//! call. It can be parsed from TOML:
//!
//! ```
//! use kinetic_core::{AdmissionPolicy, EngineConfig};
//!
//! let config = EngineConfig::from_toml_str(
//!     r#"
//!     admission = "one_per_surface"
//!
//!     [defaults]
//!     duration_secs = 0.25
//!     curve = "linear"
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.admission, AdmissionPolicy::OnePerSurface);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::error::{ConfigError, ConfigResult};
use crate::options::Options;

/// Default number of completions handled per pump.
pub const DEFAULT_MAX_EVENTS_PER_PUMP: usize = 1024;

/// How the engine treats a second chain on a surface that already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Chains run side by side; overlapping edits race.
    #[default]
    Concurrent,
    /// A chain is rejected with `SurfaceBusy` while another is active.
    OnePerSurface,
}

/// Option defaults in configuration units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionDefaults {
    pub delay_secs: f64,
    pub duration_secs: f64,
    pub curve: Curve,
    pub damping: f32,
    pub velocity: f32,
    pub repeat_count: f32,
    pub autoreverse: bool,
    pub remove_on_completion: bool,
}

impl Default for OptionDefaults {
    fn default() -> Self {
        let options = Options::default();
        Self {
            delay_secs: options.delay.as_secs_f64(),
            duration_secs: options.duration.as_secs_f64(),
            curve: options.curve,
            damping: options.damping,
            velocity: options.velocity,
            repeat_count: options.repeat_count,
            autoreverse: options.autoreverse,
            remove_on_completion: options.remove_on_completion,
        }
    }
}

impl OptionDefaults {
    /// Convert to resolved [`Options`]. Call [`EngineConfig::validate`] first.
    pub fn to_options(&self) -> Options {
        Options {
            delay: seconds(self.delay_secs),
            duration: seconds(self.duration_secs),
            curve: self.curve,
            damping: self.damping,
            velocity: self.velocity,
            repeat_count: self.repeat_count,
            autoreverse: self.autoreverse,
            remove_on_completion: self.remove_on_completion,
            no_animate: false,
        }
    }
}

/// Configuration of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub defaults: OptionDefaults,
    pub admission: AdmissionPolicy,
    pub max_events_per_pump: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defaults: OptionDefaults::default(),
            admission: AdmissionPolicy::default(),
            max_events_per_pump: DEFAULT_MAX_EVENTS_PER_PUMP,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        tracing::debug!(
            target: "kinetic_core::config",
            admission = ?config.admission,
            max_events_per_pump = config.max_events_per_pump,
            "engine configuration loaded"
        );
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn with_admission(mut self, admission: AdmissionPolicy) -> Self {
        self.admission = admission;
        self
    }

    pub fn with_defaults(mut self, defaults: OptionDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Check every value is in range.
    pub fn validate(&self) -> ConfigResult<()> {
        let defaults = &self.defaults;

        non_negative("defaults.delay_secs", defaults.delay_secs)?;
        non_negative("defaults.duration_secs", defaults.duration_secs)?;

        if !(defaults.repeat_count > 0.0) {
            return Err(invalid("defaults.repeat_count", "must be positive"));
        }
        if !defaults.damping.is_finite() || defaults.damping <= 0.0 {
            return Err(invalid("defaults.damping", "must be a positive number"));
        }
        if !defaults.velocity.is_finite() {
            return Err(invalid("defaults.velocity", "must be finite"));
        }
        if self.max_events_per_pump == 0 {
            return Err(invalid("max_events_per_pump", "must not be zero"));
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a non-negative number of seconds"))
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn seconds(secs: f64) -> Duration {
    Duration::from_nanos((secs.max(0.0) * 1e9).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_options() {
        let options = EngineConfig::default().defaults.to_options();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn test_partial_document() {
        let config = EngineConfig::from_toml_str(
            r#"
            [defaults]
            duration_secs = 0.2
            remove_on_completion = true
            "#,
        )
        .unwrap();

        let options = config.defaults.to_options();
        assert_eq!(options.duration, Duration::from_millis(200));
        assert!(options.remove_on_completion);
        assert_eq!(options.damping, 0.7);
        assert_eq!(config.admission, AdmissionPolicy::Concurrent);
        assert_eq!(config.max_events_per_pump, DEFAULT_MAX_EVENTS_PER_PUMP);
    }

    #[test]
    fn test_rejects_negative_duration() {
        let err = EngineConfig::from_toml_str("[defaults]\nduration_secs = -1.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "defaults.duration_secs",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_budget() {
        let err = EngineConfig::from_toml_str("max_events_per_pump = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_events_per_pump"));
    }

    #[test]
    fn test_infinite_repeat_is_valid() {
        let config = EngineConfig::from_toml_str("[defaults]\nrepeat_count = inf\n").unwrap();
        assert!(config.defaults.to_options().repeats_forever());
    }

    #[test]
    fn test_parse_error() {
        let err = EngineConfig::from_toml_str("admission = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EngineConfig::default().with_admission(AdmissionPolicy::OnePerSurface);
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("one_per_surface"));
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }
}
