//! Error types for Kinetic.

use thiserror::Error;

use crate::surface::SurfaceId;

/// Errors reported by the animation engine.
///
/// These are delivered both as return values of the terminal chain calls
/// (`run`, `prepare`, `commit`) and as the argument of per-context
/// completion callbacks when a chain could not finish normally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    /// The surface a chain animates has been released.
    #[error("animation target is no longer available")]
    TargetGone,

    /// The chain has already been committed or has already finished.
    #[error("chain has already been committed")]
    AlreadyCommitted,

    /// The surface already has an active chain and the engine only admits one.
    #[error("surface {0} already has an active chain")]
    SurfaceBusy(SurfaceId),

    /// A terminal call was made on a builder with no contexts.
    #[error("chain has no contexts to run")]
    EmptyChain,
}

/// Errors raised while loading or validating engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse engine configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be written as TOML.
    #[error("failed to serialize engine configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A configuration value is out of range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, AnimationError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            AnimationError::TargetGone.to_string(),
            "animation target is no longer available"
        );
        assert_eq!(
            AnimationError::SurfaceBusy(SurfaceId::from_raw(7)).to_string(),
            "surface #7 already has an active chain"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            field: "duration_secs",
            reason: "must not be negative".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for `duration_secs`: must not be negative"
        );
    }
}
