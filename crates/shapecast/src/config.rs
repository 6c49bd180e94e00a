use serde::Deserialize;

use crate::error::{CastError, ConfigError};

pub const DEFAULT_MAX_DEPTH: usize = 256;
pub const DEFAULT_MAX_DESCRIPTOR_DEPTH: usize = 256;

/// Engine settings. Every field has a default, so an empty document is a
/// valid configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CastConfig {
    pub limits: Limits,
    pub envelope: EnvelopeKeys,
}

impl CastConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, CastError> {
        toml::from_str(text).map_err(|err| CastError::Config(ConfigError::Toml(err)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Maximum nesting depth of the value being coerced.
    pub max_depth: usize,
    /// Maximum nesting of the descriptor being compiled. Every descriptor
    /// level counts, unions and optionals included.
    pub max_descriptor_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_descriptor_depth: DEFAULT_MAX_DESCRIPTOR_DEPTH,
        }
    }
}

/// Key names read from an invocation envelope.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvelopeKeys {
    pub callable: String,
    pub args: String,
    pub kwargs: String,
}

impl Default for EnvelopeKeys {
    fn default() -> Self {
        Self {
            callable: "fn".to_string(),
            args: "args".to_string(),
            kwargs: "kwargs".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = CastConfig::from_toml_str("").expect("empty config");
        assert_eq!(config, CastConfig::default());
        assert_eq!(config.limits.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.envelope.callable, "fn");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = CastConfig::from_toml_str(
            r#"
[limits]
max_depth = 8

[envelope]
callable = "target"
"#,
        )
        .expect("config");
        assert_eq!(config.limits.max_depth, 8);
        assert_eq!(config.limits.max_descriptor_depth, DEFAULT_MAX_DESCRIPTOR_DEPTH);
        assert_eq!(config.envelope.callable, "target");
        assert_eq!(config.envelope.kwargs, "kwargs");
    }

    #[test]
    fn unknown_keys_are_configuration_errors() {
        let err = CastConfig::from_toml_str("[limits]\nmax_depht = 3\n").expect_err("typo");
        assert!(err.is_config());
    }
}
