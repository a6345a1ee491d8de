//! Core configuration types

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main injector configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct InjectorConfig {
    /// Resolution behaviour
    pub resolution: ResolutionConfig,
    /// Diagnostic output
    pub diagnostics: DiagnosticsConfig,
}

/// Resolution-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Maximum number of frames on one resolution stack
    pub max_depth: usize,
    /// What to do with leading constructor parameters that carry no annotation
    pub manual_arguments: ManualArgumentPolicy,
}

/// Handling of manual (unannotated, leading) constructor parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ManualArgumentPolicy {
    /// Pass the absent sentinel and emit a warning
    #[default]
    FillAbsent,
    /// Fail the resolution
    Reject,
}

/// Diagnostics configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Emit a debug event when a child binding shadows an ancestor binding
    pub log_shadowing: bool,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            max_depth: 128,
            manual_arguments: ManualArgumentPolicy::FillAbsent,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_shadowing: true,
        }
    }
}

impl InjectorConfig {
    /// Parse a configuration from TOML; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: InjectorConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.resolution.max_depth == 0 {
            return Err(ConfigError::Validation(
                "resolution.max_depth must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
