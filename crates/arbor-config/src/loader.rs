//! Layered configuration loading

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use crate::{error::Result, types::InjectorConfig};

/// Builds an [`InjectorConfig`] from defaults, TOML snippets and the environment.
///
/// Later layers win: defaults, then each TOML snippet in the order added, then
/// environment variables such as `ARBOR_RESOLUTION__MAX_DEPTH=64`.
pub struct ConfigLoader {
    /// Environment prefix
    env_prefix: String,
    /// TOML snippets layered over the defaults
    snippets: Vec<String>,
}

impl ConfigLoader {
    /// Create a loader with the `ARBOR` environment prefix
    pub fn new() -> Self {
        Self {
            env_prefix: "ARBOR".to_string(),
            snippets: Vec::new(),
        }
    }

    /// Use a custom environment prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Layer a TOML snippet over the previous layers
    pub fn with_toml(mut self, source: impl Into<String>) -> Self {
        self.snippets.push(source.into());
        self
    }

    /// Build and validate the configuration
    pub fn load(&self) -> Result<InjectorConfig> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&InjectorConfig::default())?);

        for snippet in &self.snippets {
            builder = builder.add_source(File::from_str(snippet, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: InjectorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            prefix = %self.env_prefix,
            layers = self.snippets.len(),
            max_depth = config.resolution.max_depth,
            "Loaded injector configuration"
        );
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
