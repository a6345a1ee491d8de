//! Arbor injector configuration
//!
//! Settings that tune how an injector resolves bindings: the resolution depth
//! limit, what happens to constructor parameters nobody annotated, and which
//! diagnostics get emitted. Configuration is layered from defaults, TOML
//! snippets and environment variables by [`ConfigLoader`].

pub mod error;
pub mod loader;
pub mod types;

pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use types::{DiagnosticsConfig, InjectorConfig, ManualArgumentPolicy, ResolutionConfig};
