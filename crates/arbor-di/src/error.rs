//! Injector error types

use thiserror::Error;

/// Result alias used throughout the crate
pub type DiResult<T> = Result<T, DiError>;

/// Errors that can occur while declaring or resolving bindings
#[derive(Debug, Error)]
pub enum DiError {
    /// No binding for the identifier anywhere in the injector chain
    #[error("{}", unregistered_message(.identifier, .requested_by.as_deref()))]
    UnregisteredIdentifier {
        identifier: String,
        requested_by: Option<String>,
    },

    /// A second binding for the same identifier in one registry
    #[error("Identifier \"{identifier}\" is already bound in this injector")]
    DuplicateBinding { identifier: String },

    /// Mutation of an identifier whose value is already cached
    #[error("Cannot {operation} \"{identifier}\" after it has been resolved")]
    AlreadyResolved {
        identifier: String,
        operation: &'static str,
    },

    /// Mutation of an identifier that is being resolved right now
    #[error("Identifier \"{identifier}\" is being resolved")]
    ResolutionInProgress { identifier: String },

    /// A resolution path revisited an identifier still on its own stack
    #[error("Circular dependency detected: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },

    /// A constructor parameter between annotated parameters has no annotation
    #[error("Parameter {index} of \"{class}\" has no injection annotation")]
    MissingAnnotation { class: String, index: usize },

    /// A binding declaration that cannot be normalized
    #[error("Invalid binding for \"{identifier}\": {reason}")]
    InvalidBindingSpec { identifier: String, reason: String },

    /// A stored value does not have the requested type
    #[error("Type mismatch for \"{identifier}\": expected {expected}")]
    TypeMismatch {
        identifier: String,
        expected: &'static str,
    },

    /// A positional argument is absent or out of range
    #[error("Argument {index} of \"{owner}\" is not available")]
    ArgumentUnavailable { owner: String, index: usize },

    /// The resolution stack grew past the configured limit
    #[error("Resolution exceeded {limit} levels: {}", .path.join(" -> "))]
    ResolutionTooDeep { limit: usize, path: Vec<String> },

    /// An async binding was requested through the synchronous path
    #[error("Identifier \"{identifier}\" is bound asynchronously; use get_async")]
    AsyncResolutionRequired { identifier: String },

    /// An identifier catalog already issued this name
    #[error("Identifier name \"{name}\" is already in use")]
    DuplicateIdentifier { name: String },

    /// A constructor or factory reported a failure
    #[error("Failed to construct \"{identifier}\": {source}")]
    Construction {
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Config(#[from] arbor_config::ConfigError),
}

impl DiError {
    /// Wrap a constructor or factory failure
    pub fn construction<E>(identifier: impl Into<String>, error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Construction {
            identifier: identifier.into(),
            source: error.into(),
        }
    }

    /// The cycle carried by a `CircularDependency` error
    pub fn cycle(&self) -> Option<&[String]> {
        match self {
            Self::CircularDependency { cycle } => Some(cycle),
            _ => None,
        }
    }
}

fn unregistered_message(identifier: &str, requested_by: Option<&str>) -> String {
    match requested_by {
        Some(requester) => format!(
            "No binding for \"{identifier}\" (required by \"{requester}\"). Did you forget to register it?"
        ),
        None => format!("No binding for \"{identifier}\". Did you forget to register it?"),
    }
}
