//! Normalized binding recipes

use std::fmt;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use serde::Serialize;

use crate::annotations::ClassRef;
use crate::error::DiResult;
use crate::identifier::AnyIdentifier;
use crate::instance::{Arguments, Instance};

pub(crate) type FactoryFn = Rc<dyn Fn(&Arguments) -> DiResult<Instance>>;
pub(crate) type AsyncLoader = Rc<dyn Fn(Arguments) -> LocalBoxFuture<'static, DiResult<Instance>>>;

/// How a registered identifier produces its value
///
/// Immutable once registered; `replace` swaps in a new `Rc<Binding>`.
pub(crate) enum Binding {
    Value(Instance),
    Class {
        class: ClassRef,
        /// Explicit dependencies; `None` means the annotation reader decides
        deps: Option<Vec<AnyIdentifier>>,
    },
    Factory {
        factory: FactoryFn,
        deps: Vec<AnyIdentifier>,
    },
    Alias(AnyIdentifier),
    Async {
        loader: AsyncLoader,
        deps: Vec<AnyIdentifier>,
    },
}

impl Binding {
    pub(crate) fn kind(&self) -> BindingKind {
        match self {
            Self::Value(_) => BindingKind::Value,
            Self::Class { .. } => BindingKind::Class,
            Self::Factory { .. } => BindingKind::Factory,
            Self::Alias(_) => BindingKind::Alias,
            Self::Async { .. } => BindingKind::Async,
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value"),
            Self::Class { class, deps } => f
                .debug_struct("Class")
                .field("class", &class.name())
                .field("deps", deps)
                .finish(),
            Self::Factory { deps, .. } => f.debug_struct("Factory").field("deps", deps).finish(),
            Self::Alias(target) => f.debug_tuple("Alias").field(target).finish(),
            Self::Async { deps, .. } => f.debug_struct("Async").field("deps", deps).finish(),
        }
    }
}

/// Recipe kind, as reported by snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    Value,
    Class,
    Factory,
    Alias,
    Async,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Value => "value",
            Self::Class => "class",
            Self::Factory => "factory",
            Self::Alias => "alias",
            Self::Async => "async",
        };
        f.write_str(label)
    }
}
