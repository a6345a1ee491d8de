//! Hierarchical dependency injection for Arbor
//!
//! An [`Injector`] maps [`Identifier`]s to recipes (values, classes, factories,
//! aliases and async loaders), builds the object graph on demand, caches every
//! value it builds, and reports cycles with the full path. Child injectors
//! inherit their parent's bindings and may shadow them.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use arbor_di::{deps, Arguments, Declaration, DiResult, Identifier, Injectable, Injector};
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Client {
//!     config: Rc<Config>,
//! }
//!
//! impl Injectable for Client {
//!     const ARITY: usize = 1;
//!
//!     fn construct(args: &Arguments) -> DiResult<Self> {
//!         Ok(Client { config: args.get(0)? })
//!     }
//! }
//!
//! let config: Identifier<Config> = Identifier::new("config");
//! let client = Identifier::<Client>::of_type();
//!
//! let root = Injector::with_bindings([Declaration::value(
//!     &config,
//!     Rc::new(Config { url: "https://example.test".to_string() }),
//! )])
//! .unwrap();
//! root.add(Declaration::class(&client).with_deps(deps![config])).unwrap();
//!
//! let first = root.get(&client).unwrap();
//! let second = root.get(&client).unwrap();
//! assert!(Rc::ptr_eq(&first, &second));
//! assert_eq!(first.config.url, "https://example.test");
//!
//! // A child sees the parent's bindings until it declares its own.
//! let child = root.create_child([]).unwrap();
//! assert!(Rc::ptr_eq(&child.get(&client).unwrap(), &first));
//! ```
//!
//! The engine is single-threaded (`Rc` + `RefCell`). Use one injector per
//! thread, or synchronize externally.

pub mod accessor;
pub mod annotations;
pub mod binding;
pub mod declaration;
pub mod error;
pub mod identifier;
pub mod injector;
pub mod instance;
pub mod registry;
pub mod snapshot;

mod resolver;

pub use accessor::Accessor;
pub use annotations::{
    AnnotationReader, AnnotationTable, ClassRef, ConstructorPlan, Injectable, InjectableReader,
    ParamAnnotation,
};
pub use binding::BindingKind;
pub use declaration::Declaration;
pub use error::{DiError, DiResult};
pub use identifier::{AnyIdentifier, Identifier, IdentifierCatalog, Key};
pub use injector::{Injector, InjectorBuilder};
pub use instance::{Arguments, Instance};
pub use registry::EntryState;
pub use snapshot::{BindingSnapshot, InjectorSnapshot};

pub use arbor_config::{
    ConfigLoader, DiagnosticsConfig, InjectorConfig, ManualArgumentPolicy, ResolutionConfig,
};
