//! The injector: a registry, a parent link and shared settings

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use arbor_config::InjectorConfig;

use crate::accessor::Accessor;
use crate::annotations::{AnnotationReader, ClassRef, ConstructorPlan, Injectable, InjectableReader};
use crate::declaration::Declaration;
use crate::error::{DiError, DiResult};
use crate::identifier::{Identifier, Key};
use crate::instance::Instance;
use crate::registry::{EntryState, Registry};
use crate::resolver::{self, ResolutionStack};
use crate::snapshot::InjectorSnapshot;

static NEXT_INJECTOR: AtomicU64 = AtomicU64::new(1);

/// Configuration and annotation reader, shared by an injector and its children
struct Settings {
    config: InjectorConfig,
    reader: Rc<dyn AnnotationReader>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config: InjectorConfig::default(),
            reader: Rc::new(InjectableReader),
        }
    }
}

struct InjectorInner {
    id: u64,
    registry: RefCell<Registry>,
    parent: Option<Injector>,
    children: RefCell<Vec<Weak<InjectorInner>>>,
    settings: Rc<Settings>,
}

/// Dependency injection container
///
/// Cloning an `Injector` yields another handle to the same container. A
/// child keeps its parent alive; a parent only tracks its children weakly.
/// Dropping the last handle releases every cached value it owns.
///
/// ```rust
/// use std::rc::Rc;
/// use arbor_di::{Declaration, Identifier, Injector};
///
/// let port: Identifier<u16> = Identifier::new("port");
/// let url: Identifier<String> = Identifier::new("url");
///
/// let injector = Injector::with_bindings([
///     Declaration::value(&port, Rc::new(8080)),
///     Declaration::factory(&url, |args| {
///         let port = args.get::<u16>(0)?;
///         Ok(Rc::new(format!("http://localhost:{port}")))
///     })
///     .with_deps(arbor_di::deps![port]),
/// ])
/// .unwrap();
///
/// assert_eq!(*injector.get(&url).unwrap(), "http://localhost:8080");
/// ```
#[derive(Clone)]
pub struct Injector {
    inner: Rc<InjectorInner>,
}

impl Injector {
    /// Empty root injector with default configuration
    pub fn new() -> Self {
        Self::from_parts(None, Rc::new(Settings::default()))
    }

    /// Root injector holding `declarations`
    pub fn with_bindings(declarations: impl IntoIterator<Item = Declaration>) -> DiResult<Self> {
        InjectorBuilder::new().bind_all(declarations).build()
    }

    /// Start configuring a root injector
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    fn from_parts(parent: Option<Injector>, settings: Rc<Settings>) -> Self {
        Self {
            inner: Rc::new(InjectorInner {
                id: NEXT_INJECTOR.fetch_add(1, Ordering::Relaxed),
                registry: RefCell::new(Registry::new()),
                parent,
                children: RefCell::new(Vec::new()),
                settings,
            }),
        }
    }

    /// Resolve `identifier`, building and caching it on first use
    ///
    /// # Errors
    /// Any resolution failure: unregistered identifiers, cycles, constructor
    /// failures, or an async binding that was never resolved with
    /// [`Injector::get_async`].
    pub fn get<T: ?Sized + 'static>(&self, identifier: &Identifier<T>) -> DiResult<Rc<T>> {
        let mut stack = ResolutionStack::new(self.config().resolution.max_depth);
        let instance = resolver::resolve(self, &identifier.erase(), &mut stack)?;
        downcast(identifier, instance)
    }

    /// Resolve `identifier`, awaiting its async loader if it has one
    ///
    /// Dependencies of the async binding itself resolve synchronously. For
    /// other bindings this behaves like [`Injector::get`]. Dropping the future
    /// before the loader finishes leaves the entry unresolved.
    ///
    /// # Errors
    /// `ResolutionInProgress` while another call is awaiting the same loader.
    pub async fn get_async<T: ?Sized + 'static>(
        &self,
        identifier: &Identifier<T>,
    ) -> DiResult<Rc<T>> {
        let erased = identifier.erase();
        let instance = resolver::resolve_async(self, &erased).await?;
        downcast(identifier, instance)
    }

    /// Whether this injector or an ancestor binds `identifier`
    pub fn has<T: ?Sized + 'static>(&self, identifier: &Identifier<T>) -> bool {
        self.has_key(identifier.key())
    }

    pub(crate) fn has_key(&self, key: Key) -> bool {
        self.inner.registry.borrow().contains(key)
            || self.parent().is_some_and(|parent| parent.has_key(key))
    }

    /// Register a binding in this injector
    ///
    /// # Errors
    /// `DuplicateBinding` when this injector already binds the identifier,
    /// `InvalidBindingSpec` when the declaration is malformed.
    pub fn add(&self, declaration: impl Into<Declaration>) -> DiResult<()> {
        let (identifier, binding) = declaration.into().normalize()?;

        if self.config().diagnostics.log_shadowing
            && self
                .parent()
                .is_some_and(|parent| parent.has_key(identifier.key()))
        {
            debug!(injector = self.id(), identifier = %identifier, "Binding shadows an ancestor binding");
        }

        self.inner.registry.borrow_mut().register(identifier, binding)
    }

    /// Swap the binding of an identifier that has not been resolved yet
    ///
    /// Replacing an identifier this injector does not bind registers it.
    pub fn replace(&self, declaration: impl Into<Declaration>) -> DiResult<()> {
        let (identifier, binding) = declaration.into().normalize()?;
        self.inner.registry.borrow_mut().replace(identifier, binding)
    }

    /// Remove an unresolved binding from this injector
    pub fn delete<T: ?Sized + 'static>(&self, identifier: &Identifier<T>) -> DiResult<()> {
        self.inner.registry.borrow_mut().remove(&identifier.erase())
    }

    /// Like [`Injector::delete`], but an absent binding is `Ok(false)`
    pub fn delete_if_present<T: ?Sized + 'static>(
        &self,
        identifier: &Identifier<T>,
    ) -> DiResult<bool> {
        self.inner.registry.borrow_mut().try_remove(&identifier.erase())
    }

    /// New injector whose lookups fall back to this one
    ///
    /// The child inherits configuration and annotation reader. Its own
    /// bindings shadow the ones it would otherwise inherit.
    pub fn create_child(
        &self,
        declarations: impl IntoIterator<Item = Declaration>,
    ) -> DiResult<Injector> {
        let child = Self::from_parts(Some(self.clone()), Rc::clone(&self.inner.settings));
        for declaration in declarations {
            child.add(declaration)?;
        }

        let mut children = self.inner.children.borrow_mut();
        children.retain(|weak| weak.strong_count() > 0);
        children.push(Rc::downgrade(&child.inner));

        debug!(parent = self.id(), child = child.id(), bindings = child.len(), "Created child injector");
        Ok(child)
    }

    /// Run `f` with an accessor bound to this injector
    pub fn invoke<R>(&self, f: impl FnOnce(&Accessor<'_>) -> R) -> R {
        f(&Accessor::new(self))
    }

    /// Build `C` outside the registry
    ///
    /// `custom_args` fill the constructor's leading unannotated parameters;
    /// annotated parameters are resolved through this injector. Missing
    /// arguments are passed as absent and extra ones are dropped, each with a
    /// warning.
    pub fn create_instance<C: Injectable>(&self, custom_args: Vec<Instance>) -> DiResult<C> {
        resolver::create_instance::<C>(self, custom_args)
    }

    /// Resolution state of `identifier` in this injector's own registry
    pub fn state<T: ?Sized + 'static>(&self, identifier: &Identifier<T>) -> Option<EntryState> {
        self.inner.registry.borrow().state_of(identifier.key())
    }

    pub fn parent(&self) -> Option<&Injector> {
        self.inner.parent.as_ref()
    }

    /// Number of ancestors
    pub fn depth(&self) -> usize {
        self.parent().map_or(0, |parent| parent.depth() + 1)
    }

    /// Children created by this injector that are still alive
    pub fn child_count(&self) -> usize {
        self.inner
            .children
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Number of bindings in this injector's own registry
    pub fn len(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.borrow().is_empty()
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.inner.settings.config
    }

    pub fn snapshot(&self) -> InjectorSnapshot {
        InjectorSnapshot::capture(self)
    }

    pub(crate) fn registry(&self) -> &RefCell<Registry> {
        &self.inner.registry
    }

    pub(crate) fn plan_for(&self, class: &ClassRef) -> DiResult<ConstructorPlan> {
        let annotations = self.inner.settings.reader.read(class);
        ConstructorPlan::from_annotations(class, annotations)
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("id", &self.id())
            .field("depth", &self.depth())
            .field("bindings", &self.len())
            .finish()
    }
}

fn downcast<T: ?Sized + 'static>(identifier: &Identifier<T>, instance: Instance) -> DiResult<Rc<T>> {
    instance.downcast::<T>().ok_or_else(|| DiError::TypeMismatch {
        identifier: identifier.name().to_string(),
        expected: std::any::type_name::<T>(),
    })
}

/// Builder for root injectors
///
/// ```rust
/// use std::rc::Rc;
/// use arbor_di::{ConfigLoader, Identifier, InjectorBuilder};
///
/// let config = ConfigLoader::new()
///     .with_toml("[resolution]\nmax_depth = 16")
///     .load()
///     .unwrap();
///
/// let name: Identifier<str> = Identifier::new("name");
/// let injector = InjectorBuilder::new()
///     .config(config)
///     .bind((&name, Rc::<str>::from("arbor")))
///     .build()
///     .unwrap();
///
/// assert_eq!(injector.config().resolution.max_depth, 16);
/// assert_eq!(&*injector.get(&name).unwrap(), "arbor");
/// ```
pub struct InjectorBuilder {
    config: InjectorConfig,
    reader: Rc<dyn AnnotationReader>,
    declarations: Vec<Declaration>,
}

impl InjectorBuilder {
    pub fn new() -> Self {
        Self {
            config: InjectorConfig::default(),
            reader: Rc::new(InjectableReader),
            declarations: Vec::new(),
        }
    }

    pub fn config(mut self, config: InjectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Source of constructor annotations, inherited by child injectors
    pub fn annotation_reader<R: AnnotationReader + 'static>(mut self, reader: Rc<R>) -> Self {
        self.reader = reader;
        self
    }

    pub fn bind(mut self, declaration: impl Into<Declaration>) -> Self {
        self.declarations.push(declaration.into());
        self
    }

    pub fn bind_all(mut self, declarations: impl IntoIterator<Item = Declaration>) -> Self {
        self.declarations.extend(declarations);
        self
    }

    /// Validate the configuration and register every declaration
    pub fn build(self) -> DiResult<Injector> {
        self.config.validate()?;

        let injector = Injector::from_parts(
            None,
            Rc::new(Settings {
                config: self.config,
                reader: self.reader,
            }),
        );
        for declaration in self.declarations {
            injector.add(declaration)?;
        }

        debug!(injector = injector.id(), bindings = injector.len(), "Built injector");
        Ok(injector)
    }
}

impl Default for InjectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
