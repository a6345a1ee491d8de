//! Binding declarations
//!
//! A [`Declaration`] is what callers hand to [`Injector::add`](crate::Injector::add)
//! and friends. It pairs an identifier with one recipe shape and is normalized
//! into a [`Binding`] when it reaches a registry.

use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;

use crate::annotations::{ClassRef, Injectable};
use crate::binding::{AsyncLoader, Binding, FactoryFn};
use crate::error::{DiError, DiResult};
use crate::identifier::{AnyIdentifier, Identifier};
use crate::instance::{Arguments, Instance};

enum Shape {
    /// The identifier is its own class, when it carries one
    Bare(Option<ClassRef>),
    Value(Instance),
    Class(ClassRef),
    Factory(FactoryFn),
    Existing(AnyIdentifier),
    Async(AsyncLoader),
}

/// One binding declaration
pub struct Declaration {
    identifier: AnyIdentifier,
    shape: Shape,
    deps: Option<Vec<AnyIdentifier>>,
}

impl Declaration {
    fn with_shape(identifier: AnyIdentifier, shape: Shape) -> Self {
        Self {
            identifier,
            shape,
            deps: None,
        }
    }

    /// The identifier names its own class (`Identifier::of_type`)
    pub fn bare<T: ?Sized + 'static>(identifier: &Identifier<T>) -> Self {
        Self::with_shape(identifier.erase(), Shape::Bare(identifier.class()))
    }

    /// An already-built value, shared by reference
    pub fn value<T: ?Sized + 'static>(identifier: &Identifier<T>, value: Rc<T>) -> Self {
        Self::with_shape(identifier.erase(), Shape::Value(Instance::new(value)))
    }

    /// Construct `C` for this identifier
    pub fn class<C: Injectable>(identifier: &Identifier<C>) -> Self {
        Self::with_shape(identifier.erase(), Shape::Class(ClassRef::of::<C>()))
    }

    /// Construct `C` and expose it as `T`, usually a trait object
    ///
    /// ```rust
    /// use std::rc::Rc;
    /// use arbor_di::{Arguments, Declaration, DiResult, Identifier, Injectable, Injector};
    ///
    /// trait Greeter {
    ///     fn greet(&self) -> String;
    /// }
    ///
    /// struct English;
    ///
    /// impl Greeter for English {
    ///     fn greet(&self) -> String {
    ///         "hello".to_string()
    ///     }
    /// }
    ///
    /// impl Injectable for English {
    ///     const ARITY: usize = 0;
    ///
    ///     fn construct(_: &Arguments) -> DiResult<Self> {
    ///         Ok(English)
    ///     }
    /// }
    ///
    /// let greeter: Identifier<dyn Greeter> = Identifier::new("greeter");
    /// let injector = Injector::with_bindings([Declaration::class_as::<English, _>(
    ///     &greeter,
    ///     |english| english as Rc<dyn Greeter>,
    /// )])
    /// .unwrap();
    ///
    /// assert_eq!(injector.get(&greeter).unwrap().greet(), "hello");
    /// ```
    pub fn class_as<C: Injectable, T: ?Sized + 'static>(
        identifier: &Identifier<T>,
        upcast: fn(Rc<C>) -> Rc<T>,
    ) -> Self {
        Self::with_shape(identifier.erase(), Shape::Class(ClassRef::of_as::<C, T>(upcast)))
    }

    /// Call `factory` with the resolved dependencies, in declaration order
    pub fn factory<T, F>(identifier: &Identifier<T>, factory: F) -> Self
    where
        T: ?Sized + 'static,
        F: Fn(&Arguments) -> DiResult<Rc<T>> + 'static,
    {
        let factory: FactoryFn = Rc::new(move |args: &Arguments| factory(args).map(Instance::new));
        Self::with_shape(identifier.erase(), Shape::Factory(factory))
    }

    /// Resolve `target` whenever `identifier` is requested
    pub fn existing<T: ?Sized + 'static>(identifier: &Identifier<T>, target: &Identifier<T>) -> Self {
        Self::with_shape(identifier.erase(), Shape::Existing(target.erase()))
    }

    /// Produce the value with an async loader; see [`Injector::get_async`](crate::Injector::get_async)
    pub fn async_factory<T, F, Fut>(identifier: &Identifier<T>, loader: F) -> Self
    where
        T: ?Sized + 'static,
        F: Fn(Arguments) -> Fut + 'static,
        Fut: Future<Output = DiResult<Rc<T>>> + 'static,
    {
        let loader: AsyncLoader = Rc::new(move |args: Arguments| {
            let pending = loader(args);
            async move { pending.await.map(Instance::new) }.boxed_local()
        });
        Self::with_shape(identifier.erase(), Shape::Async(loader))
    }

    /// Explicit dependency list
    pub fn with_deps(mut self, deps: Vec<AnyIdentifier>) -> Self {
        self.deps = Some(deps);
        self
    }

    pub fn identifier(&self) -> &AnyIdentifier {
        &self.identifier
    }

    fn invalid(&self, reason: impl Into<String>) -> DiError {
        DiError::InvalidBindingSpec {
            identifier: self.identifier.name().to_string(),
            reason: reason.into(),
        }
    }

    /// Validate the declaration and turn it into a binding
    pub(crate) fn normalize(self) -> DiResult<(AnyIdentifier, Binding)> {
        let binding = match &self.shape {
            Shape::Bare(None) => {
                return Err(self.invalid(
                    "a token identifier needs a value, class, factory or alias",
                ))
            }
            Shape::Bare(Some(class)) | Shape::Class(class) => {
                if let Some(deps) = &self.deps {
                    if deps.len() != class.arity() {
                        return Err(self.invalid(format!(
                            "{} dependencies given but {} takes {}",
                            deps.len(),
                            class.name(),
                            class.arity()
                        )));
                    }
                }
                Binding::Class {
                    class: class.clone(),
                    deps: self.deps.clone(),
                }
            }
            Shape::Value(instance) => {
                if self.deps.is_some() {
                    return Err(self.invalid("a value takes no dependencies"));
                }
                Binding::Value(instance.clone())
            }
            Shape::Existing(target) => {
                if self.deps.is_some() {
                    return Err(self.invalid("an alias takes no dependencies"));
                }
                if *target == self.identifier {
                    return Err(self.invalid("an alias cannot point at itself"));
                }
                Binding::Alias(target.clone())
            }
            Shape::Factory(factory) => Binding::Factory {
                factory: Rc::clone(factory),
                deps: self.deps.clone().unwrap_or_default(),
            },
            Shape::Async(loader) => Binding::Async {
                loader: Rc::clone(loader),
                deps: self.deps.clone().unwrap_or_default(),
            },
        };
        Ok((self.identifier, binding))
    }
}

impl<T: ?Sized + 'static> From<&Identifier<T>> for Declaration {
    fn from(identifier: &Identifier<T>) -> Self {
        Self::bare(identifier)
    }
}

impl<T: ?Sized + 'static> From<(&Identifier<T>, Rc<T>)> for Declaration {
    fn from((identifier, value): (&Identifier<T>, Rc<T>)) -> Self {
        Self::value(identifier, value)
    }
}

impl<T: ?Sized + 'static> From<Identifier<T>> for Declaration {
    fn from(identifier: Identifier<T>) -> Self {
        Self::bare(&identifier)
    }
}
