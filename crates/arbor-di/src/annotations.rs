//! Constructor annotations
//!
//! Rust has no metadata on constructor parameters, so a class describes its
//! own parameters through [`Injectable`]: how many positional parameters its
//! constructor takes and which identifier each injected parameter wants. An
//! [`AnnotationReader`] is what the resolver consults to read that
//! description; [`AnnotationTable`] lets an embedding supply or override it at
//! runtime.
//!
//! Parameters before the first annotated one are *manual* parameters. They
//! are filled by [`Injector::create_instance`](crate::Injector::create_instance)
//! custom arguments, or with the absent sentinel when the class is resolved
//! through the injector.
//!
//! ```rust
//! use std::rc::Rc;
//! use arbor_di::{Arguments, Declaration, DiResult, Identifier, Injectable, Injector, ParamAnnotation};
//!
//! struct Database;
//!
//! impl Injectable for Database {
//!     const ARITY: usize = 0;
//!
//!     fn construct(_: &Arguments) -> DiResult<Self> {
//!         Ok(Database)
//!     }
//! }
//!
//! struct Repository {
//!     db: Rc<Database>,
//! }
//!
//! impl Injectable for Repository {
//!     const ARITY: usize = 1;
//!
//!     fn annotations() -> Vec<ParamAnnotation> {
//!         vec![ParamAnnotation::inject(0, &Identifier::<Database>::of_type())]
//!     }
//!
//!     fn construct(args: &Arguments) -> DiResult<Self> {
//!         Ok(Repository { db: args.get(0)? })
//!     }
//! }
//!
//! let injector = Injector::with_bindings([
//!     Declaration::bare(&Identifier::<Database>::of_type()),
//!     Declaration::bare(&Identifier::<Repository>::of_type()),
//! ])
//! .unwrap();
//!
//! let repo = injector.get(&Identifier::<Repository>::of_type()).unwrap();
//! let db = injector.get(&Identifier::<Database>::of_type()).unwrap();
//! assert!(Rc::ptr_eq(&repo.db, &db));
//! ```

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{DiError, DiResult};
use crate::identifier::{short_type_name, AnyIdentifier, Identifier};
use crate::instance::{Arguments, Instance};

/// A type the injector can construct
pub trait Injectable: Sized + 'static {
    /// Number of positional constructor parameters
    const ARITY: usize;

    /// Which identifier each injected parameter wants
    fn annotations() -> Vec<ParamAnnotation> {
        Vec::new()
    }

    /// Build the value from positional arguments
    fn construct(args: &Arguments) -> DiResult<Self>;
}

/// Declares that parameter `index` receives the value of `dependency`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamAnnotation {
    pub index: usize,
    pub dependency: AnyIdentifier,
}

impl ParamAnnotation {
    pub fn inject<T: ?Sized + 'static>(index: usize, dependency: &Identifier<T>) -> Self {
        Self {
            index,
            dependency: dependency.erase(),
        }
    }
}

type Constructor = Rc<dyn Fn(&Arguments) -> DiResult<Instance>>;

/// Type-erased description of an [`Injectable`] class
#[derive(Clone)]
pub struct ClassRef {
    type_id: TypeId,
    name: &'static str,
    arity: usize,
    annotations: fn() -> Vec<ParamAnnotation>,
    construct: Constructor,
}

impl ClassRef {
    /// Describe `C`, producing `Rc<C>` values
    pub fn of<C: Injectable>() -> Self {
        Self::describe::<C>(Rc::new(|args: &Arguments| {
            C::construct(args).map(|value| Instance::new(Rc::new(value)))
        }))
    }

    /// Describe `C`, producing values viewed as `Rc<T>` (typically `dyn Trait`)
    pub fn of_as<C: Injectable, T: ?Sized + 'static>(upcast: fn(Rc<C>) -> Rc<T>) -> Self {
        Self::describe::<C>(Rc::new(move |args: &Arguments| {
            C::construct(args).map(|value| Instance::new(upcast(Rc::new(value))))
        }))
    }

    fn describe<C: Injectable>(construct: Constructor) -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: short_type_name(std::any::type_name::<C>()),
            arity: C::ARITY,
            annotations: C::annotations,
            construct,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The annotations the class declares for itself
    pub fn declared_annotations(&self) -> Vec<ParamAnnotation> {
        (self.annotations)()
    }

    pub(crate) fn construct(&self, args: &Arguments) -> DiResult<Instance> {
        (self.construct)(args)
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRef")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Source of parameter annotations for classes
pub trait AnnotationReader {
    /// Annotations for `class`, in any order
    fn read(&self, class: &ClassRef) -> Vec<ParamAnnotation>;
}

/// Reads the annotations each class declares through [`Injectable::annotations`]
#[derive(Debug, Default, Clone, Copy)]
pub struct InjectableReader;

impl AnnotationReader for InjectableReader {
    fn read(&self, class: &ClassRef) -> Vec<ParamAnnotation> {
        class.declared_annotations()
    }
}

/// Runtime annotation table
///
/// Classes with an entry in the table use the table's annotations instead of
/// their own declarations; other classes fall back to
/// [`Injectable::annotations`].
#[derive(Debug, Default)]
pub struct AnnotationTable {
    entries: RefCell<HashMap<TypeId, Vec<ParamAnnotation>>>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotate parameter `index` of `C` with `dependency`
    pub fn annotate<C: Injectable, T: ?Sized + 'static>(
        &self,
        index: usize,
        dependency: &Identifier<T>,
    ) {
        let mut entries = self.entries.borrow_mut();
        let annotations = entries.entry(TypeId::of::<C>()).or_default();
        annotations.retain(|annotation| annotation.index != index);
        annotations.push(ParamAnnotation::inject(index, dependency));
    }

    /// Drop the table's entry for `C`; returns whether one existed
    pub fn clear_class<C: Injectable>(&self) -> bool {
        self.entries.borrow_mut().remove(&TypeId::of::<C>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Forget every entry. Test harnesses call this between cases.
    pub fn reset(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl AnnotationReader for AnnotationTable {
    fn read(&self, class: &ClassRef) -> Vec<ParamAnnotation> {
        match self.entries.borrow().get(&class.type_id()) {
            Some(annotations) => annotations.clone(),
            None => class.declared_annotations(),
        }
    }
}

/// How a constructor's positional parameters get filled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorPlan {
    /// Leading parameters with no annotation
    pub manual: usize,
    /// Identifiers for the remaining parameters, in parameter order
    pub injected: Vec<AnyIdentifier>,
}

impl ConstructorPlan {
    /// Plan for an explicit dependency list covering every parameter
    pub fn explicit(deps: &[AnyIdentifier]) -> Self {
        Self {
            manual: 0,
            injected: deps.to_vec(),
        }
    }

    /// Derive the plan from a class's annotations
    ///
    /// # Errors
    /// - `InvalidBindingSpec` for duplicate indices or indices past the arity
    /// - `MissingAnnotation` for a gap after the first annotated parameter
    pub fn from_annotations(
        class: &ClassRef,
        mut annotations: Vec<ParamAnnotation>,
    ) -> DiResult<Self> {
        annotations.sort_by_key(|annotation| annotation.index);

        for pair in annotations.windows(2) {
            if pair[0].index == pair[1].index {
                return Err(DiError::InvalidBindingSpec {
                    identifier: class.name().to_string(),
                    reason: format!("parameter {} is annotated twice", pair[0].index),
                });
            }
        }

        if let Some(last) = annotations.last() {
            if last.index >= class.arity() {
                return Err(DiError::InvalidBindingSpec {
                    identifier: class.name().to_string(),
                    reason: format!(
                        "parameter {} is annotated but the constructor takes {}",
                        last.index,
                        class.arity()
                    ),
                });
            }
        }

        let manual = annotations
            .first()
            .map(|annotation| annotation.index)
            .unwrap_or(class.arity());

        for (offset, annotation) in annotations.iter().enumerate() {
            let expected = manual + offset;
            if annotation.index != expected {
                return Err(DiError::MissingAnnotation {
                    class: class.name().to_string(),
                    index: expected,
                });
            }
        }

        let covered = manual + annotations.len();
        if covered < class.arity() {
            return Err(DiError::MissingAnnotation {
                class: class.name().to_string(),
                index: covered,
            });
        }

        Ok(Self {
            manual,
            injected: annotations
                .into_iter()
                .map(|annotation| annotation.dependency)
                .collect(),
        })
    }
}
