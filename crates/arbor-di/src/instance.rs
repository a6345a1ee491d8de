//! Type-erased values and positional arguments

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::error::{DiError, DiResult};

/// A resolved value with its type erased
///
/// Internally an `Rc<Rc<T>>` viewed as `Rc<dyn Any>`; wrapping the `Rc<T>`
/// keeps unsized targets such as `dyn Trait` resolvable. Cloning shares the
/// underlying object.
#[derive(Clone)]
pub struct Instance(Rc<dyn Any>);

impl Instance {
    pub fn new<T: ?Sized + 'static>(value: Rc<T>) -> Self {
        Self(Rc::new(value))
    }

    /// Recover the typed handle, or `None` when `T` is not the stored type
    pub fn downcast<T: ?Sized + 'static>(&self) -> Option<Rc<T>> {
        self.0.downcast_ref::<Rc<T>>().cloned()
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.0.is::<Rc<T>>()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Instance(..)")
    }
}

/// Positional arguments handed to constructors and factories
///
/// A slot holds `None` (the absent sentinel) when a manual parameter was not
/// supplied.
#[derive(Debug, Clone)]
pub struct Arguments {
    owner: String,
    slots: Vec<Option<Instance>>,
}

impl Arguments {
    pub(crate) fn new(owner: impl Into<String>, slots: Vec<Option<Instance>>) -> Self {
        Self {
            owner: owner.into(),
            slots,
        }
    }

    /// Name of the identifier or class being constructed
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether slot `index` holds the absent sentinel or does not exist
    pub fn is_absent(&self, index: usize) -> bool {
        !matches!(self.slots.get(index), Some(Some(_)))
    }

    /// Typed value at `index`
    ///
    /// # Errors
    /// - `ArgumentUnavailable` if the slot is absent or out of range
    /// - `TypeMismatch` if the slot holds another type
    pub fn get<T: ?Sized + 'static>(&self, index: usize) -> DiResult<Rc<T>> {
        self.optional(index)?
            .ok_or_else(|| DiError::ArgumentUnavailable {
                owner: self.owner.clone(),
                index,
            })
    }

    /// Typed value at `index`, `None` for the absent sentinel
    pub fn optional<T: ?Sized + 'static>(&self, index: usize) -> DiResult<Option<Rc<T>>> {
        match self.slots.get(index) {
            Some(Some(instance)) => instance
                .downcast::<T>()
                .map(Some)
                .ok_or_else(|| DiError::TypeMismatch {
                    identifier: format!("{}[{}]", self.owner, index),
                    expected: std::any::type_name::<T>(),
                }),
            _ => Ok(None),
        }
    }

    /// Raw slot access
    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.slots.get(index).and_then(Option::as_ref)
    }
}
