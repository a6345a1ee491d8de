//! Identifiers: the registry keys
//!
//! An [`Identifier<T>`] names an abstract dependency whose resolved value is an
//! `Rc<T>`. Identity is carried by its [`Key`], never by its display name:
//! every call to [`Identifier::new`] draws a fresh key, so two identifiers that
//! happen to share a name are still different registry keys. Clones share the
//! key.
//!
//! Identifiers are `Send + Sync` and cheap to clone, so they can live in
//! statics:
//!
//! ```rust
//! use arbor_di::Identifier;
//! use once_cell::sync::Lazy;
//!
//! trait Clock {
//!     fn now(&self) -> u64;
//! }
//!
//! static CLOCK: Lazy<Identifier<dyn Clock>> = Lazy::new(|| Identifier::new("clock"));
//! assert_eq!(CLOCK.name(), "clock");
//! ```

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::annotations::{ClassRef, Injectable};
use crate::error::{DiError, DiResult};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Registry key behind an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A token created by [`Identifier::new`]
    Token(u64),
    /// A concrete type acting as its own identifier
    Type(TypeId),
}

/// Typed identifier for a dependency resolving to `Rc<T>`
pub struct Identifier<T: ?Sized> {
    key: Key,
    name: Arc<str>,
    class: Option<fn() -> ClassRef>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ?Sized + 'static> Identifier<T> {
    /// Create a fresh identifier with a display name
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            key: Key::Token(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            class: None,
            _marker: PhantomData,
        }
    }

    /// Registry key
    pub fn key(&self) -> Key {
        self.key
    }

    /// Display name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type-erased form, as used in dependency lists
    pub fn erase(&self) -> AnyIdentifier {
        AnyIdentifier {
            key: self.key,
            name: Arc::clone(&self.name),
        }
    }

    /// Class descriptor when this identifier is a concrete type
    pub(crate) fn class(&self) -> Option<ClassRef> {
        self.class.map(|describe| describe())
    }
}

impl<C: Injectable> Identifier<C> {
    /// The identifier of the concrete type `C` itself
    ///
    /// Every call returns the same key, so the type can be declared with the
    /// bare shorthand and requested from anywhere.
    pub fn of_type() -> Self {
        Self {
            key: Key::Type(TypeId::of::<C>()),
            name: Arc::from(short_type_name(std::any::type_name::<C>())),
            class: Some(ClassRef::of::<C>),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Clone for Identifier<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            name: Arc::clone(&self.name),
            class: self.class,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> PartialEq for Identifier<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T: ?Sized> Eq for Identifier<T> {}

impl<T: ?Sized> Hash for Identifier<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T: ?Sized> fmt::Debug for Identifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identifier")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish()
    }
}

impl<T: ?Sized> fmt::Display for Identifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Identifier with its type erased
#[derive(Clone)]
pub struct AnyIdentifier {
    key: Key,
    name: Arc<str>,
}

impl AnyIdentifier {
    pub fn key(&self) -> Key {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: ?Sized + 'static> From<&Identifier<T>> for AnyIdentifier {
    fn from(identifier: &Identifier<T>) -> Self {
        identifier.erase()
    }
}

impl PartialEq for AnyIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for AnyIdentifier {}

impl Hash for AnyIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for AnyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for AnyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Build a dependency list from typed identifiers
///
/// ```rust
/// use arbor_di::{deps, Identifier};
///
/// let a: Identifier<u32> = Identifier::new("a");
/// let b: Identifier<String> = Identifier::new("b");
/// let list = deps![a, b];
/// assert_eq!(list[1].name(), "b");
/// ```
#[macro_export]
macro_rules! deps {
    ($($identifier:expr),* $(,)?) => {
        ::std::vec![$(($identifier).erase()),*]
    };
}

/// Bookkeeping of identifier names issued through one catalog
///
/// Plain [`Identifier::new`] never touches shared state. A catalog is for
/// embeddings that want name uniqueness enforced; test harnesses call
/// [`IdentifierCatalog::reset`] between cases.
#[derive(Debug, Default)]
pub struct IdentifierCatalog {
    names: RefCell<HashSet<String>>,
}

impl IdentifierCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new identifier, rejecting names this catalog already issued
    pub fn create<T: ?Sized + 'static>(&self, name: &str) -> DiResult<Identifier<T>> {
        let mut names = self.names.borrow_mut();
        if !names.insert(name.to_string()) {
            return Err(DiError::DuplicateIdentifier {
                name: name.to_string(),
            });
        }
        Ok(Identifier::new(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.borrow().contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.borrow().is_empty()
    }

    /// Forget every issued name
    pub fn reset(&self) {
        self.names.borrow_mut().clear();
    }
}

/// `my_crate::module::Type` -> `Type`; generic names are kept whole
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    if full.contains('<') {
        return full;
    }
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_distinct_keys() {
        let first: Identifier<u32> = Identifier::new("port");
        let second: Identifier<u32> = Identifier::new("port");

        assert_eq!(first.name(), second.name());
        assert_ne!(first, second);
        assert_eq!(first, first.clone());
        assert_eq!(first.erase(), AnyIdentifier::from(&first));
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("arbor_di::tests::Service"), "Service");
        assert_eq!(short_type_name("u32"), "u32");
        assert_eq!(
            short_type_name("alloc::vec::Vec<u8>"),
            "alloc::vec::Vec<u8>"
        );
    }

    #[test]
    fn test_catalog_rejects_duplicates_until_reset() {
        let catalog = IdentifierCatalog::new();
        let _first: Identifier<u32> = catalog.create("port").unwrap();

        let second = catalog.create::<u32>("port");
        assert!(matches!(second, Err(DiError::DuplicateIdentifier { .. })));
        assert!(catalog.contains("port"));
        assert_eq!(catalog.len(), 1);

        catalog.reset();
        assert!(catalog.is_empty());
        assert!(catalog.create::<u32>("port").is_ok());
    }
}
