//! Scoped access handed to [`Injector::invoke`](crate::Injector::invoke)

use std::rc::Rc;

use crate::error::DiResult;
use crate::identifier::Identifier;
use crate::injector::Injector;

/// Read-only view of an injector for the duration of one `invoke` call
///
/// The accessor borrows its injector, so it cannot outlive the call it was
/// handed to.
#[derive(Debug, Clone, Copy)]
pub struct Accessor<'a> {
    injector: &'a Injector,
}

impl<'a> Accessor<'a> {
    pub(crate) fn new(injector: &'a Injector) -> Self {
        Self { injector }
    }

    pub fn get<T: ?Sized + 'static>(&self, identifier: &Identifier<T>) -> DiResult<Rc<T>> {
        self.injector.get(identifier)
    }

    pub fn has<T: ?Sized + 'static>(&self, identifier: &Identifier<T>) -> bool {
        self.injector.has(identifier)
    }
}
