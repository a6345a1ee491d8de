//! Per-injector binding table
//!
//! Maps identifier keys to their binding and resolution state. The cached
//! value lives inside [`ResolutionState::Resolved`], so an entry has a value
//! exactly when it is resolved.

use std::collections::HashMap;
use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use crate::binding::Binding;
use crate::error::{DiError, DiResult};
use crate::identifier::{AnyIdentifier, Key};
use crate::instance::Instance;

/// Lifecycle of one registry entry
#[derive(Debug, Clone)]
pub(crate) enum ResolutionState {
    Unresolved,
    Resolving,
    /// An async loader for the entry is in flight
    Loading,
    Resolved(Instance),
}

impl ResolutionState {
    pub(crate) fn public(&self) -> EntryState {
        match self {
            Self::Unresolved => EntryState::Unresolved,
            Self::Resolving | Self::Loading => EntryState::Resolving,
            Self::Resolved(_) => EntryState::Resolved,
        }
    }
}

/// Resolution state of an entry, as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Unresolved,
    Resolving,
    Resolved,
}

#[derive(Debug)]
pub(crate) struct Entry {
    pub identifier: AnyIdentifier,
    pub binding: Rc<Binding>,
    pub state: ResolutionState,
    seq: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: HashMap<Key, Entry>,
    next_seq: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, identifier: AnyIdentifier, binding: Binding) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            identifier.key(),
            Entry {
                identifier,
                binding: Rc::new(binding),
                state: ResolutionState::Unresolved,
                seq,
            },
        );
    }

    /// Add a binding for an identifier this registry does not know yet
    ///
    /// # Errors
    /// Returns `DuplicateBinding` if the identifier already has an entry.
    pub fn register(&mut self, identifier: AnyIdentifier, binding: Binding) -> DiResult<()> {
        if self.entries.contains_key(&identifier.key()) {
            return Err(DiError::DuplicateBinding {
                identifier: identifier.name().to_string(),
            });
        }

        debug!(identifier = %identifier, kind = %binding.kind(), "Registered binding");
        self.insert(identifier, binding);
        Ok(())
    }

    /// Swap the binding of an unresolved entry, or register a new one
    pub fn replace(&mut self, identifier: AnyIdentifier, binding: Binding) -> DiResult<()> {
        match self.entries.get_mut(&identifier.key()) {
            None => {
                debug!(identifier = %identifier, kind = %binding.kind(), "Replacement registered a new binding");
                self.insert(identifier, binding);
                Ok(())
            }
            Some(entry) => {
                ensure_mutable(entry, "replace")?;
                debug!(identifier = %identifier, kind = %binding.kind(), "Replaced binding");
                entry.binding = Rc::new(binding);
                Ok(())
            }
        }
    }

    /// Drop an unresolved entry
    ///
    /// # Errors
    /// - `UnregisteredIdentifier` if there is no entry
    /// - `AlreadyResolved` or `ResolutionInProgress` for entries past `Unresolved`
    pub fn remove(&mut self, identifier: &AnyIdentifier) -> DiResult<()> {
        if self.try_remove(identifier)? {
            Ok(())
        } else {
            Err(DiError::UnregisteredIdentifier {
                identifier: identifier.name().to_string(),
                requested_by: None,
            })
        }
    }

    /// Like [`Registry::remove`], but an absent entry is `Ok(false)`
    pub fn try_remove(&mut self, identifier: &AnyIdentifier) -> DiResult<bool> {
        let Some(entry) = self.entries.get(&identifier.key()) else {
            return Ok(false);
        };
        ensure_mutable(entry, "delete")?;

        self.entries.remove(&identifier.key());
        debug!(identifier = %identifier, "Removed binding");
        Ok(true)
    }

    pub fn lookup(&self, key: Key) -> Option<&Entry> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: Key) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn state_of(&self, key: Key) -> Option<EntryState> {
        self.entries.get(&key).map(|entry| entry.state.public())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in registration order
    pub fn ordered(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
    }

    pub fn mark_resolving(&mut self, key: Key) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.state = ResolutionState::Resolving;
        }
    }

    pub fn mark_loading(&mut self, key: Key) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.state = ResolutionState::Loading;
        }
    }

    pub fn finish(&mut self, key: Key, instance: Instance) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.state = ResolutionState::Resolved(instance);
        }
    }

    pub fn rollback(&mut self, key: Key) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.state = ResolutionState::Unresolved;
        }
    }
}

fn ensure_mutable(entry: &Entry, operation: &'static str) -> DiResult<()> {
    match entry.state {
        ResolutionState::Unresolved => Ok(()),
        ResolutionState::Resolving | ResolutionState::Loading => Err(DiError::ResolutionInProgress {
            identifier: entry.identifier.name().to_string(),
        }),
        ResolutionState::Resolved(_) => Err(DiError::AlreadyResolved {
            identifier: entry.identifier.name().to_string(),
            operation,
        }),
    }
}
