//! Serializable view of an injector's registry

use serde::Serialize;

use crate::binding::BindingKind;
use crate::injector::Injector;
use crate::registry::EntryState;

/// One registry entry as seen by diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingSnapshot {
    pub identifier: String,
    pub kind: BindingKind,
    pub state: EntryState,
}

/// Point-in-time view of one injector, bindings in registration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectorSnapshot {
    pub id: u64,
    pub depth: usize,
    pub children: usize,
    pub bindings: Vec<BindingSnapshot>,
}

impl InjectorSnapshot {
    pub(crate) fn capture(injector: &Injector) -> Self {
        let registry = injector.registry().borrow();
        let bindings = registry
            .ordered()
            .into_iter()
            .map(|entry| BindingSnapshot {
                identifier: entry.identifier.name().to_string(),
                kind: entry.binding.kind(),
                state: entry.state.public(),
            })
            .collect();

        Self {
            id: injector.id(),
            depth: injector.depth(),
            children: injector.child_count(),
            bindings,
        }
    }

    /// Bindings currently holding a cached value
    pub fn resolved(&self) -> impl Iterator<Item = &BindingSnapshot> {
        self.bindings
            .iter()
            .filter(|binding| binding.state == EntryState::Resolved)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
