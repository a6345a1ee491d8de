//! Recursive resolution
//!
//! Resolution walks from the requesting injector up its ancestor chain until
//! it finds the entry, and produces the value in the injector that owns the
//! entry. Every frame on the [`ResolutionStack`] is an entry currently marked
//! `Resolving`; meeting such an entry again is a cycle.
//!
//! No registry borrow is held while constructors, factories or loaders run.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use tracing::{debug, trace, warn};

use arbor_config::ManualArgumentPolicy;

use crate::annotations::{ClassRef, ConstructorPlan, Injectable};
use crate::binding::Binding;
use crate::error::{DiError, DiResult};
use crate::identifier::{AnyIdentifier, Key};
use crate::injector::Injector;
use crate::instance::{Arguments, Instance};
use crate::registry::ResolutionState;

#[derive(Debug, Clone)]
struct Frame {
    injector: u64,
    identifier: AnyIdentifier,
}

/// The identifiers currently being resolved, outermost first
#[derive(Debug, Clone)]
pub(crate) struct ResolutionStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl ResolutionStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    fn names(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|frame| frame.identifier.name().to_string())
            .collect()
    }

    fn push(&mut self, injector: u64, identifier: &AnyIdentifier) -> DiResult<()> {
        if self.frames.len() >= self.max_depth {
            let mut path = self.names();
            path.push(identifier.name().to_string());
            return Err(DiError::ResolutionTooDeep {
                limit: self.max_depth,
                path,
            });
        }

        self.frames.push(Frame {
            injector,
            identifier: identifier.clone(),
        });
        Ok(())
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    /// The identifier whose resolution asked for the next one
    fn requester(&self) -> Option<&AnyIdentifier> {
        self.frames.last().map(|frame| &frame.identifier)
    }

    /// Cycle closed by requesting `identifier` in `injector` again
    ///
    /// A request that re-enters the injector from user code starts a fresh
    /// stack, so the first frame may be missing; the cycle is then just the
    /// identifier twice.
    fn cycle(&self, injector: u64, identifier: &AnyIdentifier) -> Vec<String> {
        let start = self
            .frames
            .iter()
            .position(|frame| frame.injector == injector && frame.identifier == *identifier)
            .unwrap_or(self.frames.len());

        let mut cycle: Vec<String> = self.frames[start..]
            .iter()
            .map(|frame| frame.identifier.name().to_string())
            .collect();
        if cycle.is_empty() {
            cycle.push(identifier.name().to_string());
        }
        cycle.push(identifier.name().to_string());
        cycle
    }
}

enum Lookup {
    Cached(Instance),
    Pending(Rc<Binding>),
    InProgress,
    Loading,
    Missing,
}

fn lookup(injector: &Injector, key: Key) -> Lookup {
    let registry = injector.registry().borrow();
    match registry.lookup(key) {
        None => Lookup::Missing,
        Some(entry) => match &entry.state {
            ResolutionState::Resolved(instance) => Lookup::Cached(instance.clone()),
            ResolutionState::Resolving => Lookup::InProgress,
            ResolutionState::Loading => Lookup::Loading,
            ResolutionState::Unresolved => Lookup::Pending(Rc::clone(&entry.binding)),
        },
    }
}

/// Store the outcome of resolving `identifier` in its owner
fn settle(
    owner: &Injector,
    identifier: &AnyIdentifier,
    outcome: DiResult<Instance>,
) -> DiResult<Instance> {
    let mut registry = owner.registry().borrow_mut();
    match outcome {
        Ok(instance) => {
            registry.finish(identifier.key(), instance.clone());
            debug!(injector = owner.id(), identifier = %identifier, "Resolved");
            Ok(instance)
        }
        Err(err) => {
            registry.rollback(identifier.key());
            trace!(injector = owner.id(), identifier = %identifier, error = %err, "Resolution rolled back");
            Err(err)
        }
    }
}

/// Resolve `identifier` as seen from `injector`
pub(crate) fn resolve(
    injector: &Injector,
    identifier: &AnyIdentifier,
    stack: &mut ResolutionStack,
) -> DiResult<Instance> {
    let binding = match lookup(injector, identifier.key()) {
        Lookup::Cached(instance) => {
            trace!(injector = injector.id(), identifier = %identifier, "Cache hit");
            return Ok(instance);
        }
        Lookup::InProgress => {
            return Err(DiError::CircularDependency {
                cycle: stack.cycle(injector.id(), identifier),
            });
        }
        Lookup::Loading => {
            return Err(DiError::ResolutionInProgress {
                identifier: identifier.name().to_string(),
            });
        }
        Lookup::Missing => {
            return match injector.parent() {
                Some(parent) => {
                    trace!(injector = injector.id(), parent = parent.id(), identifier = %identifier, "Delegating to parent");
                    resolve(parent, identifier, stack)
                }
                None => Err(DiError::UnregisteredIdentifier {
                    identifier: identifier.name().to_string(),
                    requested_by: stack.requester().map(|requester| requester.name().to_string()),
                }),
            };
        }
        Lookup::Pending(binding) => binding,
    };

    stack.push(injector.id(), identifier)?;
    injector.registry().borrow_mut().mark_resolving(identifier.key());

    let outcome = produce(injector, identifier, &binding, stack);
    stack.pop();
    settle(injector, identifier, outcome)
}

fn produce(
    injector: &Injector,
    identifier: &AnyIdentifier,
    binding: &Binding,
    stack: &mut ResolutionStack,
) -> DiResult<Instance> {
    match binding {
        Binding::Value(instance) => Ok(instance.clone()),
        Binding::Alias(target) => {
            trace!(identifier = %identifier, target = %target, "Following alias");
            resolve(injector, target, stack)
        }
        Binding::Class { class, deps } => {
            let plan = match deps {
                Some(deps) => ConstructorPlan::explicit(deps),
                None => injector.plan_for(class)?,
            };
            let mut slots = manual_slots(injector, class, plan.manual)?;
            slots.extend(resolve_all(injector, &plan.injected, stack)?.into_iter().map(Some));

            debug!(identifier = %identifier, class = class.name(), "Constructing");
            class.construct(&Arguments::new(class.name(), slots))
        }
        Binding::Factory { factory, deps } => {
            let values = resolve_all(injector, deps, stack)?;
            debug!(identifier = %identifier, deps = deps.len(), "Calling factory");
            factory(&Arguments::new(
                identifier.name(),
                values.into_iter().map(Some).collect(),
            ))
        }
        Binding::Async { .. } => Err(DiError::AsyncResolutionRequired {
            identifier: identifier.name().to_string(),
        }),
    }
}

/// Resolve dependencies left to right; the first failure aborts
fn resolve_all(
    injector: &Injector,
    deps: &[AnyIdentifier],
    stack: &mut ResolutionStack,
) -> DiResult<Vec<Instance>> {
    deps.iter()
        .map(|dep| resolve(injector, dep, stack))
        .collect()
}

fn manual_slots(
    injector: &Injector,
    class: &ClassRef,
    manual: usize,
) -> DiResult<Vec<Option<Instance>>> {
    if manual == 0 {
        return Ok(Vec::new());
    }

    match injector.config().resolution.manual_arguments {
        ManualArgumentPolicy::FillAbsent => {
            warn!(
                class = class.name(),
                count = manual,
                "Constructor parameters without injection annotations receive no value"
            );
            Ok(vec![None; manual])
        }
        ManualArgumentPolicy::Reject => Err(DiError::MissingAnnotation {
            class: class.name().to_string(),
            index: 0,
        }),
    }
}

/// Build `C` with caller-supplied manual arguments, without caching it
pub(crate) fn create_instance<C: Injectable>(
    injector: &Injector,
    custom_args: Vec<Instance>,
) -> DiResult<C> {
    let class = ClassRef::of::<C>();
    let plan = injector.plan_for(&class)?;

    let given = custom_args.len();
    let mut slots: Vec<Option<Instance>> = custom_args.into_iter().map(Some).collect();
    if given > plan.manual {
        warn!(
            class = class.name(),
            expected = plan.manual,
            given,
            "Extra custom arguments are ignored"
        );
        slots.truncate(plan.manual);
    } else if given < plan.manual {
        match injector.config().resolution.manual_arguments {
            ManualArgumentPolicy::FillAbsent => {
                warn!(
                    class = class.name(),
                    expected = plan.manual,
                    given,
                    "Missing custom arguments receive no value"
                );
                slots.resize(plan.manual, None);
            }
            ManualArgumentPolicy::Reject => {
                return Err(DiError::ArgumentUnavailable {
                    owner: class.name().to_string(),
                    index: given,
                })
            }
        }
    }

    let mut stack = ResolutionStack::new(injector.config().resolution.max_depth);
    slots.extend(resolve_all(injector, &plan.injected, &mut stack)?.into_iter().map(Some));

    debug!(class = class.name(), "Creating unmanaged instance");
    C::construct(&Arguments::new(class.name(), slots))
}

fn owner_of(injector: &Injector, key: Key) -> Option<Injector> {
    let mut current = Some(injector);
    while let Some(candidate) = current {
        if candidate.registry().borrow().contains(key) {
            return Some(candidate.clone());
        }
        current = candidate.parent();
    }
    None
}

/// Rolls an entry back to `Unresolved` if its loader never settles
///
/// Dropping a `get_async` future while the loader is pending drops this guard
/// still armed.
struct PendingLoad {
    owner: Injector,
    key: Key,
    armed: bool,
}

impl PendingLoad {
    fn new(owner: &Injector, key: Key) -> Self {
        Self {
            owner: owner.clone(),
            key,
            armed: true,
        }
    }

    fn settle(mut self, identifier: &AnyIdentifier, outcome: DiResult<Instance>) -> DiResult<Instance> {
        self.armed = false;
        settle(&self.owner, identifier, outcome)
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut registry) = self.owner.registry().try_borrow_mut() {
            registry.rollback(self.key);
            trace!(injector = self.owner.id(), "Abandoned async load rolled back");
        }
    }
}

/// Resolve `identifier`, awaiting async loaders on the way
///
/// Only the requested entry and alias chains leading to it are awaited;
/// dependencies of an async binding resolve synchronously.
pub(crate) fn resolve_async<'a>(
    injector: &'a Injector,
    identifier: &'a AnyIdentifier,
) -> LocalBoxFuture<'a, DiResult<Instance>> {
    resolve_async_chain(injector, identifier, Vec::new())
}

/// `chain` holds the aliases followed to reach `identifier`, as
/// `(injector id, alias)` pairs
fn resolve_async_chain<'a>(
    injector: &'a Injector,
    identifier: &'a AnyIdentifier,
    mut chain: Vec<(u64, AnyIdentifier)>,
) -> LocalBoxFuture<'a, DiResult<Instance>> {
    async move {
        let Some(owner) = owner_of(injector, identifier.key()) else {
            return Err(DiError::UnregisteredIdentifier {
                identifier: identifier.name().to_string(),
                requested_by: chain.last().map(|(_, alias)| alias.name().to_string()),
            });
        };

        if let Some(start) = chain
            .iter()
            .position(|(id, alias)| *id == owner.id() && alias == identifier)
        {
            let mut cycle: Vec<String> = chain[start..]
                .iter()
                .map(|(_, alias)| alias.name().to_string())
                .collect();
            cycle.push(identifier.name().to_string());
            return Err(DiError::CircularDependency { cycle });
        }

        let binding = match lookup(&owner, identifier.key()) {
            Lookup::Cached(instance) => return Ok(instance),
            Lookup::InProgress => {
                return Err(DiError::CircularDependency {
                    cycle: vec![identifier.name().to_string(), identifier.name().to_string()],
                })
            }
            Lookup::Loading => {
                return Err(DiError::ResolutionInProgress {
                    identifier: identifier.name().to_string(),
                })
            }
            Lookup::Missing => {
                return Err(DiError::UnregisteredIdentifier {
                    identifier: identifier.name().to_string(),
                    requested_by: None,
                })
            }
            Lookup::Pending(binding) => binding,
        };

        match &*binding {
            Binding::Async { loader, deps } => {
                owner.registry().borrow_mut().mark_resolving(identifier.key());
                let pending = PendingLoad::new(&owner, identifier.key());

                let mut stack = ResolutionStack::new(owner.config().resolution.max_depth);
                let prepared = match stack.push(owner.id(), identifier) {
                    Ok(()) => {
                        let values = resolve_all(&owner, deps, &mut stack);
                        stack.pop();
                        values
                    }
                    Err(err) => Err(err),
                };
                let values = match prepared {
                    Ok(values) => values,
                    Err(err) => return pending.settle(identifier, Err(err)),
                };

                owner.registry().borrow_mut().mark_loading(identifier.key());
                debug!(injector = owner.id(), identifier = %identifier, "Awaiting async loader");
                let outcome = loader(Arguments::new(
                    identifier.name(),
                    values.into_iter().map(Some).collect(),
                ))
                .await;
                pending.settle(identifier, outcome)
            }
            Binding::Alias(target) => {
                chain.push((owner.id(), identifier.clone()));
                let instance = match resolve_async_chain(&owner, target, chain).await {
                    Ok(instance) => instance,
                    Err(err) => return Err(err),
                };

                // The alias may have been replaced or resolved while the target loaded
                let mut registry = owner.registry().borrow_mut();
                let current = registry.lookup(identifier.key()).is_some_and(|entry| {
                    Rc::ptr_eq(&entry.binding, &binding)
                        && matches!(entry.state, ResolutionState::Unresolved)
                });
                if current {
                    registry.finish(identifier.key(), instance.clone());
                }
                Ok(instance)
            }
            _ => {
                let mut stack = ResolutionStack::new(owner.config().resolution.max_depth);
                resolve(&owner, identifier, &mut stack)
            }
        }
    }
    .boxed_local()
}
