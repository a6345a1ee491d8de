//! Property-based tests for resolution, caching and scoping

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arbor_di::*;
use proptest::prelude::*;

/// Random DAG: node `i` depends on a subset of nodes `0..i`
fn arb_dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (2..12usize).prop_flat_map(|size| {
        (0..size)
            .map(|node| prop::collection::btree_set(0..node.max(1), 0..=node.min(3)))
            .collect::<Vec<_>>()
            .prop_map(|sets| {
                sets.into_iter()
                    .enumerate()
                    .map(|(node, deps)| {
                        deps.into_iter()
                            .filter(|dep| *dep < node)
                            .collect::<Vec<usize>>()
                    })
                    .collect::<Vec<Vec<usize>>>()
            })
    })
}

proptest! {
    #[test]
    fn test_resolution_is_idempotent(values in prop::collection::vec(any::<i64>(), 1..20)) {
        let calls = Rc::new(Cell::new(0usize));
        let ids: Vec<Identifier<i64>> = (0..values.len())
            .map(|i| Identifier::new(format!("value{i}")))
            .collect();

        let injector = Injector::with_bindings(ids.iter().zip(&values).map(|(id, value)| {
            let calls = Rc::clone(&calls);
            let value = *value;
            Declaration::factory(id, move |_| {
                calls.set(calls.get() + 1);
                Ok(Rc::new(value))
            })
        }))
        .unwrap();

        for (id, value) in ids.iter().zip(&values) {
            let first = injector.get(id).unwrap();
            let second = injector.get(id).unwrap();
            prop_assert!(Rc::ptr_eq(&first, &second));
            prop_assert_eq!(*first, *value);
        }
        prop_assert_eq!(calls.get(), values.len());
    }
}

proptest! {
    #[test]
    fn test_dependencies_complete_before_dependents(dag in arb_dag()) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let ids: Vec<Identifier<usize>> = (0..dag.len())
            .map(|i| Identifier::new(format!("node{i}")))
            .collect();

        let injector = Injector::new();
        for (node, deps) in dag.iter().enumerate() {
            let log = Rc::clone(&log);
            let dep_ids = deps.iter().map(|dep| ids[*dep].erase()).collect();
            injector
                .add(
                    Declaration::factory(&ids[node], move |_| {
                        log.borrow_mut().push(node);
                        Ok(Rc::new(node))
                    })
                    .with_deps(dep_ids),
                )
                .unwrap();
        }

        let top = dag.len() - 1;
        prop_assert_eq!(*injector.get(&ids[top]).unwrap(), top);

        let log = log.borrow();
        let mut seen = vec![false; dag.len()];
        for node in log.iter() {
            prop_assert!(!seen[*node], "node{} constructed twice", node);
            for dep in &dag[*node] {
                prop_assert!(seen[*dep], "node{} built before its dependency node{}", node, dep);
            }
            seen[*node] = true;
        }
        prop_assert_eq!(log.last().copied(), Some(top));
    }
}

proptest! {
    #[test]
    fn test_child_shadows_only_what_it_declares(shadowed in prop::collection::vec(any::<bool>(), 1..16)) {
        let ids: Vec<Identifier<String>> = (0..shadowed.len())
            .map(|i| Identifier::new(format!("id{i}")))
            .collect();

        let root = Injector::with_bindings(
            ids.iter().map(|id| Declaration::value(id, Rc::new(format!("root:{id}")))),
        )
        .unwrap();
        let child = root
            .create_child(
                ids.iter()
                    .zip(&shadowed)
                    .filter(|(_, shadow)| **shadow)
                    .map(|(id, _)| Declaration::value(id, Rc::new(format!("child:{id}")))),
            )
            .unwrap();

        for (id, shadow) in ids.iter().zip(&shadowed) {
            let expected = if *shadow { format!("child:{id}") } else { format!("root:{id}") };
            let from_child = child.get(id).unwrap();
            let from_root = root.get(id).unwrap();
            prop_assert_eq!(from_child.as_str(), expected.as_str());
            let root_value = format!("root:{id}");
            prop_assert_eq!(from_root.as_str(), root_value.as_str());
            prop_assert_eq!(child.state(id).is_some(), *shadow);
        }
    }
}

proptest! {
    #[test]
    fn test_cycles_leave_no_cached_participants(length in 1..8usize, start in 0..8usize) {
        let ids: Vec<Identifier<u32>> = (0..length)
            .map(|i| Identifier::new(format!("ring{i}")))
            .collect();

        let injector = Injector::with_bindings((0..length).map(|i| {
            let next = ids[(i + 1) % length].erase();
            Declaration::factory(&ids[i], |args| args.get::<u32>(0)).with_deps(vec![next])
        }))
        .unwrap();

        let start = start % length;
        let err = injector.get(&ids[start]).unwrap_err();
        let cycle = err.cycle().map(<[String]>::to_vec).unwrap_or_default();

        prop_assert_eq!(cycle.len(), length + 1);
        prop_assert_eq!(cycle.first(), cycle.last());
        prop_assert_eq!(cycle[0].as_str(), ids[start].name());
        for id in &ids {
            prop_assert_eq!(injector.state(id), Some(EntryState::Unresolved));
        }
    }
}
