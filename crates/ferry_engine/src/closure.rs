//! Dependency closure over entity passengers.

use crate::entity::{EntityRef, TransferableEntity};
use std::collections::HashSet;
use tracing::trace;

/// Every entity reachable from a root through `passengers()`, each once.
///
/// Traversal is depth-first with an explicit stack and a visited set keyed
/// by id, so cycles and diamonds terminate and never yield duplicates.
pub struct DependencyClosure<'a> {
    root: &'a dyn TransferableEntity,
    passengers: Vec<EntityRef>,
}

impl<'a> DependencyClosure<'a> {
    /// Resolves the closure of `root`.
    pub fn resolve(root: &'a dyn TransferableEntity) -> Self {
        let mut visited = HashSet::new();
        visited.insert(root.id().to_owned());

        let mut stack = root.passengers();
        stack.reverse();
        let mut passengers = Vec::new();

        while let Some(next) = stack.pop() {
            if !visited.insert(next.id().to_owned()) {
                continue;
            }
            trace!(root = root.id(), passenger = next.id(), "resolved passenger");
            let mut children = next.passengers();
            children.reverse();
            stack.extend(children);
            passengers.push(next);
        }

        Self { root, passengers }
    }

    /// The entity the closure was resolved from.
    pub fn root(&self) -> &dyn TransferableEntity {
        self.root
    }

    /// Number of entities in the closure, root included.
    pub fn len(&self) -> usize {
        self.passengers.len() + 1
    }

    /// Always false: the root is part of its own closure.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates root first, then passengers in depth-first order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn TransferableEntity> + '_ {
        let root: &dyn TransferableEntity = self.root;
        std::iter::once(root).chain(
            self.passengers
                .iter()
                .map(|entity| entity.as_ref() as &dyn TransferableEntity),
        )
    }

    /// Ids of the closure in iteration order.
    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|entity| entity.id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_protocol::PropertyMap;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Node {
        id: &'static str,
        passengers: Mutex<Vec<EntityRef>>,
    }

    impl Node {
        fn new(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                passengers: Mutex::new(Vec::new()),
            })
        }

        fn carry(&self, passenger: &Arc<Node>) {
            self.passengers.lock().push(passenger.clone());
        }
    }

    impl TransferableEntity for Node {
        fn id(&self) -> &str {
            self.id
        }

        fn modification_time(&self) -> i64 {
            1
        }

        fn type_name(&self) -> &str {
            "Node"
        }

        fn create_properties_map(&self) -> PropertyMap {
            PropertyMap::new()
        }

        fn passengers(&self) -> Vec<EntityRef> {
            self.passengers.lock().clone()
        }
    }

    #[test]
    fn lone_entity() {
        let e = Node::new("e");
        let closure = DependencyClosure::resolve(&*e);
        assert_eq!(closure.ids(), vec!["e"]);
        assert_eq!(closure.len(), 1);
        assert!(!closure.is_empty());
    }

    #[test]
    fn nested_passengers_depth_first() {
        let (e, a, b, c) = (Node::new("e"), Node::new("a"), Node::new("b"), Node::new("c"));
        e.carry(&a);
        e.carry(&b);
        a.carry(&c);

        let closure = DependencyClosure::resolve(&*e);
        assert_eq!(closure.ids(), vec!["e", "a", "c", "b"]);
    }

    #[test]
    fn diamond_yields_each_once() {
        let (e, a, b, c) = (Node::new("e"), Node::new("a"), Node::new("b"), Node::new("c"));
        e.carry(&a);
        e.carry(&b);
        a.carry(&c);
        b.carry(&c);

        let closure = DependencyClosure::resolve(&*e);
        let mut ids = closure.ids();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a", "b", "c", "e"]);
    }

    #[test]
    fn cycle_terminates() {
        let (e, a) = (Node::new("e"), Node::new("a"));
        e.carry(&a);
        a.carry(&e);
        a.carry(&a);

        let closure = DependencyClosure::resolve(&*e);
        assert_eq!(closure.ids(), vec!["e", "a"]);
    }
}
