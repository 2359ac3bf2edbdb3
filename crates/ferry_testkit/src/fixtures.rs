//! Test entities, entity graphs and an in-memory existence store.

use ferry_engine::{EntityRef, ExistenceOracle, SessionConfig, SyncSession, TransferableEntity};
use ferry_protocol::PropertyMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// An entity whose version, properties and passengers can change in place.
pub struct TestEntity {
    id: String,
    type_name: String,
    modification_time: AtomicI64,
    properties: Mutex<PropertyMap>,
    passengers: Mutex<Vec<EntityRef>>,
}

impl TestEntity {
    /// Creates an entity of type `Node`.
    pub fn new(id: impl Into<String>, modification_time: i64) -> Arc<Self> {
        Self::with_type(id, "Node", modification_time)
    }

    /// Creates an entity of the given type.
    pub fn with_type(
        id: impl Into<String>,
        type_name: impl Into<String>,
        modification_time: i64,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            type_name: type_name.into(),
            modification_time: AtomicI64::new(modification_time),
            properties: Mutex::new(PropertyMap::new()),
            passengers: Mutex::new(Vec::new()),
        })
    }

    /// Bumps the version by one and returns the new version.
    pub fn touch(&self) -> i64 {
        self.modification_time.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Overwrites the version.
    pub fn set_modification_time(&self, modification_time: i64) {
        self.modification_time
            .store(modification_time, Ordering::SeqCst);
    }

    /// Sets a property included in every snapshot.
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.lock().insert(key.into(), value.into());
    }

    /// Adds a passenger.
    pub fn carry(&self, passenger: EntityRef) {
        self.passengers.lock().push(passenger);
    }
}

impl TransferableEntity for TestEntity {
    fn id(&self) -> &str {
        &self.id
    }

    fn modification_time(&self) -> i64 {
        self.modification_time.load(Ordering::SeqCst)
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn create_properties_map(&self) -> PropertyMap {
        let mut map = self.properties.lock().clone();
        map.insert("type".into(), self.type_name.clone());
        map
    }

    fn passengers(&self) -> Vec<EntityRef> {
        self.passengers.lock().clone()
    }
}

/// Builds passenger graphs by id.
#[derive(Default)]
pub struct EntityGraph {
    nodes: BTreeMap<String, Arc<TestEntity>>,
    edges: BTreeMap<String, Vec<String>>,
}

impl EntityGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node with this id, creating it at version 1.
    pub fn node(&mut self, id: &str) -> Arc<TestEntity> {
        self.nodes
            .entry(id.to_owned())
            .or_insert_with(|| TestEntity::new(id, 1))
            .clone()
    }

    /// Makes `to` a passenger of `from`, creating both as needed.
    pub fn edge(&mut self, from: &str, to: &str) -> &mut Self {
        let target = self.node(to);
        self.node(from).carry(target);
        self.edges
            .entry(from.to_owned())
            .or_default()
            .push(to.to_owned());
        self
    }

    /// Returns an existing node.
    ///
    /// # Panics
    ///
    /// Panics if the node was never created.
    pub fn entity(&self, id: &str) -> Arc<TestEntity> {
        self.nodes
            .get(id)
            .cloned()
            .unwrap_or_else(|| panic!("no node {id} in graph"))
    }

    /// All node ids in order.
    pub fn ids(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids reachable from `id` (itself included), computed from the edge list.
    pub fn reachable_from(&self, id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue = vec![id.to_owned()];
        while let Some(next) = queue.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(targets) = self.edges.get(&next) {
                queue.extend(targets.iter().cloned());
            }
        }
        seen
    }
}

/// Existence oracle backed by two in-memory id sets.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    transient: RwLock<HashSet<String>>,
    deleted: RwLock<HashSet<String>>,
}

impl InMemoryStore {
    /// Creates a store in which every entity exists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an entity as never persisted.
    pub fn mark_transient(&self, id: &str) {
        self.transient.write().insert(id.to_owned());
    }

    /// Marks an entity as deleted by the current transaction.
    pub fn mark_deleted(&self, id: &str) {
        self.deleted.write().insert(id.to_owned());
    }

    /// Makes an entity exist again.
    pub fn restore(&self, id: &str) {
        self.transient.write().remove(id);
        self.deleted.write().remove(id);
    }
}

impl ExistenceOracle for InMemoryStore {
    fn is_persistent(&self, entity_id: &str) -> bool {
        !self.transient.read().contains(entity_id)
    }

    fn is_deleted(&self, entity_id: &str) -> bool {
        self.deleted.read().contains(entity_id)
    }
}

/// Creates a session with the default configuration.
pub fn test_session(number: u32) -> SyncSession {
    SyncSession::new(number, SessionConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_bumps_version() {
        let entity = TestEntity::new("a", 4);
        assert_eq!(entity.touch(), 5);
        assert_eq!(entity.modification_time(), 5);
        entity.set_modification_time(9);
        assert_eq!(entity.modification_time(), 9);
    }

    #[test]
    fn snapshot_includes_type_and_properties() {
        let entity = TestEntity::with_type("a", "User", 1);
        entity.set_property("name", "Ada");
        let map = entity.create_properties_map();
        assert_eq!(map.get("type").unwrap(), "User");
        assert_eq!(map.get("name").unwrap(), "Ada");
    }

    #[test]
    fn graph_edges_become_passengers() {
        let mut graph = EntityGraph::new();
        graph.edge("a", "b").edge("b", "a").edge("a", "c");

        let passengers: Vec<String> = graph
            .entity("a")
            .passengers()
            .iter()
            .map(|p| p.id().to_owned())
            .collect();
        assert_eq!(passengers, vec!["b", "c"]);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.reachable_from("b").len(), 3);
        assert_eq!(graph.reachable_from("c").len(), 1);
    }

    #[test]
    fn store_tracks_existence() {
        let store = InMemoryStore::new();
        store.mark_transient("t");
        store.mark_deleted("d");
        assert!(!store.is_persistent("t"));
        assert!(store.is_deleted("d"));
        assert!(store.is_persistent("x"));

        store.restore("t");
        store.restore("d");
        assert!(store.is_persistent("t"));
        assert!(!store.is_deleted("d"));
    }
}
