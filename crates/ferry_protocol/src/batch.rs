//! The delta batch handed to the transport once per client poll.

use crate::error::{ProtocolError, ProtocolResult};
use crate::error_wrapper::ErrorWrapper;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Flat key/value snapshot of one entity.
pub type PropertyMap = BTreeMap<String, String>;

/// Property key holding the entity id.
pub const ID_KEY: &str = "id";

/// Property key holding the entity modification time.
pub const MODIFICATION_TIME_KEY: &str = "modificationTime";

/// A bundle of upserts, deletions and diagnostics for one client poll.
///
/// A batch is created empty, accumulates changes while it is the pending
/// batch of a session, and is handed to the transport exactly once.
///
/// Invariant: an id is never present both as an upsert and as a deletion.
/// Deleting an id drops its pending upsert, and upserts of deleted ids are
/// ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaBatch {
    /// Base the client uses to namespace ids of entities it creates locally.
    pub entity_id_base: String,
    /// Number of the conversation this batch belongs to.
    pub conversation_number: u32,
    /// Position of this batch within its conversation, starting at 0.
    pub sequence: u64,
    /// True for the first batch of a freshly created conversation.
    pub initial: bool,
    /// Whether the server runs in development mode.
    pub development_mode: bool,
    user_id: Option<String>,
    errors: Vec<ErrorWrapper>,
    deleted_entities: BTreeSet<String>,
    entities: BTreeMap<String, PropertyMap>,
}

impl DeltaBatch {
    /// Creates an empty batch with a fresh entity id base.
    pub fn new(conversation_number: u32, sequence: u64, development_mode: bool) -> Self {
        Self {
            entity_id_base: Uuid::new_v4().to_string(),
            conversation_number,
            sequence,
            initial: sequence == 0,
            development_mode,
            user_id: None,
            errors: Vec::new(),
            deleted_entities: BTreeSet::new(),
            entities: BTreeMap::new(),
        }
    }

    /// Drops all upserts and deletions. Metadata and errors are kept.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.deleted_entities.clear();
    }

    /// Appends a diagnostic for the client.
    pub fn add_error(&mut self, error: ErrorWrapper) {
        self.errors.push(error);
    }

    /// Diagnostics accumulated so far.
    pub fn errors(&self) -> &[ErrorWrapper] {
        &self.errors
    }

    /// Sets the user this batch is addressed to.
    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    /// The user this batch is addressed to, if set.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns true if a user id was set.
    pub fn is_user_set(&self) -> bool {
        self.user_id.is_some()
    }

    /// Queues an entity snapshot for upsert.
    ///
    /// The snapshot is keyed by its `id` property; a later snapshot of the
    /// same id replaces the earlier one. Returns `Ok(false)` without queueing
    /// when the id is already marked deleted in this batch.
    pub fn add_entity(&mut self, properties: PropertyMap) -> ProtocolResult<bool> {
        let id = match properties.get(ID_KEY) {
            Some(id) if !id.is_empty() => id.clone(),
            _ => return Err(ProtocolError::MissingId),
        };
        if self.deleted_entities.contains(&id) {
            return Ok(false);
        }
        self.entities.insert(id, properties);
        Ok(true)
    }

    /// Marks an id as deleted on the client and drops any pending upsert.
    pub fn add_deleted_entity(&mut self, entity_id: impl Into<String>) {
        let entity_id = entity_id.into();
        self.entities.remove(&entity_id);
        self.deleted_entities.insert(entity_id);
    }

    /// Returns true if the id is marked deleted in this batch.
    pub fn contains_deleted_entity(&self, entity_id: &str) -> bool {
        self.deleted_entities.contains(entity_id)
    }

    /// Returns true if any deletion is queued.
    pub fn contains_deleted_entities(&self) -> bool {
        !self.deleted_entities.is_empty()
    }

    /// Returns true if an upsert is queued for the id.
    pub fn contains_entity(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    /// Returns true if any upsert is queued.
    pub fn contains_entities(&self) -> bool {
        !self.entities.is_empty()
    }

    /// Returns the queued snapshot for an id.
    pub fn entity(&self, entity_id: &str) -> Option<&PropertyMap> {
        self.entities.get(entity_id)
    }

    /// Iterates over the queued snapshots in id order.
    pub fn entities(&self) -> impl Iterator<Item = &PropertyMap> {
        self.entities.values()
    }

    /// Number of queued upserts.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Ids the client must drop.
    pub fn deleted_entities(&self) -> &BTreeSet<String> {
        &self.deleted_entities
    }

    /// Returns true if the batch carries no upserts, deletions or errors.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.deleted_entities.is_empty() && self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: &str, time: i64) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert(ID_KEY.into(), id.into());
        map.insert(MODIFICATION_TIME_KEY.into(), time.to_string());
        map
    }

    #[test]
    fn new_batch_is_empty() {
        let batch = DeltaBatch::new(3, 0, true);
        assert!(batch.is_empty());
        assert!(batch.initial);
        assert!(batch.development_mode);
        assert_eq!(batch.conversation_number, 3);
        assert!(!batch.is_user_set());
        assert!(Uuid::parse_str(&batch.entity_id_base).is_ok());
    }

    #[test]
    fn later_batches_are_not_initial() {
        let batch = DeltaBatch::new(1, 4, false);
        assert!(!batch.initial);
        assert_eq!(batch.sequence, 4);
    }

    #[test]
    fn id_bases_differ_between_batches() {
        let a = DeltaBatch::new(1, 0, false);
        let b = DeltaBatch::new(1, 1, false);
        assert_ne!(a.entity_id_base, b.entity_id_base);
    }

    #[test]
    fn add_entity_keys_by_id() {
        let mut batch = DeltaBatch::new(1, 0, false);
        assert!(batch.add_entity(snapshot("u1", 5)).unwrap());
        assert!(batch.add_entity(snapshot("u1", 6)).unwrap());

        assert_eq!(batch.entity_count(), 1);
        assert_eq!(
            batch.entity("u1").unwrap().get(MODIFICATION_TIME_KEY).unwrap(),
            "6"
        );
    }

    #[test]
    fn add_entity_requires_id() {
        let mut batch = DeltaBatch::new(1, 0, false);
        assert_eq!(
            batch.add_entity(PropertyMap::new()),
            Err(ProtocolError::MissingId)
        );

        let mut blank = PropertyMap::new();
        blank.insert(ID_KEY.into(), String::new());
        assert_eq!(batch.add_entity(blank), Err(ProtocolError::MissingId));
    }

    #[test]
    fn deletion_removes_pending_upsert() {
        let mut batch = DeltaBatch::new(1, 0, false);
        batch.add_entity(snapshot("u1", 5)).unwrap();
        batch.add_deleted_entity("u1");

        assert!(!batch.contains_entity("u1"));
        assert!(batch.contains_deleted_entity("u1"));
        assert!(!batch.contains_entities());
        assert!(batch.contains_deleted_entities());
    }

    #[test]
    fn deleted_ids_reject_upserts() {
        let mut batch = DeltaBatch::new(1, 0, false);
        batch.add_deleted_entity("u1");
        assert!(!batch.add_entity(snapshot("u1", 7)).unwrap());
        assert!(!batch.contains_entity("u1"));
    }

    #[test]
    fn clear_keeps_errors_and_metadata() {
        let mut batch = DeltaBatch::new(2, 1, false);
        batch.set_user_id("alice");
        batch.add_entity(snapshot("u1", 1)).unwrap();
        batch.add_deleted_entity("u2");
        batch.add_error(ErrorWrapper::new("Conflict", "stale write"));

        batch.clear();

        assert!(!batch.contains_entities());
        assert!(!batch.contains_deleted_entities());
        assert_eq!(batch.errors().len(), 1);
        assert_eq!(batch.user_id(), Some("alice"));
        assert!(!batch.is_empty());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut batch = DeltaBatch::new(9, 0, false);
        batch.add_entity(snapshot("u1", 5)).unwrap();
        batch.add_deleted_entity("gone");

        let json = serde_json::to_value(&batch).unwrap();
        assert_eq!(json["conversationNumber"], 9);
        assert_eq!(json["deletedEntities"][0], "gone");
        assert_eq!(json["entities"]["u1"]["modificationTime"], "5");

        let back: DeltaBatch = serde_json::from_value(json).unwrap();
        assert_eq!(back, batch);
    }
}
