//! Host-side entity and existence abstractions.

use ferry_protocol::PropertyMap;
use std::sync::Arc;

/// Shared handle to a host entity.
pub type EntityRef = Arc<dyn TransferableEntity>;

/// An entity the host owns and the session may ship to the client.
///
/// Identity is the `id`: two handles with the same id are the same entity.
/// The modification time must never decrease for a given id.
pub trait TransferableEntity: Send + Sync {
    /// Stable identity.
    fn id(&self) -> &str;

    /// Version stamp, bumped on every change.
    fn modification_time(&self) -> i64;

    /// Type name used when forgetting all entities of one kind.
    fn type_name(&self) -> &str;

    /// Flat snapshot of the entity for transfer.
    fn create_properties_map(&self) -> PropertyMap;

    /// Entities that must accompany this one on the client.
    ///
    /// The resulting graph may contain cycles.
    fn passengers(&self) -> Vec<EntityRef> {
        Vec::new()
    }
}

/// Authoritative answer to "does this entity still exist?".
///
/// Passed into every send so that the check runs against the caller's
/// transaction instead of ambient global state.
pub trait ExistenceOracle {
    /// Returns false if the entity is not (or no longer) stored.
    fn is_persistent(&self, _entity_id: &str) -> bool {
        true
    }

    /// Returns true if the current transaction deleted the entity.
    fn is_deleted(&self, _entity_id: &str) -> bool {
        false
    }
}

/// Oracle for hosts without a store: every entity exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeExists;

impl ExistenceOracle for AssumeExists {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assume_exists_defaults() {
        assert!(AssumeExists.is_persistent("any"));
        assert!(!AssumeExists.is_deleted("any"));
    }
}
