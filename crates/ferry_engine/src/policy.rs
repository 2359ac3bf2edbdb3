//! Host-supplied policies injected into a session at construction.
//!
//! Every policy is also implemented for plain closures with the matching
//! signature.

use crate::entity::TransferableEntity;
use ferry_protocol::{DeltaBatch, PropertyMap};

/// Decides whether a client may see an entity.
pub trait VisibilityPolicy: Send + Sync {
    /// Returns false to reject the entity with `PermissionDenied`.
    fn is_visible(&self, entity: &dyn TransferableEntity) -> bool;
}

/// Rewrites a snapshot before it is queued, e.g. to redact fields.
pub trait PropertyFilter: Send + Sync {
    /// Mutates the snapshot in place.
    fn filter_properties(&self, entity: &dyn TransferableEntity, properties: &mut PropertyMap);
}

/// Customizes every batch a session installs.
pub trait BatchFactory: Send + Sync {
    /// Called on each fresh, empty batch before it becomes pending.
    fn prepare(&self, batch: &mut DeltaBatch);
}

/// Notified when a session releases its resources.
pub trait SessionListener: Send + Sync {
    /// Called once when the session is invalidated.
    fn on_invalidate(&self, session_number: u32);
}

/// Every entity is visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl VisibilityPolicy for AllowAll {
    fn is_visible(&self, _entity: &dyn TransferableEntity) -> bool {
        true
    }
}

/// Snapshots are shipped unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl PropertyFilter for KeepAll {
    fn filter_properties(&self, _entity: &dyn TransferableEntity, _properties: &mut PropertyMap) {}
}

/// Batches carry only the metadata the session stamps on them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainBatches;

impl BatchFactory for PlainBatches {
    fn prepare(&self, _batch: &mut DeltaBatch) {}
}

impl<F> VisibilityPolicy for F
where
    F: Fn(&dyn TransferableEntity) -> bool + Send + Sync,
{
    fn is_visible(&self, entity: &dyn TransferableEntity) -> bool {
        self(entity)
    }
}

impl<F> PropertyFilter for F
where
    F: Fn(&dyn TransferableEntity, &mut PropertyMap) + Send + Sync,
{
    fn filter_properties(&self, entity: &dyn TransferableEntity, properties: &mut PropertyMap) {
        self(entity, properties)
    }
}

impl<F> BatchFactory for F
where
    F: Fn(&mut DeltaBatch) + Send + Sync,
{
    fn prepare(&self, batch: &mut DeltaBatch) {
        self(batch)
    }
}

impl<F> SessionListener for F
where
    F: Fn(u32) + Send + Sync,
{
    fn on_invalidate(&self, session_number: u32) {
        self(session_number)
    }
}
