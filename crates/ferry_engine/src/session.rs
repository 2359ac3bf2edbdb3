//! Per-client sync session.

use crate::closure::DependencyClosure;
use crate::config::SessionConfig;
use crate::entity::{ExistenceOracle, TransferableEntity};
use crate::error::{SessionError, SessionResult};
use crate::policy::{
    AllowAll, BatchFactory, KeepAll, PlainBatches, PropertyFilter, SessionListener,
    VisibilityPolicy,
};
use ferry_protocol::{DeltaBatch, ErrorWrapper, ID_KEY, MODIFICATION_TIME_KEY};
use parking_lot::{Mutex, RwLock};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Liveness of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// The client polled within the timeout window.
    Active,
    /// The client has not polled within the timeout window.
    TimedOut,
    /// The session was terminated explicitly.
    Invalidated,
}

impl LivenessState {
    /// Returns true if the session still serves its client.
    pub fn is_active(&self) -> bool {
        matches!(self, LivenessState::Active)
    }
}

/// Outcome of one send call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    /// Entities whose snapshot was queued for upsert.
    pub queued: usize,
    /// Entities skipped because the client already holds their version.
    pub unchanged: usize,
    /// Entities redirected to the deletion path or suppressed by a deletion.
    pub deleted: usize,
}

impl AddAssign for SendReport {
    fn add_assign(&mut self, other: Self) {
        self.queued += other.queued;
        self.unchanged += other.unchanged;
        self.deleted += other.deleted;
    }
}

/// What the client is believed to hold for one entity.
#[derive(Debug, Clone)]
struct RemoteVersion {
    type_name: String,
    modification_time: i64,
}

/// Server-side state of one client conversation.
///
/// Tracks which entity versions the client holds, accumulates the next batch
/// and keeps liveness bookkeeping.
///
/// Any number of threads may send, delete and query concurrently. Popping is
/// single-consumer per session but may race with senders.
///
/// Lock order: remote knowledge before pending batch. `pop_batch` only takes
/// the batch lock.
pub struct SyncSession {
    number: u32,
    config: SessionConfig,
    visibility: Arc<dyn VisibilityPolicy>,
    property_filter: Arc<dyn PropertyFilter>,
    batch_factory: Arc<dyn BatchFactory>,
    listener: Option<Arc<dyn SessionListener>>,
    remote: RwLock<HashMap<String, RemoteVersion>>,
    pending: Mutex<DeltaBatch>,
    last_touched: Mutex<Instant>,
    invalidated: AtomicBool,
}

impl SyncSession {
    /// Creates a session with permissive policies and an empty first batch.
    pub fn new(number: u32, config: SessionConfig) -> Self {
        let pending = DeltaBatch::new(number, 0, config.development_mode);
        let now = config.clock.now();
        Self {
            number,
            config,
            visibility: Arc::new(AllowAll),
            property_filter: Arc::new(KeepAll),
            batch_factory: Arc::new(PlainBatches),
            listener: None,
            remote: RwLock::new(HashMap::new()),
            pending: Mutex::new(pending),
            last_touched: Mutex::new(now),
            invalidated: AtomicBool::new(false),
        }
    }

    /// Sets the visibility policy.
    pub fn with_visibility(mut self, policy: impl VisibilityPolicy + 'static) -> Self {
        self.visibility = Arc::new(policy);
        self
    }

    /// Sets the property filter applied to every queued snapshot.
    pub fn with_property_filter(mut self, filter: impl PropertyFilter + 'static) -> Self {
        self.property_filter = Arc::new(filter);
        self
    }

    /// Sets the batch factory and applies it to the current pending batch.
    pub fn with_batch_factory(mut self, factory: impl BatchFactory + 'static) -> Self {
        factory.prepare(self.pending.get_mut());
        self.batch_factory = Arc::new(factory);
        self
    }

    /// Sets the listener notified on invalidation.
    pub fn with_listener(mut self, listener: impl SessionListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Ordinal of this conversation within its parent scope.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ---- change intake ----

    /// Ships an entity and its passengers to the client if they are stale.
    ///
    /// An entity the oracle reports as gone is recorded as deleted instead.
    /// Fails with `PermissionDenied` if the visibility policy rejects it.
    pub fn send(
        &self,
        tx: &dyn ExistenceOracle,
        entity: &dyn TransferableEntity,
    ) -> SessionResult<SendReport> {
        self.ensure_valid()?;

        let id = entity.id();
        if !tx.is_persistent(id) {
            debug!(session = %self, entity = id, "entity not persistent, deleting from client");
            self.record_deletion(id);
            return Ok(SendReport {
                deleted: 1,
                ..SendReport::default()
            });
        }
        if tx.is_deleted(id) {
            debug!(session = %self, entity = id, "entity deleted in transaction, deleting from client");
            self.record_deletion(id);
            return Ok(SendReport {
                deleted: 1,
                ..SendReport::default()
            });
        }

        if !self.visibility.is_visible(entity) {
            return Err(SessionError::PermissionDenied {
                entity_id: id.to_owned(),
                session: self.to_string(),
            });
        }

        let closure = DependencyClosure::resolve(entity);
        let mut report = SendReport::default();

        let mut remote = self.remote.write();
        let mut pending = self.pending.lock();
        for member in closure.iter() {
            self.queue_if_stale(&mut remote, &mut pending, member, &mut report)?;
        }

        Ok(report)
    }

    /// Sends every entity, stopping at the first error.
    ///
    /// Entities processed before the error stay queued.
    pub fn send_all<I>(&self, tx: &dyn ExistenceOracle, entities: I) -> SessionResult<SendReport>
    where
        I: IntoIterator,
        I::Item: AsRef<dyn TransferableEntity>,
    {
        let mut report = SendReport::default();
        for entity in entities {
            report += self.send(tx, entity.as_ref())?;
        }
        Ok(report)
    }

    /// Sends an entity only if the client already holds some version of it.
    pub fn send_if_tracking(
        &self,
        tx: &dyn ExistenceOracle,
        entity: &dyn TransferableEntity,
    ) -> SessionResult<SendReport> {
        if !self.is_tracking(entity.id()) {
            return Ok(SendReport::default());
        }
        self.send(tx, entity)
    }

    /// Applies [`send_if_tracking`](Self::send_if_tracking) to every entity.
    pub fn send_all_if_tracking<I>(
        &self,
        tx: &dyn ExistenceOracle,
        entities: I,
    ) -> SessionResult<SendReport>
    where
        I: IntoIterator,
        I::Item: AsRef<dyn TransferableEntity>,
    {
        let mut report = SendReport::default();
        for entity in entities {
            report += self.send_if_tracking(tx, entity.as_ref())?;
        }
        Ok(report)
    }

    /// Returns true if the client holds some version of the entity.
    pub fn is_tracking(&self, entity_id: &str) -> bool {
        self.remote.read().contains_key(entity_id)
    }

    /// The version last sent for an entity.
    pub fn tracked_version(&self, entity_id: &str) -> Option<i64> {
        self.remote
            .read()
            .get(entity_id)
            .map(|known| known.modification_time)
    }

    /// Number of entities the client is believed to hold.
    pub fn tracked_count(&self) -> usize {
        self.remote.read().len()
    }

    fn queue_if_stale(
        &self,
        remote: &mut HashMap<String, RemoteVersion>,
        batch: &mut DeltaBatch,
        entity: &dyn TransferableEntity,
        report: &mut SendReport,
    ) -> SessionResult<()> {
        let id = entity.id();
        if batch.contains_deleted_entity(id) {
            debug!(session = %self, entity = id, "entity deleted on client, not sending");
            report.deleted += 1;
            return Ok(());
        }

        let local = entity.modification_time();
        if remote.get(id).map(|known| known.modification_time) == Some(local) {
            debug!(session = %self, entity = id, version = local, "remote entity already up to date");
            report.unchanged += 1;
            return Ok(());
        }

        let mut properties = entity.create_properties_map();
        properties
            .entry(MODIFICATION_TIME_KEY.to_owned())
            .or_insert_with(|| local.to_string());
        self.property_filter
            .filter_properties(entity, &mut properties);
        properties.insert(ID_KEY.to_owned(), id.to_owned());

        batch.add_entity(properties)?;
        remote.insert(
            id.to_owned(),
            RemoteVersion {
                type_name: entity.type_name().to_owned(),
                modification_time: local,
            },
        );
        debug!(session = %self, entity = id, version = local, "sending entity");
        report.queued += 1;
        Ok(())
    }

    // ---- deletion intake ----

    /// Tells the client to drop an entity.
    ///
    /// Any upsert of the id pending in the same batch is removed. An empty id
    /// is ignored.
    pub fn delete_from_client(&self, entity_id: &str) {
        if entity_id.is_empty() {
            return;
        }
        self.record_deletion(entity_id);
    }

    fn record_deletion(&self, entity_id: &str) {
        let mut remote = self.remote.write();
        let mut pending = self.pending.lock();
        remote.remove(entity_id);
        pending.add_deleted_entity(entity_id);
    }

    /// Forgets every entity the client holds, forcing a full re-send.
    ///
    /// Returns the number of entries forgotten.
    pub fn forget_tracked_entities(&self) -> usize {
        let mut remote = self.remote.write();
        let count = remote.len();
        remote.clear();
        debug!(session = %self, count, "forgot tracked entities");
        count
    }

    /// Forgets every tracked entity of one type.
    ///
    /// Returns the number of entries forgotten.
    pub fn forget_tracked_entities_of_type(&self, type_name: &str) -> usize {
        let mut remote = self.remote.write();
        let before = remote.len();
        remote.retain(|_, known| known.type_name != type_name);
        let count = before - remote.len();
        debug!(session = %self, type_name, count, "forgot tracked entities of type");
        count
    }

    // ---- batch handoff ----

    /// Takes the pending batch and installs a fresh one.
    ///
    /// The new batch gets a new entity id base and the next sequence number.
    /// Must not be called concurrently with itself on the same session.
    pub fn pop_batch(&self) -> DeltaBatch {
        let mut pending = self.pending.lock();
        let mut next = DeltaBatch::new(
            self.number,
            pending.sequence + 1,
            self.config.development_mode,
        );
        self.batch_factory.prepare(&mut next);
        let batch = std::mem::replace(&mut *pending, next);
        debug!(
            session = %self,
            sequence = batch.sequence,
            entities = batch.entity_count(),
            deleted = batch.deleted_entities().len(),
            "popped batch"
        );
        batch
    }

    /// Runs `f` against the pending batch without taking it.
    pub fn with_pending_batch<R>(&self, f: impl FnOnce(&DeltaBatch) -> R) -> R {
        let pending = self.pending.lock();
        f(&*pending)
    }

    /// Attaches a diagnostic to the pending batch.
    pub fn add_error(&self, error: ErrorWrapper) {
        self.pending.lock().add_error(error);
    }

    // ---- liveness ----

    /// Records client activity.
    pub fn touch(&self) {
        if self.is_invalidated() {
            return;
        }
        *self.last_touched.lock() = self.config.clock.now();
    }

    /// Instant of the last client activity.
    pub fn last_touched(&self) -> Instant {
        *self.last_touched.lock()
    }

    /// Idle time after which the session is timed out.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Returns true if the client has been idle longer than the timeout.
    pub fn is_timed_out(&self) -> bool {
        let idle = self
            .config
            .clock
            .now()
            .saturating_duration_since(self.last_touched());
        idle > self.config.timeout
    }

    /// Current liveness state.
    pub fn state(&self) -> LivenessState {
        if self.is_invalidated() {
            LivenessState::Invalidated
        } else if self.is_timed_out() {
            LivenessState::TimedOut
        } else {
            LivenessState::Active
        }
    }

    /// Terminates the session and releases its remote knowledge.
    ///
    /// The listener is notified once; later calls are no-ops.
    pub fn invalidate(&self) {
        if self.invalidated.swap(true, AtomicOrdering::SeqCst) {
            return;
        }
        self.remote.write().clear();
        info!(session = %self, "session invalidated");
        if let Some(listener) = &self.listener {
            listener.on_invalidate(self.number);
        }
    }

    /// Returns true once the session was invalidated.
    pub fn is_invalidated(&self) -> bool {
        self.invalidated.load(AtomicOrdering::SeqCst)
    }

    /// Orders most recently touched sessions first, then by number.
    pub fn cmp_recency(&self, other: &SyncSession) -> Ordering {
        other
            .last_touched()
            .cmp(&self.last_touched())
            .then_with(|| self.number.cmp(&other.number))
    }

    fn ensure_valid(&self) -> SessionResult<()> {
        if self.is_invalidated() {
            return Err(SessionError::Invalidated {
                session: self.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for SyncSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.number)
    }
}

impl fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSession")
            .field("number", &self.number)
            .field("tracked", &self.tracked_count())
            .field("invalidated", &self.is_invalidated())
            .finish()
    }
}
