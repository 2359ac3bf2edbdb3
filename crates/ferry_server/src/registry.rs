//! Registry of the sync sessions of one host scope.

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use ferry_engine::{ExistenceOracle, SendReport, SyncSession, TransferableEntity};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Numbers, stores and reaps sync sessions.
///
/// Session numbers start at 1 and are never reused within a registry.
pub struct SessionRegistry {
    config: RegistryConfig,
    sessions: RwLock<HashMap<u32, Arc<SyncSession>>>,
    next_number: AtomicU32,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            next_number: AtomicU32::new(1),
        }
    }

    /// Registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Creates and registers a session with default policies.
    pub fn create_session(&self) -> Arc<SyncSession> {
        self.create_session_with(|session| session)
    }

    /// Creates a session, lets `customize` install policies, and registers it.
    pub fn create_session_with(
        &self,
        customize: impl FnOnce(SyncSession) -> SyncSession,
    ) -> Arc<SyncSession> {
        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(customize(SyncSession::new(
            number,
            self.config.session.clone(),
        )));
        self.sessions.write().insert(number, Arc::clone(&session));
        info!(session = %session, "session created");
        session
    }

    /// Looks up a session.
    pub fn get(&self, number: u32) -> RegistryResult<Arc<SyncSession>> {
        self.sessions
            .read()
            .get(&number)
            .cloned()
            .ok_or(RegistryError::UnknownSession(number))
    }

    /// Looks up a session for a client interaction and marks it active.
    ///
    /// A session that already timed out is reaped instead.
    pub fn get_and_touch(&self, number: u32) -> RegistryResult<Arc<SyncSession>> {
        let session = self.get(number)?;
        if session.is_timed_out() {
            self.remove(number)?;
            return Err(RegistryError::UnknownSession(number));
        }
        session.touch();
        Ok(session)
    }

    /// Unregisters and invalidates a session.
    pub fn remove(&self, number: u32) -> RegistryResult<()> {
        let session = self
            .sessions
            .write()
            .remove(&number)
            .ok_or(RegistryError::UnknownSession(number))?;
        session.invalidate();
        Ok(())
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// All sessions, most recently touched first.
    pub fn sessions_by_recency(&self) -> Vec<Arc<SyncSession>> {
        let mut sessions: Vec<_> = self.sessions.read().values().cloned().collect();
        sessions.sort_by(|a, b| a.cmp_recency(b));
        sessions
    }

    /// Unregisters and invalidates every timed-out session.
    ///
    /// Returns the numbers of the reaped sessions in ascending order.
    pub fn reap_timed_out(&self) -> Vec<u32> {
        let reaped: Vec<Arc<SyncSession>> = {
            let mut sessions = self.sessions.write();
            let expired: Vec<u32> = sessions
                .iter()
                .filter(|(_, session)| session.is_timed_out())
                .map(|(number, _)| *number)
                .collect();
            expired
                .iter()
                .filter_map(|number| sessions.remove(number))
                .collect()
        };

        let mut numbers: Vec<u32> = reaped
            .iter()
            .map(|session| {
                session.invalidate();
                session.number()
            })
            .collect();
        numbers.sort_unstable();
        if !numbers.is_empty() {
            info!(count = numbers.len(), sessions = ?numbers, "reaped timed-out sessions");
        }
        numbers
    }

    /// Propagates an update to every session whose client holds the entity.
    ///
    /// Sessions that may no longer see the entity are skipped with a warning.
    pub fn send_if_tracking_all(
        &self,
        tx: &dyn ExistenceOracle,
        entity: &dyn TransferableEntity,
    ) -> SendReport {
        let mut report = SendReport::default();
        for session in self.snapshot() {
            match session.send_if_tracking(tx, entity) {
                Ok(sent) => report += sent,
                Err(e) => warn!(session = %session, entity = entity.id(), error = %e, "update not propagated"),
            }
        }
        report
    }

    /// Tells every client to drop an entity.
    pub fn delete_from_all(&self, entity_id: &str) {
        for session in self.snapshot() {
            session.delete_from_client(entity_id);
        }
        debug!(entity = entity_id, "deleted from all sessions");
    }

    /// Unregisters and invalidates every session.
    pub fn invalidate_all(&self) {
        let drained: Vec<_> = self.sessions.write().drain().map(|(_, s)| s).collect();
        for session in drained {
            session.invalidate();
        }
    }

    fn snapshot(&self) -> Vec<Arc<SyncSession>> {
        self.sessions.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_engine::{ManualClock, SessionConfig};
    use std::time::Duration;

    fn registry_with_clock() -> (SessionRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = RegistryConfig::new().with_session(
            SessionConfig::new()
                .with_timeout(Duration::from_secs(120))
                .with_clock(clock.clone()),
        );
        (SessionRegistry::new(config), clock)
    }

    #[test]
    fn numbers_increase() {
        let (registry, _) = registry_with_clock();
        let a = registry.create_session();
        let b = registry.create_session();
        assert_eq!((a.number(), b.number()), (1, 2));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_session() {
        let (registry, _) = registry_with_clock();
        assert_eq!(
            registry.get(5).unwrap_err(),
            RegistryError::UnknownSession(5)
        );
        assert!(registry.remove(5).is_err());
    }

    #[test]
    fn remove_invalidates() {
        let (registry, _) = registry_with_clock();
        let session = registry.create_session();
        registry.remove(session.number()).unwrap();
        assert!(session.is_invalidated());
        assert!(registry.is_empty());
    }

    #[test]
    fn reap_only_idle_sessions() {
        let (registry, clock) = registry_with_clock();
        let idle = registry.create_session();
        let busy = registry.create_session();

        clock.advance(Duration::from_secs(100));
        registry.get_and_touch(busy.number()).unwrap();
        clock.advance(Duration::from_secs(30));

        assert_eq!(registry.reap_timed_out(), vec![idle.number()]);
        assert!(idle.is_invalidated());
        assert!(!busy.is_invalidated());
        assert!(registry.reap_timed_out().is_empty());
    }

    #[test]
    fn touching_expired_session_reaps_it() {
        let (registry, clock) = registry_with_clock();
        let session = registry.create_session();
        clock.advance(Duration::from_secs(121));

        assert!(registry.get_and_touch(session.number()).is_err());
        assert!(session.is_invalidated());
        assert!(registry.is_empty());
    }

    #[test]
    fn recency_order() {
        let (registry, clock) = registry_with_clock();
        let first = registry.create_session();
        let second = registry.create_session();
        clock.advance(Duration::from_secs(1));
        first.touch();

        let order: Vec<u32> = registry
            .sessions_by_recency()
            .iter()
            .map(|s| s.number())
            .collect();
        assert_eq!(order, vec![first.number(), second.number()]);
    }

    #[test]
    fn invalidate_all_empties_registry() {
        let (registry, _) = registry_with_clock();
        let a = registry.create_session();
        let b = registry.create_session();
        registry.invalidate_all();
        assert!(registry.is_empty());
        assert!(a.is_invalidated() && b.is_invalidated());
    }
}
