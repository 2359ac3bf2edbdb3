//! Error types for sync sessions.

use ferry_protocol::ProtocolError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur while feeding a session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The visibility policy rejected the entity.
    #[error("entity {entity_id} is not visible in session {session}")]
    PermissionDenied {
        /// Rejected entity.
        entity_id: String,
        /// Session the entity was sent to.
        session: String,
    },

    /// The entity snapshot could not be queued.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The session was invalidated and accepts no more data.
    #[error("session {session} is invalidated")]
    Invalidated {
        /// Invalidated session.
        session: String,
    },
}

impl SessionError {
    /// Returns true for visibility violations.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, SessionError::PermissionDenied { .. })
    }
}
