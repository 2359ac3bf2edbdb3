//! Error types for the session registry.

use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur in the session registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No live session has this number.
    #[error("unknown session #{0}")]
    UnknownSession(u32),
}

impl RegistryError {
    /// Returns true if the client should start a new session.
    pub fn requires_new_session(&self) -> bool {
        matches!(self, RegistryError::UnknownSession(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RegistryError::UnknownSession(12);
        assert_eq!(err.to_string(), "unknown session #12");
        assert!(err.requires_new_session());
    }
}
