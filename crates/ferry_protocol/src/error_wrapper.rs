//! Application-level diagnostics delivered alongside batch data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user-visible error that travels with the next batch instead of
/// aborting the transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorWrapper {
    /// Short error kind, e.g. the error type name.
    pub name: String,
    /// Human readable message.
    pub message: String,
}

impl ErrorWrapper {
    /// Creates a new error wrapper.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Wraps any error, folding its source chain into the message.
    pub fn from_error(name: impl Into<String>, error: &dyn std::error::Error) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::new(name, message)
    }
}

impl fmt::Display for ErrorWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "save failed")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn from_error_includes_sources() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        let wrapped = ErrorWrapper::from_error("SaveError", &err);
        assert_eq!(wrapped.name, "SaveError");
        assert_eq!(wrapped.message, "save failed: disk full");
        assert_eq!(wrapped.to_string(), "SaveError: save failed: disk full");
    }
}
