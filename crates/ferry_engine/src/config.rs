//! Configuration for sync sessions.

use crate::clock::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Idle time after which a session counts as timed out.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Configuration for a sync session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time after which the session is timed out.
    pub timeout: Duration,
    /// Development-mode flag stamped on every batch.
    pub development_mode: bool,
    /// Time source for liveness bookkeeping.
    pub clock: Arc<dyn Clock>,
}

impl SessionConfig {
    /// Creates a configuration with the default timeout and system clock.
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            development_mode: false,
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets the idle timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the development-mode flag.
    pub fn with_development_mode(mut self, enabled: bool) -> Self {
        self.development_mode = enabled;
        self
    }

    /// Sets the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(!config.development_mode);
    }

    #[test]
    fn config_builder() {
        let clock = Arc::new(ManualClock::new());
        let config = SessionConfig::new()
            .with_timeout(Duration::from_secs(30))
            .with_development_mode(true)
            .with_clock(clock.clone());

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.development_mode);
        assert_eq!(config.clock.now(), clock.now());
    }
}
