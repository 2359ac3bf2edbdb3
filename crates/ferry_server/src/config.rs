//! Registry configuration.

use ferry_engine::SessionConfig;
use std::time::Duration;

/// Configuration for a session registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Template for every session the registry creates.
    pub session: SessionConfig,
    /// How often the reaper looks for timed-out sessions.
    pub reap_interval: Duration,
}

impl RegistryConfig {
    /// Creates a configuration with default session settings.
    pub fn new() -> Self {
        Self {
            session: SessionConfig::default(),
            reap_interval: Duration::from_secs(30),
        }
    }

    /// Sets the session template.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Sets the reap interval.
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}
