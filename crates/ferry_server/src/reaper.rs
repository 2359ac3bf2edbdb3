//! Background task evicting timed-out sessions.

use crate::registry::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Spawns a task that reaps timed-out sessions every `reap_interval`.
///
/// Must be called from within a tokio runtime. Abort the returned handle to
/// stop reaping.
pub fn spawn_reaper(registry: Arc<SessionRegistry>) -> JoinHandle<()> {
    let period = registry
        .config()
        .reap_interval
        .max(Duration::from_millis(1));
    info!(?period, "starting session reaper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reaped = registry.reap_timed_out();
            debug!(reaped = reaped.len(), remaining = registry.len(), "reaper tick");
        }
    })
}
