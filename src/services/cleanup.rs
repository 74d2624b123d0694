//! Periodic sweep of expired attendance sessions

use std::time::Duration;

use tokio::{task::JoinHandle, time::MissedTickBehavior};

use super::sessions::SessionService;

/// Run `deactivate_expired_sessions` every `period` until the runtime shuts down.
/// Failed sweeps are logged and retried on the next tick.
pub fn spawn_session_cleanup(sessions: SessionService, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(period_secs = period.as_secs(), "Session cleanup scheduler started");
        loop {
            ticker.tick().await;
            match sessions.deactivate_expired_sessions().await {
                Ok(0) => tracing::debug!("No expired attendance sessions to deactivate"),
                Ok(count) => tracing::debug!(count, "Session cleanup sweep finished"),
                Err(e) => tracing::error!("Session cleanup sweep failed: {}", e),
            }
        }
    })
}
