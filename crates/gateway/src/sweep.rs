//! Background expiry sweeps for sessions and terminal tasks.

use std::{sync::Arc, time::Duration};

use {tokio::task::JoinHandle, tracing::info};

use crate::state::GatewayState;

/// Default interval between sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Sweep once immediately, then on every interval tick.
pub fn spawn_sweeper(
    state: Arc<GatewayState>,
    ttl: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            // The first tick fires immediately, covering process start.
            ticker.tick().await;
            let sessions = state.sessions.sweep_expired(ttl);
            let tasks = state.tasks.sweep_expired(ttl);
            if sessions > 0 || tasks > 0 {
                info!(sessions, tasks, "swept expired state");
            }
        }
    })
}
