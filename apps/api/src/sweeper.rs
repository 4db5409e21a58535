//! Periodic reclamation of expired throttling and lockout state.

use std::time::Duration;

use rantboard_core::AppResult;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api_config::ApiConfig;
use crate::state::AppState;

/// Runs `task` every `period` until `token` is cancelled. The first run
/// happens one full period after spawning.
pub fn spawn_sweeper<F>(
    name: &'static str,
    period: Duration,
    task: F,
    token: CancellationToken,
) -> JoinHandle<()>
where
    F: Fn() -> AppResult<usize> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(sweeper = name, "sweeper stopped");
                    break;
                }
                _ = ticker.tick() => match task() {
                    Ok(0) => {}
                    Ok(removed) => info!(sweeper = name, removed, "expired entries swept"),
                    Err(error) => warn!(sweeper = name, %error, "sweep failed"),
                },
            }
        }
    })
}

/// Starts the rate limit and login lockout sweepers.
pub fn spawn_sweepers(
    state: &AppState,
    config: &ApiConfig,
    token: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    let rate_limits = state.rate_limit_service.clone();
    let admin_lockouts = state.admin_auth.lockout().clone();
    let user_lockouts = state.user_auth.lockout().clone();

    vec![
        spawn_sweeper(
            "rate_limit",
            config.rate_limit_sweep_interval,
            move || rate_limits.sweep_expired(),
            token.clone(),
        ),
        spawn_sweeper(
            "login_lockout",
            config.lockout_sweep_interval,
            move || Ok(admin_lockouts.sweep_expired()? + user_lockouts.sweep_expired()?),
            token.clone(),
        ),
    ]
}
