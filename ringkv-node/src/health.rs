use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Runs forever: GETs `/status` on every known peer, marking it dead if it
/// hasn't answered within `dead_timeout`. Never marks the self address dead.
pub async fn run(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    loop {
        interval.tick().await;
        check_once(&state).await;
    }
}

async fn check_once(state: &AppState) {
    for peer in state.membership.peers() {
        let url = format!("{peer}/status");
        match state.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                state.membership.mark_last_seen(&peer);
            }
            Ok(response) => {
                tracing::debug!(category = "health", peer = %peer, status = response.status().as_u16(), "peer unhealthy");
                state.membership.evict_if_dead(&peer, state.config.dead_timeout);
            }
            Err(e) => {
                tracing::debug!(category = "health", peer = %peer, error = %e, "peer unreachable");
                state.membership.evict_if_dead(&peer, state.config.dead_timeout);
            }
        }
    }
}
