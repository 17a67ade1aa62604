use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;

use crate::state::AppState;

const BROADCAST_INTERVAL: Duration = Duration::from_secs(2);

fn fanout(peer_count: usize) -> usize {
    (peer_count as f64).sqrt().floor().max(1.0).min(3.0) as usize
}

/// Runs forever: every tick, gossips the local view to a random subset of
/// peers and merges back whatever they return.
pub async fn run(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(BROADCAST_INTERVAL);
    loop {
        interval.tick().await;
        broadcast_once(&state).await;
    }
}

async fn broadcast_once(state: &AppState) {
    let mut peers = state.membership.peers();
    let n = fanout(peers.len()).min(peers.len());
    if n == 0 {
        return;
    }
    peers.shuffle(&mut rand::thread_rng());
    let targets = &peers[..n];

    for peer in targets {
        let view = state.membership.snapshot();
        let url = format!("{peer}/gossip");
        match state.http.post(&url).json(&view).send().await {
            Ok(response) if response.status().is_success() => match response.json().await {
                Ok(peer_view) => {
                    state.membership.merge_gossip(&peer_view);
                    tracing::debug!(category = "gossip", peer = %peer, "gossip round complete");
                }
                Err(e) => tracing::warn!(category = "gossip", peer = %peer, error = %e, "malformed gossip reply"),
            },
            Ok(response) => {
                tracing::warn!(category = "gossip", peer = %peer, status = response.status().as_u16(), "gossip rejected");
            }
            Err(e) => {
                tracing::warn!(category = "gossip", peer = %peer, error = %e, "gossip request failed");
            }
        }
    }
}
