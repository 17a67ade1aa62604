use std::sync::Arc;

use ringkv_membership::MembershipSnapshot;

use crate::state::AppState;

/// Runs forever: polls the seed node's `/nodes` on `RING_UPDATE_INTERVAL`
/// and replaces the gateway's membership snapshot wholesale. The gateway
/// is otherwise stateless; this is its only piece of mutable state.
pub async fn run(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(state.config.ring_update_interval);
    loop {
        interval.tick().await;
        poll_once(&state).await;
    }
}

async fn poll_once(state: &AppState) {
    let url = format!("{}/nodes", state.config.seed_node);
    match state.http.get(&url).send().await {
        Ok(response) if response.status().is_success() => match response.json::<MembershipSnapshot>().await {
            Ok(snapshot) => {
                let ready_count = snapshot.ready_nodes().count();
                state.membership.replace_snapshot(snapshot);
                tracing::debug!(category = "membership", ready_nodes = ready_count, "membership refreshed");
            }
            Err(e) => tracing::warn!(category = "membership", error = %e, "malformed /nodes response"),
        },
        Ok(response) => {
            tracing::warn!(category = "membership", status = response.status().as_u16(), "seed rejected /nodes poll");
        }
        Err(e) => {
            tracing::warn!(category = "membership", seed = %state.config.seed_node, error = %e, "failed to poll seed");
        }
    }
}
