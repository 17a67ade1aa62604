use ringkv_membership::{MembershipSnapshot, NodeState};

use crate::state::AppState;

/// Fetches the seed's `/nodes` once and merges it into the local view. A
/// response at all proves the seed is up, so if its own view is somehow
/// missing itself, it is added as `ready` rather than dropped by the merge.
pub async fn join_via_seed(state: &AppState, seed: &str) {
    if seed == state.membership.self_addr() {
        return;
    }
    match state.http.get(format!("{seed}/nodes")).send().await {
        Ok(response) => match response.json::<MembershipSnapshot>().await {
            Ok(mut seed_view) => {
                seed_view.nodes.insert(seed.to_string());
                seed_view.states.entry(seed.to_string()).or_insert(NodeState::Ready);
                state.membership.merge_gossip(&seed_view);
                tracing::info!(category = "gossip", seed = %seed, "bootstrap merge complete");
            }
            Err(e) => tracing::error!(category = "gossip", seed = %seed, error = %e, "malformed seed /nodes response"),
        },
        Err(e) => tracing::error!(category = "gossip", seed = %seed, error = %e, "failed to reach seed"),
    }
}
