use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use ringkv_base::{GetManyRequest, InternalGetResponse, Record};
use ringkv_membership::NodeState;
use ringkv_ring::Ring;

use crate::state::AppState;

const BACKGROUND_SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// Runs once at startup, before this node transitions `joining -> ready`.
/// Owners are resolved against the ring this node will have *once ready*
/// (self's state is simulated as `ready` for this computation only) so
/// that a brand-new node can determine which keys it is about to own.
pub async fn initial_sync(state: &AppState) {
    let self_addr = state.membership.self_addr();
    let live = state.membership.snapshot();
    let ready_peers: Vec<String> = live.ready_nodes().filter(|addr| **addr != self_addr).cloned().collect();

    if ready_peers.is_empty() {
        tracing::info!(category = "anti_entropy", "no ready peers found; nothing to sync");
        state.membership.mark_ready(&self_addr);
        return;
    }

    let mut simulated = live.clone();
    simulated.nodes.insert(self_addr.clone());
    simulated.states.insert(self_addr.clone(), NodeState::Ready);
    let ring = Ring::build(&simulated, state.config.cluster.num_vnodes);
    let replication_factor = state.config.cluster.replication_factor;

    let local_keys: HashSet<String> = state.store.all_keys().await.unwrap_or_default().into_iter().collect();
    let mut missing: HashSet<String> = HashSet::new();
    let mut peer_key_sets = Vec::new();

    for peer in &ready_peers {
        match fetch_all_keys(state, peer).await {
            Ok(keys) => {
                for key in &keys {
                    if !local_keys.contains(key) && ring.owners(key, replication_factor).contains(&self_addr) {
                        missing.insert(key.clone());
                    }
                }
                peer_key_sets.push((peer.clone(), keys.into_iter().collect::<HashSet<_>>()));
            }
            Err(e) => tracing::warn!(category = "anti_entropy", peer = %peer, error = %e, "failed to fetch all_keys"),
        }
    }

    for (peer, keys) in &peer_key_sets {
        if missing.is_empty() {
            break;
        }
        let subset: Vec<String> = missing.iter().filter(|k| keys.contains(*k)).cloned().collect();
        if subset.is_empty() {
            continue;
        }
        match fetch_get_many(state, peer, &subset).await {
            Ok(records) => {
                for (key, record) in records {
                    if let Err(e) = state.store.put_if_newer(&key, &record.value, record.ts, &record.request_id).await {
                        tracing::warn!(category = "anti_entropy", key = %key, error = %e, "failed to apply synced record");
                        continue;
                    }
                    missing.remove(&key);
                }
            }
            Err(e) => tracing::warn!(category = "anti_entropy", peer = %peer, error = %e, "get_many failed during initial sync"),
        }
    }

    if !missing.is_empty() {
        tracing::warn!(category = "anti_entropy", remaining = missing.len(), "initial sync finished with unresolved keys");
    }
    tracing::info!(category = "anti_entropy", "initial sync complete");
    state.membership.mark_ready(&self_addr);
}

/// Runs forever after this node is ready: for every key this node owns,
/// pulls the remote copy if it is locally absent or older.
pub async fn run(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(BACKGROUND_SYNC_INTERVAL);
    loop {
        interval.tick().await;
        background_sync_once(&state).await;
    }
}

async fn background_sync_once(state: &AppState) {
    let self_addr = state.membership.self_addr();
    let snapshot = state.membership.snapshot();
    let ring = Ring::build(&snapshot, state.config.cluster.num_vnodes);
    let replication_factor = state.config.cluster.replication_factor;

    for peer in snapshot.ready_nodes().filter(|addr| **addr != self_addr) {
        let keys = match fetch_all_keys(state, peer).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(category = "anti_entropy", peer = %peer, error = %e, "background sync fetch failed");
                continue;
            }
        };

        for key in keys {
            if !ring.owners(&key, replication_factor).contains(&self_addr) {
                continue;
            }
            let local = state.store.get(&key).await.ok().flatten();
            let remote = match fetch_get(state, peer, &key).await {
                Ok(Some(record)) => record,
                _ => continue,
            };
            let needs_pull = match &local {
                None => true,
                Some(l) => remote.ts > l.ts,
            };
            if needs_pull {
                if let Err(e) = state.store.put_if_newer(&key, &remote.value, remote.ts, &remote.request_id).await {
                    tracing::warn!(category = "anti_entropy", key = %key, error = %e, "background sync apply failed");
                }
            }
        }
    }
}

async fn fetch_all_keys(state: &AppState, peer: &str) -> reqwest::Result<Vec<String>> {
    state.http.get(format!("{peer}/internal/all_keys")).send().await?.json().await
}

async fn fetch_get(state: &AppState, peer: &str, key: &str) -> reqwest::Result<Option<Record>> {
    let body: InternalGetResponse = state
        .http
        .get(format!("{peer}/internal/get"))
        .query(&[("key", key)])
        .send()
        .await?
        .json()
        .await?;
    Ok(body.value)
}

async fn fetch_get_many(state: &AppState, peer: &str, keys: &[String]) -> reqwest::Result<HashMap<String, Record>> {
    state
        .http
        .post(format!("{peer}/internal/get_many"))
        .json(&GetManyRequest { keys: keys.to_vec() })
        .send()
        .await?
        .json()
        .await
}
