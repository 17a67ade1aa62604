use std::time::Duration;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use rand::seq::SliceRandom;
use ringkv_admission::retry;
use ringkv_base::{InternalGetResponse, InternalSetRequest, InternalSetResponse, Record};

use crate::state::AppState;

/// `W = R = floor(N'/2)+1` where `N' = owners.len()`.
pub fn quorum(owner_count: usize) -> usize {
    owner_count / 2 + 1
}

/// Fans out `SET` to `owners` concurrently, each owner contacted in
/// randomized order with its own spawned task so a client disconnect can't
/// retract an already-dispatched replication RPC.
pub async fn coordinate_set(
    state: &AppState,
    owners: Vec<String>,
    key: &str,
    value: &str,
    ts: f64,
    request_id: &str,
) -> (usize, Vec<String>) {
    let mut shuffled = owners;
    shuffled.shuffle(&mut rand::thread_rng());

    let tasks = shuffled.into_iter().map(|owner| {
        let state = state.clone();
        let key = key.to_string();
        let value = value.to_string();
        let request_id = request_id.to_string();
        tokio::spawn(async move { set_on_owner(&state, &owner, &key, &value, ts, &request_id).await })
    });

    let results = futures::future::join_all(tasks).await;
    let mut successes = 0;
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(Ok(())) => successes += 1,
            Ok(Err(msg)) => errors.push(msg),
            Err(join_err) => errors.push(join_err.to_string()),
        }
    }
    (successes, errors)
}

async fn set_on_owner(state: &AppState, owner: &str, key: &str, value: &str, ts: f64, request_id: &str) -> Result<(), String> {
    let url = format!("{owner}/internal/set");
    let body = InternalSetRequest {
        key: key.to_string(),
        value: value.to_string(),
        ts,
        request_id: request_id.to_string(),
    };
    let http = state.http.clone();
    retry(4, Duration::from_millis(50), Duration::from_millis(50), |e: &String| e == "retryable", move || {
        let http = http.clone();
        let url = url.clone();
        let body = body.clone();
        async move {
            let response = http.post(&url).json(&body).send().await.map_err(|_| "retryable".to_string())?;
            if response.status().as_u16() == 503 {
                return Err("retryable".to_string());
            }
            if !response.status().is_success() {
                return Err(response.status().to_string());
            }
            response.json::<InternalSetResponse>().await.map_err(|e| e.to_string())?;
            Ok(())
        }
    })
    .await
}

/// Fans out `GET` to `owners`, short-circuiting once `r` successful results
/// with a non-null value have been collected, or all owners have responded.
pub async fn coordinate_get(state: &AppState, owners: Vec<String>, key: &str, r: usize) -> Option<Record> {
    let mut shuffled = owners;
    shuffled.shuffle(&mut rand::thread_rng());

    let mut futs = FuturesUnordered::new();
    for owner in shuffled {
        let state = state.clone();
        let key = key.to_string();
        futs.push(tokio::spawn(async move { get_from_owner(&state, &owner, &key).await }));
    }

    let mut best: Option<Record> = None;
    let mut collected = 0;
    while let Some(joined) = futs.next().await {
        if let Ok(Some(record)) = joined {
            collected += 1;
            best = match best {
                Some(current)
                    if !ringkv_base::dominates(record.ts_nanos(), &record.request_id, current.ts_nanos(), &current.request_id) =>
                {
                    Some(current)
                }
                _ => Some(record),
            };
            if collected >= r {
                break;
            }
        }
    }
    best
}

async fn get_from_owner(state: &AppState, owner: &str, key: &str) -> Option<Record> {
    let url = format!("{owner}/internal/get");
    let response = state.http.get(&url).query(&[("key", key)]).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body: InternalGetResponse = response.json().await.ok()?;
    body.value
}
