use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A node's membership lifecycle state. Only `Ready` nodes serve reads and
/// writes and count toward quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Joining,
    Ready,
}

/// The wire-level gossip payload: `{nodes, states, dead_nodes}`, exchanged
/// verbatim between `/gossip` peers and served from `/nodes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipSnapshot {
    pub nodes: BTreeSet<String>,
    pub states: BTreeMap<String, NodeState>,
    pub dead_nodes: BTreeSet<String>,
}

impl MembershipSnapshot {
    pub fn for_self(self_addr: &str) -> Self {
        let mut snapshot = Self::default();
        snapshot.nodes.insert(self_addr.to_string());
        snapshot.states.insert(self_addr.to_string(), NodeState::Joining);
        snapshot
    }

    pub fn ready_nodes(&self) -> impl Iterator<Item = &String> {
        self.nodes
            .iter()
            .filter(move |addr| matches!(self.states.get(*addr), Some(NodeState::Ready)))
    }

    pub fn is_ready(&self, addr: &str) -> bool {
        matches!(self.states.get(addr), Some(NodeState::Ready))
    }

    pub fn is_dead(&self, addr: &str) -> bool {
        self.dead_nodes.contains(addr)
    }
}

/// Merges an incoming gossip view into `base`, per the ingest rules:
/// dead supersedes live, states are adopted unconditionally unless the
/// address is dead, and `known_nodes` is unioned after dead eviction.
///
/// This is a pure function so it can be table-tested without any lock or
/// network involved; `Membership::merge_gossip` is the stateful wrapper
/// that calls it under the write lock.
pub fn merge(base: &MembershipSnapshot, incoming: &MembershipSnapshot) -> MembershipSnapshot {
    let mut dead_nodes = base.dead_nodes.clone();
    dead_nodes.extend(incoming.dead_nodes.iter().cloned());

    let mut nodes: BTreeSet<String> = base
        .nodes
        .iter()
        .chain(incoming.nodes.iter())
        .filter(|addr| !dead_nodes.contains(*addr))
        .cloned()
        .collect();

    let mut states: BTreeMap<String, NodeState> = base
        .states
        .iter()
        .filter(|(addr, _)| !dead_nodes.contains(*addr))
        .map(|(addr, state)| (addr.clone(), *state))
        .collect();

    for (addr, state) in &incoming.states {
        if !dead_nodes.contains(addr) {
            states.insert(addr.clone(), *state);
        }
    }

    // A dead node can never be re-admitted by this merge; nodes without a
    // state entry are dropped since `states` excluding an address means
    // "absent" per the data model.
    nodes.retain(|addr| states.contains_key(addr));

    MembershipSnapshot { nodes, states, dead_nodes }
}
