use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::snapshot::{merge, MembershipSnapshot, NodeState};

struct Inner {
    view: MembershipSnapshot,
    last_seen: HashMap<String, Instant>,
    last_refresh: Instant,
    self_addr: String,
}

/// Shared handle to a node's (or gateway's) membership view.
///
/// All mutable state lives behind one `RwLock`, cloned (`Arc`) into every
/// background task and into the Axum router state, per the shared-resource
/// policy: multi-field mutations take the write lock once.
#[derive(Clone)]
pub struct Membership {
    inner: Arc<RwLock<Inner>>,
}

impl Membership {
    /// A fresh node-local view containing only `self_addr` in state
    /// `joining`.
    pub fn new(self_addr: impl Into<String>) -> Self {
        let self_addr = self_addr.into();
        let view = MembershipSnapshot::for_self(&self_addr);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                view,
                last_seen: HashMap::new(),
                last_refresh: Instant::now(),
                self_addr,
            })),
        }
    }

    /// An empty gateway-side view, populated by the first `replace_snapshot`
    /// poll rather than carrying a self address of its own.
    pub fn new_gateway() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                view: MembershipSnapshot::default(),
                last_seen: HashMap::new(),
                last_refresh: Instant::now() - Duration::from_secs(3600),
                self_addr: String::new(),
            })),
        }
    }

    pub fn self_addr(&self) -> String {
        self.inner.read().unwrap().self_addr.clone()
    }

    pub fn snapshot(&self) -> MembershipSnapshot {
        self.inner.read().unwrap().view.clone()
    }

    /// Merges an incoming gossip payload into the local view, returning the
    /// merged snapshot to send back to the peer as the gossip reply.
    ///
    /// Any node newly introduced by this merge gets a `last_seen` baseline of
    /// now, so a peer that is already unreachable by the time the first
    /// health check runs still has a `DEAD_TIMEOUT` clock to expire against
    /// instead of sitting at `last_seen = None` forever.
    pub fn merge_gossip(&self, incoming: &MembershipSnapshot) -> MembershipSnapshot {
        let mut inner = self.inner.write().unwrap();
        inner.view = merge(&inner.view, incoming);
        let now = Instant::now();
        for addr in inner.view.nodes.clone() {
            inner.last_seen.entry(addr).or_insert(now);
        }
        inner.view.clone()
    }

    pub fn set_state(&self, addr: &str, state: NodeState) {
        let mut inner = self.inner.write().unwrap();
        inner.view.nodes.insert(addr.to_string());
        inner.view.states.insert(addr.to_string(), state);
    }

    pub fn mark_ready(&self, addr: &str) {
        self.set_state(addr, NodeState::Ready);
    }

    pub fn mark_last_seen(&self, addr: &str) {
        self.inner.write().unwrap().last_seen.insert(addr.to_string(), Instant::now());
    }

    /// Moves `addr` into the dead set if it hasn't answered in over
    /// `dead_timeout`. The self address is never marked dead by this path.
    pub fn evict_if_dead(&self, addr: &str, dead_timeout: Duration) {
        let mut inner = self.inner.write().unwrap();
        if addr == inner.self_addr {
            return;
        }
        let stale = match inner.last_seen.get(addr) {
            Some(seen) => seen.elapsed() > dead_timeout,
            None => false,
        };
        if stale {
            inner.view.dead_nodes.insert(addr.to_string());
            inner.view.nodes.remove(addr);
            inner.view.states.remove(addr);
        }
    }

    pub fn peers(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap();
        inner.view.nodes.iter().filter(|addr| *addr != &inner.self_addr).cloned().collect()
    }

    /// Replaces the whole view in one shot (the gateway's poll model) and
    /// resets the staleness clock used by the ring-stability gate.
    pub fn replace_snapshot(&self, snapshot: MembershipSnapshot) {
        let mut inner = self.inner.write().unwrap();
        inner.view = snapshot;
        inner.last_refresh = Instant::now();
    }

    pub fn refresh_age(&self) -> Duration {
        self.inner.read().unwrap().last_refresh.elapsed()
    }

    pub fn is_stable(&self, stable_period: Duration) -> bool {
        let inner = self.inner.read().unwrap();
        inner.last_refresh.elapsed() <= stable_period && inner.view.ready_nodes().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn new_membership_starts_joining_with_self_only() {
        let m = Membership::new("http://a:1");
        let snap = m.snapshot();
        assert_eq!(snap.nodes, std::collections::BTreeSet::from(["http://a:1".to_string()]));
        assert!(!snap.is_ready("http://a:1"));
    }

    #[test]
    fn mark_ready_transitions_self() {
        let m = Membership::new("http://a:1");
        m.mark_ready("http://a:1");
        assert!(m.snapshot().is_ready("http://a:1"));
    }

    #[test]
    fn peers_excludes_self() {
        let m = Membership::new("http://a:1");
        m.merge_gossip(&MembershipSnapshot::for_self("http://b:1"));
        let peers = m.peers();
        assert_eq!(peers, vec!["http://b:1".to_string()]);
    }

    #[test]
    fn evict_if_dead_never_marks_self() {
        let m = Membership::new("http://a:1");
        m.evict_if_dead("http://a:1", Duration::from_secs(0));
        assert!(m.snapshot().nodes.contains("http://a:1"));
    }

    #[test]
    fn evict_if_dead_moves_stale_peer_to_dead_set() {
        let m = Membership::new("http://a:1");
        m.merge_gossip(&MembershipSnapshot::for_self("http://b:1"));
        m.mark_last_seen("http://b:1");
        sleep(Duration::from_millis(5));
        m.evict_if_dead("http://b:1", Duration::from_millis(1));
        let snap = m.snapshot();
        assert!(snap.dead_nodes.contains("http://b:1"));
        assert!(!snap.nodes.contains("http://b:1"));
    }

    #[test]
    fn a_peer_never_successfully_contacted_still_expires() {
        // merge_gossip seeds last_seen on discovery, so a peer that is down
        // from the very first health check still has a clock to expire
        // against instead of living forever at last_seen = None.
        let m = Membership::new("http://a:1");
        m.merge_gossip(&MembershipSnapshot::for_self("http://b:1"));
        sleep(Duration::from_millis(5));
        m.evict_if_dead("http://b:1", Duration::from_millis(1));
        assert!(m.snapshot().dead_nodes.contains("http://b:1"));
    }

    #[test]
    fn is_stable_requires_recent_refresh_and_a_ready_node() {
        let m = Membership::new_gateway();
        assert!(!m.is_stable(Duration::from_secs(5)));

        let mut snap = MembershipSnapshot::for_self("http://a:1");
        snap.states.insert("http://a:1".to_string(), NodeState::Ready);
        m.replace_snapshot(snap);
        assert!(m.is_stable(Duration::from_secs(5)));
    }
}
