use ringkv_membership::MembershipSnapshot;
use sha1::{Digest, Sha1};

const DEFAULT_NUM_VNODES: usize = 16;

#[derive(Debug, Clone)]
struct RingEntry {
    hash: [u8; 20],
    addr: String,
}

/// An immutable consistent-hash ring built from one membership snapshot.
///
/// Purely functional: rebuilding from the same snapshot and `num_vnodes`
/// always produces the same ring, so callers may snapshot one per incoming
/// request and reuse it across that request's fan-out instead of paying for
/// a rebuild per RPC.
#[derive(Debug, Clone)]
pub struct Ring {
    entries: Vec<RingEntry>,
}

impl Ring {
    /// Builds the ring from `snapshot`'s ready, non-dead nodes: `num_vnodes`
    /// labels `"<addr>-vn<i>"` per node, each hashed via SHA-1 to a 160-bit
    /// integer, sorted ascending with ties broken by the node's original
    /// insertion order (the snapshot's sorted `BTreeSet` iteration order).
    pub fn build(snapshot: &MembershipSnapshot, num_vnodes: usize) -> Self {
        let mut entries = Vec::with_capacity(snapshot.nodes.len() * num_vnodes);
        for addr in snapshot.ready_nodes() {
            for i in 0..num_vnodes {
                let label = format!("{addr}-vn{i}");
                let mut hasher = Sha1::new();
                hasher.update(label.as_bytes());
                let digest = hasher.finalize();
                let mut hash = [0u8; 20];
                hash.copy_from_slice(&digest);
                entries.push(RingEntry { hash, addr: addr.clone() });
            }
        }
        entries.sort_by(|a, b| a.hash.cmp(&b.hash));
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Distinct node addresses represented on the ring, in ring order
    /// (duplicates from other virtual nodes removed, first occurrence kept).
    pub fn node_refs(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.addr.clone()))
            .map(|e| e.addr.clone())
            .collect()
    }

    /// Hex-encoded vnode hashes in ring order, for the `/ring` debug
    /// endpoint.
    pub fn hex_hashes(&self) -> Vec<String> {
        self.entries.iter().map(|e| hex::encode(e.hash)).collect()
    }

    /// The first `replication_factor` *distinct* addresses walking the ring
    /// clockwise from the bisection point of `key`'s hash. If fewer than
    /// `replication_factor` distinct addresses exist, returns all of them.
    pub fn owners(&self, key: &str, replication_factor: usize) -> Vec<String> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let mut hasher = Sha1::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        let mut key_hash = [0u8; 20];
        key_hash.copy_from_slice(&digest);

        let start = self.entries.partition_point(|e| e.hash < key_hash);

        let mut owners = Vec::with_capacity(replication_factor);
        for offset in 0..self.entries.len() {
            let idx = (start + offset) % self.entries.len();
            let addr = &self.entries[idx].addr;
            if !owners.contains(addr) {
                owners.push(addr.clone());
            }
            if owners.len() == replication_factor {
                break;
            }
        }
        owners
    }
}

pub fn default_num_vnodes() -> usize {
    DEFAULT_NUM_VNODES
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringkv_membership::NodeState;

    fn ready_snapshot(addrs: &[&str]) -> MembershipSnapshot {
        let mut snap = MembershipSnapshot::default();
        for addr in addrs {
            snap.nodes.insert(addr.to_string());
            snap.states.insert(addr.to_string(), NodeState::Ready);
        }
        snap
    }

    #[test]
    fn empty_ring_has_no_owners() {
        let ring = Ring::build(&MembershipSnapshot::default(), 16);
        assert!(ring.owners("k", 3).is_empty());
    }

    #[test]
    fn joining_nodes_are_excluded_from_the_ring() {
        let mut snap = MembershipSnapshot::default();
        snap.nodes.insert("http://a:1".to_string());
        snap.states.insert("http://a:1".to_string(), NodeState::Joining);
        let ring = Ring::build(&snap, 16);
        assert!(ring.is_empty());
    }

    #[test]
    fn owners_returns_distinct_addresses_up_to_replication_factor() {
        let snap = ready_snapshot(&["http://a:1", "http://b:1", "http://c:1"]);
        let ring = Ring::build(&snap, 16);
        let owners = ring.owners("some-key", 3);
        assert_eq!(owners.len(), 3);
        let unique: std::collections::HashSet<_> = owners.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn owners_caps_at_available_distinct_nodes() {
        let snap = ready_snapshot(&["http://a:1"]);
        let ring = Ring::build(&snap, 16);
        assert_eq!(ring.owners("k", 3), vec!["http://a:1".to_string()]);
    }

    #[test]
    fn ring_build_is_deterministic() {
        let snap = ready_snapshot(&["http://a:1", "http://b:1"]);
        let ring1 = Ring::build(&snap, 16);
        let ring2 = Ring::build(&snap, 16);
        assert_eq!(ring1.hex_hashes(), ring2.hex_hashes());
        assert_eq!(ring1.owners("key-1", 2), ring2.owners("key-1", 2));
    }

    #[test]
    fn node_refs_are_unique_and_match_ready_set() {
        let snap = ready_snapshot(&["http://a:1", "http://b:1"]);
        let ring = Ring::build(&snap, 16);
        let mut refs = ring.node_refs();
        refs.sort();
        assert_eq!(refs, vec!["http://a:1".to_string(), "http://b:1".to_string()]);
    }
}
