//! Identifier-based routing: peer references and the per-node routing table.
//!
//! A [`PeerRef`] is pure data naming a remote peer; it is never an owning
//! pointer to another node, which keeps the object graph of a running process
//! to exactly one live node. The [`RoutingTable`] holds this node's view of
//! the ring: its successor, its (possibly unknown) predecessor, and a finger
//! table of routing shortcuts, with setters that enforce the invariants of
//! the protocol rather than leaving callers to maintain them by convention.
//!
//! [`PeerRef`]: struct.PeerRef.html
//! [`RoutingTable`]: struct.RoutingTable.html

pub mod identifier;

use self::identifier::Identifier;
use std::fmt;

/// A peer reference: (identifier, host address, port).
///
/// Freely copyable, and never assumed to be live — a `PeerRef` obtained from
/// a finger table or a stabilize round may already be stale by the time it is
/// used.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PeerRef {
    pub identifier: Identifier,
    pub host: String,
    pub port: u16,
}

impl PeerRef {
    pub fn new(identifier: Identifier, host: impl Into<String>, port: u16) -> Self {
        Self {
            identifier,
            host: host.into(),
            port,
        }
    }

    /// The `host:port` string used to dial this peer over TCP.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for PeerRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.identifier, self.socket_addr_string())
    }
}

/// This node's view of the Chord ring: successor, predecessor, and fingers.
///
/// `this` is immutable after construction. `successor` can never be cleared —
/// if the current successor is found dead, a replacement must be chosen
/// before the field can be updated at all. `predecessor` can be cleared to
/// `None`, which is the explicit signal "I do not currently know my
/// predecessor" used by [`check_predecessor`](../../engine/index.html).
pub struct RoutingTable {
    this: PeerRef,
    predecessor: Option<PeerRef>,
    successor: PeerRef,
    fingers: Vec<Option<PeerRef>>,
    next_finger: usize,
    m: u32,
}

impl RoutingTable {
    /// Creates a fresh routing table for a brand new ring: `successor` is
    /// `self`, `predecessor` is unknown, and every finger is empty. This is
    /// Chord's `Create` operation.
    pub fn new(this: PeerRef, m: u32) -> Self {
        let successor = this.clone();

        Self {
            this,
            predecessor: None,
            successor,
            fingers: vec![None; m as usize],
            next_finger: 0,
            m,
        }
    }

    pub fn this(&self) -> &PeerRef {
        &self.this
    }

    pub fn predecessor(&self) -> Option<&PeerRef> {
        self.predecessor.as_ref()
    }

    pub fn set_predecessor(&mut self, predecessor: Option<PeerRef>) {
        self.predecessor = predecessor;
    }

    pub fn successor(&self) -> &PeerRef {
        &self.successor
    }

    /// Replaces the successor. There is no way to clear it: a dead successor
    /// must be replaced by a live candidate, never by nothing.
    pub fn set_successor(&mut self, successor: PeerRef) {
        self.successor = successor;
    }

    pub fn finger(&self, index: usize) -> Option<&PeerRef> {
        self.fingers[index].as_ref()
    }

    pub fn set_finger(&mut self, index: usize, peer: Option<PeerRef>) {
        self.fingers[index] = peer;
    }

    pub fn m(&self) -> u32 {
        self.m
    }

    pub fn next_finger(&self) -> usize {
        self.next_finger
    }

    /// Advances the fix-fingers cursor, cycling through `0..m`.
    pub fn advance_next_finger(&mut self) {
        self.next_finger = (self.next_finger + 1) % self.fingers.len();
    }

    /// Scans fingers from the highest index down, returning the first
    /// non-empty finger whose identifier lies in `(self.id, target)`;
    /// otherwise returns `self`. This is Chord's `closestPrecedingNode`.
    pub fn closest_preceding_node(&self, target: &Identifier) -> PeerRef {
        let self_id = self.this.identifier;

        for finger in self.fingers.iter().rev() {
            if let Some(peer) = finger {
                // (self.id, target) is open at target; `between` is half-open
                // at its upper bound, so exclude an exact match by hand.
                if Identifier::between(&peer.identifier, &self_id, target) && peer.identifier != *target {
                    return peer.clone();
                }
            }
        }

        self.this.clone()
    }

    /// Non-empty `(index, peer)` pairs, for state dumps.
    pub fn live_fingers(&self) -> Vec<(usize, &PeerRef)> {
        self.fingers
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|p| (i, p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(n: u64, m: u32, port: u16) -> PeerRef {
        let mut id = Identifier::zero();
        for _ in 0..n {
            id = id.add_pow2(0, m);
        }
        PeerRef::new(id, "127.0.0.1", port)
    }

    #[test]
    fn create_is_sole_member_of_its_own_ring() {
        let this = peer(0, 3, 1000);
        let table = RoutingTable::new(this.clone(), 3);

        assert_eq!(table.successor(), &this);
        assert!(table.predecessor().is_none());
        assert!(table.live_fingers().is_empty());
    }

    #[test]
    fn successor_cannot_be_cleared() {
        let this = peer(0, 3, 1000);
        let mut table = RoutingTable::new(this.clone(), 3);
        let other = peer(3, 3, 1001);

        table.set_successor(other.clone());

        assert_eq!(table.successor(), &other);
    }

    #[test]
    fn next_finger_cycles_through_m() {
        let this = peer(0, 3, 1000);
        let mut table = RoutingTable::new(this, 3);

        for expected in [1, 2, 0] {
            table.advance_next_finger();
            assert_eq!(table.next_finger(), expected);
        }
    }

    #[test]
    fn closest_preceding_node_prefers_highest_matching_finger() {
        let this = peer(0, 3, 1000);
        let mut table = RoutingTable::new(this, 3);

        let finger_at_2 = peer(2, 3, 1002);
        let finger_at_5 = peer(5, 3, 1005);
        table.set_finger(1, Some(finger_at_2));
        table.set_finger(2, Some(finger_at_5.clone()));

        let target = Identifier::zero().add_pow2(0, 3).add_pow2(1, 3).add_pow2(2, 3); // 7

        assert_eq!(table.closest_preceding_node(&target), finger_at_5);
    }

    #[test]
    fn closest_preceding_node_falls_back_to_self() {
        let this = peer(0, 3, 1000);
        let table = RoutingTable::new(this.clone(), 3);

        let target = peer(5, 3, 0).identifier;

        assert_eq!(table.closest_preceding_node(&target), this);
    }
}
