//! The active half of the protocol engine: creating or joining a ring, the
//! iterative lookup every client operation is built on, the three periodic
//! maintenance tasks, and the client-facing `lookup`/`store`/`retrieve`/
//! `state` operations.
//!
//! [`Handler`](crate::handler::Handler) answers RPCs other nodes send to this
//! one; [`Engine`] is the half that calls out, either on its own initiative
//! (stabilize, fix-fingers, check-predecessor) or on behalf of a client
//! operation (lookup, store, retrieve).

use crate::error::DhtError;
use crate::routing::identifier::Identifier;
use crate::routing::{PeerRef, RoutingTable};
use crate::state::NodeState;
use crate::storage::LocalStore;
use crate::transport::Transport;
use std::sync::{Arc, Mutex};

/// A read-only dump of a node's routing and storage state. Deliberately
/// structured rather than pre-formatted — the CLI front end decides how to
/// print it.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    pub lifecycle: NodeState,
    pub this: PeerRef,
    pub successor: PeerRef,
    pub predecessor: Option<PeerRef>,
    pub fingers: Vec<(usize, PeerRef)>,
    pub stored_keys: Vec<Identifier>,
}

/// Drives a node's participation in the ring.
///
/// Every method takes and releases `routing`/`store` locks around a single
/// field access or mutation, never while a remote call through [`Transport`]
/// is outstanding.
pub struct Engine {
    routing: Arc<Mutex<RoutingTable>>,
    store: Arc<Mutex<LocalStore>>,
    transport: Arc<dyn Transport>,
    state: Arc<Mutex<NodeState>>,
    m: u32,
    hop_limit: usize,
    successor_list_len: usize,
    successor_list: Mutex<Vec<PeerRef>>,
}

impl Engine {
    pub fn new(
        routing: Arc<Mutex<RoutingTable>>,
        store: Arc<Mutex<LocalStore>>,
        transport: Arc<dyn Transport>,
        state: Arc<Mutex<NodeState>>,
        m: u32,
        hop_limit: usize,
        successor_list_len: usize,
    ) -> Self {
        Self {
            routing,
            store,
            transport,
            state,
            m,
            hop_limit,
            successor_list_len,
            successor_list: Mutex::new(Vec::new()),
        }
    }

    fn transition(&self, new: NodeState) {
        let mut state = self.state.lock().unwrap();
        if *state != new {
            log::info!("lifecycle: {} -> {}", *state, new);
            *state = new;
        }
    }

    pub fn lifecycle(&self) -> NodeState {
        *self.state.lock().unwrap()
    }

    /// Joins the ring reachable through `bootstrap`: locates this node's
    /// successor, adopts it, and pulls the keys that now belong to this node
    /// out of that successor's store.
    pub fn join(&self, bootstrap: PeerRef) -> crate::Result<()> {
        self.transition(NodeState::Joining);

        let self_peer = { self.routing.lock().unwrap().this().clone() };

        {
            let mut routing = self.routing.lock().unwrap();
            routing.set_predecessor(None);
        }

        let successor = self.iterative_lookup(&bootstrap, self_peer.identifier)?;

        {
            let mut routing = self.routing.lock().unwrap();
            routing.set_successor(successor.clone());
        }

        let entries = self.transport.hand_off(&successor, self_peer.identifier)?;
        let handed_off = entries.len();

        {
            let mut store = self.store.lock().unwrap();
            for (key, value) in entries {
                store.put(key, value);
            }
        }

        log::info!("joined via {}, inherited {} key(s)", successor, handed_off);

        Ok(())
    }

    /// One iterative lookup: repeatedly asks `findSuccessor` of whichever
    /// peer the previous answer pointed at, until a `found: true` reply
    /// arrives or the hop limit is exhausted.
    pub fn iterative_lookup(&self, anchor: &PeerRef, target: Identifier) -> crate::Result<PeerRef> {
        let mut current = anchor.clone();

        for _ in 0..self.hop_limit {
            let (found, peer) = self.transport.find_successor(&current, target)?;

            if found {
                return Ok(peer);
            }

            current = peer;
        }

        Err(DhtError::LookupFailed { hops: self.hop_limit })
    }

    /// Resolves `target` starting from this node's own view of the ring.
    pub fn lookup(&self, target: Identifier) -> crate::Result<PeerRef> {
        let anchor = { self.routing.lock().unwrap().this().clone() };
        self.iterative_lookup(&anchor, target)
    }

    pub fn store_value(&self, key: Identifier, value: Vec<u8>) -> crate::Result<()> {
        let owner = self.lookup(key)?;

        if !self.transport.put(&owner, key, value)? {
            return Err(DhtError::InvalidArgument(format!(
                "peer {} refused the put",
                owner
            )));
        }

        Ok(())
    }

    pub fn retrieve_value(&self, key: Identifier) -> crate::Result<Option<Vec<u8>>> {
        let owner = self.lookup(key)?;
        self.transport.get(&owner, key)
    }

    /// One stabilize round: ask the successor for its predecessor, adopt it
    /// if it is closer than the current successor, then notify whichever
    /// peer the successor now is. Also refreshes the successor list and
    /// recovers from a dead successor by promoting the next live candidate
    /// in it.
    pub fn stabilize(&self) {
        let (self_peer, successor) = {
            let routing = self.routing.lock().unwrap();
            (routing.this().clone(), routing.successor().clone())
        };

        match self.transport.get_predecessor(&successor) {
            Ok(Some(candidate)) => {
                if Identifier::between(&candidate.identifier, &self_peer.identifier, &successor.identifier) {
                    let mut routing = self.routing.lock().unwrap();
                    routing.set_successor(candidate);
                }
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("stabilize: successor {} unreachable: {}", successor, err);
                self.recover_dead_successor();
            }
        }

        let successor_now = { self.routing.lock().unwrap().successor().clone() };

        match self.transport.notify(&successor_now, self_peer) {
            Ok(()) => {
                self.refresh_successor_list(&successor_now);

                if self.lifecycle() == NodeState::Joining {
                    self.transition(NodeState::Member);
                }
            }
            Err(err) => log::warn!("stabilize: notify of {} failed: {}", successor_now, err),
        }
    }

    /// Rebuilds the successor list by repeatedly asking each candidate's own
    /// `findSuccessor(candidate.id + 1)`, which — since the target falls just
    /// past the candidate's own identifier — always answers with that
    /// candidate's successor. There is no dedicated RPC for this; it reuses
    /// the existing `findSuccessor` the way a single-hop lookup would.
    fn refresh_successor_list(&self, successor: &PeerRef) {
        let mut list = Vec::with_capacity(self.successor_list_len);
        let mut current = successor.clone();

        while list.len() < self.successor_list_len {
            list.push(current.clone());

            let next_target = current.identifier.add_pow2(0, self.m);
            match self.transport.find_successor(&current, next_target) {
                Ok((_, next)) if next.identifier != current.identifier => current = next,
                _ => break,
            }
        }

        *self.successor_list.lock().unwrap() = list;
    }

    /// Promotes the first reachable candidate behind the (presumed dead)
    /// current successor. This extends beyond the distilled spec, which only
    /// requires the head of the successor list to be used; without it a
    /// single dead successor would partition the ring with no path to repair.
    fn recover_dead_successor(&self) {
        let candidates = { self.successor_list.lock().unwrap().clone() };

        for candidate in candidates.into_iter().skip(1) {
            if self.transport.ping(&candidate).is_ok() {
                log::info!("promoting {} to successor after dead-successor recovery", candidate);
                let mut routing = self.routing.lock().unwrap();
                routing.set_successor(candidate);
                return;
            }
        }

        log::warn!("dead-successor recovery found no live candidate; ring may be partitioned");
    }

    /// One fix-fingers round: refreshes a single finger entry and advances
    /// the cursor, win or lose, so a persistently unreachable finger target
    /// never stalls the rest of the table.
    pub fn fix_fingers(&self) {
        let (self_peer, index) = {
            let routing = self.routing.lock().unwrap();
            (routing.this().clone(), routing.next_finger())
        };

        let target = self_peer.identifier.add_pow2(index as u32, self.m);

        match self.iterative_lookup(&self_peer, target) {
            Ok(peer) => {
                let mut routing = self.routing.lock().unwrap();
                routing.set_finger(index, Some(peer));
            }
            Err(err) => log::debug!("fix_fingers: finger {} lookup failed: {}", index, err),
        }

        let mut routing = self.routing.lock().unwrap();
        routing.advance_next_finger();
    }

    /// One check-predecessor round: pings the predecessor and, if
    /// unreachable, clears it and transitions to
    /// [`PredecessorUnknown`](NodeState::PredecessorUnknown) until the next
    /// `Notify` repairs it.
    pub fn check_predecessor(&self) {
        let predecessor = { self.routing.lock().unwrap().predecessor().cloned() };

        let predecessor = match predecessor {
            Some(p) => p,
            None => return,
        };

        if let Err(err) = self.transport.ping(&predecessor) {
            log::warn!("check_predecessor: {} unreachable: {}", predecessor, err);

            {
                let mut routing = self.routing.lock().unwrap();
                routing.set_predecessor(None);
            }

            self.transition(NodeState::PredecessorUnknown);
        }
    }

    /// A structured dump of routing and storage state.
    pub fn state_snapshot(&self) -> StateSnapshot {
        let routing = self.routing.lock().unwrap();
        let store = self.store.lock().unwrap();

        StateSnapshot {
            lifecycle: self.lifecycle(),
            this: routing.this().clone(),
            successor: routing.successor().clone(),
            predecessor: routing.predecessor().cloned(),
            fingers: routing
                .live_fingers()
                .into_iter()
                .map(|(i, p)| (i, p.clone()))
                .collect(),
            stored_keys: store.keys(),
        }
    }
}
