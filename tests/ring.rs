//! A small in-process ring exercising create, join, stabilize and key
//! hand-off end to end, without opening a real socket: an `InMemoryTransport`
//! dispatches directly to each node's [`Handler`] by identifier, playing the
//! role TCP plays in production.

use chord::engine::Engine;
use chord::handler::Handler;
use chord::routing::identifier::Identifier;
use chord::routing::{PeerRef, RoutingTable};
use chord::state::NodeState;
use chord::storage::LocalStore;
use chord::transport::{RpcHandler, Transport};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

const M: u32 = 3;

fn id_at(n: u64) -> Identifier {
    let mut id = Identifier::zero();
    for _ in 0..n {
        id = id.add_pow2(0, M);
    }
    id
}

struct InMemoryTransport {
    handlers: Mutex<HashMap<Identifier, Arc<dyn RpcHandler>>>,
}

impl InMemoryTransport {
    fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self, id: Identifier, handler: Arc<dyn RpcHandler>) {
        self.handlers.lock().unwrap().insert(id, handler);
    }

    /// `None` stands in for a dead or unreachable peer, the way a real dial
    /// failure would — never a panic, so `check_predecessor`/stabilize can
    /// exercise their failure paths.
    fn handler_for(&self, peer: &PeerRef) -> Option<Arc<dyn RpcHandler>> {
        self.handlers.lock().unwrap().get(&peer.identifier).cloned()
    }

    fn unreachable(peer: &PeerRef) -> chord::error::DhtError {
        io::Error::new(io::ErrorKind::NotConnected, format!("{} is not reachable", peer)).into()
    }
}

impl Transport for InMemoryTransport {
    fn find_successor(&self, peer: &PeerRef, target: Identifier) -> chord::Result<(bool, PeerRef)> {
        let handler = self.handler_for(peer).ok_or_else(|| Self::unreachable(peer))?;
        Ok(handler.find_successor(target))
    }

    fn get_predecessor(&self, peer: &PeerRef) -> chord::Result<Option<PeerRef>> {
        let handler = self.handler_for(peer).ok_or_else(|| Self::unreachable(peer))?;
        Ok(handler.get_predecessor())
    }

    fn notify(&self, peer: &PeerRef, candidate: PeerRef) -> chord::Result<()> {
        let handler = self.handler_for(peer).ok_or_else(|| Self::unreachable(peer))?;
        handler.notify(candidate);
        Ok(())
    }

    fn put(&self, peer: &PeerRef, key: Identifier, value: Vec<u8>) -> chord::Result<bool> {
        let handler = self.handler_for(peer).ok_or_else(|| Self::unreachable(peer))?;
        Ok(handler.put(key, value))
    }

    fn get(&self, peer: &PeerRef, key: Identifier) -> chord::Result<Option<Vec<u8>>> {
        let handler = self.handler_for(peer).ok_or_else(|| Self::unreachable(peer))?;
        Ok(handler.get(key))
    }

    fn hand_off(&self, peer: &PeerRef, requester: Identifier) -> chord::Result<Vec<(Identifier, Vec<u8>)>> {
        let handler = self.handler_for(peer).ok_or_else(|| Self::unreachable(peer))?;
        Ok(handler.hand_off(requester))
    }

    fn ping(&self, peer: &PeerRef) -> chord::Result<()> {
        let handler = self.handler_for(peer).ok_or_else(|| Self::unreachable(peer))?;
        handler.ping();
        Ok(())
    }
}

struct TestNode {
    peer: PeerRef,
    engine: Engine,
}

fn spawn_node(id: u64, port: u16, transport: &Arc<InMemoryTransport>) -> TestNode {
    let peer = PeerRef::new(id_at(id), "127.0.0.1", port);

    let routing = Arc::new(Mutex::new(RoutingTable::new(peer.clone(), M)));
    let store = Arc::new(Mutex::new(LocalStore::new(peer.identifier)));
    let state = Arc::new(Mutex::new(NodeState::SoleMember));

    let handler = Arc::new(Handler::new(
        Arc::clone(&routing),
        Arc::clone(&store),
        Arc::clone(&state),
    ));
    transport.register(peer.identifier, handler as Arc<dyn RpcHandler>);

    let engine = Engine::new(
        routing,
        store,
        Arc::clone(transport) as Arc<dyn Transport>,
        state,
        M,
        10,
        2,
    );

    TestNode { peer, engine }
}

#[test]
fn sole_member_answers_every_lookup_with_itself() {
    let transport = Arc::new(InMemoryTransport::new());
    let n0 = spawn_node(0, 9000, &transport);

    let answer = n0.engine.lookup(id_at(5)).unwrap();

    assert_eq!(answer, n0.peer);
}

#[test]
fn join_and_stabilize_link_two_nodes() {
    let transport = Arc::new(InMemoryTransport::new());
    let n0 = spawn_node(0, 9001, &transport);
    let n3 = spawn_node(3, 9002, &transport);

    n3.engine.join(n0.peer.clone()).unwrap();

    // One stabilize round on each side converges the pair.
    n3.engine.stabilize();
    n0.engine.stabilize();
    n3.engine.stabilize();

    // lookup(2) falls in (0, 3], owned by N3; lookup(4) falls in (3, 0], owned by N0.
    assert_eq!(n0.engine.lookup(id_at(2)).unwrap(), n3.peer);
    assert_eq!(n3.engine.lookup(id_at(4)).unwrap(), n0.peer);

    assert_eq!(n3.engine.lifecycle(), NodeState::Member);
}

#[test]
fn stored_key_migrates_to_new_owner_on_join() {
    let transport = Arc::new(InMemoryTransport::new());
    let n0 = spawn_node(0, 9003, &transport);

    // Before N3 joins, key 5 is owned by the sole member N0.
    n0.engine.store_value(id_at(5), b"X".to_vec()).unwrap();
    assert_eq!(n0.engine.retrieve_value(id_at(5)).unwrap(), Some(b"X".to_vec()));

    let n6 = spawn_node(6, 9004, &transport);
    n6.engine.join(n0.peer.clone()).unwrap();
    n6.engine.stabilize();
    n0.engine.stabilize();

    // 5 falls in (0, 6], so it now belongs to N6, and hand-off should have moved it there.
    // Retrieved from N0's side: with no fingers built yet, a node can only resolve a
    // target through its successor chain, never by asking itself about its own range,
    // so this (like the distilled scenario it mirrors) reads the migrated key from a
    // different anchor than its new owner.
    assert_eq!(n0.engine.lookup(id_at(5)).unwrap(), n6.peer);
    assert_eq!(n0.engine.retrieve_value(id_at(5)).unwrap(), Some(b"X".to_vec()));
}

#[test]
fn check_predecessor_clears_a_dead_predecessor() {
    let transport = Arc::new(InMemoryTransport::new());
    let n0 = spawn_node(0, 9005, &transport);
    let n3 = spawn_node(3, 9006, &transport);

    n3.engine.join(n0.peer.clone()).unwrap();
    n3.engine.stabilize();
    n0.engine.stabilize();

    assert_eq!(n0.engine.state_snapshot().predecessor, Some(n3.peer.clone()));

    // Deregister N3 so pings to it start failing, simulating its death.
    transport.handlers.lock().unwrap().remove(&n3.peer.identifier);

    n0.engine.check_predecessor();

    assert_eq!(n0.engine.state_snapshot().predecessor, None);
    assert_eq!(n0.engine.lifecycle(), NodeState::PredecessorUnknown);
}
