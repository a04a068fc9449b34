//! The passive half of the protocol engine: server-side implementations of
//! the seven RPC methods, plus the glue that turns an inbound [`Connection`]
//! into a call against them.
//!
//! [`Handler`] implements [`RpcHandler`] (so [`TcpTransport`] can call it
//! in-process for self-directed requests) and [`ServerHandler`] (so a
//! [`Server`] can dispatch decoded wire messages to it).
//!
//! [`Connection`]: ../transport/struct.Connection.html
//! [`RpcHandler`]: ../transport/trait.RpcHandler.html
//! [`TcpTransport`]: ../transport/struct.TcpTransport.html
//! [`ServerHandler`]: ../transport/trait.ServerHandler.html
//! [`Server`]: ../transport/struct.Server.html

use crate::message::{p2p, Message};
use crate::routing::identifier::Identifier;
use crate::routing::{PeerRef, RoutingTable};
use crate::state::NodeState;
use crate::storage::LocalStore;
use crate::transport::{Connection, RpcHandler, ServerHandler};
use std::io;
use std::sync::{Arc, Mutex};

pub struct Handler {
    routing: Arc<Mutex<RoutingTable>>,
    store: Arc<Mutex<LocalStore>>,
    state: Arc<Mutex<NodeState>>,
}

impl Handler {
    pub fn new(
        routing: Arc<Mutex<RoutingTable>>,
        store: Arc<Mutex<LocalStore>>,
        state: Arc<Mutex<NodeState>>,
    ) -> Self {
        Self {
            routing,
            store,
            state,
        }
    }

    fn dispatch(&self, msg: Message) -> Message {
        match msg {
            Message::FindSuccessorReq(req) => {
                let (found, peer) = self.find_successor(req.target);
                Message::FindSuccessorRep(p2p::FindSuccessorRep { found, peer })
            }
            Message::GetPredecessorReq => {
                Message::GetPredecessorRep(p2p::GetPredecessorRep {
                    predecessor: self.get_predecessor(),
                })
            }
            Message::NotifyReq(req) => {
                self.notify(req.candidate);
                Message::NotifyRep
            }
            Message::PutReq(req) => {
                let success = self.put(req.key, req.value);
                Message::PutRep(p2p::PutRep { success })
            }
            Message::GetReq(req) => {
                let value = self.get(req.key);
                Message::GetRep(p2p::GetRep { value })
            }
            Message::HandOffReq(req) => {
                let entries = self.hand_off(req.requester);
                Message::HandOffRep(p2p::HandOffRep { entries })
            }
            Message::PingReq => Message::PingRep,
            other => {
                log::warn!("received a reply where a request was expected: {:?}", other);
                Message::PingRep
            }
        }
    }
}

impl RpcHandler for Handler {
    /// One step of `findSuccessor`: if `target` falls in
    /// `(self.id, successor.id]` the successor is the answer; otherwise the
    /// closest preceding finger is handed back for the caller to re-query.
    fn find_successor(&self, target: Identifier) -> (bool, PeerRef) {
        let routing = self.routing.lock().unwrap();
        let self_id = routing.this().identifier;
        let successor = routing.successor().clone();

        if Identifier::between(&target, &self_id, &successor.identifier) {
            (true, successor)
        } else {
            (false, routing.closest_preceding_node(&target))
        }
    }

    fn get_predecessor(&self) -> Option<PeerRef> {
        let routing = self.routing.lock().unwrap();
        routing.predecessor().cloned()
    }

    /// A candidate is accepted as predecessor only if there is none yet, or
    /// the candidate is strictly closer than the current one.
    fn notify(&self, candidate: PeerRef) {
        let mut routing = self.routing.lock().unwrap();
        let self_id = routing.this().identifier;

        let accept = match routing.predecessor() {
            None => true,
            Some(current) => Identifier::between(&candidate.identifier, &current.identifier, &self_id),
        };

        if accept {
            log::info!("accepting new predecessor {}", candidate);
            routing.set_predecessor(Some(candidate));
            drop(routing);

            let mut state = self.state.lock().unwrap();
            if *state == NodeState::PredecessorUnknown {
                log::info!("lifecycle: {} -> {}", *state, NodeState::Member);
                *state = NodeState::Member;
            }
        }
    }

    fn put(&self, key: Identifier, value: Vec<u8>) -> bool {
        let mut store = self.store.lock().unwrap();
        store.put(key, value);
        true
    }

    fn get(&self, key: Identifier) -> Option<Vec<u8>> {
        let store = self.store.lock().unwrap();
        store.get(&key)
    }

    /// Returns and forgets every key that now belongs to `requester`, the
    /// node which has just inserted itself as our new predecessor.
    fn hand_off(&self, requester: Identifier) -> Vec<(Identifier, Vec<u8>)> {
        let mut store = self.store.lock().unwrap();
        let entries = store.hand_off(requester);

        log::info!("handing off {} key(s) to new predecessor", entries.len());

        entries
    }

    fn ping(&self) {}
}

impl ServerHandler for Handler {
    fn handle_connection(&self, mut connection: Connection) {
        let msg = match connection.receive() {
            Ok(msg) => msg,
            Err(err) => return self.handle_error(err),
        };

        log::debug!("received {:?}", msg);

        let reply = self.dispatch(msg);

        if let Err(err) = connection.send(&reply) {
            self.handle_error(err);
        }
    }

    fn handle_error(&self, error: io::Error) {
        log::error!("error handling inbound connection: {}", error);
    }
}
