//! TCP networking and the remote transport abstraction.
//!
//! This module provides the low-level [`Connection`]/[`Server`] plumbing for
//! exchanging [`Message`] values over TCP, and the higher-level [`Transport`]
//! trait the protocol engine actually programs against. [`TcpTransport`]'s
//! defining property is the self-shortcut: a call whose destination is this
//! node is dispatched in-process instead of being dialed, so a single-node
//! ring's own stabilize round never blocks on its own listener.

use crate::error::DhtError;
use crate::message::{p2p, Message};
use crate::routing::identifier::Identifier;
use crate::routing::PeerRef;
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::io;
use std::io::prelude::*;
use std::net::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use threadpool::ThreadPool;

/// A length-prefixed TCP connection carrying [`Message`] frames.
pub struct Connection {
    stream: TcpStream,
}

impl Connection {
    /// Opens a TCP connection to a remote peer with a bounded read/write
    /// timeout.
    pub fn open<A: ToSocketAddrs>(addr: A, timeout_ms: u64) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;

        let timeout = Duration::from_millis(timeout_ms);
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        Ok(Self::from_stream(stream))
    }

    fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Receives one message, blocking until a full frame has arrived.
    pub fn receive(&mut self) -> io::Result<Message> {
        let len = self.stream.read_u32::<NetworkEndian>()? as usize;

        if len > Message::MAX_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "message exceeded maximum length",
            ));
        }

        let mut payload = vec![0; len];
        self.stream.read_exact(&mut payload)?;
        Message::parse(&payload)
    }

    /// Sends one message as a single length-prefixed frame.
    pub fn send(&mut self, msg: &Message) -> io::Result<()> {
        let mut payload = Vec::new();
        msg.write_bytes(&mut payload)?;

        if payload.len() > Message::MAX_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "message exceeded maximum length",
            ));
        }

        self.stream.write_u32::<NetworkEndian>(payload.len() as u32)?;
        self.stream.write_all(&payload)
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

/// Handles one accepted inbound connection.
///
/// Implemented by [`crate::handler::Handler`]; a [`Server`] dispatches every
/// accepted connection to a handler on a worker thread.
pub trait ServerHandler {
    fn handle_connection(&self, connection: Connection);
    fn handle_error(&self, error: io::Error);

    fn handle_incoming(&self, result: io::Result<TcpStream>) {
        match result {
            Ok(stream) => {
                let connection = Connection::from_stream(stream);
                self.handle_connection(connection)
            }
            Err(error) => self.handle_error(error),
        }
    }
}

/// A thread-pool-backed server accepting inbound connections on one address.
pub struct Server {
    handler: Arc<dyn ServerHandler + Send + Sync>,
}

impl Server {
    pub fn new(handler: Arc<dyn ServerHandler + Send + Sync>) -> Self {
        Self { handler }
    }

    /// Binds `addr` and spawns a background thread that accepts connections
    /// and dispatches each to the handler on a pool of `num_workers` threads.
    pub fn listen<A: ToSocketAddrs>(
        self,
        addr: A,
        num_workers: usize,
    ) -> io::Result<thread::JoinHandle<()>> {
        let listener = TcpListener::bind(addr)?;

        let handle = thread::spawn(move || {
            let pool = ThreadPool::new(num_workers);

            for result in listener.incoming() {
                let handler = Arc::clone(&self.handler);
                pool.execute(move || {
                    handler.handle_incoming(result);
                });
            }
        });

        Ok(handle)
    }
}

/// The remote transport contract: one method per entry in the closed RPC
/// set, each taking the destination peer explicitly.
pub trait Transport: Send + Sync {
    fn find_successor(&self, peer: &PeerRef, target: Identifier) -> crate::Result<(bool, PeerRef)>;
    fn get_predecessor(&self, peer: &PeerRef) -> crate::Result<Option<PeerRef>>;
    fn notify(&self, peer: &PeerRef, candidate: PeerRef) -> crate::Result<()>;
    fn put(&self, peer: &PeerRef, key: Identifier, value: Vec<u8>) -> crate::Result<bool>;
    fn get(&self, peer: &PeerRef, key: Identifier) -> crate::Result<Option<Vec<u8>>>;
    fn hand_off(&self, peer: &PeerRef, requester: Identifier) -> crate::Result<Vec<(Identifier, Vec<u8>)>>;
    fn ping(&self, peer: &PeerRef) -> crate::Result<()>;
}

/// Anything able to serve the seven RPC methods in-process — implemented by
/// [`crate::handler::Handler`] and used by [`TcpTransport`] for the
/// self-shortcut.
pub trait RpcHandler: Send + Sync {
    fn find_successor(&self, target: Identifier) -> (bool, PeerRef);
    fn get_predecessor(&self) -> Option<PeerRef>;
    fn notify(&self, candidate: PeerRef);
    fn put(&self, key: Identifier, value: Vec<u8>) -> bool;
    fn get(&self, key: Identifier) -> Option<Vec<u8>>;
    fn hand_off(&self, requester: Identifier) -> Vec<(Identifier, Vec<u8>)>;
    fn ping(&self);
}

/// [`Transport`] over TCP, with calls to `self_peer` short-circuited to an
/// in-process call on `local`.
pub struct TcpTransport {
    self_peer: PeerRef,
    local: Arc<dyn RpcHandler>,
    timeout_ms: u64,
}

impl TcpTransport {
    pub fn new(self_peer: PeerRef, local: Arc<dyn RpcHandler>, timeout_ms: u64) -> Self {
        Self {
            self_peer,
            local,
            timeout_ms,
        }
    }

    fn is_self(&self, peer: &PeerRef) -> bool {
        peer.identifier == self.self_peer.identifier
    }

    fn roundtrip(&self, peer: &PeerRef, request: Message) -> crate::Result<Message> {
        let mut con = Connection::open(peer.socket_addr_string(), self.timeout_ms)?;
        con.send(&request)?;
        Ok(con.receive()?)
    }
}

impl Transport for TcpTransport {
    fn find_successor(&self, peer: &PeerRef, target: Identifier) -> crate::Result<(bool, PeerRef)> {
        if self.is_self(peer) {
            return Ok(self.local.find_successor(target));
        }

        let req = Message::FindSuccessorReq(p2p::FindSuccessorReq { target });
        match self.roundtrip(peer, req)? {
            Message::FindSuccessorRep(rep) => Ok((rep.found, rep.peer)),
            other => Err(DhtError::UnexpectedReply(other)),
        }
    }

    fn get_predecessor(&self, peer: &PeerRef) -> crate::Result<Option<PeerRef>> {
        if self.is_self(peer) {
            return Ok(self.local.get_predecessor());
        }

        match self.roundtrip(peer, Message::GetPredecessorReq)? {
            Message::GetPredecessorRep(rep) => Ok(rep.predecessor),
            other => Err(DhtError::UnexpectedReply(other)),
        }
    }

    fn notify(&self, peer: &PeerRef, candidate: PeerRef) -> crate::Result<()> {
        if self.is_self(peer) {
            self.local.notify(candidate);
            return Ok(());
        }

        let req = Message::NotifyReq(p2p::NotifyReq { candidate });
        match self.roundtrip(peer, req)? {
            Message::NotifyRep => Ok(()),
            other => Err(DhtError::UnexpectedReply(other)),
        }
    }

    fn put(&self, peer: &PeerRef, key: Identifier, value: Vec<u8>) -> crate::Result<bool> {
        if self.is_self(peer) {
            return Ok(self.local.put(key, value));
        }

        let req = Message::PutReq(p2p::PutReq { key, value });
        match self.roundtrip(peer, req)? {
            Message::PutRep(rep) => Ok(rep.success),
            other => Err(DhtError::UnexpectedReply(other)),
        }
    }

    fn get(&self, peer: &PeerRef, key: Identifier) -> crate::Result<Option<Vec<u8>>> {
        if self.is_self(peer) {
            return Ok(self.local.get(key));
        }

        let req = Message::GetReq(p2p::GetReq { key });
        match self.roundtrip(peer, req)? {
            Message::GetRep(rep) => Ok(rep.value),
            other => Err(DhtError::UnexpectedReply(other)),
        }
    }

    fn hand_off(&self, peer: &PeerRef, requester: Identifier) -> crate::Result<Vec<(Identifier, Vec<u8>)>> {
        if self.is_self(peer) {
            return Ok(self.local.hand_off(requester));
        }

        let req = Message::HandOffReq(p2p::HandOffReq { requester });
        match self.roundtrip(peer, req)? {
            Message::HandOffRep(rep) => Ok(rep.entries),
            other => Err(DhtError::UnexpectedReply(other)),
        }
    }

    fn ping(&self, peer: &PeerRef) -> crate::Result<()> {
        if self.is_self(peer) {
            self.local.ping();
            return Ok(());
        }

        match self.roundtrip(peer, Message::PingReq)? {
            Message::PingRep => Ok(()),
            other => Err(DhtError::UnexpectedReply(other)),
        }
    }
}
