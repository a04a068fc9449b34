//! Wires the routing table, local store, handler, transport, and engine
//! together into one running node, and spawns the listener and the three
//! periodic maintenance tasks.

use crate::config::Config;
use crate::engine::{Engine, StateSnapshot};
use crate::handler::Handler;
use crate::routing::identifier::Identifier;
use crate::routing::{PeerRef, RoutingTable};
use crate::state::NodeState;
use crate::storage::LocalStore;
use crate::transport::{RpcHandler, Server, ServerHandler, TcpTransport, Transport};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A fully wired, not-yet-started node: every collaborator constructed and
/// sharing the `Arc<Mutex<_>>` state each periodic task and RPC handler
/// needs.
pub struct Node {
    config: Config,
    this: PeerRef,
    engine: Arc<Engine>,
    handler: Arc<Handler>,
    m: u32,
}

impl Node {
    pub fn new(config: Config) -> Self {
        let identity_source = config
            .identifier_override
            .clone()
            .unwrap_or_else(|| format!("{}:{}", config.listen_host, config.listen_port));

        let self_id = Identifier::hash(identity_source.as_bytes(), config.ring_bits);
        let this = PeerRef::new(self_id, config.listen_host.clone(), config.listen_port);

        let initial_state = if config.bootstrap.is_some() {
            NodeState::Uninitialized
        } else {
            NodeState::SoleMember
        };

        let routing = Arc::new(Mutex::new(RoutingTable::new(this.clone(), config.ring_bits)));
        let store = Arc::new(Mutex::new(LocalStore::new(self_id)));
        let state = Arc::new(Mutex::new(initial_state));

        let handler = Arc::new(Handler::new(
            Arc::clone(&routing),
            Arc::clone(&store),
            Arc::clone(&state),
        ));

        let transport = Arc::new(TcpTransport::new(
            this.clone(),
            Arc::clone(&handler) as Arc<dyn RpcHandler>,
            config.rpc_timeout_ms,
        ));

        // M + 2 hops, with a floor of 10 so small test rings still tolerate
        // a few dead hops before giving up.
        let hop_limit = (config.ring_bits as usize + 2).max(10);

        let engine = Arc::new(Engine::new(
            routing,
            store,
            transport as Arc<dyn Transport>,
            state,
            config.ring_bits,
            hop_limit,
            config.successor_list_len,
        ));

        let m = config.ring_bits;

        Self {
            config,
            this,
            engine,
            handler,
            m,
        }
    }

    pub fn this(&self) -> &PeerRef {
        &self.this
    }

    /// Binds the listener, joins the ring if a bootstrap peer is configured,
    /// and spawns the three periodic maintenance tasks. Returns once
    /// everything is running; the spawned threads live for the rest of the
    /// process.
    pub fn start(&self) -> crate::Result<()> {
        let listen_addr = format!("{}:{}", self.config.listen_host, self.config.listen_port);

        let server = Server::new(Arc::clone(&self.handler) as Arc<dyn ServerHandler + Send + Sync>);
        server.listen(listen_addr, self.config.worker_threads)?;

        if let Some((host, port)) = &self.config.bootstrap {
            let bootstrap_addr = format!("{}:{}", host, port);
            let bootstrap_id = Identifier::hash(bootstrap_addr.as_bytes(), self.m);
            let bootstrap = PeerRef::new(bootstrap_id, host.clone(), *port);

            self.engine.join(bootstrap)?;
        }

        self.spawn_periodic_task(self.config.stabilize_period_ms, {
            let engine = Arc::clone(&self.engine);
            move || engine.stabilize()
        });

        self.spawn_periodic_task(self.config.fix_fingers_period_ms, {
            let engine = Arc::clone(&self.engine);
            move || engine.fix_fingers()
        });

        self.spawn_periodic_task(self.config.check_predecessor_period_ms, {
            let engine = Arc::clone(&self.engine);
            move || engine.check_predecessor()
        });

        Ok(())
    }

    fn spawn_periodic_task(&self, period_ms: u64, task: impl Fn() + Send + 'static) {
        let period = Duration::from_millis(period_ms);

        thread::spawn(move || loop {
            thread::sleep(period);
            task();
        });
    }

    /// `lookup <name>` — resolves the peer responsible for a name's hash.
    pub fn lookup(&self, name: &str) -> crate::Result<PeerRef> {
        let key = Identifier::hash(name.as_bytes(), self.m);
        self.engine.lookup(key)
    }

    /// `store <path>` — the shell has already resolved the path to a name
    /// and bytes; this places them under the name's hash.
    pub fn store(&self, key_name: &str, bytes: Vec<u8>) -> crate::Result<()> {
        let key = Identifier::hash(key_name.as_bytes(), self.m);
        self.engine.store_value(key, bytes)
    }

    /// `retrieve <name>`.
    pub fn retrieve(&self, key_name: &str) -> crate::Result<Option<Vec<u8>>> {
        let key = Identifier::hash(key_name.as_bytes(), self.m);
        self.engine.retrieve_value(key)
    }

    /// A structured dump of routing and storage state.
    pub fn state(&self) -> StateSnapshot {
        self.engine.state_snapshot()
    }
}
