//! This crate implements a [distributed hash table (DHT)][w:dht] node based
//! on the [Chord protocol][w:chord] using [consistent hashing][w:cons].
//!
//! # Introduction
//!
//! A DHT allows peers to cooperatively store and retrieve opaque byte blobs
//! addressed by content-derived keys, without any single peer holding the
//! whole table. Every key is the responsibility of exactly one live peer at
//! a time, and any peer can locate the responsible peer for any key in a
//! bounded number of hops.
//!
//! # Architecture
//!
//! The hard part of this crate is ring membership and routing: the
//! identifier space ([`routing::identifier`]), the per-node routing table
//! ([`routing`]), the periodic maintenance protocol that repairs the ring
//! under churn, the lookup algorithm, and the key hand-off that occurs when
//! a node joins — all driven by [`engine`] and answered on the passive side
//! by [`handler`]. [`storage`] holds the bytes a node is currently
//! responsible for. [`transport`] carries RPCs between nodes over TCP, with
//! a self-addressed short-circuit so a single-node ring never dials its own
//! listener.
//!
//! Around this core sits the ambient stack: [`config`] loads an ini file,
//! [`error`] defines the crate's error type, and the `dht` binary in `bin/`
//! parses command-line flags, initializes logging, starts a [`node::Node`],
//! and runs a small interactive shell on top of its public operations.
//!
//! [w:dht]: https://en.wikipedia.org/wiki/Distributed_hash_table
//! [w:chord]: https://en.wikipedia.org/wiki/Chord_(peer-to-peer)
//! [w:cons]: https://en.wikipedia.org/wiki/Consistent_hashing

pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod message;
pub mod node;
pub mod routing;
pub mod state;
pub mod storage;
pub mod transport;

pub type Result<T> = std::result::Result<T, error::DhtError>;

/// Constructs and starts a node from `config`. Returns once the listener is
/// bound, the join (if any) has completed, and the periodic maintenance
/// tasks are running; the node then lives for the rest of the process.
pub fn run(config: config::Config) -> Result<node::Node> {
    let node = node::Node::new(config);
    node.start()?;
    Ok(node)
}
