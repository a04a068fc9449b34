//! Start-up configuration, loaded from an ini file.
//!
//! Every period is configuration, never a constant — each of the three
//! maintenance loops in [`crate::node`] reads its own field here.

use ini::Ini;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_host: String,
    pub listen_port: u16,
    /// `None` means "form a new ring"; `Some` names a peer to join through.
    pub bootstrap: Option<(String, u16)>,
    pub stabilize_period_ms: u64,
    pub fix_fingers_period_ms: u64,
    pub check_predecessor_period_ms: u64,
    /// Successor-list capacity `r`; only the head is load-bearing for the
    /// core invariants, the rest backs dead-successor recovery.
    pub successor_list_len: usize,
    pub rpc_timeout_ms: u64,
    /// The ring size parameter `M`: number of bits kept from the 160-bit
    /// content hash, and number of finger-table entries.
    pub ring_bits: u32,
    pub worker_threads: usize,
    /// Testing-only: replaces the default `host:port` identity hash. Never
    /// set by the production config template.
    pub identifier_override: Option<String>,
}

impl Config {
    pub fn load_from_file(path: &str) -> crate::Result<Config> {
        let conf = Ini::load_from_file(path)?;

        let node = conf
            .section(Some("node"))
            .ok_or("missing section `node`")?;

        let listen_host = node
            .get("listen_host")
            .ok_or("missing value `listen_host`")?
            .to_string();

        let listen_port = node
            .get("listen_port")
            .ok_or("missing value `listen_port`")?
            .parse()?;

        let bootstrap = match (node.get("bootstrap_host"), node.get("bootstrap_port")) {
            (Some(host), Some(port)) => Some((host.to_string(), port.parse()?)),
            _ => None,
        };

        let stabilize_period_ms = node
            .get("stabilize_period_ms")
            .ok_or("missing value `stabilize_period_ms`")?
            .parse()?;

        let fix_fingers_period_ms = node
            .get("fix_fingers_period_ms")
            .ok_or("missing value `fix_fingers_period_ms`")?
            .parse()?;

        let check_predecessor_period_ms = node
            .get("check_predecessor_period_ms")
            .ok_or("missing value `check_predecessor_period_ms`")?
            .parse()?;

        let successor_list_len = node
            .get("successor_list_len")
            .ok_or("missing value `successor_list_len`")?
            .parse()?;

        let rpc_timeout_ms = node
            .get("rpc_timeout_ms")
            .ok_or("missing value `rpc_timeout_ms`")?
            .parse()?;

        let ring_bits = node
            .get("ring_bits")
            .ok_or("missing value `ring_bits`")?
            .parse()?;

        let worker_threads = node
            .get("worker_threads")
            .ok_or("missing value `worker_threads`")?
            .parse()?;

        let identifier_override = node.get("identifier_override").map(|s| s.to_string());

        Ok(Config {
            listen_host,
            listen_port,
            bootstrap,
            stabilize_period_ms,
            fix_fingers_period_ms,
            check_predecessor_period_ms,
            successor_list_len,
            rpc_timeout_ms,
            ring_bits,
            worker_threads,
            identifier_override,
        })
    }
}
