extern crate chord;
#[macro_use]
extern crate log;
extern crate stderrlog;
extern crate structopt;

use chord::config::Config;
use std::fs;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "dht",
    version = "0.1",
    about = "Distributed hash table based on Chord"
)]
struct Opt {
    /// Path to the ini config file
    #[structopt(short = "c", parse(from_os_str))]
    config: PathBuf,

    /// Address of a bootstrapping peer; overrides `bootstrap_host`/
    /// `bootstrap_port` in the config file when given
    #[structopt(short = "b")]
    bootstrap: Option<SocketAddr>,

    /// Silence all output
    #[structopt(short = "q", long = "quiet")]
    quiet: bool,

    /// Level of verbosity (v, vv, vvv)
    #[structopt(short = "v", parse(from_occurrences))]
    verbose: usize,

    /// Timestamp (sec, ms, ns, none)
    #[structopt(short = "t")]
    timestamp: Option<stderrlog::Timestamp>,
}

fn main() {
    let opt = Opt::from_args();

    stderrlog::new()
        .module(module_path!())
        .quiet(opt.quiet)
        .verbosity(opt.verbose)
        .timestamp(opt.timestamp.unwrap_or(stderrlog::Timestamp::Off))
        .init()
        .expect("failed to initialize logger");

    let mut config = Config::load_from_file(opt.config.to_string_lossy().as_ref()).unwrap_or_else(|err| {
        error!("error while loading config file: {}", err);
        process::exit(2);
    });

    // A flag-supplied bootstrap peer is more specific, more recently
    // expressed intent than the ini file's, so it wins.
    if let Some(addr) = opt.bootstrap {
        config.bootstrap = Some((addr.ip().to_string(), addr.port()));
    }

    let node = chord::run(config).unwrap_or_else(|err| {
        error!("fatal application error: {}", err);
        process::exit(1);
    });

    run_shell(&node);
}

fn run_shell(node: &chord::node::Node) {
    let stdin = io::stdin();
    print_prompt();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!("error reading stdin: {}", err);
                break;
            }
        };

        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or("");
        let argument = parts.next().unwrap_or("").trim();

        match command {
            "" => {}
            "lookup" => handle_lookup(node, argument),
            "store" => handle_store(node, argument),
            "retrieve" => handle_retrieve(node, argument),
            "state" => handle_state(node),
            "exit" | "quit" => break,
            other => println!("unknown command: {}", other),
        }

        print_prompt();
    }
}

fn print_prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn handle_lookup(node: &chord::node::Node, name: &str) {
    if name.is_empty() {
        println!("usage: lookup <name>");
        return;
    }

    match node.lookup(name) {
        Ok(peer) => println!("{}", peer),
        Err(err) => println!("lookup failed: {}", err),
    }
}

fn handle_store(node: &chord::node::Node, path: &str) {
    if path.is_empty() {
        println!("usage: store <path>");
        return;
    }

    let path = PathBuf::from(path);
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_string(),
        None => {
            println!("store failed: path has no file name");
            return;
        }
    };

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) => {
            println!("store failed: could not read {}: {}", path.display(), err);
            return;
        }
    };

    match node.store(&name, bytes) {
        Ok(()) => println!("stored under {}", name),
        Err(err) => println!("store failed: {}", err),
    }
}

fn handle_retrieve(node: &chord::node::Node, name: &str) {
    if name.is_empty() {
        println!("usage: retrieve <name>");
        return;
    }

    match node.retrieve(name) {
        Ok(Some(bytes)) => println!("{} bytes", bytes.len()),
        Ok(None) => println!("not found"),
        Err(err) => println!("retrieve failed: {}", err),
    }
}

fn handle_state(node: &chord::node::Node) {
    let snapshot = node.state();

    println!("lifecycle:   {}", snapshot.lifecycle);
    println!("self:        {}", snapshot.this);
    println!("successor:   {}", snapshot.successor);

    match &snapshot.predecessor {
        Some(p) => println!("predecessor: {}", p),
        None => println!("predecessor: (unknown)"),
    }

    if snapshot.fingers.is_empty() {
        println!("fingers:     (none)");
    } else {
        for (index, peer) in &snapshot.fingers {
            println!("finger[{}]:   {}", index, peer);
        }
    }

    println!("stored keys: {}", snapshot.stored_keys.len());
    for key in &snapshot.stored_keys {
        println!("  {}", key);
    }
}
