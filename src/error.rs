//! Error types for the DHT core.
//!
//! [`DhtError`] distinguishes transport failure, lookup failure, invalid
//! argument, and an unexpected reply to an RPC. Absence of a value (a `Get`
//! for an unknown key) is never represented as an error — it is a normal
//! `None` reply.

use crate::message::Message;
use std::fmt;
use std::io;

/// Errors that can cross the boundary of the DHT core's public operations.
#[derive(Debug)]
pub enum DhtError {
    /// A dial failed, timed out, or the peer sent something undecodable.
    Transport(io::Error),
    /// An iterative lookup exhausted its hop limit without reaching a
    /// `found: true` reply.
    LookupFailed { hops: usize },
    /// A client-supplied argument was malformed (e.g. an empty key name).
    InvalidArgument(String),
    /// A peer replied with a message that did not match what was asked for.
    UnexpectedReply(Message),
}

impl fmt::Display for DhtError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DhtError::Transport(err) => write!(f, "transport failure: {}", err),
            DhtError::LookupFailed { hops } => {
                write!(f, "lookup failed after {} hops", hops)
            }
            DhtError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            DhtError::UnexpectedReply(msg) => write!(f, "unexpected reply: {:?}", msg),
        }
    }
}

impl std::error::Error for DhtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DhtError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DhtError {
    fn from(err: io::Error) -> Self {
        DhtError::Transport(err)
    }
}

impl From<ini::Error> for DhtError {
    fn from(err: ini::Error) -> Self {
        DhtError::InvalidArgument(err.to_string())
    }
}

impl From<std::net::AddrParseError> for DhtError {
    fn from(err: std::net::AddrParseError) -> Self {
        DhtError::InvalidArgument(err.to_string())
    }
}

impl From<std::num::ParseIntError> for DhtError {
    fn from(err: std::num::ParseIntError) -> Self {
        DhtError::InvalidArgument(err.to_string())
    }
}

impl From<String> for DhtError {
    fn from(msg: String) -> Self {
        DhtError::InvalidArgument(msg)
    }
}

impl<'a> From<&'a str> for DhtError {
    fn from(msg: &'a str) -> Self {
        DhtError::InvalidArgument(msg.to_string())
    }
}
