//! The wire protocol: a length-prefixed, type-tagged RPC message for each
//! method in the closed RPC set.
//!
//! [`Message`] is what a [`Connection`] sends and receives; each variant
//! wraps a request or reply struct defined in [`p2p`].
//!
//! [`Connection`]: ../transport/struct.Connection.html

use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor};

pub mod p2p;

/// A request or reply for one of the seven RPC methods this implementation's
/// transport supports.
#[derive(Debug)]
pub enum Message {
    FindSuccessorReq(p2p::FindSuccessorReq),
    FindSuccessorRep(p2p::FindSuccessorRep),
    GetPredecessorReq,
    GetPredecessorRep(p2p::GetPredecessorRep),
    NotifyReq(p2p::NotifyReq),
    NotifyRep,
    PutReq(p2p::PutReq),
    PutRep(p2p::PutRep),
    GetReq(p2p::GetReq),
    GetRep(p2p::GetRep),
    HandOffReq(p2p::HandOffReq),
    HandOffRep(p2p::HandOffRep),
    PingReq,
    PingRep,
}

impl Message {
    /// Messages above this size are refused rather than sent; a hand-off of
    /// a pathologically large key range would otherwise be able to exhaust
    /// memory on both ends of the wire.
    pub const MAX_LENGTH: usize = 16 * 1024 * 1024;

    const FIND_SUCCESSOR_REQ: u16 = 1;
    const FIND_SUCCESSOR_REP: u16 = 2;
    const GET_PREDECESSOR_REQ: u16 = 3;
    const GET_PREDECESSOR_REP: u16 = 4;
    const NOTIFY_REQ: u16 = 5;
    const NOTIFY_REP: u16 = 6;
    const PUT_REQ: u16 = 7;
    const PUT_REP: u16 = 8;
    const GET_REQ: u16 = 9;
    const GET_REP: u16 = 10;
    const HAND_OFF_REQ: u16 = 11;
    const HAND_OFF_REP: u16 = 12;
    const PING_REQ: u16 = 13;
    const PING_REP: u16 = 14;

    /// Decodes a `Message` from a buffer that holds exactly one frame's
    /// payload (the caller has already stripped the length prefix).
    pub fn parse(buffer: &[u8]) -> io::Result<Self> {
        let mut cursor = Cursor::new(buffer);
        let msg_type = cursor.read_u16::<NetworkEndian>()?;

        let msg = match msg_type {
            Self::FIND_SUCCESSOR_REQ => {
                Message::FindSuccessorReq(p2p::FindSuccessorReq::parse(cursor)?)
            }
            Self::FIND_SUCCESSOR_REP => {
                Message::FindSuccessorRep(p2p::FindSuccessorRep::parse(cursor)?)
            }
            Self::GET_PREDECESSOR_REQ => Message::GetPredecessorReq,
            Self::GET_PREDECESSOR_REP => {
                Message::GetPredecessorRep(p2p::GetPredecessorRep::parse(cursor)?)
            }
            Self::NOTIFY_REQ => Message::NotifyReq(p2p::NotifyReq::parse(cursor)?),
            Self::NOTIFY_REP => Message::NotifyRep,
            Self::PUT_REQ => Message::PutReq(p2p::PutReq::parse(cursor)?),
            Self::PUT_REP => Message::PutRep(p2p::PutRep::parse(cursor)?),
            Self::GET_REQ => Message::GetReq(p2p::GetReq::parse(cursor)?),
            Self::GET_REP => Message::GetRep(p2p::GetRep::parse(cursor)?),
            Self::HAND_OFF_REQ => Message::HandOffReq(p2p::HandOffReq::parse(cursor)?),
            Self::HAND_OFF_REP => Message::HandOffRep(p2p::HandOffRep::parse(cursor)?),
            Self::PING_REQ => Message::PingReq,
            Self::PING_REP => Message::PingRep,
            _ => return Err(io::Error::new(io::ErrorKind::InvalidData, "unknown message type")),
        };

        Ok(msg)
    }

    /// Encodes this message's type tag and payload, without a length prefix
    /// (the caller — [`Connection::send`] — adds that).
    ///
    /// [`Connection::send`]: ../transport/struct.Connection.html#method.send
    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        match self {
            Message::FindSuccessorReq(req) => {
                buffer.write_u16::<NetworkEndian>(Self::FIND_SUCCESSOR_REQ)?;
                req.write_bytes(buffer)
            }
            Message::FindSuccessorRep(rep) => {
                buffer.write_u16::<NetworkEndian>(Self::FIND_SUCCESSOR_REP)?;
                rep.write_bytes(buffer)
            }
            Message::GetPredecessorReq => {
                buffer.write_u16::<NetworkEndian>(Self::GET_PREDECESSOR_REQ)
            }
            Message::GetPredecessorRep(rep) => {
                buffer.write_u16::<NetworkEndian>(Self::GET_PREDECESSOR_REP)?;
                rep.write_bytes(buffer)
            }
            Message::NotifyReq(req) => {
                buffer.write_u16::<NetworkEndian>(Self::NOTIFY_REQ)?;
                req.write_bytes(buffer)
            }
            Message::NotifyRep => buffer.write_u16::<NetworkEndian>(Self::NOTIFY_REP),
            Message::PutReq(req) => {
                buffer.write_u16::<NetworkEndian>(Self::PUT_REQ)?;
                req.write_bytes(buffer)
            }
            Message::PutRep(rep) => {
                buffer.write_u16::<NetworkEndian>(Self::PUT_REP)?;
                rep.write_bytes(buffer)
            }
            Message::GetReq(req) => {
                buffer.write_u16::<NetworkEndian>(Self::GET_REQ)?;
                req.write_bytes(buffer)
            }
            Message::GetRep(rep) => {
                buffer.write_u16::<NetworkEndian>(Self::GET_REP)?;
                rep.write_bytes(buffer)
            }
            Message::HandOffReq(req) => {
                buffer.write_u16::<NetworkEndian>(Self::HAND_OFF_REQ)?;
                req.write_bytes(buffer)
            }
            Message::HandOffRep(rep) => {
                buffer.write_u16::<NetworkEndian>(Self::HAND_OFF_REP)?;
                rep.write_bytes(buffer)
            }
            Message::PingReq => buffer.write_u16::<NetworkEndian>(Self::PING_REQ),
            Message::PingRep => buffer.write_u16::<NetworkEndian>(Self::PING_REP),
        }
    }
}
