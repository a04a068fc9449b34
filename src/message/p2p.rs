//! Request and reply payloads for each method in the closed RPC set.

use crate::routing::identifier::Identifier;
use crate::routing::PeerRef;
use byteorder::{NetworkEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor};
use std::io::prelude::*;

/// Writes a length-prefixed (u8 length) identifier: arbitrary precision, not
/// fixed width, so deployments running with different ring sizes never
/// disagree about framing.
pub fn write_identifier(buffer: &mut Vec<u8>, id: &Identifier) -> io::Result<()> {
    let bytes = id.to_bytes();
    buffer.write_u8(bytes.len() as u8)?;
    buffer.write_all(&bytes)
}

pub fn read_identifier(cursor: &mut Cursor<&[u8]>) -> io::Result<Identifier> {
    let len = cursor.read_u8()? as usize;
    let mut bytes = vec![0; len];
    cursor.read_exact(&mut bytes)?;
    Ok(Identifier::from_bytes(&bytes))
}

fn write_string(buffer: &mut Vec<u8>, s: &str) -> io::Result<()> {
    let bytes = s.as_bytes();
    buffer.write_u16::<NetworkEndian>(bytes.len() as u16)?;
    buffer.write_all(bytes)
}

fn read_string(cursor: &mut Cursor<&[u8]>) -> io::Result<String> {
    let len = cursor.read_u16::<NetworkEndian>()? as usize;
    let mut bytes = vec![0; len];
    cursor.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn write_peer(buffer: &mut Vec<u8>, peer: &PeerRef) -> io::Result<()> {
    write_string(buffer, &peer.host)?;
    buffer.write_u16::<NetworkEndian>(peer.port)?;
    write_identifier(buffer, &peer.identifier)
}

pub fn read_peer(cursor: &mut Cursor<&[u8]>) -> io::Result<PeerRef> {
    let host = read_string(cursor)?;
    let port = cursor.read_u16::<NetworkEndian>()?;
    let identifier = read_identifier(cursor)?;
    Ok(PeerRef::new(identifier, host, port))
}

fn write_bytes_field(buffer: &mut Vec<u8>, bytes: &[u8]) -> io::Result<()> {
    buffer.write_u32::<NetworkEndian>(bytes.len() as u32)?;
    buffer.write_all(bytes)
}

fn read_bytes_field(cursor: &mut Cursor<&[u8]>) -> io::Result<Vec<u8>> {
    let len = cursor.read_u32::<NetworkEndian>()? as usize;
    let mut bytes = vec![0; len];
    cursor.read_exact(&mut bytes)?;
    Ok(bytes)
}

#[derive(Debug)]
pub struct FindSuccessorReq {
    pub target: Identifier,
}

impl FindSuccessorReq {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Self {
            target: read_identifier(&mut cursor)?,
        })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_identifier(buffer, &self.target)
    }
}

#[derive(Debug)]
pub struct FindSuccessorRep {
    pub found: bool,
    pub peer: PeerRef,
}

impl FindSuccessorRep {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let found = cursor.read_u8()? != 0;
        let peer = read_peer(&mut cursor)?;
        Ok(Self { found, peer })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        buffer.write_u8(self.found as u8)?;
        write_peer(buffer, &self.peer)
    }
}

#[derive(Debug)]
pub struct GetPredecessorRep {
    pub predecessor: Option<PeerRef>,
}

impl GetPredecessorRep {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let present = cursor.read_u8()? != 0;
        let predecessor = if present {
            Some(read_peer(&mut cursor)?)
        } else {
            None
        };
        Ok(Self { predecessor })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        match &self.predecessor {
            Some(peer) => {
                buffer.write_u8(1)?;
                write_peer(buffer, peer)
            }
            None => buffer.write_u8(0),
        }
    }
}

#[derive(Debug)]
pub struct NotifyReq {
    pub candidate: PeerRef,
}

impl NotifyReq {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Self {
            candidate: read_peer(&mut cursor)?,
        })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_peer(buffer, &self.candidate)
    }
}

#[derive(Debug)]
pub struct PutReq {
    pub key: Identifier,
    pub value: Vec<u8>,
}

impl PutReq {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let key = read_identifier(&mut cursor)?;
        let value = read_bytes_field(&mut cursor)?;
        Ok(Self { key, value })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_identifier(buffer, &self.key)?;
        write_bytes_field(buffer, &self.value)
    }
}

#[derive(Debug)]
pub struct PutRep {
    pub success: bool,
}

impl PutRep {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Self {
            success: cursor.read_u8()? != 0,
        })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        buffer.write_u8(self.success as u8)
    }
}

#[derive(Debug)]
pub struct GetReq {
    pub key: Identifier,
}

impl GetReq {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Self {
            key: read_identifier(&mut cursor)?,
        })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_identifier(buffer, &self.key)
    }
}

#[derive(Debug)]
pub struct GetRep {
    pub value: Option<Vec<u8>>,
}

impl GetRep {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let present = cursor.read_u8()? != 0;
        let value = if present {
            Some(read_bytes_field(&mut cursor)?)
        } else {
            None
        };
        Ok(Self { value })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        match &self.value {
            Some(bytes) => {
                buffer.write_u8(1)?;
                write_bytes_field(buffer, bytes)
            }
            None => buffer.write_u8(0),
        }
    }
}

#[derive(Debug)]
pub struct HandOffReq {
    pub requester: Identifier,
}

impl HandOffReq {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        Ok(Self {
            requester: read_identifier(&mut cursor)?,
        })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        write_identifier(buffer, &self.requester)
    }
}

#[derive(Debug)]
pub struct HandOffRep {
    pub entries: Vec<(Identifier, Vec<u8>)>,
}

impl HandOffRep {
    pub fn parse(mut cursor: Cursor<&[u8]>) -> io::Result<Self> {
        let count = cursor.read_u32::<NetworkEndian>()?;
        let mut entries = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let key = read_identifier(&mut cursor)?;
            let value = read_bytes_field(&mut cursor)?;
            entries.push((key, value));
        }

        Ok(Self { entries })
    }

    pub fn write_bytes(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        buffer.write_u32::<NetworkEndian>(self.entries.len() as u32)?;

        for (key, value) in &self.entries {
            write_identifier(buffer, key)?;
            write_bytes_field(buffer, value)?;
        }

        Ok(())
    }
}
