//! Packet encoding and decoding entry points
//!
//! [`sniff`] looks at the first bytes of a datagram to tell a bundle from a
//! message; [`decode`] and [`decode_lossy`] build the matching [`Packet`].

use bytes::Bytes;
use std::net::SocketAddr;
use tracing::debug;

use crate::packet::{Bundle, Message, Packet, BUNDLE_TAG};
use crate::stream::{StreamReader, StreamWriter};
use crate::{Error, Result};

/// Which packet variant a buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Message,
    Bundle,
}

/// Classify a buffer by its leading bytes.
#[inline]
pub fn sniff(bytes: &[u8]) -> Result<PacketKind> {
    if bytes.starts_with(BUNDLE_TAG) {
        Ok(PacketKind::Bundle)
    } else if bytes.first() == Some(&b'/') {
        Ok(PacketKind::Message)
    } else {
        Err(Error::UnrecognizedPacket)
    }
}

/// Encode a packet into a standalone datagram
pub fn encode(packet: &Packet) -> Result<Bytes> {
    let capacity = match packet {
        Packet::Message(m) => m.encoded_len(),
        Packet::Bundle(b) => 16 + b.len() * 48,
    };
    let mut writer = StreamWriter::with_capacity(capacity);
    packet.write(&mut writer)?;
    Ok(writer.into_bytes())
}

/// Decode a datagram received from `endpoint`.
///
/// Any framing error inside a bundle fails the whole decode.
pub fn decode(bytes: &[u8], endpoint: SocketAddr) -> Result<Packet> {
    decode_with(bytes, endpoint, false)
}

/// Decode a datagram, keeping what can be kept.
///
/// A framing error inside a bundle ends that bundle early; the children
/// decoded before it are returned. Errors before the first child still fail.
pub fn decode_lossy(bytes: &[u8], endpoint: SocketAddr) -> Result<Packet> {
    decode_with(bytes, endpoint, true)
}

fn decode_with(bytes: &[u8], endpoint: SocketAddr, lossy: bool) -> Result<Packet> {
    let mut reader = StreamReader::new(bytes);
    let packet = match sniff(bytes)? {
        PacketKind::Message => Packet::Message(Message::read(&mut reader, endpoint)?),
        PacketKind::Bundle => Packet::Bundle(Bundle::read(&mut reader, endpoint, lossy)?),
    };

    if !reader.is_empty() {
        debug!(
            "ignoring {} trailing bytes after packet from {}",
            reader.remaining(),
            endpoint
        );
    }
    Ok(packet)
}
