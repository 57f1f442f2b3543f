//! OSC packets: messages and bundles
//!
//! ```text
//! Message: /path\0.. ,tags\0.. payload...
//! Bundle:  #bundle\0 <time tag:u64> ( <len:i32> <packet bytes> )*
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::warn;

use crate::address::OscAddress;
use crate::codec::{self, PacketKind};
use crate::endpoint::ANY_ENDPOINT;
use crate::stream::{padded_blob_len, padded_string_len, StreamReader, StreamWriter};
use crate::value::{tag, OscTypeTag, OscValue, Rgba};
use crate::{Error, Result};

/// Bundle magic, terminator included
pub const BUNDLE_TAG: &[u8; 8] = b"#bundle\0";

/// Time tag meaning "process immediately"
pub const TIME_TAG_IMMEDIATE: u64 = 1;

/// Deepest bundle nesting accepted from the network
pub const MAX_BUNDLE_DEPTH: usize = 64;

// ============================================================================
// MESSAGE
// ============================================================================

/// An address plus positional arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    address: OscAddress,
    arguments: Vec<OscValue>,
    endpoint: SocketAddr,
}

impl Message {
    pub fn new(address: OscAddress) -> Self {
        Self {
            address,
            arguments: Vec::new(),
            endpoint: ANY_ENDPOINT,
        }
    }

    /// Parse `path` and start an empty message for it
    pub fn with_path(path: &str) -> Result<Self> {
        OscAddress::parse(path).map(Self::new)
    }

    pub fn with_argument(mut self, value: impl Into<OscValue>) -> Self {
        self.arguments.push(value.into());
        self
    }

    pub fn add_argument(&mut self, value: impl Into<OscValue>) {
        self.arguments.push(value.into());
    }

    pub fn address(&self) -> &OscAddress {
        &self.address
    }

    pub fn set_address(&mut self, address: OscAddress) {
        self.address = address;
    }

    pub fn arguments(&self) -> &[OscValue] {
        &self.arguments
    }

    pub fn argument(&self, index: usize) -> Option<&OscValue> {
        self.arguments.get(index)
    }

    pub fn clear_arguments(&mut self) {
        self.arguments.clear();
    }

    pub fn int32_at(&self, index: usize) -> Option<i32> {
        self.argument(index).and_then(OscValue::as_int32)
    }

    pub fn int64_at(&self, index: usize) -> Option<i64> {
        self.argument(index).and_then(OscValue::as_int64)
    }

    pub fn float_at(&self, index: usize) -> Option<f32> {
        self.argument(index).and_then(OscValue::as_float)
    }

    pub fn double_at(&self, index: usize) -> Option<f64> {
        self.argument(index).and_then(OscValue::as_double)
    }

    pub fn bool_at(&self, index: usize) -> Option<bool> {
        self.argument(index).and_then(OscValue::as_bool)
    }

    pub fn string_at(&self, index: usize) -> Option<&str> {
        self.argument(index).and_then(OscValue::as_str)
    }

    pub fn blob_at(&self, index: usize) -> Option<&[u8]> {
        self.argument(index).and_then(OscValue::as_blob)
    }

    pub fn color_at(&self, index: usize) -> Option<Rgba> {
        self.argument(index).and_then(OscValue::as_color)
    }

    /// All float arguments, in order, skipping other types
    pub fn floats(&self) -> Vec<f32> {
        self.arguments.iter().filter_map(OscValue::as_float).collect()
    }

    /// All int32 arguments, in order, skipping other types
    pub fn int32s(&self) -> Vec<i32> {
        self.arguments.iter().filter_map(OscValue::as_int32).collect()
    }

    /// The type tag string, e.g. `,ifs`
    pub fn type_tags(&self) -> String {
        let mut tags = String::with_capacity(self.arguments.len() + 1);
        tags.push(tag::PREFIX as char);
        for arg in &self.arguments {
            tags.push(arg.tag().as_byte() as char);
        }
        tags
    }

    /// Where the message came from, or [`ANY_ENDPOINT`] if built locally
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    pub fn set_endpoint(&mut self, endpoint: SocketAddr) {
        self.endpoint = endpoint;
    }

    /// Serialized size, used to size write buffers
    pub fn encoded_len(&self) -> usize {
        let payload: usize = self
            .arguments
            .iter()
            .map(|arg| match arg {
                OscValue::String(s) => padded_string_len(s),
                OscValue::Blob(b) => padded_blob_len(b),
                OscValue::Double(_) | OscValue::Int64(_) | OscValue::TimeTag(_) => 8,
                OscValue::Bool(_) | OscValue::Nil | OscValue::Infinitum | OscValue::Terminate => 0,
                _ => 4,
            })
            .sum();
        let tags = self.arguments.len() + 2;
        padded_string_len(self.address.full_path()) + tags + crate::stream::padding(tags) + payload
    }

    /// Write the message. Nothing is written on failure.
    pub fn write(&self, writer: &mut StreamWriter) -> Result<()> {
        if !self.address.is_valid_path() {
            return Err(Error::MalformedAddress(format!(
                "{} is not a literal path",
                self.address
            )));
        }

        let start = writer.position();
        let result = self.write_unchecked(writer);
        if result.is_err() {
            writer.truncate(start);
        }
        result
    }

    fn write_unchecked(&self, writer: &mut StreamWriter) -> Result<()> {
        writer.write_string(self.address.full_path())?;
        writer.write_string(&self.type_tags())?;
        for arg in &self.arguments {
            arg.encode(writer)?;
        }
        Ok(())
    }

    /// Read a message starting at the reader's position.
    pub fn read(reader: &mut StreamReader<'_>, endpoint: SocketAddr) -> Result<Self> {
        let address = OscAddress::parse(reader.read_string()?)?;

        let tags = reader.read_string()?.as_bytes();
        let tags = match tags.split_first() {
            Some((&tag::PREFIX, rest)) => rest,
            _ => return Err(Error::MissingTypeTags),
        };

        let mut arguments = Vec::with_capacity(tags.len());
        for &b in tags {
            let tag = OscTypeTag::from_byte(b)?;
            if tag == OscTypeTag::Terminate {
                break;
            }
            arguments.push(OscValue::decode(tag, reader)?);
        }

        Ok(Self {
            address,
            arguments,
            endpoint,
        })
    }
}

// ============================================================================
// BUNDLE
// ============================================================================

/// A time tag plus an ordered list of child packets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    time_tag: u64,
    packets: Vec<Packet>,
    endpoint: SocketAddr,
}

impl Bundle {
    pub fn new(time_tag: u64) -> Self {
        Self {
            time_tag,
            packets: Vec::new(),
            endpoint: ANY_ENDPOINT,
        }
    }

    pub fn immediate() -> Self {
        Self::new(TIME_TAG_IMMEDIATE)
    }

    pub fn with_packet(mut self, packet: impl Into<Packet>) -> Self {
        self.packets.push(packet.into());
        self
    }

    pub fn add_packet(&mut self, packet: impl Into<Packet>) {
        self.packets.push(packet.into());
    }

    pub fn time_tag(&self) -> u64 {
        self.time_tag
    }

    pub fn set_time_tag(&mut self, time_tag: u64) {
        self.time_tag = time_tag;
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    pub fn set_endpoint(&mut self, endpoint: SocketAddr) {
        self.endpoint = endpoint;
    }

    /// Every message in the bundle, nested bundles flattened depth-first
    pub fn messages(&self) -> Messages<'_> {
        Messages {
            stack: vec![self.packets.iter()],
        }
    }

    pub fn write(&self, writer: &mut StreamWriter) -> Result<()> {
        let start = writer.position();
        let result = self.write_unchecked(writer);
        if result.is_err() {
            writer.truncate(start);
        }
        result
    }

    fn write_unchecked(&self, writer: &mut StreamWriter) -> Result<()> {
        writer.write_raw(BUNDLE_TAG);
        writer.write_time_tag(self.time_tag);

        for packet in &self.packets {
            let slot = writer.reserve_u32();
            let start = writer.position();
            packet.write(writer)?;
            let len = writer.position() - start;
            if len > i32::MAX as usize {
                return Err(Error::PacketTooLarge(len));
            }
            writer.patch_u32(slot, len as u32);
        }
        Ok(())
    }

    /// Read a bundle starting at the reader's position.
    ///
    /// In lossy mode a framing error stops the bundle early and keeps the
    /// children read so far; otherwise it is returned.
    pub fn read(reader: &mut StreamReader<'_>, endpoint: SocketAddr, lossy: bool) -> Result<Self> {
        Self::read_nested(reader, endpoint, lossy, 0)
    }

    fn read_nested(
        reader: &mut StreamReader<'_>,
        endpoint: SocketAddr,
        lossy: bool,
        depth: usize,
    ) -> Result<Self> {
        if depth >= MAX_BUNDLE_DEPTH {
            return Err(Error::BundleFraming(format!(
                "nesting deeper than {}",
                MAX_BUNDLE_DEPTH
            )));
        }

        let magic = reader
            .sub_reader(BUNDLE_TAG.len())
            .map_err(|_| Error::BundleFraming("truncated bundle header".to_string()))?;
        if magic.rest() != BUNDLE_TAG {
            return Err(Error::BundleFraming("bad bundle magic".to_string()));
        }

        let time_tag = reader
            .read_time_tag()
            .map_err(|_| Error::BundleFraming("truncated time tag".to_string()))?;

        let mut bundle = Bundle {
            time_tag,
            packets: Vec::new(),
            endpoint,
        };

        while !reader.is_empty() {
            match read_child(reader, endpoint, lossy, depth) {
                Ok(Some(packet)) => bundle.packets.push(packet),
                Ok(None) => {}
                Err(e) if lossy => {
                    warn!(
                        "dropping rest of bundle from {} after {} children: {}",
                        endpoint,
                        bundle.packets.len(),
                        e
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(bundle)
    }
}

/// Read one length-prefixed bundle element.
///
/// `Ok(None)` means the child was malformed in a way its length prefix lets
/// us step over.
fn read_child(
    reader: &mut StreamReader<'_>,
    endpoint: SocketAddr,
    lossy: bool,
    depth: usize,
) -> Result<Option<Packet>> {
    if reader.remaining() < 4 {
        return Err(Error::BundleFraming(format!(
            "{} stray bytes where an element size was expected",
            reader.remaining()
        )));
    }

    let declared = reader.read_i32()?;
    if declared < 0 || declared as usize > reader.remaining() {
        return Err(Error::BundleFraming(format!(
            "element declares {} bytes, {} remain",
            declared,
            reader.remaining()
        )));
    }
    let declared = declared as usize;
    let mut child = reader.sub_reader(declared)?;

    let decoded = match codec::sniff(child.rest()) {
        Ok(PacketKind::Message) => Message::read(&mut child, endpoint).map(Packet::Message),
        Ok(PacketKind::Bundle) => {
            Bundle::read_nested(&mut child, endpoint, lossy, depth + 1).map(Packet::Bundle)
        }
        Err(e) => Err(e),
    };

    match decoded {
        Ok(packet) => {
            // a lossy nested bundle may have stopped early on purpose
            let truncated_on_purpose = lossy && packet.is_bundle();
            if !child.is_empty() && !truncated_on_purpose {
                return Err(Error::BundleFraming(format!(
                    "element declares {} bytes, contents use {}",
                    declared,
                    child.position()
                )));
            }
            Ok(Some(packet))
        }
        Err(e) if e.is_message_local() => {
            warn!("skipping malformed bundle element from {}: {}", endpoint, e);
            Ok(None)
        }
        Err(e @ Error::BundleFraming(_)) => Err(e),
        Err(e) => Err(Error::BundleFraming(format!(
            "element declares {} bytes: {}",
            declared, e
        ))),
    }
}

/// Depth-first iterator over the messages of a bundle
pub struct Messages<'a> {
    stack: Vec<std::slice::Iter<'a, Packet>>,
}

impl<'a> Iterator for Messages<'a> {
    type Item = &'a Message;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Packet::Message(m)) => return Some(m),
                Some(Packet::Bundle(b)) => self.stack.push(b.packets.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

// ============================================================================
// PACKET
// ============================================================================

/// The unit carried by one datagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Message(Message),
    Bundle(Bundle),
}

impl Packet {
    pub fn is_bundle(&self) -> bool {
        matches!(self, Packet::Bundle(_))
    }

    pub fn is_message(&self) -> bool {
        matches!(self, Packet::Message(_))
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Packet::Message(m) => Some(m),
            Packet::Bundle(_) => None,
        }
    }

    pub fn as_bundle(&self) -> Option<&Bundle> {
        match self {
            Packet::Bundle(b) => Some(b),
            Packet::Message(_) => None,
        }
    }

    pub fn endpoint(&self) -> SocketAddr {
        match self {
            Packet::Message(m) => m.endpoint(),
            Packet::Bundle(b) => b.endpoint(),
        }
    }

    pub fn set_endpoint(&mut self, endpoint: SocketAddr) {
        match self {
            Packet::Message(m) => m.set_endpoint(endpoint),
            Packet::Bundle(b) => b.set_endpoint(endpoint),
        }
    }

    pub fn write(&self, writer: &mut StreamWriter) -> Result<()> {
        match self {
            Packet::Message(m) => m.write(writer),
            Packet::Bundle(b) => b.write(writer),
        }
    }

    /// Serialize into a fresh buffer
    pub fn encode(&self) -> Result<Bytes> {
        codec::encode(self)
    }

    /// Read whichever packet kind starts at the reader's position.
    pub fn read(reader: &mut StreamReader<'_>, endpoint: SocketAddr) -> Result<Self> {
        match codec::sniff(reader.rest())? {
            PacketKind::Message => Message::read(reader, endpoint).map(Packet::Message),
            PacketKind::Bundle => Bundle::read(reader, endpoint, false).map(Packet::Bundle),
        }
    }
}

impl From<Message> for Packet {
    fn from(m: Message) -> Self {
        Packet::Message(m)
    }
}

impl From<Bundle> for Packet {
    fn from(b: Bundle) -> Self {
        Packet::Bundle(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(path: &str) -> Message {
        Message::with_path(path).unwrap()
    }

    #[test]
    fn test_message_layout() {
        let m = msg("/a").with_argument(1).with_argument("x");
        let mut w = StreamWriter::new();
        m.write(&mut w).unwrap();
        assert_eq!(
            w.as_slice(),
            b"/a\0\0,is\0\0\0\0\x01x\0\0\0"
        );
        assert_eq!(m.encoded_len(), w.position());
    }

    #[test]
    fn test_pattern_address_not_written() {
        let m = msg("/mixer/*/volume").with_argument(1.0f32);
        let mut w = StreamWriter::new();
        assert!(matches!(m.write(&mut w), Err(Error::MalformedAddress(_))));
        assert_eq!(w.position(), 0);
    }

    #[test]
    fn test_failed_write_leaves_nothing() {
        let m = msg("/a").with_argument(OscValue::Terminate);
        let mut w = StreamWriter::new();
        w.write_i32(42);
        assert!(m.write(&mut w).is_err());
        assert_eq!(w.position(), 4);
    }

    #[test]
    fn test_type_tags() {
        let m = msg("/t")
            .with_argument(true)
            .with_argument(false)
            .with_argument(OscValue::Nil)
            .with_argument(OscValue::Infinitum)
            .with_argument(2.0f64);
        assert_eq!(m.type_tags(), ",TFNId");
    }

    #[test]
    fn test_empty_tag_string_rejected() {
        let mut w = StreamWriter::new();
        w.write_string("/a").unwrap();
        w.write_string("").unwrap();
        let bytes = w.into_bytes();
        let mut r = StreamReader::new(&bytes);
        assert_eq!(
            Message::read(&mut r, ANY_ENDPOINT),
            Err(Error::MissingTypeTags)
        );
    }

    #[test]
    fn test_missing_comma_rejected() {
        let mut w = StreamWriter::new();
        w.write_string("/a").unwrap();
        w.write_string("i").unwrap();
        w.write_i32(1);
        let bytes = w.into_bytes();
        let mut r = StreamReader::new(&bytes);
        assert_eq!(
            Message::read(&mut r, ANY_ENDPOINT),
            Err(Error::MissingTypeTags)
        );
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut w = StreamWriter::new();
        w.write_string("/a").unwrap();
        w.write_string(",ix").unwrap();
        w.write_i32(1);
        w.write_i32(2);
        let bytes = w.into_bytes();
        let mut r = StreamReader::new(&bytes);
        assert_eq!(
            Message::read(&mut r, ANY_ENDPOINT),
            Err(Error::UnsupportedTypeTag(b'x'))
        );
    }

    #[test]
    fn test_bundle_length_prefixes() {
        let a = msg("/a").with_argument(1);
        let b = msg("/bb").with_argument("hello");
        let bundle = Bundle::new(12345).with_packet(a.clone()).with_packet(b.clone());

        let mut w = StreamWriter::new();
        bundle.write(&mut w).unwrap();
        let bytes = w.into_bytes();

        assert_eq!(&bytes[..8], BUNDLE_TAG);
        assert_eq!(&bytes[8..16], &12345u64.to_be_bytes());

        let first = i32::from_be_bytes(bytes[16..20].try_into().unwrap()) as usize;
        assert_eq!(first, a.encoded_len());
        let second_at = 20 + first;
        let second =
            i32::from_be_bytes(bytes[second_at..second_at + 4].try_into().unwrap()) as usize;
        assert_eq!(second, b.encoded_len());
        assert_eq!(bytes.len(), second_at + 4 + second);
    }

    #[test]
    fn test_bundle_write_fails_on_pattern_child() {
        let bundle = Bundle::immediate()
            .with_packet(msg("/ok"))
            .with_packet(msg("/not/*"));
        let mut w = StreamWriter::new();
        assert!(bundle.write(&mut w).is_err());
        assert_eq!(w.position(), 0);
    }

    #[test]
    fn test_messages_flatten_depth_first() {
        let inner = Bundle::immediate()
            .with_packet(msg("/b"))
            .with_packet(Bundle::immediate().with_packet(msg("/c")));
        let outer = Bundle::immediate()
            .with_packet(msg("/a"))
            .with_packet(inner)
            .with_packet(msg("/d"));

        let paths: Vec<&str> = outer.messages().map(|m| m.address().full_path()).collect();
        assert_eq!(paths, vec!["/a", "/b", "/c", "/d"]);
    }

    #[test]
    fn test_typed_getters() {
        let m = msg("/g")
            .with_argument(1)
            .with_argument(0.5f32)
            .with_argument("s")
            .with_argument(2);
        assert_eq!(m.int32_at(0), Some(1));
        assert_eq!(m.float_at(1), Some(0.5));
        assert_eq!(m.string_at(2), Some("s"));
        assert_eq!(m.float_at(0), None);
        assert_eq!(m.int32s(), vec![1, 2]);
        assert_eq!(m.floats(), vec![0.5]);
    }
}
