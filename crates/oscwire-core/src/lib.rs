//! oscwire Core
//!
//! Values, addresses and the binary wire format of Open Sound Control 1.0.
//!
//! This crate provides:
//! - Argument values and type tags ([`OscValue`], [`OscTypeTag`])
//! - Addresses and address patterns ([`OscAddress`])
//! - Packets ([`Message`], [`Bundle`], [`Packet`])
//! - Datagram encoding/decoding ([`codec`]) over 4-byte aligned primitives ([`stream`])
//!
//! # Example
//!
//! ```
//! use oscwire_core::{codec, endpoint::ANY_ENDPOINT, Message, Packet};
//!
//! let msg = Message::with_path("/synth/1/freq").unwrap().with_argument(440.0f32);
//! let bytes = codec::encode(&Packet::from(msg.clone())).unwrap();
//! let decoded = codec::decode(&bytes, ANY_ENDPOINT).unwrap();
//! assert_eq!(decoded, Packet::Message(msg));
//! ```

pub mod address;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod packet;
pub mod stream;
pub mod value;

pub use address::OscAddress;
pub use codec::{decode, decode_lossy, encode, PacketKind};
pub use error::{Error, Result};
pub use packet::{Bundle, Message, Packet, BUNDLE_TAG, TIME_TAG_IMMEDIATE};
pub use value::{OscTypeTag, OscValue, Rgba};

/// Largest payload a single UDP datagram can carry
pub const MAX_DATAGRAM_SIZE: usize = 65507;

/// Default UDP port for servers and client destinations
pub const DEFAULT_PORT: u16 = 8000;
