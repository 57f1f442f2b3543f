//! oscwire Transport Layer
//!
//! UDP plumbing for OSC:
//! - [`UdpClient`] serializes packets and sends them to one destination
//! - [`UdpReceiver`] owns a socket and a dedicated thread that hands every
//!   datagram to a callback
//!
//! Decoding and routing live in `oscwire-server`.

pub mod client;
pub mod error;
pub mod receiver;

pub use client::{ClientConfig, UdpClient};
pub use error::{Result, TransportError};
pub use receiver::{ReceiverConfig, UdpReceiver};
