//! Transport error types

use std::io;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    BindFailed { addr: SocketAddr, source: io::Error },

    #[error("failed to join multicast group {group}: {source}")]
    MulticastJoin { group: IpAddr, source: io::Error },

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("incomplete send: {sent} of {len} bytes")]
    IncompleteSend { sent: usize, len: usize },

    #[error("transport not active")]
    NotActive,

    #[error("already listening")]
    AlreadyListening,

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("codec error: {0}")]
    Core(#[from] oscwire_core::Error),
}
