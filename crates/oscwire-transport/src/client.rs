//! UDP client: sends packets to a single destination

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use tracing::{debug, error, info};

use oscwire_core::stream::StreamWriter;
use oscwire_core::{Bundle, Message, Packet, DEFAULT_PORT, MAX_DATAGRAM_SIZE};

use crate::error::{Result, TransportError};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Where packets go
    pub destination: SocketAddr,
    /// Local address to bind (port 0 picks one)
    pub bind_addr: SocketAddr,
    /// Allow sending to broadcast addresses
    pub broadcast: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            destination: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            broadcast: false,
        }
    }
}

/// Connectionless OSC sender
pub struct UdpClient {
    socket: Mutex<Option<UdpSocket>>,
    destination: Mutex<SocketAddr>,
}

impl UdpClient {
    /// Bind the local socket
    pub fn new(config: ClientConfig) -> Result<Self> {
        let bind_addr = bind_addr_for(&config);
        let socket = UdpSocket::bind(bind_addr).map_err(|e| {
            error!("UDP client failed to bind {}: {}", bind_addr, e);
            TransportError::BindFailed {
                addr: bind_addr,
                source: e,
            }
        })?;

        if config.broadcast {
            socket.set_broadcast(true)?;
        }

        info!(
            "UDP client bound to {}, sending to {}",
            socket.local_addr()?,
            config.destination
        );

        Ok(Self {
            socket: Mutex::new(Some(socket)),
            destination: Mutex::new(config.destination),
        })
    }

    /// Client with default config pointed at `destination`
    pub fn to(destination: SocketAddr) -> Result<Self> {
        Self::new(ClientConfig {
            destination,
            ..ClientConfig::default()
        })
    }

    pub fn set_destination(&self, destination: SocketAddr) {
        *self.destination.lock() = destination;
    }

    pub fn destination(&self) -> SocketAddr {
        *self.destination.lock()
    }

    /// Serialize and send one packet.
    ///
    /// Every byte must reach the socket layer or the call fails; there is no
    /// partial success.
    pub fn send(&self, packet: &Packet) -> Result<()> {
        let mut writer = StreamWriter::new();
        packet.write(&mut writer)?;
        self.send_encoded(writer.as_slice())
    }

    pub fn send_message(&self, message: &Message) -> Result<()> {
        let mut writer = StreamWriter::with_capacity(message.encoded_len());
        message.write(&mut writer)?;
        self.send_encoded(writer.as_slice())
    }

    pub fn send_bundle(&self, bundle: &Bundle) -> Result<()> {
        let mut writer = StreamWriter::new();
        bundle.write(&mut writer)?;
        self.send_encoded(writer.as_slice())
    }

    fn send_encoded(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > MAX_DATAGRAM_SIZE {
            return Err(oscwire_core::Error::PacketTooLarge(bytes.len()).into());
        }

        let guard = self.socket.lock();
        let socket = guard.as_ref().ok_or(TransportError::NotActive)?;
        let destination = self.destination();

        let mut sent = 0;
        while sent < bytes.len() {
            match socket.send_to(&bytes[sent..], destination) {
                Ok(0) => {
                    error!(
                        "UDP send to {} stalled after {} of {} bytes",
                        destination,
                        sent,
                        bytes.len()
                    );
                    return Err(TransportError::IncompleteSend {
                        sent,
                        len: bytes.len(),
                    });
                }
                Ok(n) => sent += n,
                Err(e) => {
                    error!("UDP send to {} failed: {}", destination, e);
                    return Err(TransportError::SendFailed(format!("{}: {}", destination, e)));
                }
            }
        }

        debug!("UDP sent {} bytes to {}", sent, destination);
        Ok(())
    }

    /// True while the socket is open
    pub fn is_active(&self) -> bool {
        self.socket.lock().is_some()
    }

    /// Release the socket. Later sends fail with [`TransportError::NotActive`].
    pub fn stop(&self) {
        if let Some(socket) = self.socket.lock().take() {
            match socket.local_addr() {
                Ok(addr) => info!("UDP client on {} stopped", addr),
                Err(_) => info!("UDP client stopped"),
            }
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        let guard = self.socket.lock();
        let socket = guard.as_ref().ok_or(TransportError::NotActive)?;
        Ok(socket.local_addr()?)
    }
}

/// Match the bind family to the destination when the bind address is the
/// IPv4 wildcard default.
fn bind_addr_for(config: &ClientConfig) -> SocketAddr {
    let bind = config.bind_addr;
    if config.destination.is_ipv6() && bind.is_ipv4() && bind.ip().is_unspecified() {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), bind.port())
    } else {
        bind
    }
}
