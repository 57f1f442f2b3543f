//! Threaded UDP receiver
//!
//! [`UdpReceiver::listen`] binds a socket and starts one OS thread that:
//! 1. waits up to `poll_interval_ms` for a datagram
//! 2. drains every pending datagram before waiting again
//! 3. copies each datagram into its own [`Bytes`] and calls the callback
//!    on the receiver thread
//!
//! Datagrams larger than `max_datagram_size` are dropped with a warning
//! rather than delivered cut short.
//!
//! [`UdpReceiver::stop`] clears a flag and joins the thread; the socket is
//! closed when the thread exits.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use oscwire_core::{endpoint, DEFAULT_PORT, MAX_DATAGRAM_SIZE};

use crate::error::{Result, TransportError};

/// Hop limit for multicast traffic: stay on the local network
const MULTICAST_TTL: u32 = 1;

/// Receiver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Address to listen on; a multicast address joins that group
    pub endpoint: SocketAddr,
    /// Receive our own multicast traffic
    pub multicast_loopback: bool,
    /// Interface used to join IPv4 groups (unspecified lets the OS pick)
    pub multicast_interface: Ipv4Addr,
    /// Rewrite a loopback endpoint to this host's LAN address before binding
    pub resolve_loopback: bool,
    /// Upper bound on one socket wait, and so on stop latency
    pub poll_interval_ms: u64,
    /// Largest datagram delivered; bigger ones are dropped
    pub max_datagram_size: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            endpoint: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            multicast_loopback: false,
            multicast_interface: Ipv4Addr::UNSPECIFIED,
            resolve_loopback: true,
            poll_interval_ms: 100,
            max_datagram_size: MAX_DATAGRAM_SIZE,
        }
    }
}

impl ReceiverConfig {
    /// Default config listening on `endpoint`
    pub fn with_endpoint(endpoint: SocketAddr) -> Self {
        Self {
            endpoint,
            ..Self::default()
        }
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Owns a listening socket and its receive thread
pub struct UdpReceiver {
    config: ReceiverConfig,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl UdpReceiver {
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
            local_addr: None,
        }
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// Bind and start the receive thread.
    ///
    /// Returns the address actually bound. On any bind or group-join
    /// failure no thread is started and the receiver stays inactive.
    pub fn listen<F>(&mut self, callback: F) -> Result<SocketAddr>
    where
        F: FnMut(Bytes, SocketAddr) + Send + 'static,
    {
        if self.thread.is_some() {
            return Err(TransportError::AlreadyListening);
        }

        let socket = open_socket(&self.config)?;
        let poll_interval = self.config.poll_interval();
        socket.set_read_timeout(Some(poll_interval))?;
        let local_addr = socket.local_addr()?;

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let limit = self.config.max_datagram_size.max(1);

        let spawned = thread::Builder::new()
            .name(format!("oscwire-recv-{}", local_addr.port()))
            .spawn(move || receive_loop(socket, running, limit, poll_interval, callback));

        match spawned {
            Ok(handle) => {
                info!("UDP receiver listening on {}", local_addr);
                self.thread = Some(handle);
                self.local_addr = Some(local_addr);
                Ok(local_addr)
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                error!("failed to start receiver thread for {}: {}", local_addr, e);
                Err(TransportError::Io(e))
            }
        }
    }

    /// Signal the thread and wait for it to exit.
    ///
    /// The wait is bounded by one poll interval plus the time the callback
    /// takes for datagrams already read.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("UDP receiver thread panicked");
            }
            if let Some(addr) = self.local_addr.take() {
                info!("UDP receiver on {} stopped", addr);
            }
        }
    }

    /// True while the receive thread is running
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self
                .thread
                .as_ref()
                .map(|handle| !handle.is_finished())
                .unwrap_or(false)
    }

    /// Bound address while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn multicast_loopback(&self) -> bool {
        self.config.multicast_loopback
    }

    /// Takes effect at the next [`listen`](Self::listen).
    pub fn set_multicast_loopback(&mut self, enabled: bool) {
        self.config.multicast_loopback = enabled;
    }
}

impl Drop for UdpReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop<F>(
    socket: UdpSocket,
    running: Arc<AtomicBool>,
    limit: usize,
    poll_interval: Duration,
    mut callback: F,
) where
    F: FnMut(Bytes, SocketAddr),
{
    // one spare byte: a read that fills it means the datagram was cut
    let mut buf = vec![0u8; limit + 1];

    while running.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => deliver(&buf, len, from, &mut callback),
            Err(ref e) if is_timeout(e) => continue,
            Err(e) => {
                // keep serving; back off so a persistent error cannot spin
                warn!("UDP receive error: {}", e);
                thread::sleep(poll_interval);
                continue;
            }
        }

        drain_pending(&socket, &running, &mut buf, &mut callback);
    }

    debug!("UDP receive loop exiting");
}

/// Read everything already queued on the socket without waiting.
fn drain_pending<F>(socket: &UdpSocket, running: &AtomicBool, buf: &mut [u8], callback: &mut F)
where
    F: FnMut(Bytes, SocketAddr),
{
    if let Err(e) = socket.set_nonblocking(true) {
        warn!("cannot switch receiver socket to nonblocking: {}", e);
        return;
    }

    while running.load(Ordering::SeqCst) {
        match socket.recv_from(buf) {
            Ok((len, from)) => deliver(buf, len, from, callback),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => {
                warn!("UDP receive error while draining: {}", e);
                break;
            }
        }
    }

    if let Err(e) = socket.set_nonblocking(false) {
        warn!("cannot restore blocking mode on receiver socket: {}", e);
    }
}

/// Hand `buf[..len]` to the callback unless it filled the spare byte.
fn deliver<F>(buf: &[u8], len: usize, from: SocketAddr, callback: &mut F)
where
    F: FnMut(Bytes, SocketAddr),
{
    let from = endpoint::canonical(from);
    let limit = buf.len() - 1;
    if len > limit {
        warn!("dropping datagram from {}: larger than {} bytes", from, limit);
        return;
    }
    debug!("UDP received {} bytes from {}", len, from);
    callback(Bytes::copy_from_slice(&buf[..len]), from);
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

// ============================================================================
// Socket setup
// ============================================================================

/// Create, configure and bind the listening socket.
fn open_socket(config: &ReceiverConfig) -> Result<UdpSocket> {
    let mut target = config.endpoint;
    if target.ip().is_loopback() && config.resolve_loopback {
        let resolved = local_ip_for(target.ip());
        if resolved != target.ip() {
            debug!("rewriting loopback endpoint {} to {}", target.ip(), resolved);
        }
        target.set_ip(resolved);
    }

    let group = target.ip();
    let multicast = group.is_multicast();
    let bind_addr = if multicast {
        SocketAddr::new(unspecified_like(group), target.port())
    } else {
        target
    };

    let bind_failed = |e: io::Error| {
        error!("UDP receiver failed to bind {}: {}", bind_addr, e);
        TransportError::BindFailed {
            addr: bind_addr,
            source: e,
        }
    };

    let socket = Socket::new(Domain::for_address(bind_addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(bind_failed)?;

    if multicast {
        socket.set_reuse_address(true).map_err(bind_failed)?;
    }
    if bind_addr.is_ipv6() && bind_addr.ip().is_unspecified() {
        // accept IPv4 senders too where the platform allows it
        if let Err(e) = socket.set_only_v6(false) {
            debug!("dual-stack not available on {}: {}", bind_addr, e);
        }
    }

    socket
        .bind(&SockAddr::from(bind_addr))
        .map_err(bind_failed)?;

    if multicast {
        join_group(&socket, group, config).map_err(|e| {
            error!("UDP receiver failed to join {}: {}", group, e);
            TransportError::MulticastJoin { group, source: e }
        })?;
        info!(
            "joined multicast group {} (loopback {})",
            group, config.multicast_loopback
        );
    }

    Ok(socket.into())
}

fn join_group(socket: &Socket, group: IpAddr, config: &ReceiverConfig) -> io::Result<()> {
    match group {
        IpAddr::V4(v4) => {
            socket.set_multicast_loop_v4(config.multicast_loopback)?;
            socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
            socket.join_multicast_v4(&v4, &config.multicast_interface)
        }
        IpAddr::V6(v6) => {
            socket.set_multicast_loop_v6(config.multicast_loopback)?;
            socket.set_multicast_hops_v6(MULTICAST_TTL)?;
            socket.join_multicast_v6(&v6, 0)
        }
    }
}

fn unspecified_like(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}

/// The address this host would use to reach the outside world.
///
/// Found by connecting an unbound UDP socket to a documentation address (no
/// packet is sent). Falls back to `loopback` when there is no route.
fn local_ip_for(loopback: IpAddr) -> IpAddr {
    let (bind, route_to): (SocketAddr, SocketAddr) = match loopback {
        IpAddr::V4(_) => (
            SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 9),
        ),
        IpAddr::V6(_) => (
            SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
            SocketAddr::new(IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)), 9),
        ),
    };

    let found = UdpSocket::bind(bind)
        .and_then(|s| s.connect(route_to).map(|_| s))
        .and_then(|s| s.local_addr());

    match found {
        Ok(addr) if !addr.ip().is_unspecified() => addr.ip(),
        Ok(_) => loopback,
        Err(e) => {
            debug!("no local address found, keeping {}: {}", loopback, e);
            loopback
        }
    }
}
