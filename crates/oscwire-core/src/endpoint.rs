//! Network endpoint helpers
//!
//! Endpoints are plain [`SocketAddr`]s. The unspecified address with port 0
//! stands for "any endpoint"; port 0 alone stands for "any port".

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// The unset endpoint carried by locally built packets
pub const ANY_ENDPOINT: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);

/// IPv6 spelling of [`ANY_ENDPOINT`]
pub const ANY_ENDPOINT_V6: SocketAddr = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0);

/// Port value meaning "any port"
pub const ANY_PORT: u16 = 0;

/// True for `0.0.0.0:0` and `[::]:0`
pub fn is_any(endpoint: &SocketAddr) -> bool {
    endpoint.ip().is_unspecified() && endpoint.port() == ANY_PORT
}

/// Same address, wildcard port
pub fn with_any_port(endpoint: &SocketAddr) -> SocketAddr {
    SocketAddr::new(endpoint.ip(), ANY_PORT)
}

/// Fold IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) back to IPv4 so a
/// dual-stack socket reports senders the same way an IPv4 one does.
pub fn canonical(endpoint: SocketAddr) -> SocketAddr {
    match endpoint.ip() {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => SocketAddr::new(IpAddr::V4(v4), endpoint.port()),
            None => endpoint,
        },
        IpAddr::V4(_) => endpoint,
    }
}
