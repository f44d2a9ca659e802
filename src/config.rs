use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

/// Upper bound for the upstream handshake read.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound for connecting to the upstream proxy.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Startup settings, shared read-only by the listener and every worker.
#[derive(Debug, Clone)]
pub struct Config {
    /// local port the NAT rule redirects to; 0 picks an ephemeral port
    pub listen_port: u16,
    /// the SOCKS4 proxy every session goes through
    pub upstream: SocketAddrV4,
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
    pub log_enabled: bool,
}

impl Config {
    pub fn new(listen_port: u16, upstream_ip: Ipv4Addr, upstream_port: u16) -> Self {
        Self {
            listen_port,
            upstream: SocketAddrV4::new(upstream_ip, upstream_port),
            connect_timeout: CONNECT_TIMEOUT,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            log_enabled: true,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn log_enabled(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    /// All interfaces, as the NAT rule may target any local address.
    pub fn listen_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.listen_port)
    }
}
