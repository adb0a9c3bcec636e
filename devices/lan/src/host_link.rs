use core::error;
use core::network::{NetworkCredential, NetworkLink};

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use log::{info, warn};

/// A network link for running on a development host.
///
/// The operating system owns the host's networking, so joining a network only
/// records the request and "connected" means the host has a route out. The
/// host cannot become an access point either: it stays on whatever network it
/// has and the arbiter announces the configured setup address.
pub struct HostLink {
    route_target: SocketAddrV4,
    requested: Option<String>,
    hosting: bool,
}

impl HostLink {
    /// Destination used to find the outbound interface. Nothing is sent to it.
    pub const DEFAULT_ROUTE_TARGET: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(8, 8, 8, 8), 53);

    pub fn new() -> Self {
        Self::with_route_target(Self::DEFAULT_ROUTE_TARGET)
    }

    pub fn with_route_target(route_target: SocketAddrV4) -> Self {
        Self {
            route_target,
            requested: None,
            hosting: false,
        }
    }

    pub fn is_hosting(&self) -> bool {
        self.hosting
    }

    fn route_addr(&self) -> Option<Ipv4Addr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
        socket.connect(self.route_target).ok()?;

        match socket.local_addr().ok()? {
            SocketAddr::V4(addr) if !addr.ip().is_unspecified() => Some(*addr.ip()),
            _ => None,
        }
    }
}

impl Default for HostLink {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkLink for HostLink {
    fn begin_connect(&mut self, credential: &NetworkCredential) -> error::Result<()> {
        info!(
            "Host networking is managed by the system, {} counts as joined once a route exists",
            credential.identifier
        );
        self.requested = Some(credential.identifier.clone());

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.requested.is_some() && self.route_addr().is_some()
    }

    fn start_access_point(&mut self, ssid: &str, _passphrase: &str) -> error::Result<()> {
        warn!("A host cannot serve {ssid}, staying on its current network");
        self.hosting = true;

        Ok(())
    }

    fn local_addr(&self) -> Ipv4Addr {
        self.route_addr().unwrap_or(Ipv4Addr::UNSPECIFIED)
    }
}
