
use core::error;
use core::presence::PresenceTransport;

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use log::{debug, warn};
use mio::net::UdpSocket;
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

const ANNOUNCE_RECEIVED: Token = Token(1);

/// Longer datagrams are cut to this length on receipt.
pub const MAX_ANNOUNCE_LEN: usize = 255;

/// A non-blocking UDP socket joined to the presence group.
///
/// The port is shared with address reuse so several devices can run on one
/// host, and multicast loopback stays on so they hear each other.
pub struct MulticastTransport {
    socket: UdpSocket,
    group: SocketAddrV4,
    poll: Poll,
    events: Events,
}

impl MulticastTransport {
    pub fn join(group: Ipv4Addr, port: u16) -> error::Result<Self> {
        Self::join_on(group, port, Ipv4Addr::UNSPECIFIED)
    }

    /// Joins `group` through the interface owning `interface`, or the default
    /// one when it is unspecified.
    pub fn join_on(group: Ipv4Addr, port: u16, interface: Ipv4Addr) -> error::Result<Self> {
        let socket = bind_socket(group, port, interface).map_err(error::Error::TransportUnavailable)?;
        let mut socket = UdpSocket::from_std(socket);

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut socket, ANNOUNCE_RECEIVED, Interest::READABLE)?;

        let events = Events::with_capacity(128);
        debug!("Joined {group}:{port}");

        Ok(Self {
            socket,
            group: SocketAddrV4::new(group, port),
            poll,
            events,
        })
    }

    pub fn group(&self) -> SocketAddrV4 {
        self.group
    }

    pub fn local_addr(&self) -> error::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl PresenceTransport for MulticastTransport {
    fn announce(&mut self, payload: &[u8]) -> error::Result<()> {
        self.socket.send_to(payload, SocketAddr::V4(self.group))?;

        Ok(())
    }

    fn drain(&mut self) -> error::Result<Vec<Vec<u8>>> {
        let mut datagrams = vec![];
        self.poll
            .poll(&mut self.events, Some(Duration::from_micros(0)))?;

        for e in self.events.iter() {
            if e.token() != ANNOUNCE_RECEIVED || !e.is_readable() {
                continue;
            }

            let socket = &self.socket;
            read_queued(|buf| socket.recv_from(buf).map(|(len, _)| len), &mut datagrams);
        }

        Ok(datagrams)
    }
}

/// Reads datagrams until the socket would block.
///
/// A receive error ends the turn but keeps what was read before it.
fn read_queued(mut recv: impl FnMut(&mut [u8]) -> io::Result<usize>, datagrams: &mut Vec<Vec<u8>>) {
    let mut buf = [0u8; MAX_ANNOUNCE_LEN];
    loop {
        match recv(&mut buf) {
            Ok(len) => datagrams.push(buf[..len].to_vec()),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!("Receiving announcements failed: {err}");
                break;
            }
        }
    }
}

fn bind_socket(group: Ipv4Addr, port: u16, interface: Ipv4Addr) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nonblocking(true)?;

    socket.bind(&SockAddr::from(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port)))?;
    socket.join_multicast_v4(&group, &interface)?;
    socket.set_multicast_loop_v4(true)?;

    Ok(socket.into())
}
