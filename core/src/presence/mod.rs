//! Peer presence over multicast gossip.
//!
//! Every device periodically announces its name, address and play status to a
//! well-known group and keeps a table of the devices it hears from. Peers that
//! stay silent past the staleness window are dropped. Delivery is best-effort
//! throughout: lost or garbled datagrams are ignored.

pub mod message;
pub mod table;

#[cfg(test)]
mod tests;

pub use message::{AnnounceMessage, PlayState};
pub use table::{PeerRecord, PeerTable, Upsert};

use crate::config::PresenceConfig;
use crate::error;
use crate::util::{ControlFlow, Element, Runnable, Timer};

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use mueue::*;

/// Datagram plumbing for the presence protocol.
pub trait PresenceTransport {
    /// Sends one datagram to the group.
    fn announce(&mut self, payload: &[u8]) -> error::Result<()>;

    /// Returns every datagram received so far without waiting for more.
    fn drain(&mut self) -> error::Result<Vec<Vec<u8>>>;
}

impl<T: PresenceTransport + ?Sized> PresenceTransport for Box<T> {
    fn announce(&mut self, payload: &[u8]) -> error::Result<()> {
        (**self).announce(payload)
    }

    fn drain(&mut self) -> error::Result<Vec<Vec<u8>>> {
        (**self).drain()
    }
}

#[derive(Debug, Clone)]
pub enum PresenceNotification {
    PeerDiscovered(PeerRecord),
    PeerLost(PeerRecord),
}

impl Message for PresenceNotification {}

pub struct PresenceProtocol<T> {
    send: Option<MessageSender<PresenceNotification>>,
    transport: T,

    display_name: String,
    address: Ipv4Addr,
    play_state: PlayState,
    label: String,

    announce_timer: Timer,
    stale_after: Duration,
    peers: PeerTable,
}

impl<T: PresenceTransport> PresenceProtocol<T> {
    /// Joins the group through `join` and announces right away.
    ///
    /// `join` receives the configured group and port. A failure to join is
    /// reported as [`error::Error::TransportUnavailable`].
    pub fn initialize<J>(
        join: J,
        display_name: &str,
        address: Ipv4Addr,
        config: &PresenceConfig,
        now: Instant,
    ) -> error::Result<Self>
    where
        J: FnOnce(Ipv4Addr, u16) -> error::Result<T>,
    {
        let transport = join(config.group, config.port).map_err(|err| match err {
            error::Error::Io(err) => error::Error::TransportUnavailable(err),
            err => err,
        })?;
        info!(
            "Presence started as '{display_name}' on {}:{}",
            config.group, config.port
        );

        let mut protocol = Self {
            send: None,
            transport,

            display_name: String::from(display_name),
            address,
            play_state: PlayState::default(),
            label: String::new(),

            announce_timer: Timer::starting_at(now, config.announce_interval()),
            stale_after: config.stale_after(),
            peers: PeerTable::new(config.capacity),
        };
        protocol.announce();

        Ok(protocol)
    }

    /// Changes what later announces report. Nothing is sent immediately.
    pub fn set_status(&mut self, play_state: PlayState, label: &str) {
        self.play_state = play_state;
        self.label = String::from(label);
    }

    pub fn set_address(&mut self, address: Ipv4Addr) {
        self.address = address;
    }

    /// One turn of the protocol: announce when due, take in whatever arrived,
    /// then drop stale peers. Never blocks.
    pub fn tick(&mut self, now: Instant) {
        if self.announce_timer.is_time_out_at(now) {
            self.announce();
        }

        match self.transport.drain() {
            Ok(datagrams) => {
                for datagram in datagrams {
                    self.handle_datagram(&datagram, now);
                }
            }
            Err(err) => warn!("Receiving announces failed: {err}"),
        }

        for peer in self.peers.evict_stale(now, self.stale_after) {
            info!("Device '{}' timed out", peer.display_name);
            self.send(PresenceNotification::PeerLost(peer));
        }
    }

    fn announce(&mut self) {
        let payload = self.own_announce().encode();

        match self.transport.announce(&payload) {
            Ok(()) => debug!("Announced: {}", String::from_utf8_lossy(&payload)),
            Err(err) => warn!("Announce failed: {err}"),
        }
    }

    fn handle_datagram(&mut self, datagram: &[u8], now: Instant) {
        let msg = match AnnounceMessage::parse(datagram) {
            Ok(msg) => msg,
            Err(err) => {
                trace!("Dropping datagram: {err}");
                return;
            }
        };

        if msg.display_name == self.display_name {
            return;
        }

        let name = msg.display_name.clone();
        match self.peers.upsert(msg, now) {
            Upsert::Inserted => {
                let Some(peer) = self.peers.get(&name).cloned() else {
                    return;
                };
                info!("Found device '{}' at {}", peer.display_name, peer.address);
                self.send(PresenceNotification::PeerDiscovered(peer));
            }
            Upsert::Updated => {}
            Upsert::Full => debug!("Peer table full, '{name}' not recorded"),
        }
    }

    /// The announce this device currently sends.
    pub fn own_announce(&self) -> AnnounceMessage {
        AnnounceMessage {
            display_name: self.display_name.clone(),
            address: self.address,
            play_state: self.play_state,
            label: self.label.clone(),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.display_name
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn peers(&self) -> Vec<PeerRecord> {
        self.peers.snapshot()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T> Element for PresenceProtocol<T> {
    type Notification = PresenceNotification;

    fn sender(&self) -> Option<MessageSender<Self::Notification>> {
        self.send.clone()
    }

    fn connect(&mut self, send: MessageSender<Self::Notification>) {
        self.send = Some(send);
    }
}

impl<T: PresenceTransport> Runnable for PresenceProtocol<T> {
    fn update(&mut self, _flow: &mut ControlFlow) -> error::Result<()> {
        self.tick(Instant::now());

        Ok(())
    }
}
