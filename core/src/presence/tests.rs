use super::*;

use std::collections::VecDeque;
use std::io;

const OWN_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 20);

#[derive(Default)]
struct MemoryTransport {
    sent: Vec<Vec<u8>>,
    inbox: VecDeque<Vec<u8>>,
}

impl MemoryTransport {
    fn deliver(&mut self, datagram: &str) {
        self.inbox.push_back(datagram.as_bytes().to_vec());
    }
}

impl PresenceTransport for MemoryTransport {
    fn announce(&mut self, payload: &[u8]) -> error::Result<()> {
        self.sent.push(payload.to_vec());

        Ok(())
    }

    fn drain(&mut self) -> error::Result<Vec<Vec<u8>>> {
        Ok(self.inbox.drain(..).collect())
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn start(name: &str, now: Instant) -> error::Result<PresenceProtocol<MemoryTransport>> {
    init_logging();

    PresenceProtocol::initialize(
        |_, _| Ok(MemoryTransport::default()),
        name,
        OWN_ADDR,
        &PresenceConfig::default(),
        now,
    )
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

#[test]
fn test_initialize_announces_immediately() -> error::Result<()> {
    let protocol = start("Lounge", Instant::now())?;

    assert_eq!(
        protocol.transport().sent,
        [b"GRIDBEACON|Lounge|192.168.1.20|paused|".to_vec()]
    );
    assert_eq!(protocol.device_name(), "Lounge");
    assert_eq!(protocol.peer_count(), 0);

    Ok(())
}

#[test]
fn test_join_failure_is_transport_unavailable() {
    let res = PresenceProtocol::<MemoryTransport>::initialize(
        |_, _| Err(io::Error::new(io::ErrorKind::AddrInUse, "taken").into()),
        "Lounge",
        OWN_ADDR,
        &PresenceConfig::default(),
        Instant::now(),
    );

    assert!(matches!(res, Err(error::Error::TransportUnavailable(_))));
}

#[test]
fn test_join_uses_configured_group() -> error::Result<()> {
    let config = PresenceConfig {
        group: Ipv4Addr::new(239, 9, 9, 9),
        port: 7000,
        ..Default::default()
    };

    let mut joined = None;
    PresenceProtocol::initialize(
        |group, port| {
            joined = Some((group, port));
            Ok(MemoryTransport::default())
        },
        "Lounge",
        OWN_ADDR,
        &config,
        Instant::now(),
    )?;

    assert_eq!(joined, Some((Ipv4Addr::new(239, 9, 9, 9), 7000)));

    Ok(())
}

#[test]
fn test_own_announce_is_ignored() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Kitchen", now)?;

    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|playing|JazzFM");
    protocol.tick(now + secs(1));

    assert_eq!(protocol.peer_count(), 0);

    Ok(())
}

#[test]
fn test_peer_announce_is_recorded() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Lounge", now)?;

    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|playing|JazzFM");
    protocol.tick(now + secs(1));

    assert_eq!(
        protocol.peers(),
        [PeerRecord {
            display_name: String::from("Kitchen"),
            address: Ipv4Addr::new(192, 168, 1, 50),
            play_state: PlayState::Playing,
            label: String::from("JazzFM"),
            last_seen: now + secs(1),
        }]
    );

    Ok(())
}

#[test]
fn test_repeated_announce_updates_in_place() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Lounge", now)?;

    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|playing|JazzFM");
    protocol.tick(now + secs(1));
    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.51|paused|Talk");
    protocol.tick(now + secs(2));

    let peers = protocol.peers();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].address, Ipv4Addr::new(192, 168, 1, 51));
    assert_eq!(peers[0].play_state, PlayState::Paused);
    assert_eq!(peers[0].label, "Talk");
    assert_eq!(peers[0].last_seen, now + secs(2));

    Ok(())
}

#[test]
fn test_drains_everything_queued_in_one_tick() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Lounge", now)?;

    for i in 0..5 {
        protocol
            .transport_mut()
            .deliver(&format!("GRIDBEACON|Peer{i}|10.0.0.{i}|paused|"));
    }
    protocol.tick(now + secs(1));

    assert_eq!(protocol.peer_count(), 5);
    assert!(protocol.transport().inbox.is_empty());

    Ok(())
}

#[test]
fn test_announce_cadence() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Lounge", now)?;

    protocol.tick(now + secs(29));
    assert_eq!(protocol.transport().sent.len(), 1);

    protocol.tick(now + secs(30));
    assert_eq!(protocol.transport().sent.len(), 2);

    protocol.tick(now + secs(31));
    assert_eq!(protocol.transport().sent.len(), 2);

    protocol.tick(now + secs(60));
    assert_eq!(protocol.transport().sent.len(), 3);

    Ok(())
}

#[test]
fn test_status_goes_out_with_next_announce() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Lounge", now)?;

    protocol.set_status(PlayState::Playing, "JazzFM");
    assert_eq!(protocol.transport().sent.len(), 1);

    protocol.tick(now + secs(30));

    assert_eq!(
        protocol.transport().sent.last().map(Vec::as_slice),
        Some(&b"GRIDBEACON|Lounge|192.168.1.20|playing|JazzFM"[..])
    );

    Ok(())
}

#[test]
fn test_stale_peer_is_evicted() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Lounge", now)?;

    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|playing|JazzFM");
    protocol.tick(now);

    protocol.tick(now + secs(120));
    assert_eq!(protocol.peer_count(), 1);

    protocol.tick(now + secs(120) + Duration::from_millis(1));
    assert_eq!(protocol.peer_count(), 0);
    assert!(protocol.peers().is_empty());

    Ok(())
}

#[test]
fn test_refreshed_peer_survives() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Lounge", now)?;

    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|playing|JazzFM");
    protocol.tick(now);
    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|playing|JazzFM");
    protocol.tick(now + secs(119));

    protocol.tick(now + secs(200));
    assert_eq!(protocol.peer_count(), 1);

    protocol.tick(now + secs(240));
    assert_eq!(protocol.peer_count(), 0);

    Ok(())
}

#[test]
fn test_inbound_is_processed_before_sweep() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Lounge", now)?;

    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|playing|JazzFM");
    protocol.tick(now);

    // Would be stale at this instant, but the fresh announce lands first.
    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|playing|JazzFM");
    protocol.tick(now + secs(500));

    assert_eq!(protocol.peer_count(), 1);

    Ok(())
}

#[test]
fn test_round_trip_through_another_device() -> error::Result<()> {
    let now = Instant::now();
    let mut sender = start("Kitchen", now)?;
    sender.set_status(PlayState::Playing, "Radio | Two");
    sender.set_address(Ipv4Addr::new(10, 1, 2, 3));

    let mut receiver = start("Lounge", now)?;
    receiver.transport_mut().inbox.push_back(sender.own_announce().encode());
    receiver.tick(now);

    let sent = sender.own_announce();
    let peers = receiver.peers();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].display_name, sent.display_name);
    assert_eq!(peers[0].address, sent.address);
    assert_eq!(peers[0].play_state, sent.play_state);
    assert_eq!(peers[0].label, sent.label);

    Ok(())
}

#[test]
fn test_malformed_datagrams_change_nothing() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Lounge", now)?;

    for datagram in [
        "GRIDBEACON|Kitchen|192.168.1.50|playing",
        "GRIDBEACON|Kitchen",
        "hello",
        "GRIDBEACON|Kitchen|nowhere|playing|JazzFM",
    ] {
        protocol.transport_mut().deliver(datagram);
    }
    protocol.transport_mut().inbox.push_back(vec![0xff; 64]);
    protocol.tick(now);

    assert_eq!(protocol.peer_count(), 0);

    Ok(())
}

#[test]
fn test_full_table_ignores_new_peers() -> error::Result<()> {
    let now = Instant::now();
    let config = PresenceConfig {
        capacity: 2,
        ..Default::default()
    };
    let mut protocol = PresenceProtocol::initialize(
        |_, _| Ok(MemoryTransport::default()),
        "Lounge",
        OWN_ADDR,
        &config,
        now,
    )?;

    for name in ["A", "B", "C"] {
        protocol
            .transport_mut()
            .deliver(&format!("GRIDBEACON|{name}|10.0.0.1|paused|"));
    }
    protocol.tick(now);

    let names: Vec<_> = protocol
        .peers()
        .into_iter()
        .map(|p| p.display_name)
        .collect();
    assert_eq!(names, ["A", "B"]);

    Ok(())
}

#[test]
fn test_notifications() -> error::Result<()> {
    let now = Instant::now();
    let mut protocol = start("Lounge", now)?;
    let (send, recv) = unidirectional_queue();
    protocol.connect(send);

    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|playing|JazzFM");
    protocol.tick(now);
    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|paused|JazzFM");
    protocol.tick(now + secs(1));

    match recv.recv() {
        Some(PresenceNotification::PeerDiscovered(peer)) => {
            assert_eq!(peer.display_name, "Kitchen")
        }
        other => panic!("Unexpected notification: {:?}", other),
    }
    // Updates are silent.
    assert!(recv.recv().is_none());

    protocol.tick(now + secs(200));

    match recv.recv() {
        Some(PresenceNotification::PeerLost(peer)) => assert_eq!(peer.display_name, "Kitchen"),
        other => panic!("Unexpected notification: {:?}", other),
    }

    Ok(())
}

#[test]
fn test_runnable_update_ticks() -> error::Result<()> {
    let mut protocol = start("Lounge", Instant::now())?;
    protocol
        .transport_mut()
        .deliver("GRIDBEACON|Kitchen|192.168.1.50|playing|JazzFM");

    let mut flow = ControlFlow::Continue;
    protocol.update(&mut flow)?;

    assert_eq!(protocol.peer_count(), 1);
    assert_eq!(flow, ControlFlow::Continue);

    Ok(())
}
