use super::message::{AnnounceMessage, PlayState};

use crate::config::PresenceConfig;

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use smallvec::SmallVec;

type Slots = SmallVec<[Option<PeerRecord>; PresenceConfig::DEFAULT_CAPACITY]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub display_name: String,
    pub address: Ipv4Addr,
    pub play_state: PlayState,
    pub label: String,
    pub last_seen: Instant,
}

impl PeerRecord {
    fn from_announce(msg: AnnounceMessage, now: Instant) -> Self {
        Self {
            display_name: msg.display_name,
            address: msg.address,
            play_state: msg.play_state,
            label: msg.label,
            last_seen: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    /// The peer was unknown and every slot is taken.
    Full,
}

/// A fixed number of slots keyed by display name.
///
/// A slot is either free or holds one active peer. New peers take the lowest
/// free slot, so snapshots list peers in slot order.
#[derive(Debug, Clone)]
pub struct PeerTable {
    slots: Slots,
}

impl PeerTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Slots::from_elem(None, capacity),
        }
    }

    pub fn upsert(&mut self, msg: AnnounceMessage, now: Instant) -> Upsert {
        let mut free_slot = None;

        for (i, slot) in self.slots.iter_mut().enumerate() {
            match slot {
                Some(peer) if peer.display_name == msg.display_name => {
                    peer.address = msg.address;
                    peer.play_state = msg.play_state;
                    peer.label = msg.label;
                    peer.last_seen = now;

                    return Upsert::Updated;
                }
                None if free_slot.is_none() => free_slot = Some(i),
                _ => {}
            }
        }

        let Some(i) = free_slot else {
            return Upsert::Full;
        };
        self.slots[i] = Some(PeerRecord::from_announce(msg, now));

        Upsert::Inserted
    }

    /// Frees every slot whose peer has been silent for longer than `stale_after`
    /// and returns the evicted peers.
    pub fn evict_stale(&mut self, now: Instant, stale_after: Duration) -> Vec<PeerRecord> {
        self.slots
            .iter_mut()
            .filter(|slot| {
                slot.as_ref().is_some_and(|peer| {
                    now.saturating_duration_since(peer.last_seen) > stale_after
                })
            })
            .filter_map(Option::take)
            .collect()
    }

    pub fn get(&self, display_name: &str) -> Option<&PeerRecord> {
        self.iter().find(|peer| peer.display_name == display_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerRecord> {
        self.slots.iter().flatten()
    }

    pub fn snapshot(&self) -> Vec<PeerRecord> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn announce(name: &str, last_octet: u8) -> AnnounceMessage {
        AnnounceMessage {
            display_name: String::from(name),
            address: Ipv4Addr::new(10, 0, 0, last_octet),
            play_state: PlayState::Paused,
            label: String::new(),
        }
    }

    fn names(table: &PeerTable) -> Vec<&str> {
        table.iter().map(|p| p.display_name.as_str()).collect()
    }

    #[test]
    fn test_full_table_drops_new_peers_only() {
        let now = Instant::now();
        let mut table = PeerTable::new(2);

        assert_eq!(table.upsert(announce("a", 1), now), Upsert::Inserted);
        assert_eq!(table.upsert(announce("b", 2), now), Upsert::Inserted);
        assert_eq!(table.upsert(announce("c", 3), now), Upsert::Full);
        assert_eq!(table.upsert(announce("a", 9), now), Upsert::Updated);

        assert_eq!(names(&table), ["a", "b"]);
        assert_eq!(table.get("a").map(|p| p.address), Some(Ipv4Addr::new(10, 0, 0, 9)));
    }

    #[test]
    fn test_freed_slot_is_reused() {
        let start = Instant::now();
        let mut table = PeerTable::new(3);
        table.upsert(announce("a", 1), start);
        table.upsert(announce("b", 2), start + Duration::from_secs(60));
        table.upsert(announce("c", 3), start + Duration::from_secs(60));

        let evicted = table.evict_stale(start + Duration::from_secs(121), Duration::from_secs(120));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].display_name, "a");

        table.upsert(announce("d", 4), start + Duration::from_secs(122));

        assert_eq!(names(&table), ["d", "b", "c"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.capacity(), 3);
    }

    #[test]
    fn test_zero_capacity_table_is_always_full() {
        let mut table = PeerTable::new(0);

        assert_eq!(table.upsert(announce("a", 1), Instant::now()), Upsert::Full);
        assert!(table.is_empty());
    }
}
