use crate::config::ArbiterConfig;
use crate::error;
use crate::storage::{KeyValueStore, Namespace};

use std::fmt;

use log::{debug, info, warn};
use smallvec::SmallVec;

pub const NAMESPACE: &str = "wifi";

const COUNT_KEY: &str = "count";

type CredentialList = SmallVec<[NetworkCredential; ArbiterConfig::DEFAULT_CAPACITY]>;

#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NetworkCredential {
    pub identifier: String,
    pub secret: String,
}

impl NetworkCredential {
    pub fn new(identifier: &str, secret: &str) -> Self {
        Self {
            identifier: String::from(identifier),
            secret: String::from(secret),
        }
    }
}

impl fmt::Debug for NetworkCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredential")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The ordered, capacity-bounded list of known networks.
///
/// Order is the order connections are attempted in. New identifiers are
/// appended; a known identifier keeps its position and only gets a new secret.
/// Each mutation rewrites the whole namespace before it is committed in memory.
pub struct CredentialStore<S> {
    store: S,
    capacity: usize,
    credentials: CredentialList,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub fn new(store: S, capacity: usize) -> Self {
        Self {
            store,
            capacity,
            credentials: CredentialList::new(),
        }
    }

    /// Replaces the in-memory list with the persisted one.
    ///
    /// Oversized or partially corrupt state is clamped rather than rejected:
    /// the count is capped at the capacity and duplicate identifiers keep
    /// their first occurrence. An unreadable namespace loads as empty.
    pub fn load(&mut self) -> error::Result<()> {
        let values = match self.store.load(NAMESPACE) {
            Ok(values) => values,
            Err(error::Error::Serde(err)) => {
                warn!("Stored networks are unreadable, starting empty: {err}");
                Namespace::default()
            }
            Err(err) => return Err(err),
        };

        let stored = values.get_int(COUNT_KEY).unwrap_or(0).max(0) as usize;
        if stored > self.capacity {
            warn!(
                "{stored} networks stored, only the first {} are kept",
                self.capacity
            );
        }

        let mut credentials = CredentialList::new();
        for i in 0..stored.min(self.capacity) {
            let credential = NetworkCredential::new(
                values.get_str(&ssid_key(i)).unwrap_or_default(),
                values.get_str(&pass_key(i)).unwrap_or_default(),
            );

            if credentials
                .iter()
                .any(|c: &NetworkCredential| c.identifier == credential.identifier)
            {
                debug!("Skipping duplicate stored network {:?}", credential.identifier);
                continue;
            }
            credentials.push(credential);
        }

        info!("Loaded {} networks", credentials.len());
        self.credentials = credentials;

        Ok(())
    }

    pub fn add_or_update(&mut self, identifier: &str, secret: &str) -> error::Result<()> {
        let mut next = self.credentials.clone();

        match next.iter().position(|c| c.identifier == identifier) {
            Some(i) => {
                next[i].secret = String::from(secret);
                self.commit(next)?;
                info!("Network updated: {identifier}");
            }
            None if next.len() >= self.capacity => {
                warn!("Network list full, {identifier} not added");
                return Err(error::Error::CapacityExceeded {
                    capacity: self.capacity,
                });
            }
            None => {
                next.push(NetworkCredential::new(identifier, secret));
                self.commit(next)?;
                info!("Network added: {identifier}");
            }
        }

        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> error::Result<NetworkCredential> {
        let len = self.credentials.len();
        if index >= len {
            return Err(error::Error::IndexOutOfRange { index, len });
        }

        let mut next = self.credentials.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        info!("Network removed at index {index}");

        Ok(removed)
    }

    pub fn clear(&mut self) -> error::Result<()> {
        self.commit(CredentialList::new())?;
        info!("All networks cleared");

        Ok(())
    }

    pub fn list(&self) -> &[NetworkCredential] {
        &self.credentials
    }

    /// The first network in attempt order.
    pub fn primary(&self) -> Option<&NetworkCredential> {
        self.credentials.first()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn commit(&mut self, next: CredentialList) -> error::Result<()> {
        self.store.save(NAMESPACE, &encode(&next))?;
        self.credentials = next;

        Ok(())
    }
}

fn ssid_key(i: usize) -> String {
    format!("ssid{i}")
}

fn pass_key(i: usize) -> String {
    format!("pass{i}")
}

fn encode(credentials: &[NetworkCredential]) -> Namespace {
    let mut values = Namespace::default();
    values.put_int(COUNT_KEY, credentials.len() as i64);

    for (i, credential) in credentials.iter().enumerate() {
        values.put_str(ssid_key(i), &credential.identifier);
        values.put_str(pass_key(i), &credential.secret);
    }

    values
}
