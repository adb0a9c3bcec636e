use crate::error;
use crate::storage::{KeyValueStore, Namespace};

use log::{info, warn};
use rand::Rng;

pub const NAMESPACE: &str = "discovery";

const NAME_KEY: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub display_name: String,
}

/// The persisted, human-readable device name.
///
/// A name is generated only when none was ever stored; afterwards it changes
/// only through an explicit rename.
pub struct IdentityStore<S> {
    store: S,
}

impl<S: KeyValueStore> IdentityStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Picks the name to run under.
    ///
    /// A non-empty `requested` name wins and is persisted. Otherwise the stored
    /// name is reused, or a fresh `GridBeacon-NNNN` name is generated and stored.
    pub fn resolve(&self, requested: Option<&str>) -> error::Result<DeviceIdentity> {
        if let Some(name) = requested.filter(|name| !name.is_empty()) {
            return self.rename(name);
        }

        if let Some(identity) = self.load()? {
            info!("Device name is '{}'", identity.display_name);
            return Ok(identity);
        }

        let generated = format!("GridBeacon-{}", rand::thread_rng().gen_range(1000..9999));
        info!("No device name stored, generated '{generated}'");

        self.rename(&generated)
    }

    pub fn load(&self) -> error::Result<Option<DeviceIdentity>> {
        let values = match self.store.load(NAMESPACE) {
            Ok(values) => values,
            Err(error::Error::Serde(err)) => {
                warn!("Stored device name is unreadable, treating it as absent: {err}");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        Ok(values
            .get_str(NAME_KEY)
            .filter(|name| !name.is_empty())
            .map(|name| DeviceIdentity {
                display_name: String::from(name),
            }))
    }

    pub fn rename(&self, name: &str) -> error::Result<DeviceIdentity> {
        if name.is_empty() {
            return Err(error::Error::Other(String::from(
                "A device name cannot be empty",
            )));
        }

        let mut values = Namespace::default();
        values.put_str(NAME_KEY, name);
        self.store.save(NAMESPACE, &values)?;
        info!("Device name is '{name}'");

        Ok(DeviceIdentity {
            display_name: String::from(name),
        })
    }
}
