
use super::*;

use crate::config::ArbiterConfig;
use crate::storage::KeyValueStore;

use std::thread;

use log::{info, trace, warn};

/// Brings the device onto a network.
///
/// [`initialize`](Self::initialize) walks the stored credentials in order,
/// giving each one a bounded time to come up, and falls back to a
/// self-hosted access point when none does. The resulting mode sticks.
pub struct NetworkArbiter<L, S> {
    link: L,
    credentials: CredentialStore<S>,
    config: ArbiterConfig,

    mode: ConnectivityMode,
    attempts: Vec<String>,
}

impl<L: NetworkLink, S: KeyValueStore> NetworkArbiter<L, S> {
    pub fn new(link: L, store: S, config: ArbiterConfig) -> error::Result<Self> {
        let mut credentials = CredentialStore::new(store, config.capacity);
        credentials.load()?;

        Ok(Self {
            link,
            credentials,
            config,

            mode: ConnectivityMode::Disconnected,
            attempts: vec![],
        })
    }

    /// Runs the one-shot connection sweep.
    ///
    /// Blocks for up to the attempt timeout per stored credential. Only a
    /// failure to start the self-hosted access point is an error. Once a
    /// terminal mode is reached, later calls return it without a new sweep.
    pub fn initialize(&mut self) -> error::Result<ConnectivityMode> {
        if self.mode != ConnectivityMode::Disconnected {
            return Ok(self.mode);
        }

        self.attempts.clear();

        let credentials = self.credentials.list().to_vec();
        let total = credentials.len();
        for (i, credential) in credentials.iter().enumerate() {
            info!(
                "Trying network {}/{}: {}",
                i + 1,
                total,
                credential.identifier
            );
            self.attempts.push(credential.identifier.clone());

            if self.try_connect(credential) {
                self.mode = ConnectivityMode::ClientConnected;
                info!("Connected, address {}", self.link.local_addr());

                return Ok(self.mode);
            }
        }

        info!("No networks available, starting self-hosted access point");
        self.start_self_hosted()?;
        self.mode = ConnectivityMode::SelfHosted;
        info!("Access point address {}", self.config.access_point_addr);

        Ok(self.mode)
    }

    fn try_connect(&mut self, credential: &NetworkCredential) -> bool {
        if let Err(err) = self.link.begin_connect(credential) {
            warn!("Connect request for {} failed: {err}", credential.identifier);
            return false;
        }

        let mut polls = 0;
        while !self.link.is_connected() && polls < self.config.max_polls {
            thread::sleep(self.config.poll_interval());
            polls += 1;
            trace!("Waiting for {} ({polls})", credential.identifier);
        }

        let connected = self.link.is_connected();
        if !connected {
            info!(
                "{} did not come up within {:?}",
                credential.identifier,
                self.config.attempt_timeout()
            );
        }

        connected
    }

    fn start_self_hosted(&mut self) -> error::Result<()> {
        self.link
            .start_access_point(
                &self.config.access_point_ssid,
                &self.config.access_point_passphrase,
            )
            .map_err(|err| match err {
                err @ error::Error::AccessPointUnavailable(_) => err,
                err => error::Error::AccessPointUnavailable(err.to_string()),
            })
    }

    pub fn current_mode(&self) -> ConnectivityMode {
        self.mode
    }

    /// Whether the client link is up right now.
    ///
    /// A link lost after initialization shows up here while
    /// [`current_mode`](Self::current_mode) keeps reporting `ClientConnected`.
    pub fn is_connected(&self) -> bool {
        self.mode == ConnectivityMode::ClientConnected && self.link.is_connected()
    }

    /// The address peers should use to reach this device in its current mode.
    pub fn local_addr(&self) -> Ipv4Addr {
        match self.mode {
            ConnectivityMode::ClientConnected => self.link.local_addr(),
            ConnectivityMode::SelfHosted => self.config.access_point_addr,
            ConnectivityMode::Disconnected => Ipv4Addr::UNSPECIFIED,
        }
    }

    /// Identifiers tried by the last sweep, in attempt order.
    pub fn attempts(&self) -> &[String] {
        &self.attempts
    }

    pub fn add_or_update_credential(&mut self, identifier: &str, secret: &str) -> error::Result<()> {
        self.credentials.add_or_update(identifier, secret)
    }

    pub fn remove_credential(&mut self, index: usize) -> error::Result<NetworkCredential> {
        self.credentials.remove(index)
    }

    pub fn list_credentials(&self) -> &[NetworkCredential] {
        self.credentials.list()
    }

    pub fn primary_credential(&self) -> Option<&NetworkCredential> {
        self.credentials.primary()
    }

    pub fn count(&self) -> usize {
        self.credentials.len()
    }

    pub fn clear_all_credentials(&mut self) -> error::Result<()> {
        self.credentials.clear()
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
