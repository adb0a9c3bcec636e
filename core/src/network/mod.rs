pub mod arbiter;
pub mod credentials;

pub use arbiter::NetworkArbiter;
pub use credentials::{CredentialStore, NetworkCredential};

use crate::error;

use std::fmt;
use std::net::Ipv4Addr;

/// How the device is attached to an IP network.
///
/// `ClientConnected` and `SelfHosted` are terminal for the lifetime of the
/// process: nothing re-evaluates the mode short of a restart.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ConnectivityMode {
    #[default]
    Disconnected,
    ClientConnected,
    SelfHosted,
}

impl fmt::Display for ConnectivityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::ClientConnected => "client",
            Self::SelfHosted => "self-hosted",
        };

        f.write_str(name)
    }
}

/// The radio seen from the arbiter.
///
/// `begin_connect` only issues the request; the arbiter observes the outcome
/// by polling `is_connected`.
pub trait NetworkLink {
    fn begin_connect(&mut self, credential: &NetworkCredential) -> error::Result<()>;
    fn is_connected(&self) -> bool;
    fn start_access_point(&mut self, ssid: &str, passphrase: &str) -> error::Result<()>;
    fn local_addr(&self) -> Ipv4Addr;
}

impl<L: NetworkLink + ?Sized> NetworkLink for Box<L> {
    fn begin_connect(&mut self, credential: &NetworkCredential) -> error::Result<()> {
        (**self).begin_connect(credential)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn start_access_point(&mut self, ssid: &str, passphrase: &str) -> error::Result<()> {
        (**self).start_access_point(ssid, passphrase)
    }

    fn local_addr(&self) -> Ipv4Addr {
        (**self).local_addr()
    }
}
