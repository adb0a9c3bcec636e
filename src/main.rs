use gridbeacon_core::config::Config;
use gridbeacon_core::error;
use gridbeacon_core::identity::IdentityStore;
use gridbeacon_core::mueue::unidirectional_queue;
use gridbeacon_core::network::{ConnectivityMode, NetworkArbiter};
use gridbeacon_core::presence::{PresenceNotification, PresenceProtocol};
use gridbeacon_core::storage::FileStore;
use gridbeacon_core::util::{Element, RunnableStateMachine, Timer};
use lan::{HostLink, MulticastTransport};

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use log::{error, info, warn};

const LOOP_INTERVAL: Duration = Duration::from_millis(10);
const LINK_CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(name = "gridbeacon", version, about = "GridBeacon appliance core")]
struct Cli {
    /// JSON configuration file; built-in defaults are used without one
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Command {
    /// Join a network and announce presence until stopped (the default)
    Run,
    /// Print the stored networks in attempt order
    Networks,
    /// Store a network, or update the secret of a known one
    AddNetwork { identifier: String, secret: String },
    /// Remove the network at `index`
    RemoveNetwork { index: usize },
    /// Forget every stored network
    ClearNetworks,
    /// Persist a new device name
    Rename { name: String },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = try_main() {
        error!("{err}");
        std::process::exit(1);
    }
}

fn try_main() -> error::Result<()> {
    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config),
        Command::Networks => {
            let arbiter = open_arbiter(&config)?;
            let networks: Vec<_> = arbiter
                .list_credentials()
                .iter()
                .enumerate()
                .map(|(index, c)| serde_json::json!({ "index": index, "identifier": c.identifier }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&networks)?);

            Ok(())
        }
        Command::AddNetwork { identifier, secret } => {
            open_arbiter(&config)?.add_or_update_credential(&identifier, &secret)
        }
        Command::RemoveNetwork { index } => {
            open_arbiter(&config)?.remove_credential(index).map(|_| ())
        }
        Command::ClearNetworks => open_arbiter(&config)?.clear_all_credentials(),
        Command::Rename { name } => {
            let store = FileStore::open(&config.storage_dir)?;
            IdentityStore::new(store).rename(&name).map(|_| ())
        }
    }
}

fn open_arbiter(config: &Config) -> error::Result<NetworkArbiter<HostLink, FileStore>> {
    let store = FileStore::open(&config.storage_dir)?;

    NetworkArbiter::new(HostLink::new(), store, config.arbiter.clone())
}

fn run(config: &Config) -> error::Result<()> {
    let store = FileStore::open(&config.storage_dir)?;

    let mut arbiter = NetworkArbiter::new(HostLink::new(), store.clone(), config.arbiter.clone())?;
    let mode = arbiter.initialize()?;
    info!("Network mode: {mode}");

    let identity = IdentityStore::new(store).resolve(config.device_name.as_deref())?;

    let mut presence = PresenceProtocol::initialize(
        MulticastTransport::join,
        &identity.display_name,
        arbiter.local_addr(),
        &config.presence,
        Instant::now(),
    )?;
    let (send, recv) = unidirectional_queue();
    presence.connect(send);

    let mut presence = RunnableStateMachine::new_running(presence);
    let mut link_watch = LinkWatch::new(Instant::now());
    while let Some(res) = presence.proceed() {
        res?;

        let mut changed = false;
        while let Some(notification) = recv.recv() {
            changed = true;
            match notification {
                PresenceNotification::PeerDiscovered(peer) => info!(
                    "+ {} ({}, {}, {:?})",
                    peer.display_name,
                    peer.address,
                    peer.play_state.as_str(),
                    peer.label
                ),
                PresenceNotification::PeerLost(peer) => info!("- {}", peer.display_name),
            }
        }
        if changed {
            info!("{} peers known", presence.runnable().peer_count());
        }

        if mode == ConnectivityMode::ClientConnected {
            match link_watch.check(Instant::now(), || arbiter.is_connected()) {
                Some(false) => warn!("Network link lost, mode stays {mode} until restart"),
                Some(true) => info!("Network link back"),
                None => {}
            }
        }

        thread::sleep(LOOP_INTERVAL);
    }

    Ok(())
}

/// Samples the client link at most once per [`LINK_CHECK_INTERVAL`].
struct LinkWatch {
    timer: Timer,
    lost: bool,
}

impl LinkWatch {
    fn new(now: Instant) -> Self {
        Self {
            timer: Timer::starting_at(now, LINK_CHECK_INTERVAL),
            lost: false,
        }
    }

    /// Returns the new link state when it changed since the last sample.
    fn check(&mut self, now: Instant, is_connected: impl FnOnce() -> bool) -> Option<bool> {
        if !self.timer.is_time_out_at(now) {
            return None;
        }

        let connected = is_connected();
        if connected != self.lost {
            return None;
        }
        self.lost = !connected;

        Some(connected)
    }
}
