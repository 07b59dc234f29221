use clap::{Parser, ValueEnum};
use ledger_core::{constants::DEFAULT_DIFFICULTY_ZEROS, peers::normalize_address, ProofOfWork};
use ledger_storage::StoreKind;
use std::{path::PathBuf, time::Duration};

pub const DEFAULT_PEER_TIMEOUT_MS: u64 = 2_000;

#[derive(Parser, Debug, Clone)]
#[command(name = "ledger-node")]
#[command(about = "Proof-of-work ledger node with gossip and longest-chain consensus")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5000
    #[arg(long, default_value = "127.0.0.1:5000")]
    pub listen: String,

    /// Address peers use to reach this node (defaults to --listen)
    #[arg(long)]
    pub advertise: Option<String>,

    /// Directory holding the chain snapshot
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Snapshot backend
    #[arg(long, value_enum, default_value_t = StoreArg::Json)]
    pub store: StoreArg,

    /// Static peer, repeatable (http://host:port or host:port)
    #[arg(long = "peer")]
    pub peers: Vec<String>,

    /// Directory service to register with on startup
    #[arg(long)]
    pub directory: Option<String>,

    /// Leading zero hex digits a proof digest must have
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY_ZEROS)]
    pub difficulty: usize,

    /// Timeout for every outbound peer request, in milliseconds
    #[arg(long, default_value_t = DEFAULT_PEER_TIMEOUT_MS)]
    pub peer_timeout_ms: u64,

    /// Which received transactions get flooded onwards
    #[arg(long, value_enum, default_value_t = RelayPolicy::OriginOnly)]
    pub relay: RelayPolicy,

    /// Recipient of mining rewards (random when omitted)
    #[arg(long)]
    pub node_id: Option<String>,

    /// Do not pull longer chains from peers before serving
    #[arg(long)]
    pub skip_initial_sync: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    Json,
    Sled,
}

impl From<StoreArg> for StoreKind {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Json => StoreKind::Json,
            StoreArg::Sled => StoreKind::Sled,
        }
    }
}

/// Which received transactions a node floods onwards after accepting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RelayPolicy {
    /// Only transactions submitted directly by a client (not yet marked
    /// propagated) are flooded. One hop over a full mesh.
    #[default]
    OriginOnly,
    /// Every newly accepted transaction is flooded again; duplicate
    /// suppression in the pool is what stops the flood.
    Relay,
}

impl RelayPolicy {
    pub fn should_flood(self, propagated: bool) -> bool {
        match self {
            RelayPolicy::OriginOnly => !propagated,
            RelayPolicy::Relay => true,
        }
    }
}

/// Runtime settings shared by every part of a node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Normalized `host:port` this node is reachable at.
    pub advertise: String,
    pub node_id: String,
    pub pow: ProofOfWork,
    pub peer_timeout: Duration,
    pub relay: RelayPolicy,
}

impl NodeConfig {
    pub fn new(advertise: &str) -> anyhow::Result<Self> {
        Ok(Self {
            advertise: normalize_address(advertise)?,
            node_id: random_node_id(),
            pow: ProofOfWork::default(),
            peer_timeout: Duration::from_millis(DEFAULT_PEER_TIMEOUT_MS),
            relay: RelayPolicy::default(),
        })
    }

    pub fn with_pow(mut self, pow: ProofOfWork) -> Self {
        self.pow = pow;
        self
    }

    pub fn with_relay(mut self, relay: RelayPolicy) -> Self {
        self.relay = relay;
        self
    }

    pub fn with_peer_timeout(mut self, timeout: Duration) -> Self {
        self.peer_timeout = timeout;
        self
    }

    /// Port part of the advertised address.
    pub fn port(&self) -> u16 {
        self.advertise
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok())
            .unwrap_or_default()
    }
}

impl Args {
    pub fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let advertise = match &self.advertise {
            Some(addr) => addr.clone(),
            None => self.listen.replace("0.0.0.0", "127.0.0.1"),
        };
        let mut config = NodeConfig::new(&advertise)?
            .with_pow(ProofOfWork::with_zeros(self.difficulty))
            .with_relay(self.relay)
            .with_peer_timeout(Duration::from_millis(self.peer_timeout_ms));
        if let Some(id) = &self.node_id {
            config.node_id = id.clone();
        }
        Ok(config)
    }
}

pub fn random_node_id() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}
