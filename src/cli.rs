use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use converge::{Filter, Intent};

#[derive(Parser)]
#[command(name = "ionos-converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge IONOS Cloud resources to a declared state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/ionos-converge/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage a virtual data center
    Datacenter(DatacenterArgs),

    /// Manage a LAN inside a data center
    Lan(LanArgs),

    /// Manage a Kubernetes node pool
    Nodepool(NodepoolArgs),

    /// List resources, optionally filtered
    Info(InfoArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared Arguments
// ============================================================================

/// API endpoint and credentials; flags win over environment, both over the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// API base URL
    #[arg(long, env = "IONOS_API_URL", global = true)]
    pub api_url: Option<String>,

    /// API token (preferred over username/password)
    #[arg(long, env = "IONOS_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Account user name
    #[arg(long, env = "IONOS_USERNAME", global = true)]
    pub username: Option<String>,

    /// Account password
    #[arg(long, env = "IONOS_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateArg {
    Present,
    Absent,
    Update,
}

impl From<StateArg> for Intent {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Present => Intent::Present,
            StateArg::Absent => Intent::Absent,
            StateArg::Update => Intent::Update,
        }
    }
}

/// Flags common to every managed resource
#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    /// Desired state of the resource
    #[arg(long, value_enum, default_value = "present")]
    pub state: StateArg,

    /// Id or name of an existing resource
    pub identifier: Option<String>,

    /// Return as soon as the API accepts the change
    #[arg(long)]
    pub no_wait: bool,

    /// Seconds to wait for an asynchronous operation
    #[arg(long, value_name = "SECS")]
    pub wait_timeout: Option<u64>,

    /// Allow destroy-and-recreate when an immutable property changes
    #[arg(long)]
    pub allow_replace: bool,

    /// Show what would change without changing anything
    #[arg(long)]
    pub check: bool,

    /// Seconds before the first status poll
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<f64>,

    /// Upper bound in seconds between status polls
    #[arg(long, value_name = "SECS")]
    pub poll_max: Option<f64>,
}

// ============================================================================
// Resource Commands
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct DatacenterArgs {
    #[command(flatten)]
    pub common: ReconcileArgs,

    /// Data center name
    #[arg(long)]
    pub name: Option<String>,

    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,

    /// Physical location, e.g. de/fra (changing it requires --allow-replace)
    #[arg(long)]
    pub location: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LanArgs {
    #[command(flatten)]
    pub common: ReconcileArgs,

    /// Id or name of the data center holding the LAN
    #[arg(long)]
    pub datacenter: String,

    /// LAN name
    #[arg(long)]
    pub name: Option<String>,

    /// Whether the LAN faces the public internet
    #[arg(long)]
    pub public: Option<bool>,

    /// IPv6 CIDR block, or AUTO
    #[arg(long)]
    pub ipv6_cidr: Option<String>,

    /// Private cross-connect id
    #[arg(long)]
    pub pcc: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct NodepoolArgs {
    #[command(flatten)]
    pub common: ReconcileArgs,

    /// Id or name of the Kubernetes cluster
    #[arg(long)]
    pub cluster: String,

    /// Node pool name
    #[arg(long)]
    pub name: Option<String>,

    /// Id of the data center the nodes run in
    #[arg(long)]
    pub datacenter_id: Option<String>,

    /// Number of worker nodes
    #[arg(long)]
    pub node_count: Option<u32>,

    /// CPU family of the nodes
    #[arg(long)]
    pub cpu_family: Option<String>,

    /// Cores per node
    #[arg(long)]
    pub cores_count: Option<u32>,

    /// RAM per node in MB (multiples of 1024)
    #[arg(long)]
    pub ram_size: Option<u32>,

    /// HDD or SSD
    #[arg(long)]
    pub storage_type: Option<String>,

    /// Volume size per node in GB
    #[arg(long)]
    pub storage_size: Option<u32>,

    /// AUTO, ZONE_1 or ZONE_2
    #[arg(long)]
    pub availability_zone: Option<String>,

    /// Kubernetes version of the nodes
    #[arg(long)]
    pub k8s_version: Option<String>,
}

// ============================================================================
// Info Command
// ============================================================================

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Datacenter,
    Lan,
    Nodepool,
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// Resource type to list
    #[arg(value_enum)]
    pub kind: ResourceKind,

    /// Parent data center (required for lan)
    #[arg(long)]
    pub datacenter: Option<String>,

    /// Parent cluster (required for nodepool)
    #[arg(long)]
    pub cluster: Option<String>,

    /// Keep items whose value at a dotted path matches, e.g. properties.name=web
    #[arg(long = "filter", value_name = "PATH=VALUE")]
    pub filters: Vec<Filter>,
}
