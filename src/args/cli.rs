use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Network load-testing toolkit: a rate-controlled HTTP archer (client) and a stats-tracking target (server) with optional etcd aggregation."
)]
pub struct ArbalestArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run in archer (client) mode, driving load at a target
    Archer(ArcherArgs),
    /// Run in target (server) mode, serving while tracking stats
    Target(TargetArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ArcherArgs {
    /// Remote target URL
    #[arg(long, short = 't')]
    pub target: String,

    /// Interval between requests per worker (supports ms/s/m/h; 0 means no throttling)
    #[arg(long, short = 'i', default_value = "100ms")]
    pub interval: String,

    /// Number of concurrent workers (connections)
    #[arg(long = "conn-num", short = 'c', default_value_t = 10)]
    pub conn_num: usize,

    /// Total number of requests to send across all workers (0 means non-stop)
    #[arg(long, short = 'n', default_value_t = 0)]
    pub num: u64,

    /// Request body; tried as a file path first, otherwise used as literal bytes
    #[arg(long, short = 'u', default_value = "")]
    pub data: String,

    /// Print a stats line periodically
    #[arg(long = "print-log", short = 'l')]
    pub print_log: bool,

    /// Print client errors as they happen
    #[arg(long = "print-error", short = 'e')]
    pub print_error: bool,

    /// Verbose: periodic stats plus client errors plus debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Debug, Args, Clone)]
pub struct TargetArgs {
    /// Local address to bind
    #[arg(long, short = 'b', default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Print a stats line periodically
    #[arg(long = "print-log", short = 'l')]
    pub print_log: bool,

    /// Verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// etcd v3 JSON gateway endpoint; enables cluster-wide stat aggregation
    #[arg(long = "store-endpoint", env = "ARBALEST_STORE_ENDPOINT")]
    pub store_endpoint: Option<String>,

    /// Identity under which this node publishes its stats (defaults to hostname)
    #[arg(long = "node-name", env = "ARBALEST_NODE_NAME")]
    pub node_name: Option<String>,
}
