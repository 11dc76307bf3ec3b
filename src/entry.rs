use clap::Parser as _;
use tracing_subscriber::EnvFilter;

use crate::archer::{ArcherConfig, start_http_archer};
use crate::args::{ArbalestArgs, ArcherArgs, Command, TargetArgs, load_payload};
use crate::error::AppResult;
use crate::shutdown::shutdown_channel;
use crate::signals::{flush_channel, setup_flush_signal_handler, setup_signal_shutdown_handler};
use crate::target::{TargetConfig, run_http_target};

/// Env vars consulted for the log filter, most specific first.
const LOG_FILTER_VARS: [&str; 2] = ["ARBALEST_LOG", "RUST_LOG"];

/// # Errors
///
/// Returns CLI, validation, and role startup errors; per-request and store
/// errors are counted or logged instead.
pub fn run() -> AppResult<()> {
    let args = ArbalestArgs::parse();
    let verbose = match &args.command {
        Command::Archer(archer) => archer.verbose,
        Command::Target(target) => target.verbose,
    };
    init_logging(verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_async(args))
}

async fn run_async(args: ArbalestArgs) -> AppResult<()> {
    match args.command {
        Command::Archer(archer_args) => run_archer(archer_args).await,
        Command::Target(target_args) => run_target(target_args).await,
    }
}

async fn run_archer(args: ArcherArgs) -> AppResult<()> {
    let data = load_payload(&args.data)?;
    let config = ArcherConfig {
        target: args.target,
        interval: args.interval,
        conn_num: args.conn_num,
        data,
        print_log: args.print_log || args.verbose,
        print_error: args.print_error || args.verbose,
        num: args.num,
    };

    let (shutdown_tx, _shutdown_rx) = shutdown_channel();
    let (flush_tx, flush_rx) = flush_channel();
    let flush_handle = setup_flush_signal_handler(flush_tx);
    let shutdown_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let result = start_http_archer(config, &shutdown_tx, flush_rx).await;

    flush_handle.abort();
    shutdown_handle.abort();
    result
}

async fn run_target(args: TargetArgs) -> AppResult<()> {
    let node_name = args.node_name.unwrap_or_else(default_node_name);
    let config = TargetConfig {
        bind_address: args.bind,
        print_log: args.print_log,
        store_endpoint: args.store_endpoint,
        node_name,
    };

    let (flush_tx, flush_rx) = flush_channel();
    let _flush_handle = setup_flush_signal_handler(flush_tx);

    run_http_target(config, flush_rx).await
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "arbalest-target".to_owned())
}

/// Wires the process-wide log filter. An explicit filter from the
/// environment wins; otherwise `-v` raises the default level to debug.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = LOG_FILTER_VARS
        .iter()
        .find_map(|var| EnvFilter::try_from_env(var).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback));

    // A later init keeps the first subscriber; relevant only to in-process
    // reruns such as tests.
    drop(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_reinit_keeps_first_subscriber() {
        init_logging(true);
        init_logging(false);
    }
}
