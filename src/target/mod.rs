//! Target (server) side: serves requests while tracking connection and
//! throughput stats, optionally publishing them for cluster-wide
//! visibility.

mod http;
mod listener;


pub use listener::{TrackedConn, TrackedListener};

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::AppResult;
use crate::reporter::{ReportRole, spawn_stats_reporter};
use crate::signals::FlushReceiver;
use crate::stats::StatsSet;
use crate::store::{EtcdStore, PUBLISH_PERIOD, spawn_stats_publisher};

/// Target-side configuration.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    pub bind_address: String,
    pub print_log: bool,
    /// etcd gateway endpoint; aggregation is enabled when set.
    pub store_endpoint: Option<String>,
    /// Identity under which this node publishes its stats.
    pub node_name: String,
}

/// Binds, wires the reporter and optional publisher, then serves until the
/// acceptor fails. The serving side has no cancellation; it runs until
/// process termination.
///
/// # Errors
///
/// Returns `TargetError::Bind` at startup, `StoreError` for a malformed
/// aggregation endpoint, and `TargetError::Accept` when the listener dies.
pub async fn run_http_target(config: TargetConfig, flush_rx: FlushReceiver) -> AppResult<()> {
    let stats = Arc::new(StatsSet::new());
    let listener = TrackedListener::bind(&config.bind_address, Arc::clone(&stats)).await?;
    info!("HTTP target serving at: {}", config.bind_address);

    let _reporter = spawn_stats_reporter(
        Arc::clone(&stats),
        ReportRole::Target,
        config.print_log,
        flush_rx,
    );
    if let Some(endpoint) = config.store_endpoint.as_deref() {
        // A bad endpoint is a configuration error; an unreachable store is
        // not, the publisher keeps retrying on its period.
        let store = EtcdStore::new(endpoint)?;
        let _publisher = spawn_stats_publisher(
            Arc::new(store),
            Arc::clone(&stats),
            config.node_name.clone(),
            PUBLISH_PERIOD,
        );
    }

    serve(listener, stats).await
}

/// Accept loop: one task per connection. An accept failure terminates the
/// loop and propagates; without a listener the target has no more work.
///
/// # Errors
///
/// Returns `TargetError::Accept` on listener failure.
pub async fn serve(listener: TrackedListener, stats: Arc<StatsSet>) -> AppResult<()> {
    loop {
        let conn = listener.accept().await?;
        tokio::spawn(handle_connection(conn, Arc::clone(&stats)));
    }
}

/// Per-connection serving loop with keep-alive. The connection's close is
/// accounted exactly once through the `TrackedConn` guard no matter which
/// path ends the loop.
async fn handle_connection(mut conn: TrackedConn, stats: Arc<StatsSet>) {
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    loop {
        let request = match http::read_request(conn.stream_mut(), &mut buffer).await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(err) => {
                debug!("connection from {} ended: {}", conn.peer(), err);
                break;
            }
        };

        account_request(&stats, &request);

        if let Err(err) = http::write_ok_response(conn.stream_mut(), request.close).await {
            debug!("failed to respond to {}: {}", conn.peer(), err);
            break;
        }
        if request.close {
            break;
        }
    }
    conn.close();
}

/// Request accounting: header name/value bytes plus declared content length
/// into `received_bytes`, one tick of `request_count`. No per-request error
/// path exists; unparsable requests never get here.
fn account_request(stats: &StatsSet, request: &http::HttpRequest) {
    stats.add_received_bytes(request.size());
    stats.add_request();
}
